use crate::codec::format_number;
use crate::document::Document;
use crate::metadata::NearFieldSourceType;
use crate::reconcile::{ensure_ies_extension, FieldEdit, MetadataUpdate, ProposedUpdate};
use crate::units::UnitsType;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const CSV_COLUMNS: [&str; 19] = [
    "filename",
    "manufacturer",
    "luminaireCatalogNumber",
    "lampCatalogNumber",
    "test",
    "testLab",
    "testDate",
    "issueDate",
    "lampPosition",
    "other",
    "nearField",
    "cct",
    "wattage",
    "lumens",
    "length",
    "width",
    "height",
    "unit",
    "update_file_name",
];

/// Flattened, string-valued projection of one Document for the tabular
/// view. Boundary type only; the engine never computes on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub filename: String,
    pub manufacturer: String,
    pub luminaire_catalog_number: String,
    pub lamp_catalog_number: String,
    pub test: String,
    pub test_lab: String,
    pub test_date: String,
    pub issue_date: String,
    pub lamp_position: String,
    pub other: String,
    pub near_field: String,
    pub cct: String,
    pub wattage: String,
    pub lumens: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub unit: String,
    pub update_file_name: String,
}

impl CsvRow {
    fn record(&self) -> [&str; 19] {
        [
            &self.filename,
            &self.manufacturer,
            &self.luminaire_catalog_number,
            &self.lamp_catalog_number,
            &self.test,
            &self.test_lab,
            &self.test_date,
            &self.issue_date,
            &self.lamp_position,
            &self.other,
            &self.near_field,
            &self.cct,
            &self.wattage,
            &self.lumens,
            &self.length,
            &self.width,
            &self.height,
            &self.unit,
            &self.update_file_name,
        ]
    }
}

pub fn to_row(document: &Document) -> CsvRow {
    let metadata = &document.metadata;
    let data = &document.photometric;
    let optional = |v: &Option<String>| v.clone().unwrap_or_default();
    CsvRow {
        filename: document.file_name.clone(),
        manufacturer: metadata.manufacturer.clone(),
        luminaire_catalog_number: optional(&metadata.luminaire_catalog_number),
        lamp_catalog_number: metadata.lamp_catalog_number.clone(),
        test: optional(&metadata.test),
        test_lab: optional(&metadata.test_lab),
        test_date: optional(&metadata.test_date),
        issue_date: optional(&metadata.issue_date),
        lamp_position: optional(&metadata.lamp_position),
        other: optional(&metadata.other),
        near_field: metadata
            .near_field_source_type
            .map(|kind| kind.label().to_string())
            .unwrap_or_default(),
        cct: metadata.color_temperature.map(format_number).unwrap_or_default(),
        wattage: format_number(data.input_watts),
        lumens: format_number(data.total_lumens),
        length: format_number(data.length),
        width: format_number(data.width),
        height: format_number(data.height),
        unit: data.units_type.label().to_string(),
        update_file_name: String::new(),
    }
}

pub fn to_csv(documents: &[&Document]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new().from_writer(vec![]);
    writer.write_record(CSV_COLUMNS)?;
    for document in documents {
        writer.write_record(to_row(document).record())?;
    }
    let bytes = writer.into_inner().expect("in-memory CSV writer");
    Ok(String::from_utf8(bytes).expect("CSV output is UTF-8"))
}

/// One validated CSV row, addressed by the file name the row carried
/// (always the pre-rename name).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub filename: String,
    pub update: ProposedUpdate,
}

/// Result of reading an uploaded CSV: whatever parsed, plus every
/// validation problem found. Callers enforce all-or-nothing by rejecting
/// the import when `errors` is non-empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvImport {
    pub updates: Vec<RowUpdate>,
    pub errors: Vec<String>,
}

fn string_edit(cell: Option<String>) -> FieldEdit<String> {
    match cell {
        None => FieldEdit::Keep,
        Some(value) if value.is_empty() => FieldEdit::Clear,
        Some(value) => FieldEdit::Set(value),
    }
}

fn numeric_edit(
    cell: Option<String>,
    column: &str,
    row: usize,
    errors: &mut Vec<String>,
) -> FieldEdit<f64> {
    match cell {
        None => FieldEdit::Keep,
        Some(value) if value.is_empty() => FieldEdit::Clear,
        Some(value) => match value.parse() {
            Ok(number) => FieldEdit::Set(number),
            Err(_) => {
                errors.push(format!("row {row}: '{value}' is not a number for '{column}'"));
                FieldEdit::Keep
            }
        },
    }
}

fn numeric_proposal(
    cell: Option<String>,
    column: &str,
    row: usize,
    errors: &mut Vec<String>,
) -> Option<f64> {
    let value = cell?;
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            errors.push(format!("row {row}: '{value}' is not a number for '{column}'"));
            None
        }
    }
}

/// Reads an uploaded CSV into per-file proposed updates. Rows are matched
/// against `known_files` (the batch's current file names); all problems are
/// collected per row rather than aborting on the first.
pub fn from_csv(text: &str, known_files: &HashSet<String>) -> CsvImport {
    let mut import = CsvImport::default();
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(error) => {
            import.errors.push(format!("could not read CSV headers: {error}"));
            return import;
        }
    };
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(position, header)| (header.trim(), position))
        .collect();
    if !index.contains_key("filename") {
        import
            .errors
            .push("missing required column 'filename'".to_string());
        return import;
    }

    for (row_index, record) in reader.records().enumerate() {
        // header occupies line 1
        let row = row_index + 2;
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                import.errors.push(format!("row {row}: {error}"));
                continue;
            }
        };
        let cell = |column: &str| -> Option<String> {
            index
                .get(column)
                .and_then(|&position| record.get(position))
                .map(|value| value.trim().to_string())
        };

        let filename = cell("filename").unwrap_or_default();
        if filename.is_empty() {
            import.errors.push(format!("row {row}: empty filename"));
            continue;
        }
        if !known_files.contains(&filename) {
            import
                .errors
                .push(format!("row {row}: unknown file '{filename}'"));
            continue;
        }

        let errors = &mut import.errors;
        let mut update = ProposedUpdate {
            metadata: MetadataUpdate {
                manufacturer: string_edit(cell("manufacturer")),
                luminaire_catalog_number: string_edit(cell("luminaireCatalogNumber")),
                lamp_catalog_number: string_edit(cell("lampCatalogNumber")),
                test: string_edit(cell("test")),
                test_lab: string_edit(cell("testLab")),
                test_date: string_edit(cell("testDate")),
                issue_date: string_edit(cell("issueDate")),
                lamp_position: string_edit(cell("lampPosition")),
                other: string_edit(cell("other")),
                color_temperature: numeric_edit(cell("cct"), "cct", row, errors),
                ..MetadataUpdate::default()
            },
            wattage: numeric_proposal(cell("wattage"), "wattage", row, errors),
            lumens: numeric_proposal(cell("lumens"), "lumens", row, errors),
            length: numeric_proposal(cell("length"), "length", row, errors),
            width: numeric_proposal(cell("width"), "width", row, errors),
            height: numeric_proposal(cell("height"), "height", row, errors),
            // the CSV boundary always carries a unit; unrecognized or
            // absent tags mean meters
            unit: Some(UnitsType::parse_label(
                &cell("unit").unwrap_or_default(),
            )),
            rename: None,
        };

        update.metadata.near_field_source_type = match cell("nearField") {
            None => FieldEdit::Keep,
            Some(value) if value.is_empty() => FieldEdit::Clear,
            Some(value) => match NearFieldSourceType::parse(&value) {
                Some(kind) => FieldEdit::Set(kind),
                None => {
                    import
                        .errors
                        .push(format!("row {row}: invalid nearField value '{value}'"));
                    FieldEdit::Keep
                }
            },
        };

        if let Some(name) = cell("update_file_name") {
            if !name.is_empty() {
                update.rename = Some(ensure_ies_extension(&name));
            }
        }

        import.updates.push(RowUpdate { filename, update });
    }
    import
}
