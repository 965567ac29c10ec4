use crate::document::{Baseline, Document};
use crate::metadata::{Metadata, NearFieldSourceType};
use crate::photometric::{Dimension, PhotometricData};
use crate::scaling::{self, round3, ScaleError};
use crate::units::{self, UnitsType};
use serde::{Deserialize, Serialize};

/// Change-detection thresholds. Displayed values are string-formatted and
/// re-parsed on every edit surface, so exact equality is unreliable; these
/// sit above formatting noise and below any meaningful edit.
pub const WATTAGE_TOLERANCE: f64 = 0.01;
pub const LUMENS_TOLERANCE: f64 = 0.1;
pub const DIMENSION_TOLERANCE: f64 = 0.001;

/// Three-state edit for a single metadata field: an absent field is left
/// untouched, a present-but-empty field is cleared. "Clear this" and
/// "don't touch this" must never collapse into one another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FieldEdit<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T: Clone> FieldEdit<T> {
    pub fn apply_optional(&self, field: &mut Option<T>) {
        match self {
            FieldEdit::Keep => {}
            FieldEdit::Clear => *field = None,
            FieldEdit::Set(value) => *field = Some(value.clone()),
        }
    }

    pub fn apply_required(&self, field: &mut T)
    where
        T: Default,
    {
        match self {
            FieldEdit::Keep => {}
            FieldEdit::Clear => *field = T::default(),
            FieldEdit::Set(value) => *field = value.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub manufacturer: FieldEdit<String>,
    pub lamp_catalog_number: FieldEdit<String>,
    pub luminaire_catalog_number: FieldEdit<String>,
    pub luminaire_description: FieldEdit<String>,
    pub test: FieldEdit<String>,
    pub test_lab: FieldEdit<String>,
    pub test_date: FieldEdit<String>,
    pub issue_date: FieldEdit<String>,
    pub lamp_position: FieldEdit<String>,
    pub other: FieldEdit<String>,
    pub ballast_catalog_number: FieldEdit<String>,
    pub ballast_description: FieldEdit<String>,
    pub near_field_source_type: FieldEdit<NearFieldSourceType>,
    pub color_temperature: FieldEdit<f64>,
    pub color_rendering_index: FieldEdit<f64>,
}

pub fn apply_metadata(current: &Metadata, update: &MetadataUpdate) -> Metadata {
    let mut metadata = current.clone();
    update.manufacturer.apply_required(&mut metadata.manufacturer);
    update
        .lamp_catalog_number
        .apply_required(&mut metadata.lamp_catalog_number);
    update
        .luminaire_catalog_number
        .apply_optional(&mut metadata.luminaire_catalog_number);
    update
        .luminaire_description
        .apply_optional(&mut metadata.luminaire_description);
    update.test.apply_optional(&mut metadata.test);
    update.test_lab.apply_optional(&mut metadata.test_lab);
    update.test_date.apply_optional(&mut metadata.test_date);
    update.issue_date.apply_optional(&mut metadata.issue_date);
    update.lamp_position.apply_optional(&mut metadata.lamp_position);
    update.other.apply_optional(&mut metadata.other);
    update
        .ballast_catalog_number
        .apply_optional(&mut metadata.ballast_catalog_number);
    update
        .ballast_description
        .apply_optional(&mut metadata.ballast_description);
    update
        .near_field_source_type
        .apply_optional(&mut metadata.near_field_source_type);
    update
        .color_temperature
        .apply_optional(&mut metadata.color_temperature);
    update
        .color_rendering_index
        .apply_optional(&mut metadata.color_rendering_index);
    metadata
}

/// One logical edit, from any surface: a cell edit, a bulk column edit or
/// a CSV row. Absent fields propose nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedUpdate {
    pub metadata: MetadataUpdate,
    pub wattage: Option<f64>,
    pub lumens: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Unit the dimension fields are expressed in; None inherits the
    /// document's native unit.
    pub unit: Option<UnitsType>,
    pub rename: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Re-derive wattage when lumens are forced (the "adjust wattage"
    /// checkbox).
    pub auto_adjust_wattage: bool,
}

/// Canonical wattage/lumens update. Every edit surface resolves through
/// this one function so identical intents produce identical documents.
///
/// Wattage is applied first and drags lumens and candela with it; a lumen
/// proposal then overrides the dragged value. Proposals within tolerance
/// of the baseline are formatting noise and are dropped.
pub fn apply_update(
    current: &PhotometricData,
    baseline: &Baseline,
    proposed_wattage: Option<f64>,
    proposed_lumens: Option<f64>,
    auto_adjust_wattage: bool,
) -> Result<PhotometricData, ScaleError> {
    let mut data = current.clone();
    if let Some(watts) = proposed_wattage {
        if (watts - baseline.input_watts).abs() > WATTAGE_TOLERANCE {
            data = scaling::scale_by_wattage(&data, watts)?.data;
        }
    }
    if let Some(lumens) = proposed_lumens {
        if (lumens - baseline.total_lumens).abs() > LUMENS_TOLERANCE {
            data = scaling::scale_by_lumens(&data, lumens, auto_adjust_wattage)?.data;
        }
    }
    Ok(data)
}

/// Dimension reconciliation. Proposals are converted to the document's
/// native unit and compared against the *current* value; the first
/// non-trivial change (length before width before height) drives a scale,
/// later changed dimensions are written as plain converted values.
pub fn apply_dimensions(
    current: &PhotometricData,
    update: &ProposedUpdate,
) -> Result<PhotometricData, ScaleError> {
    let native = current.units_type;
    let unit = update.unit.unwrap_or(native);
    let mut data = current.clone();
    let mut scaled = false;
    for (dimension, proposed) in [
        (Dimension::Length, update.length),
        (Dimension::Width, update.width),
        (Dimension::Height, update.height),
    ] {
        let Some(value) = proposed else { continue };
        let converted = units::convert(value, unit, native);
        if (converted - data.dimension(dimension)).abs() <= DIMENSION_TOLERANCE {
            continue;
        }
        if scaled {
            data.set_dimension(dimension, round3(converted));
        } else {
            data = scaling::scale_by_dimension(&data, converted, dimension)?.data;
            scaled = true;
        }
    }
    Ok(data)
}

pub fn ensure_ies_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".ies") {
        name.to_string()
    } else {
        format!("{name}.ies")
    }
}

/// Resolves a full proposed update into a consistent new Document:
/// metadata overwrite, then the wattage/lumens contract, then dimensions,
/// then the rename.
pub fn reconcile(
    document: &Document,
    baseline: &Baseline,
    update: &ProposedUpdate,
    policy: ReconcilePolicy,
) -> Result<Document, ScaleError> {
    let metadata = apply_metadata(&document.metadata, &update.metadata);
    let data = apply_update(
        &document.photometric,
        baseline,
        update.wattage,
        update.lumens,
        policy.auto_adjust_wattage,
    )?;
    let data = apply_dimensions(&data, update)?;
    let mut next = Document {
        file_name: document.file_name.clone(),
        file_size: document.file_size,
        metadata,
        photometric: data,
    };
    if let Some(name) = update.rename.as_deref() {
        if !name.is_empty() {
            next.file_name = ensure_ies_extension(name);
        }
    }
    Ok(next)
}
