use crate::codec::{self, ParseError};
use crate::csv_transcode::{self, CsvRow};
use crate::document::{Baseline, Document};
use crate::error::LumeditError;
use crate::reconcile::{self, ProposedUpdate, ReconcilePolicy};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// How many offending file names a summary line spells out.
const SUMMARY_SAMPLE: usize = 5;

/// One loaded file plus the reference values captured at load time. The
/// baseline never changes for the lifetime of the record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub document: Document,
    pub baseline: Baseline,
}

impl BatchRecord {
    pub fn new(document: Document) -> Self {
        let baseline = Baseline::capture(&document.photometric);
        Self { document, baseline }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub file_name: String,
    pub error: ParseError,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadOutcome {
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return format!("loaded {} file(s)", self.loaded.len());
        }
        let sample = self
            .failures
            .iter()
            .take(SUMMARY_SAMPLE)
            .map(|failure| failure.file_name.as_str())
            .join(", ");
        let more = self.failures.len().saturating_sub(SUMMARY_SAMPLE);
        let suffix = if more > 0 {
            format!(" (+{more} more)")
        } else {
            String::new()
        };
        format!(
            "loaded {} file(s), {} failed to parse: {sample}{suffix}",
            self.loaded.len(),
            self.failures.len()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub updated: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl ApplyOutcome {
    pub fn summary(&self) -> String {
        if self.skipped.is_empty() {
            return format!("updated {} file(s)", self.updated.len());
        }
        let sample = self
            .skipped
            .iter()
            .take(SUMMARY_SAMPLE)
            .map(|skipped| skipped.file_name.as_str())
            .join(", ");
        let more = self.skipped.len().saturating_sub(SUMMARY_SAMPLE);
        let suffix = if more > 0 {
            format!(" (+{more} more)")
        } else {
            String::new()
        };
        format!(
            "updated {} file(s), {} skipped: {sample}{suffix}",
            self.updated.len(),
            self.skipped.len()
        )
    }
}

/// Export naming: either keep the (possibly CSV-renamed) file name, or
/// derive one from the catalog numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamingPolicy {
    pub use_original_file_name: bool,
    pub suffix: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub file_name: String,
    pub text: String,
}

/// The per-session collection of loaded files, keyed by current file name.
/// All edit surfaces funnel through [`reconcile::reconcile`], so identical
/// intents produce identical documents no matter where they came from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Batch {
    records: HashMap<String, BatchRecord>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &HashMap<String, BatchRecord> {
        &self.records
    }

    pub fn get(&self, file_name: &str) -> Option<&BatchRecord> {
        self.records.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn file_names(&self) -> HashSet<String> {
        self.records.keys().cloned().collect()
    }

    fn sorted_names(&self) -> Vec<String> {
        self.records.keys().cloned().sorted().collect()
    }

    pub fn load(&mut self, file_name: &str, text: &str) -> Result<(), ParseError> {
        let document = codec::parse(text, file_name, text.len() as u64)?;
        self.records
            .insert(document.file_name.clone(), BatchRecord::new(document));
        Ok(())
    }

    /// Loads many files at once. Parsing fans out across files; a file
    /// that fails to parse is reported and skipped, never aborting the
    /// rest of the batch.
    pub fn load_many<I>(&mut self, files: I) -> LoadOutcome
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let files: Vec<(String, String)> = files.into_iter().collect();
        let parsed: Vec<(String, Result<Document, ParseError>)> = files
            .par_iter()
            .map(|(name, text)| (name.clone(), codec::parse(text, name, text.len() as u64)))
            .collect();

        let mut outcome = LoadOutcome::default();
        for (file_name, result) in parsed {
            match result {
                Ok(document) => {
                    self.records
                        .insert(document.file_name.clone(), BatchRecord::new(document));
                    outcome.loaded.push(file_name);
                }
                Err(error) => {
                    log::warn!("skipping '{file_name}': {error}");
                    outcome.failures.push(LoadFailure { file_name, error });
                }
            }
        }
        log::info!("{}", outcome.summary());
        outcome
    }

    /// Loads every `.ies` file in a directory (non-recursive).
    pub fn load_dir(&mut self, dir: &Path) -> anyhow::Result<LoadOutcome> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_ies = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("ies"))
                .unwrap_or(false);
            if !path.is_file() || !is_ies {
                continue;
            }
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            files.push((name, fs::read_to_string(&path)?));
        }
        files.sort();
        Ok(self.load_many(files))
    }

    /// Applies one proposed update to one file, producing a new document
    /// snapshot under its (possibly renamed) key. The baseline carries
    /// over untouched.
    pub fn apply_update(
        &mut self,
        file_name: &str,
        update: &ProposedUpdate,
        policy: ReconcilePolicy,
    ) -> Result<(), LumeditError> {
        let record = self
            .records
            .get(file_name)
            .ok_or_else(|| LumeditError::UnknownFile(file_name.to_string()))?;
        let document = reconcile::reconcile(&record.document, &record.baseline, update, policy)?;
        let baseline = record.baseline.clone();
        if document.file_name != file_name {
            if self.records.contains_key(&document.file_name) {
                return Err(LumeditError::RenameCollision(document.file_name));
            }
            self.records.remove(file_name);
        }
        self.records
            .insert(document.file_name.clone(), BatchRecord { document, baseline });
        Ok(())
    }

    /// Applies the same update to every record (bulk column edit). Files
    /// a scaling precondition rejects are collected, the rest proceed.
    pub fn apply_bulk(&mut self, update: &ProposedUpdate, policy: ReconcilePolicy) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        for file_name in self.sorted_names() {
            match self.apply_update(&file_name, update, policy) {
                Ok(()) => outcome.updated.push(file_name),
                Err(error) => outcome.skipped.push(SkippedFile {
                    reason: error.to_string(),
                    file_name,
                }),
            }
        }
        outcome
    }

    /// Applies an uploaded CSV. Validation is all-or-nothing: any invalid
    /// row rejects the whole CSV so it can be fixed and re-uploaded.
    /// Once validated, every row is applied and the batch runs to
    /// completion; per-file scaling rejections land in the outcome.
    pub fn apply_csv(
        &mut self,
        text: &str,
        policy: ReconcilePolicy,
    ) -> Result<ApplyOutcome, LumeditError> {
        let known = self.file_names();
        let import = csv_transcode::from_csv(text, &known);
        if !import.errors.is_empty() {
            return Err(LumeditError::Validation(import.errors));
        }

        let mut outcome = ApplyOutcome::default();
        for row in import.updates {
            match self.apply_update(&row.filename, &row.update, policy) {
                Ok(()) => outcome.updated.push(row.filename),
                Err(error) => {
                    log::warn!("skipping '{}': {error}", row.filename);
                    outcome.skipped.push(SkippedFile {
                        file_name: row.filename,
                        reason: error.to_string(),
                    });
                }
            }
        }
        log::info!("{}", outcome.summary());
        Ok(outcome)
    }

    /// The flattened tabular view, sorted by file name.
    pub fn to_rows(&self) -> Vec<CsvRow> {
        self.sorted_names()
            .iter()
            .map(|name| csv_transcode::to_row(&self.records[name].document))
            .collect()
    }

    pub fn to_csv(&self) -> Result<String, LumeditError> {
        let names = self.sorted_names();
        let documents: Vec<&Document> = names
            .iter()
            .map(|name| &self.records[name].document)
            .collect();
        Ok(csv_transcode::to_csv(&documents)?)
    }

    /// Regenerates every document as text under the naming policy.
    pub fn export(&self, naming: &NamingPolicy) -> Vec<ExportFile> {
        self.sorted_names()
            .iter()
            .map(|name| {
                let document = &self.records[name].document;
                ExportFile {
                    file_name: export_file_name(document, naming),
                    text: codec::generate(document),
                }
            })
            .collect()
    }
}

fn strip_ies_extension(name: &str) -> &str {
    if name.len() >= 4
        && name.is_char_boundary(name.len() - 4)
        && name[name.len() - 4..].eq_ignore_ascii_case(".ies")
    {
        &name[..name.len() - 4]
    } else {
        name
    }
}

/// Export naming policy: the original (possibly renamed) file name, or the
/// luminaire catalog number, falling back to the lamp catalog number,
/// falling back to the file name when neither is present.
pub fn export_file_name(document: &Document, naming: &NamingPolicy) -> String {
    let stem = strip_ies_extension(&document.file_name);
    let base = if naming.use_original_file_name {
        stem
    } else {
        let luminaire = document
            .metadata
            .luminaire_catalog_number
            .as_deref()
            .filter(|v| !v.is_empty());
        let lamp = Some(document.metadata.lamp_catalog_number.as_str()).filter(|v| !v.is_empty());
        luminaire.or(lamp).unwrap_or(stem)
    };
    format!("{base}{}.ies", naming.suffix)
}
