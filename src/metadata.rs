use serde::{Deserialize, Serialize};
use std::fmt;

/// Near-field source geometry code carried in the [NEARFIELD] keyword.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearFieldSourceType {
    #[default]
    None,
    Point,
    Linear,
    Area,
}

impl NearFieldSourceType {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "none" => Some(NearFieldSourceType::None),
            "point" => Some(NearFieldSourceType::Point),
            "linear" => Some(NearFieldSourceType::Linear),
            "area" => Some(NearFieldSourceType::Area),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn label(&self) -> &'static str {
        match self {
            NearFieldSourceType::None => "none",
            NearFieldSourceType::Point => "point",
            NearFieldSourceType::Linear => "linear",
            NearFieldSourceType::Area => "area",
        }
    }
}

impl fmt::Display for NearFieldSourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Descriptive keyword fields of a luminaire file.
///
/// `format`, `manufacturer` and `lamp_catalog_number` are always present in
/// the model; their keyword lines are emitted even when empty. Absent
/// optional fields serialize as omitted keyword lines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub format: String,
    pub manufacturer: String,
    pub lamp_catalog_number: String,
    pub test: Option<String>,
    pub test_lab: Option<String>,
    pub test_date: Option<String>,
    pub issue_date: Option<String>,
    pub lamp_position: Option<String>,
    pub other: Option<String>,
    pub near_field_source_type: Option<NearFieldSourceType>,
    pub luminaire_description: Option<String>,
    pub luminaire_catalog_number: Option<String>,
    pub ballast_catalog_number: Option<String>,
    pub ballast_description: Option<String>,
    pub color_temperature: Option<f64>,
    pub color_rendering_index: Option<f64>,
}
