use crate::codec::ParseError;
use crate::scaling::ScaleError;
use thiserror::Error;

/// Umbrella error for batch and application edges. The engine modules keep
/// their own narrow error types; this exists so `?` composes at the top.
#[derive(Debug, Error)]
pub enum LumeditError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error("CSV validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
    #[error("unknown file '{0}'")]
    UnknownFile(String),
    #[error("rename target '{0}' already exists")]
    RenameCollision(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
