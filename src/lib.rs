pub mod batch;
pub mod calculated;
pub mod codec;
pub mod csv_transcode;
pub mod document;
pub mod error;
pub mod metadata;
pub mod photometric;
pub mod reconcile;
pub mod scaling;
pub mod units;
