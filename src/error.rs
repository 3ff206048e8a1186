use std::path::PathBuf;

use crate::engine::EngineError;

/// Errors surfaced by schema resolution, input discovery and the conversion run.
///
/// All of these are fatal: a run either writes its output or fails with one of
/// these, and nothing is retried or cleaned up.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no schema resource found for table `{0}`")]
    SchemaNotFound(String),

    #[error("malformed schema for table `{table}`: {reason}")]
    SchemaParse { table: String, reason: String },

    #[error("no data files found for table `{table}` in {dir}")]
    TableFilesNotFound { table: String, dir: PathBuf },

    #[error("partition column `{column}` is not part of the `{table}` schema")]
    PartitionColumnNotFound { table: String, column: String },

    #[error("unsupported output format `{0}`, expected `parquet` or `orc`")]
    UnsupportedFormat(String),

    #[error("conversion engine failed")]
    Engine(#[from] EngineError),

    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
