//! The conversion engine seam.
//!
//! The converter itself only resolves schemas, discovers input files and
//! assembles a [`ConversionRequest`]; everything that touches data (CSV
//! parsing, redistribution, columnar encoding) sits behind the
//! [`ConversionEngine`] trait so another CSV-to-columnar library can be
//! swapped in without touching the rest of the crate.

mod arrow;

pub use self::arrow::ArrowEngine;

use std::path::PathBuf;

use ::arrow::datatypes::SchemaRef;
use ::arrow::error::ArrowError;
use orc_rust::error::OrcError;
use parquet::errors::ParquetError;

use crate::error::ConvertError;

/// Output format for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Parquet,
    Orc,
}

impl Format {
    /// Parses a format name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, ConvertError> {
        match s.to_ascii_lowercase().as_str() {
            "parquet" => Ok(Format::Parquet),
            "orc" => Ok(Format::Orc),
            _ => Err(ConvertError::UnsupportedFormat(s.to_owned())),
        }
    }

    /// Format name, used both as the output subdirectory and as the file
    /// extension of part files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Parquet => "parquet",
            Format::Orc => "orc",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression applied to every output file.
///
/// Fixed at snappy; the enum exists so the codec shows up in the assembled
/// request rather than as a buried constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Codec {
    #[default]
    Snappy,
}

/// How output records are physically laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// Merge everything into a single part file.
    Coalesce,
    /// Redistribute rows by this column and write one Hive-style
    /// `column=value` directory per distinct value.
    PartitionBy(String),
}

/// A fully assembled conversion: inputs, how to read them, and what to write.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub inputs: Vec<PathBuf>,
    pub schema: SchemaRef,
    pub delimiter: u8,
    pub output: PathBuf,
    pub format: Format,
    pub codec: Codec,
    pub layout: OutputLayout,
}

/// What a completed conversion wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows: u64,
    pub files: usize,
}

/// Failures reported by an engine during read, redistribute or write.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("arrow error")]
    Arrow(#[from] ArrowError),
    #[error("parquet write failed")]
    Parquet(#[from] ParquetError),
    #[error("orc write failed")]
    Orc(#[from] OrcError),
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

/// Performs the read, optional redistribution and write for one request,
/// synchronously. One invocation per run, no retry.
pub trait ConversionEngine {
    fn convert(&self, request: &ConversionRequest) -> Result<WriteSummary, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn parses_known_formats() {
        assert_eq!(Format::parse("parquet").unwrap(), Format::Parquet);
        assert_eq!(Format::parse("ORC").unwrap(), Format::Orc);
    }

    #[test]
    fn rejects_unknown_formats() {
        let err = Format::parse("avro").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat(s) if s == "avro"));
    }
}
