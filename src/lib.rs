//! Convert TPC-DS dsdgen output (pipe-delimited `.dat` files) to Parquet or
//! ORC, optionally Hive-partitioned by one column.

pub mod engine;
pub mod error;
pub mod locate;
pub mod runner;
pub mod schema;

pub use engine::{ArrowEngine, ConversionEngine, Format};
pub use error::ConvertError;
pub use runner::{run, ConvertArgs};
