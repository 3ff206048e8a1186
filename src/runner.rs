//! Orchestration of one conversion run.
//!
//! Resolves the table schema, discovers the input files, assembles a
//! [`ConversionRequest`] and hands it to the engine in a single synchronous
//! call. There is no partial or resumable state: a run either writes its
//! output or propagates an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::engine::{
    Codec, ConversionEngine, ConversionRequest, Format, OutputLayout, WriteSummary,
};
use crate::error::{ConvertError, Result};
use crate::locate;
use crate::schema::{self, SchemaSource};

/// The field delimiter dsdgen uses.
pub const DELIMITER: u8 = b'|';

/// One conversion invocation, fully specified by the caller.
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Directory holding the generated `.dat` files; output goes under it too.
    pub dir: PathBuf,
    /// Table to convert.
    pub table: String,
    /// When set, redistribute rows by this column and write Hive-partitioned
    /// output. When unset, coalesce everything into a single part file.
    pub partition_by: Option<String>,
    pub format: Format,
}

/// Output directory for a table: `{dir}/{format}/{table}`.
pub fn output_path(dir: &Path, table: &str, format: Format) -> PathBuf {
    dir.join(format.as_str()).join(table)
}

/// Runs one conversion and blocks until the engine finishes writing.
pub fn run(
    args: &ConvertArgs,
    source: &dyn SchemaSource,
    engine: &dyn ConversionEngine,
) -> Result<WriteSummary> {
    let table_schema = schema::resolve(source, &args.table)?;
    info!(
        table = %args.table,
        columns = table_schema.fields().len(),
        "resolved table schema"
    );

    if let Some(column) = &args.partition_by {
        if table_schema.field_with_name(column).is_err() {
            return Err(ConvertError::PartitionColumnNotFound {
                table: args.table.clone(),
                column: column.clone(),
            });
        }
    }

    let inputs = locate::locate(&args.dir, &args.table)?;
    info!(files = inputs.len(), "located input files");

    let layout = match &args.partition_by {
        Some(column) => OutputLayout::PartitionBy(column.clone()),
        None => OutputLayout::Coalesce,
    };
    let request = ConversionRequest {
        inputs,
        schema: Arc::new(table_schema),
        delimiter: DELIMITER,
        output: output_path(&args.dir, &args.table, args.format),
        format: args.format,
        codec: Codec::Snappy,
        layout,
    };

    let summary = engine.convert(&request)?;
    info!(
        rows = summary.rows,
        files = summary.files,
        output = %request.output.display(),
        "conversion complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs::File;

    use super::*;
    use crate::engine::EngineError;
    use crate::schema::BundledSchemas;

    /// Records the requests it receives instead of doing any work.
    struct MockEngine {
        seen: RefCell<Vec<ConversionRequest>>,
    }

    impl MockEngine {
        fn new() -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ConversionRequest> {
            self.seen.borrow().clone()
        }
    }

    impl ConversionEngine for MockEngine {
        fn convert(&self, request: &ConversionRequest) -> Result<WriteSummary, EngineError> {
            self.seen.borrow_mut().push(request.clone());
            Ok(WriteSummary { rows: 0, files: 0 })
        }
    }

    fn data_dir_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            File::create(dir.path().join(name)).unwrap();
        }
        dir
    }

    #[test]
    fn coalesces_when_no_partition_column() {
        let dir = data_dir_with(&["customer.dat"]);
        let engine = MockEngine::new();
        let args = ConvertArgs {
            dir: dir.path().to_path_buf(),
            table: "customer".to_owned(),
            partition_by: None,
            format: Format::Parquet,
        };
        run(&args, &BundledSchemas, &engine).unwrap();

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.layout, OutputLayout::Coalesce);
        assert_eq!(request.codec, Codec::Snappy);
        assert_eq!(request.delimiter, b'|');
        assert_eq!(request.inputs, vec![dir.path().join("customer.dat")]);
        assert_eq!(request.output, dir.path().join("parquet").join("customer"));
        assert_eq!(request.schema.fields().len(), 18);
    }

    #[test]
    fn partitions_when_column_given() {
        let dir = data_dir_with(&["store_sales_1_2.dat", "store_sales_2_2.dat"]);
        let engine = MockEngine::new();
        let args = ConvertArgs {
            dir: dir.path().to_path_buf(),
            table: "store_sales".to_owned(),
            partition_by: Some("ss_sold_date_sk".to_owned()),
            format: Format::Orc,
        };
        run(&args, &BundledSchemas, &engine).unwrap();

        let request = &engine.requests()[0];
        assert_eq!(
            request.layout,
            OutputLayout::PartitionBy("ss_sold_date_sk".to_owned())
        );
        assert_eq!(request.inputs.len(), 2);
        assert_eq!(request.output, dir.path().join("orc").join("store_sales"));
    }

    #[test]
    fn rejects_partition_column_outside_schema() {
        let dir = data_dir_with(&["customer.dat"]);
        let engine = MockEngine::new();
        let args = ConvertArgs {
            dir: dir.path().to_path_buf(),
            table: "customer".to_owned(),
            partition_by: Some("not_a_column".to_owned()),
            format: Format::Parquet,
        };
        let err = run(&args, &BundledSchemas, &engine).unwrap_err();
        assert!(matches!(err, ConvertError::PartitionColumnNotFound { .. }));
        assert!(engine.requests().is_empty());
    }

    #[test]
    fn missing_inputs_fail_before_engine_runs() {
        let dir = data_dir_with(&[]);
        let engine = MockEngine::new();
        let args = ConvertArgs {
            dir: dir.path().to_path_buf(),
            table: "customer".to_owned(),
            partition_by: None,
            format: Format::Parquet,
        };
        let err = run(&args, &BundledSchemas, &engine).unwrap_err();
        assert!(matches!(err, ConvertError::TableFilesNotFound { .. }));
        assert!(engine.requests().is_empty());
    }
}
