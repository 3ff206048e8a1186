use clap::{Parser, ValueHint};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tpcds2col::engine::ArrowEngine;
use tpcds2col::runner::{self, ConvertArgs};
use tpcds2col::schema::{self, BundledSchemas, SchemaDir, SchemaSource};
use tpcds2col::Format;

#[derive(Parser)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Convert TPC-DS dsdgen output to Parquet or ORC")]
struct Opts {
    /// Directory containing the generated .dat files. Output is written under
    /// it, to DIR/<format>/<table>.
    #[clap(name = "DIR", value_parser, value_hint = ValueHint::DirPath)]
    dir: PathBuf,

    /// Table to convert, e.g. store_sales.
    #[clap(name = "TABLE")]
    table: String,

    /// Output format: parquet or orc.
    #[clap(short, long, default_value = "parquet")]
    format: String,

    /// Redistribute rows by this column and write Hive-partitioned output
    /// (one column=value directory per distinct value).
    #[clap(short, long)]
    partition_by: Option<String>,

    /// Read table schemas from this directory ({table}.schema files) instead
    /// of the bundled TPC-DS set.
    #[clap(long, value_parser, value_hint = ValueHint::DirPath)]
    schema_dir: Option<PathBuf>,

    /// Print the resolved Arrow schema.
    #[clap(short = 's', long)]
    print_schema: bool,

    /// Only print the schema, skip the conversion.
    #[clap(short = 'n', long)]
    dry: bool,

    /// Only log warnings and errors.
    #[clap(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let filter = if opts.quiet {
        EnvFilter::new("tpcds2col=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tpcds2col=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let format = Format::parse(&opts.format)?;
    let source: Box<dyn SchemaSource> = match opts.schema_dir {
        Some(dir) => Box::new(SchemaDir::new(dir)),
        None => Box::new(BundledSchemas),
    };

    if opts.print_schema || opts.dry {
        let table_schema = schema::resolve(source.as_ref(), &opts.table)?;
        eprintln!("Schema:");
        println!("{}", serde_json::to_string_pretty(&table_schema)?);
        if opts.dry {
            return Ok(());
        }
    }

    let args = ConvertArgs {
        dir: opts.dir,
        table: opts.table,
        partition_by: opts.partition_by,
        format,
    };
    runner::run(&args, source.as_ref(), &ArrowEngine::default())?;
    Ok(())
}
