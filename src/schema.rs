//! Table schema resolution.
//!
//! Each TPC-DS table has a text resource holding its column definition list in
//! `name type, name type, ...` form. The bundled set covers the 24 tables that
//! dsdgen produces; `--schema-dir` swaps in a filesystem directory with the
//! same `{table}.schema` naming.

use std::fs;
use std::path::PathBuf;

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

use crate::error::{ConvertError, Result};

/// Where schema definition text comes from.
pub trait SchemaSource {
    /// Returns the raw definition text for `table`, or `SchemaNotFound`.
    fn schema_text(&self, table: &str) -> Result<String>;
}

/// The schema resources compiled into the binary.
pub struct BundledSchemas;

impl SchemaSource for BundledSchemas {
    fn schema_text(&self, table: &str) -> Result<String> {
        bundled(table)
            .map(str::to_owned)
            .ok_or_else(|| ConvertError::SchemaNotFound(table.to_owned()))
    }
}

/// A directory of `{table}.schema` files.
pub struct SchemaDir {
    dir: PathBuf,
}

impl SchemaDir {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl SchemaSource for SchemaDir {
    fn schema_text(&self, table: &str) -> Result<String> {
        let path = self.dir.join(format!("{table}.schema"));
        if !path.is_file() {
            return Err(ConvertError::SchemaNotFound(table.to_owned()));
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// Resolves the Arrow schema for `table` from `source`.
///
/// The definition text is normalized first: every line is trimmed and blank
/// lines are dropped, so resources may format one column per line. Each call
/// re-reads and re-parses; nothing is cached.
pub fn resolve(source: &dyn SchemaSource, table: &str) -> Result<Schema> {
    let text = source.schema_text(table)?;
    let ddl = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    parse_ddl(&ddl).map_err(|reason| ConvertError::SchemaParse {
        table: table.to_owned(),
        reason,
    })
}

/// Parses a `name type, name type, ...` column definition list.
///
/// Commas inside type arguments (`decimal(7,2)`) do not split columns. All
/// columns are nullable; dsdgen leaves any field empty.
fn parse_ddl(ddl: &str) -> std::result::Result<Schema, String> {
    let mut fields = Vec::new();
    for part in split_top_level(ddl) {
        let part = part.trim();
        let (name, ty) = part
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("expected `name type`, got `{part}`"))?;
        let data_type = parse_type(ty.trim())?;
        fields.push(Field::new(name, data_type, true));
    }
    if fields.is_empty() {
        return Err("empty column definition list".to_owned());
    }
    Ok(Schema::new(fields))
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_type(ty: &str) -> std::result::Result<DataType, String> {
    let lower = ty.to_ascii_lowercase();
    let data_type = match lower.as_str() {
        "int" | "integer" => DataType::Int32,
        "bigint" | "long" => DataType::Int64,
        "smallint" => DataType::Int16,
        "tinyint" => DataType::Int8,
        "boolean" => DataType::Boolean,
        "float" | "real" => DataType::Float32,
        "double" => DataType::Float64,
        "string" => DataType::Utf8,
        "date" => DataType::Date32,
        "timestamp" => DataType::Timestamp(TimeUnit::Microsecond, None),
        _ => {
            // char(n) and varchar(n) are read as plain strings, matching how
            // the generated data is loaded everywhere else.
            if lower.starts_with("char(") || lower.starts_with("varchar(") {
                DataType::Utf8
            } else if let Some(args) = lower
                .strip_prefix("decimal(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                let (p, s) = args
                    .split_once(',')
                    .ok_or_else(|| format!("bad decimal arguments in `{ty}`"))?;
                let precision: u8 = p
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad decimal precision in `{ty}`"))?;
                let scale: i8 = s
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad decimal scale in `{ty}`"))?;
                DataType::Decimal128(precision, scale)
            } else {
                return Err(format!("unsupported column type `{ty}`"));
            }
        }
    };
    Ok(data_type)
}

/// The 24 TPC-DS tables generated by dsdgen (`dbgen_version` excluded).
pub const TABLES: &[&str] = &[
    "call_center",
    "catalog_page",
    "catalog_returns",
    "catalog_sales",
    "customer",
    "customer_address",
    "customer_demographics",
    "date_dim",
    "household_demographics",
    "income_band",
    "inventory",
    "item",
    "promotion",
    "reason",
    "ship_mode",
    "store",
    "store_returns",
    "store_sales",
    "time_dim",
    "warehouse",
    "web_page",
    "web_returns",
    "web_sales",
    "web_site",
];

fn bundled(table: &str) -> Option<&'static str> {
    let text = match table {
        "call_center" => include_str!("../schemas/call_center.schema"),
        "catalog_page" => include_str!("../schemas/catalog_page.schema"),
        "catalog_returns" => include_str!("../schemas/catalog_returns.schema"),
        "catalog_sales" => include_str!("../schemas/catalog_sales.schema"),
        "customer" => include_str!("../schemas/customer.schema"),
        "customer_address" => include_str!("../schemas/customer_address.schema"),
        "customer_demographics" => include_str!("../schemas/customer_demographics.schema"),
        "date_dim" => include_str!("../schemas/date_dim.schema"),
        "household_demographics" => include_str!("../schemas/household_demographics.schema"),
        "income_band" => include_str!("../schemas/income_band.schema"),
        "inventory" => include_str!("../schemas/inventory.schema"),
        "item" => include_str!("../schemas/item.schema"),
        "promotion" => include_str!("../schemas/promotion.schema"),
        "reason" => include_str!("../schemas/reason.schema"),
        "ship_mode" => include_str!("../schemas/ship_mode.schema"),
        "store" => include_str!("../schemas/store.schema"),
        "store_returns" => include_str!("../schemas/store_returns.schema"),
        "store_sales" => include_str!("../schemas/store_sales.schema"),
        "time_dim" => include_str!("../schemas/time_dim.schema"),
        "warehouse" => include_str!("../schemas/warehouse.schema"),
        "web_page" => include_str!("../schemas/web_page.schema"),
        "web_returns" => include_str!("../schemas/web_returns.schema"),
        "web_sales" => include_str!("../schemas/web_sales.schema"),
        "web_site" => include_str!("../schemas/web_site.schema"),
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_simple_list() {
        let schema = parse_ddl("a int, b string, c decimal(7,2)").unwrap();
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.field(0).name(), "a");
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Decimal128(7, 2));
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn char_and_varchar_become_strings() {
        let schema = parse_ddl("id char(16), name varchar(60)").unwrap();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
    }

    #[test]
    fn rejects_malformed_definitions() {
        assert!(parse_ddl("").is_err());
        assert!(parse_ddl("just_a_name").is_err());
        assert!(parse_ddl("a wibble").is_err());
        assert!(parse_ddl("a decimal(x,2)").is_err());
    }

    #[test]
    fn resolves_bundled_customer() {
        let schema = resolve(&BundledSchemas, "customer").unwrap();
        assert_eq!(schema.fields().len(), 18);
        assert_eq!(schema.field(0).name(), "c_customer_sk");
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert_eq!(schema.field(17).name(), "c_last_review_date_sk");
    }

    #[test]
    fn every_bundled_table_resolves() {
        for table in TABLES {
            let schema = resolve(&BundledSchemas, table).unwrap();
            assert!(schema.fields().len() >= 3, "{table} looks truncated");
        }
    }

    #[test]
    fn unknown_table_is_schema_not_found() {
        let err = resolve(&BundledSchemas, "no_such_table").unwrap_err();
        assert!(matches!(err, ConvertError::SchemaNotFound(t) if t == "no_such_table"));
    }

    #[test]
    fn schema_dir_ignores_blank_lines_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.schema");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "  w_id integer,\n\n\n   w_name string  \n").unwrap();

        let source = SchemaDir::new(dir.path().to_path_buf());
        let schema = resolve(&source, "widgets").unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(1).name(), "w_name");

        let err = resolve(&source, "gadgets").unwrap_err();
        assert!(matches!(err, ConvertError::SchemaNotFound(_)));
    }
}
