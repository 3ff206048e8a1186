//! Input file discovery.
//!
//! dsdgen writes either one file per table (`customer.dat`) or, when run in
//! parallel, numbered parts (`store_sales_1_4.dat`). Matching follows the same
//! two conventions, in strict priority order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Returns the data files for `table` directly inside `dir` (non-recursive).
///
/// Primary rule: names ending in `{table}.dat`. Only when that matches nothing
/// does the fallback apply: names containing `{table}_`, which covers
/// multi-part generator output. The two results are never merged. The fallback
/// is not prefix-safe for tables whose name prefixes another table's name; the
/// TPC-DS table set avoids that in practice.
pub fn locate(dir: &Path, table: &str) -> Result<Vec<PathBuf>> {
    let single = format!("{table}.dat");
    let multipart = format!("{table}_");

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.path());
    }

    let mut matched: Vec<PathBuf> = entries
        .iter()
        .filter(|path| file_name(path).is_some_and(|name| name.ends_with(&single)))
        .cloned()
        .collect();
    if matched.is_empty() {
        matched = entries
            .iter()
            .filter(|path| file_name(path).is_some_and(|name| name.contains(&multipart)))
            .cloned()
            .collect();
    }
    if matched.is_empty() {
        return Err(ConvertError::TableFilesNotFound {
            table: table.to_owned(),
            dir: dir.to_path_buf(),
        });
    }
    // Directory order is platform-dependent; keep the input order stable.
    matched.sort();
    Ok(matched)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn finds_single_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "customer.dat");
        touch(dir.path(), "customer_address.dat");

        let files = locate(dir.path(), "customer").unwrap();
        assert_eq!(files, vec![dir.path().join("customer.dat")]);
    }

    #[test]
    fn falls_back_to_multipart_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "store_sales_1_4.dat");
        touch(dir.path(), "store_sales_2_4.dat");
        touch(dir.path(), "store_returns_1_4.dat");

        let files = locate(dir.path(), "store_sales").unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("store_sales_1_4.dat"),
                dir.path().join("store_sales_2_4.dat"),
            ]
        );
    }

    #[test]
    fn single_file_match_suppresses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "customer.dat");
        touch(dir.path(), "customer_1_2.dat");

        let files = locate(dir.path(), "customer").unwrap();
        assert_eq!(files, vec![dir.path().join("customer.dat")]);
    }

    #[test]
    fn no_match_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "item.dat");

        let err = locate(dir.path(), "store_sales").unwrap_err();
        assert!(
            matches!(err, ConvertError::TableFilesNotFound { table, .. } if table == "store_sales")
        );
    }
}
