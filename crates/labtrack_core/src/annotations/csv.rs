//! CSV annotation import.
//!
//! Annotation sheets cover many videos at once. The header must carry a
//! `file_name` column; every other column pairs up as `<name>_in` /
//! `<name>_out`. Import into one table only takes the rows whose
//! `file_name` matches that table's video key, and a pair is imported
//! only when both halves are present and numeric - anything else is
//! skipped with a recorded reason, never an error.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::store::AnnotationTable;

/// CSV import failures (structural problems only - bad pairs are skips).
#[derive(Error, Debug)]
pub enum CsvError {
    /// The header row is missing the required `file_name` column.
    #[error("CSV must include a 'file_name' column (found headers: {found:?})")]
    HeaderInvalid { found: Vec<String> },

    /// Failed to read the CSV file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of one import: how many pairs landed, and why others didn't.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvImportReport {
    /// Number of complete pairs written into the table.
    pub imported: usize,
    /// Human-readable reasons for skipped pairs.
    pub skipped: Vec<String>,
}

/// Import annotations from CSV text into `table`.
///
/// Importing the same well-formed row twice is idempotent: pairs
/// replace any interval with the same name instead of duplicating it.
pub fn import_csv_rows(
    table: &mut AnnotationTable,
    text: &str,
) -> Result<CsvImportReport, CsvError> {
    let mut lines = text.lines();

    let header_line = lines.next().unwrap_or("").trim_start_matches('\u{feff}');
    let headers: Vec<String> = split_row(header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let file_name_col = headers
        .iter()
        .position(|h| h == "file_name")
        .ok_or_else(|| CsvError::HeaderInvalid {
            found: headers.clone(),
        })?;

    let pairs = pair_columns(&headers, file_name_col);
    let mut report = CsvImportReport::default();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_row(line);
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");

        let file_name = cell(file_name_col);
        if file_name.is_empty() || !row_matches(file_name, table.video_key()) {
            continue;
        }

        for pair in &pairs {
            let (enter_col, exit_col) = match (pair.enter_col, pair.exit_col) {
                (Some(e), Some(x)) => (e, x),
                _ => {
                    report
                        .skipped
                        .push(format!("{}: missing _in/_out column", pair.name));
                    continue;
                }
            };

            match (cell(enter_col).parse::<u64>(), cell(exit_col).parse::<u64>()) {
                (Ok(enter), Ok(exit)) => {
                    table.set_pair(&pair.name, enter, exit);
                    report.imported += 1;
                }
                _ => {
                    report
                        .skipped
                        .push(format!("{}: incomplete or non-numeric pair", pair.name));
                }
            }
        }
    }

    tracing::debug!(
        "CSV import for '{}': {} imported, {} skipped",
        table.video_key(),
        report.imported,
        report.skipped.len()
    );
    Ok(report)
}

/// Import annotations from a CSV file on disk.
pub fn import_csv_file(
    table: &mut AnnotationTable,
    path: &Path,
) -> Result<CsvImportReport, CsvError> {
    let text = std::fs::read_to_string(path).map_err(|e| CsvError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    import_csv_rows(table, &text)
}

struct PairColumns {
    name: String,
    enter_col: Option<usize>,
    exit_col: Option<usize>,
}

/// Group header columns into `<name>_in` / `<name>_out` pairs,
/// preserving header order.
fn pair_columns(headers: &[String], file_name_col: usize) -> Vec<PairColumns> {
    let mut pairs: Vec<PairColumns> = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        if idx == file_name_col {
            continue;
        }
        let (name, is_enter) = if let Some(stripped) = header.strip_suffix("_in") {
            (stripped, true)
        } else if let Some(stripped) = header.strip_suffix("_out") {
            (stripped, false)
        } else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let entry = match pairs.iter_mut().find(|p| p.name == name) {
            Some(entry) => entry,
            None => {
                pairs.push(PairColumns {
                    name: name.to_string(),
                    enter_col: None,
                    exit_col: None,
                });
                pairs.last_mut().unwrap()
            }
        };
        if is_enter {
            entry.enter_col = Some(idx);
        } else {
            entry.exit_col = Some(idx);
        }
    }

    pairs
}

/// A row belongs to a table when `file_name` equals the video key
/// directly or via its file stem (sheets usually carry full filenames
/// while tables are keyed by stem).
fn row_matches(file_name: &str, video_key: &str) -> bool {
    if file_name == video_key {
        return true;
    }
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem == video_key)
        .unwrap_or(false)
}

fn split_row(line: &str) -> Vec<&str> {
    line.split(',').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_complete_pair_and_skips_incomplete() {
        let mut table = AnnotationTable::new("trial01");
        let csv = "file_name,Alice_in,Alice_out,Bob_in,Bob_out\n\
                   trial01.mp4,120,420,,-\n";

        let report = import_csv_rows(&mut table, csv).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].starts_with("Bob"));

        let alice = table.get("Alice").unwrap();
        assert_eq!(alice.enter, Some(120));
        assert_eq!(alice.exit, Some(420));
        assert!(table.get("Bob").is_none());
    }

    #[test]
    fn missing_file_name_header_is_an_error() {
        let mut table = AnnotationTable::new("trial01");
        let result = import_csv_rows(&mut table, "video,Alice_in,Alice_out\nx,1,2\n");
        assert!(matches!(result, Err(CsvError::HeaderInvalid { .. })));
    }

    #[test]
    fn import_is_idempotent() {
        let mut table = AnnotationTable::new("trial01");
        let csv = "file_name,Alice_in,Alice_out\ntrial01.mp4,120,420\n";

        import_csv_rows(&mut table, csv).unwrap();
        import_csv_rows(&mut table, csv).unwrap();

        assert_eq!(table.len(), 1);
        let alice = table.get("Alice").unwrap();
        assert_eq!(alice.enter, Some(120));
        assert_eq!(alice.exit, Some(420));
    }

    #[test]
    fn rows_for_other_videos_are_ignored() {
        let mut table = AnnotationTable::new("trial01");
        let csv = "file_name,Alice_in,Alice_out\n\
                   trial02.mp4,5,9\n\
                   trial01.mp4,120,420\n";

        let report = import_csv_rows(&mut table, csv).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(table.get("Alice").unwrap().enter, Some(120));
    }

    #[test]
    fn exact_key_match_also_works() {
        let mut table = AnnotationTable::new("trial01.mp4");
        let csv = "file_name,Alice_in,Alice_out\ntrial01.mp4,1,2\n";
        let report = import_csv_rows(&mut table, csv).unwrap();
        assert_eq!(report.imported, 1);
    }

    #[test]
    fn bom_and_padding_are_tolerated() {
        let mut table = AnnotationTable::new("trial01");
        let csv = "\u{feff}file_name , Alice_in , Alice_out\n trial01.mp4 , 120 , 420 \n";
        let report = import_csv_rows(&mut table, csv).unwrap();
        assert_eq!(report.imported, 1);
    }

    #[test]
    fn unmatched_half_pair_column_is_skipped() {
        let mut table = AnnotationTable::new("trial01");
        let csv = "file_name,Carol_in\ntrial01.mp4,7\n";

        let report = import_csv_rows(&mut table, csv).unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].contains("Carol"));
    }

    #[test]
    fn import_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.csv");
        std::fs::write(&path, "file_name,Alice_in,Alice_out\ntrial01.mp4,1,2\n").unwrap();

        let mut table = AnnotationTable::new("trial01");
        let report = import_csv_file(&mut table, &path).unwrap();
        assert_eq!(report.imported, 1);

        let missing = import_csv_file(&mut table, &dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(CsvError::Io { .. })));
    }
}
