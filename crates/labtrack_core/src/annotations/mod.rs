//! Frame-interval annotations for one video.
//!
//! An [`AnnotationTable`] holds named enter/exit frame pairs, validates
//! the ordering and non-overlap invariants before export, and imports
//! pairs from multi-file CSV sheets.

mod csv;
mod store;

pub use csv::{import_csv_file, import_csv_rows, CsvError, CsvImportReport};
pub use store::{AnnotationError, AnnotationTable, Interval};
