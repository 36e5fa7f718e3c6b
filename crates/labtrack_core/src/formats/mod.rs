//! Conversion format rules and strategy selection.
//!
//! Maps an input extension to the set of legal output extensions and
//! picks the tool chain ("strategy") for a given input/output pair. The
//! rule table is an explicit immutable value handed to the resolver at
//! construction - nothing here is process-wide mutable state.

mod resolver;

pub use resolver::{normalize_ext, FormatError, FormatResolver, FormatRule, FormatTable, Strategy};
