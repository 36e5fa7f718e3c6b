//! Interval storage, CRUD, and invariant validation.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named enter/exit frame pair.
///
/// An interval is *complete* only when both frames are set; only
/// complete intervals are exportable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Name, unique within its table.
    pub name: String,
    /// Enter frame, if marked.
    pub enter: Option<u64>,
    /// Exit frame, if marked.
    pub exit: Option<u64>,
}

impl Interval {
    /// Both frames are set.
    pub fn is_complete(&self) -> bool {
        self.enter.is_some() && self.exit.is_some()
    }
}

/// Validation and lookup errors for annotation tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// An exportable interval's exit frame precedes its enter frame.
    #[error("interval '{name}' has exit frame {exit} before enter frame {enter}")]
    ExitBeforeEnter { name: String, enter: u64, exit: u64 },

    /// Two exportable intervals' frame ranges overlap.
    #[error("intervals '{first}' and '{second}' overlap")]
    OverlapDetected { first: String, second: String },

    /// No interval with the requested name.
    #[error("no interval named '{name}'")]
    UnknownInterval { name: String },
}

/// Ordered set of intervals for one video, keyed by name.
///
/// Insertion order is preserved for display; it carries no semantic
/// meaning. The `video_key` identifies which CSV rows belong to this
/// table (usually the source file stem).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationTable {
    video_key: String,
    intervals: Vec<Interval>,
}

impl AnnotationTable {
    /// Create an empty table for the given video key.
    pub fn new(video_key: impl Into<String>) -> Self {
        Self {
            video_key: video_key.into(),
            intervals: Vec::new(),
        }
    }

    /// The video key this table belongs to.
    pub fn video_key(&self) -> &str {
        &self.video_key
    }

    /// All intervals in insertion order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Look up an interval by name.
    pub fn get(&self, name: &str) -> Option<&Interval> {
        self.intervals.iter().find(|i| i.name == name)
    }

    /// Number of intervals (complete or not).
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the table has no intervals.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Set the enter frame, creating the interval if needed.
    pub fn set_enter(&mut self, name: &str, frame: u64) {
        self.upsert(name).enter = Some(frame);
    }

    /// Set the exit frame, creating the interval if needed.
    pub fn set_exit(&mut self, name: &str, frame: u64) {
        self.upsert(name).exit = Some(frame);
    }

    /// Set both frames at once, replacing any existing values.
    pub fn set_pair(&mut self, name: &str, enter: u64, exit: u64) {
        let interval = self.upsert(name);
        interval.enter = Some(enter);
        interval.exit = Some(exit);
    }

    /// Delete an interval. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.intervals.len();
        self.intervals.retain(|i| i.name != name);
        self.intervals.len() != before
    }

    /// Remove every interval.
    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// Duplicate an interval under a derived name.
    ///
    /// The copy is named `<name>_copy`, then `<name>_copy2`,
    /// `<name>_copy3`, ... until an unused name is found. Returns the
    /// new name.
    pub fn duplicate(&mut self, name: &str) -> Result<String, AnnotationError> {
        let original = self
            .get(name)
            .cloned()
            .ok_or_else(|| AnnotationError::UnknownInterval {
                name: name.to_string(),
            })?;

        let mut candidate = format!("{}_copy", name);
        let mut copy_index = 1;
        while self.get(&candidate).is_some() {
            copy_index += 1;
            candidate = format!("{}_copy{}", name, copy_index);
        }

        self.intervals.push(Interval {
            name: candidate.clone(),
            enter: original.enter,
            exit: original.exit,
        });
        Ok(candidate)
    }

    /// Complete intervals sorted by enter frame - the export order.
    pub fn exportable(&self) -> Vec<&Interval> {
        let mut complete: Vec<&Interval> = self
            .intervals
            .iter()
            .filter(|i| i.is_complete())
            .collect();
        complete.sort_by_key(|i| i.enter);
        complete
    }

    /// Check the export invariants over all complete intervals.
    ///
    /// Every exportable interval must have `exit >= enter`, and when
    /// sorted by enter frame no interval may start at or before the
    /// previous one's exit: ranges are closed, so a pair touching at a
    /// single frame already shares that frame and is rejected.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        let sorted = self.exportable();

        for interval in &sorted {
            let (enter, exit) = (interval.enter.unwrap_or(0), interval.exit.unwrap_or(0));
            if exit < enter {
                return Err(AnnotationError::ExitBeforeEnter {
                    name: interval.name.clone(),
                    enter,
                    exit,
                });
            }
        }

        for pair in sorted.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if next.enter.unwrap_or(0) <= current.exit.unwrap_or(0) {
                return Err(AnnotationError::OverlapDetected {
                    first: current.name.clone(),
                    second: next.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Persist the table as JSON, atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, &json)?;
        std::fs::rename(&temp, path)?;
        tracing::debug!("Saved annotation table '{}' to {}", self.video_key, path.display());
        Ok(())
    }

    /// Load a table previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn upsert(&mut self, name: &str) -> &mut Interval {
        if let Some(pos) = self.intervals.iter().position(|i| i.name == name) {
            &mut self.intervals[pos]
        } else {
            self.intervals.push(Interval {
                name: name.to_string(),
                enter: None,
                exit: None,
            });
            self.intervals.last_mut().unwrap()
        }
    }
}
