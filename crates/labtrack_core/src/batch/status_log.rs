//! Append-only batch status log.
//!
//! Tab-separated lines `<relative_path>\t<status>\t<timestamp>\t<message>`,
//! no header row. Entries are never rewritten - a re-run appends a new
//! entry, and the latest entry per key is authoritative. The file is
//! opened per write, never held open across a run.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Outcome recorded for one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Fail,
}

impl Status {
    /// Stable on-disk form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Fail => "FAIL",
        }
    }

    /// Parse a status field; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Some(Status::Ok),
            "FAIL" => Some(Status::Fail),
            _ => None,
        }
    }
}

/// Persisted, appendable record of batch outcomes keyed by item path.
#[derive(Debug, Clone)]
pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    /// Create a log handle for the given file path.
    ///
    /// The file need not exist yet; a missing log simply has no entries.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest status per key. A missing log file yields an empty map.
    pub fn latest(&self) -> io::Result<HashMap<String, Status>> {
        let mut latest = HashMap::new();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(latest),
            Err(e) => return Err(e),
        };

        for line in content.lines() {
            let mut fields = line.split('\t');
            let key = match fields.next() {
                Some(k) if !k.trim().is_empty() => k.trim().to_string(),
                _ => continue,
            };
            let status = match fields.next().and_then(Status::parse) {
                Some(s) => s,
                None => continue,
            };
            latest.insert(key, status);
        }
        Ok(latest)
    }

    /// Most recent status for a key, if any.
    pub fn last_status(&self, key: &str) -> Option<Status> {
        self.latest().ok().and_then(|map| map.get(key).copied())
    }

    /// Append one entry. The file is created on first write.
    pub fn append(&self, key: &str, status: Status, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}\t{}\t{}\t{}", key, status.as_str(), timestamp, message)?;
        tracing::debug!("Status log: {} -> {}", key, status.as_str());
        Ok(())
    }
}

/// Normalize an item's relative path into a log key.
///
/// Separators become `/` so logs written on different platforms agree.
pub fn canon_key(relative: &Path) -> String {
    let mut key = String::new();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}
