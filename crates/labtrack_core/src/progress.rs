//! Progress events pumped from worker threads to the control thread.
//!
//! Workers never touch shared state directly; everything the UI needs
//! travels through a FIFO channel as [`ProgressEvent`] values. The
//! channel guarantees that a task's output lines arrive in emission
//! order and that its completion event arrives after all of its lines.

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// A single progress update from a running queue or batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A task started. `index` is 0-based within `total` queued items.
    TaskStarted {
        index: usize,
        total: usize,
        name: String,
    },
    /// One line of combined subprocess output from the current task.
    OutputLine(String),
    /// Narration from the runner itself (command echoes, skip notices).
    Note(String),
    /// The task at `index` finished (successfully or not).
    TaskDone {
        index: usize,
        total: usize,
        name: String,
    },
}

impl ProgressEvent {
    /// Percent complete implied by a completion event, if any.
    pub fn percent(&self) -> Option<u32> {
        match self {
            ProgressEvent::TaskDone { index, total, .. } if *total > 0 => {
                Some(((index + 1) * 100 / total) as u32)
            }
            _ => None,
        }
    }
}

/// Ring buffer of the most recent subprocess output lines.
///
/// Shared between the worker (which feeds it through the sink) and the
/// control thread, which shows it when a tool fails and the interesting
/// lines have already scrolled past.
#[derive(Debug, Clone)]
pub struct OutputTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl OutputTail {
    /// Create a tail keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Record one line, evicting the oldest when full.
    pub fn push(&self, line: &str) {
        let mut lines = self.lines.lock();
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    /// Current contents, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Drop all recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

/// Sending side of the progress channel.
///
/// A disabled sink (no channel attached) swallows events, so library
/// code can report unconditionally and tests can opt out of wiring a
/// receiver.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<Sender<ProgressEvent>>,
    tail: Option<OutputTail>,
}

impl ProgressSink {
    /// Create a connected sink and the receiver for the control thread.
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                tx: Some(tx),
                tail: None,
            },
            rx,
        )
    }

    /// Create a sink that discards every event.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            tail: None,
        }
    }

    /// Also record output lines into `tail` for error diagnosis.
    pub fn with_tail(mut self, tail: &OutputTail) -> Self {
        self.tail = Some(tail.clone());
        self
    }

    /// Emit an event. A disconnected receiver is not an error; the
    /// worker keeps running and the event is dropped.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }

    /// Report a task start.
    pub fn task_started(&self, index: usize, total: usize, name: &str) {
        self.emit(ProgressEvent::TaskStarted {
            index,
            total,
            name: name.to_string(),
        });
    }

    /// Report one line of subprocess output.
    pub fn output_line(&self, line: &str) {
        if let Some(ref tail) = self.tail {
            tail.push(line);
        }
        self.emit(ProgressEvent::OutputLine(line.to_string()));
    }

    /// Report runner narration.
    pub fn note(&self, message: &str) {
        self.emit(ProgressEvent::Note(message.to_string()));
    }

    /// Report a task completion.
    pub fn task_done(&self, index: usize, total: usize, name: &str) {
        self.emit(ProgressEvent::TaskDone {
            index,
            total,
            name: name.to_string(),
        });
    }
}
