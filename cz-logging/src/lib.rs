//! cz-logging: one-line-per-event JSON run logs.
//!
//! A run log is the post-mortem record of a training run: each outer
//! iteration appends a single JSON object describing the episode and the
//! training pass that followed it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema fields stamped on every event so old logs stay interpretable after
/// the ruleset or encoding changes.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfoV1 {
    pub ruleset_id: &'static str,
    pub action_space: u32,
    pub feature_schema: u32,
}

impl VersionInfoV1 {
    pub fn current(action_space: u32, feature_schema: u32) -> Self {
        Self {
            ruleset_id: "craft-v1",
            action_space,
            feature_schema,
        }
    }
}

/// One outer self-play + training iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub iteration: u64,
    /// Moves played before termination or resignation.
    pub plies: u32,
    pub resigned: bool,
    /// Terminal reward of the episode in [0, 1].
    pub score: f64,
    /// States discovered by the episode's search.
    pub table_states: u64,
    /// Examples held after eviction.
    pub buffer_len: u64,
    /// Gradient steps taken this iteration.
    pub train_steps: u32,
    pub elapsed_ms: u64,
}

/// Why an event could not be recorded.
#[derive(Debug)]
pub enum EventLogError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl From<io::Error> for EventLogError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for EventLogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl std::fmt::Display for EventLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLogError::Io(e) => write!(f, "io error: {}", e),
            EventLogError::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for EventLogError {}

/// A run log: one JSON object per line, appended as iterations complete.
///
/// Iteration events arrive once per episode, a scale where buffering earns
/// nothing, so every append is pushed through to disk. An interrupted run
/// keeps each finished line intact.
pub struct EventLog {
    out: BufWriter<File>,
    events_written: u64,
}

impl EventLog {
    /// Append to `path`, creating the file on first use.
    pub fn open(path: impl AsRef<Path>) -> Result<EventLog, EventLogError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(EventLog {
            out: BufWriter::new(file),
            events_written: 0,
        })
    }

    /// Record one event as a single JSON line.
    pub fn append<T: Serialize>(&mut self, event: &T) -> Result<(), EventLogError> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.events_written += 1;
        Ok(())
    }

    /// Events recorded since the log was opened.
    pub fn events_written(&self) -> u64 {
        self.events_written
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_append_lands_as_one_parseable_line() {
        let path = std::env::temp_dir().join(format!("cz-logging-test-{}.ndjson", now_ms()));
        {
            let mut log = EventLog::open(&path).unwrap();
            for i in 0..3u64 {
                let ev = IterationEventV1 {
                    event: "iteration",
                    ts_ms: now_ms(),
                    v: VersionInfoV1::current(29, 16),
                    iteration: i,
                    plies: 12,
                    resigned: false,
                    score: 0.5,
                    table_states: 1000,
                    buffer_len: 36,
                    train_steps: 100,
                    elapsed_ms: 7,
                };
                log.append(&ev).unwrap();
            }
            assert_eq!(log.events_written(), 3);
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["event"], "iteration");
            assert_eq!(v["v"]["ruleset_id"], "craft-v1");
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn appends_survive_reopening() {
        let path = std::env::temp_dir().join(format!("cz-logging-reopen-{}.ndjson", now_ms()));
        for iteration in 1..=2u64 {
            let mut log = EventLog::open(&path).unwrap();
            let ev = IterationEventV1 {
                event: "iteration",
                ts_ms: now_ms(),
                v: VersionInfoV1::current(29, 16),
                iteration,
                plies: 1,
                resigned: true,
                score: 0.0,
                table_states: 1,
                buffer_len: 1,
                train_steps: 0,
                elapsed_ms: 0,
            };
            log.append(&ev).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
