use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use crate::access::domain::intent::{AccessEvent, AccessOutcome};
use crate::notification::domain::event_recorder::EventRecorder;
use crate::notification::domain::sink_error::SinkError;
use crate::shared::timestamp::ClockAnchor;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct EventLine<'a> {
    timestamp: String,
    name: &'a str,
    identity: Option<u32>,
    status: AccessOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

/// Append-only access log, one JSON object per line.
///
/// ```text
/// {"timestamp":"2024-05-01 12:00:03","name":"Pavan","identity":1,"status":"access_granted","confidence":42.5}
/// ```
pub struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<File>,
    clock: ClockAnchor,
}

impl JsonlEventLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path, clock: ClockAnchor) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            clock,
        })
    }

    fn format_line(&self, event: &AccessEvent) -> Result<String, SinkError> {
        let line = EventLine {
            timestamp: self
                .clock
                .wall_time(event.at)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            name: &event.name,
            identity: event.subject.map(|id| id.0),
            status: event.outcome,
            confidence: event.score.map(|s| (s * 10.0).round() / 10.0),
        };
        Ok(serde_json::to_string(&line)?)
    }
}

impl EventRecorder for JsonlEventLog {
    fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
        let mut line = self.format_line(event)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| SinkError::Unavailable("event log lock poisoned".into()))?;
        // One write per line keeps concurrent workers from interleaving.
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| SinkError::Io {
                path: self.path.clone(),
                source: e,
            })
    }
}
