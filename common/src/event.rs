use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::DEFAULT_EVENT_DURATION_MINUTES;
use crate::time::{TimeParseError, parse_date_time};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to read event file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse event file {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("bad start date in event file {path:?}")]
    Date {
        path: PathBuf,
        #[source]
        source: TimeParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct EventFile {
    start: String,
    route: String,
    status: EventStatus,
    #[serde(default)]
    duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub start: DateTime<Utc>,
    pub route: String,
    pub status: EventStatus,
    pub duration: Duration,
}

impl Event {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == EventStatus::Confirmed
    }

    pub fn load(path: &Path) -> Result<Self, EventError> {
        let content = fs::read_to_string(path).map_err(|source| EventError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: EventFile = serde_json::from_str(&content).map_err(|source| EventError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let start = parse_date_time(&file.start).map_err(|source| EventError::Date {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            start,
            route: file.route,
            status: file.status,
            duration: Duration::minutes(
                file.duration_minutes
                    .unwrap_or(DEFAULT_EVENT_DURATION_MINUTES),
            ),
        })
    }
}

/// All events of a directory, ordered by start.
#[derive(Debug, Clone, Default)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.start);
        Self { events }
    }

    /// Reads every `*.json` file directly inside `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, EventError> {
        let io_err = |source: std::io::Error| EventError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut events = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                events.push(Event::load(&path)?);
            }
        }
        debug!("Loaded {} event(s) from {:?}", events.len(), dir);
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_confirmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(hour: u32, status: EventStatus) -> Event {
        Event {
            start: Utc.with_ymd_and_hms(2013, 5, 10, hour, 0, 0).unwrap(),
            route: "Nord".to_string(),
            status,
            duration: Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES),
        }
    }

    #[test]
    fn list_is_sorted_and_filtered() {
        let list = EventList::new(vec![
            event(21, EventStatus::Confirmed),
            event(19, EventStatus::Cancelled),
            event(18, EventStatus::Confirmed),
        ]);

        let starts: Vec<u32> = list
            .iter()
            .map(|e| chrono::Timelike::hour(&e.start))
            .collect();
        assert_eq!(starts, vec![18, 19, 21]);
        assert_eq!(list.confirmed().count(), 2);
    }

    #[test]
    fn end_adds_duration() {
        let e = event(19, EventStatus::Confirmed);
        assert_eq!(e.end(), Utc.with_ymd_and_hms(2013, 5, 10, 23, 0, 0).unwrap());
    }

    #[test]
    fn status_uses_snake_case() {
        let status: EventStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(status, EventStatus::Confirmed);
    }
}
