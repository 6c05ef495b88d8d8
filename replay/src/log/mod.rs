pub mod player;
pub mod reader;

use chrono::{DateTime, Utc};

pub use player::LogFilePlayer;
pub use reader::LogReader;

/// What a replay delivered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReplaySummary {
    pub delivered: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

impl ReplaySummary {
    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        self.delivered += 1;
        self.first.get_or_insert(timestamp);
        self.last = Some(timestamp);
    }
}
