use anyhow::Result;
use chrono::{DateTime, Utc};
use common::ParticipantUpdate;
use tracing::{debug, info};

use super::ReplaySummary;
use crate::clock::{Pacing, ReplayClock};
use crate::sink::ParticipantSink;

/// Replays recorded updates inside an optional time window, spaced out the
/// way they were recorded and compressed by the time lapse factor.
pub struct LogFilePlayer {
    entries: Vec<ParticipantUpdate>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    pacing: Pacing,
}

impl LogFilePlayer {
    pub fn new(mut entries: Vec<ParticipantUpdate>) -> Self {
        entries.sort_by_key(|e| e.timestamp);
        Self {
            entries,
            from: None,
            to: None,
            pacing: Pacing::TimeLapse(1.0),
        }
    }

    /// Inclusive lower bound of the window
    pub fn set_from_date_time(&mut self, from: DateTime<Utc>) {
        self.from = Some(from);
    }

    /// Exclusive upper bound of the window
    pub fn set_to_date_time(&mut self, to: DateTime<Utc>) {
        self.to = Some(to);
    }

    pub fn set_time_lapse_factor(&mut self, factor: f64) -> Result<()> {
        self.pacing = Pacing::time_lapse(factor)?;
        Ok(())
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    pub fn entries_in_window(&self) -> &[ParticipantUpdate] {
        let start = match self.from {
            Some(from) => self.entries.partition_point(|e| e.timestamp < from),
            None => 0,
        };
        let end = match self.to {
            Some(to) => self.entries.partition_point(|e| e.timestamp < to),
            None => self.entries.len(),
        };
        if start >= end {
            return &[];
        }
        &self.entries[start..end]
    }

    pub async fn replay<S>(&self, sink: &mut S) -> Result<ReplaySummary>
    where
        S: ParticipantSink + ?Sized,
    {
        let window = self.entries_in_window();
        let mut summary = ReplaySummary::default();

        if let Some(first) = window.first() {
            info!(
                "Replaying {} of {} entries from {} ({:?})",
                window.len(),
                self.entries.len(),
                first.timestamp,
                self.pacing
            );
            let clock = ReplayClock::new(first.timestamp, self.pacing);
            for entry in window {
                clock.wait_until(entry.timestamp).await;
                debug!("{} {}", entry.timestamp, entry.device_id);
                sink.deliver(entry).await?;
                summary.record(entry.timestamp);
            }
        } else {
            info!("No log entries in the requested time window");
        }

        sink.finish().await?;
        Ok(summary)
    }
}
