use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{ParticipantUpdate, Procession};
use tracing::{debug, info};

use super::ParticipantSink;
use crate::stats::StatisticsWriter;

/// Feeds updates into an in-process procession and samples it at a fixed
/// interval of event time.
pub struct LocalProcessionSink {
    procession: Procession,
    writers: Vec<Box<dyn StatisticsWriter>>,
    checkpoint_interval: Duration,
    next_checkpoint: Option<DateTime<Utc>>,
    last_checkpoint: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    checkpoints: usize,
}

impl LocalProcessionSink {
    /// Intervals below one second are raised to one second.
    pub fn new(procession: Procession, checkpoint_interval: Duration) -> Self {
        Self {
            procession,
            writers: Vec::new(),
            checkpoint_interval: checkpoint_interval.max(Duration::seconds(1)),
            next_checkpoint: None,
            last_checkpoint: None,
            last_seen: None,
            checkpoints: 0,
        }
    }

    pub fn with_writer(mut self, writer: Box<dyn StatisticsWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn procession(&self) -> &Procession {
        &self.procession
    }

    pub fn checkpoints(&self) -> usize {
        self.checkpoints
    }

    fn checkpoint(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.procession.compute(at);
        for writer in &mut self.writers {
            writer.checkpoint(&self.procession, at)?;
        }
        self.checkpoints += 1;
        self.last_checkpoint = Some(at);
        debug!(
            "Checkpoint {}: head {:.0} m, tail {:.0} m, {} participant(s)",
            at,
            self.procession.head_position(),
            self.procession.tail_position(),
            self.procession.participant_count()
        );
        Ok(())
    }

    /// Runs every checkpoint due before `until`, or up to and including it
    /// when `inclusive` is set. A checkpoint at `t` sees the updates stamped `t`.
    fn run_due_checkpoints(&mut self, until: DateTime<Utc>, inclusive: bool) -> Result<()> {
        while let Some(next) = self.next_checkpoint {
            if next > until || (next == until && !inclusive) {
                break;
            }
            self.checkpoint(next)?;
            self.next_checkpoint = Some(next + self.checkpoint_interval);
        }
        Ok(())
    }
}

#[async_trait]
impl ParticipantSink for LocalProcessionSink {
    async fn deliver(&mut self, update: &ParticipantUpdate) -> Result<()> {
        if self.next_checkpoint.is_none() {
            self.next_checkpoint = Some(update.timestamp + self.checkpoint_interval);
        }
        self.run_due_checkpoints(update.timestamp, false)?;

        self.procession.update(update);
        self.last_seen = Some(
            self.last_seen
                .map_or(update.timestamp, |last| last.max(update.timestamp)),
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(last) = self.last_seen {
            self.run_due_checkpoints(last, true)?;
            if self.last_checkpoint != Some(last) {
                self.checkpoint(last)?;
            }
        }
        for writer in &mut self.writers {
            writer.finish()?;
        }
        info!(
            "Procession on '{}' finished after {} checkpoint(s): head {:.0} m, tail {:.0} m",
            self.procession.route().name(),
            self.checkpoints,
            self.procession.head_position(),
            self.procession.tail_position()
        );
        Ok(())
    }
}
