use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use common::{Event, EventList, ParticipantUpdate, Procession, ProcessionConfig, RouteStore};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::clock::Pacing;
use crate::log::LogFilePlayer;
use crate::sink::LocalProcessionSink;
use crate::stats::{HeadTailWriter, ProcessionLengthWriter, file_stem_for};

/// Outcome of replaying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    pub start: DateTime<Utc>,
    pub route: String,
    pub delivered: usize,
    pub checkpoints: usize,
    pub output_base: PathBuf,
}

/// Replays the log of every confirmed event and writes its statistics files.
pub struct BatchRunner {
    events_dir: PathBuf,
    routes: RouteStore,
    output_dir: PathBuf,
    config: ProcessionConfig,
    checkpoint_interval: Duration,
}

impl BatchRunner {
    pub fn new(
        events_dir: impl Into<PathBuf>,
        routes_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            events_dir: events_dir.into(),
            routes: RouteStore::new(routes_dir),
            output_dir: output_dir.into(),
            config: ProcessionConfig::default(),
            checkpoint_interval: Duration::seconds(60),
        }
    }

    pub fn with_config(mut self, config: ProcessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// `<output>/<yyyy-mm-dd>-<route>`
    pub fn output_base(&self, event: &Event) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}",
            event.start.format("%Y-%m-%d"),
            file_stem_for(&event.route)
        ))
    }

    /// Route load failures abort the whole run.
    pub async fn run(&self, entries: Vec<ParticipantUpdate>) -> Result<Vec<EventReport>> {
        let events = EventList::load_dir(&self.events_dir)
            .with_context(|| format!("Failed to load events from {:?}", self.events_dir))?;
        let confirmed: Vec<&Event> = events.confirmed().collect();
        info!(
            "{} of {} event(s) in {:?} are confirmed",
            confirmed.len(),
            events.len(),
            self.events_dir
        );

        let mut player = LogFilePlayer::new(entries);
        player.set_pacing(Pacing::Unpaced);

        let mut reports = Vec::with_capacity(confirmed.len());
        for event in confirmed {
            reports.push(self.run_event(&mut player, event).await?);
        }
        Ok(reports)
    }

    async fn run_event(&self, player: &mut LogFilePlayer, event: &Event) -> Result<EventReport> {
        let route = self.routes.load(&event.route)?;
        let base = self.output_base(event);
        info!(
            "Event {} on '{}' ({:.1} km), writing to {:?}",
            event.start,
            route.name(),
            route.length() / 1000.0,
            base
        );

        let length_writer = ProcessionLengthWriter::create(&base, route.name())?;
        let head_tail_writer = HeadTailWriter::create(&base, route.name())?;
        let procession = Procession::new(route, self.config.clone());
        let mut sink = LocalProcessionSink::new(procession, self.checkpoint_interval)
            .with_writer(Box::new(length_writer))
            .with_writer(Box::new(head_tail_writer));

        player.set_from_date_time(event.start);
        player.set_to_date_time(event.end());
        let summary = player.replay(&mut sink).await?;
        if summary.delivered == 0 {
            warn!("No log entries for event {} on '{}'", event.start, event.route);
        }

        Ok(EventReport {
            start: event.start,
            route: event.route.clone(),
            delivered: summary.delivered,
            checkpoints: sink.checkpoints(),
            output_base: base,
        })
    }
}
