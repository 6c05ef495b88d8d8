use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use common::{ParticipantUpdate, Route};
use tracing::{debug, info};

use crate::clock::{Pacing, ReplayClock};
use crate::log::ReplaySummary;
use crate::sink::ParticipantSink;

/// Synthesizes participants skating the whole route at a constant speed.
///
/// Participant `i` of `count` starts `i * start_period / count` after the
/// start, so the group spreads over the route like a real procession does.
pub struct ConstantSpeedPlayer {
    route: Route,
    speed_kmh: f64,
    count: usize,
    start_period: Duration,
    tick: Duration,
    start: DateTime<Utc>,
}

impl ConstantSpeedPlayer {
    pub fn new(route: Route, speed_kmh: f64, start: DateTime<Utc>) -> Result<Self> {
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            bail!("Speed must be a positive number of km/h, got {}", speed_kmh);
        }
        Ok(Self {
            route,
            speed_kmh,
            count: 1,
            start_period: Duration::zero(),
            tick: Duration::seconds(5),
            start,
        })
    }

    pub fn set_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            bail!("At least one participant is needed");
        }
        self.count = count;
        Ok(())
    }

    pub fn set_start_period(&mut self, start_period: Duration) -> Result<()> {
        let start_period = start_period.max(Duration::zero());
        if self.start.checked_add_signed(start_period).is_none() {
            bail!("Start period of {} is out of range", start_period);
        }
        self.start_period = start_period;
        Ok(())
    }

    pub fn set_tick(&mut self, tick: Duration) -> Result<()> {
        if tick <= Duration::zero() {
            bail!("Tick must be positive");
        }
        self.tick = tick;
        Ok(())
    }

    pub fn device_id(index: usize) -> String {
        format!("speed-player-{}", index)
    }

    fn start_of(&self, index: usize) -> DateTime<Utc> {
        // Never more than the start period, which fits after `start`
        let offset_ms = i128::from(self.start_period.num_milliseconds()) * index as i128
            / self.count as i128;
        self.start + Duration::milliseconds(offset_ms as i64)
    }

    fn position_of(&self, index: usize, at: DateTime<Utc>) -> Option<f64> {
        let elapsed = (at - self.start_of(index)).num_milliseconds();
        if elapsed < 0 {
            return None;
        }
        let meters = self.speed_kmh / 3.6 * elapsed as f64 / 1000.0;
        Some(meters.min(self.route.length()))
    }

    /// Time at which the last participant reaches the end of the route
    pub fn end_time(&self) -> Result<DateTime<Utc>> {
        let travel_ms = self.route.length() / (self.speed_kmh / 3.6) * 1000.0;
        Duration::try_milliseconds(travel_ms.ceil() as i64)
            .and_then(|travel| self.start_of(self.count - 1).checked_add_signed(travel))
            .with_context(|| {
                format!(
                    "At {} km/h the route '{}' takes too long to skate",
                    self.speed_kmh,
                    self.route.name()
                )
            })
    }

    /// Updates for all participants that are under way at `at`. A participant
    /// reports the end of the route on the first tick it gets there and is
    /// silent afterwards.
    pub fn updates_at(&self, at: DateTime<Utc>) -> Vec<ParticipantUpdate> {
        let length = self.route.length();
        (0..self.count)
            .filter_map(|i| {
                let position = self.position_of(i, at)?;
                if position >= length {
                    let previous = at
                        .checked_sub_signed(self.tick)
                        .and_then(|before| self.position_of(i, before))
                        .unwrap_or(0.0);
                    if previous >= length {
                        return None;
                    }
                }
                Some(ParticipantUpdate::new(
                    Self::device_id(i),
                    self.route.position_at(position),
                    at,
                ))
            })
            .collect()
    }

    pub async fn play<S>(&self, sink: &mut S, pacing: Pacing) -> Result<ReplaySummary>
    where
        S: ParticipantSink + ?Sized,
    {
        let end = self.end_time()?;
        info!(
            "Playing {} participant(s) at {} km/h on '{}' ({:.1} km) until {}",
            self.count,
            self.speed_kmh,
            self.route.name(),
            self.route.length() / 1000.0,
            end
        );

        let clock = ReplayClock::new(self.start, pacing);
        let mut summary = ReplaySummary::default();
        let mut at = self.start;
        loop {
            clock.wait_until(at).await;
            let updates = self.updates_at(at);
            debug!("{}: {} update(s)", at, updates.len());
            for update in &updates {
                sink.deliver(update).await?;
                summary.record(update.timestamp);
            }
            if at >= end {
                break;
            }
            at = at
                .checked_add_signed(self.tick)
                .context("Replay ran past the last representable time")?;
        }

        sink.finish().await?;
        Ok(summary)
    }
}
