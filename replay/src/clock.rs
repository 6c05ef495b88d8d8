use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant};

/// Deadlines further out than this are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// How event time maps onto wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Deliver as fast as possible
    Unpaced,
    /// One real second covers `factor` seconds of event time
    TimeLapse(f64),
}

impl Pacing {
    pub fn time_lapse(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            bail!("Time lapse factor must be a positive number, got {}", factor);
        }
        Ok(Pacing::TimeLapse(factor))
    }
}

/// Sleeps until the wall-clock moment that corresponds to an event timestamp.
pub struct ReplayClock {
    origin: DateTime<Utc>,
    wall_origin: Instant,
    pacing: Pacing,
}

impl ReplayClock {
    pub fn new(origin: DateTime<Utc>, pacing: Pacing) -> Self {
        Self {
            origin,
            wall_origin: Instant::now(),
            pacing,
        }
    }

    /// Wall-clock deadline for `timestamp`; timestamps before the origin map to the origin.
    /// Offsets too large to represent saturate thirty years out.
    pub fn deadline(&self, timestamp: DateTime<Utc>) -> Instant {
        match self.pacing {
            Pacing::Unpaced => self.wall_origin,
            Pacing::TimeLapse(factor) => {
                let event_ms = (timestamp - self.origin).num_milliseconds().max(0) as f64;
                let offset = Duration::try_from_secs_f64(event_ms / 1000.0 / factor)
                    .map_or(FAR_FUTURE, |offset| offset.min(FAR_FUTURE));
                self.wall_origin + offset
            }
        }
    }

    pub async fn wait_until(&self, timestamp: DateTime<Utc>) {
        if self.pacing == Pacing::Unpaced {
            return;
        }
        let deadline = self.deadline(timestamp);
        if deadline > Instant::now() {
            tokio::time::sleep_until(deadline).await;
        }
    }
}
