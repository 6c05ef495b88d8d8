use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::participant::ParticipantUpdate;
use crate::route::Route;
use crate::segments::SegmentedLinearRoute;
use crate::{
    DEFAULT_MAX_DISTANCE_TO_ROUTE_M, DEFAULT_MAX_GAP_M, DEFAULT_MAX_PARTICIPANT_AGE_SECS,
    DEFAULT_MAX_PLAUSIBLE_SPEED_KMH, DEFAULT_STATISTICS_SEGMENTS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessionConfig {
    pub max_participant_age: Duration,
    pub max_distance_to_route: f64,
    pub max_gap: f64,
    pub statistics_segments: usize,
    pub max_plausible_speed_kmh: f64,
}

impl Default for ProcessionConfig {
    fn default() -> Self {
        Self {
            max_participant_age: Duration::seconds(DEFAULT_MAX_PARTICIPANT_AGE_SECS),
            max_distance_to_route: DEFAULT_MAX_DISTANCE_TO_ROUTE_M,
            max_gap: DEFAULT_MAX_GAP_M,
            statistics_segments: DEFAULT_STATISTICS_SEGMENTS,
            max_plausible_speed_kmh: DEFAULT_MAX_PLAUSIBLE_SPEED_KMH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    OnRoute(f64),
    OffRoute,
    /// Older than the last position known for the device
    Outdated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStatistics {
    pub n_participants: usize,
    /// Mean speed in km/h, NaN when no participant in the segment has one
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub segments: Vec<SegmentStatistics>,
}

#[derive(Debug, Clone)]
struct Participant {
    /// None while off the route
    linear_position: Option<f64>,
    last_update: DateTime<Utc>,
    last_on_route: Option<(f64, DateTime<Utc>)>,
    speed: Option<f64>,
}

/// The group of participants moving along a route.
pub struct Procession {
    route: Route,
    config: ProcessionConfig,
    participants: HashMap<String, Participant>,
    head: f64,
    tail: f64,
    in_procession: usize,
    statistics: Option<Statistics>,
}

impl Procession {
    pub fn new(route: Route, config: ProcessionConfig) -> Self {
        Self {
            route,
            config,
            participants: HashMap::new(),
            head: 0.0,
            tail: 0.0,
            in_procession: 0,
            statistics: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn update(&mut self, update: &ParticipantUpdate) -> UpdateOutcome {
        let config = &self.config;
        let route = &self.route;
        let participant = self
            .participants
            .entry(update.device_id.clone())
            .or_insert_with(|| Participant {
                linear_position: None,
                last_update: update.timestamp,
                last_on_route: None,
                speed: None,
            });

        if update.timestamp < participant.last_update {
            trace!("Ignoring outdated position for {}", update.device_id);
            return UpdateOutcome::Outdated;
        }
        participant.last_update = update.timestamp;

        let hint = participant.last_on_route.map(|(position, _)| position);
        let Some(projection) = route.project(update.position(), config.max_distance_to_route, hint)
        else {
            participant.linear_position = None;
            return UpdateOutcome::OffRoute;
        };
        let position = projection.linear_position;

        if let Some((previous, previous_time)) = participant.last_on_route {
            let elapsed = (update.timestamp - previous_time).num_milliseconds() as f64 / 1000.0;
            if elapsed > 0.0 {
                let speed = (position - previous) / elapsed * 3.6;
                if (0.0..=config.max_plausible_speed_kmh).contains(&speed) {
                    participant.speed = Some(speed);
                } else {
                    trace!("Implausible speed {:.1} km/h for {}", speed, update.device_id);
                }
            }
        }

        participant.linear_position = Some(position);
        participant.last_on_route = Some((position, update.timestamp));
        UpdateOutcome::OnRoute(position)
    }

    /// Drops stale participants and recomputes head, tail and statistics as of `now`.
    pub fn compute(&mut self, now: DateTime<Utc>) {
        let max_age = self.config.max_participant_age;
        let before = self.participants.len();
        self.participants
            .retain(|_, p| now.signed_duration_since(p.last_update) <= max_age);
        if self.participants.len() != before {
            debug!(
                "Dropped {} stale participant(s)",
                before - self.participants.len()
            );
        }

        let mut on_route: Vec<(f64, Option<f64>)> = self
            .participants
            .values()
            .filter_map(|p| p.linear_position.map(|pos| (pos, p.speed)))
            .collect();

        if on_route.is_empty() {
            self.in_procession = 0;
            self.statistics = None;
            return;
        }

        on_route.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Split at gaps; the largest group is the procession, ties go to the one further ahead
        let mut best = (0, 0);
        let mut start = 0;
        for i in 1..=on_route.len() {
            let split = i == on_route.len() || on_route[i].0 - on_route[i - 1].0 > self.config.max_gap;
            if split {
                let (best_start, best_end) = best;
                if i - start >= best_end - best_start {
                    best = (start, i);
                }
                start = i;
            }
        }

        let (first, last) = best;
        self.tail = on_route[first].0;
        self.head = on_route[last - 1].0;
        self.in_procession = last - first;

        let segmented = SegmentedLinearRoute::new(self.config.statistics_segments, self.route.length());
        let mut counts = vec![0usize; segmented.number_of_segments()];
        let mut speed_sums = vec![0.0f64; segmented.number_of_segments()];
        let mut speed_counts = vec![0usize; segmented.number_of_segments()];
        for (position, speed) in &on_route {
            let segment = segmented.segment_for_position(*position);
            counts[segment] += 1;
            if let Some(speed) = speed {
                speed_sums[segment] += speed;
                speed_counts[segment] += 1;
            }
        }

        let segments = counts
            .iter()
            .zip(speed_sums.iter().zip(speed_counts.iter()))
            .map(|(&n_participants, (&sum, &n))| SegmentStatistics {
                n_participants,
                speed: if n == 0 { f64::NAN } else { sum / n as f64 },
            })
            .collect();
        self.statistics = Some(Statistics { segments });
    }

    pub fn head_position(&self) -> f64 {
        self.head
    }

    pub fn tail_position(&self) -> f64 {
        self.tail
    }

    pub fn length(&self) -> f64 {
        self.head - self.tail
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    /// Participants currently tracked, on or off the route
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Participants in the procession as of the last `compute`
    pub fn procession_participant_count(&self) -> usize {
        self.in_procession
    }

    /// Mean speed of the participants between tail and head, in km/h
    pub fn mean_speed(&self) -> Option<f64> {
        let speeds: Vec<f64> = self
            .participants
            .values()
            .filter(|p| {
                p.linear_position
                    .is_some_and(|pos| pos >= self.tail && pos <= self.head)
            })
            .filter_map(|p| p.speed)
            .collect();
        if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        }
    }
}
