/// Number of equal route segments the procession statistics are computed over
pub const DEFAULT_STATISTICS_SEGMENTS: usize = 200;

/// Seconds a participant stays part of the procession without a new position
pub const DEFAULT_MAX_PARTICIPANT_AGE_SECS: i64 = 300;

/// Maximum distance in metres between a position and the route
pub const DEFAULT_MAX_DISTANCE_TO_ROUTE_M: f64 = 200.0;

/// Gap in metres that splits two groups of participants
pub const DEFAULT_MAX_GAP_M: f64 = 1000.0;

/// Speeds above this are treated as GPS jumps
pub const DEFAULT_MAX_PLAUSIBLE_SPEED_KMH: f64 = 60.0;

/// Length covered by the procession length profile, in metres
pub const MAX_PROCESSION_LENGTH_M: f64 = 6000.0;

/// Number of samples in the procession length profile
pub const PROCESSION_PROFILE_SEGMENTS: usize = 100;

/// Default event duration used when an event file carries none
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 240;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
