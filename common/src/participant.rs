use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LatLong;

/// One GPS fix reported by a participant's device. This is also the line
/// format of the recorded log files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ParticipantUpdate {
    pub fn new(
        device_id: impl Into<String>,
        position: LatLong,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            latitude: position.lat,
            longitude: position.lon,
            accuracy: None,
            timestamp,
        }
    }

    pub fn position(&self) -> LatLong {
        LatLong::new(self.latitude, self.longitude)
    }
}

/// Messages exchanged with the tracking server over the websocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WSMessage {
    ParticipantUpdate(ParticipantUpdate),
    RealTimeUpdate {
        head: f64,
        tail: f64,
        length: f64,
        participants: usize,
    },
    Shutdown,
}
