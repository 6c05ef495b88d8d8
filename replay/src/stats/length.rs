use anyhow::Result;
use chrono::{DateTime, Utc};
use common::{
    MAX_PROCESSION_LENGTH_M, PROCESSION_PROFILE_SEGMENTS, Procession, SegmentedLinearRoute,
};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    DataFile, StatisticsWriter, convert_position_for_output, convert_speed_for_output,
    format_time, with_suffix,
};

/// Speed profile of the procession measured backwards from its head.
///
/// Every checkpoint writes one row per profile segment:
/// `time  distance-from-head-km  speed-kmh`, where the speed is `-1` for
/// positions outside the procession or route segments without a usable
/// speed.
pub struct ProcessionLengthWriter {
    file: DataFile,
    profile: SegmentedLinearRoute,
}

impl ProcessionLengthWriter {
    pub fn create(base: &Path, route_name: &str) -> Result<Self> {
        Self::create_at(with_suffix(base, "-procession-length.dat"), route_name)
    }

    pub fn create_at(path: PathBuf, route_name: &str) -> Result<Self> {
        let header = vec![
            format!("route: {}", route_name),
            format!(
                "max procession length: {} km",
                convert_position_for_output(MAX_PROCESSION_LENGTH_M)
            ),
            "time\tdistance_from_head_km\tspeed_kmh".to_string(),
        ];
        Ok(Self {
            file: DataFile::create(path, &header)?,
            profile: SegmentedLinearRoute::new(PROCESSION_PROFILE_SEGMENTS, MAX_PROCESSION_LENGTH_M),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl StatisticsWriter for ProcessionLengthWriter {
    fn checkpoint(&mut self, procession: &Procession, at: DateTime<Utc>) -> Result<()> {
        let Some(statistics) = procession.statistics() else {
            debug!("No statistics available at {}", at);
            return Ok(());
        };

        let route = SegmentedLinearRoute::new(statistics.segments.len(), procession.route().length());
        let head = procession.head_position();
        let tail = procession.tail_position();
        let time = format_time(at);

        for i in 0..self.profile.number_of_segments() {
            let distance_from_head = self.profile.position_of_segment_start(i);
            let position_on_route = head - distance_from_head;
            let segment = &statistics.segments[route.segment_for_position(position_on_route)];

            let mut speed = segment.speed;
            if !speed.is_finite() || segment.n_participants == 0 {
                speed = -1.0;
            }
            if position_on_route < tail || position_on_route > head {
                speed = -1.0;
            }

            self.file.write_data_line(&format!(
                "{}\t{:.3}\t{:.1}",
                time,
                convert_position_for_output(distance_from_head),
                convert_speed_for_output(speed)
            ))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.file.finish()
    }
}
