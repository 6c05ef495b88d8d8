#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{LatLong, ParticipantUpdate, Route};
use std::fs;
use std::io::Write;
use std::path::Path;

/// About 7.4 km heading east along 48N
pub fn east_points() -> Vec<LatLong> {
    vec![LatLong::new(48.0, 11.0), LatLong::new(48.0, 11.1)]
}

pub fn east_route() -> Route {
    Route::new("East", east_points()).expect("valid route")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 5, 10, 19, 0, 0).unwrap()
}

/// Update for `device` at `linear` metres along the east route, `secs` after `t0`
pub fn update_at(device: &str, linear: f64, secs: i64) -> ParticipantUpdate {
    ParticipantUpdate::new(
        device,
        east_route().position_at(linear),
        t0() + Duration::seconds(secs),
    )
}

pub fn write_route(dir: &Path, name: &str, points: &[LatLong]) -> Result<()> {
    let points: Vec<[f64; 2]> = points.iter().map(|p| [p.lat, p.lon]).collect();
    let json = serde_json::json!({ "name": name, "points": points });
    fs::create_dir_all(dir)?;
    fs::write(dir.join(format!("{name}.json")), serde_json::to_string(&json)?)?;
    Ok(())
}

pub fn write_log(path: &Path, updates: &[ParticipantUpdate]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    for update in updates {
        writeln!(file, "{}", serde_json::to_string(update)?)?;
    }
    Ok(())
}

/// Data rows of a statistics file, without `#` comments
pub fn data_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
