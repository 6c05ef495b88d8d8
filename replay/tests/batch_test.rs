mod support;

use anyhow::Result;
use chrono::Duration;
use common::RouteError;
use replay::batch::BatchRunner;
use std::fs;
use std::path::Path;
use support::{data_lines, east_points, t0, update_at};

fn write_event(dir: &Path, file: &str, route: &str, status: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::json!({
        "start": "2013-05-10T19:00:00Z",
        "route": route,
        "status": status,
        "duration_minutes": 60,
    });
    fs::write(dir.join(file), serde_json::to_string(&json)?)?;
    Ok(())
}

fn recorded_log() -> Vec<common::ParticipantUpdate> {
    let mut updates = Vec::new();
    for secs in (0..=600).step_by(30) {
        for (device, start) in [("a", 1000.0), ("b", 1300.0), ("c", 1600.0)] {
            updates.push(update_at(device, start + secs as f64 * 4.0, secs));
        }
    }
    // Recorded the day before, outside the event window
    updates.push(update_at("early", 500.0, -86_400));
    updates
}

#[tokio::test]
async fn test_replays_each_confirmed_event() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let events_dir = dir.path().join("events");
    let routes_dir = dir.path().join("routes");
    let output_dir = dir.path().join("out");
    write_event(&events_dir, "2013-05-10.json", "East", "confirmed")?;
    write_event(&events_dir, "2013-05-17.json", "East", "cancelled")?;
    support::write_route(&routes_dir, "East", &east_points())?;

    let runner = BatchRunner::new(&events_dir, &routes_dir, &output_dir)
        .with_checkpoint_interval(Duration::seconds(60));
    let reports = runner.run(recorded_log()).await?;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.start, t0());
    assert_eq!(report.delivered, 21 * 3);
    // Every minute from 19:01 to 19:10, the last one doubling as the final checkpoint
    assert_eq!(report.checkpoints, 10);
    assert_eq!(report.output_base, output_dir.join("2013-05-10-East"));

    let profile = data_lines(&output_dir.join("2013-05-10-East-procession-length.dat"))?;
    assert_eq!(profile.len(), 10 * 100);
    let head_tail = data_lines(&output_dir.join("2013-05-10-East-head-tail.dat"))?;
    assert_eq!(head_tail.len(), 10);
    let times: Vec<&str> = head_tail.iter().filter_map(|row| row.split('\t').next()).collect();
    assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(times.last(), Some(&"2013-05-10T19:10:00Z"));
    assert!(output_dir.join("2013-05-10-East-length.json").is_file());
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_aborts_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let events_dir = dir.path().join("events");
    let routes_dir = dir.path().join("routes");
    write_event(&events_dir, "2013-05-10.json", "Missing", "confirmed")?;
    fs::create_dir_all(&routes_dir)?;

    let runner = BatchRunner::new(&events_dir, &routes_dir, dir.path().join("out"));
    let err = runner.run(recorded_log()).await.unwrap_err();

    assert!(err.chain().any(|cause| cause.is::<RouteError>()));
    Ok(())
}

#[tokio::test]
async fn test_no_confirmed_events() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let events_dir = dir.path().join("events");
    write_event(&events_dir, "2013-05-10.json", "East", "pending")?;

    let runner = BatchRunner::new(&events_dir, dir.path().join("routes"), dir.path().join("out"));
    let reports = runner.run(recorded_log()).await?;
    assert!(reports.is_empty());
    Ok(())
}
