mod support;

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use replay::log::LogReader;
use std::fs;
use std::io::Write;
use support::{t0, update_at};

#[test]
fn test_skips_comments_and_malformed_lines() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("server.log");
    let later = serde_json::to_string(&update_at("a", 100.0, 60))?;
    let earlier = serde_json::to_string(&update_at("b", 50.0, 0))?;
    fs::write(
        &path,
        format!("# recorded by the server\n\n{later}\nnot json at all\n{earlier}\n{{\"device_id\":\"c\"}}\n"),
    )?;

    let entries = LogReader::read_file(&path)?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].device_id, "a");

    let sorted = LogReader::read_path(&path)?;
    assert_eq!(sorted[0].device_id, "b");
    assert_eq!(sorted[0].timestamp, t0());
    Ok(())
}

#[test]
fn test_reads_directories_and_gzip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("2013");
    fs::create_dir_all(&nested)?;

    let file = fs::File::create(nested.join("a.log.gz"))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    writeln!(encoder, "{}", serde_json::to_string(&update_at("gz", 10.0, 30))?)?;
    encoder.finish()?;

    support::write_log(&dir.path().join("b.jsonl"), &[update_at("plain", 10.0, 10)])?;
    support::write_log(&dir.path().join("notes.txt"), &[update_at("ignored", 10.0, 0)])?;

    let files = LogReader::list_log_files(dir.path())?;
    assert_eq!(files.len(), 2);

    let entries = LogReader::read_path(dir.path())?;
    let devices: Vec<&str> = entries.iter().map(|e| e.device_id.as_str()).collect();
    assert_eq!(devices, vec!["plain", "gz"]);
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let err = LogReader::read_file(std::path::Path::new("/nonexistent/bladenight.log")).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to open log file"));
}
