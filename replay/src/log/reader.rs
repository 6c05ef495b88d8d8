use anyhow::{Context, Result};
use common::ParticipantUpdate;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct LogReader;

impl LogReader {
    /// Reads a log file, or every log file below a directory, sorted by timestamp.
    pub fn read_path(path: &Path) -> Result<Vec<ParticipantUpdate>> {
        let files = if path.is_dir() {
            Self::list_log_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut entries = Vec::new();
        for file in &files {
            entries.extend(Self::read_file(file)?);
        }
        // Stable, so updates sharing a timestamp keep their file order
        entries.sort_by_key(|e| e.timestamp);

        info!(
            "Read {} log entries from {} file(s) under {:?}",
            entries.len(),
            files.len(),
            path
        );
        Ok(entries)
    }

    /// One JSON participant update per line. Blank lines and `#` comments are
    /// skipped, as are lines that do not parse.
    pub fn read_file(path: &Path) -> Result<Vec<ParticipantUpdate>> {
        let file =
            File::open(path).with_context(|| format!("Failed to open log file: {:?}", path))?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Self::read_lines(BufReader::new(reader), path)
    }

    fn read_lines<R: BufRead>(reader: R, path: &Path) -> Result<Vec<ParticipantUpdate>> {
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for (i, line_result) in reader.lines().enumerate() {
            let line = line_result
                .with_context(|| format!("Failed to read line {} of {:?}", i + 1, path))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match serde_json::from_str::<ParticipantUpdate>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    debug!("Skipping line {} of {:?}: {}", i + 1, path, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed line(s) in {:?}", skipped, path);
        }
        Ok(entries)
    }

    /// Log files below `dir`, recursively, in path order.
    pub fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
        fn find_log_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
            let entries =
                fs::read_dir(dir).with_context(|| format!("Failed to list directory: {:?}", dir))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    find_log_files(&path, files)?;
                } else if is_log_file(&path) {
                    files.push(path);
                }
            }
            Ok(())
        }

        let mut files = Vec::new();
        find_log_files(dir, &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn is_log_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.ends_with(".log") || name.ends_with(".log.gz") || name.ends_with(".jsonl")
}
