mod head_tail;
mod length;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use common::Procession;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub use head_tail::HeadTailWriter;
pub use length::ProcessionLengthWriter;

/// Samples a procession at every checkpoint and writes the result out.
pub trait StatisticsWriter: Send {
    fn checkpoint(&mut self, procession: &Procession, at: DateTime<Utc>) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Tab separated data file with `#` header comments.
pub struct DataFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DataFile {
    pub fn create(path: PathBuf, header: &[String]) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
            }
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create data file: {:?}", path))?;
        let mut writer = BufWriter::new(file);
        for line in header {
            writeln!(writer, "# {}", line)?;
        }
        Ok(Self { path, writer })
    }

    pub fn write_data_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .with_context(|| format!("Failed to write to {:?}", self.path))
    }

    pub fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `base` with `suffix` appended to its file name.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// `name` with everything but letters, digits and `-` replaced by `_`, safe
/// to use as part of an output file name.
pub fn file_stem_for(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Metres to kilometres
pub fn convert_position_for_output(meters: f64) -> f64 {
    meters / 1000.0
}

/// Speeds are kept in km/h already
pub fn convert_speed_for_output(kmh: f64) -> f64 {
    kmh
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
