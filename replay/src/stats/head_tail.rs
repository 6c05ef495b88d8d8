use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::Procession;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{DataFile, StatisticsWriter, convert_position_for_output, format_time, with_suffix};

/// Head, tail and length over time, plus a JSON length series for the chart page.
pub struct HeadTailWriter {
    file: DataFile,
    series_path: PathBuf,
    series: Vec<(String, f64)>,
}

impl HeadTailWriter {
    pub fn create(base: &Path, route_name: &str) -> Result<Self> {
        let header = vec![
            format!("route: {}", route_name),
            "time\thead_km\ttail_km\tlength_km".to_string(),
        ];
        Ok(Self {
            file: DataFile::create(with_suffix(base, "-head-tail.dat"), &header)?,
            series_path: with_suffix(base, "-length.json"),
            series: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn series_path(&self) -> &Path {
        &self.series_path
    }
}

impl StatisticsWriter for HeadTailWriter {
    fn checkpoint(&mut self, procession: &Procession, at: DateTime<Utc>) -> Result<()> {
        if procession.statistics().is_none() {
            debug!("No procession at {}", at);
            return Ok(());
        }
        let time = format_time(at);
        let length = convert_position_for_output(procession.length());
        self.file.write_data_line(&format!(
            "{}\t{:.3}\t{:.3}\t{:.3}",
            time,
            convert_position_for_output(procession.head_position()),
            convert_position_for_output(procession.tail_position()),
            length
        ))?;
        self.series.push((time, length));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.file.finish()?;
        let file = File::create(&self.series_path)
            .with_context(|| format!("Failed to create series file: {:?}", self.series_path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.series)
            .with_context(|| format!("Failed to write series file: {:?}", self.series_path))?;
        writer.flush()?;
        Ok(())
    }
}
