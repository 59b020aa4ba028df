//! File-backed connector
//!
//! Reads a previously persisted series from a local CSV file with columns
//! `date,temperature,humidity,pressure`. Unlike the networked connectors
//! the day count is ignored: the file is the full history, all of it is
//! returned. `save` writes the same shape back out.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{SensorSource, SourceError, SourceId};
use crate::domain::{Reading, ReadingSeries};

pub struct FileBackedSource {
    path: PathBuf,
}

impl FileBackedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write a series to `path` in the connector's CSV shape.
    pub fn save(series: &ReadingSeries, path: &Path) -> Result<(), SourceError> {
        let mut writer = csv::Writer::from_path(path)?;
        for reading in series.iter() {
            writer.serialize(CsvRow::from(reading))?;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = series.len(), "series saved to file");
        Ok(())
    }
}

#[async_trait]
impl SensorSource for FileBackedSource {
    fn id(&self) -> SourceId {
        SourceId::FileBacked
    }

    async fn fetch(&self, _days: u32) -> Result<ReadingSeries, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::NotFound(self.path.clone()));
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut readings = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row?;
            readings.push(Reading {
                date: row.date,
                temperature: row.temperature,
                humidity: row.humidity.clamp(0.0, 100.0),
                pressure: row.pressure,
            });
        }

        info!(path = %self.path.display(), rows = readings.len(), "series loaded from file");
        Ok(ReadingSeries::new(readings))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    temperature: f64,
    humidity: f64,
    pressure: f64,
}

impl From<&Reading> for CsvRow {
    fn from(r: &Reading) -> Self {
        Self {
            date: r.date,
            temperature: r.temperature,
            humidity: r.humidity,
            pressure: r.pressure,
        }
    }
}
