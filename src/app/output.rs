//! Output persistence
//!
//! Writers receive the finalized records and the run summary once a run has
//! succeeded. Files are written on the blocking pool; the output directory is
//! created on demand and every file is written to a temporary path first and
//! then renamed into place.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::info;

use super::coordinator::RunSummary;
use super::models::DomainRecord;
use crate::constants::output;
use crate::errors::{PersistenceError, PersistenceResult};

/// Destination of a run's records
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Write the finalized records and the summary
    async fn write(&self, records: &[DomainRecord], summary: &RunSummary) -> PersistenceResult<()>;
}

/// Record file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// File extension of the format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Location of the files of one run: `<dir>/<stem>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Output directory
    pub dir: PathBuf,
    /// File name without extension
    pub stem: String,
}

impl OutputTarget {
    /// Create a target
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Path of the record file in `format`
    pub fn records_path(&self, format: OutputFormat) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.stem, format.extension()))
    }

    /// Path of the summary file
    pub fn summary_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", self.stem, output::SUMMARY_SUFFIX))
    }
}

/// Writes records as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    target: OutputTarget,
    write_summary: bool,
}

impl JsonFilePersistence {
    /// Writer for `target`, also writing the summary file
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            write_summary: true,
        }
    }

    /// Enable or disable the summary file
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.write_summary = enabled;
        self
    }
}

#[async_trait]
impl Persistence for JsonFilePersistence {
    async fn write(&self, records: &[DomainRecord], summary: &RunSummary) -> PersistenceResult<()> {
        let path = self.target.records_path(OutputFormat::Json);
        let records = records.to_vec();
        let written = path.clone();
        run_blocking(move || write_json(&path, &records)).await?;
        info!("Data saved to {}", written.display());

        if self.write_summary {
            write_summary(&self.target, summary).await?;
        }
        Ok(())
    }
}

/// Writes records as CSV with a header row
#[derive(Debug, Clone)]
pub struct CsvFilePersistence {
    target: OutputTarget,
    write_summary: bool,
}

impl CsvFilePersistence {
    /// Writer for `target`, also writing the summary file
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            write_summary: true,
        }
    }

    /// Enable or disable the summary file
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.write_summary = enabled;
        self
    }
}

#[async_trait]
impl Persistence for CsvFilePersistence {
    async fn write(&self, records: &[DomainRecord], summary: &RunSummary) -> PersistenceResult<()> {
        let path = self.target.records_path(OutputFormat::Csv);
        let records = records.to_vec();
        let written = path.clone();
        run_blocking(move || write_csv(&path, &records)).await?;
        info!("Data saved to {}", written.display());

        if self.write_summary {
            write_summary(&self.target, summary).await?;
        }
        Ok(())
    }
}

/// Fans out to several writers in order, stopping at the first error
#[derive(Default)]
pub struct MultiPersistence {
    writers: Vec<Arc<dyn Persistence>>,
}

impl MultiPersistence {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a writer
    pub fn with(mut self, writer: Arc<dyn Persistence>) -> Self {
        self.writers.push(writer);
        self
    }

    /// Number of writers
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Whether there are no writers
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

#[async_trait]
impl Persistence for MultiPersistence {
    async fn write(&self, records: &[DomainRecord], summary: &RunSummary) -> PersistenceResult<()> {
        for writer in &self.writers {
            writer.write(records, summary).await?;
        }
        Ok(())
    }
}

/// Build the persistence for a set of formats; the summary is written once
pub fn persistence_for(target: &OutputTarget, formats: &[OutputFormat]) -> MultiPersistence {
    let mut multi = MultiPersistence::new();
    for (index, format) in formats.iter().enumerate() {
        let first = index == 0;
        let writer: Arc<dyn Persistence> = match format {
            OutputFormat::Json => {
                Arc::new(JsonFilePersistence::new(target.clone()).with_summary(first))
            }
            OutputFormat::Csv => Arc::new(CsvFilePersistence::new(target.clone()).with_summary(first)),
        };
        multi = multi.with(writer);
    }
    multi
}

async fn write_summary(target: &OutputTarget, summary: &RunSummary) -> PersistenceResult<()> {
    let path = target.summary_path();
    let summary = summary.clone();
    run_blocking(move || write_json(&path, &summary)).await
}

async fn run_blocking<F>(task: F) -> PersistenceResult<()>
where
    F: FnOnce() -> PersistenceResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PersistenceError::Task {
            reason: e.to_string(),
        })?
}

fn ensure_parent(path: &Path) -> PersistenceResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created output directory: {}", parent.display());
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut serializer)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_csv(path: &Path, records: &[DomainRecord]) -> PersistenceResult<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    {
        let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(&tmp)?));
        for record in records {
            match record {
                DomainRecord::Price(price) => writer.serialize(price)?,
                DomainRecord::Schedule(schedule) => writer.serialize(schedule)?,
            }
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
