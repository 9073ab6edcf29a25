//! Asynchronous vector export
//!
//! Pipelines hand finished feature collections to an [`ExportQueue`] and move
//! on; a background thread writes each one to `<output_dir>/<description>.geojson`.
//! Submission never blocks on the write. The host process calls
//! [`ExportQueue::finish`] before exiting to wait for outstanding jobs.

use crossbeam_channel::{unbounded, Sender};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use terraval_core::vector::FeatureCollection;

use crate::error::{AuditError, Result};

/// Output format of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    GeoJson,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GeoJson => "geojson",
        }
    }
}

/// A vector collection waiting to be written
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub description: String,
    pub format: ExportFormat,
    pub collection: FeatureCollection,
}

impl ExportJob {
    pub fn geojson(description: impl Into<String>, collection: FeatureCollection) -> Self {
        Self {
            description: description.into(),
            format: ExportFormat::GeoJson,
            collection,
        }
    }
}

pub type JobId = u64;

/// What happened to one submitted job
#[derive(Debug, Clone)]
pub struct ExportRecord {
    pub id: JobId,
    pub description: String,
    pub path: PathBuf,
    pub features: usize,
    /// `None` on success, the failure message otherwise
    pub error: Option<String>,
}

impl ExportRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Fire-and-forget export queue served by one writer thread
pub struct ExportQueue {
    sender: Option<Sender<(JobId, ExportJob)>>,
    worker: Option<JoinHandle<Vec<ExportRecord>>>,
    next_id: AtomicU64,
    output_dir: PathBuf,
}

impl ExportQueue {
    /// Create `output_dir` if needed and start the writer thread
    pub fn start(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| AuditError::io(&output_dir, e))?;

        let (tx, rx) = unbounded::<(JobId, ExportJob)>();
        let dir = output_dir.clone();
        let worker = std::thread::Builder::new()
            .name("export-writer".into())
            .spawn(move || {
                let mut records = Vec::new();
                for (id, job) in rx {
                    records.push(write_job(&dir, id, job));
                }
                records
            })
            .map_err(|e| AuditError::Export(format!("cannot start export thread: {e}")))?;

        Ok(Self {
            sender: Some(tx),
            worker: Some(worker),
            next_id: AtomicU64::new(1),
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Queue a job and return its id without waiting for the write
    pub fn submit(&self, job: ExportJob) -> Result<JobId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            id,
            description = %job.description,
            features = job.collection.len(),
            "export submitted"
        );
        self.sender
            .as_ref()
            .ok_or_else(|| AuditError::Export("export queue is closed".into()))?
            .send((id, job))
            .map_err(|_| AuditError::Export("export writer has stopped".into()))?;
        Ok(id)
    }

    /// Close the queue and wait until every submitted job is written
    pub fn finish(mut self) -> Result<Vec<ExportRecord>> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<Vec<ExportRecord>> {
        drop(self.sender.take());
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AuditError::Export("export writer panicked".into())),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for ExportQueue {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("{e}");
        }
    }
}

fn write_job(dir: &Path, id: JobId, job: ExportJob) -> ExportRecord {
    let start = Instant::now();
    let path = dir.join(format!("{}.{}", job.description, job.format.extension()));
    let features = job.collection.len();

    let result = (|| -> std::result::Result<(), String> {
        let body = match job.format {
            ExportFormat::GeoJson => serde_json::to_vec(&job.collection.to_geojson())
                .map_err(|e| e.to_string())?,
        };
        let mut file = std::fs::File::create(&path).map_err(|e| e.to_string())?;
        file.write_all(&body).map_err(|e| e.to_string())?;
        file.flush().map_err(|e| e.to_string())
    })();

    match &result {
        Ok(()) => tracing::info!(
            id,
            path = %path.display(),
            features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "export written"
        ),
        Err(e) => tracing::warn!(id, path = %path.display(), "export failed: {e}"),
    }

    ExportRecord {
        id,
        description: job.description,
        path,
        features,
        error: result.err(),
    }
}
