//! Snapshot export of the composed dashboard view.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::dashboard::DashboardView;
use crate::error::ExportError;
use crate::logging::{self, obj, v_str, Domain};
use crate::poller::lock;

pub const EXPORT_FAILURE_MESSAGE: &str = "エクスポートに失敗しました。時間をおいて再試行してください。";

pub fn export_file_name(as_of: &str) -> String {
    format!("var-dashboard-{}.json", as_of)
}

#[async_trait]
pub trait SnapshotExporter: Send + Sync {
    async fn write(&self, file_name: &str, view: &DashboardView) -> Result<PathBuf, ExportError>;
}

/// Writes the view as pretty-printed JSON into a directory.
pub struct JsonFileExporter {
    dir: PathBuf,
}

impl JsonFileExporter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SnapshotExporter for JsonFileExporter {
    async fn write(&self, file_name: &str, view: &DashboardView) -> Result<PathBuf, ExportError> {
        let body = serde_json::to_vec_pretty(view)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportStatus {
    pub exporting: bool,
    /// Transient message shown after a failed export; cleared by the next attempt.
    pub error: Option<String>,
    pub last_path: Option<PathBuf>,
}

/// Clears the exporting flag however the export ends.
struct ExportingFlag<'a>(&'a Mutex<ExportStatus>);

impl Drop for ExportingFlag<'_> {
    fn drop(&mut self) {
        lock(self.0).exporting = false;
    }
}

pub struct ExportController<E> {
    exporter: E,
    status: Mutex<ExportStatus>,
}

impl<E: SnapshotExporter> ExportController<E> {
    pub fn new(exporter: E) -> Self {
        Self {
            exporter,
            status: Mutex::new(ExportStatus::default()),
        }
    }

    pub fn status(&self) -> ExportStatus {
        lock(&self.status).clone()
    }

    /// Export `view`. Without a summary, or while another export runs, this is a
    /// no-op returning `Ok(None)`.
    pub async fn export(&self, view: &DashboardView) -> Result<Option<PathBuf>, ExportError> {
        let Some(as_of) = view.as_of.as_deref() else {
            return Ok(None);
        };
        {
            let mut status = lock(&self.status);
            if status.exporting {
                return Ok(None);
            }
            status.exporting = true;
            status.error = None;
        }
        let _flag = ExportingFlag(&self.status);

        let file_name = export_file_name(as_of);
        match self.exporter.write(&file_name, view).await {
            Ok(path) => {
                logging::info(
                    Domain::Export,
                    "exported",
                    obj(&[("path", v_str(&path.display().to_string()))]),
                );
                lock(&self.status).last_path = Some(path.clone());
                Ok(Some(path))
            }
            Err(err) => {
                logging::error(
                    Domain::Export,
                    "export_failed",
                    obj(&[("file", v_str(&file_name)), ("msg", v_str(&err.to_string()))]),
                );
                lock(&self.status).error = Some(EXPORT_FAILURE_MESSAGE.to_string());
                Err(err)
            }
        }
    }
}
