use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::FileRecord;
use crate::error::OsdrError;
use crate::resolve::ResolvedUrl;

pub trait FileClient: Send + Sync {
    fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, OsdrError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeMismatch {
    pub expected: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Success {
        size_bytes: u64,
        url: String,
        size_mismatch: Option<SizeMismatch>,
    },
    Failed {
        last_error: String,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }

    pub fn size_mismatch(&self) -> Option<SizeMismatch> {
        match self {
            DownloadOutcome::Success { size_mismatch, .. } => *size_mismatch,
            DownloadOutcome::Failed { .. } => None,
        }
    }
}

pub struct Downloader<'a, F: FileClient> {
    client: &'a F,
}

impl<'a, F: FileClient> Downloader<'a, F> {
    pub fn new(client: &'a F) -> Self {
        Self { client }
    }

    pub fn download(
        &self,
        record: &FileRecord,
        urls: &ResolvedUrl,
        destination: &Path,
    ) -> DownloadOutcome {
        let created = match prepare_parent(destination) {
            Ok(created) => created,
            Err(err) => {
                warn!(file = %record.filename, error = %err, "cannot create destination directory");
                return DownloadOutcome::Failed {
                    last_error: err.to_string(),
                };
            }
        };
        let mut last_error = "no download candidates".to_string();
        for (index, url) in urls.candidates().iter().enumerate() {
            if index > 0 {
                info!(file = %record.filename, %url, "trying fallback url");
            }
            match self.fetch_atomic(url, destination) {
                Ok(size_bytes) => {
                    let size_mismatch = record
                        .size_bytes
                        .filter(|expected| *expected != size_bytes)
                        .map(|expected| SizeMismatch {
                            expected,
                            actual: size_bytes,
                        });
                    if let Some(mismatch) = size_mismatch {
                        warn!(
                            file = %record.filename,
                            expected = mismatch.expected,
                            actual = mismatch.actual,
                            "downloaded size differs from reported size"
                        );
                    }
                    return DownloadOutcome::Success {
                        size_bytes,
                        url: url.clone(),
                        size_mismatch,
                    };
                }
                Err(err) => {
                    warn!(file = %record.filename, %url, error = %err, "download attempt failed");
                    last_error = err.to_string();
                }
            }
        }
        for dir in created {
            let _ = fs::remove_dir(dir);
        }
        DownloadOutcome::Failed { last_error }
    }

    fn fetch_atomic(&self, url: &str, destination: &Path) -> Result<u64, OsdrError> {
        let parent = destination
            .parent()
            .ok_or_else(|| OsdrError::Filesystem("invalid destination path".to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".osdr-fetch")
            .tempfile_in(parent)
            .map_err(|err| OsdrError::Filesystem(err.to_string()))?;
        let size = self.client.fetch_to(url, temp.path())?;
        temp.persist(destination)
            .map_err(|err| OsdrError::Filesystem(err.to_string()))?;
        Ok(size)
    }
}

// Returns the directories this call created, deepest first.
fn prepare_parent(destination: &Path) -> Result<Vec<PathBuf>, OsdrError> {
    let parent = destination
        .parent()
        .ok_or_else(|| OsdrError::Filesystem("invalid destination path".to_string()))?;
    let created: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .map(Path::to_path_buf)
        .collect();
    fs::create_dir_all(parent).map_err(|err| OsdrError::Filesystem(err.to_string()))?;
    Ok(created)
}
