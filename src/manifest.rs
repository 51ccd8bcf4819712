use std::fs;
use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::error::OsdrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Listed,
    Downloaded,
    SizeMismatch,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestRow {
    pub filename: String,
    pub classification: String,
    pub measurement_type: String,
    pub technology_type: String,
    pub data_type: String,
    pub size_bytes: Option<u64>,
    pub primary_url: String,
    pub local_path: String,
    pub status: EntryStatus,
}

pub fn write_manifest(path: &Utf8Path, rows: &[ManifestRow]) -> Result<(), OsdrError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| OsdrError::Filesystem(err.to_string()))?;
    }
    let file =
        fs::File::create(path.as_std_path()).map_err(|err| OsdrError::Filesystem(err.to_string()))?;
    write_rows(file, rows)
}

pub fn write_rows<W: Write>(writer: W, rows: &[ManifestRow]) -> Result<(), OsdrError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| OsdrError::Manifest(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| OsdrError::Manifest(err.to_string()))
}
