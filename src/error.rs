use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum OsdrError {
    #[error("invalid dataset identifier: {0}")]
    #[diagnostic(help("dataset identifiers look like OSD-101"))]
    InvalidDatasetId(String),

    #[error("--{axis} and --exclude-{axis} cannot both be {value:?}")]
    ConflictingFilter { axis: &'static str, value: String },

    #[error("invalid filter value: {0}")]
    InvalidFilter(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("OSDR metadata request failed: {0}")]
    MetadataHttp(String),

    #[error("OSDR metadata endpoint returned status {status}: {message}")]
    MetadataStatus { status: u16, message: String },

    #[error("unexpected OSDR metadata response: {0}")]
    MetadataFormat(String),

    #[error("download request failed: {0}")]
    DownloadHttp(String),

    #[error("download returned status {status}")]
    DownloadStatus { status: u16 },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write manifest: {0}")]
    Manifest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connectivity,
    Transfer,
    Io,
}

impl OsdrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OsdrError::InvalidDatasetId(_)
            | OsdrError::ConflictingFilter { .. }
            | OsdrError::InvalidFilter(_)
            | OsdrError::ConfigRead(_)
            | OsdrError::ConfigParse(_) => ErrorKind::Configuration,
            OsdrError::MetadataHttp(_)
            | OsdrError::MetadataStatus { .. }
            | OsdrError::MetadataFormat(_) => ErrorKind::Connectivity,
            OsdrError::DownloadHttp(_) | OsdrError::DownloadStatus { .. } => ErrorKind::Transfer,
            OsdrError::Filesystem(_) | OsdrError::Manifest(_) => ErrorKind::Io,
        }
    }
}
