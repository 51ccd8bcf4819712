use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::OsdrError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = OsdrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("OSD-")
            .ok_or_else(|| OsdrError::InvalidDatasetId(value.to_string()))?;
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(OsdrError::InvalidDatasetId(value.to_string()));
        }
        let number: u64 = digits
            .parse()
            .map_err(|_| OsdrError::InvalidDatasetId(value.to_string()))?;
        if number == 0 {
            return Err(OsdrError::InvalidDatasetId(value.to_string()));
        }
        Ok(Self(format!("OSD-{number}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Processed,
    Raw,
}

impl Classification {
    pub fn marker(self) -> &'static str {
        match self {
            Classification::Processed => "[GeneLab]",
            Classification::Raw => "[Raw]    ",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Processed => write!(f, "processed"),
            Classification::Raw => write!(f, "raw"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub filename: String,
    pub dataset_id: DatasetId,
    pub measurement_type: String,
    pub technology_type: String,
    pub data_type: String,
    pub protocol_refs: BTreeSet<String>,
    pub category: String,
    pub size_bytes: Option<u64>,
    pub raw_url_hint: Option<String>,
    classification: Option<Classification>,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, dataset_id: DatasetId) -> Self {
        Self {
            filename: filename.into(),
            dataset_id,
            measurement_type: String::new(),
            technology_type: String::new(),
            data_type: String::new(),
            protocol_refs: BTreeSet::new(),
            category: String::new(),
            size_bytes: None,
            raw_url_hint: None,
            classification: None,
        }
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    pub fn attach_classification(&mut self, classification: Classification) -> Classification {
        *self.classification.get_or_insert(classification)
    }

    pub fn assay_group(&self) -> AssayGroup {
        AssayGroup::new(&self.measurement_type, &self.technology_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssayGroup {
    pub measurement: String,
    pub technology: String,
}

impl AssayGroup {
    pub fn new(measurement: &str, technology: &str) -> Self {
        Self {
            measurement: measurement.trim().to_string(),
            technology: technology.trim().to_string(),
        }
    }

    pub fn path_segment(&self) -> String {
        let measurement = non_empty_or_unknown(&self.measurement);
        let technology = non_empty_or_unknown(&self.technology);
        format!("{measurement}_{technology}").replace([' ', '-'], "_")
    }
}

impl fmt::Display for AssayGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {}",
            non_empty_or_unknown(&self.measurement),
            non_empty_or_unknown(&self.technology)
        )
    }
}

fn non_empty_or_unknown(value: &str) -> &str {
    if value.is_empty() { "unknown" } else { value }
}

pub fn format_size(size_bytes: Option<u64>) -> String {
    let Some(size) = size_bytes.filter(|size| *size > 0) else {
        return "Unknown".to_string();
    };
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}
