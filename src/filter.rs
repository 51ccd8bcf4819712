use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::domain::{Classification, FileRecord};
use crate::error::OsdrError;

#[derive(Debug, Clone, Default)]
pub struct FilterInput {
    pub measurement: Option<String>,
    pub technology: Option<String>,
    pub include_ext: Option<String>,
    pub exclude_ext: Option<String>,
    pub include_search: Option<String>,
    pub exclude_search: Option<String>,
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone)]
pub struct TechnologyPattern {
    source: String,
    regex: Regex,
}

impl TechnologyPattern {
    pub fn compile(value: &str) -> Result<Self, OsdrError> {
        let pattern = value
            .split(['(', ')'])
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| OsdrError::InvalidFilter(err.to_string()))?;
        Ok(Self {
            source: value.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, technology: &str) -> bool {
        self.regex.is_match(technology)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    measurement: Option<String>,
    technology: Option<TechnologyPattern>,
    include_ext: Option<String>,
    exclude_ext: Option<String>,
    include_search: Option<String>,
    exclude_search: Option<String>,
    classification: Option<Classification>,
}

impl FilterSpec {
    pub fn new(input: FilterInput) -> Result<Self, OsdrError> {
        let include_ext = input.include_ext.as_deref().and_then(normalize_extension);
        let exclude_ext = input.exclude_ext.as_deref().and_then(normalize_extension);
        if let (Some(include), Some(exclude)) = (&include_ext, &exclude_ext) {
            if include == exclude {
                return Err(OsdrError::ConflictingFilter {
                    axis: "ext",
                    value: include.clone(),
                });
            }
        }

        let include_search = input.include_search.as_deref().and_then(normalize_search);
        let exclude_search = input.exclude_search.as_deref().and_then(normalize_search);
        if let (Some(include), Some(exclude)) = (&include_search, &exclude_search) {
            if include == exclude {
                return Err(OsdrError::ConflictingFilter {
                    axis: "search",
                    value: include.clone(),
                });
            }
        }

        let technology = input
            .technology
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(TechnologyPattern::compile)
            .transpose()?;

        Ok(Self {
            measurement: input
                .measurement
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            technology,
            include_ext,
            exclude_ext,
            include_search,
            exclude_search,
            classification: input.classification,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.measurement.is_none()
            && self.technology.is_none()
            && self.include_ext.is_none()
            && self.exclude_ext.is_none()
            && self.include_search.is_none()
            && self.exclude_search.is_none()
            && self.classification.is_none()
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        self.measurement_matches(record)
            && self.technology_matches(record)
            && self.extension_matches(record)
            && self.search_matches(record)
            && self.classification_matches(record)
    }

    pub fn apply(&self, records: Vec<FileRecord>) -> Vec<FileRecord> {
        let before = records.len();
        let retained: Vec<_> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();
        if !self.is_empty() {
            debug!(
                before,
                after = retained.len(),
                filters = %self,
                "applied filters"
            );
        }
        retained
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(value) = &self.measurement {
            lines.push(format!("Measurement type: {value}"));
        }
        if let Some(pattern) = &self.technology {
            lines.push(format!("Technology type: {}", pattern.as_str()));
        }
        if let Some(ext) = &self.include_ext {
            lines.push(format!("File extension (include): {ext}"));
        }
        if let Some(ext) = &self.exclude_ext {
            lines.push(format!("File extension (exclude): {ext}"));
        }
        if let Some(term) = &self.include_search {
            lines.push(format!("Filename search (include): {term}"));
        }
        if let Some(term) = &self.exclude_search {
            lines.push(format!("Filename search (exclude): {term}"));
        }
        if let Some(classification) = self.classification {
            lines.push(format!("Classification: {classification} only"));
        }
        lines
    }

    fn measurement_matches(&self, record: &FileRecord) -> bool {
        self.measurement.as_ref().is_none_or(|measurement| {
            record.measurement_type.trim().to_lowercase() == measurement.to_lowercase()
        })
    }

    fn technology_matches(&self, record: &FileRecord) -> bool {
        self.technology
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(&record.technology_type))
    }

    fn extension_matches(&self, record: &FileRecord) -> bool {
        let include = self
            .include_ext
            .as_deref()
            .is_none_or(|ext| has_extension(&record.filename, ext));
        let exclude = self
            .exclude_ext
            .as_deref()
            .is_some_and(|ext| has_extension(&record.filename, ext));
        include && !exclude
    }

    fn search_matches(&self, record: &FileRecord) -> bool {
        let filename = record.filename.to_lowercase();
        let include = self
            .include_search
            .as_deref()
            .is_none_or(|term| filename.contains(term));
        let exclude = self
            .exclude_search
            .as_deref()
            .is_some_and(|term| filename.contains(term));
        include && !exclude
    }

    fn classification_matches(&self, record: &FileRecord) -> bool {
        self.classification
            .is_none_or(|wanted| record.classification() == Some(wanted))
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.describe();
        if lines.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", lines.join("; "))
        }
    }
}

pub fn has_extension(filename: &str, ext: &str) -> bool {
    filename
        .to_lowercase()
        .ends_with(&format!(".{}", ext.to_lowercase()))
}

fn normalize_extension(value: &str) -> Option<String> {
    let ext = value.trim().trim_start_matches('.').to_lowercase();
    (!ext.is_empty()).then_some(ext)
}

fn normalize_search(value: &str) -> Option<String> {
    let term = value.trim().to_lowercase();
    (!term.is_empty()).then_some(term)
}
