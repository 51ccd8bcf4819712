use std::collections::{BTreeSet, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::domain::{DatasetId, FileRecord};
use crate::error::OsdrError;
use crate::metadata::{
    FIELD_CATEGORY, FIELD_DATA_TYPE, FIELD_FILE_NAME, FIELD_FILE_SIZE, FIELD_MEASUREMENT,
    FIELD_PROTOCOL_REF, FIELD_REMOTE_URL, FIELD_TECHNOLOGY,
};

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<FileRecord>,
    pub entries: usize,
    pub duplicates_dropped: usize,
}

pub fn extract_records(dataset: &DatasetId, metadata: &Value) -> Result<Extraction, OsdrError> {
    let entries = metadata_entries(metadata)?;
    let mut seen = HashSet::new();
    let mut extraction = Extraction {
        entries: entries.len(),
        ..Extraction::default()
    };

    for entry in entries {
        let measurement = text(lookup(entry, FIELD_MEASUREMENT)).unwrap_or_default();
        let technology = text(lookup(entry, FIELD_TECHNOLOGY)).unwrap_or_default();
        let protocol_refs = text_set(lookup(entry, FIELD_PROTOCOL_REF));
        let entry_category = text(lookup(entry, FIELD_CATEGORY));

        for file in file_descriptors(entry) {
            let Some(filename) = text(file.field(FIELD_FILE_NAME)) else {
                continue;
            };
            if !seen.insert(filename.clone()) {
                extraction.duplicates_dropped += 1;
                continue;
            }

            let mut record = FileRecord::new(filename, dataset.clone());
            record.measurement_type = measurement.clone();
            record.technology_type = technology.clone();
            record.protocol_refs = protocol_refs.clone();
            record.category = text(file.field(FIELD_CATEGORY))
                .or_else(|| entry_category.clone())
                .unwrap_or_default();
            record.data_type = text(file.field(FIELD_DATA_TYPE)).unwrap_or_default();
            record.size_bytes = size(file.field(FIELD_FILE_SIZE));
            record.raw_url_hint = text(file.field(FIELD_REMOTE_URL));
            extraction.records.push(record);
        }
    }

    if extraction.duplicates_dropped > 0 {
        debug!(
            dropped = extraction.duplicates_dropped,
            "removed duplicate file entries"
        );
    }
    Ok(extraction)
}

fn metadata_entries(metadata: &Value) -> Result<&[Value], OsdrError> {
    match metadata {
        Value::Null => Ok(&[]),
        Value::Array(items) => Ok(items.as_slice()),
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                let message = error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(OsdrError::MetadataFormat(format!("API error: {message}")));
            }
            match map.get("data") {
                Some(Value::Array(items)) => Ok(items.as_slice()),
                Some(Value::Null) => Ok(&[]),
                _ => Err(OsdrError::MetadataFormat(
                    "expected a list of metadata records".to_string(),
                )),
            }
        }
        other => Err(OsdrError::MetadataFormat(format!(
            "expected a list of metadata records, got {}",
            json_kind(other)
        ))),
    }
}

enum FileDescriptor<'a> {
    Flat(&'a Value),
    Nested(&'a Value),
}

impl<'a> FileDescriptor<'a> {
    fn field(&self, key: &str) -> Option<&'a Value> {
        match self {
            FileDescriptor::Flat(entry) => lookup(entry, key),
            FileDescriptor::Nested(file) => {
                lookup(file, key.strip_prefix("file.").unwrap_or(key))
            }
        }
    }
}

fn file_descriptors(entry: &Value) -> Vec<FileDescriptor<'_>> {
    if entry.get(FIELD_FILE_NAME).is_some() {
        return vec![FileDescriptor::Flat(entry)];
    }
    match entry.get("file") {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .map(FileDescriptor::Nested)
            .collect(),
        Some(file @ Value::Object(_)) => vec![FileDescriptor::Nested(file)],
        _ => Vec::new(),
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(found) = value.get(path) {
        return Some(found);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(value.get(head)?, rest)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(raw) => clean(raw),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => items.iter().find_map(|item| text(Some(item))),
        _ => None,
    }
}

fn text_set(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|item| text(Some(item))).collect(),
        other => text(other).into_iter().collect(),
    }
}

fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(trimmed.to_string())
}

fn size(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn dataset() -> DatasetId {
        "OSD-101".parse().unwrap()
    }

    #[test]
    fn flat_records_are_extracted() {
        let metadata = json!([
            {
                "file.file_name": "GLDS-101_rna_seq_Normalized_Counts.csv",
                "file.data_type": "normalized counts",
                "file.file_size": 2048,
                "file.remote_url": "/geode-py/ws/studies/OSD-101/download?file=x",
                "file.category": "GeneLab Processed RNA-Seq Files",
                "assay.protocol ref": "GeneLab RNAseq data processing protocol",
                "investigation.study assays.study assay measurement type": "transcription profiling",
                "investigation.study assays.study assay technology type": "RNA Sequencing (RNA-Seq)"
            }
        ]);
        let extraction = extract_records(&dataset(), &metadata).unwrap();
        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.size_bytes, Some(2048));
        assert_eq!(record.measurement_type, "transcription profiling");
        assert!(record.protocol_refs.contains("GeneLab RNAseq data processing protocol"));
        assert_eq!(record.category, "GeneLab Processed RNA-Seq Files");
        assert!(record.raw_url_hint.is_some());
    }

    #[test]
    fn nested_entries_expand_every_file() {
        let metadata = json!({
            "data": [
                {
                    "investigation": {
                        "study assays": {
                            "study assay measurement type": "transcription profiling",
                            "study assay technology type": "RNA-Seq"
                        }
                    },
                    "assay": { "protocol ref": ["nucleic acid extraction", "sequencing"] },
                    "file": [
                        { "file_name": "a_R1.fastq.gz", "file_size": "100" },
                        { "file_name": "a_R2.fastq.gz", "file_size": null },
                        { "data_type": "orphan without a name" }
                    ]
                }
            ]
        });
        let extraction = extract_records(&dataset(), &metadata).unwrap();
        let names: Vec<_> = extraction.records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a_R1.fastq.gz", "a_R2.fastq.gz"]);
        assert_eq!(extraction.records[0].size_bytes, Some(100));
        assert_eq!(extraction.records[1].size_bytes, None);
        assert_eq!(extraction.records[1].technology_type, "RNA-Seq");
        assert_eq!(extraction.records[0].protocol_refs.len(), 2);
    }

    #[test]
    fn null_strings_are_treated_as_absent() {
        let metadata = json!([
            { "file.file_name": "x.txt", "file.remote_url": "null", "file.data_type": " " }
        ]);
        let extraction = extract_records(&dataset(), &metadata).unwrap();
        assert_eq!(extraction.records[0].raw_url_hint, None);
        assert_eq!(extraction.records[0].data_type, "");
    }

    #[test]
    fn first_occurrence_wins() {
        let metadata = json!([
            {
                "file.file_name": "shared.csv",
                "file.data_type": "sample table",
                "investigation.study assays.study assay measurement type": "transcription profiling"
            },
            {
                "file.file_name": "shared.csv",
                "file.data_type": "other",
                "investigation.study assays.study assay measurement type": "metabolite profiling"
            },
            { "file.file_name": "unique.csv" }
        ]);
        let extraction = extract_records(&dataset(), &metadata).unwrap();
        assert_eq!(extraction.entries, 3);
        assert_eq!(extraction.duplicates_dropped, 1);
        let names: Vec<_> = extraction.records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["shared.csv", "unique.csv"]);
        assert_eq!(extraction.records[0].measurement_type, "transcription profiling");
        assert_eq!(extraction.records[0].data_type, "sample table");
    }

    #[test]
    fn empty_responses_yield_no_records() {
        for metadata in [json!([]), json!({ "data": [] }), Value::Null] {
            let extraction = extract_records(&dataset(), &metadata).unwrap();
            assert!(extraction.records.is_empty());
        }
    }

    #[test]
    fn api_error_is_reported() {
        let err = extract_records(&dataset(), &json!({ "error": "bad query" })).unwrap_err();
        assert_matches!(err, OsdrError::MetadataFormat(message) if message.contains("bad query"));
    }

    #[test]
    fn unexpected_shape_is_reported() {
        let err = extract_records(&dataset(), &json!("nope")).unwrap_err();
        assert_matches!(err, OsdrError::MetadataFormat(_));
    }
}
