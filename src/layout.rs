use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Classification, DatasetId, FileRecord};
use crate::error::OsdrError;

pub const PROCESSED_DIR: &str = "GeneLab_processed_data_files";

#[derive(Debug, Clone)]
pub struct Layout {
    root: Utf8PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_dataset(dataset: &DatasetId, output_dir: Option<&str>) -> Self {
        match output_dir {
            Some(dir) => Self::new(dir),
            None => Self::new(default_output_dir(dataset)),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn group_dir(&self, record: &FileRecord) -> Utf8PathBuf {
        self.root.join(record.assay_group().path_segment())
    }

    pub fn destination(&self, record: &FileRecord) -> Utf8PathBuf {
        let dir = match record.classification() {
            Some(Classification::Processed) => self.group_dir(record).join(PROCESSED_DIR),
            Some(Classification::Raw) | None => self.group_dir(record),
        };
        dir.join(safe_file_name(&record.filename))
    }

    pub fn manifest_path(&self, dataset: &DatasetId) -> Utf8PathBuf {
        self.root.join(format!("{dataset}_manifest.tsv"))
    }

    pub fn ensure_root(&self) -> Result<(), OsdrError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| OsdrError::Filesystem(err.to_string()))
    }
}

pub fn default_output_dir(dataset: &DatasetId) -> String {
    format!("osdr_downloads_{dataset}")
}

fn safe_file_name(filename: &str) -> String {
    match filename {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => filename
            .replace('%', "%25")
            .replace('/', "%2F")
            .replace('\\', "%5C"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, classification: Classification) -> FileRecord {
        let mut record = FileRecord::new(filename, "OSD-101".parse().unwrap());
        record.measurement_type = "transcription profiling".to_string();
        record.technology_type = "RNA-Seq".to_string();
        record.attach_classification(classification);
        record
    }

    #[test]
    fn layout_paths() {
        let layout = Layout::for_dataset(&"OSD-101".parse().unwrap(), None);
        assert_eq!(layout.root(), "osdr_downloads_OSD-101");

        let raw = layout.destination(&record("a_R1.fastq.gz", Classification::Raw));
        assert!(raw.ends_with("transcription_profiling_RNA_Seq/a_R1.fastq.gz"));

        let processed = layout.destination(&record("counts.csv", Classification::Processed));
        assert!(processed.ends_with(
            "transcription_profiling_RNA_Seq/GeneLab_processed_data_files/counts.csv"
        ));

        let manifest = layout.manifest_path(&"OSD-101".parse().unwrap());
        assert_eq!(manifest, "osdr_downloads_OSD-101/OSD-101_manifest.tsv");
    }

    #[test]
    fn filenames_cannot_escape_the_group_dir() {
        let layout = Layout::new("out");
        let path = layout.destination(&record("../../etc/passwd", Classification::Raw));
        assert!(path.starts_with("out/transcription_profiling_RNA_Seq"));
        assert_eq!(path.file_name(), Some("..%2F..%2Fetc%2Fpasswd"));
    }

    #[test]
    fn distinct_filenames_keep_distinct_destinations() {
        let layout = Layout::new("out");
        let names = ["a/b.csv", "a_b.csv", "a%2Fb.csv", "a\\b.csv", ".", ".."];
        let mut paths: Vec<_> = names
            .iter()
            .map(|name| layout.destination(&record(name, Classification::Raw)))
            .collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), names.len());
        let group = layout.group_dir(&record("x", Classification::Raw));
        assert!(paths.iter().all(|path| path.parent() == Some(group.as_path())));
    }
}
