use serde::Serialize;

use crate::domain::Classification;
use crate::download::DownloadOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithFailures,
    NothingFound,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::NothingFound => 2,
            RunStatus::CompletedWithFailures => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub dataset: String,
    pub status: RunStatus,
    pub list_only: bool,
    pub total: usize,
    pub processed: usize,
    pub raw: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub integrity_warnings: usize,
    pub duplicates_dropped: usize,
    pub filtered_out: usize,
    pub output_dir: String,
    pub manifest_path: Option<String>,
    pub filters: Vec<String>,
    pub started_at: String,
    pub finished_at: String,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub classification: Classification,
    pub group: String,
    pub size_bytes: Option<u64>,
    pub primary_url: String,
    pub local_path: String,
    pub outcome: Option<DownloadOutcome>,
}

#[derive(Debug, Default)]
pub struct ReportAggregator {
    processed: usize,
    raw: usize,
    downloaded: usize,
    failed: usize,
    integrity_warnings: usize,
    files: Vec<FileSummary>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, file: FileSummary) {
        match file.classification {
            Classification::Processed => self.processed += 1,
            Classification::Raw => self.raw += 1,
        }
        match &file.outcome {
            Some(outcome) if outcome.is_success() => {
                self.downloaded += 1;
                if outcome.size_mismatch().is_some() {
                    self.integrity_warnings += 1;
                }
            }
            Some(_) => self.failed += 1,
            None => {}
        }
        self.files.push(file);
    }

    pub fn status(&self) -> RunStatus {
        if self.files.is_empty() {
            RunStatus::NothingFound
        } else if self.failed > 0 {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Completed
        }
    }

    pub fn finish(self, context: SummaryContext) -> RunSummary {
        RunSummary {
            dataset: context.dataset,
            status: self.status(),
            list_only: context.list_only,
            total: self.files.len(),
            processed: self.processed,
            raw: self.raw,
            downloaded: self.downloaded,
            failed: self.failed,
            integrity_warnings: self.integrity_warnings,
            duplicates_dropped: context.duplicates_dropped,
            filtered_out: context.filtered_out,
            output_dir: context.output_dir,
            manifest_path: context.manifest_path,
            filters: context.filters,
            started_at: context.started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            files: self.files,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub dataset: String,
    pub list_only: bool,
    pub duplicates_dropped: usize,
    pub filtered_out: usize,
    pub output_dir: String,
    pub manifest_path: Option<String>,
    pub filters: Vec<String>,
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::SizeMismatch;

    fn file(classification: Classification, outcome: Option<DownloadOutcome>) -> FileSummary {
        FileSummary {
            filename: "f".to_string(),
            classification,
            group: "g".to_string(),
            size_bytes: None,
            primary_url: "u".to_string(),
            local_path: "p".to_string(),
            outcome,
        }
    }

    fn success(size_mismatch: Option<SizeMismatch>) -> Option<DownloadOutcome> {
        Some(DownloadOutcome::Success {
            size_bytes: 1,
            url: "u".to_string(),
            size_mismatch,
        })
    }

    #[test]
    fn empty_run_is_nothing_found() {
        let summary = ReportAggregator::new().finish(SummaryContext::default());
        assert_eq!(summary.status, RunStatus::NothingFound);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.status.exit_code(), 2);
    }

    #[test]
    fn counts_by_category_and_outcome() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record(file(Classification::Processed, success(None)));
        aggregator.record(file(
            Classification::Raw,
            success(Some(SizeMismatch {
                expected: 2,
                actual: 1,
            })),
        ));
        aggregator.record(file(
            Classification::Raw,
            Some(DownloadOutcome::Failed {
                last_error: "boom".to_string(),
            }),
        ));
        let summary = aggregator.finish(SummaryContext::default());
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.raw, 2);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.integrity_warnings, 1);
        assert_eq!(summary.status, RunStatus::CompletedWithFailures);
        assert_eq!(summary.status.exit_code(), 4);
    }

    #[test]
    fn list_only_run_completes() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record(file(Classification::Raw, None));
        assert_eq!(aggregator.status(), RunStatus::Completed);
    }
}
