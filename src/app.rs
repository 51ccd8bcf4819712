use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::classify::classify_all;
use crate::config::ResolvedConfig;
use crate::domain::{Classification, DatasetId, FileRecord, format_size};
use crate::download::{DownloadOutcome, Downloader, FileClient};
use crate::error::OsdrError;
use crate::extract::extract_records;
use crate::filter::{FilterInput, FilterSpec};
use crate::layout::Layout;
use crate::manifest::{EntryStatus, ManifestRow, write_manifest};
use crate::metadata::MetadataClient;
use crate::report::{FileSummary, ReportAggregator, RunSummary, SummaryContext};
use crate::resolve::UrlResolver;

#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub dataset: String,
    pub filters: FilterInput,
    pub output_dir: Option<String>,
    pub list_only: bool,
    pub write_manifest: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub dataset: DatasetId,
    pub filters: FilterSpec,
    pub layout: Layout,
    pub list_only: bool,
    pub write_manifest: bool,
}

impl RunRequest {
    pub fn parse(input: RunInput, config: &ResolvedConfig) -> Result<Self, OsdrError> {
        let dataset: DatasetId = input.dataset.parse()?;
        let filters = FilterSpec::new(input.filters)?;
        let output_dir = input.output_dir.or_else(|| config.output_dir.clone());
        let layout = Layout::for_dataset(&dataset, output_dir.as_deref());
        Ok(Self {
            dataset,
            filters,
            layout,
            list_only: input.list_only,
            write_manifest: input.write_manifest.unwrap_or(config.write_manifest),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<M: MetadataClient, F: FileClient> {
    config: ResolvedConfig,
    metadata: M,
    files: F,
    resolver: UrlResolver,
}

impl<M: MetadataClient, F: FileClient> App<M, F> {
    pub fn new(config: ResolvedConfig, metadata: M, files: F) -> Self {
        let resolver = UrlResolver::from_config(&config);
        Self {
            config,
            metadata,
            files,
            resolver,
        }
    }

    pub fn execute(
        &self,
        input: RunInput,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, OsdrError> {
        let request = RunRequest::parse(input, &self.config)?;
        self.run(request, sink)
    }

    pub fn run(
        &self,
        request: RunRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, OsdrError> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let RunRequest {
            dataset,
            filters,
            layout,
            list_only,
            write_manifest: manifest_enabled,
        } = request;

        sink.event(ProgressEvent::new("phase=Connect; testing API connectivity"));
        self.metadata.check_connectivity()?;

        sink.event(ProgressEvent::new(format!(
            "phase=Query; requesting metadata for {dataset}"
        )));
        let start = Instant::now();
        let metadata = self.metadata.query_metadata(&dataset)?;
        let extraction = extract_records(&dataset, &metadata)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Extract; {} files in {} metadata records",
                extraction.records.len(),
                extraction.entries
            ),
            elapsed: Some(start.elapsed()),
        });
        if extraction.duplicates_dropped > 0 {
            sink.event(ProgressEvent::new(format!(
                "Removed {} duplicate file entries",
                extraction.duplicates_dropped
            )));
        }

        let mut records = extraction.records;
        classify_all(&mut records);
        let extracted = records.len();
        let records = filters.apply(records);
        let filtered_out = extracted - records.len();
        if !filters.is_empty() {
            sink.event(ProgressEvent::new(format!(
                "phase=Filter; kept {} of {extracted} files ({filters})",
                records.len()
            )));
        }

        let mut context = SummaryContext {
            dataset: dataset.to_string(),
            list_only,
            duplicates_dropped: extraction.duplicates_dropped,
            filtered_out,
            output_dir: layout.root().to_string(),
            manifest_path: None,
            filters: filters.describe(),
            started_at,
        };

        if records.is_empty() {
            sink.event(ProgressEvent::new("No files found matching the criteria."));
            info!(%dataset, "nothing to download");
            return Ok(ReportAggregator::new().finish(context));
        }

        if !list_only {
            layout.ensure_root()?;
        }

        let phase = if list_only { "Listing" } else { "Downloading" };
        sink.event(ProgressEvent::new(format!(
            "phase={phase}; {} files for {dataset}",
            records.len()
        )));

        let downloader = Downloader::new(&self.files);
        let mut aggregator = ReportAggregator::new();
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let classification = record.classification().unwrap_or(Classification::Raw);
            let urls = self.resolver.resolve(record);
            let destination = layout.destination(record);
            sink.event(ProgressEvent::new(describe_record(record, classification)));

            let outcome = if list_only {
                None
            } else {
                let start = Instant::now();
                let outcome = downloader.download(record, &urls, destination.as_std_path());
                sink.event(ProgressEvent {
                    message: describe_outcome(&record.filename, &outcome),
                    elapsed: Some(start.elapsed()),
                });
                Some(outcome)
            };

            rows.push(ManifestRow {
                filename: record.filename.clone(),
                classification: classification.to_string(),
                measurement_type: record.measurement_type.clone(),
                technology_type: record.technology_type.clone(),
                data_type: record.data_type.clone(),
                size_bytes: record.size_bytes,
                primary_url: urls.primary().to_string(),
                local_path: destination.to_string(),
                status: entry_status(outcome.as_ref()),
            });
            aggregator.record(FileSummary {
                filename: record.filename.clone(),
                classification,
                group: record.assay_group().to_string(),
                size_bytes: record.size_bytes,
                primary_url: urls.primary().to_string(),
                local_path: destination.to_string(),
                outcome,
            });
        }

        if manifest_enabled {
            let path = layout.manifest_path(&dataset);
            match write_manifest(&path, &rows) {
                Ok(()) => context.manifest_path = Some(path.to_string()),
                Err(err) => warn!(%path, error = %err, "manifest not written"),
            }
        }

        Ok(aggregator.finish(context))
    }
}

fn describe_record(record: &FileRecord, classification: Classification) -> String {
    let data_type = if record.data_type.is_empty() {
        "Unknown"
    } else {
        record.data_type.as_str()
    };
    format!(
        "{} {} ({}) - {}",
        classification.marker(),
        record.filename,
        format_size(record.size_bytes),
        data_type
    )
}

fn describe_outcome(filename: &str, outcome: &DownloadOutcome) -> String {
    match outcome {
        DownloadOutcome::Success {
            size_mismatch: Some(mismatch),
            ..
        } => format!(
            "  ! Downloaded {filename} with size {} (expected {})",
            mismatch.actual, mismatch.expected
        ),
        DownloadOutcome::Success { .. } => format!("  ✓ Downloaded: {filename}"),
        DownloadOutcome::Failed { last_error } => {
            format!("  ✗ Failed to download {filename}: {last_error}")
        }
    }
}

fn entry_status(outcome: Option<&DownloadOutcome>) -> EntryStatus {
    match outcome {
        None => EntryStatus::Listed,
        Some(DownloadOutcome::Failed { .. }) => EntryStatus::Failed,
        Some(outcome) if outcome.size_mismatch().is_some() => EntryStatus::SizeMismatch,
        Some(_) => EntryStatus::Downloaded,
    }
}
