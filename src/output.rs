use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::report::{RunStatus, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write_summary(&mut stdout, summary)
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let line = console_line(&event);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
    }
}

fn console_line(event: &ProgressEvent) -> String {
    let message = event.message.trim_end();
    let message = match message.strip_prefix("phase=") {
        Some(rest) => match rest.split_once(';') {
            Some((phase, payload)) => format!("{phase}: {}", payload.trim()),
            None => rest.to_string(),
        },
        None => message.to_string(),
    };
    match event.elapsed {
        Some(elapsed) if elapsed.as_millis() >= 1000 => {
            format!("{message} [{:.1}s]", elapsed.as_secs_f64())
        }
        _ => message,
    }
}

pub fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    let rule = "=".repeat(60);
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Summary Report: {}", summary.dataset)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Total files: {}", summary.total)?;
    writeln!(out, "GeneLab processed files: {}", summary.processed)?;
    writeln!(out, "Raw data files: {}", summary.raw)?;
    if summary.duplicates_dropped > 0 {
        writeln!(out, "Duplicate entries removed: {}", summary.duplicates_dropped)?;
    }
    if summary.filtered_out > 0 {
        writeln!(out, "Excluded by filters: {}", summary.filtered_out)?;
    }
    if !summary.list_only {
        writeln!(out, "Downloaded: {}", summary.downloaded)?;
        writeln!(out, "Failed: {}", summary.failed)?;
        if summary.integrity_warnings > 0 {
            writeln!(out, "Size mismatches: {}", summary.integrity_warnings)?;
        }
        writeln!(out, "Output directory: {}", summary.output_dir)?;
    }
    if let Some(path) = &summary.manifest_path {
        writeln!(out, "Manifest: {path}")?;
    }

    writeln!(out)?;
    writeln!(out, "Applied filters:")?;
    if summary.filters.is_empty() {
        writeln!(out, "  None (all files)")?;
    } else {
        for line in &summary.filters {
            writeln!(out, "  {line}")?;
        }
    }

    match summary.status {
        RunStatus::NothingFound => writeln!(out, "\nNo files found matching the criteria.")?,
        RunStatus::CompletedWithFailures => {
            writeln!(out, "\nSome downloads failed; see the messages above.")?
        }
        RunStatus::Completed => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::report::{ReportAggregator, SummaryContext};

    #[test]
    fn phase_prefix_is_rendered_as_label() {
        let event = ProgressEvent {
            message: "phase=Query; requesting metadata for OSD-1".to_string(),
            elapsed: None,
        };
        assert_eq!(console_line(&event), "Query: requesting metadata for OSD-1");

        let event = ProgressEvent {
            message: "  ✓ Downloaded: a.csv".to_string(),
            elapsed: Some(Duration::from_millis(2500)),
        };
        assert_eq!(console_line(&event), "  ✓ Downloaded: a.csv [2.5s]");
    }

    #[test]
    fn summary_lists_filters_or_none() {
        let summary = ReportAggregator::new().finish(SummaryContext {
            dataset: "OSD-7".to_string(),
            output_dir: "out".to_string(),
            ..SummaryContext::default()
        });
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &summary).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Summary Report: OSD-7"));
        assert!(text.contains("None (all files)"));
        assert!(text.contains("No files found matching the criteria."));

        let summary = ReportAggregator::new().finish(SummaryContext {
            filters: vec!["File extensions: csv".to_string()],
            ..SummaryContext::default()
        });
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &summary).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("  File extensions: csv"));
        assert!(!text.contains("None (all files)"));
    }
}
