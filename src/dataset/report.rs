//! Append-only text report of curation runs.
//!
//! Each run appends a timestamped block to the statistics file, so the
//! file accumulates a history of runs rather than reflecting only the
//! latest one.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use super::clean::CleaningReport;
use super::stats::ColumnSummary;

const RULE: &str = "============================================================";

/// Writer for the human-readable statistics report.
pub struct ReportSink<W: Write> {
    writer: W,
}

impl ReportSink<std::fs::File> {
    /// Open the statistics file for appending, creating it if needed.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { writer: file })
    }
}

impl<W: Write> ReportSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Start a new run block with a UTC timestamp.
    pub fn write_run_header(&mut self) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", RULE)?;
        writeln!(
            self.writer,
            "Curation run: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(self.writer, "{}", RULE)?;
        Ok(())
    }

    /// Write the cleaning counts, one line per step, in the order the
    /// steps run.
    pub fn write_report(&mut self, report: &CleaningReport) -> anyhow::Result<()> {
        writeln!(self.writer, "Missing ID: {}", report.missing_id)?;
        writeln!(self.writer, "Duplication: {}", report.duplicates)?;
        writeln!(
            self.writer,
            "Mis-marked Authentic Images: {}",
            report.mis_marked
        )?;
        writeln!(self.writer, "{}", RULE)?;
        Ok(())
    }

    /// Write a describe-style block of column summaries under a label.
    pub fn write_summary(
        &mut self,
        label: &str,
        summaries: &[ColumnSummary],
    ) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", label)?;
        writeln!(
            self.writer,
            "{:<22} {:>8} {:>14} {:>14} {:>14} {:>14} {:>14}",
            "column", "count", "mean", "std", "min", "median", "max"
        )?;
        for s in summaries {
            writeln!(
                self.writer,
                "{:<22} {:>8} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4}",
                s.name, s.count, s.mean, s.std, s.min, s.median, s.max
            )?;
        }
        writeln!(self.writer, "{}", RULE)?;
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::summarize;

    #[test]
    fn test_report_lines_in_step_order() {
        let mut sink = ReportSink::new(Vec::new());
        sink.write_report(&CleaningReport {
            missing_id: 2,
            duplicates: 3,
            mis_marked: 1,
        })
        .unwrap();

        let out = String::from_utf8(sink.writer).unwrap();
        let missing = out.find("Missing ID: 2").unwrap();
        let dup = out.find("Duplication: 3").unwrap();
        let mis = out.find("Mis-marked Authentic Images: 1").unwrap();
        assert!(missing < dup && dup < mis);
        assert!(out.ends_with(&format!("{}\n", RULE)));
    }

    #[test]
    fn test_run_header_contains_timestamp_between_rules() {
        let mut sink = ReportSink::new(Vec::new());
        sink.write_run_header().unwrap();

        let out = String::from_utf8(sink.writer).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RULE);
        assert!(lines[1].starts_with("Curation run: "));
        assert!(lines[1].ends_with("UTC"));
        assert_eq!(lines[2], RULE);
    }

    #[test]
    fn test_summary_block_lists_each_column() {
        let mut sink = ReportSink::new(Vec::new());
        let summaries = vec![
            summarize("Views", &[1.0, 2.0, 3.0]),
            summarize("Likes", &[5.0, 5.0]),
        ];
        sink.write_summary("Validated table", &summaries).unwrap();

        let out = String::from_utf8(sink.writer).unwrap();
        assert!(out.starts_with("Validated table\n"));
        assert!(out.contains("Views"));
        assert!(out.contains("Likes"));
    }
}
