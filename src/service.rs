use anyhow::Context;
use std::env;
use std::path::Path;
use tracing::{error, info, warn};

use crate::{
    error::DriverError,
    helpers::{
        abf::{AbfParser, ParserOptions},
        actitime::TimeTrackWriter,
    },
    models::abf::BatchEntry,
};

/// Configuration for batch submission
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Comment attached to every time track written
    pub comment: String,
    /// Rows carry hours, actiTIME stores minutes
    pub minutes_per_hour: u32,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            comment: String::new(),
            minutes_per_hour: 60,
        }
    }
}

impl SubmitConfig {
    /// Reads `ACTITIME_COMMENT`, falling back to defaults when unset.
    pub fn from_env() -> Self {
        Self {
            comment: env::var("ACTITIME_COMMENT").unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct SubmitReport {
    pub entries: usize,
    pub rows: usize,
    /// Server acknowledgments in submission order
    pub acknowledgments: Vec<serde_json::Value>,
}

/// Feeds parsed batch entries into an actiTIME writer, one row at a time.
#[derive(Debug, Clone, Default)]
pub struct BatchSubmitService {
    pub config: SubmitConfig,
}

impl BatchSubmitService {
    pub fn new(config: SubmitConfig) -> Self {
        info!("Creating new BatchSubmitService instance");
        Self { config }
    }

    /// Submits every entry in order, stopping at the first failure.
    pub async fn submit<W: TimeTrackWriter>(
        &self,
        writer: &mut W,
        entries: &[BatchEntry],
    ) -> Result<SubmitReport, DriverError> {
        let mut report = SubmitReport::default();

        for entry in entries {
            info!("Submitting entry {}", entry);

            if let Err(e) = writer.start(&entry.username, &entry.password).await {
                error!("Failed to start session for {}: {}", entry.username, e);
                return Err(e);
            }

            for row in &entry.timesheet_rows {
                if row.date().is_none() {
                    warn!(
                        "Row for task {} has no such calendar date {}, sending anyway",
                        row.task_id,
                        row.date_query()
                    );
                }

                let minutes = i64::from(row.hours) * i64::from(self.config.minutes_per_hour);
                if minutes < 0 {
                    warn!(
                        "Row for task {} on {} has negative time {} minutes, sending anyway",
                        row.task_id,
                        row.date_query(),
                        minutes
                    );
                }
                match writer
                    .write_day_time_track(row, minutes, &self.config.comment)
                    .await
                {
                    Ok(ack) => {
                        report.rows += 1;
                        report.acknowledgments.push(ack);
                    }
                    Err(e) => {
                        error!(
                            "Failed to write {} on task {} for {}: {}",
                            row.date_query(),
                            row.task_id,
                            entry.username,
                            e
                        );
                        return Err(e);
                    }
                }
            }

            report.entries += 1;
        }

        info!(
            "Submitted {} entries with {} rows",
            report.entries, report.rows
        );
        Ok(report)
    }

    /// Parse a batch file, release it, then submit its entries.
    pub async fn process_file<W: TimeTrackWriter>(
        &self,
        writer: &mut W,
        path: impl AsRef<Path>,
        options: ParserOptions,
    ) -> anyhow::Result<SubmitReport> {
        let path = path.as_ref();
        info!("Processing batch file: {}", path.display());

        let mut parser = AbfParser::open(path)
            .with_context(|| format!("Error opening batch file {}", path.display()))?
            .with_options(options);
        let entries = parser.read();
        parser.close();
        let entries =
            entries.with_context(|| format!("Error parsing batch file {}", path.display()))?;

        self.submit(writer, &entries)
            .await
            .with_context(|| format!("Error submitting batch file {}", path.display()))
    }
}
