pub mod parser;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ElectionError, Result};
use crate::storage::ResultStore;

pub use parser::{parse_csv, LineError, ParsedLine};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedLine {
    pub line: u64,
    pub reason: String,
}

/// Outcome of one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub processed_at: DateTime<Utc>,
    pub lines_read: usize,
    pub lines_applied: usize,
    pub lines_skipped: usize,
    pub rows_upserted: usize,
    pub ignored_pairs: usize,
    pub skipped: Vec<SkippedLine>,
}

impl IngestReport {
    fn new() -> Self {
        Self {
            processed_at: Utc::now(),
            lines_read: 0,
            lines_applied: 0,
            lines_skipped: 0,
            rows_upserted: 0,
            ignored_pairs: 0,
            skipped: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} lines read, {} applied, {} skipped, {} rows saved",
            self.lines_read, self.lines_applied, self.lines_skipped, self.rows_upserted
        )
    }
}

/// Rejects anything that does not look like a CSV upload by name.
pub fn ensure_csv_filename(filename: &str) -> Result<()> {
    if filename.ends_with(".csv") {
        Ok(())
    } else {
        Err(ElectionError::invalid_input("File must be a CSV."))
    }
}

/// Parses the upload and upserts every valid line.
///
/// Malformed lines are logged, recorded in the report and skipped; the rest
/// of the file still applies. Each row is committed as it is written, so a
/// storage failure part-way leaves earlier rows in place.
pub fn ingest_csv(store: &ResultStore, bytes: &[u8]) -> Result<IngestReport> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ElectionError::invalid_input(format!("upload is not valid UTF-8: {e}")))?;

    let mut report = IngestReport::new();
    let lines = parse_csv(text)
        .map_err(|e| ElectionError::invalid_input(format!("unreadable CSV upload: {e}")))?;
    for (line, parsed) in lines {
        report.lines_read += 1;
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(line, %error, "skipping malformed line");
                report.lines_skipped += 1;
                report.skipped.push(SkippedLine {
                    line,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        for code in parsed.unknown_codes() {
            debug!(line, code, "ignoring unknown party code");
            report.ignored_pairs += 1;
        }
        for result in parsed.results() {
            store.upsert(&result)?;
            report.rows_upserted += 1;
        }
        report.lines_applied += 1;
    }

    info!("{}", report.summary());
    Ok(report)
}
