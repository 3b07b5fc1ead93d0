use std::sync::Mutex;

use safepost_types::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for "this verdict is wrong" reports.
///
/// Sinks accept every report regardless of its content. Nothing is stored,
/// deduplicated or forwarded by the default sink.
pub trait ReportSink: Send + Sync {
    fn submit(&self, report: &Report) -> Result<(), ReportError>;
}

/// Writes each report as one structured event on the `safepost::report` target.
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn submit(&self, report: &Report) -> Result<(), ReportError> {
        let result = &report.result;
        tracing::info!(
            target: "safepost::report",
            timestamp = %report.timestamp,
            safe = result.safe,
            message = %result.message,
            reasoning = %result.reasoning,
            emails = result.emails,
            address = result.address,
            phone_numbers = result.phone_numbers,
            license_plates = result.license_plates,
            redaction_suggestions = ?result.redaction_suggestions,
            "incorrect verdict reported"
        );
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ReportSink for MemoryReportSink {
    fn submit(&self, report: &Report) -> Result<(), ReportError> {
        let mut reports = self
            .reports
            .lock()
            .map_err(|_| ReportError::Unavailable("lock".into()))?;
        reports.push(report.clone());
        Ok(())
    }
}
