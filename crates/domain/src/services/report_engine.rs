//! Report generation and rendering contracts.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{ExportFormat, RenderedReport, ReportFilter, ReportOutput};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report type '{0}' is not supported by the scheduler")]
    UnsupportedReportType(String),

    #[error("Report query failed: {0}")]
    Query(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Excel rendering failed: {0}")]
    Excel(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// Produces report rows and totals for a resolved filter.
#[async_trait::async_trait]
pub trait ReportEngine: Send + Sync {
    async fn generate(&self, report_type: &str, filter: &ReportFilter) -> Result<ReportOutput, ReportError>;
}

/// Turns report output into a document stamped with `generated_at`.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        format: ExportFormat,
        report_type: &str,
        output: &ReportOutput,
        filter: &ReportFilter,
        generated_at: NaiveDateTime,
    ) -> Result<RenderedReport, RenderError>;
}

/// `{ReportType}_{from:%Y%m%d}_{to:%Y%m%d}.{xlsx|pdf}`
pub fn report_file_name(report_type: &str, filter: &ReportFilter, format: ExportFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        report_type,
        filter.date_from.format("%Y%m%d"),
        filter.date_to.format("%Y%m%d"),
        format.extension()
    )
}
