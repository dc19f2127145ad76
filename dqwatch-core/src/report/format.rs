//! Report serialization.
//!
//! Rendering is pure: a report and a format go in, bytes come out. HTML and
//! Markdown are produced from askama templates over a precomputed string
//! view, CSV flattens the validation results, and PDF is a plain text
//! document built by [`super::pdf`].

use askama::Template;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::models::{QualityReport, ReportSummary};
use super::pdf;
use crate::error::{DqWatchError, Result};

string_enum! {
    /// Output format for a rendered report.
    pub enum ReportFormat {
        /// Pretty-printed JSON
        Json => "json",
        /// Standalone HTML page
        Html => "html",
        /// Validation results as CSV rows
        Csv => "csv",
        /// Markdown document
        Markdown => "markdown",
        /// Single-font text PDF
        Pdf => "pdf",
    }
    parse_error = |value: &str| DqWatchError::configuration(format!(
        "Unsupported report format '{value}': expected one of json, html, csv, markdown, pdf"
    ));
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl ReportFormat {
    /// Parses a format name, falling back to JSON for unknown names.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!("Unknown report format '{}', falling back to json", value);
            Self::Json
        })
    }

    /// File extension used for exported and uploaded reports.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Csv => "csv",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the rendered output.
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// Returns true for formats whose output is UTF-8 text.
    pub const fn is_text(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// A report rendered into one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    format: ReportFormat,
    body: Vec<u8>,
}

impl RenderedReport {
    fn new(format: ReportFormat, body: Vec<u8>) -> Self {
        Self { format, body }
    }

    /// Format of the body.
    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Rendered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the report and returns the rendered bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Rendered body as text, for text formats.
    pub fn as_text(&self) -> Option<&str> {
        if self.format.is_text() {
            std::str::from_utf8(&self.body).ok()
        } else {
            None
        }
    }

    /// MIME type of the body.
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// File extension for the body.
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Renders reports into any [`ReportFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGenerator {
    /// Document title for HTML, Markdown and PDF output
    pub title: String,
    /// Row cap for issue and result tables (`None` renders every row)
    pub max_rows: Option<usize>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            title: "Data Quality Report".to_string(),
            max_rows: None,
        }
    }
}

impl ReportGenerator {
    /// Creates a generator with the default title and no row cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to cap table rows.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Renders a report.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or template rendering fails.
    pub fn render(&self, report: &QualityReport, format: ReportFormat) -> Result<RenderedReport> {
        let body = match format {
            ReportFormat::Json => serde_json::to_vec_pretty(report)
                .map_err(|e| DqWatchError::serialization("Failed to render JSON report", e))?,
            ReportFormat::Csv => render_csv(report)?.into_bytes(),
            ReportFormat::Html => {
                let view = ReportView::build(report, &self.title, self.max_rows, false);
                HtmlReport { v: &view }
                    .render()
                    .map_err(|e| DqWatchError::rendering("Failed to render HTML report", e))?
                    .into_bytes()
            }
            ReportFormat::Markdown => {
                let view = ReportView::build(report, &self.title, self.max_rows, true);
                MarkdownReport { v: &view }
                    .render()
                    .map_err(|e| DqWatchError::rendering("Failed to render Markdown report", e))?
                    .into_bytes()
            }
            ReportFormat::Pdf => {
                let view = ReportView::build(report, &self.title, self.max_rows, false);
                pdf::render_text_pdf(&self.title, &view.plain_lines())
            }
        };

        Ok(RenderedReport::new(format, body))
    }

    /// Renders a report, resolving the format name leniently.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_named(&self, report: &QualityReport, format: &str) -> Result<RenderedReport> {
        self.render(report, ReportFormat::parse_lenient(format))
    }
}

/// Renders a report with the default generator.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn format_report(report: &QualityReport, format: ReportFormat) -> Result<RenderedReport> {
    ReportGenerator::default().render(report, format)
}

const CSV_HEADER: [&str; 4] = ["rule_id", "status", "dimension", "details"];

fn render_csv(report: &QualityReport) -> Result<String> {
    let mut out = String::new();
    push_csv_row(&mut out, CSV_HEADER);

    for result in &report.validation_results {
        let details = serde_json::to_string(&result.details)
            .map_err(|e| DqWatchError::serialization("Failed to encode result details", e))?;
        push_csv_row(
            &mut out,
            [
                result.rule_id.as_str(),
                result.status.as_str(),
                result.dimension.as_str(),
                details.as_str(),
            ],
        );
    }

    Ok(out)
}

fn push_csv_row<const N: usize>(out: &mut String, cells: [&str; N]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_escape(cell));
    }
    out.push_str("\r\n");
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

struct DimensionRow {
    dimension: String,
    score: String,
}

struct IssueRow {
    severity: String,
    rule_id: String,
    rule_type: String,
    dimension: String,
    resolved: String,
    detected_at: String,
}

struct ResultRow {
    rule_id: String,
    rule_type: String,
    dimension: String,
    status: String,
    details: String,
}

/// Template-ready strings for one report.
struct ReportView {
    title: String,
    report_id: String,
    generated_at: String,
    dataset_name: String,
    table_name: String,
    has_score: bool,
    overall_score: String,
    success_rate: String,
    dimension_rows: Vec<DimensionRow>,
    total_results: usize,
    passed_results: usize,
    failed_results: usize,
    warning_results: usize,
    total_issues: usize,
    critical_issues: usize,
    high_issues: usize,
    medium_issues: usize,
    low_issues: usize,
    issue_rows: Vec<IssueRow>,
    omitted_issues: usize,
    result_rows: Vec<ResultRow>,
    omitted_results: usize,
}

impl ReportView {
    fn build(report: &QualityReport, title: &str, max_rows: Option<usize>, markdown: bool) -> Self {
        let summary = ReportSummary::from_report(report);
        let cell = |s: &str| {
            if markdown {
                s.replace('|', "\\|").replace(['\r', '\n'], " ")
            } else {
                s.to_string()
            }
        };
        let cap = max_rows.unwrap_or(usize::MAX);

        let mut issues: Vec<_> = report.issues.iter().collect();
        // Most severe first, detection order within a severity.
        issues.sort_by(|a, b| b.severity().cmp(&a.severity()));

        let issue_rows = issues
            .iter()
            .take(cap)
            .map(|issue| IssueRow {
                severity: issue.severity().as_str().to_uppercase(),
                rule_id: cell(issue.rule_id()),
                rule_type: issue.rule_type().to_string(),
                dimension: issue.dimension().to_string(),
                resolved: if issue.resolved() { "yes" } else { "no" }.to_string(),
                detected_at: issue.detection_time().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            })
            .collect();

        let result_rows = report
            .validation_results
            .iter()
            .take(cap)
            .map(|result| ResultRow {
                rule_id: cell(&result.rule_id),
                rule_type: result.rule_type.to_string(),
                dimension: result.dimension.to_string(),
                status: result.status.to_string(),
                details: cell(&result.details.to_string()),
            })
            .collect();

        let dimension_rows = report
            .quality_score
            .iter()
            .flat_map(|score| score.dimension_scores.iter())
            .map(|(dimension, score)| DimensionRow {
                dimension: dimension.to_string(),
                score: format!("{score:.2}"),
            })
            .collect();

        Self {
            title: title.to_string(),
            report_id: summary.report_id.to_string(),
            generated_at: summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            dataset_name: cell(&summary.dataset_name),
            table_name: cell(&summary.table_name),
            has_score: summary.overall_score.is_some(),
            overall_score: summary
                .overall_score
                .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}")),
            success_rate: summary
                .success_rate
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0)),
            dimension_rows,
            total_results: summary.total_results,
            passed_results: summary.passed_results,
            failed_results: summary.failed_results,
            warning_results: summary.warning_results,
            total_issues: summary.issues.total_issues,
            critical_issues: summary.issues.critical_issues,
            high_issues: summary.issues.high_issues,
            medium_issues: summary.issues.medium_issues,
            low_issues: summary.issues.low_issues,
            issue_rows,
            omitted_issues: report.issues.len().saturating_sub(cap),
            result_rows,
            omitted_results: report.validation_results.len().saturating_sub(cap),
        }
    }

    /// Flattens the view into plain text lines for the PDF writer.
    fn plain_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Dataset: {}.{}", self.dataset_name, self.table_name),
            format!("Report ID: {}", self.report_id),
            format!("Generated: {}", self.generated_at),
            String::new(),
            format!("Overall score: {}", self.overall_score),
            format!("Success rate: {}", self.success_rate),
        ];
        lines.extend(
            self.dimension_rows
                .iter()
                .map(|row| format!("  {}: {}", row.dimension, row.score)),
        );

        lines.push(String::new());
        lines.push(format!(
            "Validation results: {} total, {} passed, {} failed, {} warning",
            self.total_results, self.passed_results, self.failed_results, self.warning_results
        ));
        lines.push(format!(
            "Issues: {} total, {} critical, {} high, {} medium, {} low",
            self.total_issues,
            self.critical_issues,
            self.high_issues,
            self.medium_issues,
            self.low_issues
        ));

        if !self.issue_rows.is_empty() {
            lines.push(String::new());
            lines.push("Issues".to_string());
            lines.extend(self.issue_rows.iter().map(|row| {
                format!(
                    "  [{}] {} ({}/{}) resolved: {}",
                    row.severity, row.rule_id, row.rule_type, row.dimension, row.resolved
                )
            }));
            if self.omitted_issues > 0 {
                lines.push(format!("  ... and {} more", self.omitted_issues));
            }
        }

        if !self.result_rows.is_empty() {
            lines.push(String::new());
            lines.push("Validation results".to_string());
            lines.extend(self.result_rows.iter().map(|row| {
                format!("  {} {} ({}): {}", row.status, row.rule_id, row.dimension, row.details)
            }));
            if self.omitted_results > 0 {
                lines.push(format!("  ... and {} more", self.omitted_results));
            }
        }

        lines
    }
}

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport<'a> {
    v: &'a ReportView,
}

#[derive(Template)]
#[template(path = "report.md")]
struct MarkdownReport<'a> {
    v: &'a ReportView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueSeverity, QualityIssue};
    use crate::models::{
        DetectionContext, QualityDimension, QualityScore, RuleType, ValidationResult,
        ValidationStatus, ValidationSummary,
    };
    use serde_json::{Value, json};

    fn sample_report(with_score: bool) -> QualityReport {
        let results = vec![
            ValidationResult::new(
                "orders_schema",
                RuleType::Schema,
                QualityDimension::Validity,
                ValidationStatus::Failed,
            )
            .with_details(json!({"missing_columns": ["total", "currency"]})),
            ValidationResult::new(
                "orders_not_null",
                RuleType::Content,
                QualityDimension::Completeness,
                ValidationStatus::Passed,
            ),
            ValidationResult::new(
                "orders_pipe|name",
                RuleType::Content,
                QualityDimension::Accuracy,
                ValidationStatus::Warning,
            )
            .with_details(json!({"note": "a, \"quoted\" value"})),
        ];
        let context = DetectionContext::new("sales", "orders");
        let issues = vec![
            QualityIssue::new(&results[2], IssueSeverity::Low, &context),
            QualityIssue::new(&results[0], IssueSeverity::High, &context),
        ];
        let score = QualityScore::new(0.87, 0.5)
            .with_dimension(QualityDimension::Validity, 0.5)
            .with_dimension(QualityDimension::Completeness, 1.0);
        let summary = ValidationSummary::from_results(&results);

        QualityReport::assemble(
            &results,
            Some(&summary),
            with_score.then_some(&score),
            issues,
            &context,
        )
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("Markdown".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert!("xlsx".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::parse_lenient("xlsx"), ReportFormat::Json);
        assert_eq!(ReportFormat::parse_lenient(" PDF "), ReportFormat::Pdf);
        assert_eq!(ReportFormat::default(), ReportFormat::Json);
        assert_eq!(ReportFormat::Markdown.extension(), "md");
    }

    #[test]
    fn test_json_uses_string_values() {
        let rendered = format_report(&sample_report(true), ReportFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(rendered.as_bytes()).unwrap();

        assert!(value["metadata"]["timestamp"].is_string());
        assert!(value["metadata"]["report_id"].is_string());
        assert_eq!(value["validation_results"][0]["status"], json!("failed"));
        assert_eq!(value["issues"][0]["severity"], json!("low"));
        assert_eq!(rendered.content_type(), "application/json");
    }

    #[test]
    fn test_unknown_format_name_renders_json() {
        let report = sample_report(true);
        let rendered = ReportGenerator::new().render_named(&report, "docx").unwrap();
        assert_eq!(rendered.format(), ReportFormat::Json);
        assert!(serde_json::from_slice::<Value>(rendered.as_bytes()).is_ok());
    }

    #[test]
    fn test_csv_rows_and_quoting() {
        let rendered = format_report(&sample_report(true), ReportFormat::Csv).unwrap();
        let text = rendered.as_text().unwrap();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();

        assert_eq!(lines[0], "rule_id,status,dimension,details");
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            r#"orders_schema,failed,validity,"{""missing_columns"":[""total"",""currency""]}""#
        );
        assert_eq!(lines[2], "orders_not_null,passed,completeness,null");
        assert!(lines[3].starts_with("orders_pipe|name,warning,accuracy,\""));
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_html_escapes_and_lists_issues() {
        let mut report = sample_report(true);
        report.metadata.table_name = "<orders>".to_string();
        let rendered = format_report(&report, ReportFormat::Html).unwrap();
        let html = rendered.as_text().unwrap();

        assert!(html.contains("<html"));
        assert!(html.contains("&lt;orders&gt;"));
        assert!(!html.contains("<orders>"));
        assert!(html.contains("orders_schema"));
        assert!(html.contains("0.87"));
        assert!(html.contains("HIGH"));
    }

    #[test]
    fn test_markdown_tables() {
        let rendered = format_report(&sample_report(true), ReportFormat::Markdown).unwrap();
        let md = rendered.as_text().unwrap();

        assert!(md.starts_with("# Data Quality Report"));
        assert!(md.contains("sales.orders"));
        assert!(md.contains("| HIGH | orders_schema | schema | validity | no |"));
        assert!(md.contains("orders_pipe\\|name"));
        // Most severe issue rendered first.
        let high = md.find("| HIGH |").unwrap();
        let low = md.find("| LOW |").unwrap();
        assert!(high < low);
    }

    #[test]
    fn test_markdown_without_score() {
        let rendered = format_report(&sample_report(false), ReportFormat::Markdown).unwrap();
        let md = rendered.as_text().unwrap();
        assert!(md.contains("No quality score"));
    }

    #[test]
    fn test_row_cap() {
        let generator = ReportGenerator::new().with_title("Nightly").with_max_rows(1);
        let rendered = generator.render(&sample_report(true), ReportFormat::Markdown).unwrap();
        let md = rendered.as_text().unwrap();

        assert!(md.starts_with("# Nightly"));
        assert!(md.contains("and 1 more issue(s)"));
        assert!(md.contains("and 2 more result(s)"));
    }

    #[test]
    fn test_pdf_output() {
        let rendered = format_report(&sample_report(true), ReportFormat::Pdf).unwrap();
        assert!(rendered.as_bytes().starts_with(b"%PDF-1.4"));
        assert!(rendered.as_text().is_none());
        assert_eq!(rendered.extension(), "pdf");
    }
}
