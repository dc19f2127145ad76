//! Email and Teams notification destination.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{DestinationClients, DestinationConfig, NotificationSender, ReportDestination};
use crate::error::{DqWatchError, Result};
use crate::report::format::{RenderedReport, ReportFormat, format_report};
use crate::report::models::{QualityReport, ReportSummary};

/// Issues listed in a notification body.
const TOP_ISSUES: usize = 5;

string_enum! {
    /// Notification transport.
    pub enum NotificationChannel {
        /// Email via the configured email sender
        Email => "email",
        /// Microsoft Teams via the configured Teams sender
        Teams => "teams",
    }
    parse_error = |value: &str| DqWatchError::configuration(format!(
        "Unsupported notification type '{value}': expected email or teams"
    ));
}

/// Message handed to a notification sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    /// One-line subject
    pub subject: String,
    /// Markdown summary
    pub body: String,
    /// Full report in the requested format
    pub attachment: Option<RenderedReport>,
}

impl NotificationMessage {
    /// Builds the subject and summary for a report, attaching it rendered
    /// in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment cannot be rendered.
    pub fn from_report(report: &QualityReport, format: ReportFormat) -> Result<Self> {
        let summary = ReportSummary::from_report(report);
        let asset = format!("{}.{}", summary.dataset_name, summary.table_name);
        let score = summary
            .overall_score
            .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}"));

        let subject = format!(
            "[Data Quality] {asset}: score {score}, {} issue(s)",
            summary.issues.total_issues
        );

        let mut lines = vec![
            format!("Data quality report for **{asset}**"),
            String::new(),
            format!("- Report ID: {}", summary.report_id),
            format!(
                "- Generated: {}",
                summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            format!("- Overall score: {score}"),
        ];
        if let Some(rate) = summary.success_rate {
            lines.push(format!("- Success rate: {:.1}%", rate * 100.0));
        }
        lines.push(format!(
            "- Validation results: {} ({} passed, {} failed, {} warning)",
            summary.total_results,
            summary.passed_results,
            summary.failed_results,
            summary.warning_results
        ));
        lines.push(format!(
            "- Issues: {} ({} critical, {} high, {} medium, {} low)",
            summary.issues.total_issues,
            summary.issues.critical_issues,
            summary.issues.high_issues,
            summary.issues.medium_issues,
            summary.issues.low_issues
        ));

        if !report.issues.is_empty() {
            let mut issues: Vec<_> = report.issues.iter().collect();
            issues.sort_by(|a, b| b.severity().cmp(&a.severity()));

            lines.push(String::new());
            lines.push("Top issues:".to_string());
            lines.extend(issues.iter().take(TOP_ISSUES).map(|issue| {
                format!(
                    "- [{}] {} ({}/{})",
                    issue.severity().as_str().to_uppercase(),
                    issue.rule_id(),
                    issue.rule_type(),
                    issue.dimension()
                )
            }));
            if issues.len() > TOP_ISSUES {
                lines.push(format!("- ... and {} more", issues.len() - TOP_ISSUES));
            }
        }

        lines.push(String::new());
        lines.push(format!("The full report is attached as {format}."));
        let body = lines.join("\n");

        Ok(Self {
            subject,
            body,
            attachment: Some(format_report(report, format)?),
        })
    }
}

/// Sends a summary message with the report attached.
pub struct NotificationDestination {
    name: String,
    notification_type: String,
    channel: Option<NotificationChannel>,
    recipients: Vec<String>,
    timeout: Option<Duration>,
    sender: Option<Arc<dyn NotificationSender>>,
}

impl NotificationDestination {
    /// Creates an unvalidated destination, picking the sender for the
    /// configured channel from `clients`.
    pub fn new(config: &DestinationConfig, clients: &DestinationClients) -> Self {
        let notification_type = config.notification_type.clone().unwrap_or_default();
        let channel = notification_type.parse::<NotificationChannel>().ok();
        let sender = match channel {
            Some(NotificationChannel::Email) => clients.email.clone(),
            Some(NotificationChannel::Teams) => clients.teams.clone(),
            None => None,
        };

        Self {
            name: config.display_name(),
            notification_type,
            channel,
            recipients: config.recipients.clone(),
            timeout: config.timeout(),
            sender,
        }
    }

    /// Configured channel, if recognized.
    pub fn channel(&self) -> Option<NotificationChannel> {
        self.channel
    }

    pub(crate) fn channel_name(&self) -> &str {
        self.channel.map_or(self.notification_type.as_str(), |c| c.as_str())
    }

    pub(crate) fn has_sender(&self) -> bool {
        self.sender.is_some()
    }
}

#[async_trait]
impl ReportDestination for NotificationDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<()> {
        if self.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(DqWatchError::configuration(format!(
                "Notification destination '{}' requires at least one recipient",
                self.name
            )));
        }
        self.notification_type.parse::<NotificationChannel>()?;
        Ok(())
    }

    async fn send_report(&self, report: &QualityReport, format: ReportFormat) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            DqWatchError::destination(
                &self.name,
                format!("no {} sender configured", self.channel_name()),
            )
        })?;

        let message = NotificationMessage::from_report(report, format)?;
        sender.send(&message, &self.recipients).await?;
        debug!(
            "Sent {} notification to {} recipient(s)",
            self.channel_name(),
            self.recipients.len()
        );
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::MemorySender;
    use super::*;
    use crate::issues::{IssueSeverity, QualityIssue};
    use crate::models::{
        DetectionContext, QualityDimension, QualityScore, RuleType, ValidationResult,
        ValidationStatus,
    };

    fn report() -> QualityReport {
        let context = DetectionContext::new("sales", "orders");
        let results: Vec<ValidationResult> = (0..7)
            .map(|i| {
                ValidationResult::new(
                    format!("rule_{i}"),
                    RuleType::Content,
                    QualityDimension::Accuracy,
                    ValidationStatus::Failed,
                )
            })
            .collect();
        let issues = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let severity = if i == 6 {
                    IssueSeverity::Critical
                } else {
                    IssueSeverity::Low
                };
                QualityIssue::new(r, severity, &context)
            })
            .collect();
        let score = QualityScore::new(0.875, 0.0);
        QualityReport::assemble(&results, None, Some(&score), issues, &context)
    }

    #[test]
    fn test_message_subject_and_body() {
        let message = NotificationMessage::from_report(&report(), ReportFormat::Html).unwrap();

        assert!(message.subject.starts_with("[Data Quality] sales.orders: score 0.8"));
        assert!(message.subject.ends_with(", 7 issue(s)"));
        assert!(
            message
                .body
                .starts_with("Data quality report for **sales.orders**\n\n- Report ID: ")
        );
        assert!(message.body.contains("- Issues: 7 (1 critical, 0 high, 0 medium, 6 low)"));

        let top: Vec<&str> = message
            .body
            .lines()
            .filter(|l| l.starts_with("- ["))
            .collect();
        assert_eq!(top.len(), TOP_ISSUES);
        assert_eq!(top[0], "- [CRITICAL] rule_6 (content/accuracy)");
        assert!(message.body.contains("- ... and 2 more"));
        assert!(message.body.ends_with("attached as html."));

        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.format(), ReportFormat::Html);
    }

    #[test]
    fn test_validation() {
        let clients = DestinationClients::new();

        let destination = NotificationDestination::new(
            &DestinationConfig::notification("email", vec![]),
            &clients,
        );
        assert!(destination.validate_config().is_err());

        let destination = NotificationDestination::new(
            &DestinationConfig::notification("pager", vec!["ops".to_string()]),
            &clients,
        );
        assert!(destination.channel().is_none());
        assert!(destination.validate_config().is_err());

        let destination = NotificationDestination::new(
            &DestinationConfig::notification("Teams", vec!["ops".to_string()]),
            &clients,
        );
        assert_eq!(destination.channel(), Some(NotificationChannel::Teams));
        assert!(destination.validate_config().is_ok());
        assert!(!destination.has_sender());
    }

    #[tokio::test]
    async fn test_send_routes_to_channel_sender() {
        let email = Arc::new(MemorySender::default());
        let teams = Arc::new(MemorySender::default());
        let clients = DestinationClients::new()
            .with_email(email.clone())
            .with_teams(teams.clone());

        let destination = NotificationDestination::new(
            &DestinationConfig::notification("teams", vec!["data-quality".to_string()]),
            &clients,
        );
        destination
            .send_report(&report(), ReportFormat::Markdown)
            .await
            .unwrap();

        assert!(email.sent.lock().unwrap().is_empty());
        let sent = teams.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, vec!["data-quality".to_string()]);
    }

    #[tokio::test]
    async fn test_send_without_sender_fails() {
        let destination = NotificationDestination::new(
            &DestinationConfig::notification("email", vec!["dq@example.com".to_string()]),
            &DestinationClients::new(),
        );
        let result = destination.send_report(&report(), ReportFormat::Json).await;
        assert!(matches!(result, Err(DqWatchError::Destination { .. })));
    }
}
