//! Report delivery contract.
//!
//! Provides the abstraction for e-mailing rendered reports, one recipient at a time.

use thiserror::Error;

/// A file attached to a report e-mail.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl std::fmt::Debug for EmailAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAttachment")
            .field("file_name", &self.file_name)
            .field("bytes", &self.content.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// One message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Delivery is disabled")]
    Disabled,

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Delivers report e-mails.
#[async_trait::async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn send(&self, email: &ReportEmail) -> Result<(), NotifyError>;
}

/// Mock notifier for development and testing.
///
/// Logs messages but doesn't actually send them.
#[derive(Debug, Clone, Default)]
pub struct MockReportNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockReportNotifier {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    /// Create a mock notifier that fails every delivery.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl ReportNotifier for MockReportNotifier {
    async fn send(&self, email: &ReportEmail) -> Result<(), NotifyError> {
        if self.simulate_failure {
            tracing::warn!(to = %email.to, "Mock report notifier simulating failure");
            return Err(NotifyError::Failed("Simulated failure".to_string()));
        }

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "Mock: Would send report e-mail"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> ReportEmail {
        ReportEmail {
            to: "ops@example.com".to_string(),
            subject: "Scheduled Report: basket - Main".to_string(),
            html_body: "<p>report</p>".to_string(),
            text_body: "report".to_string(),
            attachments: vec![EmailAttachment {
                file_name: "AverageBasket_20240401_20240430.xlsx".to_string(),
                content: vec![1, 2, 3],
                content_type: "application/pdf".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_mock_notifier_sends() {
        let notifier = MockReportNotifier::new();
        assert!(notifier.send(&email()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_notifier_failing() {
        let notifier = MockReportNotifier::failing();
        let err = notifier.send(&email()).await.unwrap_err();
        assert_eq!(err, NotifyError::Failed("Simulated failure".to_string()));
    }

    #[test]
    fn test_attachment_debug_omits_content() {
        let debug = format!("{:?}", email().attachments[0]);
        assert!(debug.contains("bytes: 3"));
    }
}
