//! Email delivery of rendered reports.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails to console (development)
//! - `smtp`: Sends via SMTP server
//! - `sendgrid`: Uses SendGrid API

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use domain::models::{ExportFormat, ReportFilter, Schedule};
use domain::services::{NotifyError, ReportEmail, ReportNotifier};

use crate::config::EmailConfig;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<EmailError> for NotifyError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Disabled => NotifyError::Disabled,
            EmailError::InvalidAddress(addr) => NotifyError::InvalidAddress(addr),
            other => NotifyError::Failed(other.to_string()),
        }
    }
}

/// Email service for report delivery.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    http: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send one report email.
    pub async fn deliver(&self, message: &ReportEmail) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Err(EmailError::Disabled);
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message),
            "smtp" => self.send_smtp(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Console provider - logs email to console (for development).
    fn send_console(&self, message: &ReportEmail) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            attachments = ?message.attachments,
            "Email (console provider)"
        );
        debug!(body_text = %message.text_body, "Email body (plain text)");
        Ok(())
    }

    fn sender(&self) -> Result<Mailbox, EmailError> {
        let address = self
            .config
            .sender_email
            .parse()
            .map_err(|_| EmailError::InvalidAddress(self.config.sender_email.clone()))?;
        Ok(Mailbox::new(Some(self.config.sender_name.clone()), address))
    }

    fn build_mime(&self, message: &ReportEmail) -> Result<Message, EmailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?;

        let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ));
        for attachment in &message.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| EmailError::SendFailed(format!("content type: {}", e)))?;
            body = body.singlepart(
                Attachment::new(attachment.file_name.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        Message::builder()
            .from(self.sender()?)
            .to(to)
            .subject(message.subject.clone())
            .multipart(body)
            .map_err(|e| EmailError::SendFailed(e.to_string()))
    }

    /// SMTP provider - sends via SMTP server.
    async fn send_smtp(&self, message: &ReportEmail) -> Result<(), EmailError> {
        if self.config.smtp_host.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let email = self.build_mime(message)?;

        let builder = if self.config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| EmailError::ProviderError(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };
        let mut builder = builder.port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        builder
            .build()
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP delivery failed: {}", e)))?;

        info!(to = %message.to, subject = %message.subject, "Email sent via SMTP");
        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: &ReportEmail) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let attachments: Vec<serde_json::Value> = message
            .attachments
            .iter()
            .map(|a| {
                serde_json::json!({
                    "content": STANDARD.encode(&a.content),
                    "filename": a.file_name,
                    "type": a.content_type,
                    "disposition": "attachment"
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text_body },
                { "type": "text/html", "value": message.html_body }
            ]
        });
        if !attachments.is_empty() {
            body["attachments"] = serde_json::Value::Array(attachments);
        }

        let response = self
            .http
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait::async_trait]
impl ReportNotifier for EmailService {
    async fn send(&self, email: &ReportEmail) -> Result<(), NotifyError> {
        self.deliver(email).await.map_err(NotifyError::from)
    }
}

/// Facts listed in the body of a report email.
#[derive(Debug, Clone)]
pub struct ReportMailDetails<'a> {
    pub schedule_name: &'a str,
    pub tenant_name: &'a str,
    pub report_type: &'a str,
    pub filter: &'a ReportFilter,
    pub rows: usize,
    pub format: ExportFormat,
    pub file_name: &'a str,
    pub generated_at: NaiveDateTime,
}

/// The schedule's own subject, or `Scheduled Report: {name} - {tenant}`.
pub fn report_subject(schedule: &Schedule, tenant_name: &str) -> String {
    schedule
        .email_subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Scheduled Report: {} - {}", schedule.schedule_name, tenant_name))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn period_text(filter: &ReportFilter) -> String {
    format!(
        "{} to {}",
        filter.date_from.format("%Y-%m-%d"),
        filter.date_to.format("%Y-%m-%d")
    )
}

pub fn report_html_body(details: &ReportMailDetails<'_>) -> String {
    let row = |label: &str, value: &str| {
        format!(
            r#"        <tr><td style="padding: 4px 12px 4px 0; color: #666;">{}</td><td style="padding: 4px 0;"><strong>{}</strong></td></tr>"#,
            label,
            escape_html(value)
        )
    };

    let rows = [
        row("Database", details.tenant_name),
        row("Report Type", details.report_type),
        row("Period", &period_text(details.filter)),
        row("Rows", &details.rows.to_string()),
        row("Format", details.format.as_str()),
    ]
    .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Scheduled Report</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #2563eb; margin-top: 0;">Scheduled Report: {name}</h2>
    <table style="border-collapse: collapse; margin: 16px 0;">
{rows}
    </table>
    <p style="color: #666; font-size: 14px;">File: {file}<br>Generated: {generated}</p>
    <hr style="border: none; border-top: 1px solid #ddd; margin: 24px 0;">
    <p style="color: #999; font-size: 12px;">This is an automated report. Please do not reply to this email.</p>
</body>
</html>"#,
        name = escape_html(details.schedule_name),
        rows = rows,
        file = escape_html(details.file_name),
        generated = details.generated_at.format("%Y-%m-%d %H:%M"),
    )
}

pub fn report_text_body(details: &ReportMailDetails<'_>) -> String {
    format!(
        r#"Scheduled Report: {name}

Database: {tenant}
Report Type: {report_type}
Period: {period}
Rows: {rows}
Format: {format}

File: {file}
Generated: {generated}

This is an automated report. Please do not reply to this email."#,
        name = details.schedule_name,
        tenant = details.tenant_name,
        report_type = details.report_type,
        period = period_text(details.filter),
        rows = details.rows,
        format = details.format.as_str(),
        file = details.file_name,
        generated = details.generated_at.format("%Y-%m-%d %H:%M"),
    )
}
