//! Outbound email for password resets and notification mirrors.
//!
//! Supported providers:
//! - `console`: logs the email (development)
//! - `sendgrid`: SendGrid v3 mail API
//!
//! Every send is a single attempt; callers log failures and move on.

use crate::config::EmailConfig;
use domain::models::{NewMessageData, TicketAssignedData};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Invalid link base URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build email HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            config: Arc::new(config),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message),
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Link the reset email points to.
    pub fn password_reset_url(&self, token: &str, email: &str) -> Result<String, EmailError> {
        let base = format!(
            "{}/reset-password",
            self.config.frontend_url.trim_end_matches('/')
        );
        reqwest::Url::parse_with_params(&base, &[("token", token), ("email", email)])
            .map(String::from)
            .map_err(|e| EmailError::InvalidUrl(e.to_string()))
    }

    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        reset_token: &str,
    ) -> Result<(), EmailError> {
        let url = self.password_reset_url(reset_token, to_email)?;
        let name = greeting_name(to_name);

        let body_text = format!(
            r#"Hi{name},

We received a request to reset your helpdesk password. Use the link below to choose a new one:

{url}

This link expires in 1 hour. If you did not ask for a reset, ignore this email.

Helpdesk"#
        );
        let body_html = format!(
            r#"<p>Hi{name},</p>
<p>We received a request to reset your helpdesk password.</p>
<p><a href="{url}">Reset password</a></p>
<p>This link expires in 1 hour. If you did not ask for a reset, ignore this email.</p>"#
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(str::to_string),
            subject: "Reset your password - Helpdesk".to_string(),
            body_text,
            body_html: Some(body_html),
        })
        .await
    }

    pub async fn send_ticket_assigned_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        data: &TicketAssignedData,
    ) -> Result<(), EmailError> {
        let url = self.ticket_url(data.ticket_id);
        let body_text = format!(
            "Hi{name},\n\n{message}.\n\nTicket: #{id} {title}\nStatus: {status}\nPriority: {priority}\n\n{url}\n",
            name = greeting_name(to_name),
            message = data.message,
            id = data.ticket_id,
            title = data.ticket_title,
            status = data.ticket_status,
            priority = data.ticket_priority,
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(str::to_string),
            subject: format!("New ticket assigned - #{}", data.ticket_id),
            body_text,
            body_html: None,
        })
        .await
    }

    pub async fn send_new_message_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        data: &NewMessageData,
    ) -> Result<(), EmailError> {
        let url = self.ticket_url(data.ticket_id);
        let attachments = if data.has_attachments {
            "\n(The message has attachments.)"
        } else {
            ""
        };
        let body_text = format!(
            "Hi{name},\n\n{message}:\n\n\"{preview}\"{attachments}\n\n{url}\n",
            name = greeting_name(to_name),
            message = data.message,
            preview = data.message_preview,
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            to_name: to_name.map(str::to_string),
            subject: format!("New message on ticket #{}", data.ticket_id),
            body_text,
            body_html: None,
        })
        .await
    }

    fn ticket_url(&self, ticket_id: i64) -> String {
        format!(
            "{}/tickets/{}",
            self.config.frontend_url.trim_end_matches('/'),
            ticket_id
        )
    }

    fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body");
        Ok(())
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut recipient = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = serde_json::json!(name);
        }

        let mut content = vec![serde_json::json!({
            "type": "text/plain",
            "value": message.body_text
        })];
        if let Some(html) = &message.body_html {
            content.push(serde_json::json!({ "type": "text/html", "value": html }));
        }

        let body = serde_json::json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": content
        });

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
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

fn greeting_name(name: Option<&str>) -> String {
    name.map(|n| format!(" {}", n)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{AssignedType, Ticket, TicketPriority, TicketStatus};

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: "console".to_string(),
            sendgrid_api_key: String::new(),
            sender_email: "helpdesk@example.com".to_string(),
            sender_name: "Helpdesk".to_string(),
            frontend_url: "https://app.example.com/".to_string(),
            timeout_secs: 5,
        }
    }

    fn ticket() -> Ticket {
        let now = chrono::Utc::now();
        Ticket {
            id: 42,
            title: "Printer offline".into(),
            description: "Nothing prints".into(),
            client_name: "ACME".into(),
            whatsapp_number: None,
            status: TicketStatus::Aberto,
            priority: TicketPriority::Alta,
            origin: None,
            user_id: None,
            cliente_id: None,
            resolution_time_minutes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_reset_url_is_encoded() {
        let service = EmailService::new(test_config());
        let url = service
            .password_reset_url("abc123", "jane+help@example.com")
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/reset-password?token=abc123&email=jane%2Bhelp%40example.com"
        );
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config());
        let message = EmailMessage {
            to: "user@example.com".to_string(),
            to_name: Some("Test User".to_string()),
            subject: "Test Subject".to_string(),
            body_text: "Test body".to_string(),
            body_html: None,
        };
        assert!(service.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_disabled_silently_succeeds() {
        let mut config = test_config();
        config.enabled = false;
        config.provider = "sendgrid".to_string();
        let service = EmailService::new(config);
        assert!(!service.is_enabled());
        let result = service
            .send_password_reset_email("user@example.com", None, "token")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_is_not_configured() {
        let mut config = test_config();
        config.provider = "sendgrid".to_string();
        let service = EmailService::new(config);
        let data = TicketAssignedData::new(&ticket(), AssignedType::User);
        let result = service
            .send_ticket_assigned_email("user@example.com", Some("Bob"), &data)
            .await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let mut config = test_config();
        config.provider = "pigeon".to_string();
        let service = EmailService::new(config);
        let result = service
            .send_password_reset_email("user@example.com", None, "token")
            .await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }

    #[test]
    fn test_ticket_url_trims_trailing_slash() {
        let service = EmailService::new(test_config());
        assert_eq!(service.ticket_url(7), "https://app.example.com/tickets/7");
    }
}
