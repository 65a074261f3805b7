use std::future::Future;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers one message and returns the provider's message id.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Clone)]
pub struct ResendClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl ResendClient {
    pub fn new(api_base: &str, api_key: &str, from: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

impl Mailer for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<String> {
        let body = ResendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };
        let resp = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Resend returned {status}: {text}");
        }
        let sent: ResendResponse = resp.json().await?;
        info!("Sent \"{}\" to {} ({})", message.subject, message.to, sent.id);
        Ok(sent.id)
    }
}

/// Logs messages instead of sending them. Used when no email key is set.
#[derive(Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String> {
        info!("Email to {}: {}", message.to, message.subject);
        Ok("logged".to_string())
    }
}

/// The mailer picked at startup from configuration.
#[derive(Clone)]
pub enum EmailSender {
    Resend(ResendClient),
    Log(LogMailer),
}

impl EmailSender {
    pub fn from_key(api_base: &str, api_key: &str, from: &str) -> Self {
        if api_key.is_empty() {
            EmailSender::Log(LogMailer)
        } else {
            EmailSender::Resend(ResendClient::new(api_base, api_key, from))
        }
    }
}

impl Mailer for EmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<String> {
        match self {
            EmailSender::Resend(client) => client.send(message).await,
            EmailSender::Log(log) => log.send(message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_falls_back_to_logging() {
        let sender = EmailSender::from_key("https://api.resend.com", "", "Pickup <noreply@pickup.local>");
        assert!(matches!(sender, EmailSender::Log(_)));

        let id = sender
            .send(&EmailMessage {
                to: "ana@example.com".to_string(),
                subject: "You're in".to_string(),
                html: "<p>See you there</p>".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(id, "logged");
    }
}
