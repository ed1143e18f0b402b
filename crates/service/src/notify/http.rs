//! Transactional mail over a Brevo-compatible HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::auth::errors::AuthError;

use super::{NotificationGateway, NotificationKind};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
}

pub struct HttpMailer {
    http: Client,
    api_url: String,
    api_key: String,
    sender: EmailAddress,
}

impl HttpMailer {
    pub fn new(cfg: &configs::MailConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            sender: EmailAddress {
                email: cfg.sender_email.clone(),
                name: cfg.sender_name.clone(),
            },
        }
    }
}

#[async_trait]
impl NotificationGateway for HttpMailer {
    async fn send(&self, kind: NotificationKind, to: &str, html_body: &str) -> Result<(), AuthError> {
        let body = SendEmailBody {
            sender: self.sender.clone(),
            to: vec![EmailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject: kind.subject().to_string(),
            html_content: html_body.to_string(),
        };
        let resp = self
            .http
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Notification(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AuthError::Notification(format!(
                "mail api returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
