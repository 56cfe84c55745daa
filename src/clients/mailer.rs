use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Thin client for the HTTP mail gateway. One POST per message; the caller
/// decides about retries.
#[derive(Clone)]
pub struct MailerClient {
    http_client: Client,
    base_url: String,
    from_address: String,
}

impl MailerClient {
    pub fn new(base_url: impl Into<String>, from_address: impl Into<String>) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        let base_url = base_url.into();
        info!(base_url = %base_url, "Mailer client initialized");

        Ok(Self {
            http_client,
            base_url,
            from_address: from_address.into(),
        })
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), Error> {
        if to.is_empty() {
            return Err(anyhow!("Recipient address is empty"));
        }

        debug!(recipient = to, "Submitting email to mail gateway");

        let email = OutboundEmail {
            from: &self.from_address,
            to,
            subject,
            body,
        };

        let url = format!("{}/api/v1/messages", self.base_url);

        let response = self.http_client.post(&url).json(&email).send().await?;

        if response.status().is_success() {
            debug!(recipient = to, "Mail gateway accepted message");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("Mail gateway returned {}: {}", status, error_text))
        }
    }
}
