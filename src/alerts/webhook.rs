// Webhook alert sink (Discord-compatible embed payload).

use super::format::alert_payload;
use crate::models::AlertEvent;
use crate::version::user_agent;
use std::time::Duration;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    footer: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration, footer: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            footer,
        })
    }

    pub async fn send(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&alert_payload(event, &self.footer))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
