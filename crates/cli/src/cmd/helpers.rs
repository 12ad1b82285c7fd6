use std::time::Duration;

use anyhow::{Context, Result};
use async_nats::{Client, ConnectOptions, HeaderMap};

use flexalert_common::frames;
use flexalert_common::subjects::{mailbox_subject, HEADER_SENDER, HEADER_SUBJECT};

pub const CLI_SENDER: &str = "flexalert-cli";
const REQUEST_SUBJECT: &str = "rules";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Request/reply access to an agent's admin mailbox.
pub struct AdminClient {
    client: Client,
    mailbox: String,
}

impl AdminClient {
    pub async fn connect(endpoint: &str, agent: &str) -> Result<Self> {
        let client = ConnectOptions::new()
            .name(CLI_SENDER)
            .connection_timeout(CONNECT_TIMEOUT)
            .connect(endpoint)
            .await
            .with_context(|| format!("connecting to {endpoint}"))?;
        Ok(Self {
            client,
            mailbox: mailbox_subject(agent),
        })
    }

    pub async fn request(&self, request: &[&str]) -> Result<Vec<String>> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SENDER, CLI_SENDER);
        headers.insert(HEADER_SUBJECT, REQUEST_SUBJECT);

        let payload = frames::encode(request);
        let msg = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.client
                .request_with_headers(self.mailbox.clone(), headers, payload.into()),
        )
        .await
        .with_context(|| format!("{} did not answer", self.mailbox))??;

        Ok(frames::decode(&msg.payload)?)
    }
}

/// Reads a rule document from a file path, or takes the argument as inline JSON.
pub fn read_rule_data(data: &str) -> Result<String> {
    let text = if std::path::Path::new(data).exists() {
        std::fs::read_to_string(data).with_context(|| format!("reading {data}"))?
    } else {
        data.to_string()
    };
    serde_json::from_str::<serde_json::Value>(&text).context("rule is not valid JSON")?;
    Ok(text)
}
