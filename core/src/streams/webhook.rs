use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{EventStream, StreamError, STREAM_MESSAGE_ID_KEY};

/// Delivers event messages to an HTTP endpoint as JSON POSTs.
#[derive(Debug, Clone)]
pub struct Webhook {
    client: Client,
    endpoint: String,
}

impl Webhook {
    pub fn new(endpoint: &str) -> Self {
        Self { client: Client::new(), endpoint: endpoint.to_string() }
    }
}

#[async_trait]
impl EventStream for Webhook {
    async fn publish(&self, id: &str, message: &Value) -> Result<(), StreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header(STREAM_MESSAGE_ID_KEY, id)
            .json(message)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StreamError::Rejected(format!(
                "webhook returned {}",
                response.status()
            )))
        }
    }
}
