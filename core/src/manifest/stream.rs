use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookStreamConfig {
    pub endpoint: String,
}

/// A named delivery destination subscriptions reference by id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookStreamConfig>,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.webhook.is_none() {
            return Err(format!("stream {} has no destination configured", self.id));
        }
        Ok(())
    }
}
