use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod webhook;
pub use webhook::Webhook;

pub const STREAM_MESSAGE_ID_KEY: &str = "x-ethbridge-id";

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Stream rejected message: {0}")]
    Rejected(String),
}

/// A downstream destination event messages are delivered to, resolved by
/// stream id at subscription construction time.
#[async_trait]
pub trait EventStream: Send + Sync + Debug {
    async fn publish(&self, id: &str, message: &Value) -> Result<(), StreamError>;
}
