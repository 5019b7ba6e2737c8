use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

/// Error text most nodes produce once they have garbage-collected a filter
/// handle. The classifier below keys off it.
const FILTER_NOT_FOUND_MESSAGE: &str = "filter not found";

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node returned error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("{method} did not complete within {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("invalid JSON in RPC exchange: {0}")]
    Json(#[from] serde_json::Error),
}

/// The narrow call contract the subscription runtime speaks to a node
/// through. Connection handling stays inside the implementation; the runtime
/// only issues method calls and classifies the failures it gets back.
#[async_trait]
pub trait RpcClient: Send + Sync + Debug {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Whether the node no longer recognises the filter handle a call used.
    /// Transports for nodes that signal this differently can override.
    fn is_filter_not_found(&self, err: &RpcError) -> bool {
        matches!(err, RpcError::Node { message, .. } if message.contains(FILTER_NOT_FOUND_MESSAGE))
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,

    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

/// JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: JsonRpcResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(RpcError::Node { code: err.code, message: err.message });
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[derive(Error, Debug)]
pub enum ClientCreationError {
    #[error("http provider can't be created for {0}: {1}")]
    HttpProviderCantBeCreated(String, String),

    #[error("Could not build client: {0}")]
    CouldNotBuildClient(#[from] reqwest::Error),
}

pub fn create_client(rpc_url: &str) -> Result<Arc<JsonRpcClient>, ClientCreationError> {
    let url = Url::parse(rpc_url).map_err(|e| {
        ClientCreationError::HttpProviderCantBeCreated(rpc_url.to_string(), e.to_string())
    })?;
    let client = reqwest::Client::builder().build()?;
    Ok(Arc::new(JsonRpcClient { client, url, next_id: AtomicU64::new(1) }))
}
