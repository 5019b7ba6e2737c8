use std::{collections::HashMap, sync::Arc};

use crate::{
    manifest::core::Manifest,
    streams::{EventStream, Webhook},
};

use super::subscription::SubscriptionError;

/// The slice of the subscription manager the runtime needs: resolving the
/// stream a subscription delivers to. The polling scheduler lives behind the
/// same seam and is not part of this contract.
pub trait SubscriptionManager: Send + Sync {
    fn stream_by_id(&self, stream_id: &str) -> Result<Arc<dyn EventStream>, SubscriptionError>;
}

/// Stream destinations known to this process, keyed by stream id.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<String, Arc<dyn EventStream>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self { streams: HashMap::new() }
    }

    /// Builds the registry out of the manifest's stream definitions.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut registry = Self::new();
        for stream in &manifest.streams {
            if let Some(webhook) = &stream.webhook {
                registry.register_stream(&stream.id, Arc::new(Webhook::new(&webhook.endpoint)));
            }
        }
        registry
    }

    pub fn register_stream(&mut self, id: &str, stream: Arc<dyn EventStream>) {
        self.streams.insert(id.to_string(), stream);
    }
}

impl SubscriptionManager for StreamRegistry {
    fn stream_by_id(&self, stream_id: &str) -> Result<Arc<dyn EventStream>, SubscriptionError> {
        self.streams
            .get(stream_id)
            .cloned()
            .ok_or_else(|| SubscriptionError::UnknownStream(stream_id.to_string()))
    }
}
