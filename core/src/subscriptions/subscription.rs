use std::{sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, U256, U64},
    rpc::types::Log,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info};

use crate::{
    abi::{ABIEvent, ParamTypeError},
    helpers::generate_random_id,
    provider::{RpcClient, RpcError},
};

use super::{
    filter::{InitialFilter, PersistedFilter, RestartFilter},
    log_processor::{LogProcessor, StreamLogProcessor},
    manager::SubscriptionManager,
};

/// Budget applied to every node call a subscription issues. Override with
/// [`Subscription::with_call_timeout`].
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Solidity event name must be specified")]
    InvalidEvent,

    #[error("{0}")]
    InvalidEventSignature(#[from] ParamTypeError),

    #[error("No stream found with id {0}")]
    UnknownStream(String),

    #[error("Persisted subscription has no id")]
    MissingId,

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// The persisted record of a subscription. Owned by storage; the runtime
/// fills in the filter and derived name once, at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub path: String,

    pub created: DateTime<Utc>,

    pub name: String,

    pub stream: String,

    pub filter: PersistedFilter,

    pub event: ABIEvent,
}

impl SubscriptionDescriptor {
    /// Registration-time constructor: assigns the id, path and creation
    /// timestamp. Filter and name are derived by [`Subscription::new`].
    pub fn new(stream_id: &str, event: ABIEvent) -> Self {
        let id = generate_random_id(16);
        Self {
            path: format!("/subscriptions/{id}"),
            id,
            created: Utc::now(),
            name: String::new(),
            stream: stream_id.to_string(),
            filter: PersistedFilter::default(),
            event,
        }
    }
}

/// The runtime for one subscription: owns the node-side filter handle and
/// the polling mode flags, and drives creation, polling and teardown against
/// the RPC transport. Operations on one instance are expected to be invoked
/// sequentially by the scheduler that owns it.
#[derive(Debug)]
pub struct Subscription {
    info: SubscriptionDescriptor,
    rpc: Arc<dyn RpcClient>,
    log_processor: Box<dyn LogProcessor>,
    log_name: String,
    // node-assigned handles do not survive node restarts, so the id is
    // never persisted
    filter_id: U256,
    filtered_once: bool,
    filter_stale: bool,
    call_timeout: Duration,
}

impl Subscription {
    /// Registers a brand-new subscription: resolves the stream, derives the
    /// persisted filter and display name from the event definition, and
    /// builds the log processor. Does not contact the node.
    pub fn new(
        manager: &dyn SubscriptionManager,
        rpc: Arc<dyn RpcClient>,
        address: Option<Address>,
        mut info: SubscriptionDescriptor,
    ) -> Result<Self, SubscriptionError> {
        let stream = manager.stream_by_id(&info.stream)?;
        if info.event.name.is_empty() {
            return Err(SubscriptionError::InvalidEvent);
        }
        let summary = info.event.signature()?;
        let topic = info.event.topic_id()?;

        let address_label = match address {
            Some(address) => {
                info.filter.addresses = Some(vec![address]);
                address.to_string()
            }
            // unfiltered; the wildcard only feeds the derived name
            None => "*".to_string(),
        };
        // the event signature is the only topic we filter on
        info.filter.topics = Some(vec![vec![topic]]);
        info.name = format!("{address_label}:{summary}");

        let log_processor = Box::new(StreamLogProcessor::new(&info.id, info.event.clone(), stream));
        let log_name = format!("{}:{}", info.id, summary);
        info!("Created subscription {} {} topic:{}", info.id, info.name, topic);

        Ok(Self {
            info,
            rpc,
            log_processor,
            log_name,
            filter_id: U256::ZERO,
            filtered_once: false,
            filter_stale: true,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    /// Rebuilds the runtime for a previously persisted descriptor. Filter
    /// and name are already recorded and are not recomputed. Does not
    /// contact the node.
    pub fn restore(
        manager: &dyn SubscriptionManager,
        rpc: Arc<dyn RpcClient>,
        info: SubscriptionDescriptor,
    ) -> Result<Self, SubscriptionError> {
        if info.id.is_empty() {
            return Err(SubscriptionError::MissingId);
        }
        let stream = manager.stream_by_id(&info.stream)?;
        let summary = info.event.signature()?;
        let log_processor = Box::new(StreamLogProcessor::new(&info.id, info.event.clone(), stream));
        let log_name = format!("{}:{}", info.id, summary);

        Ok(Self {
            info,
            rpc,
            log_processor,
            log_name,
            filter_id: U256::ZERO,
            filtered_once: false,
            filter_stale: true,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    /// Overrides the per-call budget (default 30 s).
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Replaces the log processor, for wiring custom sinks.
    pub fn with_log_processor(mut self, log_processor: Box<dyn LogProcessor>) -> Self {
        self.log_processor = log_processor;
        self
    }

    pub fn info(&self) -> &SubscriptionDescriptor {
        &self.info
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// True whenever there is no live filter the node still recognises.
    pub fn is_filter_stale(&self) -> bool {
        self.filter_stale
    }

    /// The block up to which events have been processed; the resume point
    /// the scheduler passes to [`Self::restart_filter`].
    pub fn block_hwm(&self) -> U64 {
        self.log_processor.block_hwm()
    }

    /// Creates the node-side filter for a subscription with no processed
    /// history: watch from the current block, do not replay.
    pub async fn create_initial_filter(&mut self) -> Result<(), SubscriptionError> {
        let request = serde_json::to_value(InitialFilter::new(self.info.filter.clone()))
            .map_err(RpcError::from)?;
        self.new_filter(request).await?;
        info!("{}: created initial filter: {}", self.log_name, self.filter_id);
        Ok(())
    }

    /// (Re)creates the node-side filter from a known resume block. Always
    /// callable; this is the recovery path after staleness or a restart.
    pub async fn restart_filter(&mut self, since: U64) -> Result<(), SubscriptionError> {
        let request = serde_json::to_value(RestartFilter::new(self.info.filter.clone(), since))
            .map_err(RpcError::from)?;
        self.new_filter(request).await?;
        info!("{}: created filter from block {}: {}", self.log_name, since, self.filter_id);
        Ok(())
    }

    async fn new_filter(&mut self, request: Value) -> Result<(), SubscriptionError> {
        let result = self.call("eth_newFilter", json!([request])).await?;
        self.filter_id = serde_json::from_value(result).map_err(RpcError::from)?;
        self.filtered_once = false;
        self.filter_stale = false;
        Ok(())
    }

    /// Polls the filter and hands every returned entry, in order, to the log
    /// processor. The first poll after any filter creation must fetch the
    /// full log set: the incremental call is defined to return nothing
    /// useful on its very first invocation against a fresh filter.
    pub async fn process_new_events(&mut self) -> Result<(), SubscriptionError> {
        let method = if self.filtered_once { "eth_getFilterChanges" } else { "eth_getFilterLogs" };
        let result = match self.call(method, json!([self.filter_id])).await {
            Ok(result) => result,
            Err(err) => {
                if self.rpc.is_filter_not_found(&err) {
                    self.filter_stale = true;
                }
                return Err(err.into());
            }
        };

        let logs: Vec<Log> = serde_json::from_value(result).map_err(RpcError::from)?;
        info!("{}: received {} events ({})", self.log_name, logs.len(), method);
        for entry in &logs {
            // one bad entry must not block the rest of the batch
            if let Err(err) = self.log_processor.process_log(entry).await {
                error!("{}: failed to process event: {}", self.log_name, err);
            }
        }
        self.filtered_once = true;
        Ok(())
    }

    /// Best-effort teardown. The handle is marked stale before the removal
    /// call goes out: once teardown is requested it must never be polled
    /// again, even when the removal itself fails or times out.
    pub async fn unsubscribe(&mut self) -> Result<(), SubscriptionError> {
        self.filter_stale = true;
        let retval = self.call("eth_uninstallFilter", json!([self.filter_id])).await?;
        info!("{}: uninstalled filter (retval={})", self.log_name, retval);
        Ok(())
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match timeout(self.call_timeout, self.rpc.request(method, params)).await {
            Ok(result) => result,
            Err(_) => {
                Err(RpcError::Timeout { method: method.to_string(), timeout: self.call_timeout })
            }
        }
    }
}
