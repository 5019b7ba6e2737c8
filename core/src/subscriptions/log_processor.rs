use std::{fmt::Debug, sync::Arc};

use alloy::{primitives::U64, rpc::types::Log};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    abi::ABIEvent,
    streams::{EventStream, StreamError},
};

#[derive(Error, Debug)]
pub enum ProcessLogError {
    #[error("log entry has no block number")]
    MissingBlockNumber,

    #[error("could not serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Message shape delivered to a stream destination, one per log entry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventMessage {
    pub subscription: String,
    pub event_name: String,
    pub event_data: Value,
}

/// Sink for the raw log entries a subscription polls off the node. Tracks
/// the block high-water-mark of processed entries, which is the sole
/// authority for where a recreated filter resumes.
#[async_trait]
pub trait LogProcessor: Send + Sync + Debug {
    async fn process_log(&mut self, entry: &Log) -> Result<(), ProcessLogError>;

    fn block_hwm(&self) -> U64;
}

/// Wraps each entry in an [`EventMessage`], publishes it to the stream the
/// subscription resolved at construction time, and advances the HWM.
#[derive(Debug)]
pub struct StreamLogProcessor {
    subscription_id: String,
    event: ABIEvent,
    stream: Arc<dyn EventStream>,
    block_hwm: U64,
}

impl StreamLogProcessor {
    pub fn new(subscription_id: &str, event: ABIEvent, stream: Arc<dyn EventStream>) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            event,
            stream,
            block_hwm: U64::ZERO,
        }
    }
}

#[async_trait]
impl LogProcessor for StreamLogProcessor {
    async fn process_log(&mut self, entry: &Log) -> Result<(), ProcessLogError> {
        // pending logs carry no block number and cannot move the HWM
        let block_number = entry.block_number.ok_or(ProcessLogError::MissingBlockNumber)?;

        let message = EventMessage {
            subscription: self.subscription_id.clone(),
            event_name: self.event.name.clone(),
            event_data: serde_json::to_value(entry)?,
        };
        self.stream.publish(&self.subscription_id, &serde_json::to_value(&message)?).await?;

        let block_number = U64::from(block_number);
        if block_number > self.block_hwm {
            self.block_hwm = block_number;
        }
        debug!("{}: processed log at block {}", self.subscription_id, block_number);
        Ok(())
    }

    fn block_hwm(&self) -> U64 {
        self.block_hwm
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingStream {
        published: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl EventStream for RecordingStream {
        async fn publish(&self, id: &str, message: &Value) -> Result<(), StreamError> {
            self.published.lock().unwrap().push((id.to_string(), message.clone()));
            Ok(())
        }
    }

    fn transfer_event() -> ABIEvent {
        ABIEvent { name: "Transfer".to_string(), inputs: vec![] }
    }

    fn log_at_block(block_number: Option<u64>) -> Log {
        let mut entry = json!({
            "address": "0x8888f1f195afa192cfee860698584c030f4c9db1",
            "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
            "data": "0x",
            "blockHash": "0x30cd2cb2b57439aa269a1a2e4e6ee438de132077bb0e4e23e8f20ae0e6a9a86f",
            "transactionHash": "0x30cd2cb2b57439aa269a1a2e4e6ee438de132077bb0e4e23e8f20ae0e6a9a86f",
            "transactionIndex": "0x0",
            "logIndex": "0x0",
            "removed": false,
        });
        entry["blockNumber"] = match block_number {
            Some(block_number) => json!(format!("0x{block_number:x}")),
            None => json!(null),
        };
        serde_json::from_value(entry).unwrap()
    }

    #[tokio::test]
    async fn test_publishes_one_message_per_entry_and_tracks_hwm() {
        let stream = Arc::new(RecordingStream::default());
        let mut processor = StreamLogProcessor::new("sub-1", transfer_event(), stream.clone());

        for block in [101u64, 102, 105, 103] {
            processor.process_log(&log_at_block(Some(block))).await.unwrap();
        }

        let published = stream.published.lock().unwrap();
        assert_eq!(published.len(), 4);
        assert_eq!(published[0].0, "sub-1");
        assert_eq!(published[0].1["event_name"], json!("Transfer"));
        assert_eq!(published[0].1["subscription"], json!("sub-1"));
        // HWM is the highest processed block, not the last
        assert_eq!(processor.block_hwm(), U64::from(105));
    }

    #[tokio::test]
    async fn test_entry_without_block_number_is_rejected() {
        let stream = Arc::new(RecordingStream::default());
        let mut processor = StreamLogProcessor::new("sub-1", transfer_event(), stream.clone());

        let err = processor.process_log(&log_at_block(None)).await.unwrap_err();
        assert!(matches!(err, ProcessLogError::MissingBlockNumber));
        assert!(stream.published.lock().unwrap().is_empty());
        assert_eq!(processor.block_hwm(), U64::ZERO);
    }
}
