use alloy::primitives::{Address, B256, U64};
use serde::{Deserialize, Serialize};

const LATEST: &str = "latest";

/// The part of the filter recorded to storage. Assigned once when the
/// subscription is registered and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFilter {
    #[serde(rename = "address", default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Vec<B256>>>,
}

/// Filter creation request sent the first time a subscription is registered:
/// watch from whatever block is current at creation time, no replay.
#[derive(Debug, Clone, Serialize)]
pub struct InitialFilter {
    #[serde(flatten)]
    pub filter: PersistedFilter,

    #[serde(rename = "fromBlock")]
    pub from_block: String,

    #[serde(rename = "toBlock")]
    pub to_block: String,
}

impl InitialFilter {
    pub fn new(filter: PersistedFilter) -> Self {
        Self { filter, from_block: LATEST.to_string(), to_block: LATEST.to_string() }
    }
}

/// Filter creation request used to rebuild a filter from a known resume
/// point. The resume block is included so nothing can be lost; the overlap
/// it produces is deduplicated downstream.
#[derive(Debug, Clone, Serialize)]
pub struct RestartFilter {
    #[serde(flatten)]
    pub filter: PersistedFilter,

    #[serde(rename = "fromBlock")]
    pub from_block: U64,

    #[serde(rename = "toBlock")]
    pub to_block: String,
}

impl RestartFilter {
    pub fn new(filter: PersistedFilter, since: U64) -> Self {
        Self { filter, from_block: since, to_block: LATEST.to_string() }
    }
}
