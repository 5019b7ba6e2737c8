use serde::{Deserialize, Serialize};

/// A node this bridge connects to.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Network {
    pub name: String,

    pub chain_id: u64,

    pub rpc: String,
}
