use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// A single parameter of an ABI event definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABIInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,

    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ABIInput>>,
}

#[derive(thiserror::Error, Debug)]
pub enum ParamTypeError {
    #[error("tuple type specified but no components found")]
    MissingComponents,
}

/// One entry of a contract ABI JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABIItem {
    #[serde(default)]
    pub inputs: Vec<ABIInput>,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub type_: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ReadAbiError {
    #[error("Could not read ABI JSON: {0}")]
    CouldNotReadAbiJson(#[from] serde_json::Error),
}

/// The event definition a subscription is registered against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABIEvent {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inputs: Vec<ABIInput>,
}

impl ABIEvent {
    /// Extracts the event definitions out of a contract ABI JSON document.
    pub fn from_abi_json(abi_json: &str) -> Result<Vec<ABIEvent>, ReadAbiError> {
        let items: Vec<ABIItem> = serde_json::from_str(abi_json)?;
        Ok(items
            .into_iter()
            .filter(|item| item.type_ == "event")
            .map(|item| ABIEvent { name: item.name, inputs: item.inputs })
            .collect())
    }

    /// Renders the canonical `name(type1,type2,...)` form of the event.
    /// Depends only on the event name and the ordered parameter types, never
    /// on parameter names, so it is stable across process restarts.
    pub fn signature(&self) -> Result<String, ParamTypeError> {
        let name = &self.name;
        let params = self
            .inputs
            .iter()
            .map(format_param_type)
            .collect::<Result<Vec<_>, _>>()?
            .join(",");

        Ok(format!("{name}({params})"))
    }

    /// Keccak-256 of the canonical signature, the topic the node matches
    /// logs against.
    pub fn topic_id(&self) -> Result<B256, ParamTypeError> {
        Ok(keccak256(self.signature()?))
    }
}

fn format_param_type(input: &ABIInput) -> Result<String, ParamTypeError> {
    let base_type = input.type_.split('[').next().unwrap_or(&input.type_);
    let array_suffix = input.type_.strip_prefix(base_type).unwrap_or("");

    let type_str = match base_type {
        "tuple" => {
            let inner = input
                .components
                .as_ref()
                .ok_or(ParamTypeError::MissingComponents)?
                .iter()
                .map(format_param_type)
                .collect::<Result<Vec<_>, _>>()?
                .join(",");
            format!("({inner})")
        }
        _ => base_type.to_string(),
    };

    Ok(format!("{type_str}{array_suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, type_: &str) -> ABIInput {
        ABIInput {
            indexed: None,
            name: name.to_string(),
            type_: type_.to_string(),
            components: None,
        }
    }

    fn transfer_event(from_name: &str, to_name: &str, value_name: &str) -> ABIEvent {
        ABIEvent {
            name: "Transfer".to_string(),
            inputs: vec![
                input(from_name, "address"),
                input(to_name, "address"),
                input(value_name, "uint256"),
            ],
        }
    }

    #[test]
    fn test_signature_ignores_parameter_names() {
        let a = transfer_event("from", "to", "value");
        let b = transfer_event("sender", "recipient", "amount");
        assert_eq!(a.signature().unwrap(), "Transfer(address,address,uint256)");
        assert_eq!(a.signature().unwrap(), b.signature().unwrap());
    }

    #[test]
    fn test_signature_with_no_parameters() {
        let event = ABIEvent { name: "Paused".to_string(), inputs: vec![] };
        assert_eq!(event.signature().unwrap(), "Paused()");
    }

    #[test]
    fn test_signature_keeps_array_suffix() {
        let event = ABIEvent {
            name: "BatchMinted".to_string(),
            inputs: vec![input("ids", "uint256[]"), input("owner", "address")],
        };
        assert_eq!(event.signature().unwrap(), "BatchMinted(uint256[],address)");
    }

    #[test]
    fn test_signature_expands_tuple_components() {
        let mut order = input("order", "tuple");
        order.components = Some(vec![input("maker", "address"), input("amount", "uint256")]);
        let event = ABIEvent { name: "OrderPlaced".to_string(), inputs: vec![order] };
        assert_eq!(event.signature().unwrap(), "OrderPlaced((address,uint256))");
    }

    #[test]
    fn test_signature_tuple_without_components_fails() {
        let event =
            ABIEvent { name: "OrderPlaced".to_string(), inputs: vec![input("order", "tuple")] };
        assert!(matches!(event.signature(), Err(ParamTypeError::MissingComponents)));
    }

    #[test]
    fn test_topic_id_matches_known_transfer_topic() {
        let event = transfer_event("from", "to", "value");
        assert_eq!(
            format!("{:x}", event.topic_id().unwrap()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_from_abi_json_keeps_only_events() {
        let abi = r#"[
            {"type": "function", "name": "transfer", "inputs": []},
            {"type": "event", "name": "Transfer", "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256"}
            ]},
            {"type": "constructor", "inputs": []}
        ]"#;
        let events = ABIEvent::from_abi_json(abi).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].signature().unwrap(), "Transfer(address,address,uint256)");
    }
}
