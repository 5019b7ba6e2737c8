// public
pub mod manifest;
pub mod provider;
pub mod streams;
pub mod subscriptions;

mod abi;
pub use abi::{ABIEvent, ABIInput, ABIItem, ParamTypeError, ReadAbiError};

mod helpers;
pub use helpers::generate_random_id;

mod logger;
pub use logger::{setup_info_logger, setup_logger};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tracing::{error as bridge_error, info as bridge_info};
