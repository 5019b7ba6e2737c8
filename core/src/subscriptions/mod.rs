mod filter;
pub use filter::{InitialFilter, PersistedFilter, RestartFilter};

mod log_processor;
pub use log_processor::{EventMessage, LogProcessor, ProcessLogError, StreamLogProcessor};

mod manager;
pub use manager::{StreamRegistry, SubscriptionManager};

mod subscription;
pub use subscription::{
    Subscription, SubscriptionDescriptor, SubscriptionError, DEFAULT_CALL_TIMEOUT,
};
