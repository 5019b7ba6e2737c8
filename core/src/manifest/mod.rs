pub mod core;
pub mod network;
pub mod stream;
pub mod yaml;
