// preview-api: Async Rust client for the provisioning API behind preview sites.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{DebugLevel, ProvisionClient};
pub use error::Error;
pub use transport::TransportConfig;
