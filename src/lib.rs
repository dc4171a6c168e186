#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
#[cfg(feature = "esp32")]
pub mod firmware;
pub mod manager;
pub mod runtime;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

pub use config::ManagerConfig;
pub use driver::{DriverEvent, NetworkDriver};
pub use error::ManagerError;
pub use manager::{read_connection_state, ConnectionManager, ManagerSnapshot};
pub use store::{BlobStore, CredentialStore, FlashBlobStore, MemoryBlobStore};
pub use types::{ConnectionState, ConnectionStatus, LinkInfo, ScanRecord, Ssid, WifiCredentials};
