//! Configuration for the managed node synchronization engine.

mod syncnode_config;
pub use syncnode_config::SyncNodeConfig;
