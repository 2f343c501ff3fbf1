//! This crate keeps a managed node aligned with the supervisor's canonical safety view.
//!
//! A [`ManagedNode`](syncnode::ManagedNode) ingests events pushed or polled from its node,
//! forwards safety watermark updates to it and drives it back to a consistent state when
//! its local chain diverges from the canonical one.

pub mod config;
pub use config::SyncNodeConfig;

pub mod event;
pub mod syncnode;
