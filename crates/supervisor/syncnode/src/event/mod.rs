//! Events exchanged between a managed node and the rest of the supervisor.

mod chain;
pub use chain::ChainEvent;

mod superchain;
pub use superchain::SuperchainEvent;
