//! Core types shared between the supervisor and the nodes it manages.
//!
//! This crate defines block identities, derivation pairs and the event envelope
//! a managed node pushes to the supervisor.

mod block;
pub use block::{BlockInfo, BlockSeal};

mod derived;
pub use derived::{DerivedIdPair, DerivedRefPair, DerivedSealPair};

mod replacement;
pub use replacement::BlockReplacement;

mod event;
pub use event::{ManagedEvent, SubscriptionEvent};
