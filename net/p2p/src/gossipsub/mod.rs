//! Gossip topic structure, subscription filtering and score parameters
//! (spec.md §4.4, §4.5).

pub mod params;
pub mod subscription_filter;
pub mod topics;

pub use subscription_filter::{ForkDigestComputer, Initialized, SubscriptionFilter};
pub use topics::{GossipKind, GossipTopic};
