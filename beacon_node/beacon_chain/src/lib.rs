mod beacon_chain;
mod beacon_chain_builder;
pub mod chain_config;
mod errors;
pub mod eth1_chain;
pub mod events;
mod fork_choice_store;
mod metrics;
mod naive_aggregation_pool;
mod persisted_chain;

pub use crate::beacon_chain::{BeaconChain, Result as BeaconChainResult};
pub use beacon_chain_builder::BeaconChainBuilder;
pub use chain_config::ChainConfig;
pub use errors::BeaconChainError;
pub use eth1_chain::{CachingEth1Chain, Eth1Chain, Eth1FollowerMessage, InteropEth1Chain};
pub use events::{EventKind, ServerSentEventHandler};
pub use fork_choice_store::BeaconForkChoiceStore;
pub use persisted_chain::PersistedBeaconChain;
pub use naive_aggregation_pool::{
    InsertOutcome as AggregationInsertOutcome, NaiveAggregationPool,
};
