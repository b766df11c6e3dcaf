use serde_derive::{Deserialize, Serialize};

/// Protocol-wide constants, passed explicitly rather than carried as generic-type constants.
///
/// Kept as a plain value, not a generic type parameter, so `ForkChoice`, `ProtoArrayForkChoice`
/// and the store never need to be generic over a network-constants type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    /// Number of epochs in an eth1 voting period.
    pub epochs_per_eth1_voting_period: u64,
    /// Consecutive slots fork choice will allow justified-checkpoint updates without the
    /// "safe slots" guard (ignored prior to this many slots into an epoch).
    pub safe_slots_to_update_justified: u64,
    pub max_effective_balance: u64,
    pub min_validator_withdrawability_delay: u64,
    /// Max distance a gossiped attestation/block's slot may be ahead of our clock.
    pub maximum_gossip_clock_disparity_millis: u64,
}

impl ChainSpec {
    pub fn mainnet() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            epochs_per_eth1_voting_period: 64,
            safe_slots_to_update_justified: 8,
            max_effective_balance: 32_000_000_000,
            min_validator_withdrawability_delay: 256,
            maximum_gossip_clock_disparity_millis: 500,
        }
    }

    pub fn minimal() -> Self {
        Self {
            seconds_per_slot: 6,
            slots_per_epoch: 8,
            epochs_per_eth1_voting_period: 4,
            safe_slots_to_update_justified: 8,
            max_effective_balance: 32_000_000_000,
            min_validator_withdrawability_delay: 256,
            maximum_gossip_clock_disparity_millis: 500,
        }
    }

    pub fn slots_per_eth1_voting_period(&self) -> u64 {
        self.epochs_per_eth1_voting_period * self.slots_per_epoch
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}
