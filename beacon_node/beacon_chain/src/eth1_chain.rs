use parking_lot::RwLock;
use std::collections::HashMap;
use types::{BeaconState, ChainSpec, Deposit, Eth1Data, Hash256, PublicKey};

type Result<T> = std::result::Result<T, Error>;

/// Inbound notifications from the (out-of-scope) eth1 follower service. Modelled as a plain enum
/// with no transport behind it, the same way gossip `Work` items are.
#[derive(Debug, Clone)]
pub enum Eth1FollowerMessage {
    /// New deposits observed in an eth1 block at `block_number`.
    DepositsFromBlock {
        block_number: u64,
        deposits: Vec<Deposit>,
    },
    /// The eth1 block the follower judges to be at or past `MIN_GENESIS_TIME`.
    MinGenesisTimeBlock { block_hash: Hash256, timestamp: u64 },
    /// A validator client asking whether a given key has a deposit on chain.
    ValidatorRequest { pubkey: PublicKey },
}

#[derive(Debug)]
pub enum Error {
    /// Unable to return an `Eth1Data` for the given epoch.
    EpochUnavailable,
    /// An error from the backend service (e.g. the web3 data fetcher).
    BackendError(String),
}

pub trait Eth1Chain: Send + Sync {
    /// Returns the `Eth1Data` that should be included in a block being produced for the given
    /// `state`.
    fn eth1_data_for_epoch(&self, beacon_state: &BeaconState, spec: &ChainSpec) -> Result<Eth1Data>;

    /// Returns all deposits between `state.eth1_deposit_index` and `state.eth1_data.deposit_count`.
    ///
    /// It is possible that not all returned deposits can be included in a block; there may be
    /// more than the per-block maximum, or churn may be too high.
    fn queued_deposits(&self, beacon_state: &BeaconState) -> Result<Vec<Deposit>>;
}

/// Deterministic eth1 data generator for interop/testnet use, producing the same `Eth1Data` for
/// a given voting period without talking to an eth1 node.
#[derive(Default)]
pub struct InteropEth1Chain;

impl Eth1Chain for InteropEth1Chain {
    fn eth1_data_for_epoch(&self, state: &BeaconState, spec: &ChainSpec) -> Result<Eth1Data> {
        let current_epoch = state.current_epoch(spec.slots_per_epoch);
        let slots_per_voting_period = spec.slots_per_eth1_voting_period();
        let current_voting_period = current_epoch.as_u64() / slots_per_voting_period.max(1);

        let deposit_root = fnv_hash(&int_to_bytes32(current_voting_period));
        let block_hash = fnv_hash(&deposit_root);

        Ok(Eth1Data {
            deposit_root: Hash256::from_slice(&deposit_root),
            deposit_count: state.eth1_deposit_index,
            block_hash: Hash256::from_slice(&block_hash),
        })
    }

    fn queued_deposits(&self, _beacon_state: &BeaconState) -> Result<Vec<Deposit>> {
        Ok(vec![])
    }
}

/// A single candidate `Eth1Data`'s tally: how many votes it has received and the insertion order
/// of its first vote, used to break ties in favour of whichever candidate was proposed earliest.
#[derive(Debug, Clone, Copy)]
struct VoteRecord {
    count: u64,
    first_seen_order: u64,
}

/// Caches `Eth1Data` votes observed across proposed blocks in the current voting period and the
/// deposits reported by the eth1 follower, selecting the most-voted-for `Eth1Data` for inclusion
/// in the next block.
#[derive(Default)]
pub struct CachingEth1Chain {
    votes: RwLock<HashMap<Eth1Data, VoteRecord>>,
    next_vote_order: RwLock<u64>,
    deposits: RwLock<Vec<Deposit>>,
}

impl CachingEth1Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single block's `Eth1Data` vote.
    pub fn vote(&self, data: Eth1Data) {
        let mut votes = self.votes.write();
        let mut order = self.next_vote_order.write();
        votes
            .entry(data)
            .and_modify(|record| record.count += 1)
            .or_insert_with(|| {
                let record = VoteRecord {
                    count: 1,
                    first_seen_order: *order,
                };
                *order += 1;
                record
            });
    }

    /// Folds an eth1-follower notification into the cache. `MinGenesisTimeBlock` and
    /// `ValidatorRequest` carry no state this cache needs to retain; only deposits accumulate.
    pub fn record_message(&self, message: Eth1FollowerMessage) {
        if let Eth1FollowerMessage::DepositsFromBlock { mut deposits, .. } = message {
            self.deposits.write().append(&mut deposits);
        }
    }

    /// Clears accumulated votes at the start of a new voting period, per
    /// `slots_per_eth1_voting_period`.
    pub fn clear_votes(&self) {
        self.votes.write().clear();
    }

    fn winning_vote(&self) -> Option<Eth1Data> {
        self.votes
            .read()
            .iter()
            .max_by_key(|(_, record)| (record.count, std::cmp::Reverse(record.first_seen_order)))
            .map(|(data, _)| data.clone())
    }
}

impl Eth1Chain for CachingEth1Chain {
    fn eth1_data_for_epoch(&self, state: &BeaconState, _spec: &ChainSpec) -> Result<Eth1Data> {
        Ok(self.winning_vote().unwrap_or_else(|| state.eth1_data.clone()))
    }

    fn queued_deposits(&self, state: &BeaconState) -> Result<Vec<Deposit>> {
        let start = state.eth1_deposit_index as usize;
        Ok(self
            .deposits
            .read()
            .iter()
            .skip(start)
            .take((state.eth1_data.deposit_count.saturating_sub(state.eth1_deposit_index)) as usize)
            .cloned()
            .collect())
    }
}

/// Returns `int` as little-endian bytes padded to 32.
fn int_to_bytes32(int: u64) -> Vec<u8> {
    let mut vec = int.to_le_bytes().to_vec();
    vec.resize(32, 0);
    vec
}

/// A stand-in for a cryptographic hash, since the real hashing crate is tied to BLS-adjacent
/// dependencies that are out of scope here. Deterministic and collision-avoidant enough for
/// interop genesis material, not for consensus-critical hashing.
fn fnv_hash(bytes: &[u8]) -> [u8; 32] {
    let mut state: u64 = 0xcbf29ce484222325;
    let mut out = [0u8; 32];
    for (i, byte) in bytes.iter().enumerate() {
        state ^= *byte as u64;
        state = state.wrapping_mul(0x100000001b3);
        out[i % 32] ^= (state & 0xff) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let chain = InteropEth1Chain::default();
        let spec = ChainSpec::minimal();
        let state = BeaconState::default();

        let a = chain.eth1_data_for_epoch(&state, &spec).unwrap();
        let b = chain.eth1_data_for_epoch(&state, &spec).unwrap();
        assert_eq!(a, b);
    }

    fn eth1_data(block_hash: u8) -> Eth1Data {
        Eth1Data {
            deposit_root: Hash256::zero(),
            deposit_count: 0,
            block_hash: Hash256::from_slice(&[block_hash; 32]),
        }
    }

    #[test]
    fn caching_chain_picks_majority_vote() {
        let chain = CachingEth1Chain::new();
        let spec = ChainSpec::minimal();
        let state = BeaconState::default();

        chain.vote(eth1_data(1));
        chain.vote(eth1_data(2));
        chain.vote(eth1_data(2));

        assert_eq!(
            chain.eth1_data_for_epoch(&state, &spec).unwrap(),
            eth1_data(2)
        );
    }

    #[test]
    fn caching_chain_breaks_ties_with_earliest_vote() {
        let chain = CachingEth1Chain::new();
        let spec = ChainSpec::minimal();
        let state = BeaconState::default();

        chain.vote(eth1_data(1));
        chain.vote(eth1_data(2));

        assert_eq!(
            chain.eth1_data_for_epoch(&state, &spec).unwrap(),
            eth1_data(1)
        );
    }

    #[test]
    fn caching_chain_falls_back_to_state_without_votes() {
        let chain = CachingEth1Chain::new();
        let spec = ChainSpec::minimal();
        let mut state = BeaconState::default();
        state.eth1_data = eth1_data(9);

        assert_eq!(
            chain.eth1_data_for_epoch(&state, &spec).unwrap(),
            eth1_data(9)
        );
    }

    #[test]
    fn deposits_from_block_message_accumulates() {
        let chain = CachingEth1Chain::new();
        chain.record_message(Eth1FollowerMessage::DepositsFromBlock {
            block_number: 10,
            deposits: vec![Deposit::default(), Deposit::default()],
        });

        let mut state = BeaconState::default();
        state.eth1_data.deposit_count = 2;

        assert_eq!(chain.queued_deposits(&state).unwrap().len(), 2);
    }
}
