mod error;
mod proto_array;
mod ssz_container;

use error::Error;
use parking_lot::RwLock;
use proto_array::{ProtoArray, ProtoNode};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

pub use error::Error as ProtoArrayError;

/// A block as known to the fork choice DAG. Carries only the fields `ForkChoice` needs to
/// evaluate ancestry and weight; full block bodies live in the store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    pub slot: Slot,
    pub root: Hash256,
    pub parent_root: Option<Hash256>,
    pub target_root: Hash256,
    pub state_root: Hash256,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

impl From<&ProtoNode> for Block {
    fn from(node: &ProtoNode) -> Self {
        Self {
            slot: node.slot,
            root: node.root,
            parent_root: None,
            target_root: node.target_root,
            state_root: node.state_root,
            justified_epoch: node.justified_epoch,
            finalized_epoch: node.finalized_epoch,
        }
    }
}

/// A `Vec` that grows to accommodate any index written to it, returning a default value for
/// indices never written. Used to index vote/balance state by validator index without tracking a
/// separate active-validator set.
#[derive(Clone, Default, PartialEq, Debug, Encode, Decode)]
pub struct ElasticList<T>(pub Vec<T>)
where
    T: Default + Clone + ssz::Encode + ssz::Decode;

impl<T> ElasticList<T>
where
    T: Default + Clone + ssz::Encode + ssz::Decode,
{
    fn get_or_default(&mut self, i: usize) -> &mut T {
        if i >= self.0.len() {
            self.0.resize(i + 1, T::default());
        }
        &mut self.0[i]
    }
}

#[derive(Clone, Copy, Default, PartialEq, Debug, Encode, Decode, Serialize, Deserialize)]
pub struct VoteTracker {
    current_root: Hash256,
    next_root: Hash256,
    next_epoch: Epoch,
}

/// Wraps `ProtoArray`, adding the vote/balance accounting needed to compute LMD-GHOST score
/// deltas between successive calls to `find_head`.
pub struct ProtoArrayForkChoice {
    proto_array: RwLock<ProtoArray>,
    votes: RwLock<ElasticList<VoteTracker>>,
    balances: RwLock<Vec<u64>>,
}

impl PartialEq for ProtoArrayForkChoice {
    fn eq(&self, other: &Self) -> bool {
        *self.proto_array.read() == *other.proto_array.read()
            && *self.votes.read() == *other.votes.read()
            && *self.balances.read() == *other.balances.read()
    }
}

impl ProtoArrayForkChoice {
    pub fn new(
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        finalized_root: Hash256,
    ) -> Result<Self, String> {
        let mut proto_array = ProtoArray {
            prune_threshold: 256,
            ffg_update_required: false,
            justified_epoch,
            finalized_epoch,
            nodes: Vec::with_capacity(1),
            indices: HashMap::with_capacity(1),
        };

        proto_array
            .on_new_block(
                finalized_block_slot,
                finalized_root,
                None,
                finalized_root,
                finalized_block_state_root,
                justified_epoch,
                finalized_epoch,
            )
            .map_err(|e| format!("failed to add finalized block to proto_array: {:?}", e))?;

        Ok(Self {
            proto_array: RwLock::new(proto_array),
            votes: RwLock::new(ElasticList::default()),
            balances: RwLock::new(vec![]),
        })
    }

    /// Register `block` with the fork choice DAG.
    pub fn process_block(&self, block: Block) -> Result<(), String> {
        if block.parent_root.is_none() {
            return Err("a block with a parent root of None may only be the finalized block"
                .to_string());
        }

        self.proto_array
            .write()
            .on_new_block(
                block.slot,
                block.root,
                block.parent_root,
                block.target_root,
                block.state_root,
                block.justified_epoch,
                block.finalized_epoch,
            )
            .map_err(|e| format!("process_block_error: {:?}", e))
    }

    /// Record that `validator_index` now votes for `block_root` as of `target_epoch`. The vote
    /// does not affect `find_head` until the next call, which folds it into a score delta.
    pub fn process_attestation(
        &self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) -> Result<(), String> {
        let mut votes = self.votes.write();
        let vote = votes.get_or_default(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    pub fn find_head(
        &self,
        justified_epoch: Epoch,
        justified_root: Hash256,
        finalized_epoch: Epoch,
        justified_balances: &[u64],
    ) -> Result<Hash256, String> {
        let mut proto_array = self.proto_array.write();
        let mut votes = self.votes.write();
        let mut old_balances = self.balances.write();

        let deltas = compute_deltas(&proto_array.indices, &mut votes, &old_balances, justified_balances)
            .map_err(|e| format!("find_head compute_deltas failed: {:?}", e))?;

        proto_array
            .apply_score_changes(deltas, justified_epoch, finalized_epoch)
            .map_err(|e| format!("find_head apply_score_changes failed: {:?}", e))?;

        *old_balances = justified_balances.to_vec();

        proto_array
            .find_head(&justified_root)
            .map_err(|e| format!("find_head failed: {:?}", e))
    }

    pub fn maybe_prune(&self, finalized_root: Hash256) -> Result<(), String> {
        let finalized_epoch = self.proto_array.read().finalized_epoch;
        self.proto_array
            .write()
            .maybe_prune(finalized_epoch, finalized_root)
            .map_err(|e| format!("maybe_prune failed: {:?}", e))
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.read().indices.contains_key(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<Block> {
        let proto_array = self.proto_array.read();
        let index = *proto_array.indices.get(block_root)?;
        let node = proto_array.nodes.get(index)?;
        let mut block = Block::from(node);
        block.parent_root = node.parent.and_then(|i| proto_array.nodes.get(i)).map(|n| n.root);
        Some(block)
    }

    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        let votes = self.votes.read();
        votes
            .0
            .get(validator_index)
            .filter(|v| **v != VoteTracker::default())
            .map(|v| (v.next_root, v.next_epoch))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        ssz::Encode::as_ssz_bytes(&ssz_container::SszContainer::from(self))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let container = <ssz_container::SszContainer as ssz::Decode>::from_ssz_bytes(bytes)
            .map_err(|e| format!("failed to decode proto_array bytes: {:?}", e))?;
        Ok(container.into())
    }
}

/// Computes per-node score deltas by comparing each validator's previous vote against their
/// current one, weighted by their justified-epoch balance.
///
/// Mirrors the eth2 fork-choice spec's `get_weight`/`compute_deltas` step: a validator whose vote
/// changed contributes `-old_balance` to the node it used to support and `+new_balance` to the
/// node it now supports.
fn compute_deltas(
    indices: &HashMap<Hash256, usize>,
    votes: &mut ElasticList<VoteTracker>,
    old_balances: &[u64],
    new_balances: &[u64],
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for val_index in 0..votes.0.len() {
        let vote = &mut votes.0[val_index];

        if vote.current_root == vote.next_root && old_balances.get(val_index) == new_balances.get(val_index)
        {
            continue;
        }

        let old_balance = old_balances.get(val_index).copied().unwrap_or(0);
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0);

        if vote.current_root != Hash256::zero() {
            if let Some(current_delta_index) = indices.get(&vote.current_root) {
                let delta = deltas
                    .get_mut(*current_delta_index)
                    .ok_or(Error::InvalidNodeIndex(*current_delta_index))?;
                *delta -= old_balance as i64;
            }
        }

        if vote.next_root != Hash256::zero() {
            if let Some(next_delta_index) = indices.get(&vote.next_root) {
                let delta = deltas
                    .get_mut(*next_delta_index)
                    .ok_or(Error::InvalidNodeIndex(*next_delta_index))?;
                *delta += new_balance as i64;
            }
        }

        vote.current_root = vote.next_root;
    }

    Ok(deltas)
}
