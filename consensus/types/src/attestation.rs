use crate::{Checkpoint, Epoch, Hash256, Signature, Slot};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    pub beacon_block_root: Hash256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An unaggregated or (naively) aggregated vote. `aggregation_bits` is modelled as the set of
/// validator indices it covers rather than a packed bitlist, since the committee-shuffling
/// machinery that would otherwise map bit position to validator index is out of scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bits: Vec<u64>,
    pub data: AttestationData,
    pub signature: Signature,
}

impl Attestation {
    /// Merge another attestation's aggregation bits and signature into `self`. Callers must
    /// ensure `other.data == self.data`.
    pub fn aggregate(&mut self, other: &Attestation) {
        for index in &other.aggregation_bits {
            if !self.aggregation_bits.contains(index) {
                self.aggregation_bits.push(*index);
            }
        }
        self.aggregation_bits.sort_unstable();
        self.signature.extend(&other.signature);
    }
}

/// A vote already resolved to validator indices (post-committee-lookup), the form the
/// fork-choice engine consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    pub attesting_indices: Vec<u64>,
    pub data: AttestationData,
    pub signature: Signature,
}

impl IndexedAttestation {
    pub fn target_epoch(&self) -> Epoch {
        self.data.target.epoch
    }
}
