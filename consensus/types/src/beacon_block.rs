use crate::{Attestation, AttesterSlashing, Deposit, Eth1Data, Hash256, ProposerSlashing, Slot};
use crate::{SignedVoluntaryExit, Signature};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The operations a proposer may include in a block body.
///
/// Full `BeaconBlockBody` fidelity (randao reveal, graffiti, sync committee fields, ...) is out
/// of scope: the state-transition function that consumes these fields is a non-goal here. Only
/// the fields the import pipeline fans out to the operation pools are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlockBody {
    pub eth1_data: Eth1Data,
    pub attestations: Vec<Attestation>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
    pub deposits: Vec<Deposit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: Signature,
}

impl SignedBeaconBlock {
    pub fn canonical_root(&self) -> Hash256 {
        self.message.canonical_root()
    }

    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    pub fn parent_root(&self) -> Hash256 {
        self.message.parent_root
    }
}
