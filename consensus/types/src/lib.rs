//! Core protocol types shared by every crate in the workspace.
//!
//! Every module is private, every public item re-exported at the crate root so downstream crates
//! write `use types::*;`.

mod attestation;
mod beacon_block;
mod beacon_state;
mod chain_spec;
mod checkpoint;
mod crypto_stub;
mod eth1_data;
mod fork;
mod hash256;
mod slashings;
mod slot_epoch;

pub use attestation::{Attestation, AttestationData, IndexedAttestation};
pub use beacon_block::{BeaconBlock, BeaconBlockBody, SignedBeaconBlock};
pub use beacon_state::BeaconState;
pub use chain_spec::ChainSpec;
pub use checkpoint::Checkpoint;
pub use crypto_stub::{PublicKey, Signature};
pub use eth1_data::{Deposit, DepositData, Eth1Data};
pub use fork::Fork;
pub use hash256::Hash256;
pub use slashings::{
    AttesterSlashing, BeaconBlockHeader, ProposerSlashing, SignedBeaconBlockHeader,
    SignedVoluntaryExit, VoluntaryExit,
};
pub use slot_epoch::{Epoch, Slot};
