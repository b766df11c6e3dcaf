mod attestation_pool;
mod exit_pool;
mod metrics;
mod slashing_pool;

pub use attestation_pool::{AttestationPool, Error as AttestationError};
pub use exit_pool::ExitPool;
pub use slashing_pool::{AttesterSlashingPool, ProposerSlashingPool};

use types::{
    Attestation, AttesterSlashing, BeaconBlockBody, BeaconState, ChainSpec, ProposerSlashing,
    SignedVoluntaryExit, Slot,
};

/// Collects the four uniform per-operation-type pools a proposer draws from when assembling a
/// block body, and that gossip validation feeds as attestations/slashings/exits arrive.
#[derive(Default)]
pub struct OperationPool {
    attestations: AttestationPool,
    attester_slashings: AttesterSlashingPool,
    proposer_slashings: ProposerSlashingPool,
    voluntary_exits: ExitPool,
}

impl OperationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_attestation(&self, attestation: Attestation) -> Result<(), AttestationError> {
        self.attestations.insert(attestation)?;
        metrics::set_gauge(&metrics::NUM_ATTESTATIONS, self.attestations.num_attestations() as i64);
        Ok(())
    }

    pub fn insert_attester_slashing(&self, slashing: AttesterSlashing) {
        self.attester_slashings.insert(slashing);
        metrics::set_gauge(
            &metrics::NUM_ATTESTER_SLASHINGS,
            self.attester_slashings.num_slashings() as i64,
        );
    }

    pub fn insert_proposer_slashing(&self, slashing: ProposerSlashing) {
        self.proposer_slashings.insert(slashing);
        metrics::set_gauge(
            &metrics::NUM_PROPOSER_SLASHINGS,
            self.proposer_slashings.num_slashings() as i64,
        );
    }

    pub fn insert_voluntary_exit(&self, exit: SignedVoluntaryExit) {
        self.voluntary_exits.insert(exit);
        metrics::set_gauge(&metrics::NUM_VOLUNTARY_EXITS, self.voluntary_exits.num_exits() as i64);
    }

    /// Everything the pool currently has to offer a block proposed atop `state`.
    pub fn get_for_block(&self, state: &BeaconState, spec: &ChainSpec) -> BeaconBlockBody {
        BeaconBlockBody {
            eth1_data: state.eth1_data.clone(),
            attestations: self.attestations.get_attestations(state, spec),
            attester_slashings: self.attester_slashings.get_slashings(),
            proposer_slashings: self.proposer_slashings.get_slashings(),
            voluntary_exits: self.voluntary_exits.get_voluntary_exits(),
            deposits: vec![],
        }
    }

    /// Remove everything a just-imported block included, so it is not offered again.
    pub fn remove_all(&self, body: &BeaconBlockBody) {
        self.attestations.remove_attestations(&body.attestations);

        let proposer_slashed: Vec<u64> = body
            .proposer_slashings
            .iter()
            .map(|s| s.proposer_index())
            .collect();
        self.proposer_slashings.remove_proposer_slashings(&proposer_slashed);

        let attester_slashed: Vec<u64> = body
            .attester_slashings
            .iter()
            .flat_map(|s| s.slashable_indices())
            .collect();
        self.attester_slashings.remove_attester_slashings(&attester_slashed);

        let exited: Vec<u64> = body
            .voluntary_exits
            .iter()
            .map(|e| e.message.validator_index)
            .collect();
        self.voluntary_exits.remove_voluntary_exits(&exited);
    }

    /// Called each slot to prune stale attestations.
    pub fn on_slot(&self, current_slot: Slot, spec: &ChainSpec) {
        self.attestations.prune(current_slot, spec);
        metrics::set_gauge(&metrics::NUM_ATTESTATIONS, self.attestations.num_attestations() as i64);
    }
}
