mod fc_store;
mod fork_choice;

pub use fc_store::ForkChoiceStore;
pub use fork_choice::{
    compute_slots_since_epoch_start, Error, ForkChoice, InvalidAttestation, InvalidBlock,
    PersistedForkChoice, QueuedAttestation,
};
pub use proto_array::Block as ProtoBlock;
