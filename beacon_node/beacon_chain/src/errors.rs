use crate::eth1_chain::Error as Eth1ChainError;
use fork_choice::Error as ForkChoiceError;
use std::fmt;
use types::Hash256;

/// Failure taxonomy for the chain's public entry points. Named after the error-kind taxonomy a
/// beacon node's consensus core reports, not after any one component's internal type.
#[derive(Debug)]
pub enum BeaconChainError {
    /// A block or attestation failed validation; permanently rejected.
    Invalid(String),
    /// A block's parent (or an attestation's attested block) is not yet known.
    ParentUnknown(Hash256),
    /// A block or attestation's slot is ahead of the current slot.
    FutureSlot,
    /// Durable storage reported an error.
    StoreError(String),
    ForkChoiceError(String),
    OperationPoolError(String),
    Eth1ChainError(Eth1ChainError),
}

impl fmt::Display for BeaconChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeaconChainError::Invalid(reason) => write!(f, "invalid: {}", reason),
            BeaconChainError::ParentUnknown(root) => write!(f, "parent unknown: {:?}", root),
            BeaconChainError::FutureSlot => write!(f, "future slot"),
            BeaconChainError::StoreError(e) => write!(f, "store error: {}", e),
            BeaconChainError::ForkChoiceError(e) => write!(f, "fork choice error: {}", e),
            BeaconChainError::OperationPoolError(e) => write!(f, "operation pool error: {}", e),
            BeaconChainError::Eth1ChainError(e) => write!(f, "eth1 chain error: {:?}", e),
        }
    }
}

impl std::error::Error for BeaconChainError {}

impl<T: fmt::Debug> From<ForkChoiceError<T>> for BeaconChainError {
    fn from(e: ForkChoiceError<T>) -> Self {
        BeaconChainError::ForkChoiceError(format!("{:?}", e))
    }
}

impl From<store::Error> for BeaconChainError {
    fn from(e: store::Error) -> Self {
        BeaconChainError::StoreError(format!("{:?}", e))
    }
}

impl From<Eth1ChainError> for BeaconChainError {
    fn from(e: Eth1ChainError) -> Self {
        BeaconChainError::Eth1ChainError(e)
    }
}
