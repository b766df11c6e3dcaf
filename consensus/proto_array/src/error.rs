use types::{Epoch, Hash256};

#[derive(Debug, PartialEq)]
pub enum Error {
    InvalidDeltaLen { deltas: usize, indices: usize },
    InvalidNodeIndex(usize),
    InvalidNodeDelta(usize),
    DeltaOverflow(usize),
    InvalidParentDelta(usize),
    InvalidIndexDelta(usize),
    IndexOverflow(&'static str),
    JustifiedNodeUnknown(Hash256),
    FinalizedNodeUnknown(Hash256),
    InvalidJustifiedIndex(usize),
    InvalidBestDescendant(usize),
    InvalidParentIndex(usize),
    InvalidBestNode {
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        node_justified_epoch: Epoch,
        node_finalized_epoch: Epoch,
    },
    RevertedFinalizedEpoch {
        current_finalized_epoch: Epoch,
        new_finalized_epoch: Epoch,
    },
    InvalidBalancesLen { balances: usize, votes: usize },
    UnknownBlock(Hash256),
    FailedToDecodeProtoArray(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
