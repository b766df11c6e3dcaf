//! BLS signatures are an out-of-scope external primitive. These types carry signature bytes
//! through the pipeline without verifying them; a real deployment plugs in the `bls` crate's
//! `Signature`/`PublicKey` in the same field positions.
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Signature(Vec<u8>);

impl Default for Signature {
    fn default() -> Self {
        Self(vec![0; 96])
    }
}

impl Signature {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }

    /// Placeholder aggregation: real BLS signature aggregation is out of scope.
    pub fn extend(&mut self, other: &Signature) {
        self.0.extend_from_slice(&other.0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct PublicKey(Vec<u8>);

impl Default for PublicKey {
    fn default() -> Self {
        Self(vec![0; 48])
    }
}
