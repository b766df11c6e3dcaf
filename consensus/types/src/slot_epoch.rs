use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use tree_hash_derive::TreeHash;

/// A slot number: the smallest unit of time in the protocol, one block-production opportunity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Encode, Decode, TreeHash,
)]
#[serde(transparent)]
pub struct Slot(u64);

/// An epoch number: a fixed-size group of slots over which finalization accumulates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Encode, Decode, TreeHash,
)]
#[serde(transparent)]
pub struct Epoch(u64);

macro_rules! impl_common {
    ($type:ident) => {
        impl $type {
            pub const fn new(n: u64) -> Self {
                Self(n)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }

        impl From<u64> for $type {
            fn from(n: u64) -> Self {
                Self(n)
            }
        }

        impl From<$type> for u64 {
            fn from(n: $type) -> Self {
                n.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add<u64> for $type {
            type Output = Self;
            fn add(self, rhs: u64) -> Self {
                Self(self.0.saturating_add(rhs))
            }
        }

        impl Add<$type> for $type {
            type Output = Self;
            fn add(self, rhs: $type) -> Self {
                Self(self.0.saturating_add(rhs.0))
            }
        }

        impl AddAssign<u64> for $type {
            fn add_assign(&mut self, rhs: u64) {
                self.0 = self.0.saturating_add(rhs);
            }
        }

        impl Sub<u64> for $type {
            type Output = Self;
            fn sub(self, rhs: u64) -> Self {
                Self(self.0.saturating_sub(rhs))
            }
        }

        impl Sub<$type> for $type {
            type Output = u64;
            fn sub(self, rhs: $type) -> u64 {
                self.0.saturating_sub(rhs.0)
            }
        }

        impl SubAssign<u64> for $type {
            fn sub_assign(&mut self, rhs: u64) {
                self.0 = self.0.saturating_sub(rhs);
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    /// Returns the epoch containing `self`, given `slots_per_epoch`.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }

    /// Returns `true` if `self` is the first slot of its epoch.
    pub fn is_epoch_start(&self, slots_per_epoch: u64) -> bool {
        self.0 % slots_per_epoch == 0
    }
}

impl Epoch {
    /// Returns the first slot of `self`.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_start_slot_roundtrip() {
        for epoch in 0..8u64 {
            let start = Epoch::new(epoch).start_slot(32);
            assert_eq!(start.epoch(32), Epoch::new(epoch));
        }
    }

    #[test]
    fn slot_saturates() {
        assert_eq!(Slot::new(0) - 1, Slot::new(0));
        assert_eq!(Slot::new(0) - Slot::new(5), 0);
    }
}
