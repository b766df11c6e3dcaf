use crate::{DBColumn, Error, SimpleStoreItem};
use eth2_ssz::{Decode, Encode};
use types::{BeaconState, SignedBeaconBlock};

impl SimpleStoreItem for SignedBeaconBlock {
    fn db_column() -> DBColumn {
        DBColumn::BeaconBlock
    }

    fn as_store_bytes(&self) -> Vec<u8> {
        self.as_ssz_bytes()
    }

    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_ssz_bytes(bytes).map_err(|e| Error::SszDecodeError(format!("{:?}", e)))
    }
}

impl SimpleStoreItem for BeaconState {
    fn db_column() -> DBColumn {
        DBColumn::BeaconState
    }

    fn as_store_bytes(&self) -> Vec<u8> {
        self.as_ssz_bytes()
    }

    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_ssz_bytes(bytes).map_err(|e| Error::SszDecodeError(format!("{:?}", e)))
    }
}
