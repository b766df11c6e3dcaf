mod chain_store;
mod db_column;
mod errors;
mod impls;
mod memory_store;

pub use chain_store::{ChainStore, ChainStoreError, StoreTransaction};
pub use db_column::DBColumn;
pub use errors::Error;
pub use memory_store::MemoryStore;

use types::Hash256;

/// An object that can be stored under a fixed `DBColumn` as opaque bytes.
///
/// Implementors hand their own encoding (typically SSZ) to `as_store_bytes`/`from_store_bytes`;
/// the store itself never interprets the bytes.
pub trait SimpleStoreItem: Sized {
    fn db_column() -> DBColumn;

    fn as_store_bytes(&self) -> Vec<u8>;

    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error>;
}

/// Key-value storage for `SimpleStoreItem`s, keyed by a 32-byte `Hash256` (a block or state
/// root).
pub trait Store: Sync + Send + Sized {
    fn put<I: SimpleStoreItem>(&self, key: &Hash256, item: &I) -> Result<(), Error>;

    fn get<I: SimpleStoreItem>(&self, key: &Hash256) -> Result<Option<I>, Error>;

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> bool;

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error>;

    /// Stores an already-encoded blob under an arbitrary key, for callers (e.g. `ChainStore`)
    /// that persist their own SSZ-encoded snapshots rather than a `SimpleStoreItem`.
    fn put_bytes(&self, column: DBColumn, key: &[u8], bytes: Vec<u8>) -> Result<(), Error>;

    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
}
