use crate::{DBColumn, Error, SimpleStoreItem, Store};
use parking_lot::RwLock;
use std::collections::HashMap;
use types::Hash256;

/// An in-memory `Store`, useful for tests and for nodes that do not require persistence across
/// restarts.
pub struct MemoryStore {
    db: RwLock<HashMap<(DBColumn, Vec<u8>), Vec<u8>>>,
}

impl MemoryStore {
    pub fn open() -> Self {
        Self {
            db: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::open()
    }
}

impl Store for MemoryStore {
    fn put<I: SimpleStoreItem>(&self, key: &Hash256, item: &I) -> Result<(), Error> {
        self.db
            .write()
            .insert((I::db_column(), key.as_bytes().to_vec()), item.as_store_bytes());
        Ok(())
    }

    fn get<I: SimpleStoreItem>(&self, key: &Hash256) -> Result<Option<I>, Error> {
        self.db
            .read()
            .get(&(I::db_column(), key.as_bytes().to_vec()))
            .map(|bytes| I::from_store_bytes(bytes))
            .transpose()
    }

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> bool {
        self.db.read().contains_key(&(column, key.to_vec()))
    }

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error> {
        self.db.write().remove(&(column, key.to_vec()));
        Ok(())
    }

    fn put_bytes(&self, column: DBColumn, key: &[u8], bytes: Vec<u8>) -> Result<(), Error> {
        self.db.write().insert((column, key.to_vec()), bytes);
        Ok(())
    }

    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.read().get(&(column, key.to_vec())).cloned())
    }
}
