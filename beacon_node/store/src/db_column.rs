/// Logical keyspace a stored item belongs to. Real backends (e.g. LevelDB/RocksDB column
/// families) use this to keep unrelated object types from colliding on key bytes; `MemoryStore`
/// uses it as part of its in-memory map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DBColumn {
    BeaconBlock,
    BeaconState,
    BeaconChain,
    ForkChoice,
    DhtEnrs,
}

impl DBColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            DBColumn::BeaconBlock => "blk",
            DBColumn::BeaconState => "ste",
            DBColumn::BeaconChain => "bch",
            DBColumn::ForkChoice => "frk",
            DBColumn::DhtEnrs => "dht",
        }
    }
}
