/// A stand-in for the transport layer's peer identity. The real libp2p `PeerId` is an external
/// collaborator's type (the libp2p transport is out of scope here); only its role as an opaque,
/// hashable, cloneable handle used to route reputation/sync decisions matters to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
