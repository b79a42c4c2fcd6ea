//! Core type definitions

use serde::{Deserialize, Serialize};

/// Identity of an AST node that refers to a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// The id following this one
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_sequence() {
        let first = NodeId::new(0);
        let second = first.next();
        assert_ne!(first, second);
        assert_eq!(second.get(), 1);
    }
}
