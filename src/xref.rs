//! Internal identifiers and the XREF interner.
//!
//! The public API speaks GEDCOM XREF strings (`@I1@`), while every hot-path
//! structure keys on dense 32-bit IDs. [`Interner`] is the translation
//! boundary: a bijection that allocates sequential IDs starting at 1 and never
//! reclaims them, even after the owning node has been removed.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::graph::GraphResult;
use crate::error::GraphError;

/// Dense, niche-optimized identifier for a graph node.
///
/// Zero is the "unknown" sentinel, so it is never a valid `NodeId` and
/// `Option<NodeId>` is the same size as `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

/// Dense identifier for a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EdgeId(NonZeroU32);

/// A 32-bit ID type that the [`Interner`] can allocate.
pub trait DenseId: Copy + Eq + Hash {
    fn from_raw(raw: u32) -> Option<Self>;
    fn raw(self) -> u32;
}

macro_rules! dense_id {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Create from a raw `u32`. Returns `None` for the zero sentinel.
            pub fn new(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map($name)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl DenseId for $name {
            fn from_raw(raw: u32) -> Option<Self> {
                Self::new(raw)
            }

            fn raw(self) -> u32 {
                self.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

dense_id!(NodeId, "node");
dense_id!(EdgeId, "edge");

/// Bidirectional string ↔ dense ID map.
///
/// Only [`intern`](Interner::intern) and [`restore`](Interner::restore)
/// allocate; lookups are pure.
#[derive(Debug, Clone)]
pub struct Interner<I> {
    forward: HashMap<String, I>,
    reverse: HashMap<I, String>,
    next: u32,
}

/// Interner for node XREFs.
pub type XrefInterner = Interner<NodeId>;

/// Interner for edge ID strings.
pub type EdgeKeyInterner = Interner<EdgeId>;

impl<I: DenseId> Default for Interner<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: DenseId> Interner<I> {
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            next: 1,
        }
    }

    /// Return the ID for `key`, allocating the next sequential one if the key
    /// has never been seen.
    pub fn intern(&mut self, key: &str) -> GraphResult<I> {
        if let Some(&id) = self.forward.get(key) {
            return Ok(id);
        }
        let id = I::from_raw(self.next).ok_or(GraphError::IdSpaceExhausted {
            allocated: self.next.wrapping_sub(1),
        })?;
        self.next = self.next.checked_add(1).unwrap_or(0);
        self.forward.insert(key.to_string(), id);
        self.reverse.insert(id, key.to_string());
        Ok(id)
    }

    /// Pin `key` to a specific `id`, used when reloading a snapshot.
    ///
    /// Later allocations continue above the highest restored ID.
    pub fn restore(&mut self, id: I, key: &str) -> GraphResult<()> {
        match (self.forward.get(key), self.reverse.get(&id)) {
            (Some(&existing), _) if existing == id => return Ok(()),
            (Some(_), _) | (None, Some(_)) => {
                return Err(GraphError::DuplicateNode {
                    xref: key.to_string(),
                });
            }
            (None, None) => {}
        }
        self.forward.insert(key.to_string(), id);
        self.reverse.insert(id, key.to_string());
        if id.raw() >= self.next {
            self.next = id.raw().checked_add(1).unwrap_or(0);
        }
        Ok(())
    }

    /// Make sure later allocations start at `next` or above. Never lowers
    /// the counter, so IDs handed out before a snapshot stay retired.
    pub fn reserve_up_to(&mut self, next: u32) {
        if next > self.next {
            self.next = next;
        }
    }

    /// Look up the ID for a key without allocating.
    pub fn id_of(&self, key: &str) -> Option<I> {
        self.forward.get(key).copied()
    }

    /// Look up the key for an ID.
    pub fn key_of(&self, id: I) -> Option<&str> {
        self.reverse.get(&id).map(String::as_str)
    }

    /// Number of keys ever interned.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// The raw value the next allocation will receive (0 once exhausted).
    pub fn peek_next(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn node_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<NodeId>(),
            std::mem::size_of::<Option<NodeId>>()
        );
    }

    #[test]
    fn zero_is_the_sentinel() {
        assert!(NodeId::new(0).is_none());
        assert!(EdgeId::new(0).is_none());
        assert_eq!(NodeId::new(7).map(NodeId::get), Some(7));
    }

    #[test]
    fn interner_allocates_sequentially_from_one() {
        let mut interner = XrefInterner::new();
        assert_eq!(interner.intern("@I1@").unwrap().get(), 1);
        assert_eq!(interner.intern("@I2@").unwrap().get(), 2);
        assert_eq!(interner.intern("@I1@").unwrap().get(), 1);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.peek_next(), 3);
    }

    #[test]
    fn lookups_never_allocate() {
        let interner = XrefInterner::new();
        assert!(interner.id_of("@I1@").is_none());
        assert!(interner.key_of(NodeId::new(1).unwrap()).is_none());
        assert!(interner.is_empty());
    }

    #[test]
    fn restore_pins_ids_and_advances_counter() {
        let mut interner = XrefInterner::new();
        interner.restore(NodeId::new(5).unwrap(), "@F1@").unwrap();
        assert_eq!(interner.id_of("@F1@").map(NodeId::get), Some(5));
        assert_eq!(interner.intern("@I9@").unwrap().get(), 6);
        // same pair again is a no-op
        interner.restore(NodeId::new(5).unwrap(), "@F1@").unwrap();
        assert!(interner.restore(NodeId::new(5).unwrap(), "@F2@").is_err());
    }

    #[test]
    fn exhausted_interner_reports_error() {
        let mut interner = XrefInterner::new();
        interner.restore(NodeId::new(u32::MAX).unwrap(), "@LAST@").unwrap();
        let err = interner.intern("@ONE_MORE@").unwrap_err();
        assert!(matches!(err, GraphError::IdSpaceExhausted { .. }));
    }

    #[test]
    fn display_uses_prefix() {
        assert_eq!(format!("{}", NodeId::new(3).unwrap()), "node:3");
        assert_eq!(format!("{}", EdgeId::new(4).unwrap()), "edge:4");
    }

    proptest! {
        #[test]
        fn interning_is_stable_and_reversible(keys in proptest::collection::vec("@[A-Z][0-9]{1,4}@", 1..40)) {
            let mut interner = XrefInterner::new();
            for key in &keys {
                let first = interner.intern(key).unwrap();
                let second = interner.intern(key).unwrap();
                prop_assert_eq!(first, second);
                prop_assert_eq!(interner.key_of(first), Some(key.as_str()));
            }
        }
    }
}
