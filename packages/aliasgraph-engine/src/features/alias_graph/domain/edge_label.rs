//! Edge labels
//!
//! A label describes how an edge's target location derives from its source:
//! pointer dereference, struct field at a constant offset, or array slot at
//! a constant index. Labels are interned per run into [`LabelId`]s, so label
//! comparisons on the hot path are integer equality.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned label handle, valid for the registry that minted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(pub u32);

/// Semantic content of an edge label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeLabel {
    /// Source points to target (`target = *source`)
    Dereference,
    /// Target is the address of field `k` inside the source location
    FieldOffset(u32),
    /// Target is the address of slot `k` inside the source array
    Index(u64),
}

impl EdgeLabel {
    /// Whether this label derives a sub-location of the source (fields and
    /// array slots), as opposed to crossing into pointed-to storage
    #[inline]
    pub fn is_offset(&self) -> bool {
        matches!(self, EdgeLabel::FieldOffset(_) | EdgeLabel::Index(_))
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeLabel::Dereference => write!(f, "d"),
            EdgeLabel::FieldOffset(k) => write!(f, "f{}", k),
            EdgeLabel::Index(k) => write!(f, "i{}", k),
        }
    }
}

/// Per-run interning table for edge labels
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    labels: Vec<EdgeLabel>,
    interned: FxHashMap<EdgeLabel, LabelId>,
    deref: LabelId,
}

impl LabelRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            labels: Vec::new(),
            interned: FxHashMap::default(),
            deref: LabelId(0),
        };
        // Dereference is the hottest label; pin it at id 0
        reg.deref = reg.intern(EdgeLabel::Dereference);
        reg
    }

    /// Intern a label, returning the existing id when already present
    pub fn intern(&mut self, label: EdgeLabel) -> LabelId {
        if let Some(&id) = self.interned.get(&label) {
            return id;
        }
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(label);
        self.interned.insert(label, id);
        id
    }

    /// The pre-interned dereference label
    #[inline]
    pub fn deref(&self) -> LabelId {
        self.deref
    }

    /// Intern a field-offset label
    #[inline]
    pub fn field(&mut self, offset: u32) -> LabelId {
        self.intern(EdgeLabel::FieldOffset(offset))
    }

    /// Intern an array-index label
    #[inline]
    pub fn index(&mut self, index: u64) -> LabelId {
        self.intern(EdgeLabel::Index(index))
    }

    /// Semantic content behind an id
    #[inline]
    pub fn get(&self, id: LabelId) -> EdgeLabel {
        self.labels[id.0 as usize]
    }

    /// Whether an id denotes a field or index derivation
    #[inline]
    pub fn is_offset(&self, id: LabelId) -> bool {
        self.get(id).is_offset()
    }

    /// Number of distinct labels seen so far
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
