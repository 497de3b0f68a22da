//! Program type table
//!
//! Types are structurally interned: equal shapes share a [`TypeId`], so type
//! identity checks on the solver hot path are integer comparisons. Store
//! sizes are byte approximations (no padding model); they exist to detect
//! signature mismatches during call binding, not to lay out memory.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Interned type handle. Minted by [`TypeTable::intern`]; only valid for the
/// table that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Structural description of a program type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Integer of the given bit width
    Int { bits: u32 },
    /// Floating-point number of the given bit width
    Float { bits: u32 },
    /// Pointer to a pointee type
    Pointer { pointee: TypeId },
    /// Struct with ordered field types
    Struct { fields: Vec<TypeId> },
    /// Fixed-length array
    Array { element: TypeId, len: u64 },
    /// SIMD vector
    Vector { element: TypeId, lanes: u64 },
    /// Function signature
    Function {
        params: Vec<TypeId>,
        ret: TypeId,
        varargs: bool,
    },
    /// Zero-sized type (function returns, empty payloads)
    Void,
    /// Forward-declared or unknown layout
    Opaque,
}

/// Interning table for program types
#[derive(Debug, Clone)]
pub struct TypeTable {
    kinds: Vec<TypeKind>,
    interned: FxHashMap<TypeKind, TypeId>,
    pointer_size: u64,
}

impl TypeTable {
    /// Create a table for a target with the given pointer width in bytes
    pub fn new(pointer_size: u64) -> Self {
        Self {
            kinds: Vec::new(),
            interned: FxHashMap::default(),
            pointer_size,
        }
    }

    /// Intern a type shape, returning the existing id when already present
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    /// Shape of an interned type
    #[inline]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.0 as usize]
    }

    /// Pointee type when `id` is a pointer
    #[inline]
    pub fn pointee_of(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    /// Whether `id` is a pointer whose pointee is a function type
    pub fn is_function_pointer(&self, id: TypeId) -> bool {
        self.pointee_of(id)
            .map(|p| matches!(self.kind(p), TypeKind::Function { .. }))
            .unwrap_or(false)
    }

    /// Approximate store size in bytes. `None` for types without a
    /// meaningful store size (functions, opaque layouts) and for
    /// aggregates whose byte count overflows `u64`.
    pub fn size_of(&self, id: TypeId) -> Option<u64> {
        match self.kind(id) {
            TypeKind::Int { bits } | TypeKind::Float { bits } => Some((u64::from(*bits) + 7) / 8),
            TypeKind::Pointer { .. } => Some(self.pointer_size),
            TypeKind::Struct { fields } => {
                let mut total = 0u64;
                for f in fields {
                    total = total.checked_add(self.size_of(*f)?)?;
                }
                Some(total)
            }
            TypeKind::Array { element, len } => self.size_of(*element)?.checked_mul(*len),
            TypeKind::Vector { element, lanes } => self.size_of(*element)?.checked_mul(*lanes),
            TypeKind::Function { .. } => None,
            TypeKind::Void => Some(0),
            TypeKind::Opaque => None,
        }
    }

    /// Pointer width in bytes for this target
    #[inline]
    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    /// Number of interned types
    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Canonical text form of a type, used as a grouping key
    pub fn canonical_string(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Int { bits } => format!("i{}", bits),
            TypeKind::Float { bits } => format!("f{}", bits),
            TypeKind::Pointer { pointee } => format!("ptr({})", self.canonical_string(*pointee)),
            TypeKind::Struct { fields } => {
                let inner: Vec<String> = fields.iter().map(|f| self.canonical_string(*f)).collect();
                format!("struct({})", inner.join(","))
            }
            TypeKind::Array { element, len } => {
                format!("[{} x {}]", len, self.canonical_string(*element))
            }
            TypeKind::Vector { element, lanes } => {
                format!("<{} x {}>", lanes, self.canonical_string(*element))
            }
            TypeKind::Function {
                params,
                ret,
                varargs,
            } => {
                let mut inner: Vec<String> =
                    params.iter().map(|p| self.canonical_string(*p)).collect();
                if *varargs {
                    inner.push("...".to_string());
                }
                format!("fn({})->{}", inner.join(","), self.canonical_string(*ret))
            }
            TypeKind::Void => "void".to_string(),
            TypeKind::Opaque => "opaque".to_string(),
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        // 64-bit targets unless the frontend says otherwise
        Self::new(8)
    }
}
