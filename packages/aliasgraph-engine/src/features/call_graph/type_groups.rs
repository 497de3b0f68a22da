//! Function-type compatibility grouping
//!
//! Indirect-call candidates are filtered by signature compatibility before
//! the equivalence-class intersection. Compatibility starts from a
//! canonical key under the configured strictness; observed casts between
//! function-pointer types coarsen it by merging the two key groups, since a
//! program that puns a signature will call through the punned type.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shared::models::{FuncId, TypeId, TypeKind, TypeTable};

/// How strictly two signatures must agree to be considered compatible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeStrictness {
    /// Canonical signatures must match exactly
    ExactSignature,
    /// Return size, parameter sizes and variadic flag must match. Tolerant
    /// of benign width-preserving type differences across translation units.
    ParamSizes,
    /// Only parameter count and variadic flag must match
    ParamCount,
}

impl Default for TypeStrictness {
    fn default() -> Self {
        TypeStrictness::ParamSizes
    }
}

/// Signature-keyed grouping of callable functions, with cast-driven
/// group merging over a key-level union-find
#[derive(Debug, Clone)]
pub struct FunctionTypeGroups {
    strictness: TypeStrictness,
    key_ids: FxHashMap<String, u32>,
    keys: Vec<String>,
    parent: Vec<u32>,
    members: FxHashMap<u32, Vec<FuncId>>,
}

impl FunctionTypeGroups {
    pub fn new(strictness: TypeStrictness) -> Self {
        Self {
            strictness,
            key_ids: FxHashMap::default(),
            keys: Vec::new(),
            parent: Vec::new(),
            members: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn strictness(&self) -> TypeStrictness {
        self.strictness
    }

    fn key_for(&self, types: &TypeTable, func_ty: TypeId) -> String {
        match types.kind(func_ty) {
            TypeKind::Function {
                params,
                ret,
                varargs,
            } => match self.strictness {
                TypeStrictness::ExactSignature => types.canonical_string(func_ty),
                TypeStrictness::ParamSizes => {
                    let size_str = |t: TypeId| match types.size_of(t) {
                        Some(s) => s.to_string(),
                        None => "?".to_string(),
                    };
                    let sizes: Vec<String> = params.iter().map(|p| size_str(*p)).collect();
                    format!("sz:{}:({}):{}", size_str(*ret), sizes.join(","), varargs)
                }
                TypeStrictness::ParamCount => format!("argc:{}:{}", params.len(), varargs),
            },
            // Non-function types group by their canonical form
            _ => types.canonical_string(func_ty),
        }
    }

    fn intern_key(&mut self, key: String) -> u32 {
        if let Some(&id) = self.key_ids.get(&key) {
            return id;
        }
        let id = self.keys.len() as u32;
        self.keys.push(key.clone());
        self.key_ids.insert(key, id);
        self.parent.push(id);
        id
    }

    fn find(&mut self, id: u32) -> u32 {
        let idx = id as usize;
        if self.parent[idx] != id {
            let root = self.find(self.parent[idx]);
            self.parent[idx] = root;
        }
        self.parent[idx]
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb as usize] = ra;
        }
    }

    /// Record a function under its signature group
    pub fn register_function(&mut self, func: FuncId, func_ty: TypeId, types: &TypeTable) {
        let key = self.key_for(types, func_ty);
        let id = self.intern_key(key);
        self.members.entry(id).or_default().push(func);
    }

    /// A cast between two function signatures merges their groups
    pub fn merge_for_cast(&mut self, from_ty: TypeId, to_ty: TypeId, types: &TypeTable) {
        let ka = self.key_for(types, from_ty);
        let kb = self.key_for(types, to_ty);
        if ka == kb {
            return;
        }
        debug!(from = %ka, to = %kb, "function-pointer cast merges signature groups");
        let a = self.intern_key(ka);
        let b = self.intern_key(kb);
        self.union(a, b);
    }

    /// All registered functions compatible with `func_ty`, sorted by id
    pub fn compatible_functions(&mut self, func_ty: TypeId, types: &TypeTable) -> Vec<FuncId> {
        let key = self.key_for(types, func_ty);
        let id = self.intern_key(key);
        let root = self.find(id);
        let key_ids: Vec<u32> = self.members.keys().copied().collect();
        let mut out: Vec<FuncId> = Vec::new();
        for kid in key_ids {
            if self.find(kid) == root {
                if let Some(funcs) = self.members.get(&kid) {
                    out.extend(funcs.iter().copied());
                }
            }
        }
        out.sort();
        out
    }

    /// Number of distinct signature keys seen
    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
