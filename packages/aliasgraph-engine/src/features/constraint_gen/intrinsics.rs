//! Library-function contracts
//!
//! Body-less callees with well-known pointer behavior get hand-written
//! alias rules instead of opaque treatment. The table is fixed for the
//! lifetime of the process: a callee name (plus a minimum arity) selects a
//! contract, applied at direct call sites during constraint generation.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Alias behavior of a recognized library routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryContract {
    /// Pointer content flows between the pointees of the first two
    /// arguments, and the routine returns (a pointer into) the
    /// destination: the copy and concatenation family.
    CopiesPointees,
    /// The routine returns (a pointer into) its first argument: byte
    /// fills, substring and character searches, tokenizers, realloc.
    ReturnsFirstArg,
}

impl LibraryContract {
    /// Fewest arguments a call must carry for the contract to apply
    #[inline]
    pub fn min_args(&self) -> usize {
        match self {
            LibraryContract::CopiesPointees => 2,
            LibraryContract::ReturnsFirstArg => 1,
        }
    }
}

static CONTRACTS: Lazy<FxHashMap<&'static str, LibraryContract>> = Lazy::new(|| {
    use LibraryContract::*;
    let mut m = FxHashMap::default();
    for name in [
        "memcpy", "memmove", "strcpy", "strncpy", "stpcpy", "strcat", "strncat",
    ] {
        m.insert(name, CopiesPointees);
    }
    for name in [
        "memset", "strtok", "strstr", "strchr", "strrchr", "strpbrk", "memchr", "realloc",
    ] {
        m.insert(name, ReturnsFirstArg);
    }
    m
});

/// Contract for a callee name, when one exists. Compiler-lowered intrinsic
/// spellings such as `llvm.memcpy.p0.p0.i64` match their base name.
pub fn contract_for(name: &str) -> Option<LibraryContract> {
    if let Some(&c) = CONTRACTS.get(name) {
        return Some(c);
    }
    if let Some(rest) = name.strip_prefix("llvm.") {
        if let Some(base) = rest.split('.').next() {
            return CONTRACTS.get(base).copied();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_family_is_recognized() {
        assert_eq!(contract_for("memcpy"), Some(LibraryContract::CopiesPointees));
        assert_eq!(contract_for("strcat"), Some(LibraryContract::CopiesPointees));
    }

    #[test]
    fn search_family_returns_first_arg() {
        assert_eq!(contract_for("strchr"), Some(LibraryContract::ReturnsFirstArg));
        assert_eq!(contract_for("realloc"), Some(LibraryContract::ReturnsFirstArg));
    }

    #[test]
    fn lowered_intrinsic_spellings_match() {
        assert_eq!(
            contract_for("llvm.memcpy.p0.p0.i64"),
            Some(LibraryContract::CopiesPointees)
        );
        assert_eq!(
            contract_for("llvm.memset.p0.i64"),
            Some(LibraryContract::ReturnsFirstArg)
        );
    }

    #[test]
    fn unknown_names_have_no_contract() {
        assert_eq!(contract_for("printf"), None);
        assert_eq!(contract_for("llvm.dbg.value"), None);
    }

    #[test]
    fn minimum_arities() {
        assert_eq!(LibraryContract::CopiesPointees.min_args(), 2);
        assert_eq!(LibraryContract::ReturnsFirstArg.min_args(), 1);
    }
}
