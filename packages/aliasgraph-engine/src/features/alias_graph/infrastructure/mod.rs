//! Infrastructure: fixpoint machinery over the domain graph

pub mod unifier;
