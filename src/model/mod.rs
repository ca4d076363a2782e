//! # Statement Model
//!
//! Clean DTOs for the statements that cross every boundary:
//! entity graph ↔ serializer ↔ planner ↔ executor ↔ store.
//!
//! Design rule: no store handles, no registry references here.
//! This module is pure data with no I/O.

pub mod term;
pub mod literal;
pub mod triple;
pub mod vocab;

pub use term::Term;
pub use literal::Literal;
pub use triple::{Triple, Bindings};
