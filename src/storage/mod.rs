//! # Triple Store Contract
//!
//! This is THE contract between the mapper and any backing store.
//! Four capabilities are required: statement lookup, pattern query, and
//! batched add/remove.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for testing/embedding |
//!
//! Calls are synchronous and block until the store answers. Nothing here
//! retries or times out; store errors propagate to the caller.

pub mod memory;

use crate::model::{Bindings, Term, Triple};
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// TripleStore Trait
// ============================================================================

/// The universal store contract.
///
/// Pattern slots are `Option<&Term>`: `None` or a `Term::Variable` matches
/// anything.
pub trait TripleStore: Send + Sync {
    // ========================================================================
    // Read
    // ========================================================================

    /// All stored statements matching the pattern.
    fn lookup(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>>;

    /// Evaluate a conjunction of statement patterns, returning one binding
    /// row per distinct solution.
    ///
    /// Default: nested-loop join over `lookup`, most-bound pattern first.
    fn query(&self, pattern: &[Triple]) -> Result<Vec<Bindings>> {
        let mut rows = vec![Bindings::new()];
        let mut remaining: Vec<&Triple> = pattern.iter().collect();

        while !remaining.is_empty() && !rows.is_empty() {
            // Prefer the pattern with the fewest unbound slots under the
            // first row's bindings.
            let probe = &rows[0];
            let idx = remaining
                .iter()
                .enumerate()
                .min_by_key(|(_, t)| {
                    t.substitute(probe).terms().iter().filter(|x| x.is_variable()).count()
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            let next = remaining.remove(idx);

            let mut joined = Vec::new();
            for row in &rows {
                let bound = next.substitute(row);
                for candidate in self.lookup(slot(&bound.subject), slot(&bound.predicate), slot(&bound.object))? {
                    if let Some(extended) = bound.unify(&candidate, row) {
                        joined.push(extended);
                    }
                }
            }
            rows = joined;
        }

        rows.sort();
        rows.dedup();
        Ok(rows)
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Add a batch of statements. Adding a present statement is a no-op.
    fn add_statements(&self, statements: &[Triple]) -> Result<()>;

    /// Remove a batch of statements. Absent statements are ignored.
    fn remove_statements(&self, statements: &[Triple]) -> Result<()>;

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of stored statements.
    fn len(&self) -> Result<usize> {
        Ok(self.lookup(None, None, None)?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every distinct object of `(subject, predicate, ?)`, in term order.
    fn objects(&self, subject: &Term, predicate: &Term) -> Result<Vec<Term>> {
        let mut out: Vec<Term> = self
            .lookup(Some(subject), Some(predicate), None)?
            .into_iter()
            .map(|t| t.object)
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }
}

/// A bound term narrows the lookup; a variable leaves the slot open.
fn slot(term: &Term) -> Option<&Term> {
    if term.is_variable() { None } else { Some(term) }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every lookup with a fixed list, in the order given.
    struct Unordered(Vec<Triple>);

    impl TripleStore for Unordered {
        fn lookup(&self, _: Option<&Term>, _: Option<&Term>, _: Option<&Term>) -> Result<Vec<Triple>> {
            Ok(self.0.clone())
        }

        fn add_statements(&self, _: &[Triple]) -> Result<()> {
            Ok(())
        }

        fn remove_statements(&self, _: &[Triple]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_objects_are_distinct_for_unordered_stores() {
        let s = Term::iri("urn:s");
        let typed = |class: &str| Triple::typed(s.clone(), class);
        let store = Unordered(vec![typed("urn:B"), typed("urn:A"), typed("urn:B")]);

        let types = store.objects(&s, &Term::iri(crate::model::vocab::RDF_TYPE)).unwrap();
        assert_eq!(types, vec![Term::iri("urn:A"), Term::iri("urn:B")]);
    }
}
