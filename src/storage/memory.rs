//! In-memory triple store.
//!
//! This is the reference implementation of `TripleStore`.
//! It keeps an ordered statement set plus a subject index, each behind a
//! `parking_lot::RwLock`.
//!
//! ## Limitations
//!
//! - **No transactions**: a batch is applied under one write lock, but
//!   there is no rollback across calls.
//! - **One index**: lookups with a bound subject use the subject index;
//!   everything else scans.
//!
//! Use this store for:
//! - Testing the mapper, planner and executor
//! - Embedding the mapper in applications that don't need persistence

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::{Term, Triple};
use crate::Result;
use super::TripleStore;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory statement storage. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    statements: RwLock<BTreeSet<Triple>>,
    /// subject → statements with that subject
    by_subject: RwLock<HashMap<Term, BTreeSet<Triple>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored statement, in canonical order.
    pub fn statements(&self) -> Vec<Triple> {
        self.inner.statements.read().iter().cloned().collect()
    }

    pub fn contains(&self, statement: &Triple) -> bool {
        self.inner.statements.read().contains(statement)
    }

    pub fn clear(&self) {
        self.inner.statements.write().clear();
        self.inner.by_subject.write().clear();
    }
}

fn matches(slot: Option<&Term>, term: &Term) -> bool {
    match slot {
        None | Some(Term::Variable(_)) => true,
        Some(t) => t == term,
    }
}

// ============================================================================
// TripleStore impl
// ============================================================================

impl TripleStore for MemoryStore {
    fn lookup(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>> {
        let keep = |t: &&Triple| matches(predicate, &t.predicate) && matches(object, &t.object);

        match subject.filter(|s| !s.is_variable()) {
            Some(s) => {
                let idx = self.inner.by_subject.read();
                Ok(idx
                    .get(s)
                    .map(|set| set.iter().filter(keep).cloned().collect())
                    .unwrap_or_default())
            }
            None => {
                let all = self.inner.statements.read();
                Ok(all.iter().filter(keep).cloned().collect())
            }
        }
    }

    fn add_statements(&self, statements: &[Triple]) -> Result<()> {
        let mut all = self.inner.statements.write();
        let mut idx = self.inner.by_subject.write();
        for t in statements {
            if all.insert(t.clone()) {
                idx.entry(t.subject.clone()).or_default().insert(t.clone());
            }
        }
        Ok(())
    }

    fn remove_statements(&self, statements: &[Triple]) -> Result<()> {
        let mut all = self.inner.statements.write();
        let mut idx = self.inner.by_subject.write();
        for t in statements {
            if all.remove(t) {
                if let Some(set) = idx.get_mut(&t.subject) {
                    set.remove(t);
                    if set.is_empty() {
                        idx.remove(&t.subject);
                    }
                }
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.inner.statements.read().len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{vocab, Literal};

    fn iri(s: &str) -> Term {
        Term::iri(format!("http://example.org/{s}"))
    }

    fn seeded() -> MemoryStore {
        let db = MemoryStore::new();
        db.add_statements(&[
            Triple::new(iri("a"), iri("knows"), iri("b")),
            Triple::new(iri("b"), iri("knows"), iri("c")),
            Triple::new(iri("a"), iri("name"), Term::Literal(Literal::from("Ada"))),
            Triple::typed(iri("a"), "http://example.org/Person"),
            Triple::typed(iri("b"), "http://example.org/Person"),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_add_is_set_semantics() {
        let db = seeded();
        db.add_statements(&[Triple::new(iri("a"), iri("knows"), iri("b"))]).unwrap();
        assert_eq!(db.len().unwrap(), 5);
    }

    #[test]
    fn test_lookup_by_subject_and_wildcards() {
        let db = seeded();
        assert_eq!(db.lookup(Some(&iri("a")), None, None).unwrap().len(), 3);
        assert_eq!(db.lookup(None, Some(&iri("knows")), None).unwrap().len(), 2);
        assert_eq!(db.lookup(None, Some(&iri("knows")), Some(&iri("c"))).unwrap().len(), 1);
        // a variable in a slot is a wildcard
        assert_eq!(db.lookup(Some(&Term::var("s")), Some(&iri("knows")), None).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_statements() {
        let db = seeded();
        db.remove_statements(&[
            Triple::new(iri("a"), iri("knows"), iri("b")),
            Triple::new(iri("z"), iri("knows"), iri("b")),
        ])
        .unwrap();
        assert_eq!(db.len().unwrap(), 4);
        assert!(db.lookup(Some(&iri("a")), Some(&iri("knows")), None).unwrap().is_empty());
    }

    #[test]
    fn test_query_joins_patterns() {
        let db = seeded();
        let pattern = vec![
            Triple::new(Term::var("x"), iri("knows"), Term::var("y")),
            Triple::new(Term::var("y"), Term::iri(vocab::RDF_TYPE), iri("Person")),
        ];
        let rows = db.query(&pattern).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("x"), Some(&iri("a")));
        assert_eq!(rows[0].get("y"), Some(&iri("b")));
    }

    #[test]
    fn test_query_without_solution() {
        let db = seeded();
        let pattern = vec![Triple::new(iri("c"), iri("knows"), Term::var("y"))];
        assert!(db.query(&pattern).unwrap().is_empty());
    }
}
