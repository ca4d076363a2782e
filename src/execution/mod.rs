//! Query executor: evaluates resolution paths against a `TripleStore`.
//!
//! Paths are merged into a prefix tree so shared leading segments are
//! looked up once. Evaluation is bottom-up:
//!
//! ```text
//! segment with a concrete anchor  → one lookup, collect the open slot
//! segment with a variable anchor  → evaluate the child subtree first,
//!                                   look up once per candidate, union
//! sibling segments of one node    → intersection
//! ```
//!
//! Intersection is what makes the result conjunctive: a candidate must
//! satisfy every constraint on its node.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Term, Triple};
use crate::planner::{PathSegment, QueryGraph, ResolutionPath};
use crate::storage::TripleStore;
use crate::Result;

/// Result of resolving a query graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Candidate terms for the root.
    pub terms: BTreeSet<Term>,
    pub stats: ExecutionStats,
}

/// Execution statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub lookups: u64,
    pub statements_matched: u64,
    pub intersections: u64,
}

// ============================================================================
// PrefixTree
// ============================================================================

/// Resolution paths grouped by shared prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTree {
    children: BTreeMap<PathSegment, PrefixTree>,
}

impl PrefixTree {
    pub fn from_paths(paths: &[ResolutionPath]) -> Self {
        let mut tree = Self::default();
        for path in paths {
            tree.insert(path);
        }
        tree
    }

    pub fn insert(&mut self, path: &[PathSegment]) {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.clone()).or_default();
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&PathSegment, &PrefixTree)> {
        self.children.iter()
    }

    /// Number of segments in the tree.
    pub fn size(&self) -> usize {
        self.children.values().map(|c| 1 + c.size()).sum()
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Resolve a query graph's root against `store`.
pub fn resolve<S: TripleStore + ?Sized>(store: &S, graph: &QueryGraph) -> Result<QueryResult> {
    let tree = PrefixTree::from_paths(&graph.paths);
    let mut stats = ExecutionStats::default();
    let terms = execute(store, &tree, &mut stats)?;
    tracing::debug!(
        root = %graph.root,
        segments = tree.size(),
        lookups = stats.lookups,
        results = terms.len(),
        "resolved query graph"
    );
    Ok(QueryResult { terms, stats })
}

/// Candidates for the node `tree` hangs from. A tree without segments
/// constrains nothing and yields no candidates.
pub fn execute<S: TripleStore + ?Sized>(store: &S, tree: &PrefixTree, stats: &mut ExecutionStats) -> Result<BTreeSet<Term>> {
    let mut joined: Option<BTreeSet<Term>> = None;
    for (segment, child) in tree.children() {
        let answers = evaluate(store, segment, child, stats)?;
        joined = Some(match joined {
            None => answers,
            Some(acc) => {
                stats.intersections += 1;
                acc.intersection(&answers).cloned().collect()
            }
        });
        if joined.as_ref().is_some_and(BTreeSet::is_empty) {
            break;
        }
    }
    Ok(joined.unwrap_or_default())
}

fn evaluate<S: TripleStore + ?Sized>(
    store: &S,
    segment: &PathSegment,
    child: &PrefixTree,
    stats: &mut ExecutionStats,
) -> Result<BTreeSet<Term>> {
    let anchors = match segment.anchor() {
        Some(Term::Variable(_)) => execute(store, child, stats)?,
        Some(term) => BTreeSet::from([term.clone()]),
        None => BTreeSet::new(),
    };

    let mut out = BTreeSet::new();
    for anchor in &anchors {
        for statement in lookup(store, segment, anchor)? {
            out.insert(open_term(segment, statement));
        }
        stats.lookups += 1;
    }
    stats.statements_matched += out.len() as u64;
    tracing::trace!(predicate = %segment.predicate, anchors = anchors.len(), matches = out.len(), "segment");
    Ok(out)
}

fn lookup<S: TripleStore + ?Sized>(store: &S, segment: &PathSegment, anchor: &Term) -> Result<Vec<Triple>> {
    if segment.opens_object() {
        store.lookup(Some(anchor), Some(&segment.predicate), None)
    } else {
        store.lookup(None, Some(&segment.predicate), Some(anchor))
    }
}

fn open_term(segment: &PathSegment, statement: Triple) -> Term {
    if segment.opens_object() { statement.object } else { statement.subject }
}

// ============================================================================
// Tests
// ============================================================================
