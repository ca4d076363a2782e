//! Query graph builder: finds resolution paths for unresolved nodes.
//!
//! Starting from an unresolved root, the search walks the entity graph in
//! both directions until it reaches nodes that already have a concrete
//! identifier (anchors). Every edge crossed becomes one [`PathSegment`]:
//!
//! ```text
//! inward   (owner holds node):   (owner, link, ?)    node is the object
//! outward  (node holds value):   (?, link, value)    node is the subject
//! type     (node is a T):        (?, rdf:type, T)    always an anchor
//! ```
//!
//! A path is the segment sequence from the root to one anchor. All
//! alternatives are kept; the executor joins them. Nodes already on the
//! current path are not re-entered, so cycles end the branch instead of
//! recursing forever.
//!
//! The planner never touches the store.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::entity::{NodeId, ObjectGraph};
use crate::model::{vocab, Term};
use crate::Result;

/// Edge sequence from the root to one anchor.
pub type ResolutionPath = SmallVec<[PathSegment; 4]>;

// ============================================================================
// PathSegment
// ============================================================================

/// A statement pattern with exactly one open slot, subject or object.
///
/// The filled end is the *anchor*: the node one step closer to a concrete
/// identifier. The open end is the node being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathSegment {
    pub subject: Option<Term>,
    pub predicate: Term,
    pub object: Option<Term>,
}

impl PathSegment {
    /// `(owner, link, ?)`
    pub fn inverse(owner: Term, link: Term) -> Self {
        Self { subject: Some(owner), predicate: link, object: None }
    }

    /// `(?, link, value)`
    pub fn forward(link: Term, value: Term) -> Self {
        Self { subject: None, predicate: link, object: Some(value) }
    }

    /// The filled end.
    pub fn anchor(&self) -> Option<&Term> {
        self.subject.as_ref().or(self.object.as_ref())
    }

    /// The open slot is the object.
    pub fn opens_object(&self) -> bool {
        self.object.is_none()
    }
}

// ============================================================================
// QueryGraph
// ============================================================================

/// Every resolution path found from `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGraph {
    /// Query-mode term of the root node.
    pub root: Term,
    pub paths: Vec<ResolutionPath>,
}

impl QueryGraph {
    /// At least one path reaches an anchor.
    pub fn is_resolvable(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Find all resolution paths from `root`.
///
/// A root that is already concrete yields no paths.
pub fn discover(graph: &ObjectGraph<'_>, root: NodeId) -> Result<QueryGraph> {
    let root_term = graph.identifier(root, true)?;
    let mut search = PathSearch { graph, on_path: Vec::new(), lean: SmallVec::new(), paths: Vec::new() };
    search.visit(root)?;
    tracing::debug!(root = %root_term, paths = search.paths.len(), "discovered resolution paths");
    Ok(QueryGraph { root: root_term, paths: search.paths })
}

struct PathSearch<'g, 'r> {
    graph: &'g ObjectGraph<'r>,
    /// Unresolved nodes on the current path.
    on_path: Vec<NodeId>,
    /// Segments crossed so far.
    lean: ResolutionPath,
    paths: Vec<ResolutionPath>,
}

impl PathSearch<'_, '_> {
    fn visit(&mut self, node: NodeId) -> Result<bool> {
        if self.graph.is_defined(node) {
            if self.lean.is_empty() {
                return Ok(false);
            }
            self.paths.push(self.lean.clone());
            return Ok(true);
        }
        if self.on_path.contains(&node) {
            return Ok(false);
        }
        self.on_path.push(node);
        let found = self.expand(node);
        self.on_path.pop();
        found
    }

    fn expand(&mut self, node: NodeId) -> Result<bool> {
        let graph = self.graph;
        let mut found = false;

        for pid in graph.owner_properties(node)? {
            let container = graph.container(*pid)?;
            let owner = container.owner();
            let segment = PathSegment::inverse(graph.identifier(owner, true)?, Term::iri(container.link()));
            found |= self.cross(segment, owner)?;
        }

        for pid in graph.properties_of(node)? {
            let container = graph.container(*pid)?;
            for value in container.values() {
                let segment = PathSegment::forward(Term::iri(container.link()), graph.identifier(*value, true)?);
                found |= self.cross(segment, *value)?;
            }
        }

        if graph.is_entity(node) {
            let class = graph.class_of(node)?;
            self.lean.push(PathSegment::forward(Term::iri(vocab::RDF_TYPE), Term::iri(&class.rdf_type)));
            self.paths.push(self.lean.clone());
            self.lean.pop();
            found = true;
        }

        Ok(found)
    }

    fn cross(&mut self, segment: PathSegment, next: NodeId) -> Result<bool> {
        self.lean.push(segment);
        let found = self.visit(next);
        self.lean.pop();
        found
    }
}

// ============================================================================
// Tests
// ============================================================================
