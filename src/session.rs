//! Session: an entity graph bound to a store.
//!
//! The session is where the two faces of a property meet:
//!
//! | Form | Call | Effect |
//! |------|------|--------|
//! | Update | `set` / `unset` / `relate` | records values in memory |
//! | Query | `get` / `one` / `get_objects` | attached values ∪ what the store knows |
//!
//! and where the graph meets the store:
//!
//! | Call | Effect |
//! |------|--------|
//! | `save` | add the defined component |
//! | `retract` | remove the defined component |
//! | `load` | native pattern query, one new entity per match |
//! | `resolve` | planner + executor, one new entity per match |
//!
//! One session per unit of work. Nothing here synchronizes; the store
//! decides what a batch means.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::entity::{NewEntity, NodeId, ObjectGraph, PropertyId, Resolved, Value};
use crate::identity::Identity;
use crate::model::{vocab, Term, Triple};
use crate::schema::{ClassId, NamespaceManager, PropertyKind, Registry};
use crate::storage::TripleStore;
use crate::{execution, planner, serialize};
use crate::{Error, Result};

pub struct Session<'a, S: TripleStore + ?Sized> {
    graph: ObjectGraph<'a>,
    store: &'a S,
    namespaces: NamespaceManager,
}

impl<'a, S: TripleStore + ?Sized> Session<'a, S> {
    pub fn new(registry: &'a Registry, store: &'a S) -> Self {
        Self { graph: ObjectGraph::new(registry), store, namespaces: NamespaceManager::new() }
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceManager) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn graph(&self) -> &ObjectGraph<'a> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ObjectGraph<'a> {
        &mut self.graph
    }

    pub fn registry(&self) -> &'a Registry {
        self.graph.registry()
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    /// Write schema statements for every registered type and bind their
    /// prefixes. Safe to repeat, e.g. after switching stores.
    pub fn wire_all(&mut self) -> Result<()> {
        self.graph.registry().wire_all(self.store, &mut self.namespaces)
    }

    // ========================================================================
    // Update form
    // ========================================================================

    pub fn create(&mut self, spec: NewEntity) -> Result<NodeId> {
        self.graph.create(spec)
    }

    pub fn set(&mut self, node: NodeId, link_name: &str, value: impl Into<Value>) -> Result<PropertyId> {
        self.graph.set(node, link_name, value)
    }

    pub fn unset(&mut self, node: NodeId, link_name: &str, value: impl Into<Value>) -> Result<()> {
        self.graph.unset(node, link_name, value)
    }

    pub fn relate(&mut self, node: NodeId, link_name: &str, value: impl Into<Value>) -> Result<PropertyId> {
        self.graph.relate(node, link_name, value)
    }

    pub fn identifier(&self, node: NodeId, query: bool) -> Result<Term> {
        self.graph.identifier(node, query)
    }

    pub fn is_defined(&self, node: NodeId) -> bool {
        self.graph.is_defined(node)
    }

    /// In-memory entities holding `node` under `link_name`.
    pub fn owners(&self, node: NodeId, link_name: &str) -> Result<Vec<NodeId>> {
        self.graph.owners(node, link_name)
    }

    // ========================================================================
    // Query form
    // ========================================================================

    /// Read a property: the concrete values attached in memory plus every
    /// value the store can supply for it.
    ///
    /// Single-valued properties prefer the attached value.
    pub fn get(&mut self, node: NodeId, link_name: &str) -> Result<Resolved> {
        let pid = self.graph.property(node, link_name)?;
        let container = self.graph.container(pid)?;
        let multiple = container.is_multiple();
        let attached: Vec<Term> = container
            .values()
            .iter()
            .filter(|v| self.graph.is_defined(**v))
            .map(|v| self.graph.identifier(*v, false))
            .collect::<Result<_>>()?;

        let var = self.graph.attach_query_variable(pid)?;
        let stored = planner::discover(&self.graph, var).and_then(|qg| execution::resolve(self.store, &qg));
        self.graph.detach_query_variable(pid, var);
        let stored = stored?.terms;

        if multiple {
            let mut all: BTreeSet<Term> = attached.into_iter().collect();
            all.extend(stored);
            Ok(Resolved::Many(all))
        } else {
            Ok(Resolved::One(attached.into_iter().next().or_else(|| stored.into_iter().next())))
        }
    }

    /// First value of a property, whatever its multiplicity.
    pub fn one(&mut self, node: NodeId, link_name: &str) -> Result<Option<Term>> {
        Ok(self.get(node, link_name)?.first().cloned())
    }

    /// Query form for object properties, as entities. Attached entities are
    /// returned as they are; stored ones are reconstructed.
    pub fn get_objects(&mut self, node: NodeId, link_name: &str) -> Result<Vec<NodeId>> {
        let pid = self.graph.property(node, link_name)?;
        let container = self.graph.container(pid)?;
        let value_type = match container.def().kind {
            PropertyKind::Object { value_type } => value_type,
            PropertyKind::Datatype => {
                return Err(Error::TypeError {
                    expected: "object property".into(),
                    got: format!("datatype property '{link_name}'"),
                });
            }
        };
        let mut attached: HashMap<Term, NodeId> = HashMap::new();
        for v in container.values() {
            if self.graph.is_defined(*v) {
                attached.insert(self.graph.identifier(*v, false)?, *v);
            }
        }

        let terms = self.get(node, link_name)?.into_set();
        terms
            .iter()
            .map(|t| match attached.get(t) {
                Some(existing) => Ok(*existing),
                None => self.reconstruct(t, value_type),
            })
            .collect()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Statements of the concretely identified component around `node`.
    pub fn defined_component(&self, node: NodeId) -> Result<Vec<Triple>> {
        defined_component(&self.graph, node)
    }

    /// Add `node`'s defined component to the store. An entity without a
    /// concrete identifier first adopts its content key.
    pub fn save(&mut self, node: NodeId) -> Result<Vec<Triple>> {
        self.graph.ensure_identifier(node)?;
        let statements = defined_component(&self.graph, node)?;
        self.store.add_statements(&statements)?;
        tracing::debug!(entity = %self.graph.describe(node), statements = statements.len(), "saved");
        Ok(statements)
    }

    /// Remove `node`'s defined component from the store.
    pub fn retract(&mut self, node: NodeId) -> Result<Vec<Triple>> {
        let statements = defined_component(&self.graph, node)?;
        self.store.remove_statements(&statements)?;
        tracing::debug!(entity = %self.graph.describe(node), statements = statements.len(), "retracted");
        Ok(statements)
    }

    /// Entities matching `node`'s shape, found by a native pattern query.
    /// A concretely identified entity is its own answer.
    pub fn load(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        let class = self.graph.class_of(node)?.id;
        let var = match self.graph.identifier(node, true)? {
            Term::Variable(v) => v,
            _ => return Ok(vec![node]),
        };
        let pattern = serialize::pattern_for(&self.graph, node)?;
        let found: BTreeSet<Term> = self
            .store
            .query(&pattern)?
            .into_iter()
            .filter_map(|mut row| row.remove(&var))
            .collect();
        tracing::debug!(entity = %self.graph.describe(node), patterns = pattern.len(), results = found.len(), "loaded");
        found.iter().map(|t| self.reconstruct(t, Some(class))).collect()
    }

    /// Entities matching `node`'s shape, found through resolution paths.
    pub fn resolve(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        let class = self.graph.class_of(node)?.id;
        if self.graph.is_defined(node) {
            return Ok(vec![node]);
        }
        let qg = planner::discover(&self.graph, node)?;
        let found = execution::resolve(self.store, &qg)?.terms;
        found.iter().map(|t| self.reconstruct(t, Some(class))).collect()
    }

    /// New entity for a stored identifier, typed by the most specific
    /// registered type the store records for it. `fallback` is used when
    /// the store knows no registered type.
    pub fn reconstruct(&mut self, identifier: &Term, fallback: Option<ClassId>) -> Result<NodeId> {
        let iri = identifier.as_iri().ok_or_else(|| Error::TypeError {
            expected: "IRI".into(),
            got: identifier.n3(),
        })?;
        let registry = self.graph.registry();
        let types = self.store.objects(identifier, &Term::iri(vocab::RDF_TYPE))?;
        let class = registry
            .most_specific(types.iter().filter_map(Term::as_iri))
            .or(fallback)
            .ok_or_else(|| Error::UnknownType(iri.to_string()))?;
        let name = registry.class_by_id(class)?.name.clone();
        self.graph.create(NewEntity::new(name).identity(Identity::explicit(iri)))
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn emit_statements(&self, node: NodeId) -> Result<Vec<Triple>> {
        serialize::emit_statements(&self.graph, node, false)
    }

    pub fn pattern_for(&self, node: NodeId) -> Result<Vec<Triple>> {
        serialize::pattern_for(&self.graph, node)
    }

    /// Pattern text; `shorten` writes IRIs with the session's prefixes.
    pub fn graph_pattern(&self, node: NodeId, shorten: bool) -> Result<String> {
        serialize::graph_pattern(&self.graph, node, shorten.then_some(&self.namespaces))
    }
}

// ============================================================================
// Defined component
// ============================================================================

/// Statements connecting the concretely identified nodes reachable from
/// `start`, walking forward through values and backward through owners.
/// Edges touching an unidentified node are left out.
pub fn defined_component(graph: &ObjectGraph<'_>, start: NodeId) -> Result<Vec<Triple>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    visit_defined(graph, start, &mut seen, &mut out)?;
    Ok(out)
}

fn visit_defined(
    graph: &ObjectGraph<'_>,
    node: NodeId,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<Triple>,
) -> Result<()> {
    if !seen.insert(node) || !graph.is_defined(node) {
        return Ok(());
    }

    if graph.is_entity(node) {
        let id = graph.identifier(node, false)?;
        out.push(Triple::typed(id.clone(), graph.class_of(node)?.rdf_type.clone()));
        out.extend(graph.statements(node)?.iter().cloned());

        for pid in graph.properties_of(node)? {
            let container = graph.container(*pid)?;
            let link = Term::iri(container.link());
            for value in container.values() {
                if graph.is_defined(*value) {
                    out.push(Triple::new(id.clone(), link.clone(), graph.identifier(*value, false)?));
                    visit_defined(graph, *value, seen, out)?;
                }
            }
        }
    }

    for pid in graph.owner_properties(node)? {
        let owner = graph.container(*pid)?.owner();
        visit_defined(graph, owner, seen, out)?;
    }
    Ok(())
}

// ============================================================================
// Store maintenance
// ============================================================================

/// Remove every statement whose subject has no `rdf:type` statement.
/// Returns the number removed.
pub fn cleanup_untyped<S: TripleStore + ?Sized>(store: &S) -> Result<usize> {
    let all = store.lookup(None, None, None)?;
    let rdf_type = Term::iri(vocab::RDF_TYPE);
    let typed: HashSet<&Term> = all.iter().filter(|t| t.predicate == rdf_type).map(|t| &t.subject).collect();
    let untyped: Vec<Triple> = all.iter().filter(|t| !typed.contains(&t.subject)).cloned().collect();
    store.remove_statements(&untyped)?;
    tracing::debug!(removed = untyped.len(), "removed untyped statements");
    Ok(untyped.len())
}
