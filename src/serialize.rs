//! Statement production.
//!
//! Walks an entity and everything reachable through its property values,
//! depth first:
//!
//! ```text
//! (id, rdf:type, <Type>)
//! <extra statements>
//! for each container with values, in declaration order:
//!     for each value, in sorted order:
//!         (id, link, value_id)
//!         <value's own statements>
//! ```
//!
//! Each entity is expanded once per walk, so cyclic graphs terminate.
//! In query mode unidentified entities appear as their placeholder
//! variables and the output is a join pattern.

use hashbrown::HashSet;

use crate::entity::{NodeId, ObjectGraph};
use crate::model::{Term, Triple};
use crate::schema::NamespaceManager;
use crate::Result;

/// Statements for `node` and everything reachable from it.
///
/// Fails with `MissingIdentifier` outside query mode if any reachable
/// entity has no concrete identifier.
pub fn emit_statements(graph: &ObjectGraph<'_>, node: NodeId, query: bool) -> Result<Vec<Triple>> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    walk(graph, node, query, &mut visited, &mut out)?;
    Ok(out)
}

/// Query-mode statements: a pattern whose variables are the placeholders
/// of unidentified entities.
pub fn pattern_for(graph: &ObjectGraph<'_>, node: NodeId) -> Result<Vec<Triple>> {
    emit_statements(graph, node, true)
}

fn walk(
    graph: &ObjectGraph<'_>,
    node: NodeId,
    query: bool,
    visited: &mut HashSet<Term>,
    out: &mut Vec<Triple>,
) -> Result<()> {
    if !graph.is_entity(node) {
        return Ok(());
    }
    let id = graph.identifier(node, query)?;
    if !visited.insert(id.clone()) {
        return Ok(());
    }

    out.push(Triple::typed(id.clone(), graph.class_of(node)?.rdf_type.clone()));
    out.extend(graph.statements(node)?.iter().cloned());

    for pid in graph.properties_of(node)? {
        let container = graph.container(*pid)?;
        let link = Term::iri(container.link());
        for value in container.values() {
            out.push(Triple::new(id.clone(), link.clone(), graph.identifier(*value, query)?));
            walk(graph, *value, query, visited, out)?;
        }
    }
    Ok(())
}

// ============================================================================
// Pattern text
// ============================================================================

/// Basic-graph-pattern text for `node`'s query pattern.
pub fn graph_pattern(graph: &ObjectGraph<'_>, node: NodeId, namespaces: Option<&NamespaceManager>) -> Result<String> {
    Ok(triples_to_bgp(&pattern_for(graph, node)?, namespaces))
}

/// One statement per line, each ending in ` .`. With a namespace manager,
/// IRIs are written as `prefix:local` where a bound prefix matches.
pub fn triples_to_bgp(triples: &[Triple], namespaces: Option<&NamespaceManager>) -> String {
    triples
        .iter()
        .map(|t| {
            let [s, p, o] = t.terms().map(|term| render(term, namespaces));
            format!("{s} {p} {o} .")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(term: &Term, namespaces: Option<&NamespaceManager>) -> String {
    match (term, namespaces) {
        (Term::Iri(iri), Some(nm)) => nm
            .shorten(iri)
            .filter(|curie| curie.split_once(':').is_some_and(|(_, local)| is_plain_local(local)))
            .unwrap_or_else(|| term.n3()),
        _ => term.n3(),
    }
}

fn is_plain_local(local: &str) -> bool {
    local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
