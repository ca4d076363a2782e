//! The entity arena.

use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use serde_json::json;
use smallvec::SmallVec;

use crate::identity::{self, EntityIdentity, Identity};
use crate::model::{Literal, Term, Triple};
use crate::schema::{ClassDef, PropertyDef, PropertyKind, Registry, RESERVED_NAMES};
use crate::{Error, Result};

use super::property::{PropertyContainer, PropertyId, Value};

/// Index of a node (entity, literal or query variable) within an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Entity(EntityData),
    /// A literal value attached to a datatype property.
    Literal(Literal),
    /// An open slot used while resolving a property read.
    Variable(String),
}

#[derive(Debug, Clone)]
pub(crate) struct EntityData {
    pub(crate) class: crate::schema::ClassId,
    pub(crate) identity: EntityIdentity,
    /// Declaration order: inherited first, then own, then ad-hoc.
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) by_link: HashMap<String, PropertyId>,
    /// Extra statements emitted with the entity.
    pub(crate) statements: Vec<Triple>,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    /// Containers this node is attached to as a value.
    pub(crate) owner_properties: Vec<PropertyId>,
}

// ============================================================================
// NewEntity
// ============================================================================

/// Everything needed to construct an entity.
///
/// ```rust,ignore
/// let p1 = graph.create(NewEntity::new("Part").key("P1"))?;
/// let w = graph.create(NewEntity::new("Widget").with("hasPart", p1))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewEntity {
    class: String,
    identity: Identity,
    values: Vec<(String, Value)>,
    statements: Vec<Triple>,
}

impl NewEntity {
    pub fn new(class: impl Into<String>) -> Self {
        Self { class: class.into(), ..Self::default() }
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Shorthand for `identity(Identity::key(key))`.
    pub fn key(self, key: impl Into<serde_json::Value>) -> Self {
        self.identity(Identity::key(key))
    }

    /// Initial value for a declared property.
    pub fn with(mut self, link_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((link_name.into(), value.into()));
        self
    }

    /// Extra statement emitted alongside the entity's own.
    pub fn statement(mut self, statement: Triple) -> Self {
        self.statements.push(statement);
        self
    }
}

// ============================================================================
// ObjectGraph
// ============================================================================

/// Arena of entities, property containers and value nodes.
#[derive(Debug, Clone)]
pub struct ObjectGraph<'r> {
    registry: &'r Registry,
    nodes: Vec<NodeData>,
    properties: Vec<PropertyContainer>,
}

impl<'r> ObjectGraph<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry, nodes: Vec::new(), properties: Vec::new() }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Number of nodes, value nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Construct an entity: resolve its identity, instantiate one container
    /// per descriptor of its type, then apply initial values.
    pub fn create(&mut self, spec: NewEntity) -> Result<NodeId> {
        let registry = self.registry;
        let class = registry.class(&spec.class)?;

        let mut names: HashSet<&str> = HashSet::new();
        for def in &class.properties {
            if RESERVED_NAMES.contains(&def.link_name.as_str()) || !names.insert(def.link_name.as_str()) {
                return Err(Error::AttributeCollision {
                    class: class.name.clone(),
                    name: def.link_name.clone(),
                });
            }
        }
        if let Some((link, _)) = spec.values.iter().find(|(link, _)| !names.contains(link.as_str())) {
            return Err(Error::UnknownProperty { class: class.name.clone(), link: link.clone() });
        }

        let identity = self.resolve_identity(class, spec.identity)?;
        let node = self.push_node(NodeKind::Entity(EntityData {
            class: class.id,
            identity,
            properties: Vec::with_capacity(class.properties.len()),
            by_link: HashMap::with_capacity(class.properties.len()),
            statements: spec.statements,
        }));
        for def in &class.properties {
            self.add_container(node, Arc::clone(def), false)?;
        }
        for (link, value) in spec.values {
            self.set(node, &link, value)?;
        }

        tracing::trace!(class = %class.name, node = %node, "created entity");
        Ok(node)
    }

    fn resolve_identity(&self, class: &ClassDef, requested: Identity) -> Result<EntityIdentity> {
        let reg = self.registry;
        Ok(match requested {
            Identity::Explicit(iri) => EntityIdentity::Concrete(iri),
            Identity::Key(key) if key.is_string() => EntityIdentity::Concrete(reg.direct_identifier(class.id, &key)?),
            Identity::Key(key) => EntityIdentity::Concrete(reg.derive_identifier(class.id, &key)?),
            Identity::Generated => {
                EntityIdentity::Concrete(reg.derive_identifier(class.id, &identity::random_seed())?)
            }
            Identity::Variable(name) => EntityIdentity::Placeholder(name),
            Identity::Unbound => {
                EntityIdentity::Placeholder(identity::placeholder(&class.name, reg.hash_method()).text())
            }
        })
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { kind, owner_properties: Vec::new() });
        id
    }

    fn add_container(&mut self, owner: NodeId, def: Arc<PropertyDef>, adhoc: bool) -> Result<PropertyId> {
        let pid = PropertyId(self.properties.len());
        let link_name = def.link_name.clone();
        let placeholder = identity::placeholder("", self.registry.hash_method()).text();
        let entity = self.entity_mut(owner)?;
        entity.properties.push(pid);
        entity.by_link.insert(link_name, pid);
        self.properties.push(PropertyContainer {
            owner,
            def,
            values: SmallVec::new(),
            placeholder,
            query_var: None,
            adhoc,
        });
        Ok(pid)
    }

    // ========================================================================
    // Node access
    // ========================================================================

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id.0).ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    pub(crate) fn entity(&self, id: NodeId) -> Result<&EntityData> {
        match &self.node(id)?.kind {
            NodeKind::Entity(e) => Ok(e),
            other => Err(Error::TypeError { expected: "Entity".into(), got: kind_name(other).into() }),
        }
    }

    fn entity_mut(&mut self, id: NodeId) -> Result<&mut EntityData> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        match &mut node.kind {
            NodeKind::Entity(e) => Ok(e),
            other => Err(Error::TypeError { expected: "Entity".into(), got: kind_name(other).into() }),
        }
    }

    pub fn is_entity(&self, id: NodeId) -> bool {
        self.entity(id).is_ok()
    }

    pub fn is_variable(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0).map(|n| &n.kind), Some(NodeKind::Variable(_)))
    }

    pub fn literal(&self, id: NodeId) -> Option<&Literal> {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Literal(l)) => Some(l),
            _ => None,
        }
    }

    pub fn class_of(&self, id: NodeId) -> Result<&'r ClassDef> {
        let class = self.entity(id)?.class;
        self.registry.class_by_id(class)
    }

    pub fn identity(&self, id: NodeId) -> Result<&EntityIdentity> {
        Ok(&self.entity(id)?.identity)
    }

    /// Extra statements attached to an entity.
    pub fn statements(&self, id: NodeId) -> Result<&[Triple]> {
        Ok(&self.entity(id)?.statements)
    }

    pub fn add_statement(&mut self, id: NodeId, statement: Triple) -> Result<()> {
        self.entity_mut(id)?.statements.push(statement);
        Ok(())
    }

    /// The node as a settable value.
    pub fn value(&self, id: NodeId) -> Result<Value> {
        match &self.node(id)?.kind {
            NodeKind::Entity(_) => Ok(Value::Entity(id)),
            NodeKind::Literal(l) => Ok(Value::Literal(l.clone())),
            NodeKind::Variable(v) => Err(Error::TypeError { expected: "value".into(), got: format!("variable ?{v}") }),
        }
    }

    /// `Widget#3` style label for messages.
    pub fn describe(&self, id: NodeId) -> String {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Entity(e)) => match self.registry.class_by_id(e.class) {
                Ok(class) => format!("{}{id}", class.name),
                Err(_) => format!("Entity{id}"),
            },
            Some(other) => format!("{}{id}", kind_name(other)),
            None => format!("missing{id}"),
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// The identifier contract.
    ///
    /// Entities answer with their concrete identifier, or their placeholder
    /// variable in query mode. Literals answer with themselves. Query
    /// variables only exist in query mode.
    pub fn identifier(&self, id: NodeId, query: bool) -> Result<Term> {
        let missing = || Error::MissingIdentifier {
            entity: self.describe(id),
            mode: if query { "query" } else { "statement" }.into(),
        };
        match &self.node(id)?.kind {
            NodeKind::Entity(e) => e.identity.term(query).ok_or_else(missing),
            NodeKind::Literal(l) => Ok(Term::Literal(l.clone())),
            NodeKind::Variable(v) if query => Ok(Term::var(v.clone())),
            NodeKind::Variable(_) => Err(missing()),
        }
    }

    /// Has a concrete identifier (literals always do).
    pub fn is_defined(&self, id: NodeId) -> bool {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Entity(e)) => e.identity.is_concrete(),
            Some(NodeKind::Literal(_)) => true,
            _ => false,
        }
    }

    /// Give a placeholder entity its concrete identifier. Once concrete an
    /// identifier never changes.
    pub fn set_identifier(&mut self, id: NodeId, iri: impl Into<String>) -> Result<()> {
        let iri = iri.into();
        let entity = self.entity_mut(id)?;
        if let EntityIdentity::Concrete(existing) = &entity.identity {
            if *existing == iri {
                return Ok(());
            }
            return Err(Error::ImmutableIdentity(existing.clone()));
        }
        entity.identity = EntityIdentity::Concrete(iri);
        // Sort keys of containers holding this node just changed.
        let holders = self.nodes[id.0].owner_properties.clone();
        for pid in holders {
            self.resort(pid);
        }
        Ok(())
    }

    /// Identifier derived from the first valued property, in declaration
    /// order: `derive([link_name, concat(value identifiers)])`.
    pub fn content_key(&self, id: NodeId) -> Result<String> {
        let entity = self.entity(id)?;
        for pid in &entity.properties {
            let container = &self.properties[pid.0];
            if container.has_value() {
                let seed = json!([container.def.link_name, self.values_text(&container.values)?]);
                return self.registry.derive_identifier(entity.class, &seed);
            }
        }
        Err(Error::MissingIdentifier { entity: self.describe(id), mode: "content key".into() })
    }

    /// Concrete identifier, deriving and freezing a content key first if
    /// the entity has none.
    pub fn ensure_identifier(&mut self, id: NodeId) -> Result<Term> {
        if self.is_defined(id) {
            return self.identifier(id, false);
        }
        let iri = self.content_key(id)?;
        self.set_identifier(id, iri.clone())?;
        tracing::debug!(entity = %self.describe(id), identifier = %iri, "derived content key");
        Ok(Term::Iri(iri))
    }

    /// Identifier of a reified container: derived from its link name and
    /// the concatenated identifiers of its values. Without concrete values
    /// it only has its placeholder, and only in query mode.
    pub fn property_identifier(&self, pid: PropertyId, query: bool) -> Result<Term> {
        let container = self.container(pid)?;
        let concrete = if container.has_value() { self.values_text(&container.values).ok() } else { None };
        match concrete {
            Some(text) => Ok(Term::Iri(identity::derive_identifier(
                &container.def.namespace,
                &json!([container.def.link_name, text]),
                self.registry.hash_method(),
            ))),
            None if query => Ok(Term::var(container.placeholder.clone())),
            None => Err(Error::MissingIdentifier { entity: container.def.name.clone(), mode: "statement".into() }),
        }
    }

    fn values_text(&self, values: &[NodeId]) -> Result<String> {
        values.iter().try_fold(String::new(), |mut acc, v| {
            acc.push_str(&self.identifier(*v, false)?.text());
            Ok(acc)
        })
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn container(&self, pid: PropertyId) -> Result<&PropertyContainer> {
        self.properties
            .get(pid.0)
            .ok_or_else(|| Error::NotFound(format!("property container {}", pid.0)))
    }

    /// Container for `link_name` on `id`.
    pub fn property(&self, id: NodeId, link_name: &str) -> Result<PropertyId> {
        let entity = self.entity(id)?;
        entity.by_link.get(link_name).copied().ok_or_else(|| Error::UnknownProperty {
            class: self.describe(id),
            link: link_name.to_string(),
        })
    }

    /// Containers owned by `id`, in declaration order. Empty for non-entities.
    pub fn properties_of(&self, id: NodeId) -> Result<&[PropertyId]> {
        match &self.node(id)?.kind {
            NodeKind::Entity(e) => Ok(&e.properties),
            _ => Ok(&[]),
        }
    }

    /// Containers holding `id` as a value.
    pub fn owner_properties(&self, id: NodeId) -> Result<&[PropertyId]> {
        Ok(&self.node(id)?.owner_properties)
    }

    /// Attached values of `link_name` on `id`.
    pub fn values_of(&self, id: NodeId, link_name: &str) -> Result<&[NodeId]> {
        let pid = self.property(id, link_name)?;
        Ok(self.properties[pid.0].values.as_slice())
    }

    pub fn has_value(&self, id: NodeId, link_name: &str) -> Result<bool> {
        Ok(!self.values_of(id, link_name)?.is_empty())
    }

    /// Entities that hold `id` under `link_name`.
    pub fn owners(&self, id: NodeId, link_name: &str) -> Result<Vec<NodeId>> {
        Ok(self
            .owner_properties(id)?
            .iter()
            .map(|pid| &self.properties[pid.0])
            .filter(|c| c.def.link_name == link_name)
            .map(|c| c.owner)
            .collect())
    }

    /// Attach `value` to the `link_name` property of `id`.
    pub fn set(&mut self, id: NodeId, link_name: &str, value: impl Into<Value>) -> Result<PropertyId> {
        let pid = self.property(id, link_name)?;
        self.attach(pid, value.into())?;
        Ok(pid)
    }

    /// Detach `value` from the `link_name` property of `id`.
    pub fn unset(&mut self, id: NodeId, link_name: &str, value: impl Into<Value>) -> Result<()> {
        let pid = self.property(id, link_name)?;
        self.detach(pid, &value.into())
    }

    /// Like [`set`](Self::set), but creates a multi-valued container local
    /// to this instance when its type declares no `link_name` property.
    pub fn relate(&mut self, id: NodeId, link_name: &str, value: impl Into<Value>) -> Result<PropertyId> {
        let value = value.into();
        if let Ok(pid) = self.property(id, link_name) {
            self.attach(pid, value)?;
            return Ok(pid);
        }
        let class = self.class_of(id)?;
        if RESERVED_NAMES.contains(&link_name) {
            return Err(Error::AttributeCollision { class: class.name.clone(), name: link_name.to_string() });
        }
        let def = self.registry.adhoc_property(class.id, link_name, value.is_entity())?;
        let pid = self.add_container(id, Arc::new(def), true)?;
        self.attach(pid, value)?;
        Ok(pid)
    }

    /// Attach a value, recording the back-reference. Multi-valued containers
    /// keep their values sorted; single-valued ones replace.
    pub fn attach(&mut self, pid: PropertyId, value: Value) -> Result<()> {
        let container = self.container(pid)?;
        let (kind, multiple) = (container.def.kind.clone(), container.def.multiple);

        let node = match value {
            Value::Entity(n) => {
                let class = self.entity(n)?.class;
                match kind {
                    PropertyKind::Datatype => {
                        return Err(Error::TypeError { expected: "literal".into(), got: self.describe(n) });
                    }
                    PropertyKind::Object { value_type: Some(vt) } if !self.registry.is_subclass(class, vt) => {
                        let expected = self.registry.class_by_id(vt)?.name.clone();
                        return Err(Error::TypeError { expected, got: self.describe(n) });
                    }
                    PropertyKind::Object { .. } => {}
                }
                if self.properties[pid.0].values.iter().any(|v| self.same_entity(*v, n)) {
                    return Ok(());
                }
                n
            }
            Value::Literal(lit) => {
                if kind.is_object() {
                    return Err(Error::TypeError { expected: "Entity".into(), got: lit.type_name().into() });
                }
                if self.properties[pid.0].values.iter().any(|v| self.literal(*v) == Some(&lit)) {
                    return Ok(());
                }
                self.push_node(NodeKind::Literal(lit))
            }
        };

        if !multiple {
            let old = std::mem::take(&mut self.properties[pid.0].values);
            for prev in old {
                self.remove_backref(prev, pid);
            }
        }
        self.insert_sorted(pid, node);
        self.nodes[node.0].owner_properties.push(pid);
        Ok(())
    }

    /// Detach a value. Fails with `NotFound` if it is not attached.
    pub fn detach(&mut self, pid: PropertyId, value: &Value) -> Result<()> {
        let container = self.container(pid)?;
        let pos = container
            .values
            .iter()
            .position(|v| match value {
                Value::Entity(n) => self.same_entity(*v, *n),
                Value::Literal(l) => self.literal(*v) == Some(l),
            })
            .ok_or_else(|| Error::NotFound(format!("{} has no value {value:?}", container.def.name)))?;
        let node = self.properties[pid.0].values.remove(pos);
        self.remove_backref(node, pid);
        Ok(())
    }

    /// The same node, or two nodes with the same concrete identifier.
    fn same_entity(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        if !(self.is_defined(a) && self.is_defined(b)) {
            return false;
        }
        matches!((self.identifier(a, false), self.identifier(b, false)), (Ok(x), Ok(y)) if x == y)
    }

    fn remove_backref(&mut self, node: NodeId, pid: PropertyId) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.owner_properties.retain(|p| *p != pid);
        }
    }

    fn sort_key(&self, id: NodeId) -> Option<Term> {
        self.identifier(id, true).ok()
    }

    fn insert_sorted(&mut self, pid: PropertyId, node: NodeId) {
        let key = self.sort_key(node);
        let pos = self.properties[pid.0].values.partition_point(|v| self.sort_key(*v) <= key);
        self.properties[pid.0].values.insert(pos, node);
    }

    fn resort(&mut self, pid: PropertyId) {
        let mut values = self.properties[pid.0].values.clone();
        values.sort_by_cached_key(|v| self.sort_key(*v));
        self.properties[pid.0].values = values;
    }

    // ========================================================================
    // Query variables
    // ========================================================================

    /// Attach the container's query variable alongside its current values.
    pub(crate) fn attach_query_variable(&mut self, pid: PropertyId) -> Result<NodeId> {
        let container = self.container(pid)?;
        let (existing, def_name) = (container.query_var, container.def.name.clone());
        let var = match existing {
            Some(var) => var,
            None => {
                let name = identity::placeholder(&def_name, self.registry.hash_method()).text();
                let var = self.push_node(NodeKind::Variable(name));
                self.properties[pid.0].query_var = Some(var);
                var
            }
        };
        if !self.properties[pid.0].values.contains(&var) {
            self.properties[pid.0].values.push(var);
            self.nodes[var.0].owner_properties.push(pid);
        }
        Ok(var)
    }

    pub(crate) fn detach_query_variable(&mut self, pid: PropertyId, var: NodeId) {
        if let Some(container) = self.properties.get_mut(pid.0) {
            container.values.retain(|v| *v != var);
        }
        self.remove_backref(var, pid);
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Entity(_) => "Entity",
        NodeKind::Literal(l) => l.type_name(),
        NodeKind::Variable(_) => "Variable",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::HashMethod;
    use crate::schema::ClassSpec;

    const NS: &str = "http://example.org/";

    fn registry() -> Registry {
        let mut reg = Registry::with_namespace(NS, HashMethod::Sha224);
        reg.declare(ClassSpec::new("Part").datatype_property("label", false)).unwrap();
        reg.declare(
            ClassSpec::new("Widget")
                .object_property("hasPart", Some("Part"), true)
                .object_property("primary", Some("Part"), false)
                .datatype_property("name", false),
        )
        .unwrap();
        reg
    }

    fn part(g: &mut ObjectGraph<'_>, key: &str) -> NodeId {
        g.create(NewEntity::new("Part").key(key)).unwrap()
    }

    #[test]
    fn test_create_instantiates_one_container_per_descriptor() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let names: Vec<_> = g
            .properties_of(w)
            .unwrap()
            .iter()
            .map(|p| g.container(*p).unwrap().link_name().to_string())
            .collect();
        assert_eq!(names, vec!["hasPart", "primary", "name"]);
        assert!(!g.is_defined(w));
        assert!(g.identifier(w, true).unwrap().is_variable());
        assert!(matches!(g.identifier(w, false), Err(Error::MissingIdentifier { .. })));
    }

    #[test]
    fn test_identity_forms() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let p = part(&mut g, "P1");
        assert_eq!(g.identifier(p, false).unwrap(), Term::iri("http://example.org/Part/P1"));

        let hashed = g.create(NewEntity::new("Part").key(json!([1, 2]))).unwrap();
        let id = g.identifier(hashed, false).unwrap();
        assert!(id.text().starts_with("http://example.org/Part/a"));

        let explicit = g.create(NewEntity::new("Part").identity(Identity::explicit("urn:x"))).unwrap();
        assert_eq!(g.identifier(explicit, false).unwrap(), Term::iri("urn:x"));

        let named = g.create(NewEntity::new("Part").identity(Identity::Variable("p".into()))).unwrap();
        assert_eq!(g.identifier(named, true).unwrap(), Term::var("p"));

        let first = g.create(NewEntity::new("Part").identity(Identity::Generated)).unwrap();
        let second = g.create(NewEntity::new("Part").identity(Identity::Generated)).unwrap();
        assert!(g.is_defined(first));
        let first_id = g.identifier(first, false).unwrap();
        assert!(first_id.text().starts_with("http://example.org/Part/a"));
        assert_ne!(first_id, g.identifier(second, false).unwrap());
    }

    #[test]
    fn test_values_sorted_regardless_of_insertion_order() {
        let reg = registry();
        let mut a = ObjectGraph::new(&reg);
        let mut b = ObjectGraph::new(&reg);

        let wa = a.create(NewEntity::new("Widget")).unwrap();
        for key in ["P3", "P1", "P2"] {
            let p = part(&mut a, key);
            a.set(wa, "hasPart", p).unwrap();
        }
        let wb = b.create(NewEntity::new("Widget")).unwrap();
        for key in ["P2", "P3", "P1"] {
            let p = part(&mut b, key);
            b.set(wb, "hasPart", p).unwrap();
        }

        let ids = |g: &ObjectGraph<'_>, w| -> Vec<Term> {
            g.values_of(w, "hasPart").unwrap().iter().map(|v| g.identifier(*v, false).unwrap()).collect()
        };
        assert_eq!(ids(&a, wa), ids(&b, wb));
        assert_eq!(ids(&a, wa)[0], Term::iri("http://example.org/Part/P1"));
    }

    #[test]
    fn test_single_valued_replaces_and_drops_backref() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let p1 = part(&mut g, "P1");
        let p2 = part(&mut g, "P2");
        g.set(w, "primary", p1).unwrap();
        g.set(w, "primary", p2).unwrap();
        assert_eq!(g.values_of(w, "primary").unwrap(), &[p2]);
        assert!(g.owner_properties(p1).unwrap().is_empty());
        assert_eq!(g.owners(p2, "primary").unwrap(), vec![w]);
    }

    #[test]
    fn test_set_enforces_value_kind() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let other = g.create(NewEntity::new("Widget")).unwrap();
        assert!(matches!(g.set(w, "hasPart", "text"), Err(Error::TypeError { .. })));
        assert!(matches!(g.set(w, "hasPart", other), Err(Error::TypeError { .. })));
        let p = part(&mut g, "P1");
        assert!(matches!(g.set(w, "name", p), Err(Error::TypeError { .. })));
        assert!(matches!(g.set(w, "nope", p), Err(Error::UnknownProperty { .. })));
    }

    #[test]
    fn test_unset_missing_value_is_not_found() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget").with("name", "w")).unwrap();
        let p = part(&mut g, "P1");
        assert!(matches!(g.unset(w, "hasPart", p), Err(Error::NotFound(_))));
        g.unset(w, "name", "w").unwrap();
        assert!(!g.has_value(w, "name").unwrap());
    }

    #[test]
    fn test_relate_creates_instance_local_container() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let p = part(&mut g, "P1");
        let pid = g.relate(w, "mentions", p).unwrap();
        assert!(g.container(pid).unwrap().is_adhoc());
        assert!(g.container(pid).unwrap().is_multiple());
        assert_eq!(g.container(pid).unwrap().link(), "http://example.org/Widget/mentions");
        assert_eq!(g.owners(p, "mentions").unwrap(), vec![w]);
        assert!(matches!(g.relate(w, "save", p), Err(Error::AttributeCollision { .. })));
        // other instances are unaffected
        let w2 = g.create(NewEntity::new("Widget")).unwrap();
        assert!(g.property(w2, "mentions").is_err());
    }

    #[test]
    fn test_content_key_from_first_valued_property() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let p1 = part(&mut g, "P1");
        let p2 = part(&mut g, "P2");
        let w = g.create(NewEntity::new("Widget").with("hasPart", p2).with("hasPart", p1)).unwrap();
        let expected = reg
            .derive_identifier(
                reg.class_id("Widget").unwrap(),
                &json!(["hasPart", "http://example.org/Part/P1http://example.org/Part/P2"]),
            )
            .unwrap();
        assert_eq!(g.ensure_identifier(w).unwrap(), Term::iri(expected.clone()));
        assert!(matches!(g.set_identifier(w, "urn:other"), Err(Error::ImmutableIdentity(_))));
        assert_eq!(g.identifier(w, false).unwrap(), Term::iri(expected));

        let empty = g.create(NewEntity::new("Widget")).unwrap();
        assert!(matches!(g.ensure_identifier(empty), Err(Error::MissingIdentifier { .. })));
    }

    #[test]
    fn test_same_identifier_attaches_once() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let single = {
            let p1 = part(&mut g, "P1");
            let w = g.create(NewEntity::new("Widget").with("hasPart", p1)).unwrap();
            g.content_key(w).unwrap()
        };

        let first = part(&mut g, "P1");
        let copy = part(&mut g, "P1");
        let w = g.create(NewEntity::new("Widget")).unwrap();
        g.set(w, "hasPart", first).unwrap();
        g.set(w, "hasPart", copy).unwrap();
        assert_eq!(g.values_of(w, "hasPart").unwrap(), &[first]);
        assert!(g.owner_properties(copy).unwrap().is_empty());
        assert_eq!(g.content_key(w).unwrap(), single);

        g.unset(w, "hasPart", copy).unwrap();
        assert!(!g.has_value(w, "hasPart").unwrap());
    }

    #[test]
    fn test_property_identifier_needs_concrete_values() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let pid = g.property(w, "hasPart").unwrap();
        assert!(g.property_identifier(pid, true).unwrap().is_variable());
        assert!(g.property_identifier(pid, false).is_err());

        let p = part(&mut g, "P1");
        g.set(w, "hasPart", p).unwrap();
        let id = g.property_identifier(pid, false).unwrap();
        assert!(id.text().starts_with("http://example.org/Widget_hasPart/a"));
    }

    #[test]
    fn test_query_variable_is_reused_and_removed() {
        let reg = registry();
        let mut g = ObjectGraph::new(&reg);
        let w = g.create(NewEntity::new("Widget")).unwrap();
        let p = part(&mut g, "P1");
        let pid = g.set(w, "primary", p).unwrap();

        let var = g.attach_query_variable(pid).unwrap();
        assert_eq!(g.values_of(w, "primary").unwrap().len(), 2);
        g.detach_query_variable(pid, var);
        assert_eq!(g.values_of(w, "primary").unwrap(), &[p]);
        assert_eq!(g.attach_query_variable(pid).unwrap(), var);
    }
}
