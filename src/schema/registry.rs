//! Class registry.
//!
//! One `Registry` is built per configuration and passed by reference to
//! everything that needs type information. It is append-only: a type is
//! declared exactly once and its descriptor list never changes afterwards.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::{self, Configuration};
use crate::identity::{self, HashMethod};
use crate::model::{vocab, Term, Triple};
use crate::storage::TripleStore;
use crate::{Error, Result};

use super::NamespaceManager;

/// Names an entity already answers to; a property may not shadow them.
pub const RESERVED_NAMES: [&str; 11] = [
    "identifier",
    "rdf_type",
    "properties",
    "owner_properties",
    "triples",
    "graph_pattern",
    "save",
    "load",
    "retract",
    "relate",
    "defined",
];

/// Index of a declared type within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// What a property points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Entity-valued. `None` accepts any entity type.
    Object { value_type: Option<ClassId> },
    /// Literal-valued.
    Datatype,
}

impl PropertyKind {
    pub fn is_object(&self) -> bool {
        matches!(self, PropertyKind::Object { .. })
    }
}

/// A synthesized property-container type: one per (owner type, link name).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// `<Owner>_<link_name>`
    pub name: String,
    pub link_name: String,
    /// Predicate IRI: owner namespace + link name.
    pub link: String,
    /// Type IRI of the container itself: base namespace + `name`.
    pub rdf_type: String,
    /// Namespace for identifiers of reified containers: `rdf_type + "/"`.
    pub namespace: String,
    pub kind: PropertyKind,
    pub multiple: bool,
    /// The type that declared it (not necessarily the entity's own type).
    pub owner: ClassId,
}

/// A declared entity type.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    /// base namespace + name
    pub rdf_type: String,
    /// `rdf_type + "/"`; identifiers of instances live here.
    pub namespace: String,
    /// Direct parents only.
    pub parents: Vec<ClassId>,
    /// Inherited descriptors (parents first) followed by own.
    pub properties: Vec<Arc<PropertyDef>>,
}

impl ClassDef {
    pub fn property(&self, link_name: &str) -> Option<&Arc<PropertyDef>> {
        self.properties.iter().find(|p| p.link_name == link_name)
    }
}

// ============================================================================
// Declarations (input to the schema builder)
// ============================================================================

/// One declared property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub link_name: String,
    /// `Some(type name)` for object properties restricted to a type;
    /// `Some("")` is rejected.
    pub value_type: Option<String>,
    pub object: bool,
    pub multiple: bool,
}

/// A type declaration: name, parents and own property descriptors.
#[derive(Debug, Clone, Default)]
pub struct ClassSpec {
    pub name: String,
    pub parents: Vec<String>,
    pub properties: Vec<PropertySpec>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }

    /// Object property; `value_type` restricts targets to one declared type.
    pub fn object_property(mut self, link_name: impl Into<String>, value_type: Option<&str>, multiple: bool) -> Self {
        self.properties.push(PropertySpec {
            link_name: link_name.into(),
            value_type: value_type.map(str::to_owned),
            object: true,
            multiple,
        });
        self
    }

    pub fn datatype_property(mut self, link_name: impl Into<String>, multiple: bool) -> Self {
        self.properties.push(PropertySpec {
            link_name: link_name.into(),
            value_type: None,
            object: false,
            multiple,
        });
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug)]
pub struct Registry {
    base: String,
    hash: HashMethod,
    classes: Vec<ClassDef>,
    by_name: HashMap<String, ClassId>,
    by_rdf_type: HashMap<String, ClassId>,
}

impl Registry {
    /// Build from configuration: `rdf.namespace` is required,
    /// `identifier.hash` defaults to sha224.
    pub fn new(conf: &Configuration) -> Result<Self> {
        let base = conf.get_str(config::NAMESPACE_KEY)?.to_string();
        let hash_name = conf.get_or(config::IDENTIFIER_HASH_KEY, config::DEFAULT_IDENTIFIER_HASH);
        let hash = hash_name
            .as_str()
            .ok_or_else(|| Error::Config(format!("'{}' must be a string", config::IDENTIFIER_HASH_KEY)))?
            .parse()?;
        Ok(Self::with_namespace(base, hash))
    }

    pub fn with_namespace(base: impl Into<String>, hash: HashMethod) -> Self {
        Self {
            base: base.into(),
            hash,
            classes: Vec::new(),
            by_name: HashMap::new(),
            by_rdf_type: HashMap::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn hash_method(&self) -> HashMethod {
        self.hash
    }

    /// Predicate used for property-domain statements.
    pub fn domain_predicate(&self) -> String {
        format!("{}{}", self.base, vocab::DOMAIN_LOCAL_NAME)
    }

    // ========================================================================
    // Declaration
    // ========================================================================

    /// Declare a type. Fails on duplicates, unknown parents or value types,
    /// and property names that collide with inherited or reserved ones.
    pub fn declare(&mut self, spec: ClassSpec) -> Result<ClassId> {
        if spec.name.is_empty() || spec.name.contains(['/', ' ', ':']) {
            return Err(Error::Schema(format!("invalid type name '{}'", spec.name)));
        }
        if self.by_name.contains_key(&spec.name) {
            return Err(Error::Schema(format!("type '{}' is already declared", spec.name)));
        }

        let id = ClassId(self.classes.len());
        let rdf_type = format!("{}{}", self.base, spec.name);
        let namespace = format!("{rdf_type}/");

        let parents = spec
            .parents
            .iter()
            .map(|p| self.class_id(p))
            .collect::<Result<Vec<_>>>()?;

        let mut properties: Vec<Arc<PropertyDef>> = Vec::new();
        for parent in &parents {
            for prop in &self.classes[parent.0].properties {
                // Diamonds inherit the same descriptor twice.
                if !properties.iter().any(|p| Arc::ptr_eq(p, prop)) {
                    properties.push(Arc::clone(prop));
                }
            }
        }

        for prop in &spec.properties {
            if prop.link_name.is_empty() {
                return Err(Error::Schema(format!("empty property name on '{}'", spec.name)));
            }
            if RESERVED_NAMES.contains(&prop.link_name.as_str())
                || properties.iter().any(|p| p.link_name == prop.link_name)
            {
                return Err(Error::AttributeCollision {
                    class: spec.name.clone(),
                    name: prop.link_name.clone(),
                });
            }
            let kind = if prop.object {
                let value_type = match prop.value_type.as_deref() {
                    None => None,
                    Some(t) if t == spec.name => Some(id),
                    Some(t) => Some(self.class_id(t)?),
                };
                PropertyKind::Object { value_type }
            } else {
                PropertyKind::Datatype
            };
            properties.push(Arc::new(self.property_def(
                id,
                &spec.name,
                &namespace,
                &prop.link_name,
                kind,
                prop.multiple,
            )));
        }

        tracing::debug!(class = %spec.name, parents = parents.len(), properties = properties.len(), "declared type");

        self.by_name.insert(spec.name.clone(), id);
        self.by_rdf_type.insert(rdf_type.clone(), id);
        self.classes.push(ClassDef {
            id,
            name: spec.name,
            rdf_type,
            namespace,
            parents,
            properties,
        });
        Ok(id)
    }

    /// Descriptor for a container type that is not recorded in the registry.
    /// Used for instance-local (ad-hoc) relations.
    pub fn adhoc_property(&self, owner: ClassId, link_name: &str, object: bool) -> Result<PropertyDef> {
        let class = self.class_by_id(owner)?;
        let kind = if object {
            PropertyKind::Object { value_type: None }
        } else {
            PropertyKind::Datatype
        };
        Ok(self.property_def(owner, &class.name, &class.namespace, link_name, kind, true))
    }

    fn property_def(
        &self,
        owner: ClassId,
        owner_name: &str,
        owner_namespace: &str,
        link_name: &str,
        kind: PropertyKind,
        multiple: bool,
    ) -> PropertyDef {
        let name = format!("{owner_name}_{link_name}");
        let rdf_type = format!("{}{}", self.base, name);
        PropertyDef {
            link: format!("{owner_namespace}{link_name}"),
            namespace: format!("{rdf_type}/"),
            rdf_type,
            name,
            link_name: link_name.to_string(),
            kind,
            multiple,
            owner,
        }
    }

    // ========================================================================
    // Wiring
    // ========================================================================

    /// Schema statements for one type: subtype-of each parent, then a
    /// domain statement per property descriptor (inherited included).
    pub fn schema_statements(&self, id: ClassId) -> Result<Vec<Triple>> {
        let class = self.class_by_id(id)?;
        let me = Term::iri(&class.rdf_type);
        let mut out = Vec::new();
        for parent in &class.parents {
            out.push(Triple::new(
                me.clone(),
                Term::iri(vocab::RDFS_SUBCLASS_OF),
                Term::iri(&self.classes[parent.0].rdf_type),
            ));
        }
        let domain = Term::iri(self.domain_predicate());
        for prop in &class.properties {
            out.push(Triple::new(Term::iri(&prop.rdf_type), domain.clone(), me.clone()));
        }
        Ok(out)
    }

    /// Write a type's schema statements and bind its namespace prefix.
    /// Safe to repeat.
    pub fn wire<S: TripleStore + ?Sized>(&self, id: ClassId, store: &S, namespaces: &mut NamespaceManager) -> Result<()> {
        let statements = self.schema_statements(id)?;
        store.add_statements(&statements)?;
        let class = &self.classes[id.0];
        namespaces.bind(class.name.clone(), class.namespace.clone());
        tracing::debug!(class = %class.name, statements = statements.len(), "wired type");
        Ok(())
    }

    /// Re-wire every registered type, parents before children.
    pub fn wire_all<S: TripleStore + ?Sized>(&self, store: &S, namespaces: &mut NamespaceManager) -> Result<()> {
        for class in &self.classes {
            self.wire(class.id, store, namespaces)?;
        }
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn class(&self, name: &str) -> Result<&ClassDef> {
        self.class_id(name).map(|id| &self.classes[id.0])
    }

    pub fn class_id(&self, name: &str) -> Result<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn class_by_id(&self, id: ClassId) -> Result<&ClassDef> {
        self.classes
            .get(id.0)
            .ok_or_else(|| Error::UnknownType(format!("#{id}")))
    }

    pub fn class_by_rdf_type(&self, iri: &str) -> Option<&ClassDef> {
        self.by_rdf_type.get(iri).map(|id| &self.classes[id.0])
    }

    /// Direct parent names of `name`.
    pub fn parents(&self, name: &str) -> Result<Vec<&str>> {
        let class = self.class(name)?;
        Ok(class.parents.iter().map(|p| self.classes[p.0].name.as_str()).collect())
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `a` is `b` or descends from it.
    pub fn is_subclass(&self, a: ClassId, b: ClassId) -> bool {
        if a == b {
            return true;
        }
        let mut stack = vec![a];
        while let Some(c) = stack.pop() {
            let Some(class) = self.classes.get(c.0) else { continue };
            for &p in &class.parents {
                if p == b {
                    return true;
                }
                stack.push(p);
            }
        }
        false
    }

    /// Most specific registered type among `rdf_types`.
    ///
    /// Candidates that are strict ancestors of another candidate drop out.
    /// If several unrelated candidates remain, the one whose name sorts
    /// first wins.
    pub fn most_specific<'a>(&self, rdf_types: impl IntoIterator<Item = &'a str>) -> Option<ClassId> {
        let candidates: Vec<ClassId> = rdf_types
            .into_iter()
            .filter_map(|t| self.by_rdf_type.get(t).copied())
            .collect();
        candidates
            .iter()
            .copied()
            .filter(|&c| !candidates.iter().any(|&o| o != c && self.is_subclass(o, c)))
            .min_by(|a, b| self.classes[a.0].name.cmp(&self.classes[b.0].name))
    }

    /// Type name encoded in an identifier under the base namespace:
    /// `<base><Type>[/<rest>]`.
    pub fn extract_class_name<'i>(&self, iri: &'i str) -> Result<&'i str> {
        let rest = iri.strip_prefix(self.base.as_str()).ok_or_else(|| {
            Error::Schema(format!("'{iri}' is not under the namespace '{}'", self.base))
        })?;
        Ok(rest.split('/').next().unwrap_or(rest))
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Content-addressed identifier in `class`'s namespace.
    pub fn derive_identifier(&self, id: ClassId, seed: &serde_json::Value) -> Result<String> {
        let class = self.class_by_id(id)?;
        Ok(identity::derive_identifier(&class.namespace, seed, self.hash))
    }

    /// Slug identifier in `class`'s namespace.
    pub fn direct_identifier(&self, id: ClassId, slug: &serde_json::Value) -> Result<String> {
        let class = self.class_by_id(id)?;
        identity::direct_identifier(&class.namespace, slug)
    }
}
