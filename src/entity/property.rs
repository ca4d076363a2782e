//! Property containers and the values attached to them.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{Literal, Term};
use crate::schema::PropertyDef;

use super::NodeId;

/// Index of a property container within its [`ObjectGraph`](super::ObjectGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub usize);

// ============================================================================
// Value: what `set` accepts
// ============================================================================

/// A value to attach: an entity already in the graph, or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Entity(NodeId),
    Literal(Literal),
}

impl Value {
    pub fn is_entity(&self) -> bool {
        matches!(self, Value::Entity(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Entity(_) => "Entity",
            Value::Literal(l) => l.type_name(),
        }
    }
}

impl From<NodeId> for Value { fn from(v: NodeId) -> Self { Value::Entity(v) } }
impl From<Literal> for Value { fn from(v: Literal) -> Self { Value::Literal(v) } }
impl From<bool> for Value { fn from(v: bool) -> Self { Value::Literal(v.into()) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Literal(v.into()) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Literal(v.into()) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Literal(v.into()) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Literal(v.into()) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Literal(v.into()) } }
impl From<NaiveDate> for Value { fn from(v: NaiveDate) -> Self { Value::Literal(v.into()) } }
impl From<DateTime<Utc>> for Value { fn from(v: DateTime<Utc>) -> Self { Value::Literal(v.into()) } }

// ============================================================================
// Resolved: what the query form of `get` returns
// ============================================================================

/// Result of reading a property: one value for single-valued properties,
/// a set for multi-valued ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    One(Option<Term>),
    Many(BTreeSet<Term>),
}

impl Resolved {
    pub fn into_set(self) -> BTreeSet<Term> {
        match self {
            Resolved::One(v) => v.into_iter().collect(),
            Resolved::Many(s) => s,
        }
    }

    /// First value, if any.
    pub fn first(&self) -> Option<&Term> {
        match self {
            Resolved::One(v) => v.as_ref(),
            Resolved::Many(s) => s.iter().next(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

// ============================================================================
// PropertyContainer
// ============================================================================

/// One property of one entity: its owner, descriptor and attached values.
///
/// Values are kept sorted by their query-mode identifier so that
/// serialization order does not depend on insertion order.
#[derive(Debug, Clone)]
pub struct PropertyContainer {
    pub(crate) owner: NodeId,
    pub(crate) def: Arc<PropertyDef>,
    pub(crate) values: SmallVec<[NodeId; 2]>,
    /// Variable used for the container's identifier while it has no values.
    pub(crate) placeholder: String,
    /// Variable node attached by query-form reads, reused across calls.
    pub(crate) query_var: Option<NodeId>,
    pub(crate) adhoc: bool,
}

impl PropertyContainer {
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn def(&self) -> &PropertyDef {
        &self.def
    }

    pub fn link(&self) -> &str {
        &self.def.link
    }

    pub fn link_name(&self) -> &str {
        &self.def.link_name
    }

    pub fn is_multiple(&self) -> bool {
        self.def.multiple
    }

    /// Declared on the instance only, not on its type.
    pub fn is_adhoc(&self) -> bool {
        self.adhoc
    }

    pub fn values(&self) -> &[NodeId] {
        &self.values
    }

    pub fn has_value(&self) -> bool {
        !self.values.is_empty()
    }
}
