//! # rdf-mapper: Typed Objects over a Triple Store
//!
//! Maps declared entity types onto subject/predicate/object statements.
//! Entities and their properties form an in-memory graph; that graph is
//! serialized to statements on save, and partially specified entities are
//! resolved against the store by turning them into join queries.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `TripleStore` is the contract between mapper and storage
//! 2. **Registry by reference**: types are declared once, then shared read-only
//! 3. **Arena graph**: entities, containers and values are indices, never `Rc` cycles
//! 4. **Deterministic output**: same content, same identifiers, same statement order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdf_mapper::{ClassSpec, Configuration, MemoryStore, NewEntity, Registry, Session};
//!
//! # fn example() -> rdf_mapper::Result<()> {
//! let conf = Configuration::with([("rdf.namespace", "http://example.org/")]);
//! let mut registry = Registry::new(&conf)?;
//! registry.declare(ClassSpec::new("Part"))?;
//! registry.declare(ClassSpec::new("Widget").object_property("hasPart", Some("Part"), true))?;
//!
//! let store = MemoryStore::new();
//! let mut session = Session::new(&registry, &store);
//! let p1 = session.create(NewEntity::new("Part").key("P1"))?;
//! let w = session.create(NewEntity::new("Widget").with("hasPart", p1))?;
//! session.save(w)?;
//!
//! let query = session.create(NewEntity::new("Widget"))?;
//! for found in session.load(query)? {
//!     println!("{:?}", session.get(found, "hasPart")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | terms, literals, statements |
//! | `schema` | type registry, namespaces |
//! | `entity` | entity/property arena |
//! | `serialize` | statements and graph patterns for an entity |
//! | `planner` | query-graph discovery from an unresolved node |
//! | `execution` | prefix-tree join over the store |
//! | `session` | save / load / resolve / retract |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod identity;
pub mod config;
pub mod schema;
pub mod entity;
pub mod serialize;
pub mod planner;
pub mod execution;
pub mod storage;
pub mod session;
pub mod collection;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Bindings, Literal, Term, Triple};
pub use identity::{EntityIdentity, HashMethod, Identity};
pub use config::Configuration;
pub use schema::{ClassDef, ClassId, ClassSpec, NamespaceManager, PropertyDef, PropertyKind, Registry};
pub use entity::{NewEntity, NodeId, ObjectGraph, PropertyContainer, PropertyId, Resolved, Value};
pub use planner::{PathSegment, QueryGraph};
pub use storage::{MemoryStore, TripleStore};
pub use session::Session;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{entity} has no identifier in {mode} mode")]
    MissingIdentifier { entity: String, mode: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("'{name}' collides with an existing attribute of {class}")]
    AttributeCollision { class: String, name: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("{class} has no property '{link}'")]
    UnknownProperty { class: String, link: String },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Identifier is already set to {0}")]
    ImmutableIdentity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
