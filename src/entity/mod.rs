//! # Entity / Property Model
//!
//! Entities, their property containers and attached value nodes live in
//! one arena, [`ObjectGraph`], addressed by [`NodeId`] and [`PropertyId`].
//! Every attached value records a back-reference to the container holding
//! it, so the graph can be walked in both directions:
//!
//! ```text
//!   owner ──(container: link)──▶ value        (properties_of)
//!   value ◀──(container: link)── owner        (owner_properties)
//! ```
//!
//! Nodes are never removed from the arena; retraction only affects the
//! store.

pub mod graph;
pub mod property;

pub use graph::{NewEntity, NodeId, ObjectGraph};
pub use property::{PropertyContainer, PropertyId, Resolved, Value};
