//! Named object collections.
//!
//! An opt-in built-in type grouping arbitrary entities under a name. A
//! collection's identifier is derived from its name, so every session
//! that names the same group addresses the same collection.

use serde_json::json;

use crate::entity::{NewEntity, NodeId};
use crate::identity::Identity;
use crate::schema::{ClassId, ClassSpec, Registry};
use crate::session::Session;
use crate::storage::TripleStore;
use crate::Result;

pub const COLLECTION_TYPE: &str = "ObjectCollection";
pub const NAME: &str = "name";
pub const MEMBER: &str = "member";

/// Declare `ObjectCollection` in `registry`.
pub fn declare(registry: &mut Registry) -> Result<ClassId> {
    registry.declare(
        ClassSpec::new(COLLECTION_TYPE)
            .datatype_property(NAME, false)
            .object_property(MEMBER, None, true),
    )
}

/// The collection named `group_name`, with its name set.
pub fn create<S: TripleStore + ?Sized>(session: &mut Session<'_, S>, group_name: &str) -> Result<NodeId> {
    let registry = session.registry();
    let iri = registry.derive_identifier(registry.class_id(COLLECTION_TYPE)?, &json!(group_name))?;
    session.create(
        NewEntity::new(COLLECTION_TYPE)
            .identity(Identity::explicit(iri))
            .with(NAME, group_name),
    )
}

pub fn add_member<S: TripleStore + ?Sized>(session: &mut Session<'_, S>, collection: NodeId, member: NodeId) -> Result<()> {
    session.set(collection, MEMBER, member)?;
    Ok(())
}

/// Members, attached or stored.
pub fn members<S: TripleStore + ?Sized>(session: &mut Session<'_, S>, collection: NodeId) -> Result<Vec<NodeId>> {
    session.get_objects(collection, MEMBER)
}
