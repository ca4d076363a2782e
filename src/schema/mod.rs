//! # Schema
//!
//! Type declarations and their wiring into the store.
//!
//! Declaring a type is an explicit schema-builder step: a [`ClassSpec`]
//! (name, parents, property descriptors) goes into [`Registry::declare`]
//! and comes back as an immutable [`ClassDef`]. Malformed declarations
//! fail there, not at first use.
//!
//! Wiring ([`Registry::wire`]) is separate and idempotent: it writes the
//! subtype and property-domain statements and binds the type's prefix.

pub mod namespace;
pub mod registry;

pub use namespace::NamespaceManager;
pub use registry::{
    ClassDef, ClassId, ClassSpec, PropertyDef, PropertyKind, PropertySpec, Registry,
    RESERVED_NAMES,
};
