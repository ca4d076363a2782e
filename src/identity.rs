//! Identity & key derivation.
//!
//! Every persisted entity is named by an IRI under its type's namespace.
//! Identifiers come from one of three places:
//!
//! ```text
//! explicit slug   → namespace + percent_encode(slug)          (direct_identifier)
//! arbitrary seed  → namespace + "a" + hex(hash(canonical))    (derive_identifier)
//! nothing at all  → ?Type_<hash of two random draws>          (placeholder, query-only)
//! ```
//!
//! Derived identifiers are content addressed: the same seed always yields
//! the same IRI. The seed's canonical string is its compact JSON encoding
//! (object keys sorted), so structurally equal seeds agree.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256};
use uuid::Uuid;

use crate::model::Term;
use crate::{Error, Result};

/// Characters left unescaped by `direct_identifier`: unreserved plus `/`.
const SLUG_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

// ============================================================================
// Hash methods
// ============================================================================

/// Hash used for derived identifiers. Selected by the `identifier.hash`
/// configuration key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMethod {
    #[default]
    Sha224,
    Sha256,
}

impl HashMethod {
    /// Lowercase hex digest of `data`.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            HashMethod::Sha224 => format!("{:x}", Sha224::digest(data)),
            HashMethod::Sha256 => format!("{:x}", Sha256::digest(data)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashMethod::Sha224 => "sha224",
            HashMethod::Sha256 => "sha256",
        }
    }
}

impl FromStr for HashMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(HashMethod::Sha224),
            "sha256" => Ok(HashMethod::Sha256),
            other => Err(Error::Config(format!("unsupported identifier hash '{other}'"))),
        }
    }
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Identifier construction
// ============================================================================

/// Canonical string for a seed.
pub fn canonical_string(seed: &serde_json::Value) -> String {
    seed.to_string()
}

/// `namespace + "a" + hash(canonical(seed))`
pub fn derive_identifier(namespace: &str, seed: &serde_json::Value, method: HashMethod) -> String {
    let digest = method.hex_digest(canonical_string(seed).as_bytes());
    format!("{namespace}a{digest}")
}

/// `namespace + percent_encode(slug)`. Fails unless `slug` is textual.
pub fn direct_identifier(namespace: &str, slug: &serde_json::Value) -> Result<String> {
    let text = slug.as_str().ok_or_else(|| Error::TypeError {
        expected: "string slug".into(),
        got: json_kind(slug).into(),
    })?;
    Ok(format!("{namespace}{}", utf8_percent_encode(text, SLUG_SAFE)))
}

/// Fresh placeholder variable for an entity of type `class_name`.
///
/// Two independent random draws plus the type name, hashed. Never a valid
/// stored identifier.
pub fn placeholder(class_name: &str, method: HashMethod) -> Term {
    let draws = (Uuid::new_v4().as_u128(), Uuid::new_v4().as_u128());
    let digest = method.hex_digest(format!("{:?}", draws).as_bytes());
    Term::Variable(format!("{class_name}_{digest}"))
}

/// Random key for `Identity::Generated`.
pub fn random_seed() -> serde_json::Value {
    serde_json::Value::String(Uuid::new_v4().to_string())
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// Entity identity state
// ============================================================================

/// How a new entity is named.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Identity {
    /// A complete identifier, used as-is.
    Explicit(String),
    /// A textual key is used directly; any other key is hashed.
    Key(serde_json::Value),
    /// A random key, hashed into a concrete identifier.
    Generated,
    /// A named query variable.
    Variable(String),
    /// No identity information: a random placeholder.
    #[default]
    Unbound,
}

impl Identity {
    pub fn explicit(iri: impl Into<String>) -> Self {
        Identity::Explicit(iri.into())
    }

    pub fn key(key: impl Into<serde_json::Value>) -> Self {
        Identity::Key(key.into())
    }
}

/// Identity state held by an entity: exactly one of concrete or placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIdentity {
    Concrete(String),
    Placeholder(String),
}

impl EntityIdentity {
    pub fn is_concrete(&self) -> bool {
        matches!(self, EntityIdentity::Concrete(_))
    }

    /// The identifier contract: concrete if set; the placeholder in query
    /// mode; otherwise `None` (the caller reports a missing identifier).
    pub fn term(&self, query: bool) -> Option<Term> {
        match self {
            EntityIdentity::Concrete(iri) => Some(Term::Iri(iri.clone())),
            EntityIdentity::Placeholder(v) if query => Some(Term::Variable(v.clone())),
            EntityIdentity::Placeholder(_) => None,
        }
    }
}
