//! Terms: the subject/predicate/object slots of a statement.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Literal;

/// A statement term.
///
/// `Variable` terms only ever appear in patterns; they are never written
/// to a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Term {
    Iri(String),
    Literal(Literal),
    Variable(String),
}

impl Term {
    pub fn iri(s: impl Into<String>) -> Self {
        Term::Iri(s.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn is_variable(&self) -> bool { matches!(self, Term::Variable(_)) }
    pub fn is_iri(&self) -> bool { matches!(self, Term::Iri(_)) }
    pub fn is_literal(&self) -> bool { matches!(self, Term::Literal(_)) }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Plain textual form: the IRI, the literal's lexical form, or the
    /// variable name. Used when identities are concatenated into seeds.
    pub fn text(&self) -> String {
        match self {
            Term::Iri(s) => s.clone(),
            Term::Literal(l) => l.lexical(),
            Term::Variable(v) => v.clone(),
        }
    }

    /// N3 rendering, as used in basic graph patterns.
    pub fn n3(&self) -> String {
        match self {
            Term::Iri(s) => format!("<{s}>"),
            Term::Literal(l) => l.n3(),
            Term::Variable(v) => format!("?{v}"),
        }
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self { Term::Literal(l) }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.n3())
    }
}
