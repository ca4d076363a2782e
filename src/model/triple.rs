//! Triple: a (subject, predicate, object) statement or statement pattern.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{vocab, Term};

/// Variable bindings produced by a pattern query: variable name → term.
pub type Bindings = BTreeMap<String, Term>;

/// A statement. When any slot is a `Term::Variable` it is a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self { subject, predicate, object }
    }

    /// `(subject, rdf:type, class)`
    pub fn typed(subject: Term, class: impl Into<String>) -> Self {
        Self::new(subject, Term::iri(vocab::RDF_TYPE), Term::iri(class))
    }

    pub fn is_pattern(&self) -> bool {
        self.terms().iter().any(|t| t.is_variable())
    }

    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Replace variables bound in `bindings` by their values.
    pub fn substitute(&self, bindings: &Bindings) -> Triple {
        let sub = |t: &Term| match t {
            Term::Variable(v) => bindings.get(v).cloned().unwrap_or_else(|| t.clone()),
            _ => t.clone(),
        };
        Triple::new(sub(&self.subject), sub(&self.predicate), sub(&self.object))
    }

    /// Does `concrete` match this pattern under `bindings`? On success the
    /// extended bindings are returned.
    pub fn unify(&self, concrete: &Triple, bindings: &Bindings) -> Option<Bindings> {
        let mut out = bindings.clone();
        for (pat, val) in self.terms().into_iter().zip(concrete.terms()) {
            match pat {
                Term::Variable(v) => match out.get(v) {
                    Some(bound) if bound != val => return None,
                    Some(_) => {}
                    None => {
                        out.insert(v.clone(), val.clone());
                    }
                },
                _ if pat != val => return None,
                _ => {}
            }
        }
        Some(out)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
