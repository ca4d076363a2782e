//! Literal values attached through datatype properties.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::vocab;

/// A literal value.
///
/// Covers the scalar types a datatype property can carry:
/// - Bool, Int, Float, String
/// - Temporal: Date, DateTime
///
/// Equality, hashing and ordering are total (floats compare by
/// `total_cmp`), so literals can live in ordered sets and serve as
/// identities of value nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

// ============================================================================
// Type checking
// ============================================================================

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "BOOLEAN",
            Literal::Int(_) => "INTEGER",
            Literal::Float(_) => "FLOAT",
            Literal::String(_) => "STRING",
            Literal::Date(_) => "DATE",
            Literal::DateTime(_) => "DATETIME",
        }
    }

    /// XML Schema datatype IRI for this literal.
    pub fn datatype(&self) -> &'static str {
        match self {
            Literal::Bool(_) => vocab::XSD_BOOLEAN,
            Literal::Int(_) => vocab::XSD_INTEGER,
            Literal::Float(_) => vocab::XSD_DOUBLE,
            Literal::String(_) => vocab::XSD_STRING,
            Literal::Date(_) => vocab::XSD_DATE,
            Literal::DateTime(_) => vocab::XSD_DATETIME,
        }
    }

    /// Canonical textual form. This is the literal's identity.
    pub fn lexical(&self) -> String {
        match self {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::String(s) => s.clone(),
            Literal::Date(d) => d.format("%Y-%m-%d").to_string(),
            Literal::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    /// N3/Turtle rendering, as used in basic graph patterns.
    pub fn n3(&self) -> String {
        match self {
            Literal::String(s) => format!("\"{}\"", escape(s)),
            Literal::Int(i) => i.to_string(),
            Literal::Bool(b) => b.to_string(),
            other => format!("\"{}\"^^<{}>", other.lexical(), other.datatype()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Literal::Bool(_) => 0,
            Literal::Int(_) => 1,
            Literal::Float(_) => 2,
            Literal::String(_) => 3,
            Literal::Date(_) => 4,
            Literal::DateTime(_) => 5,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Literal { fn from(v: bool) -> Self { Literal::Bool(v) } }
impl From<i32> for Literal { fn from(v: i32) -> Self { Literal::Int(v as i64) } }
impl From<i64> for Literal { fn from(v: i64) -> Self { Literal::Int(v) } }
impl From<f64> for Literal { fn from(v: f64) -> Self { Literal::Float(v) } }
impl From<String> for Literal { fn from(v: String) -> Self { Literal::String(v) } }
impl From<&str> for Literal { fn from(v: &str) -> Self { Literal::String(v.to_owned()) } }
impl From<NaiveDate> for Literal { fn from(v: NaiveDate) -> Self { Literal::Date(v) } }
impl From<DateTime<Utc>> for Literal { fn from(v: DateTime<Utc>) -> Self { Literal::DateTime(v) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", escape(s)),
            other => write!(f, "{}", other.lexical()),
        }
    }
}

// ============================================================================
// Total equality / ordering
// ============================================================================

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Literal::Bool(b) => b.hash(state),
            Literal::Int(i) => i.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
            Literal::String(s) => s.hash(state),
            Literal::Date(d) => d.hash(state),
            Literal::DateTime(dt) => dt.hash(state),
        }
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Literal::Bool(a), Literal::Bool(b)) => a.cmp(b),
            (Literal::Int(a), Literal::Int(b)) => a.cmp(b),
            (Literal::Float(a), Literal::Float(b)) => a.total_cmp(b),
            (Literal::String(a), Literal::String(b)) => a.cmp(b),
            (Literal::Date(a), Literal::Date(b)) => a.cmp(b),
            (Literal::DateTime(a), Literal::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_from() {
        assert_eq!(Literal::from("hello"), Literal::String("hello".into()));
        assert_eq!(Literal::from(42), Literal::Int(42));
        assert_eq!(Literal::from(3.5), Literal::Float(3.5));
        assert_eq!(Literal::from(true), Literal::Bool(true));
    }

    #[test]
    fn test_float_total_order() {
        assert_eq!(Literal::Float(f64::NAN), Literal::Float(f64::NAN));
        assert!(Literal::Float(1.0) < Literal::Float(1.5));
    }

    #[test]
    fn test_mixed_kinds_order_by_rank() {
        assert!(Literal::Int(100) < Literal::String("a".into()));
        assert_ne!(Literal::Int(1), Literal::Float(1.0));
    }

    #[test]
    fn test_n3_rendering() {
        assert_eq!(Literal::from("say \"hi\"").n3(), "\"say \\\"hi\\\"\"");
        assert_eq!(Literal::Int(7).n3(), "7");
        let d = NaiveDate::from_ymd_opt(2014, 3, 1).unwrap();
        assert_eq!(
            Literal::Date(d).n3(),
            "\"2014-03-01\"^^<http://www.w3.org/2001/XMLSchema#date>"
        );
    }
}
