//! Namespace prefix manager.

use std::collections::BTreeMap;

use crate::model::vocab;

/// Prefix → namespace table used to shorten IRIs in rendered patterns.
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    prefixes: BTreeMap<String, String>,
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceManager {
    /// A manager with `rdf`, `rdfs` and `xsd` already bound.
    pub fn new() -> Self {
        let prefixes = vocab::STANDARD_PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect();
        Self { prefixes }
    }

    /// Bind `prefix` to `namespace`, replacing any earlier binding.
    pub fn bind(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// `prefix:local` for the longest bound namespace that `iri` starts with.
    pub fn shorten(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()) && iri.len() > ns.len())
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{prefix}:{}", &iri[ns.len()..]))
    }

    /// Inverse of [`shorten`](Self::shorten).
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        self.namespace(prefix).map(|ns| format!("{ns}{local}"))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_namespace_wins() {
        let mut nm = NamespaceManager::new();
        nm.bind("ex", "http://example.org/");
        nm.bind("Widget", "http://example.org/Widget/");
        assert_eq!(nm.shorten("http://example.org/Widget/w1").as_deref(), Some("Widget:w1"));
        assert_eq!(nm.shorten("http://example.org/Widget").as_deref(), Some("ex:Widget"));
        assert_eq!(nm.shorten(vocab::RDF_TYPE).as_deref(), Some("rdf:type"));
        assert_eq!(nm.shorten("urn:other"), None);
    }

    #[test]
    fn test_expand_round_trip() {
        let nm = NamespaceManager::new();
        assert_eq!(nm.expand("rdfs:subClassOf").as_deref(), Some(vocab::RDFS_SUBCLASS_OF));
        assert_eq!(nm.expand("nope:x"), None);
    }
}
