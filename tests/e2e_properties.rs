//! Property-based tests: identity determinism, ordering stability, and
//! conjunctive joins.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rdf_mapper::identity::derive_identifier;
use rdf_mapper::model::vocab;
use rdf_mapper::{
    ClassSpec, HashMethod, MemoryStore, NewEntity, Registry, Session, Term, Triple, TripleStore,
};
use serde_json::json;

const NS: &str = "http://example.org/";

fn registry() -> Registry {
    let mut reg = Registry::with_namespace(NS, HashMethod::Sha224);
    reg.declare(ClassSpec::new("Part")).unwrap();
    reg.declare(ClassSpec::new("Marker")).unwrap();
    reg.declare(
        ClassSpec::new("Widget")
            .object_property("hasPart", Some("Part"), true)
            .object_property("tag", Some("Marker"), true),
    )
    .unwrap();
    reg
}

/// Distinct part keys plus a shuffled copy.
fn keys_and_shuffle() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::btree_set("[A-Z][0-9]{1,3}", 1..8).prop_flat_map(|set| {
        let keys: Vec<String> = set.into_iter().collect();
        (Just(keys.clone()), Just(keys).prop_shuffle())
    })
}

fn widget_statements(keys: &[String]) -> Vec<Triple> {
    let reg = registry();
    let store = MemoryStore::new();
    let mut s = Session::new(&reg, &store);
    let w = s.create(NewEntity::new("Widget")).unwrap();
    for k in keys {
        let p = s.create(NewEntity::new("Part").key(k.as_str())).unwrap();
        s.set(w, "hasPart", p).unwrap();
    }
    s.save(w).unwrap()
}

proptest! {
    #[test]
    fn derive_is_deterministic(seed in ".*", other in ".*") {
        let a = derive_identifier(NS, &json!(seed), HashMethod::Sha224);
        prop_assert_eq!(&a, &derive_identifier(NS, &json!(seed), HashMethod::Sha224));
        if seed != other {
            prop_assert_ne!(a, derive_identifier(NS, &json!(other), HashMethod::Sha224));
        }
    }

    #[test]
    fn attach_order_does_not_matter((keys, shuffled) in keys_and_shuffle()) {
        let first = widget_statements(&keys);
        let second = widget_statements(&shuffled);
        // same content key, same statements, same order
        prop_assert_eq!(first, second);
    }

    #[test]
    fn siblings_join_by_intersection(
        left in prop::collection::btree_set(0u8..16, 0..10),
        right in prop::collection::btree_set(0u8..16, 0..10),
    ) {
        let reg = registry();
        let store = MemoryStore::new();
        let mut writer = Session::new(&reg, &store);
        let part = writer.create(NewEntity::new("Part").key("anchor")).unwrap();
        let marker = writer.create(NewEntity::new("Marker").key("anchor")).unwrap();
        for n in 0u8..16 {
            let mut spec = NewEntity::new("Widget").key(format!("w{n}"));
            if left.contains(&n) {
                spec = spec.with("hasPart", part);
            }
            if right.contains(&n) {
                spec = spec.with("tag", marker);
            }
            let w = writer.create(spec).unwrap();
            writer.save(w).unwrap();
        }

        let mut reader = Session::new(&reg, &store);
        let qp = reader.create(NewEntity::new("Part").key("anchor")).unwrap();
        let qm = reader.create(NewEntity::new("Marker").key("anchor")).unwrap();
        let shape = reader.create(NewEntity::new("Widget").with("hasPart", qp).with("tag", qm)).unwrap();
        let found: BTreeSet<Term> = reader
            .resolve(shape)
            .unwrap()
            .into_iter()
            .map(|n| reader.identifier(n, false).unwrap())
            .collect();
        let expected: BTreeSet<Term> = left
            .intersection(&right)
            .map(|n| Term::iri(format!("{NS}Widget/w{n}")))
            .collect();
        prop_assert_eq!(found, expected);
    }
}

#[test]
fn test_every_widget_is_typed_once() {
    let statements = widget_statements(&["A1".to_string(), "B2".to_string()]);
    let ty = Term::iri(vocab::RDF_TYPE);
    let types = statements.iter().filter(|t| t.predicate == ty).count();
    assert_eq!(types, 3);
    let store = MemoryStore::new();
    store.add_statements(&statements).unwrap();
    assert_eq!(store.len().unwrap(), statements.len());
}
