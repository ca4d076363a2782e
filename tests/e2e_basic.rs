//! End-to-end tests for the save → load cycle.
//!
//! Each test declares its types, builds entities in one session, saves them
//! into a `MemoryStore`, and reads them back through a fresh session.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use rdf_mapper::identity::derive_identifier;
use rdf_mapper::model::vocab;
use rdf_mapper::{
    ClassSpec, Configuration, HashMethod, MemoryStore, NewEntity, Registry, Resolved, Session, Term, Triple,
    TripleStore,
};
use serde_json::json;

const NS: &str = "http://example.org/";

fn iri(s: &str) -> Term {
    Term::iri(format!("{NS}{s}"))
}

// ============================================================================
// Helper: Part and Widget(hasPart: Part*, name)
// ============================================================================

fn registry() -> Registry {
    let conf = Configuration::with([("rdf.namespace", NS)]);
    let mut reg = Registry::new(&conf).unwrap();
    reg.declare(ClassSpec::new("Part")).unwrap();
    reg.declare(
        ClassSpec::new("Widget")
            .object_property("hasPart", Some("Part"), true)
            .datatype_property("name", false),
    )
    .unwrap();
    reg
}

// ============================================================================
// 1. The widget scenario
// ============================================================================

#[test]
fn test_widget_scenario() {
    let reg = registry();
    let store = MemoryStore::new();
    let mut session = Session::new(&reg, &store);

    let p1 = session.create(NewEntity::new("Part").key("P1")).unwrap();
    let p2 = session.create(NewEntity::new("Part").key("P2")).unwrap();
    let w = session.create(NewEntity::new("Widget")).unwrap();
    session.set(w, "hasPart", p1).unwrap();
    session.set(w, "hasPart", p2).unwrap();

    let saved = session.save(w).unwrap();

    let w_id = Term::iri(derive_identifier(
        &format!("{NS}Widget/"),
        &json!(["hasPart", format!("{NS}Part/P1{NS}Part/P2")]),
        HashMethod::Sha224,
    ));
    let has_part = iri("Widget/hasPart");
    let ty = Term::iri(vocab::RDF_TYPE);
    assert_eq!(
        saved,
        vec![
            Triple::new(w_id.clone(), ty.clone(), iri("Widget")),
            Triple::new(w_id.clone(), has_part.clone(), iri("Part/P1")),
            Triple::new(iri("Part/P1"), ty.clone(), iri("Part")),
            Triple::new(w_id.clone(), has_part, iri("Part/P2")),
            Triple::new(iri("Part/P2"), ty, iri("Part")),
        ]
    );
    assert_eq!(session.identifier(w, false).unwrap(), w_id);

    // Reconstruct Widget(identifier=W) elsewhere and load it
    let mut reader = Session::new(&reg, &store);
    let w_iri = w_id.as_iri().unwrap().to_string();
    let again = reader
        .create(NewEntity::new("Widget").identity(rdf_mapper::Identity::explicit(w_iri)))
        .unwrap();
    let loaded = reader.load(again).unwrap();
    assert_eq!(loaded, vec![again]);
    assert_eq!(
        reader.get(loaded[0], "hasPart").unwrap(),
        Resolved::Many(BTreeSet::from([iri("Part/P1"), iri("Part/P2")]))
    );
}

// ============================================================================
// 2. Round trip by concrete identifier
// ============================================================================

#[test]
fn test_round_trip_preserves_type_and_values() {
    let reg = registry();
    let store = MemoryStore::new();
    let mut writer = Session::new(&reg, &store);
    let parts: Vec<_> = ["P3", "P1", "P2"]
        .iter()
        .map(|k| writer.create(NewEntity::new("Part").key(*k)).unwrap())
        .collect();
    let mut spec = NewEntity::new("Widget").key("gearbox").with("name", "Gearbox");
    for p in &parts {
        spec = spec.with("hasPart", *p);
    }
    let w = writer.create(spec).unwrap();
    writer.save(w).unwrap();

    let mut reader = Session::new(&reg, &store);
    let shell = reader.create(NewEntity::new("Widget").key("gearbox")).unwrap();
    let back = reader.load(shell).unwrap()[0];

    assert_eq!(reader.graph().class_of(back).unwrap().name, "Widget");
    assert_eq!(reader.one(back, "name").unwrap(), Some(Term::Literal("Gearbox".into())));
    let expected: BTreeSet<Term> = ["P1", "P2", "P3"].iter().map(|k| iri(&format!("Part/{k}"))).collect();
    assert_eq!(reader.get(back, "hasPart").unwrap().into_set(), expected);

    let objects = reader.get_objects(back, "hasPart").unwrap();
    assert_eq!(objects.len(), 3);
    assert!(objects.iter().all(|o| reader.graph().class_of(*o).unwrap().name == "Part"));
}

// ============================================================================
// 3. Loading by shape
// ============================================================================

#[test]
fn test_load_unidentified_by_shape() {
    let reg = registry();
    let store = MemoryStore::new();
    let mut writer = Session::new(&reg, &store);
    for (key, name) in [("a", "alpha"), ("b", "beta"), ("c", "alpha")] {
        let w = writer.create(NewEntity::new("Widget").key(key).with("name", name)).unwrap();
        writer.save(w).unwrap();
    }

    let mut reader = Session::new(&reg, &store);
    let shape = reader.create(NewEntity::new("Widget").with("name", "alpha")).unwrap();

    let ids = |s: &Session<'_, MemoryStore>, nodes: Vec<rdf_mapper::NodeId>| -> Vec<Term> {
        nodes.into_iter().map(|n| s.identifier(n, false).unwrap()).collect()
    };
    let loaded = reader.load(shape).unwrap();
    assert_eq!(ids(&reader, loaded), vec![iri("Widget/a"), iri("Widget/c")]);
    let resolved = reader.resolve(shape).unwrap();
    assert_eq!(ids(&reader, resolved), vec![iri("Widget/a"), iri("Widget/c")]);

    // an unconstrained shape matches every widget
    let any = reader.create(NewEntity::new("Widget")).unwrap();
    assert_eq!(reader.load(any).unwrap().len(), 3);
}

// ============================================================================
// 4. Query form through an unresolved owner
// ============================================================================

#[test]
fn test_get_through_unresolved_owner() {
    let reg = registry();
    let store = MemoryStore::new();
    let mut writer = Session::new(&reg, &store);
    let p1 = writer.create(NewEntity::new("Part").key("P1")).unwrap();
    let p2 = writer.create(NewEntity::new("Part").key("P2")).unwrap();
    let p3 = writer.create(NewEntity::new("Part").key("P3")).unwrap();
    let a = writer.create(NewEntity::new("Widget").key("a").with("name", "alpha").with("hasPart", p1)).unwrap();
    let b = writer.create(NewEntity::new("Widget").key("b").with("name", "beta").with("hasPart", p2)).unwrap();
    writer.set(b, "hasPart", p3).unwrap();
    writer.save(a).unwrap();
    writer.save(b).unwrap();

    // parts of whichever widget is named "beta"
    let mut reader = Session::new(&reg, &store);
    let beta = reader.create(NewEntity::new("Widget").with("name", "beta")).unwrap();
    assert_eq!(
        reader.get(beta, "hasPart").unwrap().into_set(),
        BTreeSet::from([iri("Part/P2"), iri("Part/P3")])
    );
}

// ============================================================================
// 5. Configuration file and schema wiring
// ============================================================================

#[test]
fn test_registry_from_config_file() {
    let dir = std::env::temp_dir().join(format!("rdf-mapper-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("conf.json");
    std::fs::write(
        &path,
        r#"{"rdf.namespace": "http://example.org/", "identifier.hash": "sha256", "rdf.source": "BASE/data.nt"}"#,
    )
    .unwrap();

    let conf = Configuration::open(&path).unwrap();
    assert_eq!(conf.get_str("rdf.source").unwrap(), dir.join("data.nt").to_string_lossy());
    let reg = Registry::new(&conf).unwrap();
    assert_eq!(reg.hash_method(), HashMethod::Sha256);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_wiring_writes_schema() {
    let reg = registry();
    let store = MemoryStore::new();
    let mut session = Session::new(&reg, &store);
    session.wire_all().unwrap();
    let domain = Term::iri(reg.domain_predicate());
    let statements = store.lookup(None, Some(&domain), None).unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(session.namespaces().namespace("Widget"), Some("http://example.org/Widget/"));

    let w = session
        .create(NewEntity::new("Widget").identity(rdf_mapper::Identity::Variable("w".into())).with("name", "x"))
        .unwrap();
    assert_eq!(
        session.graph_pattern(w, true).unwrap(),
        "?w rdf:type <http://example.org/Widget> .\n?w Widget:name \"x\" ."
    );
}
