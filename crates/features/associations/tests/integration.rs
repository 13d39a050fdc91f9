use pim_associations::*;
use pim_bus::{LocalBus, Signal};
use pim_domain::object::{Object, PropertyMap};
use pim_domain::status::EmissionPolicy;
use pim_domain::value::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;

const ROOT: &str = "/inv";

const RULES: &str = r#"[
    {"path": "system/chassis", "endpoints": [
        {"types": {"fType": "inventory", "rType": "chassis"}, "paths": ["system/a", "system/b"]},
        {"types": {"fType": "sensors", "rType": "chassis"}, "paths": ["/system/c"]}
    ]}
]"#;

fn gate(values: &str) -> String {
    format!(
        r#"{{"condition": {{"path": "x", "interface": "I", "property": "P", "values": {values}}},
            "associations": {RULES}}}"#
    )
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn object(iface: &str, prop: &str, value: Value) -> Object {
    let mut props = PropertyMap::new();
    props.insert(prop.to_owned(), value);
    let mut object = Object::new();
    object.insert(iface.to_owned(), props);
    object
}

fn load(dir: &TempDir, bus: &LocalBus) -> AssociationManager {
    AssociationManager::builder()
        .root(ROOT)
        .file(dir.path().join("associations.json"))
        .load(Arc::new(bus.clone()))
}

#[test]
fn test_default_rules_load_without_gates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    let bus = LocalBus::default();

    let manager = load(&dir, &bus);
    assert!(!manager.pending_condition());
    assert_eq!(manager.rules()["/inv/system/chassis"].len(), 2);
}

#[test]
fn test_missing_or_malformed_default_file_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    assert!(load(&dir, &bus).rules().is_empty());

    write(dir.path(), "associations.json", "[{\"path\": \"\"}]");
    assert!(load(&dir, &bus).rules().is_empty());
}

#[test]
fn test_creation_happens_at_most_once() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    let bus = LocalBus::default();
    let mut manager = load(&dir, &bus);

    for _ in 0..3 {
        manager.create_associations("/inv/system/chassis", EmissionPolicy::Suppressed);
    }

    let tuples = manager.instance("/inv/system/chassis").unwrap();
    assert_eq!(
        tuples,
        [
            ("inventory".to_owned(), "chassis".to_owned(), "/inv/system/a".to_owned()),
            ("inventory".to_owned(), "chassis".to_owned(), "/inv/system/b".to_owned()),
            ("sensors".to_owned(), "chassis".to_owned(), "/inv/system/c".to_owned()),
        ]
    );

    manager.create_associations("/inv/unknown", EmissionPolicy::Immediate);
    assert!(manager.instance("/inv/unknown").is_none());
}

#[test]
fn test_signals_follow_the_policy() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = load(&dir, &bus);

    manager.create_associations("/inv/system/chassis", EmissionPolicy::Immediate);

    let first = signals.try_recv().unwrap();
    let Signal::InterfacesAdded { path, interfaces } = &*first else {
        panic!("unexpected {first:?}");
    };
    assert_eq!(path, "/inv/system/chassis");
    assert!(interfaces.contains_key(ASSOCIATION_INTERFACE));

    for expected_len in [2, 3] {
        let next = signals.try_recv().unwrap();
        let Signal::PropertiesChanged { changed, .. } = &*next else {
            panic!("unexpected {next:?}");
        };
        let Some(Value::Associations(list)) = changed.get(ASSOCIATIONS_PROPERTY) else {
            panic!("missing associations");
        };
        assert_eq!(list.len(), expected_len);
    }
    assert!(matches!(signals.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_suppressed_creation_is_silent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = load(&dir, &bus);

    manager.create_associations("/inv/system/chassis", EmissionPolicy::Deferred);
    assert!(matches!(signals.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_gate_activates_once_on_observed_value() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", "[]");
    write(dir.path(), "gate.json", &gate("[1, 2]"));
    let bus = LocalBus::default();
    let mut manager = load(&dir, &bus);

    assert!(manager.pending_condition());
    assert!(manager.rules().is_empty());

    assert!(!manager.condition_match("/inv/y", &object("I", "P", Value::Int64(1))));
    assert!(!manager.condition_match("/inv/x", &object("I", "P", Value::Int64(5))));
    assert!(!manager.condition_match("/inv/x", &object("J", "P", Value::Int64(1))));

    assert!(manager.condition_match("/inv/x", &object("I", "P", Value::Int32(1))));
    assert!(!manager.pending_condition());
    assert_eq!(manager.rules().len(), 1);

    assert!(!manager.condition_match("/inv/x", &object("I", "P", Value::Int64(3))));
    assert_eq!(manager.rules().len(), 1);
}

#[test]
fn test_first_satisfied_gate_wins() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_gate.json", &gate("[\"on\"]"));
    write(
        dir.path(),
        "b_gate.json",
        r#"{"condition": {"path": "x", "interface": "I", "property": "P", "values": ["on"]},
            "associations": []}"#,
    );
    let bus = LocalBus::default();
    let mut manager = load(&dir, &bus);
    assert_eq!(manager.conditions().len(), 2);

    assert!(manager.condition_match("/inv/x", &object("I", "P", Value::from("on"))));
    assert!(manager.conditions().is_empty());
    assert_eq!(manager.rules().len(), 1);
}

#[test]
fn test_actual_values_recorded_at_restore_activate_the_gate() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "gate.json", &gate("[[1, 2], true]"));
    let bus = LocalBus::default();
    let mut manager = load(&dir, &bus);

    assert!(!manager.condition_match_actual());
    manager.conditions_mut()[0].actual_value = Some(Value::Bytes(vec![1, 2]));
    assert!(manager.condition_match_actual());
    assert!(manager.rules().contains_key("/inv/system/chassis"));
}

#[test]
fn test_malformed_gate_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    write(dir.path(), "bad.json", r#"{"condition": {"path": "x", "values": [1]}}"#);
    write(dir.path(), "notes.txt", "ignored");
    let bus = LocalBus::default();

    let manager = load(&dir, &bus);
    assert!(!manager.pending_condition());
    assert_eq!(manager.rules().len(), 1);
}

#[test]
fn test_remove_keeps_path_handled() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "associations.json", RULES);
    let bus = LocalBus::default();
    let mut manager = load(&dir, &bus);

    manager.create_associations("/inv/system/chassis", EmissionPolicy::Suppressed);
    assert!(manager.remove("/inv/system/chassis"));
    assert!(!manager.remove("/inv/system/chassis"));

    manager.create_associations("/inv/system/chassis", EmissionPolicy::Suppressed);
    assert!(manager.instance("/inv/system/chassis").is_none());
    assert_eq!(manager.instances().count(), 0);
}
