pub mod fixtures;

use fixtures::*;
use pim_bus::{Arg, Bus, BusError, LocalBus, MethodCall, Reply, Signal, names};
use pim_domain::status::ManagerStatus;
use pim_inventory::{EventTable, InventoryError, ObjectMap, Value};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_notify_scenario_emits_object_added_then_one_property_change() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();
    assert_eq!(manager.status(), ManagerStatus::Running);

    manager.notify(foo());
    let emitted = drain(&mut signals);
    assert_eq!(emitted.len(), 1);
    let Signal::ObjectAdded { path, interfaces } = &emitted[0] else {
        panic!("expected ObjectAdded, got {:?}", emitted[0]);
    };
    assert_eq!(path, "/testroot/foo");
    assert_eq!(interfaces["IfaceA"]["Prop1"], Value::from("x"));
    assert_eq!(interfaces["IfaceB"]["Prop2"], Value::Int64(5));

    let changed = manager.set_property("/foo", "IfaceA", "Prop1", Value::from("y")).unwrap();
    assert!(changed);
    assert_eq!(
        drain(&mut signals),
        [Signal::PropertiesChanged {
            path: "/testroot/foo".to_owned(),
            interface: "IfaceA".to_owned(),
            changed: props(&[("Prop1", Value::from("y"))]),
        }]
    );
}

#[test]
fn test_repeated_create_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();

    manager.create_objects(foo());
    let first = manager.managed_objects();
    assert_eq!(drain(&mut signals).len(), 1);

    manager.create_objects(foo());
    assert_eq!(manager.managed_objects(), first);
    assert!(drain(&mut signals).is_empty());
}

#[test]
fn test_merge_constructs_missing_and_updates_existing_in_name_order() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();

    manager.create_objects(batch(
        "/m",
        object(&[
            ("IfaceA", props(&[("Prop1", Value::from("a"))])),
            ("IfaceC", props(&[("Prop3", Value::Bool(false))])),
        ]),
    ));
    drain(&mut signals);

    manager.create_objects(batch(
        "/m",
        object(&[
            ("IfaceA", props(&[("Prop1", Value::from("a2"))])),
            ("IfaceB", props(&[("Prop2", Value::Int64(2))])),
            ("IfaceC", props(&[("Prop3", Value::Bool(false))])),
            ("IfaceD", props(&[])),
        ]),
    ));

    assert_eq!(interface_names(&manager, "/testroot/m"), ["IfaceA", "IfaceB", "IfaceC", "IfaceD"]);
    assert_eq!(a_value(&manager, "/m").as_deref(), Some("a2"));

    let emitted = drain(&mut signals);
    assert_eq!(emitted.len(), 2);
    assert!(matches!(
        &emitted[0],
        Signal::PropertiesChanged { interface, changed, .. }
            if interface == "IfaceA" && changed["Prop1"] == Value::from("a2")
    ));
    let Signal::InterfacesAdded { path, interfaces } = &emitted[1] else {
        panic!("expected InterfacesAdded, got {:?}", emitted[1]);
    };
    assert_eq!(path, "/testroot/m");
    assert_eq!(interfaces.keys().collect::<Vec<_>>(), ["IfaceB", "IfaceD"]);
}

#[test]
fn test_nothing_is_emitted_before_running() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());

    manager.create_objects(foo());
    manager.create_objects(batch("/foo", object(&[("IfaceC", props(&[]))])));
    manager.set_property("/foo", "IfaceA", "Prop1", Value::from("z")).unwrap();
    manager.destroy_objects(&["/foo".to_owned()]);

    assert_eq!(manager.status(), ManagerStatus::Starting);
    assert!(drain(&mut signals).is_empty());
}

#[test]
fn test_bad_interfaces_are_skipped_without_aborting_the_object() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();

    manager.create_objects(batch(
        "/mixed",
        object(&[
            ("IfaceA", props(&[("Prop1", Value::from("ok"))])),
            ("IfaceB", props(&[("Prop2", Value::Int32(5))])),
            ("IfaceC", props(&[("Unknown", Value::Bool(true))])),
            ("Not.Registered", props(&[])),
        ]),
    ));

    assert_eq!(interface_names(&manager, "/testroot/mixed"), ["IfaceA"]);
    let emitted = drain(&mut signals);
    assert!(matches!(
        &emitted[..],
        [Signal::ObjectAdded { interfaces, .. }] if interfaces.len() == 1
    ));
}

#[test]
fn test_failed_assign_leaves_the_interface_untouched() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.create_objects(foo());

    manager.create_objects(batch(
        "/foo",
        object(&[("IfaceA", props(&[("Prop1", Value::from("new")), ("Bogus", Value::Bool(true))]))]),
    ));
    assert_eq!(a_value(&manager, "/foo").as_deref(), Some("x"));

    let err = manager.set_property("/foo", "IfaceB", "Prop2", Value::UInt64(1)).unwrap_err();
    assert!(matches!(err, InventoryError::Interface { .. }));
    assert_eq!(manager.get_property("/foo", "IfaceB", "Prop2").unwrap(), Value::Int64(5));
}

#[test]
fn test_supplied_paths_are_always_nested_below_the_root() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());

    manager.create_objects(batch("/testroot/foo", object(&[("IfaceC", props(&[]))])));
    manager.create_objects(batch("bar", object(&[("IfaceC", props(&[]))])));

    assert_eq!(manager.store().paths().collect::<Vec<_>>(), ["/testroot/bar", "/testroot/testroot/foo"]);
    assert!(manager.interface::<IfaceC>("/testroot/foo").is_ok());
    assert!(manager.interface::<IfaceC>("/foo").is_err());

    manager.destroy_objects(&["/testroot/foo".to_owned()]);
    assert_eq!(manager.store().paths().collect::<Vec<_>>(), ["/testroot/bar"]);
}

#[test]
fn test_restore_keeps_nested_paths_in_place() {
    let dir = TempDir::new().unwrap();
    {
        let bus = LocalBus::default();
        let mut manager = manager(config(dir.path()), &bus, EventTable::default());
        manager.create_objects(batch("/testroot/foo", object(&[("IfaceC", props(&[("Prop3", Value::Bool(true))]))])));
    }
    assert!(dir.path().join("state/testroot/testroot/foo/IfaceC").is_file());

    let bus = LocalBus::default();
    let manager = manager(config(dir.path()), &bus, EventTable::default());
    assert_eq!(manager.store().paths().collect::<Vec<_>>(), ["/testroot/testroot/foo"]);
    assert_eq!(manager.get_property("/testroot/foo", "IfaceC", "Prop3").unwrap(), Value::Bool(true));
}

#[test]
fn test_missing_persistence_root_without_create_starts_empty() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.persistence.create = false;

    let bus = LocalBus::default();
    let mut manager = manager(config, &bus, EventTable::default());
    assert!(manager.store().is_empty());
    assert!(!manager.persistence().is_attached());

    manager.start().unwrap();
    manager.create_objects(foo());
    assert_eq!(a_value(&manager, "/foo").as_deref(), Some("x"));
    assert!(!dir.path().join("state").exists());
}

#[test]
fn test_start_fails_without_running_when_the_name_is_taken() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    bus.register_peer(names::INVENTORY_MANAGER, |_: &MethodCall| -> Result<Reply, BusError> {
        Ok(Reply::empty())
    });
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());

    let err = manager.start().unwrap_err();
    assert!(matches!(err, InventoryError::Bus { .. }), "{err}");
    assert_eq!(manager.status(), ManagerStatus::Starting);
    assert!(!bus.owns_name(names::INVENTORY_MANAGER));

    manager.create_objects(foo());
    assert!(drain(&mut signals).is_empty());
}

#[test]
fn test_empty_objects_are_rejected() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());

    manager.create_objects(batch("/empty", object(&[])));
    assert!(manager.store().is_empty());
}

#[test]
fn test_restore_reproduces_persisted_state_silently() {
    let dir = TempDir::new().unwrap();
    {
        let bus = LocalBus::default();
        let mut manager = manager(config(dir.path()), &bus, EventTable::default());
        manager.create_objects(foo());
        manager.create_objects(batch("/bare", object(&[("IfaceD", props(&[]))])));
        manager.set_property("/foo", "IfaceA", "Prop1", Value::from("persisted")).unwrap();
    }
    assert!(dir.path().join("state/testroot/foo/IfaceA").is_file());
    assert_eq!(fs::read(dir.path().join("state/testroot/bare/IfaceD")).unwrap(), b"");

    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let manager = manager(config(dir.path()), &bus, EventTable::default());

    assert_eq!(a_value(&manager, "/foo").as_deref(), Some("persisted"));
    assert_eq!(manager.get_property("/foo", "IfaceB", "Prop2").unwrap(), Value::Int64(5));
    assert_hosts(&manager, "/testroot/bare", "IfaceD");
    assert!(drain(&mut signals).is_empty());
}

#[test]
fn test_corrupt_persisted_state_is_deleted_and_defaults_kept() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("state/testroot/foo/IfaceB");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, b"{ not json").unwrap();

    let bus = LocalBus::default();
    let manager = manager(config(dir.path()), &bus, EventTable::default());

    assert_eq!(manager.get_property("/foo", "IfaceB", "Prop2").unwrap(), Value::Int64(0));
    assert!(!file.exists());
}

#[test]
fn test_destroy_removes_path_and_its_persisted_state() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();
    manager.create_objects(foo());
    drain(&mut signals);

    manager.destroy_objects(&["foo".to_owned(), "/never".to_owned()]);

    assert!(!manager.store().contains("/testroot/foo"));
    assert!(!dir.path().join("state/testroot/foo/IfaceA").exists());
    assert_eq!(
        drain(&mut signals),
        [Signal::ObjectRemoved {
            path: "/testroot/foo".to_owned(),
            interfaces: vec!["IfaceA".to_owned(), "IfaceB".to_owned()],
        }]
    );
}

#[test]
fn test_typed_access_checks_presence_and_type() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.create_objects(foo());

    assert_eq!(manager.interface::<IfaceB>("/foo").unwrap().prop2, 5);
    assert!(matches!(manager.interface::<IfaceC>("/foo"), Err(InventoryError::NotFound { .. })));
    assert!(matches!(
        manager.interface::<Impostor>("/foo"),
        Err(InventoryError::TypeMismatch { .. })
    ));

    manager.interface_mut::<IfaceB>("/foo").unwrap().prop2 = 6;
    assert_eq!(manager.get_property("/foo", "IfaceB", "Prop2").unwrap(), Value::Int64(6));
}

#[test]
fn test_invoke_persists_and_announces_what_changed() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut signals = bus.subscribe_signals();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    manager.start().unwrap();
    manager.create_objects(foo());
    drain(&mut signals);

    let old = manager
        .invoke::<IfaceB, _>("/foo", |b| std::mem::replace(&mut b.prop2, 42))
        .unwrap();
    assert_eq!(old, 5);
    assert_eq!(
        drain(&mut signals),
        [Signal::PropertiesChanged {
            path: "/testroot/foo".to_owned(),
            interface: "IfaceB".to_owned(),
            changed: props(&[("Prop2", Value::Int64(42))]),
        }]
    );
    let stored = fs::read_to_string(dir.path().join("state/testroot/foo/IfaceB")).unwrap();
    assert!(stored.contains("42"));

    manager.invoke::<IfaceB, _>("/foo", |b| b.prop2).unwrap();
    assert!(drain(&mut signals).is_empty());
    assert!(matches!(
        manager.invoke::<IfaceB, _>("/absent", |_| ()),
        Err(InventoryError::NotFound { .. })
    ));
}

#[test]
fn test_unsupported_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.bus.root = "relative/root".to_owned();
    let result = pim_inventory::Manager::builder()
        .config(config)
        .registry(registry())
        .bus(std::sync::Arc::new(LocalBus::default()))
        .build();
    assert!(matches!(result, Err(InventoryError::Validation { .. })));
}

async fn call(bus: &LocalBus, call: MethodCall) -> Result<Reply, BusError> {
    bus.send_call(call).await.unwrap()
}

#[tokio::test]
async fn test_run_loop_serves_bus_calls_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let bus = LocalBus::default();
    let mut manager = manager(config(dir.path()), &bus, EventTable::default());
    let me = bus.unique_name().to_owned();

    let task = tokio::spawn(async move { manager.run().await.map(|()| manager) });

    let notify = MethodCall::new(&me, ROOT, names::INVENTORY_MANAGER, names::NOTIFY)
        .arg(Arg::Objects(foo()));
    assert_eq!(call(&bus, notify).await.unwrap(), Reply::empty());

    let get = MethodCall::get_property(&me, "/testroot/foo", "IfaceA", "Prop1");
    assert_eq!(call(&bus, get).await.unwrap().first_value(), Some(&Value::from("x")));

    let set = MethodCall::new(&me, "/testroot/foo", names::PROPERTIES, names::SET)
        .arg("IfaceB")
        .arg("Prop2")
        .arg(Value::Int64(9));
    call(&bus, set).await.unwrap();

    let bad = MethodCall::new(&me, "/testroot/foo", names::PROPERTIES, names::SET)
        .arg("IfaceB")
        .arg("Prop2")
        .arg(Value::from("nine"));
    assert!(matches!(call(&bus, bad).await, Err(BusError::InvalidArgs { .. })));

    let missing = MethodCall::new(&me, "/testroot/none", names::PROPERTIES, names::GET_ALL).arg("IfaceA");
    assert!(matches!(call(&bus, missing).await, Err(BusError::UnknownMethod { .. })));

    let outside = MethodCall::get_property(&me, "/foo", "IfaceA", "Prop1");
    assert!(matches!(call(&bus, outside).await, Err(BusError::UnknownMethod { .. })));

    let managed = MethodCall::new(&me, ROOT, names::OBJECT_MANAGER, names::GET_MANAGED_OBJECTS);
    let reply = call(&bus, managed).await.unwrap();
    let Some(Arg::Objects(objects)) = reply.args.first() else {
        panic!("expected an object map, got {reply:?}");
    };
    let expected: ObjectMap = {
        let mut all = ObjectMap::new();
        all.insert(
            "/testroot/foo".to_owned(),
            object(&[
                ("IfaceA", props(&[("Prop1", Value::from("x"))])),
                ("IfaceB", props(&[("Prop2", Value::Int64(9))])),
            ]),
        );
        all
    };
    assert_eq!(objects, &expected);

    bus.shutdown();
    let manager = task.await.unwrap().unwrap();
    assert_eq!(manager.status(), ManagerStatus::Stopping);
    assert!(bus.owns_name(names::INVENTORY_MANAGER));
}
