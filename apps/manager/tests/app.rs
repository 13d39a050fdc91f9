use pim_bus::{Arg, Bus, LocalBus, MethodCall, Reply, names};
use pim_inventory::{Object, ObjectMap, PropertyMap, Value};
use pim_kernel::domain::config::ManagerConfig;
use pim_manager::App;
use std::path::Path;
use tempfile::TempDir;

const ITEM: &str = "xyz.openbmc_project.Inventory.Item";
const DIMM: &str = "/system/chassis/motherboard/dimm0";

fn config(dir: &Path) -> ManagerConfig {
    let mut config = ManagerConfig::default();
    config.persistence.path = dir.join("state");
    config.associations.enabled = false;
    config
}

fn dimm() -> ObjectMap {
    let mut props = PropertyMap::new();
    props.insert("PrettyName".to_owned(), Value::from("DIMM 0"));
    props.insert("Present".to_owned(), Value::Bool(true));
    let mut object = Object::new();
    object.insert(ITEM.to_owned(), props);
    let mut objects = ObjectMap::new();
    objects.insert(DIMM.to_owned(), object);
    objects
}

#[tokio::test]
async fn test_notified_inventory_survives_a_restart() {
    let dir = TempDir::new().unwrap();

    let bus = LocalBus::new(":1.42");
    let app = App::builder().config(config(dir.path())).bus(bus.clone()).build().unwrap();
    let root = app.manager().root().to_owned();
    let server = tokio::spawn(app.run());

    let notify = MethodCall::new(bus.unique_name(), &root, names::INVENTORY_MANAGER, names::NOTIFY)
        .arg(Arg::Objects(dimm()));
    let reply = bus.send_call(notify).await.unwrap().unwrap();
    assert_eq!(reply, Reply::empty());
    assert!(bus.owns_name(names::INVENTORY_MANAGER));

    bus.shutdown();
    server.await.unwrap().unwrap();

    let app = App::builder().config(config(dir.path())).build().unwrap();
    assert!(app.manager().store().contains(&format!("{root}{DIMM}")));
    assert_eq!(app.manager().get_property(DIMM, ITEM, "PrettyName").unwrap(), Value::from("DIMM 0"));
    assert_eq!(app.manager().get_property(DIMM, ITEM, "Present").unwrap(), Value::Bool(true));
}

#[test]
fn test_relative_root_is_rejected_at_build() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.bus.root = "relative/root".to_owned();

    let err = App::builder().config(config).build().unwrap_err();
    assert!(err.to_string().contains("inventory manager"), "{err}");
}
