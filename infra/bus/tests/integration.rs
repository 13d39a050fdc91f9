use pim_bus::*;
use pim_domain::object::{Object, PropertyMap};
use pim_domain::value::Value;
use std::collections::BTreeMap;

fn changed(prop: &str, value: impl Into<Value>) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert(prop.to_owned(), value.into());
    map
}

#[tokio::test]
async fn test_emitted_signals_reach_subscribers_and_own_matches() {
    let bus = LocalBus::new(":1.1");
    bus.add_object_manager("/inv");
    let mut inbound = bus.inbound().unwrap();
    let mut signals = bus.subscribe_signals();
    let mut messages = bus.subscribe_messages();

    let id = bus.add_match(MatchRule::properties_changed("/inv/a", "x.y.Z")).unwrap();
    let signal = Signal::PropertiesChanged {
        path: "/inv/a".to_owned(),
        interface: "x.y.Z".to_owned(),
        changed: changed("P", 1i32),
    };
    bus.emit(signal.clone()).unwrap();

    assert_eq!(*signals.recv().await.unwrap(), signal);
    let message = messages.recv().await.unwrap();
    assert_eq!(message.sender, ":1.1");

    match inbound.recv().await.unwrap() {
        Inbound::Signal { matched, message } => {
            assert_eq!(matched, id);
            assert_eq!(message.path, "/inv/a");
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_object_signals_use_nearest_object_manager() {
    let bus = LocalBus::new(":1.1");
    bus.add_object_manager("/");
    bus.add_object_manager("/inv");
    let mut messages = bus.subscribe_messages();

    bus.emit(Signal::ObjectAdded { path: "/inv/a".to_owned(), interfaces: Object::new() }).unwrap();
    let message = messages.recv().await.unwrap();
    assert_eq!(message.path, "/inv");
    assert_eq!(message.member, names::INTERFACES_ADDED);

    bus.emit(Signal::ObjectRemoved { path: "/other".to_owned(), interfaces: vec![] }).unwrap();
    assert_eq!(messages.recv().await.unwrap().path, "/");
}

#[tokio::test]
async fn test_published_signals_only_hit_matching_rules() {
    let bus = LocalBus::new(":1.1");
    let mut inbound = bus.inbound().unwrap();
    bus.add_match("type='signal',path_namespace='/inv'".parse().unwrap()).unwrap();
    let removed = bus.add_match(MatchRule::new().with_sender(":1.5")).unwrap();
    assert!(bus.remove_match(removed));

    let hits = bus.publish(Message::properties_changed(":1.5", "/elsewhere", "i", PropertyMap::new()));
    assert_eq!(hits, 0);
    let hits = bus.publish(Message::properties_changed(":1.5", "/inv/x", "i", PropertyMap::new()));
    assert_eq!(hits, 1);

    assert!(matches!(inbound.recv().await, Some(Inbound::Signal { .. })));
    assert!(inbound.try_recv().is_err());
}

#[test]
fn test_calls_route_to_peers() {
    let bus = LocalBus::new(":1.1");
    bus.register_peer(names::MAPPER_SERVICE, |call: &MethodCall| -> Result<Reply, BusError> {
        let mut owners = BTreeMap::new();
        owners.insert("svc.A".to_owned(), vec![call.str_arg(0).unwrap_or_default().to_owned()]);
        Ok(Reply::with(Arg::Owners(owners)))
    });

    let reply = bus.call(MethodCall::get_object("/inv/a", "x.y.Z")).unwrap();
    assert_eq!(reply.owners().unwrap()["svc.A"], vec!["/inv/a".to_owned()]);

    let err = bus.call(MethodCall::new("svc.Missing", "/", "i", "M")).unwrap_err();
    assert_eq!(err.kind(), "UnknownService");
}

#[test]
fn test_blocking_call_to_self_is_refused() {
    let bus = LocalBus::new(":1.1");
    bus.request_name("svc.Me").unwrap();
    assert!(bus.owns_name("svc.Me"));
    assert!(bus.owns_name(":1.1"));

    let err = bus.call(MethodCall::new("svc.Me", "/", "i", "M")).unwrap_err();
    assert_eq!(err.kind(), "RemoteCall");
}

#[test]
fn test_name_owned_by_peer_cannot_be_requested() {
    let bus = LocalBus::new(":1.1");
    bus.register_peer("svc.Taken", |_: &MethodCall| -> Result<Reply, BusError> { Ok(Reply::empty()) });
    assert_eq!(bus.request_name("svc.Taken").unwrap_err().kind(), "NameTaken");
}

#[tokio::test]
async fn test_calls_to_own_name_are_queued_inbound() {
    let bus = LocalBus::new(":1.1");
    bus.request_name("svc.Me").unwrap();
    let mut inbound = bus.inbound().unwrap();

    let pending = bus.send_call(MethodCall::new("svc.Me", "/", "i", "Ping").arg("hello"));
    match inbound.recv().await.unwrap() {
        Inbound::Call { call, reply } => {
            assert_eq!(call.member, "Ping");
            reply.send(Ok(Reply::with(Value::from("pong")))).unwrap();
        },
        other => panic!("unexpected {other:?}"),
    }

    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.first_value(), Some(&Value::from("pong")));
}

#[tokio::test]
async fn test_shutdown_is_delivered_once_and_closes_the_connection() {
    let bus = LocalBus::new(":1.1");
    let mut inbound = bus.inbound().unwrap();
    assert_eq!(bus.inbound().unwrap_err().kind(), "ChannelClosed");

    bus.shutdown();
    bus.shutdown();
    assert!(matches!(inbound.recv().await, Some(Inbound::Shutdown)));
    assert!(inbound.try_recv().is_err());

    assert!(bus.add_match(MatchRule::new()).is_err());
    assert!(bus.emit(Signal::ObjectRemoved { path: "/a".to_owned(), interfaces: vec![] }).is_err());
}
