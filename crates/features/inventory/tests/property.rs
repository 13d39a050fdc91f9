pub mod fixtures;

use fixtures::AllTypes;
use pim_inventory::{Interface, Maker, PropertyMap, Value};
use proptest::prelude::*;

fn all_types() -> impl Strategy<Value = PropertyMap> {
    (
        any::<bool>(),
        any::<i32>(),
        any::<i64>(),
        any::<u32>(),
        any::<u64>(),
        ".*",
        proptest::collection::vec(any::<u8>(), 0..64),
        proptest::collection::vec(".*", 0..4),
        proptest::collection::vec(("[a-z]*", "[a-z]*", "/[a-z/]*"), 0..3),
    )
        .prop_map(|(flag, small, big, count, total, text, raw, names, links)| {
            [
                ("Flag", Value::Bool(flag)),
                ("Small", Value::Int32(small)),
                ("Big", Value::Int64(big)),
                ("Count", Value::UInt32(count)),
                ("Total", Value::UInt64(total)),
                ("Text", Value::String(text)),
                ("Raw", Value::Bytes(raw)),
                ("Names", Value::Strings(names)),
                ("Links", Value::Associations(links)),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect()
        })
}

proptest! {
    #[test]
    fn persisted_form_restores_every_property_type(properties in all_types()) {
        let maker = Maker::of::<AllTypes>();
        let original = maker.construct(&properties).unwrap();
        let data = maker.serialize(original.as_ref()).unwrap();

        let mut restored = maker.construct(&PropertyMap::new()).unwrap();
        maker.deserialize(&data, restored.as_mut()).unwrap();

        prop_assert_eq!(restored.properties(), properties);
    }
}

#[test]
fn empty_sequences_survive_persistence() {
    let maker = Maker::of::<AllTypes>();
    let mut properties = PropertyMap::new();
    properties.insert("Raw".to_owned(), Value::Bytes(Vec::new()));
    properties.insert("Names".to_owned(), Value::Strings(Vec::new()));
    properties.insert("Text".to_owned(), Value::String(String::new()));

    let original = maker.construct(&properties).unwrap();
    let data = maker.serialize(original.as_ref()).unwrap();
    let mut restored = maker.construct(&PropertyMap::new()).unwrap();
    restored.set_property("Raw", Value::Bytes(vec![1])).unwrap();
    maker.deserialize(&data, restored.as_mut()).unwrap();

    assert_eq!(restored.property("Raw"), Some(Value::Bytes(Vec::new())));
    assert_eq!(restored.property("Names"), Some(Value::Strings(Vec::new())));
}
