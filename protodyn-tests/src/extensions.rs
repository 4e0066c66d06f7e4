use bytes::Bytes;
use protodyn::{DynamicBuilder, DynamicMessage, ExtensionRegistry, Value};

use crate::{test_pool, test_registry};

#[test]
fn registry_rejects_invalid_registrations() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();

    let mut registry = ExtensionRegistry::new();
    registry
        .register(outer.get_field_by_name("plain").unwrap())
        .unwrap_err();

    let ext = outer.get_extension(100).unwrap();
    registry.register(ext.clone()).unwrap();
    registry.register(ext).unwrap_err();
}

#[test]
fn registry_lookup() {
    let registry = test_registry();
    assert!(registry.find("test2.Outer", 100).is_some());
    assert!(registry.find("test2.Outer", 103).is_none());
    assert!(registry.find("test2.Inner", 100).is_none());
}

#[test]
fn extensions_round_trip_through_the_registry() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let inner_desc = test_pool().get_message_by_name("test2.Inner").unwrap();
    let ext_string = outer.get_extension(100).unwrap();
    let ext_inner = outer.get_extension(101).unwrap();
    let ext_rep = outer.get_extension(102).unwrap();

    let mut inner = DynamicBuilder::new(inner_desc);
    inner.set_field_by_name("id", Value::I32(6)).unwrap();
    let inner = inner.build().unwrap();

    let mut builder = DynamicBuilder::new(outer.clone());
    builder.set_field_by_name("plain", Value::I32(1)).unwrap();
    builder
        .set_field(&ext_string, Value::String("ext".to_owned()))
        .unwrap();
    builder
        .set_field(&ext_inner, Value::Message(inner))
        .unwrap();
    builder.add_repeated(&ext_rep, Value::I32(3)).unwrap();
    builder.add_repeated(&ext_rep, Value::I32(4)).unwrap();
    let message = builder.build().unwrap();

    let encoded = message.encode_to_vec();
    assert_eq!(message.encoded_len(), encoded.len());

    let parsed =
        DynamicMessage::parse_with_extensions(outer.clone(), &encoded, test_registry()).unwrap();
    assert_eq!(parsed, message);
    assert_eq!(
        parsed.get_field(&ext_string).unwrap().as_ref(),
        &Value::String("ext".to_owned())
    );
    assert_eq!(parsed.repeated_len(&ext_rep).unwrap(), 2);

    // Without a registry every extension lands in the unknown field set and
    // still re-serializes to the same bytes.
    let unresolved = DynamicMessage::parse(outer, &encoded).unwrap();
    let unknown = unresolved.unknown_fields();
    assert_eq!(
        unknown.get(100).unwrap().length_delimited(),
        [Bytes::from_static(b"ext")]
    );
    assert!(unknown.get(101).is_some());
    assert_eq!(unknown.get(102).unwrap().varints(), [3, 4]);
    assert_eq!(unresolved.encode_to_vec(), encoded);
}

#[test]
fn extension_numbers_outside_the_declared_ranges_stay_unknown() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();

    // Field 999 is outside Outer's 100..200 extension range, so even a
    // registry hit could not claim it; it is preserved as unknown.
    let bytes = b"\xb8\x3e\x11";
    let message = DynamicMessage::parse_with_extensions(outer, bytes, test_registry()).unwrap();
    assert_eq!(message.unknown_fields().get(999).unwrap().varints(), [17]);
    assert_eq!(message.encode_to_vec(), bytes);
}

#[test]
fn mismatched_wire_types_are_preserved_not_rejected() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let plain = outer.get_field_by_name("plain").unwrap();

    // Field 3 is declared int32 (varint) but arrives as fixed32.
    let bytes = b"\x1d\x2a\x00\x00\x00";
    let message = DynamicMessage::parse(outer, bytes).unwrap();

    assert!(!message.has_field(&plain).unwrap());
    assert_eq!(message.unknown_fields().get(3).unwrap().fixed32s(), [42]);
    assert_eq!(message.encode_to_vec(), bytes);
}
