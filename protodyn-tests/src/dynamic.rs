use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use bytes::Bytes;
use protodyn::{DynamicBuilder, DynamicMessage, Value};

use crate::test_pool;

fn hash_of(message: &DynamicMessage) -> u64 {
    let mut hasher = DefaultHasher::new();
    message.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn default_semantics() {
    let desc = test_pool().get_message_by_name("test2.Outer").unwrap();
    let message = DynamicMessage::default_instance(desc.clone());

    let plain = desc.get_field_by_name("plain").unwrap();
    assert_eq!(message.get_field(&plain).unwrap().as_ref(), &Value::I32(0));
    assert!(!message.has_field(&plain).unwrap());

    let inner = desc.get_field_by_name("inner").unwrap();
    assert_eq!(message.get_field(&inner), None);
    assert!(!message.has_field(&inner).unwrap());

    let items = desc.get_field_by_name("items").unwrap();
    assert_eq!(
        message.get_field(&items).unwrap().as_ref(),
        &Value::List(Vec::new())
    );
    assert_eq!(message.repeated_len(&items).unwrap(), 0);

    let enum_value = desc.get_field_by_name("enum_value").unwrap();
    let zero = test_pool()
        .get_enum_by_name("test2.TestEnum")
        .unwrap()
        .get_value(0)
        .unwrap();
    assert_eq!(
        message.get_field(&enum_value).unwrap().as_ref(),
        &Value::Enum(zero)
    );

    assert_eq!(message.encoded_len(), 0);
    assert_eq!(message.encode_to_vec(), b"");
}

#[test]
fn access_errors() {
    let desc = test_pool().get_message_by_name("test2.Outer").unwrap();
    let plain = desc.get_field_by_name("plain").unwrap();
    let unpacked = desc.get_field_by_name("unpacked").unwrap();

    let mut builder = DynamicBuilder::new(desc);

    // has is singular-only, indexed access is repeated-only.
    builder.has_field(&unpacked).unwrap_err();
    builder.repeated_len(&plain).unwrap_err();
    builder.add_repeated(&plain, Value::I32(1)).unwrap_err();
    builder
        .set_repeated(&plain, 0, Value::I32(1))
        .unwrap_err();

    // Type verification happens at the set boundary.
    builder.set_field(&plain, Value::U32(1)).unwrap_err();
    builder
        .set_field(&unpacked, Value::List(vec![Value::I32(1), Value::Bool(true)]))
        .unwrap_err();
    builder.add_repeated(&unpacked, Value::I64(1)).unwrap_err();

    // Indexed set requires an existing element.
    builder.set_repeated(&unpacked, 0, Value::I32(1)).unwrap_err();
    builder.add_repeated(&unpacked, Value::I32(1)).unwrap();
    builder.set_repeated(&unpacked, 0, Value::I32(2)).unwrap();
    builder.set_repeated(&unpacked, 1, Value::I32(3)).unwrap_err();

    let message = builder.build_partial();
    assert_eq!(
        message.get_field(&unpacked).unwrap().as_ref(),
        &Value::List(vec![Value::I32(2)])
    );
}

#[test]
fn enum_values_must_belong_to_the_field_enum() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let enum_field = outer.get_field_by_name("enum_value").unwrap();
    let one = test_pool()
        .get_enum_by_name("test2.TestEnum")
        .unwrap()
        .get_value(1)
        .unwrap();

    let mut builder = DynamicBuilder::new(outer);
    builder.set_field(&enum_field, Value::Enum(one)).unwrap();
    assert_eq!(builder.build_partial().encode_to_vec(), b"\x30\x01");
}

#[test]
fn merge_semantics() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let inner_desc = test_pool().get_message_by_name("test2.Inner").unwrap();
    let plain = outer.get_field_by_name("plain").unwrap();
    let unpacked = outer.get_field_by_name("unpacked").unwrap();
    let inner = outer.get_field_by_name("inner").unwrap();

    let mut target_inner = DynamicBuilder::new(inner_desc.clone());
    target_inner.set_field_by_name("id", Value::I32(1)).unwrap();
    let mut target = DynamicBuilder::new(outer.clone());
    target.set_field(&plain, Value::I32(1)).unwrap();
    target
        .set_field(
            &unpacked,
            Value::List(vec![Value::I32(1), Value::I32(2)]),
        )
        .unwrap();
    target
        .set_field(&inner, Value::Message(target_inner.build().unwrap()))
        .unwrap();

    let mut source_inner = DynamicBuilder::new(inner_desc);
    source_inner.set_field_by_name("id", Value::I32(7)).unwrap();
    source_inner
        .set_field_by_name("name", Value::String("merged".to_owned()))
        .unwrap();
    let mut source = DynamicBuilder::new(outer.clone());
    source.set_field(&plain, Value::I32(2)).unwrap();
    source
        .set_field(&unpacked, Value::List(vec![Value::I32(3)]))
        .unwrap();
    let source_inner = source_inner.build().unwrap();
    source
        .set_field(&inner, Value::Message(source_inner.clone()))
        .unwrap();
    let source = source.build().unwrap();

    target.merge_from_message(&source);
    let merged = target.build().unwrap();

    // Singular scalars take the source value, repeated fields concatenate.
    assert_eq!(merged.get_field(&plain).unwrap().as_ref(), &Value::I32(2));
    assert_eq!(
        merged.get_field(&unpacked).unwrap().as_ref(),
        &Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)])
    );

    // Singular messages merge recursively rather than being replaced.
    let merged_inner = merged.get_field(&inner).unwrap();
    let merged_inner = merged_inner.as_message().unwrap();
    assert_eq!(
        merged_inner.get_field_by_name("id").unwrap().as_ref(),
        &Value::I32(7)
    );
    assert_eq!(
        merged_inner.get_field_by_name("name").unwrap().as_ref(),
        &Value::String("merged".to_owned())
    );
}

#[test]
fn merge_is_associative_for_repeated_fields() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let unpacked = outer.get_field_by_name("unpacked").unwrap();

    let build = |values: &[i32]| {
        let mut builder = DynamicBuilder::new(outer.clone());
        builder
            .set_field(
                &unpacked,
                Value::List(values.iter().copied().map(Value::I32).collect()),
            )
            .unwrap();
        builder.build().unwrap()
    };
    let a = build(&[1]);
    let b = build(&[2, 3]);
    let c = build(&[4]);

    let mut left = a.to_builder();
    left.merge_from_message(&b);
    let left = left.build().unwrap();
    let mut left = left.to_builder();
    left.merge_from_message(&c);

    let mut bc = b.to_builder();
    bc.merge_from_message(&c);
    let mut right = a.to_builder();
    right.merge_from_message(&bc.build().unwrap());

    assert_eq!(left.build().unwrap(), right.build().unwrap());
}

#[test]
fn merge_of_singular_scalars_is_last_writer_wins() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let plain = outer.get_field_by_name("plain").unwrap();

    let mut b = DynamicBuilder::new(outer.clone());
    b.set_field(&plain, Value::I32(9)).unwrap();
    let b = b.build().unwrap();

    let mut merged = DynamicBuilder::new(outer.clone());
    merged.set_field(&plain, Value::I32(1)).unwrap();
    merged.merge_from_message(&b);

    let mut direct = DynamicBuilder::new(outer);
    direct.set_field(&plain, Value::I32(9)).unwrap();

    assert_eq!(merged.build().unwrap(), direct.build().unwrap());
}

#[test]
fn unknown_enum_values_are_preserved() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let enum_field = outer.get_field_by_name("enum_value").unwrap();

    // Field 6 carrying 99, which TestEnum does not define.
    let bytes = b"\x30\x63";
    let message = DynamicMessage::parse(outer, bytes).unwrap();

    assert!(!message.has_field(&enum_field).unwrap());
    assert_eq!(message.unknown_fields().get(6).unwrap().varints(), [99]);
    assert_eq!(message.encode_to_vec(), bytes);
}

#[test]
fn group_fields_round_trip() {
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let group_desc = test_pool()
        .get_message_by_name("test2.Outer.MyGroup")
        .unwrap();
    let group_field = outer.get_field_by_name("mygroup").unwrap();
    assert!(group_field.is_group());

    let mut group = DynamicBuilder::new(group_desc);
    group.set_field_by_name("a", Value::I32(5)).unwrap();

    let mut builder = DynamicBuilder::new(outer.clone());
    builder
        .set_field(&group_field, Value::Message(group.build().unwrap()))
        .unwrap();
    let message = builder.build().unwrap();

    let encoded = message.encode_to_vec();
    assert_eq!(encoded, b"\x3b\x08\x05\x3c");
    assert_eq!(message.encoded_len(), encoded.len());

    let parsed = DynamicMessage::parse(message.descriptor().clone(), &encoded).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn canonical_order_is_independent_of_set_order(){
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();
    let inner_desc = test_pool().get_message_by_name("test2.Inner").unwrap();

    let mut inner = DynamicBuilder::new(inner_desc);
    inner.set_field_by_name("id", Value::I32(3)).unwrap();
    let inner = inner.build().unwrap();

    let mut forward = DynamicBuilder::new(outer.clone());
    forward
        .set_field_by_name("inner", Value::Message(inner.clone()))
        .unwrap();
    forward.set_field_by_name("plain", Value::I32(4)).unwrap();

    let mut backward = DynamicBuilder::new(outer);
    backward.set_field_by_name("plain", Value::I32(4)).unwrap();
    backward
        .set_field_by_name("inner", Value::Message(inner))
        .unwrap();

    let forward = forward.build().unwrap().encode_to_vec();
    let backward = backward.build().unwrap().encode_to_vec();
    assert_eq!(forward, backward);
    // Field 1 precedes field 3 regardless of insertion order.
    assert_eq!(forward[0], 0x0a);
}

#[test]
fn builders_do_not_alias_built_messages() {
    let desc = test_pool().get_message_by_name("test2.Inner").unwrap();

    let mut builder = DynamicBuilder::new(desc);
    builder.set_field_by_name("id", Value::I32(1)).unwrap();
    let message = builder.build_partial();

    let mut reopened = message.to_builder();
    reopened.set_field_by_name("id", Value::I32(2)).unwrap();
    let changed = reopened.build_partial();

    assert_eq!(
        message.get_field_by_name("id").unwrap().as_ref(),
        &Value::I32(1)
    );
    assert_ne!(message, changed);
}

#[test]
fn equal_messages_hash_equal() {
    let desc = test_pool().get_message_by_name("test2.Inner").unwrap();

    let build = || {
        let mut builder = DynamicBuilder::new(desc.clone());
        builder.set_field_by_name("id", Value::I32(12)).unwrap();
        builder
            .set_field_by_name("name", Value::String("x".to_owned()))
            .unwrap();
        builder.build().unwrap()
    };
    let a = build();
    let b = build();

    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn malformed_inputs_are_rejected() {
    let inner = test_pool().get_message_by_name("test2.Inner").unwrap();
    let outer = test_pool().get_message_by_name("test2.Outer").unwrap();

    // Truncated varint.
    DynamicMessage::parse(inner.clone(), b"\x08\x96")
        .unwrap_err()
        .as_malformed()
        .unwrap();

    // Invalid UTF-8 in a string field.
    DynamicMessage::parse(inner.clone(), b"\x08\x01\x12\x01\xff")
        .unwrap_err()
        .as_malformed()
        .unwrap();

    // Length delimiter past the end of the buffer.
    DynamicMessage::parse(outer.clone(), b"\x0a\x0a\x08")
        .unwrap_err()
        .as_malformed()
        .unwrap();

    // Unterminated group.
    DynamicMessage::parse(outer, b"\x3b\x08\x05")
        .unwrap_err()
        .as_malformed()
        .unwrap();

    // Nesting deeper than the recursion limit.
    let mut deep = Vec::new();
    for _ in 0..200 {
        deep.extend_from_slice(b"\x9b\x06");
    }
    DynamicMessage::parse(inner, &deep)
        .unwrap_err()
        .as_malformed()
        .unwrap();
}

#[test]
fn unknown_fields_survive_round_trips_with_known_fields() {
    let inner = test_pool().get_message_by_name("test2.Inner").unwrap();

    // id = 1 followed by unknown fields of every wire type.
    let mut bytes: Vec<u8> = b"\x08\x01".to_vec();
    bytes.extend_from_slice(b"\xa0\x06\x2a"); // field 100, varint 42
    bytes.extend_from_slice(b"\xad\x06\x01\x00\x00\x00"); // field 101, fixed32
    bytes.extend_from_slice(b"\xb1\x06\x02\x00\x00\x00\x00\x00\x00\x00"); // field 102, fixed64
    bytes.extend_from_slice(b"\xba\x06\x02hi"); // field 103, length-delimited
    bytes.extend_from_slice(b"\xc3\x06\x08\x05\xc4\x06"); // field 104, group

    let message = DynamicMessage::parse(inner, &bytes).unwrap();
    assert_eq!(message.encoded_len(), bytes.len());
    assert_eq!(message.encode_to_vec(), bytes);

    let unknown = message.unknown_fields();
    assert_eq!(unknown.get(100).unwrap().varints(), [42]);
    assert_eq!(unknown.get(101).unwrap().fixed32s(), [1]);
    assert_eq!(unknown.get(102).unwrap().fixed64s(), [2]);
    assert_eq!(
        unknown.get(103).unwrap().length_delimited(),
        [Bytes::from_static(b"hi")]
    );
    assert_eq!(unknown.get(104).unwrap().groups().len(), 1);
}
