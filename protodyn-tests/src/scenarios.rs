use bytes::Bytes;
use prost::Message;
use protodyn::{DynamicBuilder, DynamicMessage, ReflectMessage, Value};

use crate::{proto, test_pool, test_registry};

#[test]
fn round_trip_of_all_scalars() {
    let desc = test_pool().get_message_by_name("test.Scalars").unwrap();

    let mut builder = DynamicBuilder::new(desc.clone());
    builder.set_field_by_name("int32", Value::I32(42)).unwrap();
    builder.set_field_by_name("sint64", Value::I64(-1)).unwrap();
    builder
        .set_field_by_name("string", Value::String("hi".to_owned()))
        .unwrap();
    builder
        .set_field_by_name("bytes", Value::Bytes(Bytes::from_static(&[0x01, 0xff])))
        .unwrap();
    builder.set_field_by_name("bool", Value::Bool(true)).unwrap();
    builder.set_field_by_name("double", Value::F64(3.5)).unwrap();
    let message = builder.build().unwrap();

    // tag|value pairs concatenated in field number order.
    let expected = b"\x08\x2a\
                     \x30\x01\
                     \x61\x00\x00\x00\x00\x00\x00\x0c\x40\
                     \x68\x01\
                     \x72\x02hi\
                     \x7a\x02\x01\xff";
    let encoded = message.encode_to_vec();
    assert_eq!(encoded, expected);
    assert_eq!(message.encoded_len(), expected.len());

    let parsed = DynamicMessage::parse(desc, &encoded).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn repeated_packed_int32() {
    let packed_desc = test_pool()
        .get_message_by_name("test2.PackedArrays")
        .unwrap();
    let unpacked_desc = test_pool()
        .get_message_by_name("test2.UnpackedArrays")
        .unwrap();

    let values = Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(150)]);
    let mut builder = DynamicBuilder::new(packed_desc.clone());
    builder.set_field_by_name("values", values.clone()).unwrap();
    let message = builder.build().unwrap();

    let encoded = message.encode_to_vec();
    assert_eq!(encoded, b"\x2a\x04\x01\x02\x96\x01");

    // The same bytes parse under a twin descriptor declaring the field
    // unpacked, and vice versa.
    let reparsed = DynamicMessage::parse(unpacked_desc.clone(), &encoded).unwrap();
    let field = unpacked_desc.get_field_by_name("values").unwrap();
    assert_eq!(reparsed.get_field(&field).unwrap().as_ref(), &values);

    let unpacked_encoded = reparsed.encode_to_vec();
    assert_eq!(unpacked_encoded, b"\x28\x01\x28\x02\x28\x96\x01");

    let repacked = DynamicMessage::parse(packed_desc, &unpacked_encoded).unwrap();
    assert_eq!(repacked, message);
}

#[test]
fn message_set_extension() {
    let set_desc = test_pool().get_message_by_name("test2.SetMessage").unwrap();
    let item_desc = test_pool().get_message_by_name("test2.SetItem").unwrap();
    let item_ext = set_desc.get_extension(4).unwrap();

    let mut item = DynamicBuilder::new(item_desc);
    item.set_field_by_name("i", Value::I32(123)).unwrap();
    let item = item.build().unwrap();

    let mut builder = DynamicBuilder::new(set_desc.clone());
    builder
        .set_field(&item_ext, Value::Message(item.clone()))
        .unwrap();
    let message = builder.build().unwrap();

    // The group-wrapped message-set item frame.
    let encoded = message.encode_to_vec();
    assert_eq!(encoded, b"\x0b\x10\x04\x1a\x02\x08\x7b\x0c");
    assert_eq!(message.encoded_len(), encoded.len());

    let parsed =
        DynamicMessage::parse_with_extensions(set_desc.clone(), &encoded, test_registry()).unwrap();
    assert_eq!(parsed, message);
    assert_eq!(
        parsed.get_field(&item_ext).unwrap().as_ref(),
        &Value::Message(item)
    );

    // Without the registry the item is preserved under its type id and
    // round-trips byte-exactly.
    let unresolved = DynamicMessage::parse(set_desc, &encoded).unwrap();
    assert_eq!(
        unresolved.unknown_fields().get(4).unwrap().length_delimited(),
        [Bytes::from_static(b"\x08\x7b")]
    );
    assert_eq!(unresolved.encode_to_vec(), encoded);
}

#[test]
fn unknown_field_survival() {
    let desc = test_pool().get_message_by_name("test2.Inner").unwrap();

    // Field 999 with wire type varint, value 17, then the known fields.
    let bytes = b"\xb8\x3e\x11\x08\x01";
    let message = DynamicMessage::parse(desc, bytes).unwrap();

    assert_eq!(message.unknown_fields().get(999).unwrap().varints(), [17]);

    // Unknown fields re-serialize in the tail position, after known fields.
    assert_eq!(message.encode_to_vec(), b"\x08\x01\xb8\x3e\x11");
}

#[test]
fn required_field_enforcement() {
    let desc = test_pool().get_message_by_name("test2.Inner").unwrap();

    let mut builder = DynamicBuilder::new(desc.clone());
    builder
        .set_field_by_name("name", Value::String("no id".to_owned()))
        .unwrap();

    let err = builder.clone().build().unwrap_err();
    assert_eq!(err.missing_fields(), ["id"]);

    let partial = builder.build_partial();
    assert!(!partial.is_initialized());

    let encoded = partial.encode_to_vec();
    let err = DynamicMessage::parse(desc, &encoded).unwrap_err();
    let uninitialized = err.as_uninitialized().unwrap();
    assert_eq!(uninitialized.missing_fields(), ["id"]);
    assert_eq!(*uninitialized.partial(), partial);
}

#[test]
fn dynamic_generated_parity() {
    let generated = proto::Scalars {
        int32: 42,
        int64: -42,
        uint32: 7,
        uint64: 8,
        sint32: -3,
        sint64: -4,
        fixed32: 9,
        fixed64: 10,
        sfixed32: -11,
        sfixed64: -12,
        float: 1.5,
        double: -2.25,
        bool: true,
        string: "hello".to_owned(),
        bytes: Bytes::from_static(b"\x00\x01"),
    };

    let desc = test_pool().get_message_by_name("test.Scalars").unwrap();
    let mut builder = DynamicBuilder::new(desc);
    builder.set_field_by_name("int32", Value::I32(42)).unwrap();
    builder.set_field_by_name("int64", Value::I64(-42)).unwrap();
    builder.set_field_by_name("uint32", Value::U32(7)).unwrap();
    builder.set_field_by_name("uint64", Value::U64(8)).unwrap();
    builder.set_field_by_name("sint32", Value::I32(-3)).unwrap();
    builder.set_field_by_name("sint64", Value::I64(-4)).unwrap();
    builder.set_field_by_name("fixed32", Value::U32(9)).unwrap();
    builder.set_field_by_name("fixed64", Value::U64(10)).unwrap();
    builder
        .set_field_by_name("sfixed32", Value::I32(-11))
        .unwrap();
    builder
        .set_field_by_name("sfixed64", Value::I64(-12))
        .unwrap();
    builder.set_field_by_name("float", Value::F32(1.5)).unwrap();
    builder
        .set_field_by_name("double", Value::F64(-2.25))
        .unwrap();
    builder.set_field_by_name("bool", Value::Bool(true)).unwrap();
    builder
        .set_field_by_name("string", Value::String("hello".to_owned()))
        .unwrap();
    builder
        .set_field_by_name("bytes", Value::Bytes(Bytes::from_static(b"\x00\x01")))
        .unwrap();
    let dynamic = builder.build().unwrap();

    assert_eq!(generated.encode_to_vec(), dynamic.encode_to_vec());
    assert_eq!(generated.to_dynamic(), dynamic);
    assert!(generated.dynamic_eq(&dynamic));

    let round_tripped = proto::Scalars::from_dynamic(&dynamic).unwrap();
    assert_eq!(round_tripped, generated);
}

#[test]
fn repeated_parity_with_generated_arrays() {
    let generated = proto::ScalarArrays {
        int32: vec![1, -1, 150],
        sint64: vec![-1, 63, -64],
        fixed32: vec![0, u32::MAX],
        double: vec![0.5, -0.5],
        bool: vec![true, false, true],
        string: vec!["a".to_owned(), String::new(), "bc".to_owned()],
    };

    let desc = test_pool().get_message_by_name("test.ScalarArrays").unwrap();
    let mut builder = DynamicBuilder::new(desc);
    builder
        .set_field_by_name(
            "int32",
            Value::List(vec![Value::I32(1), Value::I32(-1), Value::I32(150)]),
        )
        .unwrap();
    builder
        .set_field_by_name(
            "sint64",
            Value::List(vec![Value::I64(-1), Value::I64(63), Value::I64(-64)]),
        )
        .unwrap();
    builder
        .set_field_by_name(
            "fixed32",
            Value::List(vec![Value::U32(0), Value::U32(u32::MAX)]),
        )
        .unwrap();
    builder
        .set_field_by_name(
            "double",
            Value::List(vec![Value::F64(0.5), Value::F64(-0.5)]),
        )
        .unwrap();
    builder
        .set_field_by_name(
            "bool",
            Value::List(vec![
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true),
            ]),
        )
        .unwrap();
    builder
        .set_field_by_name(
            "string",
            Value::List(vec![
                Value::String("a".to_owned()),
                Value::String(String::new()),
                Value::String("bc".to_owned()),
            ]),
        )
        .unwrap();
    let dynamic = builder.build().unwrap();

    assert_eq!(generated.encode_to_vec(), dynamic.encode_to_vec());
    assert!(generated.dynamic_eq(&dynamic));
}
