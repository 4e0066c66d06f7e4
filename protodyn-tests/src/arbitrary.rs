use bytes::Bytes;
use proptest::prelude::*;
use protodyn::{DynamicBuilder, DynamicMessage, Value};

use crate::test_pool;

fn arb_comparable_f32() -> impl Strategy<Value = f32> {
    use prop::num::f32::*;
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

fn arb_comparable_f64() -> impl Strategy<Value = f64> {
    use prop::num::f64::*;
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

fn arb_scalar_values() -> impl Strategy<Value = Vec<(&'static str, Value)>> {
    (
        (
            any::<i32>().prop_map(Value::I32),
            any::<i64>().prop_map(Value::I64),
            any::<u32>().prop_map(Value::U32),
            any::<u64>().prop_map(Value::U64),
            any::<i32>().prop_map(Value::I32),
        ),
        (
            any::<i64>().prop_map(Value::I64),
            any::<u32>().prop_map(Value::U32),
            any::<u64>().prop_map(Value::U64),
            any::<i32>().prop_map(Value::I32),
            any::<i64>().prop_map(Value::I64),
        ),
        (
            arb_comparable_f32().prop_map(Value::F32),
            arb_comparable_f64().prop_map(Value::F64),
            any::<bool>().prop_map(Value::Bool),
            any::<String>().prop_map(Value::String),
            any::<Vec<u8>>().prop_map(|bytes| Value::Bytes(Bytes::from(bytes))),
        ),
    )
        .prop_map(
            |(
                (int32, int64, uint32, uint64, sint32),
                (sint64, fixed32, fixed64, sfixed32, sfixed64),
                (float, double, bool, string, bytes),
            )| {
                vec![
                    ("int32", int32),
                    ("int64", int64),
                    ("uint32", uint32),
                    ("uint64", uint64),
                    ("sint32", sint32),
                    ("sint64", sint64),
                    ("fixed32", fixed32),
                    ("fixed64", fixed64),
                    ("sfixed32", sfixed32),
                    ("sfixed64", sfixed64),
                    ("float", float),
                    ("double", double),
                    ("bool", bool),
                    ("string", string),
                    ("bytes", bytes),
                ]
            },
        )
}

proptest! {
    #[test]
    fn scalar_round_trip(values in arb_scalar_values()) {
        let desc = test_pool().get_message_by_name("test.Scalars").unwrap();

        let mut builder = DynamicBuilder::new(desc.clone());
        for (name, value) in values {
            builder.set_field_by_name(name, value).unwrap();
        }
        let message = builder.build().unwrap();

        let encoded = message.encode_to_vec();
        prop_assert_eq!(encoded.len(), message.encoded_len());

        let parsed = DynamicMessage::parse(desc, &encoded).unwrap();
        prop_assert_eq!(&parsed, &message);
        prop_assert_eq!(parsed.encode_to_vec(), encoded);
    }

    #[test]
    fn packed_round_trip(values in prop::collection::vec(any::<i32>(), 0..16)) {
        let packed_desc = test_pool().get_message_by_name("test2.PackedArrays").unwrap();
        let unpacked_desc = test_pool().get_message_by_name("test2.UnpackedArrays").unwrap();

        let list = Value::List(values.into_iter().map(Value::I32).collect());
        let mut builder = DynamicBuilder::new(packed_desc.clone());
        builder.set_field_by_name("values", list.clone()).unwrap();
        let message = builder.build().unwrap();

        let encoded = message.encode_to_vec();
        prop_assert_eq!(encoded.len(), message.encoded_len());

        // Packed bytes parse identically under the unpacked twin, and the
        // unpacked form parses back under the packed descriptor.
        let reparsed = DynamicMessage::parse(unpacked_desc.clone(), &encoded).unwrap();
        let field = unpacked_desc.get_field_by_name("values").unwrap();
        let reparsed_value = reparsed.get_field(&field).unwrap();
        prop_assert_eq!(reparsed_value.as_ref(), &list);

        let repacked = DynamicMessage::parse(packed_desc, &reparsed.encode_to_vec()).unwrap();
        prop_assert_eq!(repacked, message);
    }

    #[test]
    fn unknown_fields_round_trip(payload in prop::collection::vec(any::<u8>(), 0..32), value in any::<u64>()) {
        let desc = test_pool().get_message_by_name("test2.Inner").unwrap();

        let mut bytes = Vec::new();
        prost::encoding::encode_key(1, prost::encoding::WireType::Varint, &mut bytes);
        prost::encoding::encode_varint(1, &mut bytes);
        prost::encoding::encode_key(150, prost::encoding::WireType::Varint, &mut bytes);
        prost::encoding::encode_varint(value, &mut bytes);
        prost::encoding::encode_key(151, prost::encoding::WireType::LengthDelimited, &mut bytes);
        prost::encoding::encode_varint(payload.len() as u64, &mut bytes);
        bytes.extend_from_slice(&payload);

        let message = DynamicMessage::parse(desc, &bytes).unwrap();
        prop_assert_eq!(message.encoded_len(), bytes.len());
        prop_assert_eq!(message.encode_to_vec(), bytes);
    }
}
