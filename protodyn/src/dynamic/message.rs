//! Wire-format encoding and decoding of dynamic messages.
//!
//! Encoding dispatches on `(value, kind)` pairs and leans on the per-type
//! codecs in [`prost::encoding`]; decoding drives a [`CodedInput`] through
//! the descriptor, diverting unrecognized or mismatched fields into the
//! unknown field set.

use bytes::{BufMut, Bytes};
use prost::{
    encoding::{self, encode_key, encode_varint, encoded_len_varint, key_len, WireType},
    DecodeError,
};

use crate::{
    wire::{self, CodedInput},
    DynamicBuilder, ExtensionRegistry, FieldDescriptor, Kind, Value,
};

impl Value {
    /// Encodes this value as a field with the given descriptor.
    ///
    /// A default-valued singular field without explicit presence is omitted.
    pub(crate) fn encode_field<B>(&self, field: &FieldDescriptor, buf: &mut B)
    where
        B: BufMut,
    {
        if !field.is_repeated() && !field.supports_presence() && self.is_default_for_field(field) {
            return;
        }

        let number = field.number();
        match (self, field.kind()) {
            (Value::Bool(value), Kind::Bool) => encoding::bool::encode(number, value, buf),
            (Value::I32(value), Kind::Int32) => encoding::int32::encode(number, value, buf),
            (Value::I32(value), Kind::Sint32) => encoding::sint32::encode(number, value, buf),
            (Value::I32(value), Kind::Sfixed32) => encoding::sfixed32::encode(number, value, buf),
            (Value::I64(value), Kind::Int64) => encoding::int64::encode(number, value, buf),
            (Value::I64(value), Kind::Sint64) => encoding::sint64::encode(number, value, buf),
            (Value::I64(value), Kind::Sfixed64) => encoding::sfixed64::encode(number, value, buf),
            (Value::U32(value), Kind::Uint32) => encoding::uint32::encode(number, value, buf),
            (Value::U32(value), Kind::Fixed32) => encoding::fixed32::encode(number, value, buf),
            (Value::U64(value), Kind::Uint64) => encoding::uint64::encode(number, value, buf),
            (Value::U64(value), Kind::Fixed64) => encoding::fixed64::encode(number, value, buf),
            (Value::F32(value), Kind::Float) => encoding::float::encode(number, value, buf),
            (Value::F64(value), Kind::Double) => encoding::double::encode(number, value, buf),
            (Value::String(value), Kind::String) => encoding::string::encode(number, value, buf),
            (Value::Bytes(value), Kind::Bytes) => encoding::bytes::encode(number, value, buf),
            (Value::Enum(value), Kind::Enum(_)) => {
                encoding::int32::encode(number, &value.number(), buf)
            }
            (Value::Message(message), Kind::Message(_)) => {
                if field.is_extension()
                    && field.containing_message().is_message_set_wire_format()
                {
                    wire::encode_message_set_item(number, message.encoded_len(), buf, |buf| {
                        message.encode(buf)
                    });
                } else if field.is_group() {
                    encode_key(number, WireType::StartGroup, buf);
                    message.encode(buf);
                    encode_key(number, WireType::EndGroup, buf);
                } else {
                    encode_key(number, WireType::LengthDelimited, buf);
                    encode_varint(message.encoded_len() as u64, buf);
                    message.encode(buf);
                }
            }
            (Value::List(values), _) if field.is_repeated() => {
                if field.is_packed() {
                    match field.kind() {
                        Kind::Enum(_) => wire::encode_packed(
                            number,
                            values.iter().map(|v| expect_enum_number(v)),
                            buf,
                            |v, b| encode_varint(v as i64 as u64, b),
                            |v| encoded_len_varint(v as i64 as u64),
                        ),
                        Kind::Double => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_f64().expect("expected double")),
                            buf,
                            |v, b| b.put_f64_le(v),
                            |_| 8,
                        ),
                        Kind::Float => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_f32().expect("expected float")),
                            buf,
                            |v, b| b.put_f32_le(v),
                            |_| 4,
                        ),
                        Kind::Int32 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            buf,
                            |v, b| encode_varint(v as i64 as u64, b),
                            |v| encoded_len_varint(v as i64 as u64),
                        ),
                        Kind::Int64 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            buf,
                            |v, b| encode_varint(v as u64, b),
                            |v| encoded_len_varint(v as u64),
                        ),
                        Kind::Uint32 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_u32().expect("expected u32")),
                            buf,
                            |v, b| encode_varint(v as u64, b),
                            |v| encoded_len_varint(v as u64),
                        ),
                        Kind::Uint64 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_u64().expect("expected u64")),
                            buf,
                            |v, b| encode_varint(v, b),
                            encoded_len_varint,
                        ),
                        Kind::Sint32 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            buf,
                            |v, b| encode_varint(wire::encode_zigzag32(v) as u64, b),
                            |v| encoded_len_varint(wire::encode_zigzag32(v) as u64),
                        ),
                        Kind::Sint64 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            buf,
                            |v, b| encode_varint(wire::encode_zigzag64(v), b),
                            |v| encoded_len_varint(wire::encode_zigzag64(v)),
                        ),
                        Kind::Fixed32 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_u32().expect("expected u32")),
                            buf,
                            |v, b| b.put_u32_le(v),
                            |_| 4,
                        ),
                        Kind::Fixed64 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_u64().expect("expected u64")),
                            buf,
                            |v, b| b.put_u64_le(v),
                            |_| 8,
                        ),
                        Kind::Sfixed32 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            buf,
                            |v, b| b.put_i32_le(v),
                            |_| 4,
                        ),
                        Kind::Sfixed64 => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            buf,
                            |v, b| b.put_i64_le(v),
                            |_| 8,
                        ),
                        Kind::Bool => wire::encode_packed(
                            number,
                            values.iter().map(|v| v.as_bool().expect("expected bool")),
                            buf,
                            |v, b| encode_varint(v as u64, b),
                            |v| encoded_len_varint(v as u64),
                        ),
                        _ => panic!("invalid type for packed field"),
                    }
                } else {
                    for value in values {
                        value.encode_field(field, buf);
                    }
                }
            }
            (value, kind) => panic!(
                "mismatch between field set value {:?} and type {:?}",
                value, kind
            ),
        }
    }

    /// Size mirror of [`encode_field`](Value::encode_field).
    pub(crate) fn encoded_len_field(&self, field: &FieldDescriptor) -> usize {
        if !field.is_repeated() && !field.supports_presence() && self.is_default_for_field(field) {
            return 0;
        }

        let number = field.number();
        match (self, field.kind()) {
            (Value::Bool(value), Kind::Bool) => encoding::bool::encoded_len(number, value),
            (Value::I32(value), Kind::Int32) => encoding::int32::encoded_len(number, value),
            (Value::I32(value), Kind::Sint32) => encoding::sint32::encoded_len(number, value),
            (Value::I32(value), Kind::Sfixed32) => encoding::sfixed32::encoded_len(number, value),
            (Value::I64(value), Kind::Int64) => encoding::int64::encoded_len(number, value),
            (Value::I64(value), Kind::Sint64) => encoding::sint64::encoded_len(number, value),
            (Value::I64(value), Kind::Sfixed64) => encoding::sfixed64::encoded_len(number, value),
            (Value::U32(value), Kind::Uint32) => encoding::uint32::encoded_len(number, value),
            (Value::U32(value), Kind::Fixed32) => encoding::fixed32::encoded_len(number, value),
            (Value::U64(value), Kind::Uint64) => encoding::uint64::encoded_len(number, value),
            (Value::U64(value), Kind::Fixed64) => encoding::fixed64::encoded_len(number, value),
            (Value::F32(value), Kind::Float) => encoding::float::encoded_len(number, value),
            (Value::F64(value), Kind::Double) => encoding::double::encoded_len(number, value),
            (Value::String(value), Kind::String) => encoding::string::encoded_len(number, value),
            (Value::Bytes(value), Kind::Bytes) => encoding::bytes::encoded_len(number, value),
            (Value::Enum(value), Kind::Enum(_)) => {
                encoding::int32::encoded_len(number, &value.number())
            }
            (Value::Message(message), Kind::Message(_)) => {
                if field.is_extension()
                    && field.containing_message().is_message_set_wire_format()
                {
                    wire::message_set_item_len(number, message.encoded_len())
                } else if field.is_group() {
                    key_len(number) * 2 + message.encoded_len()
                } else {
                    let len = message.encoded_len();
                    key_len(number) + encoded_len_varint(len as u64) + len
                }
            }
            (Value::List(values), _) if field.is_repeated() => {
                if field.is_packed() {
                    match field.kind() {
                        Kind::Enum(_) => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| expect_enum_number(v)),
                            |v| encoded_len_varint(v as i64 as u64),
                        ),
                        Kind::Double => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_f64().expect("expected double")),
                            |_| 8,
                        ),
                        Kind::Float => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_f32().expect("expected float")),
                            |_| 4,
                        ),
                        Kind::Int32 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            |v| encoded_len_varint(v as i64 as u64),
                        ),
                        Kind::Int64 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            |v| encoded_len_varint(v as u64),
                        ),
                        Kind::Uint32 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_u32().expect("expected u32")),
                            |v| encoded_len_varint(v as u64),
                        ),
                        Kind::Uint64 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_u64().expect("expected u64")),
                            encoded_len_varint,
                        ),
                        Kind::Sint32 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            |v| encoded_len_varint(wire::encode_zigzag32(v) as u64),
                        ),
                        Kind::Sint64 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            |v| encoded_len_varint(wire::encode_zigzag64(v)),
                        ),
                        Kind::Fixed32 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_u32().expect("expected u32")),
                            |_| 4,
                        ),
                        Kind::Fixed64 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_u64().expect("expected u64")),
                            |_| 8,
                        ),
                        Kind::Sfixed32 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i32().expect("expected i32")),
                            |_| 4,
                        ),
                        Kind::Sfixed64 => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_i64().expect("expected i64")),
                            |_| 8,
                        ),
                        Kind::Bool => wire::packed_encoded_len(
                            number,
                            values.iter().map(|v| v.as_bool().expect("expected bool")),
                            |v| encoded_len_varint(v as u64),
                        ),
                        _ => panic!("invalid type for packed field"),
                    }
                } else {
                    values
                        .iter()
                        .map(|value| value.encoded_len_field(field))
                        .sum()
                }
            }
            (value, kind) => panic!(
                "mismatch between field set value {:?} and type {:?}",
                value, kind
            ),
        }
    }
}

fn expect_enum_number(value: &Value) -> i32 {
    value.as_enum().expect("expected enum value").number()
}

impl DynamicBuilder {
    /// Parses `bytes` into this builder, resolving extension numbers through
    /// `registry`.
    ///
    /// Fields already set keep merge semantics: repeated fields extend,
    /// singular sub-messages merge, other singular fields take the last
    /// value seen.
    pub fn merge_from_bytes(
        &mut self,
        bytes: &[u8],
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        let mut input = CodedInput::new(bytes);
        self.merge_from(&mut input, registry)
    }

    /// Parses fields from `input` until its current limit is reached.
    pub fn merge_from(
        &mut self,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        self.merge_scope(input, registry, None)
    }

    /// The tag dispatch loop. `group_end` is the field number whose end-group
    /// tag terminates this scope; a length-delimited scope instead ends at
    /// the input's limit.
    fn merge_scope(
        &mut self,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
        group_end: Option<u32>,
    ) -> Result<(), DecodeError> {
        loop {
            if input.reached_limit() {
                return match group_end {
                    None => Ok(()),
                    Some(_) => Err(DecodeError::new("truncated group")),
                };
            }
            let (number, wire_type) = input.read_tag()?;
            if wire_type == WireType::EndGroup {
                return match group_end {
                    Some(expected) if expected == number => Ok(()),
                    _ => Err(DecodeError::new("unexpected end group tag")),
                };
            }

            if self.descriptor().is_message_set_wire_format()
                && number == wire::MESSAGE_SET_ITEM_NUMBER
                && wire_type == WireType::StartGroup
            {
                self.merge_message_set_item(input, registry)?;
                continue;
            }

            // Extensions resolve only through the registry: parsing without
            // one lands every extension in the unknown field set.
            let field = self.descriptor().get_field(number).or_else(|| {
                if self.descriptor().is_extension_number(number) {
                    registry
                        .find(self.descriptor().full_name(), number)
                        .cloned()
                } else {
                    None
                }
            });
            match field {
                Some(field) if accepts_wire_type(&field, wire_type) => {
                    self.merge_known_field(&field, wire_type, input, registry)?;
                }
                // Unknown numbers and fields observed with an unexpected
                // wire type are preserved rather than rejected.
                _ => {
                    self.unknown_fields.merge_field(number, wire_type, input)?;
                }
            }
        }
    }

    fn merge_known_field(
        &mut self,
        field: &FieldDescriptor,
        wire_type: WireType,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        if field.is_repeated() {
            if wire_type == WireType::LengthDelimited && field.is_packable() {
                // A packed run, regardless of whether the field is declared
                // packed.
                let len = input.read_varint64()? as usize;
                let limit = input.push_limit(len)?;
                while !input.reached_limit() {
                    self.merge_repeated_scalar(field, input)?;
                }
                input.pop_limit(limit);
                Ok(())
            } else {
                self.merge_repeated_element(field, input, registry)
            }
        } else {
            match field.kind() {
                Kind::Message(message_desc) => {
                    let mut sub = match self.fields.get_raw(field.number()) {
                        Some(Value::Message(existing)) => existing.to_builder(),
                        _ => DynamicBuilder::new(message_desc),
                    };
                    self.merge_sub_message(field, &mut sub, input, registry)?;
                    self.fields
                        .insert_unverified(field, Value::Message(sub.build_partial()));
                    Ok(())
                }
                Kind::Enum(enum_desc) => {
                    let raw = input.read_varint64()? as i32;
                    match enum_desc.get_value(raw) {
                        Some(value) => self.fields.insert_unverified(field, Value::Enum(value)),
                        // An undefined number round-trips through the
                        // unknown fields instead of being dropped.
                        None => self
                            .unknown_fields
                            .merge_varint(field.number(), raw as i64 as u64),
                    }
                    Ok(())
                }
                kind => {
                    let value = read_scalar(&kind, input)?;
                    self.fields.insert_unverified(field, value);
                    Ok(())
                }
            }
        }
    }

    fn merge_repeated_element(
        &mut self,
        field: &FieldDescriptor,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        match field.kind() {
            Kind::Message(message_desc) => {
                let mut sub = DynamicBuilder::new(message_desc);
                self.merge_sub_message(field, &mut sub, input, registry)?;
                self.fields
                    .add_repeated_unverified(field, Value::Message(sub.build_partial()));
                Ok(())
            }
            _ => self.merge_repeated_scalar(field, input),
        }
    }

    fn merge_repeated_scalar(
        &mut self,
        field: &FieldDescriptor,
        input: &mut CodedInput,
    ) -> Result<(), DecodeError> {
        match field.kind() {
            Kind::Enum(enum_desc) => {
                let raw = input.read_varint64()? as i32;
                match enum_desc.get_value(raw) {
                    Some(value) => self
                        .fields
                        .add_repeated_unverified(field, Value::Enum(value)),
                    None => self
                        .unknown_fields
                        .merge_varint(field.number(), raw as i64 as u64),
                }
                Ok(())
            }
            kind => {
                let value = read_scalar(&kind, input)?;
                self.fields.add_repeated_unverified(field, value);
                Ok(())
            }
        }
    }

    fn merge_sub_message(
        &mut self,
        field: &FieldDescriptor,
        sub: &mut DynamicBuilder,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        input.enter_recursion()?;
        if field.is_group() {
            sub.merge_scope(input, registry, Some(field.number()))?;
        } else {
            let len = input.read_varint64()? as usize;
            let limit = input.push_limit(len)?;
            sub.merge_scope(input, registry, None)?;
            input.pop_limit(limit);
        }
        input.exit_recursion();
        Ok(())
    }

    /// Parses one message-set item: a field-1 group holding a `type_id`
    /// varint and a length-delimited `message` payload. Items whose type id
    /// does not resolve to a message extension are preserved as unknown
    /// fields under the type id.
    fn merge_message_set_item(
        &mut self,
        input: &mut CodedInput,
        registry: &ExtensionRegistry,
    ) -> Result<(), DecodeError> {
        input.enter_recursion()?;
        let mut type_id = 0u32;
        let mut payload: Option<Bytes> = None;
        loop {
            let (number, wire_type) = input.read_tag()?;
            match (number, wire_type) {
                (wire::MESSAGE_SET_ITEM_NUMBER, WireType::EndGroup) => break,
                (wire::MESSAGE_SET_TYPE_ID_NUMBER, WireType::Varint) => {
                    type_id = input.read_varint64()? as u32;
                }
                (wire::MESSAGE_SET_MESSAGE_NUMBER, WireType::LengthDelimited) => {
                    payload = Some(input.read_bytes()?);
                }
                (_, WireType::EndGroup) => {
                    return Err(DecodeError::new("unexpected end group tag"))
                }
                _ => input.skip_field(number, wire_type)?,
            }
        }
        input.exit_recursion();

        let payload = payload.unwrap_or_default();
        if type_id == 0 {
            return Ok(());
        }

        let extension = registry
            .find(self.descriptor().full_name(), type_id)
            .cloned();
        match extension {
            Some(field) => {
                if let Kind::Message(message_desc) = field.kind() {
                    let mut sub = match self.fields.get_raw(field.number()) {
                        Some(Value::Message(existing)) => existing.to_builder(),
                        _ => DynamicBuilder::new(message_desc),
                    };
                    sub.merge_from_bytes(&payload, registry)?;
                    self.fields
                        .insert_unverified(&field, Value::Message(sub.build_partial()));
                } else {
                    self.unknown_fields.merge_length_delimited(type_id, payload);
                }
            }
            None => self.unknown_fields.merge_length_delimited(type_id, payload),
        }
        Ok(())
    }
}

fn accepts_wire_type(field: &FieldDescriptor, observed: WireType) -> bool {
    if field.is_repeated() && field.is_packable() {
        // Packed and unpacked encodings are both accepted for packable
        // repeated fields, in either direction.
        observed == field.kind().wire_type() || observed == WireType::LengthDelimited
    } else {
        observed == field.wire_type()
    }
}

fn read_scalar(kind: &Kind, input: &mut CodedInput) -> Result<Value, DecodeError> {
    let value = match kind {
        Kind::Double => Value::F64(input.read_double()?),
        Kind::Float => Value::F32(input.read_float()?),
        Kind::Int32 => Value::I32(input.read_varint64()? as i32),
        Kind::Int64 => Value::I64(input.read_varint64()? as i64),
        Kind::Uint32 => Value::U32(input.read_varint32()?),
        Kind::Uint64 => Value::U64(input.read_varint64()?),
        Kind::Sint32 => Value::I32(input.read_sint32()?),
        Kind::Sint64 => Value::I64(input.read_sint64()?),
        Kind::Fixed32 => Value::U32(input.read_fixed32()?),
        Kind::Fixed64 => Value::U64(input.read_fixed64()?),
        Kind::Sfixed32 => Value::I32(input.read_fixed32()? as i32),
        Kind::Sfixed64 => Value::I64(input.read_fixed64()? as i64),
        Kind::Bool => Value::Bool(input.read_bool()?),
        Kind::String => Value::String(input.read_string()?),
        Kind::Bytes => Value::Bytes(input.read_bytes()?),
        Kind::Message(_) | Kind::Enum(_) => unreachable!("handled by the caller"),
    };
    Ok(value)
}
