//! Dynamic protobuf messages whose shape is a
//! [`MessageDescriptor`][crate::MessageDescriptor] known only at runtime.

mod fields;
mod message;
mod unknown;

use std::{
    borrow::Cow,
    hash::{Hash, Hasher},
    io,
    mem::discriminant,
};

use bytes::{BufMut, Bytes};

use crate::{
    AccessError, EnumValueDescriptor, ExtensionRegistry, FieldDescriptor, Kind, MessageDescriptor,
    ParseError, UninitializedMessage,
};

pub use self::fields::{FieldSet, FieldSetBuilder};
pub use self::unknown::{UnknownField, UnknownFieldSet, UnknownFieldSetBuilder};

/// A frozen protobuf message described by a [`MessageDescriptor`].
///
/// A `DynamicMessage` pairs the descriptor with a [`FieldSet`] holding the
/// set fields and an [`UnknownFieldSet`] preserving unrecognized wire data.
/// It is immutable: construction and mutation go through
/// [`DynamicBuilder`], and a built message may be shared freely between
/// threads.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    desc: MessageDescriptor,
    fields: FieldSet,
    unknown_fields: UnknownFieldSet,
}

/// The mutable phase of a [`DynamicMessage`].
///
/// Building consumes the builder and freezes its state, so a published
/// message can never alias mutable storage.
#[derive(Debug, Clone)]
pub struct DynamicBuilder {
    desc: MessageDescriptor,
    fields: FieldSetBuilder,
    unknown_fields: UnknownFieldSetBuilder,
}

/// A dynamically-typed protobuf value.
///
/// The variants correspond to the storage categories of
/// [`MappedKind`][crate::MappedKind]; one variant may serve several wire
/// representations (for example [`Value::I32`] covers `int32`, `sint32` and
/// `sfixed32`), so a value is only meaningful together with a field
/// descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean value, for the `bool` type.
    Bool(bool),
    /// A 32-bit signed integer, for the `int32`, `sint32` and `sfixed32` types.
    I32(i32),
    /// A 64-bit signed integer, for the `int64`, `sint64` and `sfixed64` types.
    I64(i64),
    /// A 32-bit unsigned integer, for the `uint32` and `fixed32` types.
    U32(u32),
    /// A 64-bit unsigned integer, for the `uint64` and `fixed64` types.
    U64(u64),
    /// A single-precision float, for the `float` type.
    F32(f32),
    /// A double-precision float, for the `double` type.
    F64(f64),
    /// UTF-8 text, for the `string` type.
    String(String),
    /// An immutable byte buffer, for the `bytes` type.
    Bytes(Bytes),
    /// A reference to a defined value of the field's enum type.
    Enum(EnumValueDescriptor),
    /// A frozen sub-message.
    Message(DynamicMessage),
    /// The elements of a repeated field, in order.
    List(Vec<Value>),
}

impl DynamicMessage {
    /// Gets the canonical empty message of the given type.
    pub fn default_instance(desc: MessageDescriptor) -> Self {
        DynamicMessage {
            desc,
            fields: FieldSet::default(),
            unknown_fields: UnknownFieldSet::default(),
        }
    }

    /// Parses a message of the given type, with all extensions landing in
    /// the unknown field set.
    ///
    /// Fails when the input is malformed or when a required field of the
    /// type is unset.
    pub fn parse(desc: MessageDescriptor, bytes: &[u8]) -> Result<Self, ParseError> {
        DynamicMessage::parse_with_extensions(desc, bytes, ExtensionRegistry::empty())
    }

    /// Parses a message of the given type, resolving extension numbers
    /// through `registry`.
    pub fn parse_with_extensions(
        desc: MessageDescriptor,
        bytes: &[u8],
        registry: &ExtensionRegistry,
    ) -> Result<Self, ParseError> {
        let mut builder = DynamicBuilder::new(desc);
        builder.merge_from_bytes(bytes, registry)?;
        builder.build().map_err(ParseError::from)
    }

    /// Gets the descriptor describing the type of this message.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.desc
    }

    /// Gets the set fields of the message.
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Gets the unrecognized fields preserved from parsing.
    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    /// Gets the value of a field. See [`FieldSet::get`].
    pub fn get_field(&self, field: &FieldDescriptor) -> Option<Cow<'_, Value>> {
        self.fields.get(field)
    }

    /// Gets the value of the field with the given name, or `None` if the
    /// type has no such field.
    pub fn get_field_by_name(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.desc
            .get_field_by_name(name)
            .and_then(|field| self.fields.get(&field))
    }

    /// Returns `true` if the singular field is set. See [`FieldSet::has`].
    pub fn has_field(&self, field: &FieldDescriptor) -> Result<bool, AccessError> {
        self.fields.has(field)
    }

    /// Gets the number of elements of a repeated field. See
    /// [`FieldSet::repeated_len`].
    pub fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, AccessError> {
        self.fields.repeated_len(field)
    }

    /// Returns `true` if every required field of this message and of every
    /// contained message is set.
    pub fn is_initialized(&self) -> bool {
        self.fields.is_fully_initialized(&self.desc)
    }

    /// Encodes the message: set fields in ascending field number order,
    /// followed by the unknown fields.
    pub fn encode<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        self.fields.encode(buf);
        if self.desc.is_message_set_wire_format() {
            self.unknown_fields.encode_message_set(buf);
        } else {
            self.unknown_fields.encode(buf);
        }
    }

    /// Encodes the message into a freshly allocated buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    /// Gets the exact number of bytes [`encode`](DynamicMessage::encode)
    /// produces. Computed on every call.
    pub fn encoded_len(&self) -> usize {
        self.fields.encoded_len()
            + if self.desc.is_message_set_wire_format() {
                self.unknown_fields.message_set_encoded_len()
            } else {
                self.unknown_fields.encoded_len()
            }
    }

    /// Writes the encoded message to an I/O sink, propagating sink errors.
    pub fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        writer.write_all(&self.encode_to_vec())
    }

    /// Creates a builder seeded with a copy of this message.
    pub fn to_builder(&self) -> DynamicBuilder {
        DynamicBuilder {
            desc: self.desc.clone(),
            fields: self.fields.to_builder(),
            unknown_fields: self.unknown_fields.to_builder(),
        }
    }
}

impl Hash for DynamicMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.desc.hash(state);
        self.fields.hash(state);
        self.unknown_fields.hash(state);
    }
}

impl DynamicBuilder {
    /// Creates an empty builder for the given message type.
    pub fn new(desc: MessageDescriptor) -> Self {
        DynamicBuilder {
            desc,
            fields: FieldSetBuilder::new(),
            unknown_fields: UnknownFieldSetBuilder::new(),
        }
    }

    /// Gets the descriptor describing the type under construction.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.desc
    }

    /// Gets the value of a field. See [`FieldSet::get`].
    pub fn get_field(&self, field: &FieldDescriptor) -> Option<Cow<'_, Value>> {
        self.fields.get(field)
    }

    /// Returns `true` if the singular field is set. See [`FieldSet::has`].
    pub fn has_field(&self, field: &FieldDescriptor) -> Result<bool, AccessError> {
        self.fields.has(field)
    }

    /// Gets the number of elements of a repeated field. See
    /// [`FieldSet::repeated_len`].
    pub fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, AccessError> {
        self.fields.repeated_len(field)
    }

    /// Sets the value of a field. See [`FieldSetBuilder::set`].
    pub fn set_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), AccessError> {
        debug_assert_eq!(field.containing_message(), self.desc);
        self.fields.set(field, value)
    }

    /// Sets the value of the field with the given name. Does nothing if the
    /// type has no such field.
    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        match self.desc.get_field_by_name(name) {
            Some(field) => self.set_field(&field, value),
            None => Ok(()),
        }
    }

    /// Appends a value to a repeated field. See
    /// [`FieldSetBuilder::add_repeated`].
    pub fn add_repeated(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), AccessError> {
        debug_assert_eq!(field.containing_message(), self.desc);
        self.fields.add_repeated(field, value)
    }

    /// Replaces the element at `index` of a repeated field. See
    /// [`FieldSetBuilder::set_repeated`].
    pub fn set_repeated(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), AccessError> {
        debug_assert_eq!(field.containing_message(), self.desc);
        self.fields.set_repeated(field, index, value)
    }

    /// Clears a field. Clearing is also how a singular message field is set
    /// back to "none".
    pub fn clear_field(&mut self, field: &FieldDescriptor) {
        self.fields.clear(field);
    }

    /// Merges a message of the same type into this builder: repeated fields
    /// concatenate, singular messages merge recursively, other singular
    /// fields are overwritten, and unknown fields concatenate.
    pub fn merge_from_message(&mut self, other: &DynamicMessage) {
        debug_assert_eq!(*other.descriptor(), self.desc);
        self.fields.merge_from(other.fields());
        self.unknown_fields.merge_from(other.unknown_fields());
    }

    /// Appends the contents of an [`UnknownFieldSet`] to this builder's
    /// unknown fields.
    pub fn merge_unknown_fields(&mut self, unknown: &UnknownFieldSet) {
        self.unknown_fields.merge_from(unknown);
    }

    /// Builds the message, verifying that every required field is set.
    ///
    /// On failure the returned [`UninitializedMessage`] carries the partial
    /// message and the paths of the missing fields.
    pub fn build(self) -> Result<DynamicMessage, UninitializedMessage> {
        let message = self.build_partial();
        if message.is_initialized() {
            Ok(message)
        } else {
            let mut missing = Vec::new();
            collect_missing_fields(&message, String::new(), &mut missing);
            Err(UninitializedMessage::new(message, missing))
        }
    }

    /// Builds the message without checking required fields.
    pub fn build_partial(self) -> DynamicMessage {
        DynamicMessage {
            desc: self.desc,
            fields: self.fields.build(),
            unknown_fields: self.unknown_fields.build(),
        }
    }
}

fn collect_missing_fields(message: &DynamicMessage, prefix: String, missing: &mut Vec<String>) {
    for field in message.descriptor().fields() {
        if field.is_required() && !message.fields().has(&field).unwrap_or(false) {
            missing.push(format!("{}{}", prefix, field.name()));
        }
    }
    for (field, value) in message.fields().iter() {
        match value {
            Value::Message(sub) => {
                collect_missing_fields(sub, format!("{}{}.", prefix, field.name()), missing);
            }
            Value::List(values) => {
                for (index, value) in values.iter().enumerate() {
                    if let Value::Message(sub) = value {
                        collect_missing_fields(
                            sub,
                            format!("{}{}[{}].", prefix, field.name(), index),
                            missing,
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

impl Value {
    /// Returns the default value for the given field: an empty list for a
    /// repeated field, the field's declared default if it has one, or the
    /// type's zero value.
    pub fn default_value_for_field(field: &FieldDescriptor) -> Self {
        if field.is_repeated() {
            Value::List(Vec::new())
        } else if let Some(default) = field.default_value() {
            default
        } else {
            Value::default_value(&field.kind())
        }
    }

    /// Returns the default value for the given type: zero for the numeric
    /// types, empty for `string` and `bytes`, the first declared value for
    /// an enum, and the empty message for a message type.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Message(desc) => Value::Message(DynamicMessage::default_instance(desc.clone())),
            Kind::Enum(desc) => Value::Enum(desc.default_value()),
            Kind::Double => Value::F64(0.0),
            Kind::Float => Value::F32(0.0),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Bool => Value::Bool(false),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Bytes::new()),
        }
    }

    /// Returns `true` if this is the default value for the given field.
    pub fn is_default_for_field(&self, field: &FieldDescriptor) -> bool {
        *self == Value::default_value_for_field(field)
    }

    /// Returns `true` if this value may be stored in the given field:
    /// cardinality and type must both match.
    pub fn is_valid_for_field(&self, field: &FieldDescriptor) -> bool {
        match (self, field.is_repeated()) {
            (Value::List(values), true) => {
                let kind = field.kind();
                values.iter().all(|value| value.is_valid(&kind))
            }
            (Value::List(_), false) | (_, true) => false,
            (value, false) => value.is_valid(&field.kind()),
        }
    }

    /// Returns `true` if this value may be stored in a singular field of the
    /// given type.
    ///
    /// An enum value must belong to the field's enum type, and a message
    /// must have the field's message type.
    pub fn is_valid(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool) => true,
            (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => true,
            (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => true,
            (Value::U32(_), Kind::Uint32 | Kind::Fixed32) => true,
            (Value::U64(_), Kind::Uint64 | Kind::Fixed64) => true,
            (Value::F32(_), Kind::Float) => true,
            (Value::F64(_), Kind::Double) => true,
            (Value::String(_), Kind::String) => true,
            (Value::Bytes(_), Kind::Bytes) => true,
            (Value::Enum(value), Kind::Enum(desc)) => value.parent_enum() == desc,
            (Value::Message(message), Kind::Message(desc)) => message.descriptor() == desc,
            _ => false,
        }
    }

    /// The name of this value's storage category, as reported in type
    /// mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
        }
    }

    /// Returns the value if it is a `Value::Bool`, or `None` otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::I32`, or `None` otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::I64`, or `None` otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::U32`, or `None` otherwise.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::U64`, or `None` otherwise.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::F32`, or `None` otherwise.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::F64`, or `None` otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::String`, or `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Value::Bytes`, or `None` otherwise.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the enum value descriptor if it is a `Value::Enum`, or `None`
    /// otherwise.
    pub fn as_enum(&self) -> Option<&EnumValueDescriptor> {
        match self {
            Value::Enum(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the message if it is a `Value::Message`, or
    /// `None` otherwise.
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the elements if it is a `Value::List`, or
    /// `None` otherwise.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the elements if it is a `Value::List`,
    /// or `None` otherwise.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }
}

#[test]
fn assert_frozen_types_send_sync() {
    fn test_send_sync<T: Send + Sync>() {}

    test_send_sync::<DynamicMessage>();
    test_send_sync::<FieldSet>();
    test_send_sync::<UnknownFieldSet>();
    test_send_sync::<Value>();
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            Value::Bool(value) => value.hash(state),
            Value::I32(value) => value.hash(state),
            Value::I64(value) => value.hash(state),
            Value::U32(value) => value.hash(state),
            Value::U64(value) => value.hash(state),
            // Normalizing through an addition maps -0.0 onto 0.0, keeping
            // the hash consistent with equality.
            Value::F32(value) => (value + 0.0).to_bits().hash(state),
            Value::F64(value) => (value + 0.0).to_bits().hash(state),
            Value::String(value) => value.hash(state),
            Value::Bytes(value) => value.hash(state),
            Value::Enum(value) => value.hash(state),
            Value::Message(value) => value.hash(state),
            Value::List(values) => values.hash(state),
        }
    }
}
