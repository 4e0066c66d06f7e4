//! Read-only schema metadata describing protobuf message types.
//!
//! A [`DescriptorPool`] is built from `prost_types::FileDescriptorProto`
//! values output by the protobuf compiler. The descriptor handles
//! ([`MessageDescriptor`], [`FieldDescriptor`], [`EnumDescriptor`],
//! [`EnumValueDescriptor`]) are cheap to clone and reference pooled data
//! internally, so they may be shared freely between threads.

mod build;
mod error;

pub use self::error::DescriptorError;

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    sync::Arc,
};

use bytes::Bytes;
use prost::encoding::WireType;

use crate::Value;

/// Cardinality determines whether a field is optional, required, or repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    /// The field appears zero or one times.
    Optional,
    /// The field appears exactly one time. This cardinality is invalid with Proto3.
    Required,
    /// The field appears zero or more times.
    Repeated,
}

/// The syntax of a proto file.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// The `proto2` syntax.
    Proto2,
    /// The `proto3` syntax.
    Proto3,
}

/// The type of a protobuf message field.
#[derive(Clone, PartialEq, Eq)]
pub enum Kind {
    /// The protobuf `double` type.
    Double,
    /// The protobuf `float` type.
    Float,
    /// The protobuf `int32` type.
    Int32,
    /// The protobuf `int64` type.
    Int64,
    /// The protobuf `uint32` type.
    Uint32,
    /// The protobuf `uint64` type.
    Uint64,
    /// The protobuf `sint32` type.
    Sint32,
    /// The protobuf `sint64` type.
    Sint64,
    /// The protobuf `fixed32` type.
    Fixed32,
    /// The protobuf `fixed64` type.
    Fixed64,
    /// The protobuf `sfixed32` type.
    Sfixed32,
    /// The protobuf `sfixed64` type.
    Sfixed64,
    /// The protobuf `bool` type.
    Bool,
    /// The protobuf `string` type.
    String,
    /// The protobuf `bytes` type.
    Bytes,
    /// A protobuf message type. Also used for the legacy `group` type, which
    /// is distinguished by [`FieldDescriptor::is_group`].
    Message(MessageDescriptor),
    /// A protobuf enum type.
    Enum(EnumDescriptor),
}

/// A field type collapsed to the category of value it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappedKind {
    /// Stored as a boolean.
    Bool,
    /// Stored as a 32-bit signed integer.
    I32,
    /// Stored as a 64-bit signed integer.
    I64,
    /// Stored as a 32-bit unsigned integer.
    U32,
    /// Stored as a 64-bit unsigned integer.
    U64,
    /// Stored as a single-precision float.
    F32,
    /// Stored as a double-precision float.
    F64,
    /// Stored as UTF-8 text.
    String,
    /// Stored as an immutable byte buffer.
    Bytes,
    /// Stored as an enum value reference.
    Enum,
    /// Stored as a frozen sub-message.
    Message,
}

#[derive(Copy, Clone)]
enum KindIndex {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageIndex),
    Enum(EnumIndex),
    Group(MessageIndex),
}

type DescriptorIndex = u32;
type MessageIndex = DescriptorIndex;
type FieldIndex = DescriptorIndex;
type EnumIndex = DescriptorIndex;
type EnumValueIndex = DescriptorIndex;

/// A `DescriptorPool` is a collection of related descriptors, built from the
/// file descriptors output by the protobuf compiler.
///
/// This type uses reference counting internally so it is cheap to clone.
#[derive(Clone, Default)]
pub struct DescriptorPool {
    inner: Arc<DescriptorPoolInner>,
}

#[derive(Default)]
struct DescriptorPoolInner {
    names: HashMap<Box<str>, Definition>,
    messages: Vec<MessageInner>,
    enums: Vec<EnumInner>,
    fields: Vec<FieldInner>,
}

#[derive(Copy, Clone, Debug)]
enum Definition {
    Message(MessageIndex),
    Enum(EnumIndex),
}

struct Identity {
    full_name: Box<str>,
    name_index: usize,
}

struct MessageInner {
    id: Identity,
    syntax: Syntax,
    parent: Option<MessageIndex>,
    fields: Vec<FieldIndex>,
    field_numbers: BTreeMap<u32, FieldIndex>,
    field_names: HashMap<Box<str>, FieldIndex>,
    extensions: Vec<FieldIndex>,
    extension_ranges: Vec<Range<u32>>,
    message_set_wire_format: bool,
}

struct FieldInner {
    id: Identity,
    number: u32,
    kind: KindIndex,
    cardinality: Cardinality,
    is_packed: bool,
    is_group: bool,
    is_extension: bool,
    supports_presence: bool,
    containing: MessageIndex,
    default: Option<DefaultValue>,
}

enum DefaultValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(Box<str>),
    Bytes(Bytes),
    Enum(i32),
}

struct EnumInner {
    id: Identity,
    values: Vec<EnumValueInner>,
    value_names: HashMap<Box<str>, EnumValueIndex>,
}

struct EnumValueInner {
    id: Identity,
    number: i32,
}

/// A protobuf message definition.
#[derive(Clone)]
pub struct MessageDescriptor {
    pool: DescriptorPool,
    index: MessageIndex,
}

/// A protobuf message field definition, either a regular field or an
/// extension.
#[derive(Clone)]
pub struct FieldDescriptor {
    pool: DescriptorPool,
    index: FieldIndex,
}

/// A protobuf enum type definition.
#[derive(Clone)]
pub struct EnumDescriptor {
    pool: DescriptorPool,
    index: EnumIndex,
}

/// A value in a protobuf enum type.
#[derive(Clone)]
pub struct EnumValueDescriptor {
    parent: EnumDescriptor,
    index: EnumValueIndex,
}

impl Identity {
    fn new(full_name: String, name: &str) -> Identity {
        debug_assert!(full_name.ends_with(name));
        let name_index = full_name.len() - name.len();
        debug_assert!(name_index == 0 || full_name.as_bytes()[name_index - 1] == b'.');
        Identity {
            full_name: full_name.into(),
            name_index,
        }
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn name(&self) -> &str {
        &self.full_name[self.name_index..]
    }
}

impl DescriptorPool {
    /// Gets a message type by its full name, for example `my.package.MyMessage`.
    ///
    /// A leading dot is accepted and ignored.
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        match self.inner.get_definition(name) {
            Some(Definition::Message(index)) => Some(MessageDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    /// Gets an enum type by its full name.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        match self.inner.get_definition(name) {
            Some(Definition::Enum(index)) => Some(EnumDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    /// Gets an iterator over every extension field declared in this pool.
    pub fn extensions(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        (0..self.inner.fields.len())
            .filter(move |&index| self.inner.fields[index].is_extension)
            .map(move |index| FieldDescriptor {
                pool: self.clone(),
                index: to_index(index),
            })
    }
}

impl DescriptorPoolInner {
    fn get_definition(&self, name: &str) -> Option<Definition> {
        let name = name.strip_prefix('.').unwrap_or(name);
        self.names.get(name).copied()
    }
}

impl PartialEq for DescriptorPool {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DescriptorPool {}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPool")
            .field("messages", &self.inner.messages.len())
            .field("enums", &self.inner.enums.len())
            .field("fields", &self.inner.fields.len())
            .finish()
    }
}

impl MessageDescriptor {
    fn inner(&self) -> &MessageInner {
        &self.pool.inner.messages[self.index as usize]
    }

    /// Gets a reference to the [`DescriptorPool`] this message is defined in.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the short name of the message type, e.g. `MyMessage`.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the full name of the message type, e.g. `my.package.MyMessage`.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the syntax of the file the message is defined in.
    pub fn syntax(&self) -> Syntax {
        self.inner().syntax
    }

    /// Gets the message this message is nested inside, if any.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| MessageDescriptor {
            pool: self.pool.clone(),
            index,
        })
    }

    /// Gets an iterator over the fields of the message, ordered by field
    /// number.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner().fields.iter().map(move |&index| FieldDescriptor {
            pool: self.pool.clone(),
            index,
        })
    }

    /// Gets the field with the given number, or `None` if no such field exists.
    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        self.inner()
            .field_numbers
            .get(&number)
            .map(|&index| FieldDescriptor {
                pool: self.pool.clone(),
                index,
            })
    }

    /// Gets the field with the given name, or `None` if no such field exists.
    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.inner()
            .field_names
            .get(name)
            .map(|&index| FieldDescriptor {
                pool: self.pool.clone(),
                index,
            })
    }

    /// Gets an iterator over the extension fields declared in this pool that
    /// extend this message.
    pub fn extensions(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner()
            .extensions
            .iter()
            .map(move |&index| FieldDescriptor {
                pool: self.pool.clone(),
                index,
            })
    }

    /// Gets the extension of this message with the given number, if it is
    /// declared in this pool.
    pub fn get_extension(&self, number: u32) -> Option<FieldDescriptor> {
        self.extensions().find(|extension| extension.number() == number)
    }

    /// Gets an iterator over the field number ranges reserved for extensions.
    ///
    /// The ranges are half-open: `start..end` covers numbers `start` through
    /// `end - 1`.
    pub fn extension_ranges(&self) -> impl ExactSizeIterator<Item = Range<u32>> + '_ {
        self.inner().extension_ranges.iter().cloned()
    }

    /// Returns `true` if a field number falls within this message's extension
    /// ranges.
    pub fn is_extension_number(&self, number: u32) -> bool {
        self.inner()
            .extension_ranges
            .iter()
            .any(|range| range.contains(&number))
    }

    /// Returns `true` if the message uses the legacy message-set wire format.
    pub fn is_message_set_wire_format(&self) -> bool {
        self.inner().message_set_wire_format
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.pool == other.pool && self.index == other.index
    }
}

impl Eq for MessageDescriptor {}

impl Hash for MessageDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.pool.inner).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl FieldDescriptor {
    fn inner(&self) -> &FieldInner {
        &self.pool.inner.fields[self.index as usize]
    }

    /// Gets the short name of the field, e.g. `my_field`.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the full name of the field. For an extension this includes the
    /// scope the extension is declared in, not the extended message.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the number of the field, its identifier on the wire.
    pub fn number(&self) -> u32 {
        self.inner().number
    }

    /// Gets the type of the field.
    pub fn kind(&self) -> Kind {
        Kind::new(&self.pool, self.inner().kind)
    }

    /// Gets the storage category of the field's type.
    pub fn mapped_kind(&self) -> MappedKind {
        self.inner().kind.mapped_kind()
    }

    /// Gets the cardinality of the field.
    pub fn cardinality(&self) -> Cardinality {
        self.inner().cardinality
    }

    /// Returns `true` if the field is repeated.
    pub fn is_repeated(&self) -> bool {
        self.cardinality() == Cardinality::Repeated
    }

    /// Returns `true` if the field is required (proto2 only).
    pub fn is_required(&self) -> bool {
        self.cardinality() == Cardinality::Required
    }

    /// Returns `true` if the field is encoded using the packed encoding.
    pub fn is_packed(&self) -> bool {
        self.inner().is_packed
    }

    /// Returns `true` if the field type is eligible for the packed encoding.
    pub fn is_packable(&self) -> bool {
        self.inner().kind.is_packable()
    }

    /// Returns `true` if the field uses the legacy group encoding.
    pub fn is_group(&self) -> bool {
        self.inner().is_group
    }

    /// Returns `true` if the field is an extension.
    pub fn is_extension(&self) -> bool {
        self.inner().is_extension
    }

    /// Returns `true` if the field distinguishes "unset" from the default
    /// value.
    pub fn supports_presence(&self) -> bool {
        self.inner().supports_presence
    }

    /// Gets the message containing this field. For an extension this is the
    /// extended message.
    pub fn containing_message(&self) -> MessageDescriptor {
        MessageDescriptor {
            pool: self.pool.clone(),
            index: self.inner().containing,
        }
    }

    /// Gets the custom default value declared for the field, if any
    /// (proto2 only).
    pub fn default_value(&self) -> Option<Value> {
        self.inner().default.as_ref().map(|default| match default {
            DefaultValue::Bool(value) => Value::Bool(*value),
            DefaultValue::I32(value) => Value::I32(*value),
            DefaultValue::I64(value) => Value::I64(*value),
            DefaultValue::U32(value) => Value::U32(*value),
            DefaultValue::U64(value) => Value::U64(*value),
            DefaultValue::F32(value) => Value::F32(*value),
            DefaultValue::F64(value) => Value::F64(*value),
            DefaultValue::String(value) => Value::String(value.as_ref().to_owned()),
            DefaultValue::Bytes(value) => Value::Bytes(value.clone()),
            DefaultValue::Enum(number) => match self.kind() {
                Kind::Enum(enum_desc) => Value::Enum(
                    enum_desc
                        .get_value(*number)
                        .expect("enum default resolved when the pool was built"),
                ),
                _ => unreachable!("enum default on a non-enum field"),
            },
        })
    }

    /// Gets the wire type values of this field are encoded with, ignoring
    /// packing.
    pub fn wire_type(&self) -> WireType {
        if self.is_group() {
            WireType::StartGroup
        } else {
            self.kind().wire_type()
        }
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.pool == other.pool && self.index == other.index
    }
}

impl Eq for FieldDescriptor {}

impl Hash for FieldDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.pool.inner).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .field("kind", &self.inner().kind)
            .field("cardinality", &self.cardinality())
            .finish()
    }
}

impl EnumDescriptor {
    fn inner(&self) -> &EnumInner {
        &self.pool.inner.enums[self.index as usize]
    }

    /// Gets the short name of the enum type.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the full name of the enum type.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets an iterator over the values of the enum, in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDescriptor> + '_ {
        (0..self.inner().values.len()).map(move |index| EnumValueDescriptor {
            parent: self.clone(),
            index: to_index(index),
        })
    }

    /// Gets the value with the given number, or `None` if it is not defined.
    ///
    /// When several values alias the same number, the first is returned.
    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        self.inner()
            .values
            .iter()
            .position(|value| value.number == number)
            .map(|index| EnumValueDescriptor {
                parent: self.clone(),
                index: to_index(index),
            })
    }

    /// Gets the value with the given name, or `None` if it is not defined.
    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        self.inner()
            .value_names
            .get(name)
            .map(|&index| EnumValueDescriptor {
                parent: self.clone(),
                index,
            })
    }

    /// Gets the default value of the enum: its first declared value.
    pub fn default_value(&self) -> EnumValueDescriptor {
        EnumValueDescriptor {
            parent: self.clone(),
            index: 0,
        }
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.pool == other.pool && self.index == other.index
    }
}

impl Eq for EnumDescriptor {}

impl Hash for EnumDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.pool.inner).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name())
            .finish()
    }
}

impl EnumValueDescriptor {
    fn inner(&self) -> &EnumValueInner {
        &self.parent.inner().values[self.index as usize]
    }

    /// Gets the short name of the value, e.g. `MY_VALUE`.
    pub fn name(&self) -> &str {
        self.inner().id.name()
    }

    /// Gets the full name of the value. Enum values live in the scope
    /// enclosing the enum, e.g. `my.package.MY_VALUE`.
    pub fn full_name(&self) -> &str {
        self.inner().id.full_name()
    }

    /// Gets the number assigned to the value.
    pub fn number(&self) -> i32 {
        self.inner().number
    }

    /// Gets the enum this value belongs to.
    pub fn parent_enum(&self) -> &EnumDescriptor {
        &self.parent
    }
}

impl PartialEq for EnumValueDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent && self.index == other.index
    }
}

impl Eq for EnumValueDescriptor {}

impl Hash for EnumValueDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parent.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumValueDescriptor")
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .finish()
    }
}

impl Kind {
    fn new(pool: &DescriptorPool, kind: KindIndex) -> Self {
        match kind {
            KindIndex::Double => Kind::Double,
            KindIndex::Float => Kind::Float,
            KindIndex::Int32 => Kind::Int32,
            KindIndex::Int64 => Kind::Int64,
            KindIndex::Uint32 => Kind::Uint32,
            KindIndex::Uint64 => Kind::Uint64,
            KindIndex::Sint32 => Kind::Sint32,
            KindIndex::Sint64 => Kind::Sint64,
            KindIndex::Fixed32 => Kind::Fixed32,
            KindIndex::Fixed64 => Kind::Fixed64,
            KindIndex::Sfixed32 => Kind::Sfixed32,
            KindIndex::Sfixed64 => Kind::Sfixed64,
            KindIndex::Bool => Kind::Bool,
            KindIndex::String => Kind::String,
            KindIndex::Bytes => Kind::Bytes,
            KindIndex::Message(index) | KindIndex::Group(index) => {
                Kind::Message(MessageDescriptor {
                    pool: pool.clone(),
                    index,
                })
            }
            KindIndex::Enum(index) => Kind::Enum(EnumDescriptor {
                pool: pool.clone(),
                index,
            }),
        }
    }

    /// Gets a reference to the [`MessageDescriptor`] if this is a message
    /// type, or `None` otherwise.
    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            Kind::Message(desc) => Some(desc),
            _ => None,
        }
    }

    /// Gets a reference to the [`EnumDescriptor`] if this is an enum type,
    /// or `None` otherwise.
    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            Kind::Enum(desc) => Some(desc),
            _ => None,
        }
    }

    /// Returns the [`WireType`] used to encode this type, ignoring the group
    /// encoding and packing.
    pub fn wire_type(&self) -> WireType {
        match self {
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::SixtyFourBit,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::ThirtyTwoBit,
            Kind::Enum(_)
            | Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Bool => WireType::Varint,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::LengthDelimited,
        }
    }

    /// Gets the storage category of this type.
    pub fn mapped_kind(&self) -> MappedKind {
        match self {
            Kind::Double => MappedKind::F64,
            Kind::Float => MappedKind::F32,
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MappedKind::I32,
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MappedKind::I64,
            Kind::Uint32 | Kind::Fixed32 => MappedKind::U32,
            Kind::Uint64 | Kind::Fixed64 => MappedKind::U64,
            Kind::Bool => MappedKind::Bool,
            Kind::String => MappedKind::String,
            Kind::Bytes => MappedKind::Bytes,
            Kind::Message(_) => MappedKind::Message,
            Kind::Enum(_) => MappedKind::Enum,
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double => write!(f, "double"),
            Self::Float => write!(f, "float"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::Uint32 => write!(f, "uint32"),
            Self::Uint64 => write!(f, "uint64"),
            Self::Sint32 => write!(f, "sint32"),
            Self::Sint64 => write!(f, "sint64"),
            Self::Fixed32 => write!(f, "fixed32"),
            Self::Fixed64 => write!(f, "fixed64"),
            Self::Sfixed32 => write!(f, "sfixed32"),
            Self::Sfixed64 => write!(f, "sfixed64"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::Message(m) => write!(f, "{}", m.full_name()),
            Self::Enum(e) => write!(f, "{}", e.full_name()),
        }
    }
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Syntax::Proto2 => write!(f, "proto2"),
            Syntax::Proto3 => write!(f, "proto3"),
        }
    }
}

impl KindIndex {
    fn is_packable(&self) -> bool {
        match self {
            KindIndex::Double
            | KindIndex::Float
            | KindIndex::Int32
            | KindIndex::Int64
            | KindIndex::Uint32
            | KindIndex::Uint64
            | KindIndex::Sint32
            | KindIndex::Sint64
            | KindIndex::Fixed32
            | KindIndex::Fixed64
            | KindIndex::Sfixed32
            | KindIndex::Sfixed64
            | KindIndex::Bool
            | KindIndex::Enum(_) => true,
            KindIndex::String | KindIndex::Bytes | KindIndex::Message(_) | KindIndex::Group(_) => {
                false
            }
        }
    }

    fn is_message(&self) -> bool {
        matches!(self, KindIndex::Message(_) | KindIndex::Group(_))
    }

    fn mapped_kind(&self) -> MappedKind {
        match self {
            KindIndex::Double => MappedKind::F64,
            KindIndex::Float => MappedKind::F32,
            KindIndex::Int32 | KindIndex::Sint32 | KindIndex::Sfixed32 => MappedKind::I32,
            KindIndex::Int64 | KindIndex::Sint64 | KindIndex::Sfixed64 => MappedKind::I64,
            KindIndex::Uint32 | KindIndex::Fixed32 => MappedKind::U32,
            KindIndex::Uint64 | KindIndex::Fixed64 => MappedKind::U64,
            KindIndex::Bool => MappedKind::Bool,
            KindIndex::String => MappedKind::String,
            KindIndex::Bytes => MappedKind::Bytes,
            KindIndex::Message(_) | KindIndex::Group(_) => MappedKind::Message,
            KindIndex::Enum(_) => MappedKind::Enum,
        }
    }
}

impl fmt::Debug for KindIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindIndex::Double => write!(f, "double"),
            KindIndex::Float => write!(f, "float"),
            KindIndex::Int32 => write!(f, "int32"),
            KindIndex::Int64 => write!(f, "int64"),
            KindIndex::Uint32 => write!(f, "uint32"),
            KindIndex::Uint64 => write!(f, "uint64"),
            KindIndex::Sint32 => write!(f, "sint32"),
            KindIndex::Sint64 => write!(f, "sint64"),
            KindIndex::Fixed32 => write!(f, "fixed32"),
            KindIndex::Fixed64 => write!(f, "fixed64"),
            KindIndex::Sfixed32 => write!(f, "sfixed32"),
            KindIndex::Sfixed64 => write!(f, "sfixed64"),
            KindIndex::Bool => write!(f, "bool"),
            KindIndex::String => write!(f, "string"),
            KindIndex::Bytes => write!(f, "bytes"),
            KindIndex::Message(_) | KindIndex::Group(_) => write!(f, "message"),
            KindIndex::Enum(_) => write!(f, "enum"),
        }
    }
}

fn to_index(i: usize) -> DescriptorIndex {
    i.try_into().expect("index too large")
}

#[test]
fn assert_descriptor_send_sync() {
    fn test_send_sync<T: Send + Sync>() {}

    test_send_sync::<DescriptorPool>();
    test_send_sync::<MessageDescriptor>();
    test_send_sync::<Kind>();
    test_send_sync::<DescriptorError>();
}
