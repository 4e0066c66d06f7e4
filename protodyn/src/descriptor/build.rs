//! Construction of a [`DescriptorPool`] from compiler-produced file
//! descriptors.
//!
//! Building happens in two passes: the first registers every message and
//! enum type by full name, the second resolves field type references,
//! defaults and extensions against the registered names. Type references
//! must be fully qualified (a leading dot is accepted), as produced by the
//! protobuf compiler.

use std::{collections::HashMap, mem::take, sync::Arc};

use bytes::Bytes;
use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};

use super::{
    to_index, Cardinality, Definition, DefaultValue, DescriptorError, DescriptorPool,
    DescriptorPoolInner, EnumIndex, EnumInner, EnumValueInner, FieldIndex, FieldInner, Identity,
    KindIndex, MessageIndex, MessageInner, Syntax,
};

impl DescriptorPool {
    /// Builds a pool from a collection of file descriptors.
    ///
    /// All types referenced by the files must be defined within them;
    /// references are resolved by full name.
    pub fn from_file_descriptor_protos<I>(files: I) -> Result<DescriptorPool, DescriptorError>
    where
        I: IntoIterator<Item = FileDescriptorProto>,
    {
        let files: Vec<_> = files.into_iter().collect();

        let mut builder = PoolBuilder::default();
        for file in &files {
            builder.collect_file(file)?;
        }
        builder.resolve()?;

        Ok(DescriptorPool {
            inner: Arc::new(builder.inner),
        })
    }

    /// Builds a pool from a single file descriptor.
    pub fn from_file_descriptor_proto(
        file: FileDescriptorProto,
    ) -> Result<DescriptorPool, DescriptorError> {
        DescriptorPool::from_file_descriptor_protos([file])
    }
}

#[derive(Default)]
struct PoolBuilder<'a> {
    inner: DescriptorPoolInner,
    pending_messages: Vec<(&'a DescriptorProto, MessageIndex)>,
    pending_extensions: Vec<(&'a FieldDescriptorProto, String)>,
}

impl<'a> PoolBuilder<'a> {
    fn collect_file(&mut self, file: &'a FileDescriptorProto) -> Result<(), DescriptorError> {
        let syntax = match file.syntax.as_deref() {
            None | Some("") | Some("proto2") => Syntax::Proto2,
            Some("proto3") => Syntax::Proto3,
            Some(other) => return Err(DescriptorError::unknown_syntax(other)),
        };

        let package = file.package();
        for message in &file.message_type {
            self.collect_message(package, message, None, syntax)?;
        }
        for enum_proto in &file.enum_type {
            self.collect_enum(package, enum_proto)?;
        }
        for extension in &file.extension {
            self.pending_extensions.push((extension, package.to_owned()));
        }
        Ok(())
    }

    fn collect_message(
        &mut self,
        scope: &str,
        proto: &'a DescriptorProto,
        parent: Option<MessageIndex>,
        syntax: Syntax,
    ) -> Result<MessageIndex, DescriptorError> {
        let full_name = join_name(scope, proto.name());
        let index = to_index(self.inner.messages.len());
        self.register_name(&full_name, Definition::Message(index))?;

        self.inner.messages.push(MessageInner {
            id: Identity::new(full_name.clone(), proto.name()),
            syntax,
            parent,
            fields: Vec::new(),
            field_numbers: Default::default(),
            field_names: Default::default(),
            extensions: Vec::new(),
            extension_ranges: proto
                .extension_range
                .iter()
                .map(|range| range.start() as u32..range.end() as u32)
                .collect(),
            message_set_wire_format: proto
                .options
                .as_ref()
                .map_or(false, |options| options.message_set_wire_format()),
        });
        self.pending_messages.push((proto, index));

        for nested in &proto.nested_type {
            self.collect_message(&full_name, nested, Some(index), syntax)?;
        }
        for enum_proto in &proto.enum_type {
            self.collect_enum(&full_name, enum_proto)?;
        }
        for extension in &proto.extension {
            self.pending_extensions.push((extension, full_name.clone()));
        }
        Ok(index)
    }

    fn collect_enum(
        &mut self,
        scope: &str,
        proto: &'a EnumDescriptorProto,
    ) -> Result<EnumIndex, DescriptorError> {
        let full_name = join_name(scope, proto.name());
        let index = to_index(self.inner.enums.len());
        self.register_name(&full_name, Definition::Enum(index))?;

        if proto.value.is_empty() {
            return Err(DescriptorError::empty_enum(full_name));
        }

        let values: Vec<_> = proto
            .value
            .iter()
            .map(|value| EnumValueInner {
                // Enum values live in the scope enclosing the enum.
                id: Identity::new(join_name(scope, value.name()), value.name()),
                number: value.number(),
            })
            .collect();
        let value_names: HashMap<_, _> = proto
            .value
            .iter()
            .enumerate()
            .map(|(value_index, value)| (value.name().into(), to_index(value_index)))
            .collect();

        self.inner.enums.push(EnumInner {
            id: Identity::new(full_name, proto.name()),
            values,
            value_names,
        });
        Ok(index)
    }

    fn register_name(&mut self, name: &str, definition: Definition) -> Result<(), DescriptorError> {
        if self.inner.names.insert(name.into(), definition).is_some() {
            return Err(DescriptorError::type_already_exists(name));
        }
        Ok(())
    }

    fn resolve(&mut self) -> Result<(), DescriptorError> {
        for (proto, message_index) in take(&mut self.pending_messages) {
            for field_proto in &proto.field {
                let field_index = self.build_field(field_proto, message_index, None)?;
                let number = self.inner.fields[field_index as usize].number;
                let name: Box<str> = field_proto.name().into();

                let message = &mut self.inner.messages[message_index as usize];
                message.field_numbers.insert(number, field_index);
                message.field_names.insert(name, field_index);
            }
            let message = &mut self.inner.messages[message_index as usize];
            message.fields = message.field_numbers.values().copied().collect();
        }

        for (field_proto, scope) in take(&mut self.pending_extensions) {
            let extendee = self.resolve_message(field_proto.extendee())?;
            let field_index = self.build_field(field_proto, extendee, Some(&scope))?;
            self.inner.messages[extendee as usize]
                .extensions
                .push(field_index);
        }
        Ok(())
    }

    fn build_field(
        &mut self,
        proto: &FieldDescriptorProto,
        containing: MessageIndex,
        extension_scope: Option<&str>,
    ) -> Result<FieldIndex, DescriptorError> {
        let is_extension = extension_scope.is_some();
        let full_name = match extension_scope {
            Some(scope) => join_name(scope, proto.name()),
            None => join_name(
                self.inner.messages[containing as usize].id.full_name(),
                proto.name(),
            ),
        };

        let cardinality = match proto.label() {
            Label::Optional => Cardinality::Optional,
            Label::Required => Cardinality::Required,
            Label::Repeated => Cardinality::Repeated,
        };
        let kind = self.kind_index(proto)?;
        let syntax = self.inner.messages[containing as usize].syntax;

        let is_packed = cardinality == Cardinality::Repeated
            && kind.is_packable()
            && match proto.options.as_ref().and_then(|options| options.packed) {
                Some(packed) => packed,
                // Packed is the proto3 default; extensions keep the explicit
                // proto2 behavior.
                None => !is_extension && syntax == Syntax::Proto3,
            };

        let supports_presence = cardinality != Cardinality::Repeated
            && (is_extension
                || kind.is_message()
                || proto.proto3_optional()
                || syntax == Syntax::Proto2);

        let default = match proto.default_value.as_deref() {
            Some(value) => Some(self.parse_default(kind, value, &full_name)?),
            None => None,
        };

        let index = to_index(self.inner.fields.len());
        self.inner.fields.push(FieldInner {
            id: Identity::new(full_name, proto.name()),
            number: proto.number() as u32,
            kind,
            cardinality,
            is_packed,
            is_group: proto.r#type() == Type::Group,
            is_extension,
            supports_presence,
            containing,
            default,
        });
        Ok(index)
    }

    fn kind_index(&self, proto: &FieldDescriptorProto) -> Result<KindIndex, DescriptorError> {
        let kind = match proto.r#type() {
            Type::Double => KindIndex::Double,
            Type::Float => KindIndex::Float,
            Type::Int32 => KindIndex::Int32,
            Type::Int64 => KindIndex::Int64,
            Type::Uint32 => KindIndex::Uint32,
            Type::Uint64 => KindIndex::Uint64,
            Type::Sint32 => KindIndex::Sint32,
            Type::Sint64 => KindIndex::Sint64,
            Type::Fixed32 => KindIndex::Fixed32,
            Type::Fixed64 => KindIndex::Fixed64,
            Type::Sfixed32 => KindIndex::Sfixed32,
            Type::Sfixed64 => KindIndex::Sfixed64,
            Type::Bool => KindIndex::Bool,
            Type::String => KindIndex::String,
            Type::Bytes => KindIndex::Bytes,
            Type::Message => KindIndex::Message(self.resolve_message(proto.type_name())?),
            Type::Group => KindIndex::Group(self.resolve_message(proto.type_name())?),
            Type::Enum => KindIndex::Enum(self.resolve_enum(proto.type_name())?),
        };
        Ok(kind)
    }

    fn resolve_message(&self, name: &str) -> Result<MessageIndex, DescriptorError> {
        match self.inner.get_definition(name) {
            Some(Definition::Message(index)) => Ok(index),
            _ => Err(DescriptorError::type_not_found(name)),
        }
    }

    fn resolve_enum(&self, name: &str) -> Result<EnumIndex, DescriptorError> {
        match self.inner.get_definition(name) {
            Some(Definition::Enum(index)) => Ok(index),
            _ => Err(DescriptorError::type_not_found(name)),
        }
    }

    fn parse_default(
        &self,
        kind: KindIndex,
        value: &str,
        field: &str,
    ) -> Result<DefaultValue, DescriptorError> {
        let parsed = match kind {
            KindIndex::Bool => value.parse().map(DefaultValue::Bool).ok(),
            KindIndex::Int32 | KindIndex::Sint32 | KindIndex::Sfixed32 => {
                value.parse().map(DefaultValue::I32).ok()
            }
            KindIndex::Int64 | KindIndex::Sint64 | KindIndex::Sfixed64 => {
                value.parse().map(DefaultValue::I64).ok()
            }
            KindIndex::Uint32 | KindIndex::Fixed32 => value.parse().map(DefaultValue::U32).ok(),
            KindIndex::Uint64 | KindIndex::Fixed64 => value.parse().map(DefaultValue::U64).ok(),
            KindIndex::Float => value.parse().map(DefaultValue::F32).ok(),
            KindIndex::Double => value.parse().map(DefaultValue::F64).ok(),
            KindIndex::String => Some(DefaultValue::String(value.into())),
            KindIndex::Bytes => unescape_c_escape_string(value).map(DefaultValue::Bytes).ok(),
            KindIndex::Enum(enum_index) => {
                let enum_inner = &self.inner.enums[enum_index as usize];
                enum_inner
                    .value_names
                    .get(value)
                    .map(|&value_index| {
                        DefaultValue::Enum(enum_inner.values[value_index as usize].number)
                    })
            }
            KindIndex::Message(_) | KindIndex::Group(_) => None,
        };
        parsed.ok_or_else(|| DescriptorError::invalid_field_default(field, value))
    }
}

fn join_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", scope, name)
    }
}

/// Based on `google::protobuf::UnescapeCEscapeString`, which produces the
/// `default_value` strings for bytes fields in descriptor protos.
fn unescape_c_escape_string(s: &str) -> Result<Bytes, &'static str> {
    let src = s.as_bytes();
    let len = src.len();
    let mut dst = Vec::new();

    let mut p = 0;

    while p < len {
        if src[p] != b'\\' {
            dst.push(src[p]);
            p += 1;
        } else {
            p += 1;
            if p == len {
                return Err("missing escape character");
            }
            match src[p] {
                b'a' => {
                    dst.push(0x07);
                    p += 1;
                }
                b'b' => {
                    dst.push(0x08);
                    p += 1;
                }
                b'f' => {
                    dst.push(0x0C);
                    p += 1;
                }
                b'n' => {
                    dst.push(0x0A);
                    p += 1;
                }
                b'r' => {
                    dst.push(0x0D);
                    p += 1;
                }
                b't' => {
                    dst.push(0x09);
                    p += 1;
                }
                b'v' => {
                    dst.push(0x0B);
                    p += 1;
                }
                b'\\' => {
                    dst.push(0x5C);
                    p += 1;
                }
                b'?' => {
                    dst.push(0x3F);
                    p += 1;
                }
                b'\'' => {
                    dst.push(0x27);
                    p += 1;
                }
                b'"' => {
                    dst.push(0x22);
                    p += 1;
                }
                b'0'..=b'7' => {
                    let mut octal = 0;
                    for _ in 0..3 {
                        if p < len && src[p] >= b'0' && src[p] <= b'7' {
                            octal = octal * 8 + (src[p] - b'0');
                            p += 1;
                        } else {
                            break;
                        }
                    }
                    dst.push(octal);
                }
                b'x' | b'X' => {
                    if p + 3 > len {
                        return Err("hex escape must contain two characters");
                    }
                    match u8::from_str_radix(&s[p + 1..p + 3], 16) {
                        Ok(b) => dst.push(b),
                        _ => return Err("invalid hex escape"),
                    }
                    p += 3;
                }
                _ => return Err("invalid escape character"),
            }
        }
    }
    Ok(dst.into())
}
