//! This crate provides a descriptor-driven dynamic runtime for protobuf
//! messages. It is useful when the protobuf type definition is not known
//! ahead of time.
//!
//! The main entry points into the API of this crate are:
//! - [`DescriptorPool`] wraps the file descriptors output by the protobuf
//!   compiler to provide an API for inspecting type definitions.
//! - [`DynamicBuilder`] and [`DynamicMessage`] provide construction,
//!   encoding, decoding and reflection of an arbitrary protobuf message
//!   definition described by a [`MessageDescriptor`]. A builder is the
//!   mutable phase; building freezes it into a message that can be shared
//!   between threads.
//! - [`FieldSet`] is the type-verified field storage beneath dynamic
//!   messages, also usable standalone for extension sets.
//!
//! # Example - decoding
//!
//! ```
//! use prost_types::{field_descriptor_proto, DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
//! use protodyn::{DescriptorPool, DynamicMessage, Value};
//!
//! let file = FileDescriptorProto {
//!     name: Some("example.proto".to_owned()),
//!     package: Some("example".to_owned()),
//!     message_type: vec![DescriptorProto {
//!         name: Some("MyMessage".to_owned()),
//!         field: vec![FieldDescriptorProto {
//!             name: Some("foo".to_owned()),
//!             number: Some(1),
//!             r#type: Some(field_descriptor_proto::Type::Int32 as i32),
//!             label: Some(field_descriptor_proto::Label::Optional as i32),
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }],
//!     syntax: Some("proto3".to_owned()),
//!     ..Default::default()
//! };
//! let pool = DescriptorPool::from_file_descriptor_proto(file).unwrap();
//! let message_descriptor = pool.get_message_by_name("example.MyMessage").unwrap();
//!
//! let message = DynamicMessage::parse(message_descriptor, b"\x08\x96\x01").unwrap();
//! assert_eq!(message.get_field_by_name("foo").unwrap().as_ref(), &Value::I32(150));
//! ```
#![warn(missing_debug_implementations, missing_docs)]

mod descriptor;
mod dynamic;
mod error;
mod extension;
mod reflect;
pub mod wire;

pub use self::descriptor::{
    Cardinality, DescriptorError, DescriptorPool, EnumDescriptor, EnumValueDescriptor,
    FieldDescriptor, Kind, MappedKind, MessageDescriptor, Syntax,
};
pub use self::dynamic::{
    DynamicBuilder, DynamicMessage, FieldSet, FieldSetBuilder, UnknownField, UnknownFieldSet,
    UnknownFieldSetBuilder, Value,
};
pub use self::error::{AccessError, ParseError, UninitializedMessage};
pub use self::extension::ExtensionRegistry;
pub use self::reflect::ReflectMessage;
