//! Hand-written stand-ins for protoc-generated message types, paired with
//! the descriptors in the test pool.

use protodyn::{MessageDescriptor, ReflectMessage};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Scalars {
    #[prost(int32, tag = "1")]
    pub int32: i32,
    #[prost(int64, tag = "2")]
    pub int64: i64,
    #[prost(uint32, tag = "3")]
    pub uint32: u32,
    #[prost(uint64, tag = "4")]
    pub uint64: u64,
    #[prost(sint32, tag = "5")]
    pub sint32: i32,
    #[prost(sint64, tag = "6")]
    pub sint64: i64,
    #[prost(fixed32, tag = "7")]
    pub fixed32: u32,
    #[prost(fixed64, tag = "8")]
    pub fixed64: u64,
    #[prost(sfixed32, tag = "9")]
    pub sfixed32: i32,
    #[prost(sfixed64, tag = "10")]
    pub sfixed64: i64,
    #[prost(float, tag = "11")]
    pub float: f32,
    #[prost(double, tag = "12")]
    pub double: f64,
    #[prost(bool, tag = "13")]
    pub bool: bool,
    #[prost(string, tag = "14")]
    pub string: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "15")]
    pub bytes: ::prost::bytes::Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScalarArrays {
    #[prost(int32, repeated, tag = "1")]
    pub int32: ::prost::alloc::vec::Vec<i32>,
    #[prost(sint64, repeated, tag = "6")]
    pub sint64: ::prost::alloc::vec::Vec<i64>,
    #[prost(fixed32, repeated, tag = "7")]
    pub fixed32: ::prost::alloc::vec::Vec<u32>,
    #[prost(double, repeated, tag = "12")]
    pub double: ::prost::alloc::vec::Vec<f64>,
    #[prost(bool, repeated, tag = "13")]
    pub bool: ::prost::alloc::vec::Vec<bool>,
    #[prost(string, repeated, tag = "14")]
    pub string: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

impl ReflectMessage for Scalars {
    fn descriptor(&self) -> MessageDescriptor {
        crate::test_pool()
            .get_message_by_name("test.Scalars")
            .unwrap()
    }
}

impl ReflectMessage for ScalarArrays {
    fn descriptor(&self) -> MessageDescriptor {
        crate::test_pool()
            .get_message_by_name("test.ScalarArrays")
            .unwrap()
    }
}
