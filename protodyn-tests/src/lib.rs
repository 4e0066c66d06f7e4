use once_cell::sync::Lazy;
use prost_types::{
    descriptor_proto,
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, MessageOptions,
};
use protodyn::{DescriptorPool, ExtensionRegistry};

#[cfg(test)]
mod arbitrary;
#[cfg(test)]
mod dynamic;
#[cfg(test)]
mod extensions;
#[cfg(test)]
mod scenarios;

pub mod proto;

static TEST_POOL: Lazy<DescriptorPool> = Lazy::new(|| {
    DescriptorPool::from_file_descriptor_protos([test_file(), test2_file()])
        .expect("test descriptors are valid")
});

static TEST_REGISTRY: Lazy<ExtensionRegistry> = Lazy::new(|| {
    let mut registry = ExtensionRegistry::new();
    registry
        .register_pool(&TEST_POOL)
        .expect("test extensions are valid");
    registry
});

pub fn test_pool() -> DescriptorPool {
    TEST_POOL.clone()
}

pub fn test_registry() -> &'static ExtensionRegistry {
    &TEST_REGISTRY
}

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        r#type: Some(ty as i32),
        label: Some(label as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, Type::Message, label)
    }
}

fn scalar_fields(label: Label) -> Vec<FieldDescriptorProto> {
    vec![
        field("int32", 1, Type::Int32, label),
        field("int64", 2, Type::Int64, label),
        field("uint32", 3, Type::Uint32, label),
        field("uint64", 4, Type::Uint64, label),
        field("sint32", 5, Type::Sint32, label),
        field("sint64", 6, Type::Sint64, label),
        field("fixed32", 7, Type::Fixed32, label),
        field("fixed64", 8, Type::Fixed64, label),
        field("sfixed32", 9, Type::Sfixed32, label),
        field("sfixed64", 10, Type::Sfixed64, label),
        field("float", 11, Type::Float, label),
        field("double", 12, Type::Double, label),
        field("bool", 13, Type::Bool, label),
        field("string", 14, Type::String, label),
        field("bytes", 15, Type::Bytes, label),
    ]
}

fn test_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type: vec![
            DescriptorProto {
                name: Some("Scalars".to_owned()),
                field: scalar_fields(Label::Optional),
                ..Default::default()
            },
            DescriptorProto {
                name: Some("ScalarArrays".to_owned()),
                field: scalar_fields(Label::Repeated),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn test2_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test2.proto".to_owned()),
        package: Some("test2".to_owned()),
        syntax: Some("proto2".to_owned()),
        enum_type: vec![EnumDescriptorProto {
            name: Some("TestEnum".to_owned()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("ZERO".to_owned()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("ONE".to_owned()),
                    number: Some(1),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("TWO".to_owned()),
                    number: Some(2),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        message_type: vec![
            DescriptorProto {
                name: Some("Inner".to_owned()),
                field: vec![
                    field("id", 1, Type::Int32, Label::Required),
                    field("name", 2, Type::String, Label::Optional),
                ],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("Outer".to_owned()),
                field: vec![
                    message_field("inner", 1, ".test2.Inner", Label::Optional),
                    message_field("items", 2, ".test2.Inner", Label::Repeated),
                    field("plain", 3, Type::Int32, Label::Optional),
                    field("unpacked", 4, Type::Int32, Label::Repeated),
                    FieldDescriptorProto {
                        options: Some(FieldOptions {
                            packed: Some(true),
                            ..Default::default()
                        }),
                        ..field("packed", 5, Type::Int32, Label::Repeated)
                    },
                    FieldDescriptorProto {
                        type_name: Some(".test2.TestEnum".to_owned()),
                        ..field("enum_value", 6, Type::Enum, Label::Optional)
                    },
                    FieldDescriptorProto {
                        type_name: Some(".test2.Outer.MyGroup".to_owned()),
                        ..field("mygroup", 7, Type::Group, Label::Optional)
                    },
                ],
                nested_type: vec![DescriptorProto {
                    name: Some("MyGroup".to_owned()),
                    field: vec![field("a", 1, Type::Int32, Label::Optional)],
                    ..Default::default()
                }],
                extension_range: vec![descriptor_proto::ExtensionRange {
                    start: Some(100),
                    end: Some(200),
                    ..Default::default()
                }],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("PackedArrays".to_owned()),
                field: vec![FieldDescriptorProto {
                    options: Some(FieldOptions {
                        packed: Some(true),
                        ..Default::default()
                    }),
                    ..field("values", 5, Type::Int32, Label::Repeated)
                }],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("UnpackedArrays".to_owned()),
                field: vec![field("values", 5, Type::Int32, Label::Repeated)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("SetMessage".to_owned()),
                options: Some(MessageOptions {
                    message_set_wire_format: Some(true),
                    ..Default::default()
                }),
                extension_range: vec![descriptor_proto::ExtensionRange {
                    start: Some(4),
                    end: Some(2147483646),
                    ..Default::default()
                }],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("SetItem".to_owned()),
                field: vec![field("i", 1, Type::Int32, Label::Optional)],
                ..Default::default()
            },
        ],
        extension: vec![
            FieldDescriptorProto {
                extendee: Some(".test2.Outer".to_owned()),
                ..field("ext_string", 100, Type::String, Label::Optional)
            },
            FieldDescriptorProto {
                extendee: Some(".test2.Outer".to_owned()),
                ..message_field("ext_inner", 101, ".test2.Inner", Label::Optional)
            },
            FieldDescriptorProto {
                extendee: Some(".test2.Outer".to_owned()),
                ..field("ext_rep", 102, Type::Int32, Label::Repeated)
            },
            FieldDescriptorProto {
                extendee: Some(".test2.SetMessage".to_owned()),
                ..message_field("item_ext", 4, ".test2.SetItem", Label::Optional)
            },
        ],
        ..Default::default()
    }
}
