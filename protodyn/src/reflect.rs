//! The adapter contract implemented by generated message types.

use prost::{DecodeError, Message};

use crate::{wire::CodedInput, DynamicBuilder, DynamicMessage, ExtensionRegistry, MessageDescriptor};

/// Trait for generated message types that support reflection.
///
/// Implementing this for a [`prost::Message`] type ties it to a
/// [`MessageDescriptor`], letting reflection-driven code treat generated and
/// dynamic messages uniformly: the provided methods transcode through the
/// wire format, and [`dynamic_eq`](ReflectMessage::dynamic_eq) is the shared
/// structural equality.
pub trait ReflectMessage: Message {
    /// Gets a [`MessageDescriptor`] describing the type of this message.
    fn descriptor(&self) -> MessageDescriptor;

    /// Converts this message into a [`DynamicMessage`], with extensions
    /// landing in the unknown field set.
    fn to_dynamic(&self) -> DynamicMessage
    where
        Self: Sized,
    {
        self.to_dynamic_with_extensions(ExtensionRegistry::empty())
    }

    /// Converts this message into a [`DynamicMessage`], resolving extension
    /// numbers through `registry`.
    fn to_dynamic_with_extensions(&self, registry: &ExtensionRegistry) -> DynamicMessage
    where
        Self: Sized,
    {
        let bytes = self.encode_to_vec();
        let mut builder = DynamicBuilder::new(self.descriptor());
        let mut input = CodedInput::new(&bytes);
        builder
            .merge_from(&mut input, registry)
            // This can only fail if `descriptor` returns a descriptor
            // incompatible with the actual serialized bytes.
            .expect("error converting to dynamic message");
        builder.build_partial()
    }

    /// Creates an instance of this message type from a [`DynamicMessage`].
    ///
    /// The conversion may fail if `dynamic` contains fields of an
    /// incompatible type.
    fn from_dynamic(dynamic: &DynamicMessage) -> Result<Self, DecodeError>
    where
        Self: Sized + Default,
    {
        Self::decode(dynamic.encode_to_vec().as_slice())
    }

    /// Structural equality between this message and a dynamic message,
    /// through the dynamic view.
    fn dynamic_eq(&self, dynamic: &DynamicMessage) -> bool
    where
        Self: Sized,
    {
        self.to_dynamic() == *dynamic
    }
}

impl<M> ReflectMessage for Box<M>
where
    M: ReflectMessage,
{
    fn descriptor(&self) -> MessageDescriptor {
        (**self).descriptor()
    }
}

#[test]
fn assert_object_safe() {
    fn _foo(_: Box<dyn ReflectMessage>) {}
}
