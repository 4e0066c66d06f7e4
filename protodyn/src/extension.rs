//! Runtime lookup of extension fields during parsing.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

use crate::{DescriptorError, DescriptorPool, FieldDescriptor};

/// A table of extension fields, keyed by the extended message's full name
/// and the field number.
///
/// A registry is an input to parsing: extension numbers that do not resolve
/// land in the message's unknown field set. The
/// [`empty`](ExtensionRegistry::empty) registry resolves nothing.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    extensions: HashMap<Box<str>, BTreeMap<u32, FieldDescriptor>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    /// Gets a shared registry that resolves nothing.
    pub fn empty() -> &'static ExtensionRegistry {
        static EMPTY: Lazy<ExtensionRegistry> = Lazy::new(ExtensionRegistry::new);
        &EMPTY
    }

    /// Registers an extension field.
    ///
    /// Fails when the descriptor is not an extension, or when an extension
    /// of the same message with the same number is already registered.
    pub fn register(&mut self, extension: FieldDescriptor) -> Result<(), DescriptorError> {
        if !extension.is_extension() {
            return Err(DescriptorError::not_an_extension(extension.full_name()));
        }
        let extendee = extension.containing_message();
        let by_number = self
            .extensions
            .entry(extendee.full_name().into())
            .or_default();
        if by_number.contains_key(&extension.number()) {
            return Err(DescriptorError::duplicate_extension(
                extendee.full_name(),
                extension.number(),
            ));
        }
        by_number.insert(extension.number(), extension);
        Ok(())
    }

    /// Registers every extension declared in a [`DescriptorPool`].
    pub fn register_pool(&mut self, pool: &DescriptorPool) -> Result<(), DescriptorError> {
        for extension in pool.extensions() {
            self.register(extension)?;
        }
        Ok(())
    }

    /// Looks up the extension of `containing_type` with the given number.
    pub fn find(&self, containing_type: &str, number: u32) -> Option<&FieldDescriptor> {
        self.extensions
            .get(containing_type)
            .and_then(|by_number| by_number.get(&number))
    }
}
