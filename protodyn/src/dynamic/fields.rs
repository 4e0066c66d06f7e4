//! The typed field storage beneath dynamic messages and extension sets.
//!
//! A field set maps field numbers to `(FieldDescriptor, Value)` entries.
//! [`FieldSetBuilder`] is the mutable phase; [`FieldSetBuilder::build`]
//! consumes it and produces the frozen [`FieldSet`], so mutation of a frozen
//! set is not expressible. Iteration and encoding are in ascending field
//! number order, which is the canonical serialization order.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

use bytes::BufMut;

use crate::{AccessError, FieldDescriptor, MappedKind, MessageDescriptor, Value};

#[derive(Debug, Clone, PartialEq)]
struct FieldSetEntry {
    field: FieldDescriptor,
    value: Value,
}

/// A frozen, type-verified map from field descriptors to values.
///
/// Safe to share between threads: the map is read-only and every contained
/// sub-message is itself frozen.
#[derive(Debug, Default, Clone)]
pub struct FieldSet {
    entries: BTreeMap<u32, FieldSetEntry>,
}

/// The mutable phase of a [`FieldSet`].
///
/// Every mutation verifies the value against the field's descriptor before
/// storing it. Building consumes the builder, freezing the entries.
#[derive(Debug, Default, Clone)]
pub struct FieldSetBuilder {
    entries: BTreeMap<u32, FieldSetEntry>,
}

fn entry_is_populated(entry: &FieldSetEntry) -> bool {
    match &entry.value {
        Value::List(values) => !values.is_empty(),
        value => entry.field.supports_presence() || !value.is_default_for_field(&entry.field),
    }
}

fn get_entry<'a>(
    entries: &'a BTreeMap<u32, FieldSetEntry>,
    field: &FieldDescriptor,
) -> Option<Cow<'a, Value>> {
    match entries.get(&field.number()) {
        Some(entry) => Some(Cow::Borrowed(&entry.value)),
        None if !field.is_repeated() && field.mapped_kind() == MappedKind::Message => None,
        None => Some(Cow::Owned(Value::default_value_for_field(field))),
    }
}

fn has_entry(
    entries: &BTreeMap<u32, FieldSetEntry>,
    field: &FieldDescriptor,
) -> Result<bool, AccessError> {
    if field.is_repeated() {
        return Err(AccessError::not_singular(field));
    }
    Ok(entries
        .get(&field.number())
        .map_or(false, entry_is_populated))
}

fn repeated_len_entry(
    entries: &BTreeMap<u32, FieldSetEntry>,
    field: &FieldDescriptor,
) -> Result<usize, AccessError> {
    if !field.is_repeated() {
        return Err(AccessError::not_repeated(field));
    }
    Ok(entries
        .get(&field.number())
        .and_then(|entry| entry.value.as_list())
        .map_or(0, <[Value]>::len))
}

impl FieldSet {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Gets the value of a field.
    ///
    /// An unset singular scalar yields its descriptor's default, an unset
    /// repeated field yields an empty list, and an unset singular message
    /// yields `None`.
    pub fn get(&self, field: &FieldDescriptor) -> Option<Cow<'_, Value>> {
        get_entry(&self.entries, field)
    }

    /// Returns `true` if the singular field is set.
    ///
    /// For fields without explicit presence this reports whether the stored
    /// value differs from the default. Fails with [`AccessError`] on a
    /// repeated field.
    pub fn has(&self, field: &FieldDescriptor) -> Result<bool, AccessError> {
        has_entry(&self.entries, field)
    }

    /// Gets the number of elements of a repeated field, `0` when unset.
    ///
    /// Fails with [`AccessError`] on a singular field.
    pub fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, AccessError> {
        repeated_len_entry(&self.entries, field)
    }

    /// Gets an iterator over the set fields in ascending field number order.
    ///
    /// Unset singular fields and empty repeated fields are omitted.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.entries
            .values()
            .filter(|entry| entry_is_populated(entry))
            .map(|entry| (&entry.field, &entry.value))
    }

    /// Returns `true` if every message contained in this set reports
    /// initialized.
    ///
    /// This does not check required fields of the containing message itself;
    /// see [`is_fully_initialized`](FieldSet::is_fully_initialized).
    pub fn is_initialized(&self) -> bool {
        self.entries.values().all(|entry| match &entry.value {
            Value::Message(message) => message.is_initialized(),
            Value::List(values) => values.iter().all(|value| match value {
                Value::Message(message) => message.is_initialized(),
                _ => true,
            }),
            _ => true,
        })
    }

    /// Returns `true` if every `required` field of `desc` is set and
    /// [`is_initialized`](FieldSet::is_initialized) holds.
    pub fn is_fully_initialized(&self, desc: &MessageDescriptor) -> bool {
        desc.fields()
            .filter(|field| field.is_required())
            .all(|field| self.has(&field).unwrap_or(false))
            && self.is_initialized()
    }

    /// Encodes the set fields in ascending field number order.
    pub fn encode<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        for (field, value) in self.iter() {
            value.encode_field(field, buf);
        }
    }

    /// Gets the exact number of bytes [`encode`](FieldSet::encode) produces.
    ///
    /// Computed on every call; sizes are never cached.
    pub fn encoded_len(&self) -> usize {
        self.iter()
            .map(|(field, value)| value.encoded_len_field(field))
            .sum()
    }

    /// Creates a builder seeded with a copy of this set.
    pub fn to_builder(&self) -> FieldSetBuilder {
        FieldSetBuilder {
            entries: self.entries.clone(),
        }
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Hash for FieldSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (field, value) in self.iter() {
            field.number().hash(state);
            value.hash(state);
        }
    }
}

impl FieldSetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        FieldSetBuilder::default()
    }

    /// Freezes the builder into a [`FieldSet`].
    pub fn build(self) -> FieldSet {
        FieldSet {
            entries: self.entries,
        }
    }

    /// Gets the value of a field. See [`FieldSet::get`].
    pub fn get(&self, field: &FieldDescriptor) -> Option<Cow<'_, Value>> {
        get_entry(&self.entries, field)
    }

    /// Returns `true` if the singular field is set. See [`FieldSet::has`].
    pub fn has(&self, field: &FieldDescriptor) -> Result<bool, AccessError> {
        has_entry(&self.entries, field)
    }

    /// Gets the number of elements of a repeated field. See
    /// [`FieldSet::repeated_len`].
    pub fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, AccessError> {
        repeated_len_entry(&self.entries, field)
    }

    /// Sets the value of a field.
    ///
    /// The value must match the field's type and cardinality: a repeated
    /// field takes a list whose every element matches the element type. The
    /// stored value is owned by the set; the caller keeps no handle to it.
    pub fn set(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), AccessError> {
        if !value.is_valid_for_field(field) {
            return Err(AccessError::type_mismatch(field, &value));
        }
        self.insert_unverified(field, value);
        Ok(())
    }

    /// Appends a value to a repeated field, creating it on first use.
    pub fn add_repeated(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), AccessError> {
        if !field.is_repeated() {
            return Err(AccessError::not_repeated(field));
        }
        if !value.is_valid(&field.kind()) {
            return Err(AccessError::type_mismatch(field, &value));
        }
        self.add_repeated_unverified(field, value);
        Ok(())
    }

    /// Replaces the element at `index` of a repeated field.
    ///
    /// Fails with [`AccessError`] when the field is not repeated, when it is
    /// unset, or when `index` is past the last element.
    pub fn set_repeated(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), AccessError> {
        if !field.is_repeated() {
            return Err(AccessError::not_repeated(field));
        }
        if !value.is_valid(&field.kind()) {
            return Err(AccessError::type_mismatch(field, &value));
        }
        let values = match self.entries.get_mut(&field.number()) {
            Some(entry) => entry
                .value
                .as_list_mut()
                .expect("repeated fields always store lists"),
            None => return Err(AccessError::out_of_range(field, index, 0)),
        };
        if index >= values.len() {
            return Err(AccessError::out_of_range(field, index, values.len()));
        }
        values[index] = value;
        Ok(())
    }

    /// Removes a field from the set.
    pub fn clear(&mut self, field: &FieldDescriptor) {
        self.entries.remove(&field.number());
    }

    /// Merges another set into this one.
    ///
    /// Repeated fields are concatenated. A singular message present on both
    /// sides is merged recursively. Any other singular field is overwritten
    /// with `other`'s value.
    pub fn merge_from(&mut self, other: &FieldSet) {
        for (number, entry) in &other.entries {
            match self.entries.get_mut(number) {
                None => {
                    self.entries.insert(*number, entry.clone());
                }
                Some(existing) => {
                    if entry.field.is_repeated() {
                        let source = entry
                            .value
                            .as_list()
                            .expect("repeated fields always store lists");
                        existing
                            .value
                            .as_list_mut()
                            .expect("repeated fields always store lists")
                            .extend(source.iter().cloned());
                    } else if let (Value::Message(target), Value::Message(source)) =
                        (&existing.value, &entry.value)
                    {
                        let mut sub = target.to_builder();
                        sub.merge_from_message(source);
                        existing.value = Value::Message(sub.build_partial());
                    } else {
                        existing.value = entry.value.clone();
                    }
                }
            }
        }
    }

    pub(crate) fn get_raw(&self, number: u32) -> Option<&Value> {
        self.entries.get(&number).map(|entry| &entry.value)
    }

    pub(crate) fn insert_unverified(&mut self, field: &FieldDescriptor, value: Value) {
        debug_assert!(
            value.is_valid_for_field(field),
            "invalid value {:?} for field {:?}",
            value,
            field,
        );
        self.entries.insert(
            field.number(),
            FieldSetEntry {
                field: field.clone(),
                value,
            },
        );
    }

    pub(crate) fn add_repeated_unverified(&mut self, field: &FieldDescriptor, value: Value) {
        debug_assert!(
            value.is_valid(&field.kind()),
            "invalid value {:?} for field {:?}",
            value,
            field,
        );
        let entry = self
            .entries
            .entry(field.number())
            .or_insert_with(|| FieldSetEntry {
                field: field.clone(),
                value: Value::List(Vec::new()),
            });
        entry
            .value
            .as_list_mut()
            .expect("repeated fields always store lists")
            .push(value);
    }
}
