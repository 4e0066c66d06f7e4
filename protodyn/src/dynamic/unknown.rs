//! Preservation of fields that are present on the wire but not known to the
//! receiving descriptor.

use std::collections::{btree_map, BTreeMap};

use bytes::{BufMut, Bytes};
use prost::{
    encoding::{self, encoded_len_varint, key_len, WireType},
    DecodeError,
};

use crate::wire::CodedInput;

/// A frozen set of fields preserved verbatim from the wire, indexed by field
/// number.
///
/// A field is unknown if the receiving message descriptor (and extension
/// registry) does not define a field with its number. Unknown fields survive
/// a decode/encode round trip exactly.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct UnknownFieldSet {
    fields: BTreeMap<u32, UnknownField>,
}

/// The values preserved for a single unknown field number, grouped by wire
/// type in the order they were seen.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct UnknownField {
    varints: Vec<u64>,
    fixed32s: Vec<u32>,
    fixed64s: Vec<u64>,
    length_delimited: Vec<Bytes>,
    groups: Vec<UnknownFieldSet>,
}

/// The mutable phase of an [`UnknownFieldSet`]. Building produces the frozen
/// set.
#[derive(Debug, Default, Clone)]
pub struct UnknownFieldSetBuilder {
    fields: BTreeMap<u32, UnknownField>,
}

impl UnknownField {
    /// The varint values seen for this number.
    pub fn varints(&self) -> &[u64] {
        &self.varints
    }

    /// The fixed 32-bit values seen for this number.
    pub fn fixed32s(&self) -> &[u32] {
        &self.fixed32s
    }

    /// The fixed 64-bit values seen for this number.
    pub fn fixed64s(&self) -> &[u64] {
        &self.fixed64s
    }

    /// The length-delimited payloads seen for this number.
    pub fn length_delimited(&self) -> &[Bytes] {
        &self.length_delimited
    }

    /// The groups seen for this number.
    pub fn groups(&self) -> &[UnknownFieldSet] {
        &self.groups
    }

    fn encode<B>(&self, number: u32, buf: &mut B)
    where
        B: BufMut,
    {
        for &value in &self.varints {
            encoding::encode_key(number, WireType::Varint, buf);
            encoding::encode_varint(value, buf);
        }
        for &value in &self.fixed32s {
            encoding::encode_key(number, WireType::ThirtyTwoBit, buf);
            buf.put_u32_le(value);
        }
        for &value in &self.fixed64s {
            encoding::encode_key(number, WireType::SixtyFourBit, buf);
            buf.put_u64_le(value);
        }
        for value in &self.length_delimited {
            encoding::bytes::encode(number, value, buf);
        }
        for group in &self.groups {
            encoding::encode_key(number, WireType::StartGroup, buf);
            group.encode(buf);
            encoding::encode_key(number, WireType::EndGroup, buf);
        }
    }

    fn encoded_len(&self, number: u32) -> usize {
        let key_len = key_len(number);
        self.varints
            .iter()
            .map(|&value| key_len + encoded_len_varint(value))
            .sum::<usize>()
            + self.fixed32s.len() * (key_len + 4)
            + self.fixed64s.len() * (key_len + 8)
            + self
                .length_delimited
                .iter()
                .map(|value| key_len + encoded_len_varint(value.len() as u64) + value.len())
                .sum::<usize>()
            + self
                .groups
                .iter()
                .map(|group| key_len * 2 + group.encoded_len())
                .sum::<usize>()
    }

    fn merge(&mut self, other: &UnknownField) {
        self.varints.extend_from_slice(&other.varints);
        self.fixed32s.extend_from_slice(&other.fixed32s);
        self.fixed64s.extend_from_slice(&other.fixed64s);
        self.length_delimited
            .extend(other.length_delimited.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
    }
}

impl UnknownFieldSet {
    /// Returns `true` if no fields are preserved.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Gets the values preserved for a field number.
    pub fn get(&self, number: u32) -> Option<&UnknownField> {
        self.fields.get(&number)
    }

    /// Gets an iterator over the preserved fields in ascending number order.
    pub fn iter(&self) -> btree_map::Iter<'_, u32, UnknownField> {
        self.fields.iter()
    }

    /// Creates a builder seeded with a copy of this set.
    pub fn to_builder(&self) -> UnknownFieldSetBuilder {
        UnknownFieldSetBuilder {
            fields: self.fields.clone(),
        }
    }

    /// Encodes the set: ascending field number, and for each number the
    /// varints, fixed 32-bit values, fixed 64-bit values, length-delimited
    /// payloads and groups, in that order.
    pub fn encode<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        for (&number, field) in &self.fields {
            field.encode(number, buf);
        }
    }

    /// Gets the exact number of bytes [`encode`](UnknownFieldSet::encode)
    /// produces.
    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(&number, field)| field.encoded_len(number))
            .sum()
    }

    /// Encodes the set for a message using the message-set wire format:
    /// length-delimited payloads become group-framed items keyed by their
    /// field number as the type id. Values with other wire types cannot be
    /// represented as items and keep the plain encoding.
    pub(crate) fn encode_message_set<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        for (&number, field) in &self.fields {
            for &value in &field.varints {
                encoding::encode_key(number, WireType::Varint, buf);
                encoding::encode_varint(value, buf);
            }
            for &value in &field.fixed32s {
                encoding::encode_key(number, WireType::ThirtyTwoBit, buf);
                buf.put_u32_le(value);
            }
            for &value in &field.fixed64s {
                encoding::encode_key(number, WireType::SixtyFourBit, buf);
                buf.put_u64_le(value);
            }
            for payload in &field.length_delimited {
                crate::wire::encode_message_set_item(number, payload.len(), buf, |buf| {
                    buf.put_slice(payload)
                });
            }
            for group in &field.groups {
                encoding::encode_key(number, WireType::StartGroup, buf);
                group.encode(buf);
                encoding::encode_key(number, WireType::EndGroup, buf);
            }
        }
    }

    /// Size mirror of [`encode_message_set`](UnknownFieldSet::encode_message_set).
    pub(crate) fn message_set_encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(&number, field)| {
                let plain = field.encoded_len(number);
                let ld_plain: usize = field
                    .length_delimited
                    .iter()
                    .map(|value| key_len(number) + encoded_len_varint(value.len() as u64) + value.len())
                    .sum();
                let ld_items: usize = field
                    .length_delimited
                    .iter()
                    .map(|value| crate::wire::message_set_item_len(number, value.len()))
                    .sum();
                plain - ld_plain + ld_items
            })
            .sum()
    }
}

impl UnknownFieldSetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        UnknownFieldSetBuilder::default()
    }

    /// Freezes the builder into an [`UnknownFieldSet`].
    pub fn build(self) -> UnknownFieldSet {
        UnknownFieldSet {
            fields: self.fields,
        }
    }

    /// Returns `true` if no fields have been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field_mut(&mut self, number: u32) -> &mut UnknownField {
        self.fields.entry(number).or_default()
    }

    /// Records a varint value for `number`.
    pub fn merge_varint(&mut self, number: u32, value: u64) {
        self.field_mut(number).varints.push(value);
    }

    /// Records a fixed 32-bit value for `number`.
    pub fn merge_fixed32(&mut self, number: u32, value: u32) {
        self.field_mut(number).fixed32s.push(value);
    }

    /// Records a fixed 64-bit value for `number`.
    pub fn merge_fixed64(&mut self, number: u32, value: u64) {
        self.field_mut(number).fixed64s.push(value);
    }

    /// Records a length-delimited payload for `number`.
    pub fn merge_length_delimited(&mut self, number: u32, value: Bytes) {
        self.field_mut(number).length_delimited.push(value);
    }

    /// Records a group for `number`.
    pub fn merge_group(&mut self, number: u32, group: UnknownFieldSet) {
        self.field_mut(number).groups.push(group);
    }

    /// Appends every value of `other` to this builder, preserving order
    /// within each category.
    pub fn merge_from(&mut self, other: &UnknownFieldSet) {
        for (&number, field) in &other.fields {
            self.field_mut(number).merge(field);
        }
    }

    /// Reads the value of the field with the given number and wire type from
    /// `input` and records it.
    ///
    /// Returns `false` without consuming anything further when the tag is an
    /// end-group tag: that is the signal for the caller parsing a group scope
    /// to pop. Groups encountered here are read recursively up to their
    /// matching end tag.
    pub fn merge_field(
        &mut self,
        number: u32,
        wire_type: WireType,
        input: &mut CodedInput,
    ) -> Result<bool, DecodeError> {
        match wire_type {
            WireType::EndGroup => return Ok(false),
            WireType::Varint => {
                let value = input.read_varint64()?;
                self.merge_varint(number, value);
            }
            WireType::ThirtyTwoBit => {
                let value = input.read_fixed32()?;
                self.merge_fixed32(number, value);
            }
            WireType::SixtyFourBit => {
                let value = input.read_fixed64()?;
                self.merge_fixed64(number, value);
            }
            WireType::LengthDelimited => {
                let value = input.read_bytes()?;
                self.merge_length_delimited(number, value);
            }
            WireType::StartGroup => {
                input.enter_recursion()?;
                let mut group = UnknownFieldSetBuilder::new();
                loop {
                    let (inner_number, inner_wire_type) = input.read_tag()?;
                    if !group.merge_field(inner_number, inner_wire_type, input)? {
                        if inner_number != number {
                            return Err(DecodeError::new("unexpected end group tag"));
                        }
                        break;
                    }
                }
                input.exit_recursion();
                self.merge_group(number, group.build());
            }
        }
        Ok(true)
    }
}
