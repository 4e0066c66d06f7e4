//! Low-level wire format support shared by the dynamic message codec.
//!
//! The varint, tag and length primitives come from [`prost::encoding`]; this
//! module layers the pieces that need explicit state on top of them: a
//! bounded reader with a nestable limit stack and a recursion budget, the
//! zigzag transforms for `sint32`/`sint64`, packed-run helpers, and the
//! legacy message-set item frame.

use bytes::{BufMut, Bytes};
use prost::DecodeError;

/// The tag, varint and size primitives this module builds on, re-exported
/// from [`prost::encoding`].
pub use prost::encoding::{
    decode_key, decode_varint, encode_key, encode_varint, encoded_len_varint, key_len, WireType,
};

/// Field number of the `item` group in the message-set wire format.
pub const MESSAGE_SET_ITEM_NUMBER: u32 = 1;
/// Field number of the `type_id` varint within a message-set item.
pub const MESSAGE_SET_TYPE_ID_NUMBER: u32 = 2;
/// Field number of the `message` payload within a message-set item.
pub const MESSAGE_SET_MESSAGE_NUMBER: u32 = 3;

/// Maximum depth of nested messages and groups accepted while decoding.
///
/// Matches the limit enforced by `prost`.
pub const RECURSION_LIMIT: u32 = 100;

/// A bounded reader over a byte slice, decoding protobuf wire primitives.
///
/// Length-delimited scopes are entered with [`push_limit`](CodedInput::push_limit)
/// and left with [`pop_limit`](CodedInput::pop_limit); every read is bounded
/// by the innermost limit. Nested message parsing is additionally bounded by
/// a recursion budget.
#[derive(Debug)]
pub struct CodedInput<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
    recursion_depth: u32,
    recursion_limit: u32,
}

/// A token returned by [`CodedInput::push_limit`], restoring the previous
/// limit when passed back to [`CodedInput::pop_limit`].
#[derive(Debug)]
#[must_use = "the previous limit is lost unless passed back to pop_limit"]
pub struct Limit(usize);

impl<'a> CodedInput<'a> {
    /// Creates a reader over `buf` with the default recursion limit.
    pub fn new(buf: &'a [u8]) -> Self {
        CodedInput {
            buf,
            pos: 0,
            limit: buf.len(),
            recursion_depth: 0,
            recursion_limit: RECURSION_LIMIT,
        }
    }

    /// Creates a reader with a custom recursion limit.
    pub fn with_recursion_limit(buf: &'a [u8], recursion_limit: u32) -> Self {
        CodedInput {
            recursion_limit,
            ..CodedInput::new(buf)
        }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes remaining before the innermost limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// Returns `true` once the innermost limit has been consumed.
    pub fn reached_limit(&self) -> bool {
        self.pos >= self.limit
    }

    /// Restricts reads to the next `len` bytes, returning a token for the
    /// previous limit.
    ///
    /// Fails when `len` exceeds the bytes remaining under the current limit;
    /// a nested scope can only shrink the budget.
    pub fn push_limit(&mut self, len: usize) -> Result<Limit, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::new("buffer underflow"));
        }
        let previous = self.limit;
        self.limit = self.pos + len;
        Ok(Limit(previous))
    }

    /// Restores the limit that was in force before the matching
    /// [`push_limit`](CodedInput::push_limit).
    pub fn pop_limit(&mut self, limit: Limit) {
        debug_assert!(limit.0 >= self.limit);
        self.limit = limit.0;
    }

    /// Enters one level of message or group nesting.
    pub fn enter_recursion(&mut self) -> Result<(), DecodeError> {
        if self.recursion_depth >= self.recursion_limit {
            return Err(DecodeError::new("recursion limit reached"));
        }
        self.recursion_depth += 1;
        Ok(())
    }

    /// Leaves one level of message or group nesting.
    pub fn exit_recursion(&mut self) {
        debug_assert!(self.recursion_depth > 0);
        self.recursion_depth -= 1;
    }

    fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::new("buffer underflow"));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_exact(1)?[0])
    }

    /// Reads a varint of at most ten bytes.
    pub fn read_varint64(&mut self) -> Result<u64, DecodeError> {
        let mut chunk = &self.buf[self.pos..self.limit];
        let value = decode_varint(&mut chunk)?;
        self.pos = self.limit - chunk.len();
        Ok(value)
    }

    /// Reads a varint, truncating it to 32 bits.
    pub fn read_varint32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_varint64()? as u32)
    }

    /// Reads a little-endian fixed 32-bit value.
    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_exact(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    /// Reads a little-endian fixed 64-bit value.
    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.read_exact(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    /// Reads an IEEE 754 single-precision value.
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    /// Reads an IEEE 754 double-precision value.
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Reads a varint-encoded boolean.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_varint64()? != 0)
    }

    /// Reads a zigzag-encoded `sint32`.
    pub fn read_sint32(&mut self) -> Result<i32, DecodeError> {
        Ok(decode_zigzag32(self.read_varint32()?))
    }

    /// Reads a zigzag-encoded `sint64`.
    pub fn read_sint64(&mut self) -> Result<i64, DecodeError> {
        Ok(decode_zigzag64(self.read_varint64()?))
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.read_varint64()?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::new("buffer underflow"));
        }
        Ok(Bytes::copy_from_slice(self.read_exact(len as usize)?))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_varint64()?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::new("buffer underflow"));
        }
        let bytes = self.read_exact(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodeError::new("invalid string value: data is not UTF-8 encoded"))
    }

    /// Reads a field key, returning the field number and wire type.
    pub fn read_tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let mut chunk = &self.buf[self.pos..self.limit];
        let key = decode_key(&mut chunk)?;
        self.pos = self.limit - chunk.len();
        Ok(key)
    }

    /// Skips over the value of a field with the given number and wire type.
    ///
    /// Groups are skipped recursively up to their matching end tag.
    pub fn skip_field(&mut self, number: u32, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint64()?;
            }
            WireType::ThirtyTwoBit => {
                self.read_exact(4)?;
            }
            WireType::SixtyFourBit => {
                self.read_exact(8)?;
            }
            WireType::LengthDelimited => {
                let len = self.read_varint64()?;
                if len > self.remaining() as u64 {
                    return Err(DecodeError::new("buffer underflow"));
                }
                self.read_exact(len as usize)?;
            }
            WireType::StartGroup => {
                self.enter_recursion()?;
                loop {
                    let (inner_number, inner_wire_type) = self.read_tag()?;
                    if inner_wire_type == WireType::EndGroup {
                        if inner_number != number {
                            return Err(DecodeError::new("unexpected end group tag"));
                        }
                        break;
                    }
                    self.skip_field(inner_number, inner_wire_type)?;
                }
                self.exit_recursion();
            }
            WireType::EndGroup => return Err(DecodeError::new("unexpected end group tag")),
        }
        Ok(())
    }
}

/// Zigzag-encodes an `i32` so small magnitudes stay small on the wire.
pub fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`encode_zigzag32`].
pub fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ (-((value & 1) as i32))
}

/// Zigzag-encodes an `i64`.
pub fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`encode_zigzag64`].
pub fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

/// Encodes a packed repeated run: one key, a byte length, then the raw
/// element values.
pub(crate) fn encode_packed<T, I, B, E, L>(number: u32, iter: I, buf: &mut B, encode: E, encoded_len: L)
where
    I: IntoIterator<Item = T> + Clone,
    B: BufMut,
    E: Fn(T, &mut B),
    L: Fn(T) -> usize,
{
    encode_key(number, WireType::LengthDelimited, buf);
    let len: usize = iter.clone().into_iter().map(encoded_len).sum();
    encode_varint(len as u64, buf);

    for value in iter {
        encode(value, buf);
    }
}

/// Size mirror of [`encode_packed`].
pub(crate) fn packed_encoded_len<T, I, L>(number: u32, iter: I, encoded_len: L) -> usize
where
    I: IntoIterator<Item = T>,
    L: Fn(T) -> usize,
{
    let len: usize = iter.into_iter().map(encoded_len).sum();
    key_len(number) + encoded_len_varint(len as u64) + len
}

/// Writes one message-set item: a group-framed `type_id` varint and
/// length-delimited `message` payload.
pub fn encode_message_set_item<B, F>(type_id: u32, payload_len: usize, buf: &mut B, write_payload: F)
where
    B: BufMut,
    F: FnOnce(&mut B),
{
    encode_key(MESSAGE_SET_ITEM_NUMBER, WireType::StartGroup, buf);
    encode_key(MESSAGE_SET_TYPE_ID_NUMBER, WireType::Varint, buf);
    encode_varint(type_id as u64, buf);
    encode_key(MESSAGE_SET_MESSAGE_NUMBER, WireType::LengthDelimited, buf);
    encode_varint(payload_len as u64, buf);
    write_payload(buf);
    encode_key(MESSAGE_SET_ITEM_NUMBER, WireType::EndGroup, buf);
}

/// Size mirror of [`encode_message_set_item`].
pub fn message_set_item_len(type_id: u32, payload_len: usize) -> usize {
    key_len(MESSAGE_SET_ITEM_NUMBER) * 2
        + key_len(MESSAGE_SET_TYPE_ID_NUMBER)
        + encoded_len_varint(type_id as u64)
        + key_len(MESSAGE_SET_MESSAGE_NUMBER)
        + encoded_len_varint(payload_len as u64)
        + payload_len
}
