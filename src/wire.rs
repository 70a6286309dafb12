//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use core::num::NonZeroU64;

use crate::error::ProtoDecodeError;
use crate::util::CastFrom;

/// Minimum value of a protobuf tag.
pub const MINIMUM_TAG_VAL: u32 = 1;
/// Maximum value of a protobuf tag.
pub const MAXIMUM_TAG_VAL: u32 = (1 << 29) - 1;

/// A decoded protobuf field key containing a wire type and tag.
///
/// Packed into a [`NonZeroU64`] for the same reason as in a dense varint
/// decode loop: a `NonZeroU64` niche lets `Result<ProtoKey, _>` stay
/// register-sized rather than spilling to the stack.
///
/// * Bits 0-2: wire type (0-5)
/// * Bits 3-31: tag/field number (1 to 2^29-1)
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ProtoKey(NonZeroU64);

#[allow(clippy::as_conversions)]
impl ProtoKey {
    /// Creates a new [`ProtoKey`] from a raw key value, validating the wire
    /// type and tag.
    #[inline(always)]
    fn try_from_raw(raw_key: u32) -> Result<Self, ProtoDecodeError> {
        let wire_type_raw = (raw_key & 0b111) as u8;
        if wire_type_raw > WireType::MAX_VAL {
            return Err(ProtoDecodeError::BadWireType(wire_type_raw));
        }

        let tag = raw_key >> 3;
        if tag == 0 || tag > MAXIMUM_TAG_VAL {
            return Err(ProtoDecodeError::BadTag);
        }

        // SAFETY: we validated tag >= 1 above, so raw_key is non-zero.
        Ok(Self(unsafe { NonZeroU64::new_unchecked(raw_key as u64) }))
    }

    /// Returns the [`WireType`] component of this key.
    #[inline(always)]
    pub const fn wire_type(self) -> WireType {
        let raw = (self.0.get() & 0b111) as u8;
        // SAFETY: validated during construction.
        unsafe { core::mem::transmute::<u8, WireType>(raw) }
    }

    /// Returns the tag/field number component of this key.
    #[inline(always)]
    pub const fn tag(self) -> u32 {
        (self.0.get() >> 3) as u32
    }

    /// Decomposes this key into its [`WireType`] and tag components.
    #[inline(always)]
    pub const fn into_parts(self) -> (WireType, u32) {
        (self.wire_type(), self.tag())
    }
}

impl core::fmt::Debug for ProtoKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProtoKey")
            .field("wire_type", &self.wire_type())
            .field("tag", &self.tag())
            .finish()
    }
}

/// Encodes the provided tag and wire type as a protobuf field key.
///
/// See <https://protobuf.dev/programming-guides/encoding> under the
/// "Message Structure" section.
#[inline(always)]
pub fn encode_key<B: bytes::BufMut>(wire_type: WireType, tag: u32, buf: &mut B) {
    let key = (tag << 3) | u32::cast_from(wire_type.into_val());
    crate::leb128::LebCodec::encode_leb128(key, buf);
}

/// Returns the encoded length of a field key (tag + wire type). The wire
/// type never affects the length since it only occupies 3 bits.
#[inline(always)]
pub fn encoded_key_len(tag: u32) -> usize {
    use crate::leb128::LebCodec;
    (tag << 3).encoded_leb128_len()
}

/// Decodes the key from a protobuf encoded message.
#[inline]
pub fn decode_key<B: bytes::Buf>(buf: &mut B) -> Result<ProtoKey, ProtoDecodeError> {
    use crate::leb128::LebCodec;

    let chunk = buf.chunk();
    let chunk_len = chunk.len();

    // N.B. Keys always fit in u32: the max tag is `2^29-1`, so the max key
    // value is `(2^29-1) << 3 | 7 == u32::MAX`.
    let value = if chunk_len == 0 {
        return Err(ProtoDecodeError::Truncated);
    } else if chunk[0] < 0x80 || chunk_len >= 5 {
        let (value, bytes_read) = unsafe { u32::decode_leb128(chunk) }?;
        buf.advance(bytes_read);
        value
    } else {
        u32::decode_leb128_buf(buf)?.0
    };

    ProtoKey::try_from_raw(value)
}

/// Decodes the length prefix for a length-delimited field.
#[inline(always)]
pub fn decode_len<B: bytes::Buf>(buf: &mut B) -> Result<usize, ProtoDecodeError> {
    use crate::leb128::LebCodec;

    let chunk = buf.chunk();
    if !chunk.is_empty() && chunk[0] < 0x80 {
        let len = chunk[0] as usize;
        buf.advance(1);
        Ok(len)
    } else {
        let (len, _) = u64::decode_leb128_buf(buf)?;
        usize::try_from(len).map_err(|_| ProtoDecodeError::LengthOverflow(len))
    }
}

/// Skips over a field value based on its wire type.
///
/// Protobuf supports backwards and forwards compatibility by skipping
/// fields we don't know about; we "skip" a field by advancing our buffer
/// past it.
#[inline(always)]
pub fn skip_field<B: bytes::Buf>(
    wire_type: WireType,
    buf: &mut B,
) -> Result<(), ProtoDecodeError> {
    use crate::leb128::LebCodec;

    let skip_len = match wire_type {
        WireType::Varint => {
            u64::decode_leb128_buf(buf)?;
            return Ok(());
        }
        WireType::I64 => 8,
        WireType::Len => decode_len(buf)?,
        WireType::I32 => 4,
        WireType::SGroup | WireType::EGroup => {
            return Err(ProtoDecodeError::DeprecatedGroup);
        }
    };

    if buf.remaining() < skip_len {
        return Err(ProtoDecodeError::Truncated);
    }
    buf.advance(skip_len);
    Ok(())
}

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. Each key-value pair
/// is turned into a record of a field number, a [`WireType`], and a
/// payload. The [`WireType`] indicates how the payload's length is
/// determined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[allow(dead_code)] // constructed via transmute
pub enum WireType {
    /// Variable length integer. Used for `int32`, `int64`, `uint32`,
    /// `uint64`, `sint32`, `sint64`, `bool`.
    Varint = 0,
    /// 64-bit integer. Used for `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field. Used for `string`, `bytes`, messages, and
    /// packed repeated fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit integer. Used for `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

#[allow(clippy::as_conversions)]
impl WireType {
    const MAX_VAL: u8 = WireType::I32 as u8;

    const _DISCRIMINANT_CHECK: () = {
        assert!(WireType::Varint as u8 == 0);
        assert!(WireType::I64 as u8 == 1);
        assert!(WireType::Len as u8 == 2);
        assert!(WireType::SGroup as u8 == 3);
        assert!(WireType::EGroup as u8 == 4);
        assert!(WireType::I32 as u8 == 5);
    };

    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    fn try_from_val(value: u8) -> Result<Self, ProtoDecodeError> {
        if value <= Self::MAX_VAL {
            // SAFETY: checked above that value is within range.
            Ok(unsafe { core::mem::transmute(value) })
        } else {
            Err(ProtoDecodeError::BadWireType(value))
        }
    }

    /// Returns the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = ProtoDecodeError;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, ProtoDecodeError> {
        WireType::try_from_val(value)
    }
}
