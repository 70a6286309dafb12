//! LEB128 variable-length integer encoding/decoding.

#![allow(clippy::as_conversions)]

use crate::error::ProtoDecodeError;

/// Types that can be decoded from a LEB128 encoded integer.
pub trait LebCodec: Sized {
    const MAX_LEB_BYTES: u32;

    /// Decode a LEB128 variable length integer from the provided pointer.
    ///
    /// Returns a tuple of the decoded value and the number of bytes read to
    /// decode said value.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `data` is valid for `Self::MAX_LEB_BYTES`
    /// bytes to be read, or that the value terminates (a byte `< 0x80`)
    /// before that many bytes are consulted.
    unsafe fn decode_leb128(data: &[u8]) -> Result<(Self, usize), ProtoDecodeError>;

    /// Decode a LEB128 variable, copying into a scratch buffer first if
    /// `data` is too short to satisfy [`LebCodec::decode_leb128`]'s safety
    /// requirement directly.
    fn decode_leb128_safe(data: &[u8]) -> Result<(Self, usize), ProtoDecodeError> {
        if data.len() >= Self::MAX_LEB_BYTES as usize {
            return unsafe { Self::decode_leb128(data) };
        }

        let mut buffer = [0u8; 16];
        let len = data.len().min(16);
        buffer[..len].copy_from_slice(&data[..len]);

        unsafe { Self::decode_leb128(&buffer[..]) }
    }

    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<(Self, usize), ProtoDecodeError> {
        let chunk = buf.chunk();

        if chunk.len() >= Self::MAX_LEB_BYTES as usize {
            let (value, bytes_read) = unsafe { Self::decode_leb128(chunk)? };
            buf.advance(bytes_read);
            return Ok((value, bytes_read));
        }

        let mut buffer = [0u8; 16];
        for i in 0..Self::MAX_LEB_BYTES as usize {
            if !buf.has_remaining() {
                return Err(ProtoDecodeError::BadVarint);
            }
            buffer[i] = buf.get_u8();
            if buffer[i] < 0x80 {
                return unsafe { Self::decode_leb128(&buffer[..]) };
            }
        }
        Err(ProtoDecodeError::BadVarint)
    }

    /// Encode `self` as a LEB128 variable length integer into the provided
    /// buffer, returning the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

impl LebCodec for u64 {
    const MAX_LEB_BYTES: u32 = 10;

    #[inline(always)]
    unsafe fn decode_leb128(data: &[u8]) -> Result<(Self, usize), ProtoDecodeError> {
        let mut b: u8 = unsafe { *data.get_unchecked(0) };
        let mut value = b as u64;
        if b < 0x80 {
            return Ok((value, 1));
        };
        value -= 0x80;

        b = unsafe { *data.get_unchecked(1) };
        value += (b as u64) << 7;
        if b < 0x80 {
            return Ok((value, 2));
        };
        value -= 0x80 << 7;

        b = unsafe { *data.get_unchecked(2) };
        value += (b as u64) << 14;
        if b < 0x80 {
            return Ok((value, 3));
        };
        value -= 0x80 << 14;

        b = unsafe { *data.get_unchecked(3) };
        value += (b as u64) << 21;
        if b < 0x80 {
            return Ok((value, 4));
        };
        value -= 0x80 << 21;

        b = unsafe { *data.get_unchecked(4) };
        value += (b as u64) << 28;
        if b < 0x80 {
            return Ok((value, 5));
        };
        value -= 0x80 << 28;

        b = unsafe { *data.get_unchecked(5) };
        value += (b as u64) << 35;
        if b < 0x80 {
            return Ok((value, 6));
        };
        value -= 0x80 << 35;

        b = unsafe { *data.get_unchecked(6) };
        value += (b as u64) << 42;
        if b < 0x80 {
            return Ok((value, 7));
        };
        value -= 0x80 << 42;

        b = unsafe { *data.get_unchecked(7) };
        value += (b as u64) << 49;
        if b < 0x80 {
            return Ok((value, 8));
        };
        value -= 0x80 << 49;

        b = unsafe { *data.get_unchecked(8) };
        value += (b as u64) << 56;
        if b < 0x80 {
            return Ok((value, 9));
        };
        value -= 0x80 << 56;

        b = unsafe { *data.get_unchecked(9) };
        value += (b as u64) << 63;
        if b < 0x02 {
            return Ok((value, 10));
        };

        Err(ProtoDecodeError::BadVarint)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut n = 0;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            n += 1;
            if value == 0 {
                buf.put_u8(byte);
                return n;
            }
            buf.put_u8(byte | 0x80);
        }
    }

    /// `bytes = ceil((64 - leading_zeros) / 7)`, minimum 1.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 65] = [
            10,
            9, 9, 9, 9, 9, 9, 9,
            8, 8, 8, 8, 8, 8, 8,
            7, 7, 7, 7, 7, 7, 7,
            6, 6, 6, 6, 6, 6, 6,
            5, 5, 5, 5, 5, 5, 5,
            4, 4, 4, 4, 4, 4, 4,
            3, 3, 3, 3, 3, 3, 3,
            2, 2, 2, 2, 2, 2, 2,
            1, 1, 1, 1, 1, 1, 1, 1,
        ];
        LZ_TO_LEN[self.leading_zeros() as usize] as usize
    }
}

impl LebCodec for u32 {
    const MAX_LEB_BYTES: u32 = 5;

    #[inline]
    unsafe fn decode_leb128(data: &[u8]) -> Result<(Self, usize), ProtoDecodeError> {
        let mut b: u8 = unsafe { *data.get_unchecked(0) };
        let mut value = b as u32;
        if b < 0x80 {
            return Ok((value, 1));
        };
        value -= 0x80;

        b = unsafe { *data.get_unchecked(1) };
        value += (b as u32) << 7;
        if b < 0x80 {
            return Ok((value, 2));
        };
        value -= 0x80 << 7;

        b = unsafe { *data.get_unchecked(2) };
        value += (b as u32) << 14;
        if b < 0x80 {
            return Ok((value, 3));
        };
        value -= 0x80 << 14;

        b = unsafe { *data.get_unchecked(3) };
        value += (b as u32) << 21;
        if b < 0x80 {
            return Ok((value, 4));
        };
        value -= 0x80 << 21;

        b = unsafe { *data.get_unchecked(4) };
        value += (b as u32) << 28;
        if b < 0x20 {
            return Ok((value, 5));
        };

        Err(ProtoDecodeError::BadVarint)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut n = 0;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            n += 1;
            if value == 0 {
                buf.put_u8(byte);
                return n;
            }
            buf.put_u8(byte | 0x80);
        }
    }

    /// `bytes = ceil((32 - leading_zeros) / 7)`, minimum 1.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 33] = [
            5, 5, 5, 5,
            4, 4, 4, 4, 4, 4, 4,
            3, 3, 3, 3, 3, 3, 3,
            2, 2, 2, 2, 2, 2, 2,
            1, 1, 1, 1, 1, 1, 1, 1,
        ];
        LZ_TO_LEN[self.leading_zeros() as usize] as usize
    }
}

/// Zig-zag encodes a signed 32-bit integer for the `Sint32` wire mapping.
#[inline]
pub fn zigzag_encode_32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Zig-zag decodes a 32-bit integer previously produced by [`zigzag_encode_32`].
#[inline]
pub fn zigzag_decode_32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Zig-zag encodes a signed 64-bit integer for the `Sint64` wire mapping.
#[inline]
pub fn zigzag_encode_64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Zig-zag decodes a 64-bit integer previously produced by [`zigzag_encode_64`].
#[inline]
pub fn zigzag_decode_64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
