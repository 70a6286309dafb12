//! Encodes and decodes [`crate::entity::Entity`] instances against the
//! Protocol Buffers wire format, driven entirely by a
//! [`crate::registry::MessageDef`] rather than compile-time generated
//! bindings.

mod decode;
mod encode;
pub mod extension;

pub use extension::IntegerEncoding;

use crate::entity::Entity;
use crate::error::{ProtoDecodeError, ProtoEncodeError};
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;
use crate::wire::WireType;

/// Encodes and decodes [`Entity`] instances as Protocol Buffers messages.
///
/// Holds a free-list of scratch buffers reused across nested message
/// encode/decode calls (§4.5's buffer pooling contract: nested encoding
/// stays non-recursive in buffer allocation while remaining recursive in
/// control flow). Not `Sync` — use one instance per thread, and reuse it
/// sequentially across calls to amortize the pool.
#[derive(Debug, Default)]
pub struct ProtobufCodec {
    ignore_unknown: bool,
    buffer_pool: Vec<Vec<u8>>,
}

impl ProtobufCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, unknown field tags are skipped during decode rather than
    /// rejected with [`ProtoDecodeError::UnknownField`].
    pub fn with_ignore_unknown(mut self, ignore_unknown: bool) -> Self {
        self.ignore_unknown = ignore_unknown;
        self
    }

    /// Encodes `e` against `def`'s field layout, resolving nested entity
    /// types through `registry`.
    pub fn encode(
        &mut self,
        e: &Entity,
        def: &MessageDef,
        registry: &Registry,
    ) -> Result<Vec<u8>, ProtoEncodeError> {
        let mut buf = Vec::new();
        encode::encode_message(self, e, def, registry, &mut buf)?;
        Ok(buf)
    }

    /// Decodes `buf` into a freshly allocated entity of `def`'s shape.
    pub fn decode(
        &mut self,
        buf: &[u8],
        def: &MessageDef,
        registry: &Registry,
    ) -> Result<Entity, ProtoDecodeError> {
        let mut entity = Entity::new(def);
        self.decode_into(buf, def, registry, &mut entity)?;
        Ok(entity)
    }

    /// Decodes `buf` into `entity`, reusing its existing allocations where
    /// the shape still matches `def` rather than discarding them. Callers
    /// passing a fresh, empty entity still get correct output — reuse is
    /// purely an optimization, never required for correctness.
    pub fn decode_into(
        &mut self,
        buf: &[u8],
        def: &MessageDef,
        registry: &Registry,
        entity: &mut Entity,
    ) -> Result<(), ProtoDecodeError> {
        let mut cursor = buf;
        decode::decode_message(self, &mut cursor, def, registry, entity)
    }

    fn take_buffer(&mut self) -> Vec<u8> {
        self.buffer_pool.pop().unwrap_or_default()
    }

    fn return_buffer(&mut self, mut buf: Vec<u8>) {
        buf.clear();
        self.buffer_pool.push(buf);
    }
}

/// The wire type a non-repeated, value-typed field is encoded/decoded
/// with, accounting for any [`IntegerEncoding`] extension attached to it.
pub(crate) fn wire_type_for(f: &MessageFieldDef) -> WireType {
    if extension::of(f).is_some() {
        return WireType::Varint;
    }
    if f.data_type == DataType::BOOL_TYPE {
        return WireType::Varint;
    }
    if is_32_bit_value(f.data_type) {
        WireType::I32
    } else {
        WireType::I64
    }
}

pub(crate) fn is_32_bit_value(dt: DataType) -> bool {
    dt == DataType::FLOAT32_TYPE || dt == DataType::INT32_TYPE || dt == DataType::UINT32_TYPE
}
