#![allow(clippy::as_conversions)]

use bytes::BufMut;

use crate::entity::Entity;
use crate::error::ProtoEncodeError;
use crate::leb128::LebCodec;
use crate::primitive::Primitive;
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;
use crate::wire::WireType;

use super::extension::{self, IntegerEncoding};
use super::{wire_type_for, ProtobufCodec};

pub(super) fn encode_message<B: BufMut>(
    codec: &mut ProtobufCodec,
    e: &Entity,
    def: &MessageDef,
    registry: &Registry,
    buf: &mut B,
) -> Result<(), ProtoEncodeError> {
    for f in def.fields() {
        if f.data_type.is_ref_type() {
            if f.repeated {
                encode_repeated_refs(codec, e, f, registry, buf)?;
            } else if let Some(child) = f.get_reference(e).entity() {
                encode_ref(codec, child, f, registry, buf)?;
            }
        } else if f.repeated {
            encode_packed(codec, e, f, buf);
        } else {
            encode_scalar(f, f.get_primitive(e), buf);
        }
    }
    Ok(())
}

fn encode_scalar<B: BufMut>(f: &MessageFieldDef, value: Primitive, buf: &mut B) {
    crate::wire::encode_key(wire_type_for(f), f.tag, buf);
    encode_bare_value(f, value, buf);
}

fn encode_packed<B: BufMut>(codec: &mut ProtobufCodec, e: &Entity, f: &MessageFieldDef, buf: &mut B) {
    let n = f.len(e);
    if n == 0 {
        return;
    }
    let mut payload = codec.take_buffer();
    for i in 0..n {
        let v = f.get_primitive_at(e, i).expect("index within iterated range");
        encode_bare_value(f, v, &mut payload);
    }
    crate::wire::encode_key(WireType::Len, f.tag, buf);
    (payload.len() as u64).encode_leb128(buf);
    buf.put_slice(&payload);
    codec.return_buffer(payload);
}

/// Writes a field's value with no leading key — shared between a
/// non-repeated field's single record and a packed field's concatenated
/// run of bare values.
fn encode_bare_value<B: BufMut>(f: &MessageFieldDef, value: Primitive, buf: &mut B) {
    if let Some(enc) = extension::of(f) {
        encode_varint_value(f.data_type, enc, value, buf);
        return;
    }
    if f.data_type == DataType::BOOL_TYPE {
        buf.put_u8(u8::from(value.to_bool()));
    } else if super::is_32_bit_value(f.data_type) {
        buf.put_u32_le(value.to_u32());
    } else {
        buf.put_u64_le(value.to_u64());
    }
}

fn encode_varint_value<B: BufMut>(
    dt: DataType,
    enc: IntegerEncoding,
    value: Primitive,
    buf: &mut B,
) {
    match enc {
        IntegerEncoding::Varint => {
            if dt == DataType::INT32_TYPE {
                (i64::from(value.to_i32()) as u64).encode_leb128(buf);
            } else if dt == DataType::INT64_TYPE {
                (value.to_i64() as u64).encode_leb128(buf);
            } else if dt == DataType::UINT32_TYPE {
                value.to_u32().encode_leb128(buf);
            } else {
                value.to_u64().encode_leb128(buf);
            }
        }
        IntegerEncoding::ZigZag => {
            if dt == DataType::INT32_TYPE {
                crate::leb128::zigzag_encode_32(value.to_i32()).encode_leb128(buf);
            } else {
                crate::leb128::zigzag_encode_64(value.to_i64()).encode_leb128(buf);
            }
        }
    }
}

fn encode_ref<B: BufMut>(
    codec: &mut ProtobufCodec,
    child: &Entity,
    f: &MessageFieldDef,
    registry: &Registry,
    buf: &mut B,
) -> Result<(), ProtoEncodeError> {
    crate::wire::encode_key(WireType::Len, f.tag, buf);
    if f.data_type == DataType::STRING_TYPE || f.data_type == DataType::BYTES_TYPE {
        let bytes = child.bytes();
        (bytes.len() as u64).encode_leb128(buf);
        buf.put_slice(bytes);
    } else {
        let nested_def = registry.resolve(f.data_type);
        let mut payload = codec.take_buffer();
        encode_message(codec, child, nested_def, registry, &mut payload)?;
        (payload.len() as u64).encode_leb128(buf);
        buf.put_slice(&payload);
        codec.return_buffer(payload);
    }
    Ok(())
}

fn encode_repeated_refs<B: BufMut>(
    codec: &mut ProtobufCodec,
    e: &Entity,
    f: &MessageFieldDef,
    registry: &Registry,
    buf: &mut B,
) -> Result<(), ProtoEncodeError> {
    for i in 0..f.len(e) {
        let r = f.get_reference_at(e, i).expect("index within iterated range");
        match r.entity() {
            Some(child) => encode_ref(codec, child, f, registry, buf)?,
            None => return Err(ProtoEncodeError::RepeatedNull { tag: f.tag }),
        }
    }
    Ok(())
}
