#![allow(clippy::as_conversions)]

use bytes::Buf;

use crate::entity::Entity;
use crate::error::ProtoDecodeError;
use crate::leb128::LebCodec;
use crate::primitive::Primitive;
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;
use crate::wire::{self, WireType};

use super::extension::{self, IntegerEncoding};
use super::{wire_type_for, ProtobufCodec};

pub(super) fn decode_message(
    codec: &mut ProtobufCodec,
    buf: &mut &[u8],
    def: &MessageDef,
    registry: &Registry,
    entity: &mut Entity,
) -> Result<(), ProtoDecodeError> {
    reset_entity(entity, def);

    while buf.has_remaining() {
        let key = wire::decode_key(buf)?;
        let (wire_type, tag) = key.into_parts();
        match def.field_by_tag(tag) {
            Some(f) => decode_field(codec, buf, f, wire_type, registry, entity)?,
            None if codec.ignore_unknown => wire::skip_field(wire_type, buf)?,
            None => return Err(ProtoDecodeError::UnknownField { tag }),
        }
    }

    Ok(())
}

/// Clears an entity's storage to decode fresh state into, reusing existing
/// allocations where `def`'s shape still matches rather than discarding
/// them. This is purely an optimization: a brand-new entity from
/// [`Entity::new`] is left unchanged in all observable respects.
fn reset_entity(entity: &mut Entity, def: &MessageDef) {
    if entity.data.len() == def.data_length() {
        entity.data.iter_mut().for_each(|b| *b = 0);
    } else {
        entity.data.clear();
        entity.data.resize(def.data_length(), 0);
    }

    if entity.entities.len() != def.entities_length() {
        entity.entities.clear();
        entity.entities.resize_with(def.entities_length(), || None);
        return;
    }

    for f in def.fields() {
        let slot = &mut entity.entities[f.offset];
        if f.repeated {
            if let Some(container) = slot {
                container.data.clear();
                container.entities.clear();
            }
        } else if f.data_type.is_ref_type() {
            *slot = None;
        }
    }
}

fn decode_field(
    codec: &mut ProtobufCodec,
    buf: &mut &[u8],
    f: &MessageFieldDef,
    wire_type: WireType,
    registry: &Registry,
    entity: &mut Entity,
) -> Result<(), ProtoDecodeError> {
    if f.data_type.is_ref_type() {
        if wire_type != WireType::Len {
            return Err(ProtoDecodeError::BadWireType(wire_type.into_val()));
        }
        let len = wire::decode_len(buf)?;
        let payload = take_len(buf, len)?;
        let child = decode_ref_value(codec, payload, f, registry)?;
        if f.repeated {
            let n = f.reserve(entity, 1);
            f.set_reference_at(entity, n, Some(child))
                .expect("index just reserved");
        } else {
            f.set_reference(entity, Some(child));
        }
        return Ok(());
    }

    if f.repeated && wire_type == WireType::Len {
        return decode_packed(buf, f, entity);
    }

    let value = decode_bare_value(buf, f, wire_type)?;
    if f.repeated {
        let n = f.reserve(entity, 1);
        f.set_primitive_at(entity, n, value).expect("index just reserved");
    } else {
        f.set_primitive(entity, value);
    }
    Ok(())
}

fn decode_packed(buf: &mut &[u8], f: &MessageFieldDef, entity: &mut Entity) -> Result<(), ProtoDecodeError> {
    let len = wire::decode_len(buf)?;
    let mut payload = take_len(buf, len)?;
    let expected = wire_type_for(f);
    let width = fixed_width(expected);
    if let Some(width) = width {
        if payload.len() % width != 0 {
            return Err(ProtoDecodeError::BadPackedLength(payload.len()));
        }
    }
    while !payload.is_empty() {
        let value = decode_bare_value(&mut payload, f, expected)?;
        let n = f.reserve(entity, 1);
        f.set_primitive_at(entity, n, value).expect("index just reserved");
    }
    Ok(())
}

/// Fixed byte width of `wire_type`'s payload, or `None` for `Varint` whose
/// encoded length varies per value.
fn fixed_width(wire_type: WireType) -> Option<usize> {
    match wire_type {
        WireType::I32 => Some(4),
        WireType::I64 => Some(8),
        WireType::Varint => None,
        _ => None,
    }
}

fn decode_bare_value(
    buf: &mut &[u8],
    f: &MessageFieldDef,
    wire_type: WireType,
) -> Result<Primitive, ProtoDecodeError> {
    if let Some(enc) = extension::of(f) {
        if wire_type != WireType::Varint {
            return Err(ProtoDecodeError::BadWireType(wire_type.into_val()));
        }
        return decode_varint_value(buf, f.data_type, enc);
    }

    if f.data_type == DataType::BOOL_TYPE {
        if wire_type != WireType::Varint {
            return Err(ProtoDecodeError::BadWireType(wire_type.into_val()));
        }
        let (v, _) = u64::decode_leb128_buf(buf)?;
        return Ok(Primitive::from_u64(u64::from(v != 0)));
    }

    if super::is_32_bit_value(f.data_type) {
        if wire_type != WireType::I32 {
            return Err(ProtoDecodeError::BadWireType(wire_type.into_val()));
        }
        if buf.remaining() < 4 {
            return Err(ProtoDecodeError::Truncated);
        }
        Ok(Primitive::from_u64(u64::from(buf.get_u32_le())))
    } else {
        if wire_type != WireType::I64 {
            return Err(ProtoDecodeError::BadWireType(wire_type.into_val()));
        }
        if buf.remaining() < 8 {
            return Err(ProtoDecodeError::Truncated);
        }
        Ok(Primitive::from_u64(buf.get_u64_le()))
    }
}

fn decode_varint_value(
    buf: &mut &[u8],
    dt: DataType,
    enc: IntegerEncoding,
) -> Result<Primitive, ProtoDecodeError> {
    match enc {
        IntegerEncoding::Varint => {
            if dt == DataType::INT32_TYPE {
                let (v, _) = u64::decode_leb128_buf(buf)?;
                let v32 = i32::try_from(v as i64).map_err(|_| ProtoDecodeError::IntegerOverflow)?;
                Ok(Primitive::from_i32(v32))
            } else if dt == DataType::INT64_TYPE {
                let (v, _) = u64::decode_leb128_buf(buf)?;
                Ok(Primitive::from_i64(v as i64))
            } else if dt == DataType::UINT32_TYPE {
                let (v, _) = u32::decode_leb128_buf(buf)?;
                Ok(Primitive::from_u32(v))
            } else {
                let (v, _) = u64::decode_leb128_buf(buf)?;
                Ok(Primitive::from_u64(v))
            }
        }
        IntegerEncoding::ZigZag => {
            if dt == DataType::INT32_TYPE {
                let (v, _) = u32::decode_leb128_buf(buf)?;
                Ok(Primitive::from_i32(crate::leb128::zigzag_decode_32(v)))
            } else {
                let (v, _) = u64::decode_leb128_buf(buf)?;
                Ok(Primitive::from_i64(crate::leb128::zigzag_decode_64(v)))
            }
        }
    }
}

fn decode_ref_value(
    codec: &mut ProtobufCodec,
    payload: &[u8],
    f: &MessageFieldDef,
    registry: &Registry,
) -> Result<Entity, ProtoDecodeError> {
    if f.data_type == DataType::STRING_TYPE {
        let s = core::str::from_utf8(payload).map_err(|_| ProtoDecodeError::BadUtf8)?;
        Ok(Entity::leaf(s.as_bytes().to_vec()))
    } else if f.data_type == DataType::BYTES_TYPE {
        Ok(Entity::leaf(payload.to_vec()))
    } else {
        let nested_def = registry.resolve(f.data_type);
        let mut child = Entity::new(nested_def);
        let mut cursor = payload;
        decode_message(codec, &mut cursor, nested_def, registry, &mut child)
            .map_err(|e| ProtoDecodeError::NestedDecode(Box::new(e)))?;
        Ok(child)
    }
}

fn take_len<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], ProtoDecodeError> {
    if buf.len() < len {
        return Err(ProtoDecodeError::Truncated);
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}
