use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::entity::Entity;
use crate::error::JsonError;
use crate::primitive::Primitive;
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;

use super::lexer::{Lexer, TokenKind};
use super::JsonCodec;

pub(super) fn decode_document(
    codec: &JsonCodec,
    input: &[u8],
    def: &MessageDef,
    registry: &Registry,
) -> Result<Entity, JsonError> {
    let mut lx = Lexer::new(input);
    lx.next()?;
    let entity = decode_object(codec, &mut lx, def, registry)?;
    if lx.kind() != TokenKind::Eof {
        return Err(JsonError::UnexpectedToken {
            pos: lx.position(),
            expected: "end of input",
            found: describe(lx.kind(), lx.value()),
        });
    }
    Ok(entity)
}

fn decode_object(
    codec: &JsonCodec,
    lx: &mut Lexer,
    def: &MessageDef,
    registry: &Registry,
) -> Result<Entity, JsonError> {
    expect(lx, TokenKind::ObjectOpen, "{")?;
    lx.next()?;

    let mut entity = Entity::new(def);
    let mut seen = vec![false; def.fields().len()];

    if lx.kind() != TokenKind::ObjectClose {
        loop {
            decode_member(codec, lx, def, registry, &mut entity, &mut seen)?;
            if lx.kind() == TokenKind::Comma {
                lx.next()?;
                continue;
            }
            break;
        }
    }

    expect(lx, TokenKind::ObjectClose, "}")?;
    lx.next()?;

    if codec.require_all {
        if let Some(i) = seen.iter().position(|seen| !seen) {
            return Err(JsonError::MissingRequiredField {
                name: def.fields()[i].name.clone(),
            });
        }
    }

    Ok(entity)
}

fn decode_member(
    codec: &JsonCodec,
    lx: &mut Lexer,
    def: &MessageDef,
    registry: &Registry,
    entity: &mut Entity,
    seen: &mut [bool],
) -> Result<(), JsonError> {
    expect(lx, TokenKind::String, "a field name")?;
    let name = lx.value().to_string();
    lx.next()?;
    expect(lx, TokenKind::Colon, ":")?;
    lx.next()?;

    match def.fields().iter().position(|f| f.name == name) {
        Some(idx) => {
            seen[idx] = true;
            decode_field_value(codec, lx, &def.fields()[idx], registry, entity)
        }
        None if codec.ignore_unknown => skip_value(lx),
        None => Err(JsonError::UnknownField {
            pos: lx.position(),
            name,
        }),
    }
}

fn decode_field_value(
    codec: &JsonCodec,
    lx: &mut Lexer,
    f: &MessageFieldDef,
    registry: &Registry,
    entity: &mut Entity,
) -> Result<(), JsonError> {
    if f.data_type.is_ref_type() {
        if f.repeated {
            decode_repeated_refs(codec, lx, f, registry, entity)
        } else {
            decode_single_ref(codec, lx, f, registry, entity)
        }
    } else if f.repeated {
        decode_repeated_values(lx, f, entity)
    } else {
        let v = decode_scalar_value(lx, f)?;
        f.set_primitive(entity, v);
        Ok(())
    }
}

fn decode_single_ref(
    codec: &JsonCodec,
    lx: &mut Lexer,
    f: &MessageFieldDef,
    registry: &Registry,
    entity: &mut Entity,
) -> Result<(), JsonError> {
    if lx.kind() == TokenKind::Null {
        lx.next()?;
        f.set_reference(entity, None);
        return Ok(());
    }
    let child = decode_ref_value(codec, lx, f, registry)?;
    f.set_reference(entity, Some(child));
    Ok(())
}

/// Either `null` or a `[...]` array is accepted for a repeated field
/// regardless of which form [`super::encode`] would have produced for it
/// — the encoder's choice between the two is a one-way presentation
/// detail, not something a decoder should rely on.
fn decode_repeated_refs(
    codec: &JsonCodec,
    lx: &mut Lexer,
    f: &MessageFieldDef,
    registry: &Registry,
    entity: &mut Entity,
) -> Result<(), JsonError> {
    if lx.kind() == TokenKind::Null {
        lx.next()?;
        return Ok(());
    }
    expect(lx, TokenKind::ArrayOpen, "[")?;
    lx.next()?;
    if lx.kind() != TokenKind::ArrayClose {
        loop {
            let child = if lx.kind() == TokenKind::Null {
                lx.next()?;
                None
            } else {
                Some(decode_ref_value(codec, lx, f, registry)?)
            };
            let i = f.reserve(entity, 1);
            f.set_reference_at(entity, i, child)
                .expect("index just reserved");
            if lx.kind() == TokenKind::Comma {
                lx.next()?;
                continue;
            }
            break;
        }
    }
    expect(lx, TokenKind::ArrayClose, "]")?;
    lx.next()?;
    Ok(())
}

fn decode_repeated_values(
    lx: &mut Lexer,
    f: &MessageFieldDef,
    entity: &mut Entity,
) -> Result<(), JsonError> {
    if lx.kind() == TokenKind::Null {
        lx.next()?;
        return Ok(());
    }
    expect(lx, TokenKind::ArrayOpen, "[")?;
    lx.next()?;
    if lx.kind() != TokenKind::ArrayClose {
        loop {
            let v = decode_scalar_value(lx, f)?;
            let i = f.reserve(entity, 1);
            f.set_primitive_at(entity, i, v).expect("index just reserved");
            if lx.kind() == TokenKind::Comma {
                lx.next()?;
                continue;
            }
            break;
        }
    }
    expect(lx, TokenKind::ArrayClose, "]")?;
    lx.next()?;
    Ok(())
}

fn decode_ref_value(
    codec: &JsonCodec,
    lx: &mut Lexer,
    f: &MessageFieldDef,
    registry: &Registry,
) -> Result<Entity, JsonError> {
    if f.data_type == DataType::STRING_TYPE {
        expect(lx, TokenKind::String, "a string")?;
        let s = lx.value().to_string();
        lx.next()?;
        Ok(Entity::leaf(s.into_bytes()))
    } else if f.data_type == DataType::BYTES_TYPE {
        expect(lx, TokenKind::String, "a base64 string")?;
        let pos = lx.position();
        let bytes = BASE64
            .decode(lx.value())
            .map_err(|_| JsonError::BadBase64 { pos })?;
        lx.next()?;
        Ok(Entity::leaf(bytes))
    } else {
        let nested_def = registry.resolve(f.data_type);
        decode_object(codec, lx, nested_def, registry)
    }
}

fn decode_scalar_value(lx: &mut Lexer, f: &MessageFieldDef) -> Result<Primitive, JsonError> {
    if f.data_type == DataType::BOOL_TYPE {
        let v = match lx.kind() {
            TokenKind::True => true,
            TokenKind::False => false,
            other => {
                return Err(JsonError::UnexpectedToken {
                    pos: lx.position(),
                    expected: "true or false",
                    found: describe(other, lx.value()),
                })
            }
        };
        lx.next()?;
        return Ok(Primitive::from_bool(v));
    }

    expect(lx, TokenKind::Number, "a number")?;
    let pos = lx.position();
    let text = lx.value();
    let out_of_range = || JsonError::NumberRange { pos };
    let value = if f.data_type == DataType::INT32_TYPE {
        text.parse::<i32>().map(Primitive::from_i32)
    } else if f.data_type == DataType::INT64_TYPE {
        text.parse::<i64>().map(Primitive::from_i64)
    } else if f.data_type == DataType::UINT32_TYPE {
        text.parse::<u32>().map(Primitive::from_u32)
    } else if f.data_type == DataType::UINT64_TYPE {
        text.parse::<u64>().map(Primitive::from_u64)
    } else if f.data_type == DataType::FLOAT32_TYPE {
        text.parse::<f32>().map(Primitive::from_f32)
    } else {
        text.parse::<f64>().map(Primitive::from_f64)
    }
    .map_err(|_| out_of_range())?;
    lx.next()?;
    Ok(value)
}

/// Syntactically consumes one JSON value without interpreting it —
/// used to skip a member whose name doesn't match any declared field
/// when `ignore_unknown` is set.
fn skip_value(lx: &mut Lexer) -> Result<(), JsonError> {
    match lx.kind() {
        TokenKind::ObjectOpen => {
            lx.next()?;
            if lx.kind() != TokenKind::ObjectClose {
                loop {
                    expect(lx, TokenKind::String, "a string")?;
                    lx.next()?;
                    expect(lx, TokenKind::Colon, ":")?;
                    lx.next()?;
                    skip_value(lx)?;
                    if lx.kind() == TokenKind::Comma {
                        lx.next()?;
                        continue;
                    }
                    break;
                }
            }
            expect(lx, TokenKind::ObjectClose, "}")?;
            lx.next()?;
            Ok(())
        }
        TokenKind::ArrayOpen => {
            lx.next()?;
            if lx.kind() != TokenKind::ArrayClose {
                loop {
                    skip_value(lx)?;
                    if lx.kind() == TokenKind::Comma {
                        lx.next()?;
                        continue;
                    }
                    break;
                }
            }
            expect(lx, TokenKind::ArrayClose, "]")?;
            lx.next()?;
            Ok(())
        }
        TokenKind::String | TokenKind::Number | TokenKind::True | TokenKind::False | TokenKind::Null => {
            lx.next()
        }
        other => Err(JsonError::UnexpectedToken {
            pos: lx.position(),
            expected: "a JSON value",
            found: describe(other, lx.value()),
        }),
    }
}

fn expect(lx: &Lexer, kind: TokenKind, expected: &'static str) -> Result<(), JsonError> {
    if lx.kind() == kind {
        Ok(())
    } else {
        Err(JsonError::UnexpectedToken {
            pos: lx.position(),
            expected,
            found: describe(lx.kind(), lx.value()),
        })
    }
}

fn describe(kind: TokenKind, value: &str) -> String {
    match kind {
        TokenKind::String => format!("string {value:?}"),
        TokenKind::Number => format!("number {value}"),
        TokenKind::True => "true".to_string(),
        TokenKind::False => "false".to_string(),
        TokenKind::Null => "null".to_string(),
        TokenKind::ObjectOpen => "{".to_string(),
        TokenKind::ObjectClose => "}".to_string(),
        TokenKind::ArrayOpen => "[".to_string(),
        TokenKind::ArrayClose => "]".to_string(),
        TokenKind::Colon => ":".to_string(),
        TokenKind::Comma => ",".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}
