use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::entity::Entity;
use crate::primitive::Primitive;
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;

/// Every declared field is always present as a member of the encoded
/// object — fields are never omitted, only their value varies between a
/// real value, `null`, or `[]`. This keeps two entities of the same shape
/// byte-for-byte comparable regardless of which fields they happened to
/// set.
pub(super) fn encode_message(e: &Entity, def: &MessageDef, registry: &Registry, out: &mut String) {
    out.push('{');
    let mut first = true;
    for f in def.fields() {
        if !first {
            out.push(',');
        }
        first = false;
        write_json_string(&f.name, out);
        out.push(':');
        encode_field(e, f, registry, out);
    }
    out.push('}');
}

fn encode_field(e: &Entity, f: &MessageFieldDef, registry: &Registry, out: &mut String) {
    if f.data_type.is_ref_type() {
        if f.repeated {
            encode_repeated_refs(e, f, registry, out);
        } else {
            match f.get_reference(e).entity() {
                Some(child) => encode_ref_value(child, f, registry, out),
                None => out.push_str("null"),
            }
        }
    } else if f.repeated {
        encode_repeated_values(e, f, out);
    } else {
        encode_scalar_value(f.get_primitive(e), f.data_type, out);
    }
}

/// Absent or empty reference-typed repeated fields encode as `null`;
/// value-typed ones encode as `[]` (see [`encode_repeated_values`]). This
/// asymmetry matches the reference implementation's behavior and is
/// preserved deliberately — decoders accept either form for any repeated
/// field regardless of which one produced it.
fn encode_repeated_refs(e: &Entity, f: &MessageFieldDef, registry: &Registry, out: &mut String) {
    if f.is_empty(e) {
        out.push_str("null");
        return;
    }
    out.push('[');
    for i in 0..f.len(e) {
        if i > 0 {
            out.push(',');
        }
        let r = f.get_reference_at(e, i).expect("index within iterated range");
        match r.entity() {
            Some(child) => encode_ref_value(child, f, registry, out),
            None => out.push_str("null"),
        }
    }
    out.push(']');
}

fn encode_repeated_values(e: &Entity, f: &MessageFieldDef, out: &mut String) {
    if f.is_empty(e) {
        out.push_str("[]");
        return;
    }
    out.push('[');
    for i in 0..f.len(e) {
        if i > 0 {
            out.push(',');
        }
        let v = f.get_primitive_at(e, i).expect("index within iterated range");
        encode_scalar_value(v, f.data_type, out);
    }
    out.push(']');
}

fn encode_ref_value(child: &Entity, f: &MessageFieldDef, registry: &Registry, out: &mut String) {
    if f.data_type == DataType::STRING_TYPE {
        write_json_string(child.as_str(), out);
    } else if f.data_type == DataType::BYTES_TYPE {
        write_json_string(&BASE64.encode(child.bytes()), out);
    } else {
        let nested_def = registry.resolve(f.data_type);
        encode_message(child, nested_def, registry, out);
    }
}

fn encode_scalar_value(value: Primitive, dt: DataType, out: &mut String) {
    if dt == DataType::BOOL_TYPE {
        out.push_str(if value.to_bool() { "true" } else { "false" });
    } else if dt == DataType::INT32_TYPE {
        write!(out, "{}", value.to_i32()).unwrap();
    } else if dt == DataType::INT64_TYPE {
        write!(out, "{}", value.to_i64()).unwrap();
    } else if dt == DataType::UINT32_TYPE {
        write!(out, "{}", value.to_u32()).unwrap();
    } else if dt == DataType::UINT64_TYPE {
        write!(out, "{}", value.to_u64()).unwrap();
    } else if dt == DataType::FLOAT32_TYPE {
        write!(out, "{}", value.to_f32()).unwrap();
    } else {
        write!(out, "{}", value.to_f64()).unwrap();
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                write!(out, "\\u{:04x}", c as u32).unwrap();
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
