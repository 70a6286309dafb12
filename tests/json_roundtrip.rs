//! Integration tests against the canonical JSON codec: scalar encoding,
//! base64 bytes, nested messages, and the `ignore_unknown`/`require_all`
//! absent-field policies.

use dynamsg::codec::json::JsonCodec;
use dynamsg::error::JsonError;
use dynamsg::{DataType, Entity, FieldSpec, Primitive, RegistryBuilder};

/// S5 — a bytes field encodes to a standard-alphabet base64 string and
/// decodes back to the original bytes.
#[test]
fn bytes_field_base64_roundtrip() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("RegBytes", DataType::BYTES_TYPE, 9));
    let registry = builder.build().unwrap();
    let def = registry.get(0);
    let field = def.field_by_tag(9).unwrap();

    let mut e = Entity::new(def);
    let bytes = vec![24u8, 40, 107, 129, 64];
    field.set_reference(&mut e, Some(Entity::leaf(bytes.clone())));

    let codec = JsonCodec::new();
    let json = codec.encode(&e, def, &registry);
    assert_eq!(json, r#"{"RegBytes":"GChrgUA="}"#);

    let decoded = codec.decode(json.as_bytes(), def, &registry).unwrap();
    assert_eq!(field.get_reference(&decoded).entity().unwrap().bytes(), &bytes[..]);
}

/// S6 — decoding an unknown member with `ignore_unknown` set succeeds and
/// skips arbitrarily nested unknown values; with it unset, decode fails.
#[test]
fn unknown_field_lenient_vs_strict() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("RegInt32", DataType::INT32_TYPE, 1));
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let json = br#"{"RegInt32":1,"Unknown":[1,{"x":null}]}"#;

    let lenient = JsonCodec::new().with_ignore_unknown(true);
    let decoded = lenient.decode(json, def, &registry).unwrap();
    assert_eq!(def.field_by_tag(1).unwrap().get_primitive(&decoded).to_i32(), 1);

    let strict = JsonCodec::new();
    assert!(matches!(
        strict.decode(json, def, &registry),
        Err(JsonError::UnknownField { .. })
    ));
}

/// Every numeric type rejects an out-of-range literal rather than
/// silently truncating it.
#[test]
fn number_overflow_is_rejected() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("n", DataType::INT32_TYPE, 1));
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let json = br#"{"n":99999999999999}"#;
    let codec = JsonCodec::new();
    assert!(matches!(
        codec.decode(json, def, &registry),
        Err(JsonError::NumberRange { .. })
    ));
}

/// Encoding an entity and decoding the result reproduces the same logical
/// message for a mix of scalar, nested, and repeated fields.
#[test]
fn full_entity_json_roundtrip() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    let point_type = builder.for_message_def("Point");
    builder
        .message_def("Point")
        .with_name("Point")
        .with_field(FieldSpec::new("x", DataType::INT32_TYPE, 1))
        .with_field(FieldSpec::new("y", DataType::INT32_TYPE, 2));
    builder
        .message_def("Path")
        .with_name("Path")
        .with_field(FieldSpec::new("label", DataType::STRING_TYPE, 1))
        .with_field(FieldSpec::new("points", point_type, 2).repeated());
    let registry = builder.build().unwrap();
    let path_def = registry.get(1);
    let point_def = registry.get(0);

    let mut e = Entity::new(path_def);
    path_def
        .field_by_tag(1)
        .unwrap()
        .set_reference(&mut e, Some(Entity::leaf(b"triangle".to_vec())));
    let points_field = path_def.field_by_tag(2).unwrap();
    let start = points_field.reserve(&mut e, 2);
    for (i, (x, y)) in [(1, 2), (3, 4)].into_iter().enumerate() {
        let mut p = Entity::new(point_def);
        point_def.field_by_tag(1).unwrap().set_primitive(&mut p, Primitive::from_i32(x));
        point_def.field_by_tag(2).unwrap().set_primitive(&mut p, Primitive::from_i32(y));
        points_field.set_reference_at(&mut e, start + i, Some(p)).unwrap();
    }

    let codec = JsonCodec::new();
    let json = codec.encode(&e, path_def, &registry);
    let decoded = codec.decode(json.as_bytes(), path_def, &registry).unwrap();

    assert_eq!(
        path_def.field_by_tag(1).unwrap().get_reference(&decoded).entity().unwrap().as_str(),
        "triangle"
    );
    let decoded_points = path_def.field_by_tag(2).unwrap();
    assert_eq!(decoded_points.len(&decoded), 2);
    let p0 = decoded_points.get_reference_at(&decoded, 0).unwrap().entity().unwrap();
    assert_eq!(point_def.field_by_tag(1).unwrap().get_primitive(p0).to_i32(), 1);
    assert_eq!(point_def.field_by_tag(2).unwrap().get_primitive(p0).to_i32(), 2);
}
