//! Integration tests against the Protocol Buffers codec, covering the
//! seed scenarios a schema-driven dynamic message library must round-trip
//! correctly: plain scalars, self-referential nested messages, packed
//! repeated primitives, and the varint/zigzag integer extensions.

use dynamsg::codec::protobuf::extension::with_varint;
use dynamsg::codec::protobuf::ProtobufCodec;
use dynamsg::{DataType, Entity, FieldSpec, RegistryBuilder};

/// S1 — a flat message with one field of each scalar kind round-trips
/// through the protobuf codec unchanged.
#[test]
fn basic_primitive_roundtrip() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("a", DataType::INT32_TYPE, 1))
        .with_field(FieldSpec::new("b", DataType::FLOAT32_TYPE, 5))
        .with_field(FieldSpec::new("c", DataType::BOOL_TYPE, 7))
        .with_field(FieldSpec::new("d", DataType::STRING_TYPE, 8));
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let mut e = Entity::new(def);
    def.field_by_tag(1).unwrap().set_primitive(&mut e, dynamsg::Primitive::from_i32(-33512104));
    def.field_by_tag(5).unwrap().set_primitive(&mut e, dynamsg::Primitive::from_f32(-204860.936));
    def.field_by_tag(7).unwrap().set_primitive(&mut e, dynamsg::Primitive::from_bool(false));
    def.field_by_tag(8)
        .unwrap()
        .set_reference(&mut e, Some(Entity::leaf(b"LJFzUzsO2O8auQAlVmJy".to_vec())));

    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&e, def, &registry).unwrap();
    let decoded = codec.decode(&wire, def, &registry).unwrap();

    assert_eq!(def.field_by_tag(1).unwrap().get_primitive(&decoded).to_i32(), -33512104);
    assert_eq!(def.field_by_tag(5).unwrap().get_primitive(&decoded).to_f32(), -204860.936);
    assert!(!def.field_by_tag(7).unwrap().get_primitive(&decoded).to_bool());
    assert_eq!(
        def.field_by_tag(8).unwrap().get_reference(&decoded).entity().unwrap().as_str(),
        "LJFzUzsO2O8auQAlVmJy"
    );
}

/// S2 — a message referencing itself (one nested child, one repeated
/// children list) round-trips a three-generation tree.
#[test]
fn self_referential_nested_roundtrip() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    let self_type = builder.for_message_def("M");
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("value", DataType::INT32_TYPE, 1))
        .with_field(FieldSpec::new("child", self_type, 10))
        .with_field(FieldSpec::new("children", self_type, 20).repeated());
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let mut grandchildren = Vec::new();
    for i in 0..3 {
        let mut gc = Entity::new(def);
        def.field_by_tag(1).unwrap().set_primitive(&mut gc, dynamsg::Primitive::from_i32(i));
        grandchildren.push(gc);
    }

    let mut child = Entity::new(def);
    def.field_by_tag(1)
        .unwrap()
        .set_primitive(&mut child, dynamsg::Primitive::from_i32(868929107));
    let children_field = def.field_by_tag(20).unwrap();
    let start = children_field.reserve(&mut child, grandchildren.len());
    for (i, gc) in grandchildren.into_iter().enumerate() {
        children_field.set_reference_at(&mut child, start + i, Some(gc)).unwrap();
    }

    let mut parent = Entity::new(def);
    def.field_by_tag(10).unwrap().set_reference(&mut parent, Some(child));

    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&parent, def, &registry).unwrap();
    let decoded = codec.decode(&wire, def, &registry).unwrap();

    let decoded_child = def.field_by_tag(10).unwrap().get_reference(&decoded).entity().unwrap();
    assert_eq!(def.field_by_tag(1).unwrap().get_primitive(decoded_child).to_i32(), 868929107);
    assert_eq!(def.field_by_tag(20).unwrap().len(decoded_child), 3);
}

/// S3 — a packed repeated Int32 field encodes to exactly one
/// length-delimited record holding the concatenation of 4-byte
/// little-endian elements, and decodes back to the same array.
#[test]
fn packed_repeated_integers() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("values", DataType::INT32_TYPE, 11).repeated());
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let field = def.field_by_tag(11).unwrap();
    let mut e = Entity::new(def);
    let values = [313261865i32, 209295014i32];
    let start = field.reserve(&mut e, values.len());
    for (i, v) in values.iter().enumerate() {
        field.set_primitive_at(&mut e, start + i, dynamsg::Primitive::from_i32(*v)).unwrap();
    }

    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&e, def, &registry).unwrap();

    // field 11, wire type 2 (length-delimited): key = (11 << 3) | 2 = 90
    let mut expected = vec![90u8, 8u8];
    expected.extend_from_slice(&values[0].to_le_bytes());
    expected.extend_from_slice(&values[1].to_le_bytes());
    assert_eq!(wire, expected);

    let decoded = codec.decode(&wire, def, &registry).unwrap();
    assert_eq!(field.len(&decoded), 2);
    assert_eq!(field.get_primitive_at(&decoded, 0).unwrap().to_i32(), 313261865);
    assert_eq!(field.get_primitive_at(&decoded, 1).unwrap().to_i32(), 209295014);
}

/// S4 — attaching the varint extension to a repeated Int32 field packs
/// its elements as base-128 varints instead of fixed32 words.
#[test]
fn varint_extension_packs_as_varints() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(with_varint(FieldSpec::new("values", DataType::INT32_TYPE, 11).repeated()));
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let field = def.field_by_tag(11).unwrap();
    let mut e = Entity::new(def);
    let start = field.reserve(&mut e, 2);
    field.set_primitive_at(&mut e, start, dynamsg::Primitive::from_i32(1)).unwrap();
    field.set_primitive_at(&mut e, start + 1, dynamsg::Primitive::from_i32(128)).unwrap();

    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&e, def, &registry).unwrap();

    let expected = vec![90u8, 3u8, 0x01, 0x80, 0x01];
    assert_eq!(wire, expected);

    let decoded = codec.decode(&wire, def, &registry).unwrap();
    assert_eq!(field.get_primitive_at(&decoded, 0).unwrap().to_i32(), 1);
    assert_eq!(field.get_primitive_at(&decoded, 1).unwrap().to_i32(), 128);
}

/// Protobuf decoders must accept the non-packed (one record per element)
/// representation of a repeated value-typed field for compatibility with
/// producers that don't pack.
#[test]
fn non_packed_repeated_values_are_accepted() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("values", DataType::INT32_TYPE, 11).repeated());
    let registry = builder.build().unwrap();
    let def = registry.get(0);
    let field = def.field_by_tag(11).unwrap();

    // key = (11 << 3) | 5 (fixed32) repeated twice, non-packed.
    let wire = vec![93u8, 7, 0, 0, 0, 93u8, 9, 0, 0, 0];

    let mut codec = ProtobufCodec::new();
    let decoded = codec.decode(&wire, def, &registry).unwrap();
    assert_eq!(field.len(&decoded), 2);
    assert_eq!(field.get_primitive_at(&decoded, 0).unwrap().to_i32(), 7);
    assert_eq!(field.get_primitive_at(&decoded, 1).unwrap().to_i32(), 9);
}

/// An empty bytes payload decodes to a present, zero-length entity rather
/// than a null reference.
#[test]
fn empty_bytes_field_is_present_not_null() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("payload", DataType::BYTES_TYPE, 1));
    let registry = builder.build().unwrap();
    let def = registry.get(0);
    let field = def.field_by_tag(1).unwrap();

    let mut e = Entity::new(def);
    field.set_reference(&mut e, Some(Entity::leaf(Vec::new())));

    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&e, def, &registry).unwrap();
    let decoded = codec.decode(&wire, def, &registry).unwrap();

    let r = field.get_reference(&decoded);
    assert!(!r.is_null());
    assert!(r.entity().unwrap().bytes().is_empty());
}

/// Decoding a message composed entirely of defaults and re-encoding it
/// yields a buffer that decodes to another all-defaults message
/// (idempotence under all-defaults input).
#[test]
fn all_defaults_roundtrip_is_idempotent() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("a", DataType::INT32_TYPE, 1))
        .with_field(FieldSpec::new("b", DataType::STRING_TYPE, 2))
        .with_field(FieldSpec::new("c", DataType::INT32_TYPE, 3).repeated());
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    let e = Entity::new(def);
    let mut codec = ProtobufCodec::new();
    let wire = codec.encode(&e, def, &registry).unwrap();
    // Every non-repeated value field is always emitted, every absent
    // reference/repeated field is omitted: only field 1 (Int32, default 0,
    // fixed32-encoded) is on the wire.
    assert_eq!(wire, vec![13u8, 0, 0, 0, 0]);

    let decoded = codec.decode(&wire, def, &registry).unwrap();
    let wire2 = codec.encode(&decoded, def, &registry).unwrap();
    assert_eq!(wire, wire2);
}

/// A repeated reference field with a null element is an encode-time
/// error.
#[test]
fn repeated_null_reference_is_rejected_on_encode() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("items", DataType::STRING_TYPE, 1).repeated());
    let registry = builder.build().unwrap();
    let def = registry.get(0);
    let field = def.field_by_tag(1).unwrap();

    let mut e = Entity::new(def);
    field.reserve(&mut e, 1);

    let mut codec = ProtobufCodec::new();
    let err = codec.encode(&e, def, &registry).unwrap_err();
    assert_eq!(err, dynamsg::error::ProtoEncodeError::RepeatedNull { tag: 1 });
}

/// Unknown field tags are rejected by default and skipped when
/// `ignore_unknown` is set.
#[test]
fn unknown_field_policy() {
    let mut builder: RegistryBuilder<&'static str> = RegistryBuilder::new();
    builder
        .message_def("M")
        .with_name("M")
        .with_field(FieldSpec::new("a", DataType::INT32_TYPE, 1));
    let registry = builder.build().unwrap();
    let def = registry.get(0);

    // field 1 (int32, fixed32) then field 99 (int32, fixed32); the field-99
    // key (99 << 3 | 5 == 797) needs two varint bytes.
    let wire = vec![13u8, 1, 0, 0, 0, 0x9D, 0x06, 2, 0, 0, 0];

    let mut strict = ProtobufCodec::new();
    assert!(strict.decode(&wire, def, &registry).is_err());

    let mut lenient = ProtobufCodec::new().with_ignore_unknown(true);
    let decoded = lenient.decode(&wire, def, &registry).unwrap();
    assert_eq!(def.field_by_tag(1).unwrap().get_primitive(&decoded).to_i32(), 1);
}
