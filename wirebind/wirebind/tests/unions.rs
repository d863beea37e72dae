//! Polymorphic fields: discriminator computation, variant dispatch, and
//! unknown-variant failures.

use std::sync::Arc;

use wirebind::{
    spec::{
        FieldSpec, PrimitiveType, StrEncoding, StructSpec, UnionCase, UnionSpec, WireType,
    },
    Record, Schema, Value, WireError,
};

fn field(name: &str, order: u32, ty: WireType) -> FieldSpec {
    FieldSpec::new(name, order, ty)
}

fn prim(p: PrimitiveType) -> WireType {
    WireType::Primitive(p)
}

fn shape_schema() -> Schema {
    let circle = Arc::new(StructSpec::new(
        "circle",
        vec![field("radius", 0, prim(PrimitiveType::U32))],
    ));
    let rect = Arc::new(StructSpec::new(
        "rect",
        vec![
            field("w", 0, prim(PrimitiveType::U16)),
            field("h", 1, prim(PrimitiveType::U16)),
        ],
    ));
    let spec = StructSpec::new(
        "drawing",
        vec![
            field("kind", 0, prim(PrimitiveType::U8)),
            field(
                "shape",
                1,
                WireType::Union(UnionSpec {
                    tag: "kind".into(),
                    cases: vec![
                        UnionCase::new("circle", Value::U8(1), WireType::Struct(circle)),
                        UnionCase::new("rect", Value::U8(2), WireType::Struct(rect)),
                    ],
                }),
            ),
        ],
    );
    Schema::bind_uncached(&spec).expect("bind should succeed")
}

/// The discriminator is computed from the live variant and written at its
/// own field position; the variant payload follows at the union's.
#[test]
fn discriminator_is_computed_from_live_variant() {
    let schema = shape_schema();

    let value = Value::Record(Record::new().with_field(
        "shape",
        Value::variant(
            "rect",
            Value::Record(
                Record::new()
                    .with_field("w", Value::U16(3))
                    .with_field("h", Value::U16(4)),
            ),
        ),
    ));

    let bytes = schema.serialize_to_vec(&value).expect("serialize should succeed");
    assert_eq!(bytes, [2, 3, 0, 4, 0]);
}

#[test]
fn variants_roundtrip_through_their_own_schema() {
    let schema = shape_schema();

    let circle = Value::Record(Record::new().with_field(
        "shape",
        Value::variant(
            "circle",
            Value::Record(Record::new().with_field("radius", Value::U32(10))),
        ),
    ));
    let bytes = schema.serialize_to_vec(&circle).expect("serialize should succeed");
    assert_eq!(bytes, [1, 10, 0, 0, 0]);

    let decoded = schema.deserialize_slice(&bytes).expect("decode should succeed");
    let Value::Record(out) = decoded else {
        panic!("expected root record");
    };
    assert_eq!(out.get("kind"), Some(&Value::U8(1)));
    let Some(Value::Variant { case, value }) = out.get("shape") else {
        panic!("expected variant");
    };
    assert_eq!(case.as_ref(), "circle");
    let Value::Record(inner) = value.as_ref() else {
        panic!("expected record payload");
    };
    assert_eq!(inner.get("radius"), Some(&Value::U32(10)));
}

/// Testable property: a discriminator with no matching case fails the
/// whole call with `UnknownVariant`.
#[test]
fn unknown_discriminator_fails_decode() {
    let schema = shape_schema();

    let err = schema
        .deserialize_slice(&[9, 0, 0, 0, 0])
        .expect_err("decode should fail");
    assert!(matches!(err, WireError::UnknownVariant { .. }));
}

/// A live variant whose case name the schema does not declare fails the
/// write.
#[test]
fn undeclared_case_name_fails_serialization() {
    let schema = shape_schema();

    let value = Value::Record(Record::new().with_field(
        "shape",
        Value::variant("triangle", Value::Record(Record::new())),
    ));
    let err = schema
        .serialize_to_vec(&value)
        .expect_err("serialize should fail");
    assert!(matches!(err, WireError::UnknownVariant { .. }));
}

/// String discriminators dispatch through the same variant map.
#[test]
fn string_discriminator_roundtrips() {
    let ping = Arc::new(StructSpec::new(
        "ping",
        vec![field("seq", 0, prim(PrimitiveType::U16))],
    ));
    let data = Arc::new(StructSpec::new(
        "data",
        vec![field("len", 0, prim(PrimitiveType::U8))],
    ));
    let spec = StructSpec::new(
        "message",
        vec![
            field("op", 0, WireType::Str(StrEncoding::NulTerminated)),
            field(
                "body",
                1,
                WireType::Union(UnionSpec {
                    tag: "op".into(),
                    cases: vec![
                        UnionCase::new("ping", Value::string("PING"), WireType::Struct(ping)),
                        UnionCase::new("data", Value::string("DATA"), WireType::Struct(data)),
                    ],
                }),
            ),
        ],
    );
    let schema = Schema::bind_uncached(&spec).expect("bind should succeed");

    let value = Value::Record(Record::new().with_field(
        "body",
        Value::variant(
            "ping",
            Value::Record(Record::new().with_field("seq", Value::U16(7))),
        ),
    ));
    let bytes = schema.serialize_to_vec(&value).expect("serialize should succeed");
    assert_eq!(bytes, b"PING\0\x07\0");

    let decoded = schema.deserialize_slice(&bytes).expect("decode should succeed");
    let Value::Record(out) = decoded else {
        panic!("expected root record");
    };
    assert_eq!(out.get("op"), Some(&Value::string("PING")));
    let Some(Value::Variant { case, .. }) = out.get("body") else {
        panic!("expected variant");
    };
    assert_eq!(case.as_ref(), "ping");
}
