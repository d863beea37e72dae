//! Presence conditions: gated fields and their decode defaults.

use wirebind::{
    spec::{Condition, FieldSpec, PrimitiveType, StructSpec, WireType},
    Record, Schema, Value,
};

fn field(name: &str, order: u32, ty: WireType) -> FieldSpec {
    FieldSpec::new(name, order, ty)
}

fn prim(p: PrimitiveType) -> WireType {
    WireType::Primitive(p)
}

fn gated_schema() -> Schema {
    let spec = StructSpec::new(
        "gated",
        vec![
            field("present", 0, prim(PrimitiveType::Bool)),
            FieldSpec {
                when: Some(Condition::equals("present", Value::Bool(true))),
                ..field("extra", 1, prim(PrimitiveType::U16))
            },
            field("tail", 2, prim(PrimitiveType::U8)),
        ],
    );
    Schema::bind_uncached(&spec).expect("bind should succeed")
}

/// Testable property: a field gated off is absent from the output bytes
/// and, on read, left at its default without consuming input.
#[test]
fn false_condition_skips_bytes_and_decodes_to_null() {
    let schema = gated_schema();

    let value = Value::Record(
        Record::new()
            .with_field("present", Value::Bool(false))
            .with_field("extra", Value::U16(0xBEEF)) // live but off-wire
            .with_field("tail", Value::U8(7)),
    );
    let bytes = schema.serialize_to_vec(&value).expect("serialize should succeed");
    assert_eq!(bytes, [0, 7]);

    let decoded = schema.deserialize_slice(&bytes).expect("decode should succeed");
    let Value::Record(out) = decoded else {
        panic!("expected root record");
    };
    assert_eq!(out.get("present"), Some(&Value::Bool(false)));
    assert_eq!(out.get("extra"), Some(&Value::Null));
    assert_eq!(out.get("tail"), Some(&Value::U8(7)));
}

#[test]
fn true_condition_keeps_the_field_on_the_wire() {
    let schema = gated_schema();

    let value = Value::Record(
        Record::new()
            .with_field("present", Value::Bool(true))
            .with_field("extra", Value::U16(0x0102))
            .with_field("tail", Value::U8(7)),
    );
    let bytes = schema.serialize_to_vec(&value).expect("serialize should succeed");
    assert_eq!(bytes, [1, 2, 1, 7]);

    let decoded = schema.deserialize_slice(&bytes).expect("decode should succeed");
    assert_eq!(decoded, value);
}

#[test]
fn differs_condition_inverts_the_gate() {
    let spec = StructSpec::new(
        "versioned",
        vec![
            field("version", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                when: Some(Condition::differs("version", Value::U8(0))),
                ..field("modern", 1, prim(PrimitiveType::U8))
            },
        ],
    );
    let schema = Schema::bind_uncached(&spec).expect("bind should succeed");

    let legacy = Value::Record(Record::new().with_field("version", Value::U8(0)));
    assert_eq!(
        schema.serialize_to_vec(&legacy).expect("serialize should succeed"),
        [0]
    );

    let modern = Value::Record(
        Record::new()
            .with_field("version", Value::U8(2))
            .with_field("modern", Value::U8(9)),
    );
    assert_eq!(
        schema.serialize_to_vec(&modern).expect("serialize should succeed"),
        [2, 9]
    );
}

/// A condition chained on another conditional field: once the first gate
/// closes, the second sees `Null` on both sides of the codec.
#[test]
fn condition_on_skipped_field_reads_as_null() {
    let spec = StructSpec::new(
        "chained",
        vec![
            field("a", 0, prim(PrimitiveType::Bool)),
            FieldSpec {
                when: Some(Condition::equals("a", Value::Bool(true))),
                ..field("b", 1, prim(PrimitiveType::U8))
            },
            FieldSpec {
                when: Some(Condition::equals("b", Value::U8(1))),
                ..field("c", 2, prim(PrimitiveType::U8))
            },
        ],
    );
    let schema = Schema::bind_uncached(&spec).expect("bind should succeed");

    // a = false gates b off; c's condition compares against Null and is
    // false too, on write and on read alike.
    let value = Value::Record(
        Record::new()
            .with_field("a", Value::Bool(false))
            .with_field("b", Value::U8(1))
            .with_field("c", Value::U8(5)),
    );
    let bytes = schema.serialize_to_vec(&value).expect("serialize should succeed");
    assert_eq!(bytes, [0]);

    let decoded = schema.deserialize_slice(&bytes).expect("decode should succeed");
    let Value::Record(out) = decoded else {
        panic!("expected root record");
    };
    assert_eq!(out.get("b"), Some(&Value::Null));
    assert_eq!(out.get("c"), Some(&Value::Null));
}
