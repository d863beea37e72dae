//! Binder validation: every structural defect is fatal at bind time and
//! reported before any byte moves.

use std::sync::Arc;

use wirebind::{
    spec::{
        Condition, CountSpec, FieldSpec, LengthSpec, PrimitiveType, StrEncoding, StructSpec,
        Terminator, UnionCase, UnionSpec, WireType,
    },
    BindError, Schema, Value,
};

fn field(name: &str, order: u32, ty: WireType) -> FieldSpec {
    FieldSpec::new(name, order, ty)
}

fn list_of(ty: WireType) -> WireType {
    WireType::List(Box::new(ty))
}

fn prim(p: PrimitiveType) -> WireType {
    WireType::Primitive(p)
}

#[test]
fn unresolved_reference_is_fatal() {
    let spec = StructSpec::new(
        "bad_ref",
        vec![FieldSpec {
            count: Some(CountSpec::Field("nope".into())),
            ..field("items", 0, list_of(prim(PrimitiveType::U8)))
        }],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::UnresolvedReference { .. }));
}

#[test]
fn duplicate_order_is_fatal() {
    let spec = StructSpec::new(
        "dup_order",
        vec![
            field("a", 0, prim(PrimitiveType::U8)),
            field("b", 0, prim(PrimitiveType::U8)),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::DuplicateOrder { order: 0, .. }));
}

#[test]
fn duplicate_field_name_is_fatal() {
    let spec = StructSpec::new(
        "dup_name",
        vec![
            field("a", 0, prim(PrimitiveType::U8)),
            field("a", 1, prim(PrimitiveType::U8)),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::DuplicateField { .. }));
}

/// A source that appears after its dependent in layout order would not be
/// live when the dependent is read.
#[test]
fn source_after_dependent_is_fatal() {
    let spec = StructSpec::new(
        "forward",
        vec![
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("items", 0, list_of(prim(PrimitiveType::U8)))
            },
            field("n", 1, prim(PrimitiveType::U8)),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::ForwardReference { .. }));
}

#[test]
fn self_binding_is_a_cycle() {
    let spec = StructSpec::new(
        "self_ref",
        vec![FieldSpec {
            length: Some(LengthSpec::Field("blob".into())),
            ..field("blob", 0, WireType::Bytes)
        }],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::CyclicBinding { .. }));
}

#[test]
fn one_source_cannot_serve_two_roles() {
    let spec = StructSpec::new(
        "conflict",
        vec![
            field("n", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("xs", 1, list_of(prim(PrimitiveType::U8)))
            },
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("ys", 2, list_of(prim(PrimitiveType::U8)))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::ConflictingBinding { .. }));
}

#[test]
fn collection_without_any_sizing_is_fatal() {
    let spec = StructSpec::new(
        "unbounded",
        vec![field("items", 0, list_of(prim(PrimitiveType::U8)))],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::UnboundedCollection { .. }));
}

#[test]
fn two_sizing_mechanisms_on_one_field_is_fatal() {
    let spec = StructSpec::new(
        "double_sized",
        vec![
            field("n", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                until: Some(Terminator::Sentinel(Value::U8(0))),
                ..field("items", 1, list_of(prim(PrimitiveType::U8)))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::ConflictingSizes { .. }));
}

/// A count source must be an integer field.
#[test]
fn count_source_of_wrong_kind_is_fatal() {
    let spec = StructSpec::new(
        "string_count",
        vec![
            field("n", 0, WireType::Str(StrEncoding::NulTerminated)),
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("items", 1, list_of(prim(PrimitiveType::U8)))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::KindMismatch { .. }));
}

#[test]
fn raw_string_without_length_is_fatal() {
    let spec = StructSpec::new(
        "raw_unsized",
        vec![field("s", 0, WireType::Str(StrEncoding::Raw))],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::MissingLength { .. }));
}

#[test]
fn length_on_a_fixed_width_primitive_is_fatal() {
    let spec = StructSpec::new(
        "sized_prim",
        vec![
            field("n", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                length: Some(LengthSpec::Field("n".into())),
                ..field("v", 1, prim(PrimitiveType::U32))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::UnexpectedLength { .. }));
}

#[test]
fn count_on_a_non_collection_is_fatal() {
    let spec = StructSpec::new(
        "counted_prim",
        vec![
            field("n", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("v", 1, prim(PrimitiveType::U32))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::InvalidDescriptor { .. }));
}

#[test]
fn duplicate_union_tags_are_fatal() {
    let a = Arc::new(StructSpec::new("a", vec![field("x", 0, prim(PrimitiveType::U8))]));
    let b = Arc::new(StructSpec::new("b", vec![field("y", 0, prim(PrimitiveType::U8))]));
    let spec = StructSpec::new(
        "dup_tags",
        vec![
            field("kind", 0, prim(PrimitiveType::U8)),
            field(
                "u",
                1,
                WireType::Union(UnionSpec {
                    tag: "kind".into(),
                    cases: vec![
                        UnionCase::new("a", Value::U8(1), WireType::Struct(a)),
                        UnionCase::new("b", Value::U8(1), WireType::Struct(b)),
                    ],
                }),
            ),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::DuplicateTag { .. }));
}

#[test]
fn string_tag_value_on_integer_tag_field_is_fatal() {
    let a = Arc::new(StructSpec::new("a", vec![field("x", 0, prim(PrimitiveType::U8))]));
    let spec = StructSpec::new(
        "tag_kind",
        vec![
            field("kind", 0, prim(PrimitiveType::U8)),
            field(
                "u",
                1,
                WireType::Union(UnionSpec {
                    tag: "kind".into(),
                    cases: vec![UnionCase::new("a", Value::string("A"), WireType::Struct(a))],
                }),
            ),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::TagValueMismatch { .. }));
}

/// An off-wire field cannot drive another field's size.
#[test]
fn ignored_source_is_fatal() {
    let spec = StructSpec::new(
        "ignored_source",
        vec![
            FieldSpec {
                ignore: true,
                ..field("n", 0, prim(PrimitiveType::U8))
            },
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("items", 1, list_of(prim(PrimitiveType::U8)))
            },
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::InvalidDescriptor { .. }));
}

/// A condition may reference an earlier field of any scalar kind; a later
/// one is rejected like any other reference.
#[test]
fn condition_on_later_field_is_fatal() {
    let spec = StructSpec::new(
        "late_when",
        vec![
            FieldSpec {
                when: Some(Condition::equals("flag", Value::Bool(true))),
                ..field("v", 0, prim(PrimitiveType::U8))
            },
            field("flag", 1, prim(PrimitiveType::Bool)),
        ],
    );
    let err = Schema::bind_uncached(&spec).expect_err("bind should fail");
    assert!(matches!(err, BindError::ForwardReference { .. }));
}

/// Binding failures cache nothing: the same name binds cleanly once the
/// description is corrected.
#[test]
fn failed_bind_does_not_poison_the_name() {
    let broken = StructSpec::new(
        "recoverable",
        vec![FieldSpec {
            count: Some(CountSpec::Field("missing".into())),
            ..field("items", 0, list_of(prim(PrimitiveType::U8)))
        }],
    );
    Schema::bind(&broken).expect_err("bind should fail");

    let fixed = StructSpec::new(
        "recoverable",
        vec![
            field("n", 0, prim(PrimitiveType::U8)),
            FieldSpec {
                count: Some(CountSpec::Field("n".into())),
                ..field("items", 1, list_of(prim(PrimitiveType::U8)))
            },
        ],
    );
    Schema::bind(&fixed).expect("corrected description should bind");
}
