//! Schema description consumed by the binder.
//!
//! These types are the external input to `wirebind`: an ordered list of
//! field descriptors with named cross-field references. How they are
//! produced (hand-built, generated, parsed from an interface definition) is
//! out of scope here — the binder consumes them once per type and never
//! looks at them again.

use std::fmt;
use std::sync::Arc;

use wirebind_core::Value;

/// Fixed-width scalar kinds encodable by the primitive codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveType {
    /// Encoded width in bytes. Fixed regardless of endianness.
    pub fn width(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// On-wire layout of a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrEncoding {
    /// Encoded text followed by a single `0x00` terminator.
    NulTerminated,
    /// Encoded text with no terminator; the byte length must come from a
    /// length source or a per-item bound.
    Raw,
}

/// A type expression as it appears in a field descriptor.
#[derive(Debug, Clone)]
pub enum WireType {
    Primitive(PrimitiveType),
    Str(StrEncoding),
    /// Raw octets; always length-bound.
    Bytes,
    /// Nested composite with its own ordered field list.
    Struct(Arc<StructSpec>),
    /// Homogeneous collection; sized by count, byte length, per-item
    /// lengths, or a terminator on the owning [`FieldSpec`].
    List(Box<WireType>),
    /// Polymorphic field dispatched through a sibling discriminator.
    Union(UnionSpec),
}

/// A named reference to another field, resolved at bind time.
///
/// Resolution is relative, never an absolute path: siblings of the
/// referencing field are searched first, then each enclosing ancestor scope
/// outward. The nearest match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef(pub String);

impl From<&str> for FieldRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element count of a collection: a schema-time constant or a sibling
/// integer field computed from the collection on write.
#[derive(Debug, Clone)]
pub enum CountSpec {
    Fixed(usize),
    Field(FieldRef),
}

/// Total byte length of a field: a schema-time constant or a sibling
/// integer field computed by measurement on write.
#[derive(Debug, Clone)]
pub enum LengthSpec {
    Fixed(usize),
    Field(FieldRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
}

/// Presence condition evaluated against an already-bound sibling or
/// ancestor value. A field whose condition is false contributes no bytes
/// and consumes no input.
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: FieldRef,
    pub op: Cmp,
    pub value: Value,
}

impl Condition {
    pub fn equals(field: impl Into<FieldRef>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: Cmp::Eq,
            value,
        }
    }

    pub fn differs(field: impl Into<FieldRef>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: Cmp::Ne,
            value,
        }
    }
}

/// Read/write termination rule for a collection with no count or length
/// source. The matching element is part of the collection on both sides.
#[derive(Clone)]
pub enum Terminator {
    /// Stop after an element equal to this value.
    Sentinel(Value),
    /// Stop after an element the predicate accepts.
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl Terminator {
    pub(crate) fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Sentinel(s) => value == s,
            Self::Predicate(p) => p(value),
        }
    }
}

impl fmt::Debug for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentinel(v) => f.debug_tuple("Sentinel").field(v).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// One concrete case of a [`WireType::Union`].
#[derive(Debug, Clone)]
pub struct UnionCase {
    pub name: Arc<str>,
    /// Discriminator value selecting this case; must fit the tag field's
    /// declared kind and be unique within the union.
    pub tag_value: Value,
    pub ty: WireType,
}

impl UnionCase {
    pub fn new(name: impl AsRef<str>, tag_value: Value, ty: WireType) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            tag_value,
            ty,
        }
    }
}

/// A polymorphic field: a sibling discriminator field plus the declared
/// case list it selects from.
#[derive(Debug, Clone)]
pub struct UnionSpec {
    pub tag: FieldRef,
    pub cases: Vec<UnionCase>,
}

/// One schema field.
///
/// `order` is unique within the parent struct and defines byte layout and
/// traversal order — not necessarily declaration order. At most one sizing
/// mechanism (`count`, `length`, `item_length`, `until`) may be present.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub order: u32,
    pub ty: WireType,
    /// Element count source; lists only.
    pub count: Option<CountSpec>,
    /// Total byte length source.
    pub length: Option<LengthSpec>,
    /// Per-item byte length source (a sibling list of integers); lists only.
    pub item_length: Option<FieldRef>,
    /// Termination rule; lists only.
    pub until: Option<Terminator>,
    pub when: Option<Condition>,
    /// Present in the value model but excluded from the wire format.
    pub ignore: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, order: u32, ty: WireType) -> Self {
        Self {
            name: name.into(),
            order,
            ty,
            count: None,
            length: None,
            item_length: None,
            until: None,
            when: None,
            ignore: false,
        }
    }
}

/// The ordered field description for one value type — the unit the schema
/// cache keys on (by `name`) and the binder consumes.
#[derive(Debug, Clone)]
pub struct StructSpec {
    pub name: Arc<str>,
    pub fields: Vec<FieldSpec>,
}

impl StructSpec {
    pub fn new(name: impl AsRef<str>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            fields,
        }
    }
}
