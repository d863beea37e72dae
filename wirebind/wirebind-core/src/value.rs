//! Dynamic value representation traversed by the codec engine.

use std::sync::Arc;

use crate::error::{AccessError, ValueKindError};

/// A dynamic value paired with a schema node during one serialize or
/// deserialize call.
///
/// All kinds are explicit; no lossy conversions. `Null` marks a field that
/// is absent from the wire (a failed presence condition, or an ignored
/// field on decode).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Record(Record),
    List(Vec<Value>),
    /// One concrete case of a polymorphic field, tagged by case name.
    Variant { case: Arc<str>, value: Box<Value> },
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Arc::from(s.as_ref()))
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        Self::Bytes(Arc::from(b.as_ref()))
    }

    pub fn variant(case: impl AsRef<str>, value: Value) -> Self {
        Self::Variant {
            case: Arc::from(case.as_ref()),
            value: Box::new(value),
        }
    }

    pub fn try_bool(&self) -> Result<Option<bool>, ValueKindError> {
        match self {
            Value::Bool(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("Bool")),
        }
    }

    pub fn try_i8(&self) -> Result<Option<i8>, ValueKindError> {
        match self {
            Value::I8(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("I8")),
        }
    }

    pub fn try_i16(&self) -> Result<Option<i16>, ValueKindError> {
        match self {
            Value::I16(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("I16")),
        }
    }

    pub fn try_i32(&self) -> Result<Option<i32>, ValueKindError> {
        match self {
            Value::I32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("I32")),
        }
    }

    pub fn try_i64(&self) -> Result<Option<i64>, ValueKindError> {
        match self {
            Value::I64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("I64")),
        }
    }

    pub fn try_u8(&self) -> Result<Option<u8>, ValueKindError> {
        match self {
            Value::U8(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("U8")),
        }
    }

    pub fn try_u16(&self) -> Result<Option<u16>, ValueKindError> {
        match self {
            Value::U16(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("U16")),
        }
    }

    pub fn try_u32(&self) -> Result<Option<u32>, ValueKindError> {
        match self {
            Value::U32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("U32")),
        }
    }

    pub fn try_u64(&self) -> Result<Option<u64>, ValueKindError> {
        match self {
            Value::U64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("U64")),
        }
    }

    pub fn try_f32(&self) -> Result<Option<f32>, ValueKindError> {
        match self {
            Value::F32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("F32")),
        }
    }

    pub fn try_f64(&self) -> Result<Option<f64>, ValueKindError> {
        match self {
            Value::F64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("F64")),
        }
    }

    pub fn try_str(&self) -> Result<Option<&str>, ValueKindError> {
        match self {
            Value::String(v) => Ok(Some(v.as_ref())),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("String")),
        }
    }

    pub fn try_bytes(&self) -> Result<Option<&[u8]>, ValueKindError> {
        match self {
            Value::Bytes(v) => Ok(Some(v.as_ref())),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("Bytes")),
        }
    }

    pub fn try_record(&self) -> Result<Option<&Record>, ValueKindError> {
        match self {
            Value::Record(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("Record")),
        }
    }

    pub fn try_list(&self) -> Result<Option<&[Value]>, ValueKindError> {
        match self {
            Value::List(v) => Ok(Some(v.as_slice())),
            Value::Null => Ok(None),
            _ => Err(self.kind_mismatch("List")),
        }
    }

    /// Widen any unsigned integer kind, or a non-negative signed one, to
    /// `u64`. Returns `None` for every other kind and for negative values.
    ///
    /// Count and length source fields are extracted through this.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(u64::from(v)),
            Value::U16(v) => Some(u64::from(v)),
            Value::U32(v) => Some(u64::from(v)),
            Value::U64(v) => Some(v),
            Value::I8(v) => u64::try_from(v).ok(),
            Value::I16(v) => u64::try_from(v).ok(),
            Value::I32(v) => u64::try_from(v).ok(),
            Value::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Widen any integer kind to `i64`, when it fits.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(i64::from(v)),
            Value::I16(v) => Some(i64::from(v)),
            Value::I32(v) => Some(i64::from(v)),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(i64::from(v)),
            Value::U16(v) => Some(i64::from(v)),
            Value::U32(v) => Some(i64::from(v)),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn kind_mismatch(&self, expected: &'static str) -> ValueKindError {
        ValueKindError::new(expected, self.kind_name())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I8(_) => "I8",
            Value::I16(_) => "I16",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::U8(_) => "U8",
            Value::U16(_) => "U16",
            Value::U32(_) => "U32",
            Value::U64(_) => "U64",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Record(_) => "Record",
            Value::List(_) => "List",
            Value::Variant { .. } => "Variant",
        }
    }
}

/// An ordered collection of named fields — the live instance the codec
/// engine reads from and writes into.
///
/// Field order is insertion order and carries no wire meaning; the schema's
/// declared order decides the byte layout. Names are unique: `set` replaces
/// an existing field in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(Arc<str>, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion for fixtures and hand-assembled values.
    pub fn with_field(mut self, name: impl AsRef<str>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Like [`get`](Self::get) but raises [`AccessError::MissingField`].
    pub fn require(&self, name: &str) -> Result<&Value, AccessError> {
        self.get(name).ok_or_else(|| AccessError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn set(&mut self, name: impl AsRef<str>, value: Value) {
        let name = name.as_ref();
        match self.fields.iter_mut().find(|(n, _)| n.as_ref() == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((Arc::from(name), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_ref(), v))
    }
}

impl FromIterator<(Arc<str>, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (Arc<str>, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}
