//! Fixed-width primitive and string codec under a per-call configuration.

use std::io::Write;
use std::sync::Arc;

use wirebind_core::Value;

use crate::{
    config::{Endianness, TextEncoding, WireConfig},
    error::WireError,
    io::BoundedReader,
    spec::PrimitiveType,
};

fn put<const N: usize>(
    out: &mut dyn Write,
    le: [u8; N],
    be: [u8; N],
    endianness: Endianness,
) -> Result<(), WireError> {
    match endianness {
        Endianness::Little => out.write_all(&le)?,
        Endianness::Big => out.write_all(&be)?,
    }
    Ok(())
}

fn get<const N: usize>(r: &mut BoundedReader<'_>, path: &str) -> Result<[u8; N], WireError> {
    let mut buf = [0u8; N];
    r.take(&mut buf, path)?;
    Ok(buf)
}

/// Encode one primitive value. The live value's kind must match the
/// declared kind exactly; no implicit numeric conversion happens here.
pub(crate) fn encode_primitive(
    p: PrimitiveType,
    value: &Value,
    config: &WireConfig,
    out: &mut dyn Write,
    path: &str,
) -> Result<(), WireError> {
    let e = config.endianness;
    match (value, p) {
        (Value::Bool(v), PrimitiveType::Bool) => out.write_all(&[u8::from(*v)])?,
        (Value::I8(v), PrimitiveType::I8) => out.write_all(&v.to_le_bytes())?,
        (Value::U8(v), PrimitiveType::U8) => out.write_all(&[*v])?,
        (Value::I16(v), PrimitiveType::I16) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::I32(v), PrimitiveType::I32) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::I64(v), PrimitiveType::I64) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::U16(v), PrimitiveType::U16) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::U32(v), PrimitiveType::U32) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::U64(v), PrimitiveType::U64) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::F32(v), PrimitiveType::F32) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (Value::F64(v), PrimitiveType::F64) => put(out, v.to_le_bytes(), v.to_be_bytes(), e)?,
        (other, p) => {
            return Err(WireError::type_mismatch(
                path,
                other.kind_mismatch(kind_label(p)),
            ));
        }
    }
    Ok(())
}

/// Decode one primitive value.
pub(crate) fn decode_primitive(
    p: PrimitiveType,
    config: &WireConfig,
    r: &mut BoundedReader<'_>,
    path: &str,
) -> Result<Value, WireError> {
    let e = config.endianness;
    Ok(match p {
        PrimitiveType::Bool => Value::Bool(r.take_byte(path)? != 0),
        PrimitiveType::I8 => Value::I8(r.take_byte(path)? as i8),
        PrimitiveType::U8 => Value::U8(r.take_byte(path)?),
        PrimitiveType::I16 => Value::I16(pick(e, get(r, path)?, i16::from_le_bytes, i16::from_be_bytes)),
        PrimitiveType::I32 => Value::I32(pick(e, get(r, path)?, i32::from_le_bytes, i32::from_be_bytes)),
        PrimitiveType::I64 => Value::I64(pick(e, get(r, path)?, i64::from_le_bytes, i64::from_be_bytes)),
        PrimitiveType::U16 => Value::U16(pick(e, get(r, path)?, u16::from_le_bytes, u16::from_be_bytes)),
        PrimitiveType::U32 => Value::U32(pick(e, get(r, path)?, u32::from_le_bytes, u32::from_be_bytes)),
        PrimitiveType::U64 => Value::U64(pick(e, get(r, path)?, u64::from_le_bytes, u64::from_be_bytes)),
        PrimitiveType::F32 => Value::F32(pick(e, get(r, path)?, f32::from_le_bytes, f32::from_be_bytes)),
        PrimitiveType::F64 => Value::F64(pick(e, get(r, path)?, f64::from_le_bytes, f64::from_be_bytes)),
    })
}

fn pick<T, const N: usize>(
    endianness: Endianness,
    bytes: [u8; N],
    le: impl Fn([u8; N]) -> T,
    be: impl Fn([u8; N]) -> T,
) -> T {
    match endianness {
        Endianness::Little => le(bytes),
        Endianness::Big => be(bytes),
    }
}

/// Coerce a computed count or measured length into a declared integer kind.
/// Overflow fails fast; nothing is wrapped or truncated.
pub(crate) fn uint_value(p: PrimitiveType, n: u64, path: &str) -> Result<Value, WireError> {
    let out_of_range = || WireError::ValueOutOfRange {
        path: path.to_string(),
        detail: format!("{n} does not fit {}", p.type_name()),
    };
    Ok(match p {
        PrimitiveType::U8 => Value::U8(u8::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::U16 => Value::U16(u16::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::U32 => Value::U32(u32::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::U64 => Value::U64(n),
        PrimitiveType::I8 => Value::I8(i8::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::I16 => Value::I16(i16::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::I32 => Value::I32(i32::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::I64 => Value::I64(i64::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveType::Bool | PrimitiveType::F32 | PrimitiveType::F64 => {
            return Err(WireError::ValueOutOfRange {
                path: path.to_string(),
                detail: format!("{} cannot carry a computed size", p.type_name()),
            });
        }
    })
}

/// Coerce a declared tag value into the tag field's integer kind, e.g. a
/// `U8(3)` case tag written through an `i32` tag field.
pub(crate) fn coerce_tag(p: PrimitiveType, tag: &Value, path: &str) -> Result<Value, WireError> {
    if let Some(i) = tag.as_int() {
        if i >= 0 {
            return uint_value(p, i as u64, path);
        }
        let out_of_range = || WireError::ValueOutOfRange {
            path: path.to_string(),
            detail: format!("{i} does not fit {}", p.type_name()),
        };
        return Ok(match p {
            PrimitiveType::I8 => Value::I8(i8::try_from(i).map_err(|_| out_of_range())?),
            PrimitiveType::I16 => Value::I16(i16::try_from(i).map_err(|_| out_of_range())?),
            PrimitiveType::I32 => Value::I32(i32::try_from(i).map_err(|_| out_of_range())?),
            PrimitiveType::I64 => Value::I64(i),
            _ => return Err(out_of_range()),
        });
    }
    Err(WireError::type_mismatch(
        path,
        tag.kind_mismatch(kind_label(p)),
    ))
}

fn kind_label(p: PrimitiveType) -> &'static str {
    match p {
        PrimitiveType::Bool => "Bool",
        PrimitiveType::I8 => "I8",
        PrimitiveType::I16 => "I16",
        PrimitiveType::I32 => "I32",
        PrimitiveType::I64 => "I64",
        PrimitiveType::U8 => "U8",
        PrimitiveType::U16 => "U16",
        PrimitiveType::U32 => "U32",
        PrimitiveType::U64 => "U64",
        PrimitiveType::F32 => "F32",
        PrimitiveType::F64 => "F64",
    }
}

/// Validate and encode text under the configured encoding. The terminator,
/// when any, is written by the caller.
pub(crate) fn encode_text(
    s: &str,
    config: &WireConfig,
    out: &mut dyn Write,
    path: &str,
) -> Result<(), WireError> {
    if config.text == TextEncoding::Ascii && !s.is_ascii() {
        return Err(WireError::InvalidText {
            path: path.to_string(),
            detail: "non-ASCII character under ASCII encoding".to_string(),
        });
    }
    out.write_all(s.as_bytes())?;
    Ok(())
}

/// Decode raw text bytes under the configured encoding.
pub(crate) fn text_from_bytes(
    bytes: Vec<u8>,
    config: &WireConfig,
    path: &str,
) -> Result<Arc<str>, WireError> {
    if config.text == TextEncoding::Ascii && !bytes.is_ascii() {
        return Err(WireError::InvalidText {
            path: path.to_string(),
            detail: "non-ASCII byte under ASCII encoding".to_string(),
        });
    }
    let s = String::from_utf8(bytes).map_err(|e| WireError::InvalidText {
        path: path.to_string(),
        detail: format!("invalid UTF-8: {e}"),
    })?;
    Ok(Arc::from(s))
}
