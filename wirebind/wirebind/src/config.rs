//! Per-call serialization configuration.

/// Byte order applied to every fixed-width primitive in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Text encoding applied to every string field in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// 7-bit ASCII, checked on both encode and decode.
    Ascii,
}

/// Configuration fixed for the duration of one serialize or deserialize
/// call. Distinct calls may use distinct configurations against the same
/// bound schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireConfig {
    pub endianness: Endianness,
    pub text: TextEncoding,
}

impl WireConfig {
    pub fn big_endian() -> Self {
        Self {
            endianness: Endianness::Big,
            ..Self::default()
        }
    }
}
