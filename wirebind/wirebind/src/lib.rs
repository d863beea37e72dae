//! Declarative binary codec: schemas with cross-field relationships, bound
//! once into an immutable graph and traversed by a paired
//! serialize/deserialize engine.
//!
//! Key components:
//! - [`spec`] — field descriptors consumed by the binder ([`FieldSpec`],
//!   [`WireType`], [`CountSpec`], [`Condition`], [`UnionSpec`], …)
//! - [`Schema`] — the bound graph, built via [`Schema::bind`] (cached
//!   process-wide) or [`Schema::bind_uncached`]
//! - serialize/deserialize/size entry points on [`Schema`], driven by a
//!   per-call [`WireConfig`] and optional [`Observer`] hooks
//! - [`MeasuringSink`] / [`BoundedReader`] — the engine's only I/O surface
//!
//! A field bound as a count, length, item-length, or tag source is computed
//! on write (by measuring the dependent field into a [`MeasuringSink`]) and
//! consumed on read (to bound the dependent field through a
//! [`BoundedReader`]), so the caller never maintains the relationship by
//! hand.

mod bind;
mod cache;
mod config;
mod de;
mod error;
mod format;
mod io;
mod observe;
mod prim;
mod ser;
pub mod spec;

pub use bind::Schema;
pub use cache::schema_bind_count;
pub use config::{Endianness, TextEncoding, WireConfig};
pub use error::{BindError, WireError};
pub use format::format_schema;
pub use io::{BoundedReader, MeasuringSink};
pub use observe::{FieldEvent, HookFn, Observer};
pub use spec::{
    Cmp, Condition, CountSpec, FieldRef, FieldSpec, LengthSpec, PrimitiveType, StrEncoding,
    StructSpec, Terminator, UnionCase, UnionSpec, WireType,
};

pub use wirebind_core::{AccessError, Record, Value, ValueKindError};
