//! Engine-independent value model and record access for `wirebind`.
//!
//! This crate provides the dynamic intermediate representation the codec
//! engine traverses ([`Value`] / [`Record`]) and the access errors raised
//! when a named field is missing or carries the wrong kind of value.

mod error;
mod value;

pub use error::{AccessError, ValueKindError};
pub use value::{Record, Value};
