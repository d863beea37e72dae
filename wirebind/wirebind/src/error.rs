//! Error taxonomy: fatal bind-time failures and per-call codec failures.

use wirebind_core::{AccessError, ValueKindError};

/// Error raised while binding a schema description into a graph.
///
/// Binding errors are fatal for the type: nothing is cached, and every use
/// of the type keeps failing until the description is corrected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    /// A named reference does not resolve to any sibling or ancestor field.
    #[error("field '{field}': reference '{reference}' does not resolve in scope")]
    UnresolvedReference { field: String, reference: String },

    /// Two fields of one struct share a declared order.
    #[error("struct '{parent}': fields '{first}' and '{second}' share order {order}")]
    DuplicateOrder {
        parent: String,
        first: String,
        second: String,
        order: u32,
    },

    /// Two fields of one struct share a name.
    #[error("struct '{parent}': duplicate field name '{field}'")]
    DuplicateField { parent: String, field: String },

    /// A reference target has an incompatible kind (e.g. a count source
    /// that is not an integer field).
    #[error("field '{field}': reference '{reference}' {detail}")]
    KindMismatch {
        field: String,
        reference: String,
        detail: String,
    },

    /// The source field does not precede the dependent field in layout
    /// order, so its value would not be live when needed on decode.
    #[error("field '{field}': source '{reference}' does not precede it in layout order")]
    ForwardReference { field: String, reference: String },

    /// A field binds to itself or to a field nested inside itself.
    #[error("field '{field}': reference '{reference}' creates a measurement cycle")]
    CyclicBinding { field: String, reference: String },

    /// One source field is claimed by more than one computed role.
    #[error("field '{field}' is bound by both '{first}' and '{second}'")]
    ConflictingBinding {
        field: String,
        first: String,
        second: String,
    },

    /// A collection has no count, length, per-item length, or terminator.
    #[error("field '{field}': collection has no count, length, or terminator")]
    UnboundedCollection { field: String },

    /// More than one sizing mechanism on a single field.
    #[error("field '{field}': more than one of count/length/item-length/terminator")]
    ConflictingSizes { field: String },

    /// A raw string or bytes field without a byte length source.
    #[error("field '{field}': {kind} requires a byte length source")]
    MissingLength { field: String, kind: &'static str },

    /// A length source on a field whose size is already self-defined.
    #[error("field '{field}': {kind} cannot carry a byte length source")]
    UnexpectedLength { field: String, kind: &'static str },

    /// Two union cases share a discriminator value.
    #[error("field '{field}': duplicate tag value for cases '{first}' and '{second}'")]
    DuplicateTag {
        field: String,
        first: String,
        second: String,
    },

    /// Two union cases share a name.
    #[error("field '{field}': duplicate case name '{case}'")]
    DuplicateCase { field: String, case: String },

    /// A union case tag value that cannot be carried by the tag field.
    #[error("field '{field}': case '{case}' tag value does not fit the tag field")]
    TagValueMismatch { field: String, case: String },

    /// A descriptor shape the binder cannot give meaning to.
    #[error("field '{field}': {detail}")]
    InvalidDescriptor { field: String, detail: String },
}

/// Error returned by a single serialize, deserialize, or size call.
///
/// Decode failures are never partially recovered: a failed call returns no
/// value and leaves no shared state behind.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The schema for this type failed to bind (raised at first use).
    #[error("schema failed to bind: {0}")]
    Binding(#[from] BindError),

    /// The underlying stream ended before a declared or implied length was
    /// satisfied.
    #[error("truncated data at '{path}': needed {needed} more bytes")]
    TruncatedData { path: String, needed: u64 },

    /// A read would cross a declared byte bound.
    #[error("bound exceeded at '{path}': {requested} bytes requested, {available} available")]
    BoundExceeded {
        path: String,
        requested: u64,
        available: u64,
    },

    /// A discriminator value with no matching union case, or a variant case
    /// name the schema does not declare.
    #[error("unknown variant at '{path}': {tag}")]
    UnknownVariant { path: String, tag: String },

    /// A fixed declared length disagrees with the measured length.
    #[error("length mismatch at '{path}': declared {declared}, measured {measured}")]
    LengthMismatch {
        path: String,
        declared: u64,
        measured: u64,
    },

    /// A fixed declared element count disagrees with the live collection.
    #[error("count mismatch at '{path}': declared {declared}, got {actual}")]
    CountMismatch {
        path: String,
        declared: usize,
        actual: usize,
    },

    /// A computed or decoded value does not fit the declared field kind.
    #[error("value out of range at '{path}': {detail}")]
    ValueOutOfRange { path: String, detail: String },

    /// A live value's kind does not match the schema node.
    #[error("type mismatch at '{path}': {source}")]
    TypeMismatch {
        path: String,
        #[source]
        source: ValueKindError,
    },

    /// The live record lacks a field the schema requires.
    #[error("missing field at '{path}'")]
    MissingField { path: String },

    /// Record access failed; propagated unchanged from the value layer.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Text that the configured encoding cannot represent or decode.
    #[error("invalid text at '{path}': {detail}")]
    InvalidText { path: String, detail: String },

    /// I/O failure on the underlying stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    pub(crate) fn type_mismatch(path: &str, source: ValueKindError) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            source,
        }
    }
}
