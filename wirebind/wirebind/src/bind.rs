//! Binding: schema descriptions into resolved, immutable graphs.
//!
//! The binder runs in two passes per type. The first pass builds one node
//! per field (children ordered by declared order) into a flat arena, so
//! every cross-reference can later be a plain index instead of an owning
//! pointer. The second pass resolves every named [`FieldRef`] into an arena
//! index and attaches the reverse edge to the source field: a count, length,
//! item-length, or tag source learns at bind time that its on-wire value is
//! computed, so the codec engine never performs a name lookup.
//!
//! # Lookup strategy for references
//!
//! 1. **Siblings** — fields of the referencing field's own struct.
//! 2. **Ancestors** — each enclosing struct scope outward, nearest first.
//! 3. **Error** — an unresolved name is a fatal [`BindError`]; nothing is
//!    cached for the type.
//!
//! All validation happens here: a graph that binds cannot fail structurally
//! at serialize/deserialize time, only on data.

use std::sync::Arc;

use wirebind_core::Value;

use crate::{
    error::BindError,
    spec::{
        Cmp, Condition, CountSpec, FieldRef, FieldSpec, LengthSpec, PrimitiveType, StrEncoding,
        StructSpec, Terminator, UnionSpec, WireType,
    },
};

pub(crate) type NodeId = usize;

/// Placeholder index used between pass one and pass two; never observable
/// through a successfully bound schema.
const UNRESOLVED: NodeId = usize::MAX;

/// Nesting deeper than this is treated as a recursive description.
const MAX_DEPTH: usize = 64;

/// A bound schema: the arena of nodes for one value type, built once and
/// shared read-only across all serialize/deserialize calls.
#[derive(Debug)]
pub struct Schema {
    name: Arc<str>,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn root_node(&self) -> NodeId {
        self.root
    }

    /// Nearest enclosing struct node, skipping list/union containers.
    pub(crate) fn parent_struct(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            if matches!(self.nodes[p].kind, NodeKind::Struct { .. }) {
                return Some(p);
            }
            cur = self.nodes[p].parent;
        }
        None
    }

    /// Bind `spec` without touching the process-wide cache.
    pub fn bind_uncached(spec: &StructSpec) -> Result<Self, BindError> {
        Binder::default().bind(spec)
    }
}

/// Bound runtime form of one field descriptor.
#[derive(Debug)]
pub(crate) struct Node {
    pub name: Arc<str>,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub when: Option<BoundCondition>,
    /// Set on a field whose on-wire value is derived from another field
    /// rather than taken from the live instance.
    pub computed: Option<Computed>,
    /// Total byte length bound, when declared.
    pub length: Option<BoundLength>,
    pub ignore: bool,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Primitive(PrimitiveType),
    Str(StrEncoding),
    Bytes,
    Struct { children: Vec<NodeId> },
    List { elem: NodeId, len: ListLen },
    Union { tag: NodeId, cases: Vec<BoundCase> },
}

impl NodeKind {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.type_name(),
            Self::Str(_) => "string",
            Self::Bytes => "bytes",
            Self::Struct { .. } => "struct",
            Self::List { .. } => "list",
            Self::Union { .. } => "union",
        }
    }
}

/// How a bound collection knows when to stop.
#[derive(Debug)]
pub(crate) enum ListLen {
    /// Schema-time constant element count.
    Fixed(usize),
    /// Element count read from / computed into the source field.
    Counted(NodeId),
    /// Per-item byte lengths from a sibling integer list.
    ItemBound(NodeId),
    /// Elements until the byte-length bound is exhausted.
    ToEnd,
    /// Elements until the terminator matches (inclusive).
    Until(Terminator),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BoundLength {
    Fixed(u64),
    Field(NodeId),
    /// Supplied per element by the enclosing item-bound list.
    Item,
}

/// Reverse edge: the role a source field plays for a later field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Computed {
    CountOf(NodeId),
    LenOf(NodeId),
    ItemLenOf(NodeId),
    TagOf(NodeId),
}

impl Computed {
    fn target(self) -> NodeId {
        match self {
            Self::CountOf(t) | Self::LenOf(t) | Self::ItemLenOf(t) | Self::TagOf(t) => t,
        }
    }
}

#[derive(Debug)]
pub(crate) struct BoundCondition {
    pub source: NodeId,
    pub op: Cmp,
    pub value: Value,
}

/// One union case with its canonicalized discriminator key.
#[derive(Debug)]
pub(crate) struct BoundCase {
    pub name: Arc<str>,
    pub key: TagKey,
    pub tag_value: Value,
    pub node: NodeId,
}

/// Canonical form of a discriminator value, so `U8(3)` and `I64(3)` tags
/// compare equal regardless of the tag field's declared width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagKey {
    Bool(bool),
    Int(i128),
    Str(Arc<str>),
}

pub(crate) fn tag_key(value: &Value) -> Option<TagKey> {
    match value {
        Value::Bool(b) => Some(TagKey::Bool(*b)),
        Value::String(s) => Some(TagKey::Str(s.clone())),
        _ => match (value.as_int(), value.as_uint()) {
            (Some(i), _) => Some(TagKey::Int(i128::from(i))),
            (None, Some(u)) => Some(TagKey::Int(i128::from(u))),
            _ => None,
        },
    }
}

/// A reference noted during pass one, resolved in pass two.
enum PendingWhat {
    Count(FieldRef),
    Length(FieldRef),
    ItemLength(FieldRef),
    Tag(FieldRef),
    When(Condition),
}

struct Pending {
    node: NodeId,
    what: PendingWhat,
}

#[derive(Default)]
struct Binder {
    nodes: Vec<Node>,
    pending: Vec<Pending>,
}

impl Binder {
    fn bind(mut self, spec: &StructSpec) -> Result<Schema, BindError> {
        let root = self.build_struct(spec.name.clone(), &spec.fields, None, 0)?;
        self.resolve_all()?;
        Ok(Schema {
            name: spec.name.clone(),
            nodes: self.nodes,
            root,
        })
    }

    // ── pass one: node construction ──────────────────────────────────────

    fn build_struct(
        &mut self,
        name: Arc<str>,
        fields: &[FieldSpec],
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId, BindError> {
        if depth > MAX_DEPTH {
            return Err(BindError::InvalidDescriptor {
                field: name.to_string(),
                detail: "nesting exceeds the supported depth (recursive description?)".to_string(),
            });
        }

        let id = self.push(Node {
            name: name.clone(),
            parent,
            kind: NodeKind::Struct { children: vec![] },
            when: None,
            computed: None,
            length: None,
            ignore: false,
        });

        let mut ordered: Vec<&FieldSpec> = fields.iter().collect();
        ordered.sort_by_key(|f| f.order);
        for pair in ordered.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(BindError::DuplicateOrder {
                    parent: name.to_string(),
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                    order: pair[0].order,
                });
            }
        }

        let mut children = Vec::with_capacity(ordered.len());
        for &field in &ordered {
            if ordered
                .iter()
                .filter(|other| other.name == field.name)
                .count()
                > 1
            {
                return Err(BindError::DuplicateField {
                    parent: name.to_string(),
                    field: field.name.clone(),
                });
            }
            children.push(self.build_field(field, id, depth + 1)?);
        }

        match &mut self.nodes[id].kind {
            NodeKind::Struct { children: slot } => *slot = children,
            _ => unreachable!("node {id} was just created as a struct"),
        }
        Ok(id)
    }

    fn build_field(
        &mut self,
        field: &FieldSpec,
        parent: NodeId,
        depth: usize,
    ) -> Result<NodeId, BindError> {
        let name: Arc<str> = Arc::from(field.name.as_str());
        let id = self.build_type(name, &field.ty, parent, depth)?;

        self.apply_sizing(id, field)?;
        self.nodes[id].ignore = field.ignore;
        if let Some(when) = &field.when {
            self.pending.push(Pending {
                node: id,
                what: PendingWhat::When(when.clone()),
            });
        }
        Ok(id)
    }

    /// Build the node for a type expression. Also used for list elements
    /// and union cases, which carry no field descriptor of their own.
    fn build_type(
        &mut self,
        name: Arc<str>,
        ty: &WireType,
        parent: NodeId,
        depth: usize,
    ) -> Result<NodeId, BindError> {
        if depth > MAX_DEPTH {
            return Err(BindError::InvalidDescriptor {
                field: name.to_string(),
                detail: "nesting exceeds the supported depth (recursive description?)".to_string(),
            });
        }
        match ty {
            WireType::Primitive(p) => Ok(self.push_leaf(name, parent, NodeKind::Primitive(*p))),
            WireType::Str(enc) => Ok(self.push_leaf(name, parent, NodeKind::Str(*enc))),
            WireType::Bytes => Ok(self.push_leaf(name, parent, NodeKind::Bytes)),
            WireType::Struct(ss) => {
                self.build_struct(name, &ss.fields, Some(parent), depth)
            }
            WireType::List(elem_ty) => {
                let id = self.push(Node {
                    name: name.clone(),
                    parent: Some(parent),
                    kind: NodeKind::List {
                        elem: UNRESOLVED,
                        len: ListLen::ToEnd,
                    },
                    when: None,
                    computed: None,
                    length: None,
                    ignore: false,
                });
                let elem = self.build_type(name, elem_ty, id, depth + 1)?;
                match &mut self.nodes[id].kind {
                    NodeKind::List { elem: slot, .. } => *slot = elem,
                    _ => unreachable!("node {id} was just created as a list"),
                }
                Ok(id)
            }
            WireType::Union(us) => self.build_union(name, us, parent, depth),
        }
    }

    fn build_union(
        &mut self,
        name: Arc<str>,
        us: &UnionSpec,
        parent: NodeId,
        depth: usize,
    ) -> Result<NodeId, BindError> {
        let id = self.push(Node {
            name: name.clone(),
            parent: Some(parent),
            kind: NodeKind::Union {
                tag: UNRESOLVED,
                cases: vec![],
            },
            when: None,
            computed: None,
            length: None,
            ignore: false,
        });

        let mut cases = Vec::with_capacity(us.cases.len());
        for case in &us.cases {
            if cases.iter().any(|c: &BoundCase| c.name == case.name) {
                return Err(BindError::DuplicateCase {
                    field: name.to_string(),
                    case: case.name.to_string(),
                });
            }
            let Some(key) = tag_key(&case.tag_value) else {
                return Err(BindError::TagValueMismatch {
                    field: name.to_string(),
                    case: case.name.to_string(),
                });
            };
            if let Some(dup) = cases.iter().find(|c: &&BoundCase| c.key == key) {
                return Err(BindError::DuplicateTag {
                    field: name.to_string(),
                    first: dup.name.to_string(),
                    second: case.name.to_string(),
                });
            }
            let node = self.build_type(case.name.clone(), &case.ty, id, depth + 1)?;
            cases.push(BoundCase {
                name: case.name.clone(),
                key,
                tag_value: case.tag_value.clone(),
                node,
            });
        }

        self.pending.push(Pending {
            node: id,
            what: PendingWhat::Tag(us.tag.clone()),
        });
        match &mut self.nodes[id].kind {
            NodeKind::Union { cases: slot, .. } => *slot = cases,
            _ => unreachable!("node {id} was just created as a union"),
        }
        Ok(id)
    }

    /// Validate and record the sizing mechanism of one field.
    fn apply_sizing(&mut self, id: NodeId, field: &FieldSpec) -> Result<(), BindError> {
        let is_list = matches!(self.nodes[id].kind, NodeKind::List { .. });
        let mechanisms = usize::from(field.count.is_some())
            + usize::from(field.length.is_some())
            + usize::from(field.item_length.is_some())
            + usize::from(field.until.is_some());
        if mechanisms > 1 {
            return Err(BindError::ConflictingSizes {
                field: field.name.clone(),
            });
        }

        if !is_list && (field.count.is_some() || field.item_length.is_some() || field.until.is_some())
        {
            return Err(BindError::InvalidDescriptor {
                field: field.name.clone(),
                detail: format!(
                    "count/item-length/terminator on a {}",
                    self.nodes[id].kind.kind_name()
                ),
            });
        }

        match &self.nodes[id].kind {
            NodeKind::Primitive(_) | NodeKind::Str(StrEncoding::NulTerminated) => {
                if field.length.is_some() {
                    return Err(BindError::UnexpectedLength {
                        field: field.name.clone(),
                        kind: self.nodes[id].kind.kind_name(),
                    });
                }
            }
            NodeKind::Str(StrEncoding::Raw) => {
                if field.length.is_none() {
                    return Err(BindError::MissingLength {
                        field: field.name.clone(),
                        kind: "a raw string",
                    });
                }
            }
            NodeKind::Bytes => {
                if field.length.is_none() {
                    return Err(BindError::MissingLength {
                        field: field.name.clone(),
                        kind: "a bytes field",
                    });
                }
            }
            NodeKind::List { .. } if mechanisms == 0 => {
                return Err(BindError::UnboundedCollection {
                    field: field.name.clone(),
                });
            }
            _ => {}
        }

        match &field.length {
            Some(LengthSpec::Fixed(n)) => self.nodes[id].length = Some(BoundLength::Fixed(*n as u64)),
            Some(LengthSpec::Field(r)) => self.pending.push(Pending {
                node: id,
                what: PendingWhat::Length(r.clone()),
            }),
            None => {}
        }

        if is_list {
            match (&field.count, &field.item_length, &field.until) {
                (Some(CountSpec::Fixed(n)), _, _) => self.set_list_len(id, ListLen::Fixed(*n)),
                (Some(CountSpec::Field(r)), _, _) => self.pending.push(Pending {
                    node: id,
                    what: PendingWhat::Count(r.clone()),
                }),
                (_, Some(r), _) => {
                    self.pending.push(Pending {
                        node: id,
                        what: PendingWhat::ItemLength(r.clone()),
                    });
                    // Elements of an item-bound list take their byte length
                    // from the source list, one entry per element.
                    let NodeKind::List { elem, .. } = self.nodes[id].kind else {
                        unreachable!("checked above");
                    };
                    self.nodes[elem].length = Some(BoundLength::Item);
                }
                (_, _, Some(t)) => self.set_list_len(id, ListLen::Until(t.clone())),
                (None, None, None) => {} // total-byte-length list: ListLen::ToEnd
            }
        }

        // A raw-string or bytes element inside a list must inherit a
        // per-item bound; any other list leaves it with no length at all.
        if let NodeKind::List { elem, .. } = self.nodes[id].kind {
            let elem_node = &self.nodes[elem];
            let unsized_elem = matches!(
                elem_node.kind,
                NodeKind::Str(StrEncoding::Raw) | NodeKind::Bytes
            ) && elem_node.length.is_none();
            if unsized_elem {
                return Err(BindError::MissingLength {
                    field: field.name.clone(),
                    kind: "a raw string or bytes element",
                });
            }
        }

        Ok(())
    }

    fn set_list_len(&mut self, id: NodeId, len: ListLen) {
        match &mut self.nodes[id].kind {
            NodeKind::List { len: slot, .. } => *slot = len,
            _ => unreachable!("sizing is only applied to lists"),
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn push_leaf(&mut self, name: Arc<str>, parent: NodeId, kind: NodeKind) -> NodeId {
        self.push(Node {
            name,
            parent: Some(parent),
            kind,
            when: None,
            computed: None,
            length: None,
            ignore: false,
        })
    }

    // ── pass two: reference resolution ───────────────────────────────────

    fn resolve_all(&mut self) -> Result<(), BindError> {
        let pending = std::mem::take(&mut self.pending);
        for Pending { node, what } in pending {
            match what {
                PendingWhat::Count(r) => {
                    let source = self.resolve_source(node, &r, "an integer field", |k| {
                        matches!(k, NodeKind::Primitive(p) if p.is_integer())
                    })?;
                    self.check_measurable(node, source)?;
                    self.claim(source, Computed::CountOf(node))?;
                    self.set_list_len(node, ListLen::Counted(source));
                }
                PendingWhat::Length(r) => {
                    let source = self.resolve_source(node, &r, "an integer field", |k| {
                        matches!(k, NodeKind::Primitive(p) if p.is_integer())
                    })?;
                    self.check_measurable(node, source)?;
                    self.claim(source, Computed::LenOf(node))?;
                    self.nodes[node].length = Some(BoundLength::Field(source));
                }
                PendingWhat::ItemLength(r) => {
                    let source = self.resolve_source(node, &r, "a list of integers", |k| {
                        matches!(k, NodeKind::List { .. })
                    })?;
                    let NodeKind::List { elem, .. } = self.nodes[source].kind else {
                        unreachable!("kind checked by resolve_source");
                    };
                    if !matches!(self.nodes[elem].kind, NodeKind::Primitive(p) if p.is_integer()) {
                        return Err(BindError::KindMismatch {
                            field: self.nodes[node].name.to_string(),
                            reference: r.0,
                            detail: "must be a list of integers".to_string(),
                        });
                    }
                    self.check_measurable(node, source)?;
                    self.claim(source, Computed::ItemLenOf(node))?;
                    self.set_list_len(node, ListLen::ItemBound(source));
                }
                PendingWhat::Tag(r) => {
                    let source = self.resolve_source(node, &r, "an integer or string field", |k| {
                        matches!(k, NodeKind::Primitive(p) if p.is_integer())
                            || matches!(k, NodeKind::Str(_))
                            || matches!(k, NodeKind::Primitive(PrimitiveType::Bool))
                    })?;
                    self.check_measurable(node, source)?;
                    self.check_tag_keys(node, source)?;
                    self.claim(source, Computed::TagOf(node))?;
                    match &mut self.nodes[node].kind {
                        NodeKind::Union { tag: slot, .. } => *slot = source,
                        _ => unreachable!("tag pendings are only recorded for unions"),
                    }
                }
                PendingWhat::When(cond) => {
                    let source = self.resolve_source(node, &cond.field, "any scalar field", |k| {
                        !matches!(
                            k,
                            NodeKind::Struct { .. } | NodeKind::List { .. } | NodeKind::Union { .. }
                        )
                    })?;
                    self.nodes[node].when = Some(BoundCondition {
                        source,
                        op: cond.op,
                        value: cond.value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve `reference` from `from`'s scope and run the shared
    /// direction/cycle/kind checks every binding needs.
    fn resolve_source(
        &self,
        from: NodeId,
        reference: &FieldRef,
        expected: &str,
        kind_ok: impl Fn(&NodeKind) -> bool,
    ) -> Result<NodeId, BindError> {
        let field = self.nodes[from].name.to_string();
        let Some(source) = self.resolve_name(from, &reference.0) else {
            return Err(BindError::UnresolvedReference {
                field,
                reference: reference.0.clone(),
            });
        };
        if source == from || self.is_descendant(source, from) {
            return Err(BindError::CyclicBinding {
                field,
                reference: reference.0.clone(),
            });
        }
        if source > from {
            return Err(BindError::ForwardReference {
                field,
                reference: reference.0.clone(),
            });
        }
        if !kind_ok(&self.nodes[source].kind) {
            return Err(BindError::KindMismatch {
                field,
                reference: reference.0.clone(),
                detail: format!("must be {expected}"),
            });
        }
        Ok(source)
    }

    /// Walk enclosing struct scopes outward; the nearest field with a
    /// matching name wins.
    fn resolve_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut scope = self.enclosing_struct(from);
        while let Some(s) = scope {
            if let NodeKind::Struct { children } = &self.nodes[s].kind
                && let Some(&child) = children
                    .iter()
                    .find(|&&c| self.nodes[c].name.as_ref() == name)
            {
                return Some(child);
            }
            scope = self.enclosing_struct(s);
        }
        None
    }

    fn enclosing_struct(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            if matches!(self.nodes[p].kind, NodeKind::Struct { .. }) {
                return Some(p);
            }
            cur = self.nodes[p].parent;
        }
        None
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cur = self.nodes[node].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.nodes[p].parent;
        }
        false
    }

    /// A computed binding must not cross a collection or union boundary:
    /// a dependent inside a repeated or variant element has no single
    /// instance the source could be measured from. Presence conditions are
    /// exempt — they only read, never measure.
    fn check_measurable(&self, dependent: NodeId, source: NodeId) -> Result<(), BindError> {
        let scope = self.enclosing_struct(source);
        let mut cur = self.nodes[dependent].parent;
        while let Some(p) = cur {
            if Some(p) == scope {
                return Ok(());
            }
            if matches!(
                self.nodes[p].kind,
                NodeKind::List { .. } | NodeKind::Union { .. }
            ) {
                return Err(BindError::InvalidDescriptor {
                    field: self.nodes[dependent].name.to_string(),
                    detail: format!(
                        "binding to '{}' crosses a collection or variant boundary",
                        self.nodes[source].name
                    ),
                });
            }
            cur = self.nodes[p].parent;
        }
        Ok(())
    }

    /// Attach a computed role to a source field; one role per source.
    fn claim(&mut self, source: NodeId, role: Computed) -> Result<(), BindError> {
        if self.nodes[source].ignore {
            return Err(BindError::InvalidDescriptor {
                field: self.nodes[source].name.to_string(),
                detail: "an off-wire field cannot be a binding source".to_string(),
            });
        }
        if let Some(existing) = self.nodes[source].computed {
            return Err(BindError::ConflictingBinding {
                field: self.nodes[source].name.to_string(),
                first: self.nodes[existing.target()].name.to_string(),
                second: self.nodes[role.target()].name.to_string(),
            });
        }
        self.nodes[source].computed = Some(role);
        Ok(())
    }

    /// Re-check every case key of a union against the resolved tag kind.
    fn check_tag_keys(&self, union: NodeId, tag: NodeId) -> Result<(), BindError> {
        let NodeKind::Union { cases, .. } = &self.nodes[union].kind else {
            unreachable!("tag pendings are only recorded for unions");
        };
        for case in cases {
            let fits = match (&self.nodes[tag].kind, &case.key) {
                (NodeKind::Primitive(PrimitiveType::Bool), TagKey::Bool(_)) => true,
                (NodeKind::Primitive(p), TagKey::Int(_)) if p.is_integer() => true,
                (NodeKind::Str(_), TagKey::Str(_)) => true,
                _ => false,
            };
            if !fits {
                return Err(BindError::TagValueMismatch {
                    field: self.nodes[union].name.to_string(),
                    case: case.name.to_string(),
                });
            }
        }
        Ok(())
    }
}
