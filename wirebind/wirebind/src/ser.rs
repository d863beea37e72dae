//! Serialization traversal.
//!
//! Fields are written in declared order against the live record. A field
//! bound as a count, length, item-length, or tag source never takes its
//! value from the record: the engine measures the dependent field first —
//! recursively serializing it into a [`MeasuringSink`], never the real
//! stream — and writes the derived value in its place. Computed values are
//! held in per-call scratch state keyed by node index; the caller's value
//! is never mutated.

use std::collections::HashMap;
use std::io::Write;

use wirebind_core::{Record, Value};

use crate::{
    bind::{BoundCondition, BoundLength, Computed, ListLen, NodeId, NodeKind, Schema},
    config::WireConfig,
    error::WireError,
    io::MeasuringSink,
    observe::Observer,
    prim,
    spec::{Cmp, PrimitiveType, StrEncoding},
};

impl Schema {
    /// Write `value`'s wire representation with the default configuration
    /// and no observer.
    pub fn serialize(&self, out: &mut impl Write, value: &Value) -> Result<(), WireError> {
        self.serialize_with(out, value, &WireConfig::default(), &Observer::default())
    }

    pub fn serialize_with(
        &self,
        out: &mut impl Write,
        value: &Value,
        config: &WireConfig,
        observer: &Observer,
    ) -> Result<(), WireError> {
        let mut ser = Ser {
            schema: self,
            config,
            observer,
            frames: Vec::new(),
            measuring: 0,
        };
        let path = self.name().to_string();
        ser.write_node(self.root_node(), value, out, &path)
    }

    pub fn serialize_to_vec(&self, value: &Value) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        self.serialize(&mut buf, value)?;
        Ok(buf)
    }

    /// Total wire size of `value`, computed without allocating the output.
    pub fn size_of(&self, value: &Value) -> Result<u64, WireError> {
        let mut sink = MeasuringSink::new();
        let mut ser = Ser {
            schema: self,
            config: &WireConfig::default(),
            observer: &Observer::default(),
            frames: Vec::new(),
            measuring: 1,
        };
        let path = self.name().to_string();
        ser.write_node(self.root_node(), value, &mut sink, &path)?;
        Ok(sink.written())
    }
}

struct Frame<'v> {
    struct_node: NodeId,
    record: &'v Record,
    /// Computed source values, keyed by node. Consulted by conditions and
    /// surfaced to hooks; never written back to the caller's record.
    scratch: HashMap<NodeId, Value>,
}

struct Ser<'v, 'c> {
    schema: &'c Schema,
    config: &'c WireConfig,
    observer: &'c Observer,
    frames: Vec<Frame<'v>>,
    /// Depth of measurement passes; hooks and fixed-length checks are
    /// suppressed while non-zero.
    measuring: u32,
}

impl<'v, 'c> Ser<'v, 'c> {
    fn write_field(
        &mut self,
        id: NodeId,
        out: &mut dyn Write,
        parent_path: &str,
    ) -> Result<(), WireError> {
        let node = self.schema.node(id);
        if node.ignore || matches!(&node.when, Some(cond) if !self.eval_condition(cond)) {
            // Off-wire fields read as Null for later conditions, matching
            // what a decoder of our own output would observe.
            self.frames
                .last_mut()
                .expect("a struct frame is always live while writing fields")
                .scratch
                .insert(id, Value::Null);
            return Ok(());
        }
        let path = format!("{parent_path}.{}", node.name);

        if let Some(role) = node.computed {
            let value = self.compute(id, role, &path)?;
            if self.measuring == 0 {
                self.observer.fire_before(&path, Some(&value));
            }
            self.write_scalar(id, &value, out, &path)?;
            if self.measuring == 0 {
                self.observer.fire_after(&path, Some(&value));
            }
            self.frames
                .last_mut()
                .expect("a struct frame is always live while writing fields")
                .scratch
                .insert(id, value);
            return Ok(());
        }

        let record: &'v Record = self
            .frames
            .last()
            .expect("a struct frame is always live while writing fields")
            .record;
        let Some(value) = record.get(&node.name) else {
            return Err(WireError::MissingField { path });
        };
        if self.measuring == 0 {
            self.observer.fire_before(&path, Some(value));
        }
        self.write_node(id, value, out, &path)?;
        if self.measuring == 0 {
            self.observer.fire_after(&path, Some(value));
        }
        Ok(())
    }

    fn write_node(
        &mut self,
        id: NodeId,
        value: &'v Value,
        out: &mut dyn Write,
        path: &str,
    ) -> Result<(), WireError> {
        let node = self.schema.node(id);

        // Over-constrained declared lengths fail fast; nothing is silently
        // truncated. Field-sourced lengths are consistent by construction
        // (the source is measured from this same value).
        if self.measuring == 0
            && let Some(BoundLength::Fixed(declared)) = node.length
        {
            let measured = self.measure_node(id, value, path)?;
            if measured != declared {
                return Err(WireError::LengthMismatch {
                    path: path.to_string(),
                    declared,
                    measured,
                });
            }
        }

        match &node.kind {
            NodeKind::Primitive(p) => prim::encode_primitive(*p, value, self.config, out, path),
            NodeKind::Str(enc) => self.write_str(*enc, value, out, path),
            NodeKind::Bytes => {
                let Some(bytes) = value
                    .try_bytes()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(
                        path,
                        value.kind_mismatch("Bytes"),
                    ));
                };
                out.write_all(bytes)?;
                Ok(())
            }
            NodeKind::Struct { children } => {
                let Some(record) = value
                    .try_record()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(
                        path,
                        value.kind_mismatch("Record"),
                    ));
                };
                self.frames.push(Frame {
                    struct_node: id,
                    record,
                    scratch: HashMap::new(),
                });
                let result: Result<(), WireError> = children
                    .iter()
                    .try_for_each(|&child| self.write_field(child, out, path));
                self.frames.pop();
                result
            }
            NodeKind::List { elem, len } => {
                let Some(items) = value
                    .try_list()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(path, value.kind_mismatch("List")));
                };
                if let ListLen::Fixed(declared) = len
                    && items.len() != *declared
                {
                    return Err(WireError::CountMismatch {
                        path: path.to_string(),
                        declared: *declared,
                        actual: items.len(),
                    });
                }
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    self.write_node(*elem, item, out, &item_path)?;
                    if let ListLen::Until(t) = len
                        && t.matches(item)
                    {
                        break;
                    }
                }
                Ok(())
            }
            NodeKind::Union { cases, .. } => {
                let Value::Variant { case, value: inner } = value else {
                    return Err(WireError::type_mismatch(
                        path,
                        value.kind_mismatch("Variant"),
                    ));
                };
                let Some(bound) = cases.iter().find(|c| c.name == *case) else {
                    return Err(WireError::UnknownVariant {
                        path: path.to_string(),
                        tag: case.to_string(),
                    });
                };
                let case_path = format!("{path}.{}", bound.name);
                self.write_node(bound.node, inner, out, &case_path)
            }
        }
    }

    /// Writer for computed source values, which are always primitives,
    /// strings, or lists of integers and therefore never open a new frame.
    fn write_scalar(
        &mut self,
        id: NodeId,
        value: &Value,
        out: &mut dyn Write,
        path: &str,
    ) -> Result<(), WireError> {
        match &self.schema.node(id).kind {
            NodeKind::Primitive(p) => prim::encode_primitive(*p, value, self.config, out, path),
            NodeKind::Str(enc) => self.write_str(*enc, value, out, path),
            NodeKind::List { elem, .. } => {
                let Some(items) = value
                    .try_list()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(path, value.kind_mismatch("List")));
                };
                for (i, item) in items.iter().enumerate() {
                    self.write_scalar(*elem, item, out, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            _ => unreachable!("computed sources are scalars or integer lists"),
        }
    }

    fn write_str(
        &self,
        enc: StrEncoding,
        value: &Value,
        out: &mut dyn Write,
        path: &str,
    ) -> Result<(), WireError> {
        let Some(s) = value
            .try_str()
            .map_err(|e| WireError::type_mismatch(path, e))?
        else {
            return Err(WireError::type_mismatch(
                path,
                value.kind_mismatch("String"),
            ));
        };
        match enc {
            StrEncoding::NulTerminated => {
                if s.contains('\0') {
                    return Err(WireError::InvalidText {
                        path: path.to_string(),
                        detail: "interior NUL in a NUL-terminated string".to_string(),
                    });
                }
                prim::encode_text(s, self.config, out, path)?;
                out.write_all(&[0])?;
                Ok(())
            }
            StrEncoding::Raw => prim::encode_text(s, self.config, out, path),
        }
    }

    // ── computed sources ─────────────────────────────────────────────────

    fn compute(&mut self, id: NodeId, role: Computed, path: &str) -> Result<Value, WireError> {
        match role {
            Computed::CountOf(target) => {
                // Counting a computed item-length list means counting the
                // list it measures; the lens list itself is not live data.
                let target = match self.schema.node(target).computed {
                    Some(Computed::ItemLenOf(t)) => t,
                    _ => target,
                };
                let value = self.peek_root(target, path)?;
                let Some(items) = value
                    .try_list()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(path, value.kind_mismatch("List")));
                };
                prim::uint_value(self.primitive_kind(id), items.len() as u64, path)
            }
            Computed::LenOf(target) => {
                let measured = self.measure_target(target, path)?;
                prim::uint_value(self.primitive_kind(id), measured, path)
            }
            Computed::ItemLenOf(target) => {
                let value = self.peek_root(target, path)?;
                let Some(items) = value
                    .try_list()
                    .map_err(|e| WireError::type_mismatch(path, e))?
                else {
                    return Err(WireError::type_mismatch(path, value.kind_mismatch("List")));
                };
                let NodeKind::List { elem: target_elem, .. } = self.schema.node(target).kind
                else {
                    unreachable!("item-length targets are lists");
                };
                let NodeKind::List { elem: source_elem, .. } = self.schema.node(id).kind else {
                    unreachable!("item-length sources are lists");
                };
                let p = self.primitive_kind(source_elem);
                let mut lens = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    let measured = self.measure_node(target_elem, item, &item_path)?;
                    lens.push(prim::uint_value(p, measured, &item_path)?);
                }
                Ok(Value::List(lens))
            }
            Computed::TagOf(target) => {
                let value = self.peek_root(target, path)?;
                let Value::Variant { case, .. } = value else {
                    return Err(WireError::type_mismatch(
                        path,
                        value.kind_mismatch("Variant"),
                    ));
                };
                let NodeKind::Union { cases, .. } = &self.schema.node(target).kind else {
                    unreachable!("tag sources point at unions");
                };
                let Some(bound) = cases.iter().find(|c| c.name == *case) else {
                    return Err(WireError::UnknownVariant {
                        path: path.to_string(),
                        tag: case.to_string(),
                    });
                };
                match &self.schema.node(id).kind {
                    NodeKind::Str(_) => Ok(bound.tag_value.clone()),
                    NodeKind::Primitive(PrimitiveType::Bool) => Ok(bound.tag_value.clone()),
                    NodeKind::Primitive(p) => prim::coerce_tag(*p, &bound.tag_value, path),
                    _ => unreachable!("tag sources are scalar fields"),
                }
            }
        }
    }

    fn primitive_kind(&self, id: NodeId) -> PrimitiveType {
        let NodeKind::Primitive(p) = self.schema.node(id).kind else {
            unreachable!("count and length sources are integer primitives");
        };
        p
    }

    /// Measure one node's encoding into a sink. Hooks and fixed-length
    /// checks stay silent for the duration.
    fn measure_node(&mut self, id: NodeId, value: &'v Value, path: &str) -> Result<u64, WireError> {
        let mut sink = MeasuringSink::new();
        self.measuring += 1;
        let result = self.write_node(id, value, &mut sink, path);
        self.measuring -= 1;
        result?;
        Ok(sink.written())
    }

    /// Measure a whole target field, honoring its own presence condition.
    /// Pushes descent frames when the target lives below a later sibling.
    fn measure_target(&mut self, target: NodeId, path: &str) -> Result<u64, WireError> {
        let pushed = self.push_descent_frames(target, path)?;
        let mut sink = MeasuringSink::new();
        self.measuring += 1;
        let result = self.write_field(target, &mut sink, path);
        self.measuring -= 1;
        self.frames.truncate(self.frames.len() - pushed);
        result?;
        Ok(sink.written())
    }

    /// Fetch the live value of `target` from the record tree, descending
    /// from the nearest live frame. Targets are plain record data (never
    /// computed), so the result borrows from the root value.
    fn peek_root(&self, target: NodeId, path: &str) -> Result<&'v Value, WireError> {
        let (frame_idx, chain) = self.descent_chain(target, path)?;
        let mut record: &'v Record = self.frames[frame_idx].record;
        for (pos, &n) in chain.iter().rev().enumerate() {
            let name = &self.schema.node(n).name;
            let value = record.get(name).ok_or_else(|| WireError::MissingField {
                path: format!("{path} -> {name}"),
            })?;
            if pos + 1 == chain.len() {
                return Ok(value);
            }
            let Some(next) = value
                .try_record()
                .map_err(|e| WireError::type_mismatch(path, e))?
            else {
                return Err(WireError::type_mismatch(path, value.kind_mismatch("Record")));
            };
            record = next;
        }
        unreachable!("descent chains always contain the target");
    }

    /// Chain of field nodes from the target's scope up to the nearest live
    /// frame: `(frame index, [outer .. inner, target])` reversed for
    /// iteration.
    fn descent_chain(&self, target: NodeId, path: &str) -> Result<(usize, Vec<NodeId>), WireError> {
        let mut chain = vec![target];
        let mut cur = self.schema.parent_struct(target);
        loop {
            let Some(scope) = cur else {
                return Err(WireError::MissingField {
                    path: path.to_string(),
                });
            };
            if let Some(idx) = self.frames.iter().rposition(|f| f.struct_node == scope) {
                return Ok((idx, chain));
            }
            chain.push(scope);
            cur = self.schema.parent_struct(scope);
        }
    }

    fn push_descent_frames(&mut self, target: NodeId, path: &str) -> Result<usize, WireError> {
        let parent = self.schema.parent_struct(target);
        let mut scopes = Vec::new();
        let mut cur = parent;
        while let Some(scope) = cur {
            if self.frames.iter().any(|f| f.struct_node == scope) {
                break;
            }
            scopes.push(scope);
            cur = self.schema.parent_struct(scope);
        }
        let count = scopes.len();
        for &scope in scopes.iter().rev() {
            let value = self.peek_root(scope, path)?;
            let Some(record) = value
                .try_record()
                .map_err(|e| WireError::type_mismatch(path, e))?
            else {
                return Err(WireError::type_mismatch(path, value.kind_mismatch("Record")));
            };
            self.frames.push(Frame {
                struct_node: scope,
                record,
                scratch: HashMap::new(),
            });
        }
        Ok(count)
    }

    /// Conditions see computed sibling values first, then the live record.
    fn eval_condition(&self, cond: &BoundCondition) -> bool {
        let parent = self.schema.parent_struct(cond.source);
        let name = &self.schema.node(cond.source).name;
        let value = self
            .frames
            .iter()
            .rev()
            .find(|f| Some(f.struct_node) == parent)
            .and_then(|f| {
                f.scratch
                    .get(&cond.source)
                    .or_else(|| f.record.get(name))
            });
        let equal = match value {
            Some(v) => *v == cond.value,
            None => Value::Null == cond.value,
        };
        match cond.op {
            Cmp::Eq => equal,
            Cmp::Ne => !equal,
        }
    }
}
