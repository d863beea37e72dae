//! Deserialization traversal.
//!
//! The same declared order as serialization, inverted: a count, length,
//! item-length, or tag source is read first as an ordinary field, held as
//! live state, and then consumed to bound the dependent field's read.
//! Length-bound regions go through a [`BoundedReader`] carved to exactly
//! the declared size and are drained in full before the next field, so a
//! corrupt contained codec can never desynchronize what follows.

use std::io::Read;

use wirebind_core::{Record, Value};

use crate::{
    bind::{tag_key, BoundCondition, BoundLength, ListLen, NodeId, NodeKind, Schema},
    config::WireConfig,
    error::WireError,
    io::BoundedReader,
    observe::Observer,
    prim,
    spec::{Cmp, StrEncoding},
};

impl Schema {
    /// Read one value with the default configuration and no observer.
    pub fn deserialize(&self, input: &mut impl Read) -> Result<Value, WireError> {
        self.deserialize_with(input, &WireConfig::default(), &Observer::default())
    }

    pub fn deserialize_with(
        &self,
        input: &mut impl Read,
        config: &WireConfig,
        observer: &Observer,
    ) -> Result<Value, WireError> {
        let mut reader = BoundedReader::unbounded(input);
        let mut de = De {
            schema: self,
            config,
            observer,
            frames: Vec::new(),
        };
        let path = self.name().to_string();
        de.read_node(self.root_node(), &mut reader, &path)
    }

    pub fn deserialize_slice(&self, mut bytes: &[u8]) -> Result<Value, WireError> {
        self.deserialize(&mut bytes)
    }
}

struct Frame {
    struct_node: NodeId,
    record: Record,
}

struct De<'c> {
    schema: &'c Schema,
    config: &'c WireConfig,
    observer: &'c Observer,
    frames: Vec<Frame>,
}

impl<'c> De<'c> {
    fn read_field(
        &mut self,
        id: NodeId,
        r: &mut BoundedReader<'_>,
        parent_path: &str,
    ) -> Result<(), WireError> {
        let node = self.schema.node(id);
        let name = node.name.clone();
        if node.ignore || matches!(&node.when, Some(cond) if !self.eval_condition(cond)) {
            self.top_set(&name, Value::Null);
            return Ok(());
        }
        let path = format!("{parent_path}.{}", node.name);
        self.observer.fire_before(&path, None);
        let value = self.read_node(id, r, &path)?;
        self.observer.fire_after(&path, Some(&value));
        self.top_set(&name, value);
        Ok(())
    }

    fn read_node(
        &mut self,
        id: NodeId,
        r: &mut BoundedReader<'_>,
        path: &str,
    ) -> Result<Value, WireError> {
        match self.schema.node(id).length {
            None => self.read_body(id, r, path),
            Some(BoundLength::Fixed(n)) => self.read_sized(id, n, r, path),
            Some(BoundLength::Field(source)) => {
                let n = self.peek_uint(source, path)?;
                self.read_sized(id, n, r, path)
            }
            Some(BoundLength::Item) => {
                unreachable!("per-item bounds are applied by the enclosing list")
            }
        }
    }

    /// Read one node through a sub-reader of exactly `len` bytes, then
    /// drain whatever the contained codec left unread.
    fn read_sized(
        &mut self,
        id: NodeId,
        len: u64,
        r: &mut BoundedReader<'_>,
        path: &str,
    ) -> Result<Value, WireError> {
        let mut sub = r.narrow(len, path)?;
        let value = self.read_body(id, &mut sub, path)?;
        sub.drain(path)?;
        Ok(value)
    }

    fn read_body(
        &mut self,
        id: NodeId,
        r: &mut BoundedReader<'_>,
        path: &str,
    ) -> Result<Value, WireError> {
        let node = self.schema.node(id);
        match &node.kind {
            NodeKind::Primitive(p) => prim::decode_primitive(*p, self.config, r, path),
            NodeKind::Str(StrEncoding::NulTerminated) => {
                let mut bytes = Vec::new();
                loop {
                    let b = r.take_byte(path)?;
                    if b == 0 {
                        break;
                    }
                    bytes.push(b);
                }
                Ok(Value::String(prim::text_from_bytes(
                    bytes,
                    self.config,
                    path,
                )?))
            }
            NodeKind::Str(StrEncoding::Raw) => {
                let Some(len) = r.remaining() else {
                    unreachable!("raw strings are always length-bound");
                };
                let bytes = r.take_vec(len, path)?;
                Ok(Value::String(prim::text_from_bytes(
                    bytes,
                    self.config,
                    path,
                )?))
            }
            NodeKind::Bytes => {
                let Some(len) = r.remaining() else {
                    unreachable!("bytes fields are always length-bound");
                };
                let bytes = r.take_vec(len, path)?;
                Ok(Value::bytes(bytes))
            }
            NodeKind::Struct { children } => {
                self.frames.push(Frame {
                    struct_node: id,
                    record: Record::new(),
                });
                let result: Result<(), WireError> = children
                    .iter()
                    .try_for_each(|&child| self.read_field(child, r, path));
                let frame = self.frames.pop().expect("frame pushed above");
                result?;
                Ok(Value::Record(frame.record))
            }
            NodeKind::List { elem, len } => {
                let elem = *elem;
                let mut items = Vec::new();
                match len {
                    ListLen::Fixed(n) => {
                        for i in 0..*n {
                            items.push(self.read_node(elem, r, &format!("{path}[{i}]"))?);
                        }
                    }
                    ListLen::Counted(source) => {
                        let n = self.peek_uint(*source, path)?;
                        for i in 0..n {
                            items.push(self.read_node(elem, r, &format!("{path}[{i}]"))?);
                        }
                    }
                    ListLen::ItemBound(source) => {
                        let lens = self.peek_value(*source, path)?;
                        let Some(lens) = lens
                            .try_list()
                            .map_err(|e| WireError::type_mismatch(path, e))?
                        else {
                            return Err(WireError::type_mismatch(
                                path,
                                lens.kind_mismatch("List"),
                            ));
                        };
                        for (i, len) in lens.iter().enumerate() {
                            let item_path = format!("{path}[{i}]");
                            let Some(n) = len.as_uint() else {
                                return Err(WireError::ValueOutOfRange {
                                    path: item_path,
                                    detail: "negative or non-integer item length".to_string(),
                                });
                            };
                            items.push(self.read_sized(elem, n, r, &item_path)?);
                        }
                    }
                    ListLen::ToEnd => {
                        let mut i = 0;
                        while !r.at_end()? {
                            items.push(self.read_node(elem, r, &format!("{path}[{i}]"))?);
                            i += 1;
                        }
                    }
                    ListLen::Until(t) => {
                        let mut i = 0;
                        while !r.at_end()? {
                            let value = self.read_node(elem, r, &format!("{path}[{i}]"))?;
                            let stop = t.matches(&value);
                            items.push(value);
                            if stop {
                                break;
                            }
                            i += 1;
                        }
                    }
                }
                Ok(Value::List(items))
            }
            NodeKind::Union { tag, cases } => {
                let tag_value = self.peek_value(*tag, path)?;
                let Some(key) = tag_key(&tag_value) else {
                    return Err(WireError::UnknownVariant {
                        path: path.to_string(),
                        tag: format!("{tag_value:?}"),
                    });
                };
                let Some(case) = cases.iter().find(|c| c.key == key) else {
                    return Err(WireError::UnknownVariant {
                        path: path.to_string(),
                        tag: format!("{tag_value:?}"),
                    });
                };
                let case_path = format!("{path}.{}", case.name);
                let inner = self.read_node(case.node, r, &case_path)?;
                Ok(Value::Variant {
                    case: case.name.clone(),
                    value: Box::new(inner),
                })
            }
        }
    }

    fn top_set(&mut self, name: &str, value: Value) {
        self.frames
            .last_mut()
            .expect("a struct frame is always live while reading fields")
            .record
            .set(name, value);
    }

    /// Fetch a previously-read source value, descending through completed
    /// records when the source lives in an already-popped scope.
    fn peek_value(&self, source: NodeId, path: &str) -> Result<Value, WireError> {
        let mut chain = vec![source];
        let mut cur = self.schema.parent_struct(source);
        let frame = loop {
            let Some(scope) = cur else {
                return Err(WireError::MissingField {
                    path: path.to_string(),
                });
            };
            if let Some(f) = self
                .frames
                .iter()
                .rev()
                .find(|f| f.struct_node == scope)
            {
                break f;
            }
            chain.push(scope);
            cur = self.schema.parent_struct(scope);
        };
        let mut record = &frame.record;
        for (pos, &n) in chain.iter().rev().enumerate() {
            let name = &self.schema.node(n).name;
            let value = record.get(name).ok_or_else(|| WireError::MissingField {
                path: format!("{path} -> {name}"),
            })?;
            if pos + 1 == chain.len() {
                return Ok(value.clone());
            }
            let Some(next) = value
                .try_record()
                .map_err(|e| WireError::type_mismatch(path, e))?
            else {
                return Err(WireError::type_mismatch(path, value.kind_mismatch("Record")));
            };
            record = next;
        }
        unreachable!("descent chains always contain the source");
    }

    fn peek_uint(&self, source: NodeId, path: &str) -> Result<u64, WireError> {
        let value = self.peek_value(source, path)?;
        value.as_uint().ok_or_else(|| WireError::ValueOutOfRange {
            path: path.to_string(),
            detail: format!(
                "count/length source '{}' is negative or not an integer",
                self.schema.node(source).name
            ),
        })
    }

    fn eval_condition(&self, cond: &BoundCondition) -> bool {
        let value = self.peek_value(cond.source, "");
        let equal = match &value {
            Ok(v) => *v == cond.value,
            Err(_) => Value::Null == cond.value,
        };
        match cond.op {
            Cmp::Eq => equal,
            Cmp::Ne => !equal,
        }
    }
}
