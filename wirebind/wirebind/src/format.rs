//! Human-readable rendering of a bound schema.

use std::fmt::{self, Write as _};

use crate::bind::{BoundLength, ListLen, NodeId, NodeKind, Schema};

/// Format a bound schema in a readable style: scalar fields are rendered
/// in one line, compound fields are pretty-printed with their children.
pub fn format_schema(schema: &Schema) -> Result<String, fmt::Error> {
    let mut out = String::new();
    format_node(schema, schema.root_node(), 0, &mut out)?;
    Ok(out)
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_schema(self)?)
    }
}

fn format_node(schema: &Schema, id: NodeId, indent: usize, out: &mut String) -> fmt::Result {
    let node = schema.node(id);
    let pad = " ".repeat(indent);
    match &node.kind {
        NodeKind::Primitive(p) => {
            writeln!(out, "{pad}{}: {}{}", node.name, p.type_name(), annotations(schema, id))
        }
        NodeKind::Str(_) => {
            writeln!(out, "{pad}{}: string{}", node.name, annotations(schema, id))
        }
        NodeKind::Bytes => writeln!(out, "{pad}{}: bytes{}", node.name, annotations(schema, id)),
        NodeKind::Struct { children } => {
            writeln!(out, "{pad}{}: struct{}", node.name, annotations(schema, id))?;
            for &child in children {
                format_node(schema, child, indent + 4, out)?;
            }
            Ok(())
        }
        NodeKind::List { elem, .. } => {
            writeln!(out, "{pad}{}: list{}", node.name, annotations(schema, id))?;
            format_node(schema, *elem, indent + 4, out)
        }
        NodeKind::Union { cases, .. } => {
            writeln!(out, "{pad}{}: union{}", node.name, annotations(schema, id))?;
            for case in cases {
                format_node(schema, case.node, indent + 4, out)?;
            }
            Ok(())
        }
    }
}

/// Sizing and presence annotations for one node, e.g. ` (count by 'n')`.
fn annotations(schema: &Schema, id: NodeId) -> String {
    let node = schema.node(id);
    let mut parts = Vec::new();
    if let NodeKind::List { len, .. } = &node.kind {
        match len {
            ListLen::Fixed(n) => parts.push(format!("count {n}")),
            ListLen::Counted(s) => parts.push(format!("count by '{}'", schema.node(*s).name)),
            ListLen::ItemBound(s) => {
                parts.push(format!("item lengths by '{}'", schema.node(*s).name));
            }
            ListLen::ToEnd => parts.push("to end of bound".to_string()),
            ListLen::Until(_) => parts.push("until terminator".to_string()),
        }
    }
    match node.length {
        Some(BoundLength::Fixed(n)) => parts.push(format!("{n} bytes")),
        Some(BoundLength::Field(s)) => {
            parts.push(format!("length by '{}'", schema.node(s).name));
        }
        Some(BoundLength::Item) | None => {}
    }
    if node.when.is_some() {
        parts.push("conditional".to_string());
    }
    if node.ignore {
        parts.push("off-wire".to_string());
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}
