//! Text rendering of resolution traces.
//!
//! ```text
//! Start
//! └─ Extracted: 1 unit(s)
//!    └─ Scored: 0.00
//!       └─ Gated: insufficient (at or below threshold)
//! ```

use crag_core::TraceNode;

use super::style::Style;

/// Render a trace tree with box-drawing connectors. The current node is
/// suffixed with `<- current`.
pub fn render_trace_tree(root: &TraceNode, style: &Style) -> String {
    let mut lines = Vec::new();
    push_node(root, style, "", None, &mut lines);
    lines.join("\n")
}

fn push_node(
    node: &TraceNode,
    style: &Style,
    indent: &str,
    is_last: Option<bool>,
    lines: &mut Vec<String>,
) {
    let connector = match is_last {
        None => "",
        Some(true) => "└─ ",
        Some(false) => "├─ ",
    };
    let marker = if node.is_current { "  <- current" } else { "" };
    lines.push(format!(
        "{}{}{}{}",
        indent,
        connector,
        style.trace_label(node),
        marker
    ));

    let child_indent = match is_last {
        None => String::new(),
        Some(true) => format!("{}   ", indent),
        Some(false) => format!("{}│  ", indent),
    };
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        push_node(child, style, &child_indent, Some(i + 1 == count), lines);
    }
}
