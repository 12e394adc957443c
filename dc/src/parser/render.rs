//! Outline rendering, the inverse of parsing

use crate::domain::WorkItemNode;

/// Render a forest back into `dashes Type: Title` lines
pub fn render_outline(nodes: &[WorkItemNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &WorkItemNode, depth: usize, out: &mut String) {
    out.push_str(&"-".repeat(depth));
    out.push_str(node.item_type.as_str());
    out.push_str(": ");
    out.push_str(&node.title);
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
