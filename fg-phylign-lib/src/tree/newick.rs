use anyhow::{bail, Result};

use crate::tree::{GuideTree, NodeIndex};

/// Characters that may not appear in an unquoted Newick label.
const METACHARACTERS: &[char] = &['(', ')', '[', ']', '\'', ':', ';', ','];

/// Quotes the label if it contains whitespace or Newick metacharacters.
fn format_label(label: &str) -> String {
    if label.chars().any(|c| c.is_whitespace() || METACHARACTERS.contains(&c)) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

fn write_node(tree: &GuideTree, index: NodeIndex, out: &mut String) {
    let node = tree.node(index);
    if !node.is_leaf() {
        out.push('(');
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_node(tree, *child, out);
        }
        out.push(')');
    }
    out.push_str(&format_label(node.label()));
    if let Some(length) = node.branch_length() {
        out.push_str(&format!(":{length}"));
    }
}

/// Renders the tree in Newick format, e.g. `((A:2,B:3):0.5,(C:4,D:5):0.5);`.
pub fn to_newick(tree: &GuideTree) -> Result<String> {
    let Some(root) = tree.root() else {
        bail!("Cannot write a tree without a root in Newick format");
    };
    let mut out = String::new();
    write_node(tree, root, &mut out);
    out.push(';');
    Ok(out)
}
