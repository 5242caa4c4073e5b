//! Help rendering for command trees.

use std::fmt::Write;

use super::{CommandNode, CommandTree, NodeId, NodeKind};

/// Deepest Markdown header level.
const MAX_HEADER: usize = 6;

impl CommandTree {
    /// Render `id` and all of its descendants as a Markdown document.
    ///
    /// Sub-commands and arguments become nested headers. Consecutive option
    /// children are collapsed into one table so value lists stay flat.
    pub fn describe(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.describe_into(id, 0, &mut out);
        out
    }

    fn describe_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };

        let level = (depth + 2).min(MAX_HEADER);
        let _ = writeln!(out, "{} {}", "#".repeat(level), heading(node));
        if let Some(description) = &node.description {
            let _ = writeln!(out, "{}", description);
        }
        if node.kind == NodeKind::Option && !node.values.is_empty() {
            for value in &node.values {
                let _ = writeln!(out, "- {}", value);
            }
        }
        let _ = writeln!(out);

        let mut options: Vec<&CommandNode> = Vec::new();
        for child in self.child_ids(id).iter().copied() {
            let child_node = &self.slots[child.0].node;
            if child_node.kind == NodeKind::Option {
                options.push(child_node);
                continue;
            }
            flush_options(&mut options, out);
            self.describe_into(child, depth + 1, out);
        }
        flush_options(&mut options, out);
    }
}

fn heading(node: &CommandNode) -> String {
    match node.kind {
        NodeKind::Argument => format!("<{}>", node.name),
        _ => node.name.clone(),
    }
}

fn flush_options(options: &mut Vec<&CommandNode>, out: &mut String) {
    if options.is_empty() {
        return;
    }

    let _ = writeln!(out, "| Option | Description | Values |");
    let _ = writeln!(out, "| --- | --- | --- |");
    for option in options.drain(..) {
        let values = if option.values.is_empty() {
            "any".to_string()
        } else {
            option.values.join(", ")
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            option.name,
            option.description.as_deref().unwrap_or(""),
            values
        );
    }
    let _ = writeln!(out);
}
