//! Command definition trees.
//!
//! A `CommandTree` is the grammar of one command: its sub-commands, positional
//! arguments and value options. The same structure answers completion queries,
//! validates submitted arguments and renders help, so the three can never
//! disagree.
//!
//! Nodes live in an arena indexed by [`NodeId`]; the root is always
//! [`CommandTree::ROOT`]. Children keep insertion order.

mod describe;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShellError};
use crate::settings::SettingsDocument;

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Positional placeholder; matches any token.
    Argument,
    /// Literal keyword.
    Subcommand,
    /// Named setting followed by exactly one value token.
    Option,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandNode {
    pub name: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    /// Enumerated values for `Option` nodes. Empty means free-form.
    pub values: Vec<String>,
}

impl CommandNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            values: Vec::new(),
        }
    }

    pub fn subcommand(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Subcommand)
    }

    pub fn argument(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Argument)
    }

    pub fn option<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::new(name, NodeKind::Option);
        node.values = values.into_iter().map(Into::into).collect();
        node
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    /// Whether `token` is a valid value for this option node.
    pub fn accepts(&self, token: &str) -> bool {
        self.values.is_empty() || self.values.iter().any(|v| v == token)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: CommandNode,
    children: Vec<NodeId>,
}

/// Outcome of validating a token sequence against a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    /// Literal sub-command and option names in the order they were matched.
    pub path: Vec<String>,
    /// `(node name, token)` pairs for arguments and option values.
    pub values: Vec<(String, String)>,
}

impl ParsedArgs {
    /// The token bound to the argument or option called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CommandTree {
    slots: Vec<Slot>,
}

impl CommandTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(root: CommandNode) -> Self {
        Self {
            slots: vec![Slot {
                node: root,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> &CommandNode {
        &self.slots[Self::ROOT.0].node
    }

    pub fn node(&self, id: NodeId) -> Option<&CommandNode> {
        self.slots.get(id.0).map(|slot| &slot.node)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.slots.len() == 1
    }

    /// Insert `node` under `parent` (the root when `None`).
    pub fn add_child(&mut self, node: CommandNode, parent: Option<NodeId>) -> Result<NodeId> {
        let parent = parent.unwrap_or(Self::ROOT);
        let parent_slot = self
            .slots
            .get(parent.0)
            .ok_or(ShellError::ParentNotFound(parent))?;

        if parent_slot
            .children
            .iter()
            .any(|child| self.slots[child.0].node.name == node.name)
        {
            return Err(ShellError::DuplicateName {
                name: node.name,
                parent: parent_slot.node.name.clone(),
            });
        }

        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            children: Vec::new(),
        });
        self.slots[parent.0].children.push(id);
        Ok(id)
    }

    /// Direct children of `id` in insertion order. Unknown ids have no children.
    pub fn children_of(&self, id: NodeId) -> Vec<&CommandNode> {
        self.child_ids(id)
            .iter()
            .map(|child| &self.slots[child.0].node)
            .collect()
    }

    fn child_ids(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(id.0)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    /// Find the child of `id` that `token` selects: a literal sub-command or
    /// option name first, otherwise the first argument placeholder.
    fn match_child(&self, id: NodeId, token: &str) -> Option<NodeId> {
        let children = self.child_ids(id);
        children
            .iter()
            .copied()
            .find(|child| {
                let node = &self.slots[child.0].node;
                node.kind != NodeKind::Argument && node.name == token
            })
            .or_else(|| {
                children
                    .iter()
                    .copied()
                    .find(|child| self.slots[child.0].node.kind == NodeKind::Argument)
            })
    }

    /// Walk `path` from the root, one exact token per level.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        path.iter()
            .try_fold(Self::ROOT, |id, token| self.match_child(id, token.as_ref()))
    }

    /// Candidate next tokens after `path`: the child names of the node reached,
    /// or its values when it is an option. Unmatched paths yield nothing.
    pub fn suggest<S: AsRef<str>>(&self, path: &[S]) -> Vec<String> {
        let Some(id) = self.find(path) else {
            return Vec::new();
        };

        let node = &self.slots[id.0].node;
        if node.kind == NodeKind::Option {
            return node.values.clone();
        }

        self.children_of(id)
            .into_iter()
            .map(|child| child.name.clone())
            .collect()
    }

    /// Check `args` against the grammar. The walk has to finish on a leaf, and
    /// an option leaf needs an accepted value.
    pub fn validate<S: AsRef<str>>(&self, args: &[S]) -> Result<ParsedArgs> {
        let mut parsed = ParsedArgs::default();
        let mut current = Self::ROOT;
        let mut option_filled = false;

        for token in args.iter().map(AsRef::as_ref) {
            let node = &self.slots[current.0].node;

            if option_filled {
                return Err(ShellError::InvalidArgument(format!(
                    "unexpected argument '{}' after {}",
                    token, node.name
                )));
            }

            if node.kind == NodeKind::Option {
                if !node.accepts(token) {
                    return Err(ShellError::InvalidArgument(format!(
                        "'{}' is not a valid value for {} (expected one of: {})",
                        token,
                        node.name,
                        node.values.join(", ")
                    )));
                }
                parsed.values.push((node.name.clone(), token.to_string()));
                option_filled = true;
                continue;
            }

            let Some(child) = self.match_child(current, token) else {
                return Err(ShellError::InvalidArgument(format!(
                    "unexpected argument '{}' for {}",
                    token, node.name
                )));
            };

            let child_node = &self.slots[child.0].node;
            match child_node.kind {
                NodeKind::Argument => parsed
                    .values
                    .push((child_node.name.clone(), token.to_string())),
                NodeKind::Subcommand | NodeKind::Option => {
                    parsed.path.push(child_node.name.clone())
                }
            }
            current = child;
        }

        let node = &self.slots[current.0].node;
        if node.kind == NodeKind::Option && !option_filled {
            return Err(ShellError::InvalidArgument(format!(
                "missing value for {}",
                node.name
            )));
        }

        let expected = self.children_of(current);
        if !expected.is_empty() {
            let names: Vec<_> = expected.iter().map(|c| c.name.as_str()).collect();
            return Err(ShellError::InvalidArgument(format!(
                "missing argument for {} (expected one of: {})",
                node.name,
                names.join(", ")
            )));
        }

        Ok(parsed)
    }

    /// Add one sub-command per settings section under `parent`, with one
    /// option leaf per setting.
    pub fn extend_from_settings(
        &mut self,
        parent: Option<NodeId>,
        document: &SettingsDocument,
    ) -> Result<()> {
        for section in &document.sections {
            let mut node = CommandNode::subcommand(&section.name);
            node.description = section.description.clone();
            let section_id = self.add_child(node, parent)?;

            for setting in &section.settings {
                let mut leaf =
                    CommandNode::option(&setting.name, setting.options.clone().unwrap_or_default());
                leaf.description = setting.description.clone();
                self.add_child(leaf, Some(section_id))?;
            }
        }
        Ok(())
    }

    /// Drop every node except the root. Previously issued ids are invalid
    /// afterwards.
    pub fn reset(&mut self) {
        self.slots.truncate(1);
        self.slots[Self::ROOT.0].children.clear();
    }
}
