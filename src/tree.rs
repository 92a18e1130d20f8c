//! The parse-tree node and its path/label addressing schemes.
//!
//! A node records one successful matcher invocation. Nodes are immutable
//! once appended to a parent accumulator; grammar actions query them while
//! the enclosing invocation is still on the stack, through the same
//! functions that work on the finalized tree.

use serde::{Deserialize, Serialize};

use crate::input::{InputBuffer, InputLocation};

/// One matched rule invocation: label, input range, children, and the
/// value attached by user actions (if any).
///
/// Children are strictly ordered by start index, never overlap, and lie
/// inside the parent's `[start, end)` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseNode<V> {
    pub label: String,
    pub start: InputLocation,
    pub end: InputLocation,
    pub children: Vec<ParseNode<V>>,
    pub value: Option<V>,
}

impl<V> ParseNode<V> {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// First descendant under this node matching the path; see
    /// [`find_node_by_path`].
    pub fn node_by_path(&self, path: &str) -> Option<&ParseNode<V>> {
        find_node_by_path(&self.children, path)
    }

    /// All descendants under this node matching the path, in pre-order.
    pub fn nodes_by_path(&self, path: &str) -> Vec<&ParseNode<V>> {
        let mut found = Vec::new();
        collect_nodes_by_path(&self.children, path, &mut found);
        found
    }

    /// First node in pre-order (including this one) whose label starts
    /// with `prefix`.
    pub fn node_by_label(&self, prefix: &str) -> Option<&ParseNode<V>> {
        if self.label.starts_with(prefix) {
            return Some(self);
        }
        find_node_by_label(&self.children, prefix)
    }

    /// All nodes in pre-order (including this one) whose label starts
    /// with `prefix`.
    pub fn nodes_by_label(&self, prefix: &str) -> Vec<&ParseNode<V>> {
        let mut found = Vec::new();
        if self.label.starts_with(prefix) {
            found.push(self);
        }
        collect_nodes_by_label(&self.children, prefix, &mut found);
        found
    }
}

/// Returns the first node matching `path` underneath the given nodes.
///
/// A path is a `/`-separated sequence of label prefixes. At each level the
/// children are scanned in order; every child whose label starts with the
/// head segment is a candidate, and the remaining path resolves against
/// its children. The result is the first hit of the same pre-order
/// traversal [`collect_nodes_by_path`] performs.
pub fn find_node_by_path<'a, V>(
    nodes: &'a [ParseNode<V>],
    path: &str,
) -> Option<&'a ParseNode<V>> {
    let (prefix, rest) = split_path(path);
    for child in nodes {
        if !child.label.starts_with(prefix) {
            continue;
        }
        match rest {
            None => return Some(child),
            Some(rest) => {
                if let Some(found) = find_node_by_path(&child.children, rest) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Collects all nodes matching `path` underneath the given nodes, in
/// pre-order. Unlike [`find_node_by_path`], every child matching the head
/// segment is descended into.
pub fn collect_nodes_by_path<'a, V>(
    nodes: &'a [ParseNode<V>],
    path: &str,
    found: &mut Vec<&'a ParseNode<V>>,
) {
    let (prefix, rest) = split_path(path);
    for child in nodes {
        if !child.label.starts_with(prefix) {
            continue;
        }
        match rest {
            None => found.push(child),
            Some(rest) => collect_nodes_by_path(&child.children, rest, found),
        }
    }
}

/// Returns the first node in pre-order underneath the given nodes whose
/// label starts with `prefix`.
pub fn find_node_by_label<'a, V>(
    nodes: &'a [ParseNode<V>],
    prefix: &str,
) -> Option<&'a ParseNode<V>> {
    for child in nodes {
        if child.label.starts_with(prefix) {
            return Some(child);
        }
        if let Some(found) = find_node_by_label(&child.children, prefix) {
            return Some(found);
        }
    }
    None
}

/// Collects every node in pre-order underneath the given nodes whose label
/// starts with `prefix`.
pub fn collect_nodes_by_label<'a, V>(
    nodes: &'a [ParseNode<V>],
    prefix: &str,
    found: &mut Vec<&'a ParseNode<V>>,
) {
    for child in nodes {
        if child.label.starts_with(prefix) {
            found.push(child);
        }
        collect_nodes_by_label(&child.children, prefix, found);
    }
}

/// The input text matched by the node (possibly empty).
pub fn node_text<V>(node: &ParseNode<V>, buffer: &InputBuffer) -> String {
    buffer.extract(node.start.index, node.end.index)
}

/// The first input character matched by the node, or `None` for a
/// zero-width match.
pub fn node_char<V>(node: &ParseNode<V>, buffer: &InputBuffer) -> Option<char> {
    if node.end.index > node.start.index {
        Some(buffer.char_at(node.start.index))
    } else {
        None
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((prefix, rest)) => (prefix, Some(rest)),
        None => (path, None),
    }
}
