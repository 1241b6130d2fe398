//! The local edit buffer.
//!
//! [`EditBuffer`] holds one client's editable copy of a document: the content
//! tree and the current selection. Operations are applied with rich-text
//! editor semantics:
//!
//! - text offsets count Unicode scalar values
//! - node paths are child indices from the root
//! - a failing operation leaves the tree untouched
//!
//! Every successful mutation is journaled as a pending change notification,
//! the same notification an editing surface emits after it mutates its tree.
//! Callers drain it with [`EditBuffer::take_change`].

use docsync_types::{Content, Element, Node, Operation, Path, Properties, Text};
use serde_json::Value;
use thiserror::Error;

/// Why a single operation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The operation needs a node path but got the root.
    #[error("operation requires a non-empty path")]
    EmptyPath,

    /// Nothing exists at the path.
    #[error("no node at path {path:?}")]
    NoNode {
        /// The missing path.
        path: Path,
    },

    /// A child index is past the end of its parent.
    #[error("index out of range at {path:?} (parent has {len} children)")]
    IndexOutOfRange {
        /// The offending path.
        path: Path,
        /// Number of children in the parent.
        len: usize,
    },

    /// A text operation targeted an element.
    #[error("node at {path:?} is not a text leaf")]
    NotText {
        /// The element's path.
        path: Path,
    },

    /// A child operation targeted a text leaf.
    #[error("node at {path:?} is not an element")]
    NotElement {
        /// The leaf's path.
        path: Path,
    },

    /// A text offset is past the end of the leaf.
    #[error("offset {offset} out of range at {path:?} (text length {len})")]
    OffsetOutOfRange {
        /// The leaf's path.
        path: Path,
        /// Requested offset.
        offset: usize,
        /// Leaf length in characters.
        len: usize,
    },

    /// Merge target is missing or of a different kind.
    #[error("cannot merge node at {path:?}: {reason}")]
    CannotMerge {
        /// The merged node's path.
        path: Path,
        /// What went wrong.
        reason: &'static str,
    },

    /// Destination does not exist or lies inside the moved node.
    #[error("cannot move node at {path:?} to {new_path:?}")]
    InvalidMove {
        /// Source path.
        path: Path,
        /// Destination path.
        new_path: Path,
    },

    /// `set_node` tried to overwrite `text`, `children` or remove `type`.
    #[error("cannot set `{key}` on node at {path:?}")]
    ReservedProperty {
        /// The node's path.
        path: Path,
        /// The reserved key.
        key: String,
    },
}

/// A change notification: the operations since the last notification plus
/// the content they produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalChange {
    /// Operations, in the order they were applied.
    pub operations: Vec<Operation>,
    /// Content after the operations.
    pub snapshot: Content,
}

/// One operation of a batch that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    /// Position of the operation within its batch.
    pub index: usize,
    /// Wire name of the operation.
    pub operation: &'static str,
    /// What went wrong.
    pub error: ApplyError,
}

/// Outcome of applying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Operations applied successfully.
    pub applied: usize,
    /// Operations that failed and were skipped.
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// Whether every operation applied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of skipped operations.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// One client's editable document state.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    content: Content,
    selection: Option<Value>,
    pending: Vec<Operation>,
}

impl EditBuffer {
    /// Create a buffer holding `content`.
    pub fn new(mut content: Content) -> Self {
        content.normalize();
        Self {
            content,
            selection: None,
            pending: Vec::new(),
        }
    }

    /// Current content.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Current selection, if any.
    pub fn selection(&self) -> Option<&Value> {
        self.selection.as_ref()
    }

    /// Plain text of the current content.
    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    /// Install a new snapshot, discarding pending change notifications.
    pub fn replace(&mut self, mut content: Content) {
        content.normalize();
        self.content = content;
        self.pending.clear();
    }

    /// Restore the content invariants after raw `apply` calls.
    pub fn normalize(&mut self) {
        self.content.normalize();
    }

    /// Whether mutations happened since the last [`EditBuffer::take_change`].
    pub fn has_pending_change(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the pending change notification.
    pub fn take_change(&mut self) -> Option<LocalChange> {
        if self.pending.is_empty() {
            return None;
        }
        Some(LocalChange {
            operations: std::mem::take(&mut self.pending),
            snapshot: self.content.clone(),
        })
    }

    /// Apply operations in order, skipping the ones that fail.
    ///
    /// The content is normalized once, after the last operation, so that a
    /// remove-then-insert pair does not see an intermediate filler block.
    pub fn apply_batch(&mut self, operations: &[Operation]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (index, op) in operations.iter().enumerate() {
            match self.apply(op) {
                Ok(()) => report.applied += 1,
                Err(error) => report.failures.push(ApplyFailure {
                    index,
                    operation: op.name(),
                    error,
                }),
            }
        }
        self.content.normalize();
        report
    }

    /// Apply one operation.
    ///
    /// On error the tree is unchanged. The content is not normalized; use
    /// [`EditBuffer::apply_batch`] or [`EditBuffer::normalize`].
    pub fn apply(&mut self, op: &Operation) -> Result<(), ApplyError> {
        let result = match op {
            Operation::InsertText { path, offset, text } => self.insert_text(path, *offset, text),
            Operation::RemoveText { path, offset, text } => self.remove_text(path, *offset, text),
            Operation::InsertNode { path, node } => self.insert_node(path, node),
            Operation::RemoveNode { path, .. } => self.remove_node(path),
            Operation::SplitNode {
                path,
                position,
                properties,
            } => self.split_node(path, *position, properties),
            Operation::MergeNode { path, .. } => self.merge_node(path),
            Operation::MoveNode { path, new_path } => self.move_node(path, new_path),
            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => self.set_node(path, properties, new_properties),
            Operation::SetSelection { new_properties, .. } => {
                self.set_selection(new_properties.as_ref());
                Ok(())
            }
        };
        result?;
        self.pending.push(op.clone());
        Ok(())
    }

    fn insert_text(&mut self, path: &[usize], offset: usize, text: &str) -> Result<(), ApplyError> {
        let leaf = text_at_mut(self.content.blocks_mut(), path)?;
        let len = leaf.char_len();
        if offset > len {
            return Err(ApplyError::OffsetOutOfRange {
                path: path.to_vec(),
                offset,
                len,
            });
        }
        let at = byte_index(&leaf.text, offset);
        leaf.text.insert_str(at, text);
        Ok(())
    }

    fn remove_text(&mut self, path: &[usize], offset: usize, text: &str) -> Result<(), ApplyError> {
        let leaf = text_at_mut(self.content.blocks_mut(), path)?;
        let len = leaf.char_len();
        let end = match offset.checked_add(text.chars().count()) {
            Some(end) if end <= len => end,
            _ => {
                return Err(ApplyError::OffsetOutOfRange {
                    path: path.to_vec(),
                    offset,
                    len,
                })
            }
        };
        let start = byte_index(&leaf.text, offset);
        let stop = byte_index(&leaf.text, end);
        leaf.text.replace_range(start..stop, "");
        Ok(())
    }

    fn insert_node(&mut self, path: &[usize], node: &Node) -> Result<(), ApplyError> {
        let (parent, index) = split_last(path)?;
        let siblings = children_at_mut(self.content.blocks_mut(), parent, path)?;
        if index > siblings.len() {
            return Err(ApplyError::IndexOutOfRange {
                path: path.to_vec(),
                len: siblings.len(),
            });
        }
        siblings.insert(index, node.clone());
        Ok(())
    }

    fn remove_node(&mut self, path: &[usize]) -> Result<(), ApplyError> {
        let (parent, index) = split_last(path)?;
        let siblings = children_at_mut(self.content.blocks_mut(), parent, path)?;
        if index >= siblings.len() {
            return Err(no_node(path));
        }
        siblings.remove(index);
        Ok(())
    }

    fn split_node(
        &mut self,
        path: &[usize],
        position: usize,
        properties: &Properties,
    ) -> Result<(), ApplyError> {
        let (parent, index) = split_last(path)?;

        let tail = match node_at_mut(self.content.blocks_mut(), path)? {
            Node::Text(leaf) => {
                let len = leaf.char_len();
                if position > len {
                    return Err(ApplyError::OffsetOutOfRange {
                        path: path.to_vec(),
                        offset: position,
                        len,
                    });
                }
                let at = byte_index(&leaf.text, position);
                let mut marks = split_properties(&leaf.marks, properties);
                marks.remove("text");
                Node::Text(Text {
                    text: leaf.text.split_off(at),
                    marks,
                })
            }
            Node::Element(el) => {
                if position > el.children.len() {
                    return Err(ApplyError::IndexOutOfRange {
                        path: path.to_vec(),
                        len: el.children.len(),
                    });
                }
                let mut props = split_properties(&el.properties, properties);
                let kind = match props.remove("type") {
                    Some(Value::String(kind)) => kind,
                    _ => el.kind.clone(),
                };
                props.remove("children");
                Node::Element(Element {
                    kind,
                    children: el.children.split_off(position),
                    properties: props,
                })
            }
        };

        let siblings = children_at_mut(self.content.blocks_mut(), parent, path)?;
        siblings.insert(index + 1, tail);
        Ok(())
    }

    fn merge_node(&mut self, path: &[usize]) -> Result<(), ApplyError> {
        let (parent, index) = split_last(path)?;
        if index == 0 {
            return Err(ApplyError::CannotMerge {
                path: path.to_vec(),
                reason: "no previous sibling",
            });
        }
        let siblings = children_at_mut(self.content.blocks_mut(), parent, path)?;
        if index >= siblings.len() {
            return Err(no_node(path));
        }
        match (&siblings[index - 1], &siblings[index]) {
            (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_)) => {}
            _ => {
                return Err(ApplyError::CannotMerge {
                    path: path.to_vec(),
                    reason: "previous sibling is a different kind of node",
                })
            }
        }

        let merged = siblings.remove(index);
        match (&mut siblings[index - 1], merged) {
            (Node::Text(prev), Node::Text(leaf)) => prev.text.push_str(&leaf.text),
            (Node::Element(prev), Node::Element(el)) => prev.children.extend(el.children),
            _ => unreachable!("node kinds checked above"),
        }
        Ok(())
    }

    fn move_node(&mut self, path: &[usize], new_path: &[usize]) -> Result<(), ApplyError> {
        if path == new_path {
            return Ok(());
        }
        let invalid = || ApplyError::InvalidMove {
            path: path.to_vec(),
            new_path: new_path.to_vec(),
        };
        let (parent, index) = split_last(path)?;
        if new_path.is_empty() || new_path.starts_with(path) {
            return Err(invalid());
        }

        // Destination as it reads once the node has been taken out.
        let mut target = new_path.to_vec();
        if ends_before(path, new_path) && path.len() < new_path.len() {
            target[path.len() - 1] -= 1;
        }
        let (target_parent, target_index) = split_last(&target)?;

        let siblings = children_at_mut(self.content.blocks_mut(), parent, path)?;
        if index >= siblings.len() {
            return Err(no_node(path));
        }
        let node = siblings.remove(index);

        let blocks = self.content.blocks_mut();
        let placed = match children_at_mut(blocks, target_parent, &target) {
            Ok(dest) if target_index <= dest.len() => {
                dest.insert(target_index, node);
                None
            }
            _ => Some(node),
        };

        if let Some(node) = placed {
            // Put the node back where it came from.
            if let Ok(siblings) = children_at_mut(self.content.blocks_mut(), parent, path) {
                siblings.insert(index, node);
            }
            return Err(invalid());
        }
        Ok(())
    }

    fn set_node(
        &mut self,
        path: &[usize],
        properties: &Properties,
        new_properties: &Properties,
    ) -> Result<(), ApplyError> {
        let node = node_at_mut(self.content.blocks_mut(), path)?;
        let reserved = |key: &str| ApplyError::ReservedProperty {
            path: path.to_vec(),
            key: key.to_string(),
        };

        match node {
            Node::Text(leaf) => {
                if new_properties.contains_key("text") || properties.contains_key("text") {
                    return Err(reserved("text"));
                }
                set_properties(&mut leaf.marks, properties, new_properties);
            }
            Node::Element(el) => {
                if new_properties.contains_key("children") || properties.contains_key("children")
                {
                    return Err(reserved("children"));
                }
                let kind = match new_properties.get("type") {
                    Some(Value::String(kind)) => Some(kind.clone()),
                    Some(_) => return Err(reserved("type")),
                    None => None,
                };
                let mut properties = properties.clone();
                let mut new_properties = new_properties.clone();
                properties.remove("type");
                new_properties.remove("type");
                set_properties(&mut el.properties, &properties, &new_properties);
                if let Some(kind) = kind {
                    el.kind = kind;
                }
            }
        }
        Ok(())
    }

    fn set_selection(&mut self, new_properties: Option<&Value>) {
        match new_properties {
            None => self.selection = None,
            Some(Value::Object(changes)) => {
                if let Some(Value::Object(current)) = self.selection.as_mut() {
                    for (key, value) in changes {
                        if value.is_null() {
                            current.remove(key);
                        } else {
                            current.insert(key.clone(), value.clone());
                        }
                    }
                    return;
                }
                self.selection = Some(Value::Object(changes.clone()));
            }
            Some(value) => self.selection = Some(value.clone()),
        }
    }
}

/// Apply `new_properties` (null removes), then drop keys only present in
/// `properties`.
fn set_properties(target: &mut Properties, properties: &Properties, new_properties: &Properties) {
    for (key, value) in new_properties {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
    for key in properties.keys() {
        if !new_properties.contains_key(key) {
            target.remove(key);
        }
    }
}

/// Properties for the tail of a split: the operation's if it carries any,
/// otherwise a copy of the original node's.
fn split_properties(original: &Properties, properties: &Properties) -> Properties {
    if properties.is_empty() {
        original.clone()
    } else {
        properties.clone()
    }
}

fn no_node(path: &[usize]) -> ApplyError {
    ApplyError::NoNode {
        path: path.to_vec(),
    }
}

fn split_last(path: &[usize]) -> Result<(&[usize], usize), ApplyError> {
    match path.split_last() {
        Some((last, parent)) => Ok((parent, *last)),
        None => Err(ApplyError::EmptyPath),
    }
}

/// Whether `path` sits before `other` among the children of their shared
/// parent at `path`'s depth.
fn ends_before(path: &[usize], other: &[usize]) -> bool {
    let depth = path.len() - 1;
    other.len() > depth && path[..depth] == other[..depth] && path[depth] < other[depth]
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(at, _)| at)
        .unwrap_or(text.len())
}

fn node_at_mut<'a>(blocks: &'a mut [Node], path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (first, rest) = path.split_first().ok_or(ApplyError::EmptyPath)?;
    let mut node = blocks.get_mut(*first).ok_or_else(|| no_node(path))?;
    for &index in rest {
        node = node
            .children_mut()
            .and_then(|children| children.get_mut(index))
            .ok_or_else(|| no_node(path))?;
    }
    Ok(node)
}

fn text_at_mut<'a>(blocks: &'a mut [Node], path: &[usize]) -> Result<&'a mut Text, ApplyError> {
    match node_at_mut(blocks, path)? {
        Node::Text(leaf) => Ok(leaf),
        Node::Element(_) => Err(ApplyError::NotText {
            path: path.to_vec(),
        }),
    }
}

/// Children of the node at `parent`; the root's children are the blocks.
/// `path` is the full operation path, used for error reporting.
fn children_at_mut<'a>(
    blocks: &'a mut Vec<Node>,
    parent: &[usize],
    path: &[usize],
) -> Result<&'a mut Vec<Node>, ApplyError> {
    if parent.is_empty() {
        return Ok(blocks);
    }
    match node_at_mut(blocks, parent).map_err(|_| no_node(path))? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(ApplyError::NotElement {
            path: parent.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hello() -> EditBuffer {
        EditBuffer::new(Content::paragraph("hello"))
    }

    fn two_paragraphs() -> EditBuffer {
        EditBuffer::new(Content::new(vec![
            Node::paragraph("one"),
            Node::paragraph("two"),
        ]))
    }

    fn props(value: serde_json::Value) -> Properties {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    // ===========================================
    // Text Operations
    // ===========================================

    #[test]
    fn insert_text_appends() {
        let mut buffer = hello();
        buffer
            .apply(&Operation::insert_text(vec![0, 0], 5, " world"))
            .unwrap();
        assert_eq!(buffer.content(), &Content::paragraph("hello world"));
    }

    #[test]
    fn insert_text_counts_characters_not_bytes() {
        let mut buffer = EditBuffer::new(Content::paragraph("héllo"));
        buffer
            .apply(&Operation::insert_text(vec![0, 0], 2, "X"))
            .unwrap();
        assert_eq!(buffer.plain_text(), "héXllo");
    }

    #[test]
    fn insert_text_past_end_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::insert_text(vec![0, 0], 6, "!"))
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::OffsetOutOfRange {
                path: vec![0, 0],
                offset: 6,
                len: 5
            }
        );
        assert_eq!(buffer.plain_text(), "hello");
    }

    #[test]
    fn insert_text_into_element_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::insert_text(vec![0], 0, "x"))
            .unwrap_err();
        assert_eq!(err, ApplyError::NotText { path: vec![0] });
    }

    #[test]
    fn remove_text_removes_range() {
        let mut buffer = EditBuffer::new(Content::paragraph("hello world"));
        buffer
            .apply(&Operation::remove_text(vec![0, 0], 5, " world"))
            .unwrap();
        assert_eq!(buffer.plain_text(), "hello");
    }

    #[test]
    fn remove_text_past_end_fails() {
        let mut buffer = hello();
        assert!(buffer
            .apply(&Operation::remove_text(vec![0, 0], 3, "lo!"))
            .is_err());
        assert_eq!(buffer.plain_text(), "hello");
    }

    #[test]
    fn remove_text_huge_offset_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::remove_text(vec![0, 0], usize::MAX, "x"))
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::OffsetOutOfRange {
                path: vec![0, 0],
                offset: usize::MAX,
                len: 5,
            }
        );
        assert_eq!(buffer.plain_text(), "hello");
    }

    #[test]
    fn missing_path_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::insert_text(vec![3, 0], 0, "x"))
            .unwrap_err();
        assert_eq!(err, ApplyError::NoNode { path: vec![3, 0] });
    }

    // ===========================================
    // Node Operations
    // ===========================================

    #[test]
    fn insert_and_remove_block() {
        let mut buffer = hello();
        buffer
            .apply(&Operation::InsertNode {
                path: vec![1],
                node: Node::paragraph("second"),
            })
            .unwrap();
        assert_eq!(buffer.plain_text(), "hello\nsecond");

        buffer
            .apply(&Operation::RemoveNode {
                path: vec![0],
                node: Node::paragraph("hello"),
            })
            .unwrap();
        assert_eq!(buffer.plain_text(), "second");
    }

    #[test]
    fn insert_node_past_end_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::InsertNode {
                path: vec![2],
                node: Node::paragraph("x"),
            })
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::IndexOutOfRange {
                path: vec![2],
                len: 1
            }
        );
    }

    #[test]
    fn insert_node_under_text_fails() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::InsertNode {
                path: vec![0, 0, 0],
                node: Node::text("x"),
            })
            .unwrap_err();
        assert_eq!(err, ApplyError::NotElement { path: vec![0, 0] });
    }

    #[test]
    fn split_text_then_block_like_enter_key() {
        let mut buffer = EditBuffer::new(Content::paragraph("helloworld"));
        buffer
            .apply(&Operation::SplitNode {
                path: vec![0, 0],
                position: 5,
                properties: Properties::new(),
            })
            .unwrap();
        buffer
            .apply(&Operation::SplitNode {
                path: vec![0],
                position: 1,
                properties: props(json!({"type": "paragraph"})),
            })
            .unwrap();
        assert_eq!(
            buffer.content(),
            &Content::new(vec![Node::paragraph("hello"), Node::paragraph("world")])
        );
    }

    #[test]
    fn split_text_keeps_marks() {
        let content = Content::from_json(
            r#"[{"type":"paragraph","children":[{"text":"boldtext","bold":true}]}]"#,
        )
        .unwrap();
        let mut buffer = EditBuffer::new(content);
        buffer
            .apply(&Operation::SplitNode {
                path: vec![0, 0],
                position: 4,
                properties: Properties::new(),
            })
            .unwrap();
        let children = buffer.content().blocks()[0].children().unwrap();
        match &children[1] {
            Node::Text(leaf) => {
                assert_eq!(leaf.text, "text");
                assert_eq!(leaf.marks.get("bold"), Some(&json!(true)));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn merge_blocks_like_backspace() {
        let mut buffer = two_paragraphs();
        buffer
            .apply(&Operation::MergeNode {
                path: vec![1],
                position: 1,
                properties: Properties::new(),
            })
            .unwrap();
        buffer
            .apply(&Operation::MergeNode {
                path: vec![0, 1],
                position: 3,
                properties: Properties::new(),
            })
            .unwrap();
        assert_eq!(buffer.content(), &Content::paragraph("onetwo"));
    }

    #[test]
    fn merge_first_child_fails() {
        let mut buffer = two_paragraphs();
        let err = buffer
            .apply(&Operation::MergeNode {
                path: vec![0],
                position: 0,
                properties: Properties::new(),
            })
            .unwrap_err();
        assert!(matches!(err, ApplyError::CannotMerge { .. }));
    }

    #[test]
    fn merge_mismatched_kinds_fails_without_mutation() {
        let mut buffer = EditBuffer::new(Content::new(vec![Node::element(
            "paragraph",
            vec![Node::text("a"), Node::element("link", vec![Node::text("b")])],
        )]));
        let before = buffer.content().clone();
        let err = buffer
            .apply(&Operation::MergeNode {
                path: vec![0, 1],
                position: 1,
                properties: Properties::new(),
            })
            .unwrap_err();
        assert!(matches!(err, ApplyError::CannotMerge { .. }));
        assert_eq!(buffer.content(), &before);
    }

    #[test]
    fn move_block_down() {
        let mut buffer = EditBuffer::new(Content::new(vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
        ]));
        buffer
            .apply(&Operation::MoveNode {
                path: vec![0],
                new_path: vec![2],
            })
            .unwrap();
        assert_eq!(buffer.plain_text(), "b\nc\na");
    }

    #[test]
    fn move_leaf_into_later_block() {
        let mut buffer = EditBuffer::new(Content::new(vec![
            Node::element("paragraph", vec![Node::text("x"), Node::text("y")]),
            Node::paragraph("z"),
        ]));
        // Move block 0 into block 1 as its first child.
        buffer
            .apply(&Operation::MoveNode {
                path: vec![0],
                new_path: vec![1, 0],
            })
            .unwrap();
        assert_eq!(buffer.content().blocks().len(), 1);
        assert_eq!(buffer.plain_text(), "xyz");
    }

    #[test]
    fn move_into_own_subtree_fails() {
        let mut buffer = two_paragraphs();
        let err = buffer
            .apply(&Operation::MoveNode {
                path: vec![0],
                new_path: vec![0, 1],
            })
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidMove { .. }));
    }

    #[test]
    fn move_to_missing_parent_restores_node() {
        let mut buffer = two_paragraphs();
        let before = buffer.content().clone();
        let err = buffer
            .apply(&Operation::MoveNode {
                path: vec![0, 0],
                new_path: vec![5, 0],
            })
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidMove { .. }));
        assert_eq!(buffer.content(), &before);
    }

    #[test]
    fn set_node_marks_and_kind() {
        let mut buffer = hello();
        buffer
            .apply(&Operation::SetNode {
                path: vec![0, 0],
                properties: Properties::new(),
                new_properties: props(json!({"bold": true})),
            })
            .unwrap();
        buffer
            .apply(&Operation::SetNode {
                path: vec![0],
                properties: props(json!({"type": "paragraph"})),
                new_properties: props(json!({"type": "heading", "level": 1})),
            })
            .unwrap();

        let value = serde_json::to_value(buffer.content()).unwrap();
        assert_eq!(
            value,
            json!([{"type": "heading", "level": 1, "children": [{"text": "hello", "bold": true}]}])
        );
    }

    #[test]
    fn set_node_removes_old_keys() {
        let content = Content::from_json(
            r#"[{"type":"paragraph","children":[{"text":"x","bold":true,"italic":true}]}]"#,
        )
        .unwrap();
        let mut buffer = EditBuffer::new(content);
        buffer
            .apply(&Operation::SetNode {
                path: vec![0, 0],
                properties: props(json!({"bold": true})),
                new_properties: props(json!({"italic": null})),
            })
            .unwrap();
        match &buffer.content().blocks()[0].children().unwrap()[0] {
            Node::Text(leaf) => assert!(leaf.marks.is_empty()),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn set_node_cannot_touch_text() {
        let mut buffer = hello();
        let err = buffer
            .apply(&Operation::SetNode {
                path: vec![0, 0],
                properties: Properties::new(),
                new_properties: props(json!({"text": "gone"})),
            })
            .unwrap_err();
        assert!(matches!(err, ApplyError::ReservedProperty { .. }));
        assert_eq!(buffer.plain_text(), "hello");
    }

    // ===========================================
    // Selection
    // ===========================================

    #[test]
    fn selection_is_tracked_but_not_content() {
        let mut buffer = hello();
        let range = json!({"anchor": {"path": [0, 0], "offset": 1}, "focus": {"path": [0, 0], "offset": 1}});
        buffer
            .apply(&Operation::set_selection(None, Some(range.clone())))
            .unwrap();
        assert_eq!(buffer.selection(), Some(&range));
        assert_eq!(buffer.plain_text(), "hello");

        let focus = json!({"path": [0, 0], "offset": 3});
        buffer
            .apply(&Operation::set_selection(
                None,
                Some(json!({ "focus": focus.clone() })),
            ))
            .unwrap();
        assert_eq!(buffer.selection().unwrap()["focus"], focus);

        buffer.apply(&Operation::set_selection(None, None)).unwrap();
        assert!(buffer.selection().is_none());
    }

    // ===========================================
    // Batches and Change Journal
    // ===========================================

    #[test]
    fn batch_continues_after_failure_in_order() {
        let mut buffer = hello();
        let report = buffer.apply_batch(&[
            Operation::insert_text(vec![0, 0], 5, " there"),
            Operation::insert_text(vec![9, 0], 0, "bad"),
            Operation::insert_text(vec![0, 0], 11, "!"),
        ]);

        assert_eq!(report.applied, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].operation, "insert_text");
        // The third op depends on the first having been applied.
        assert_eq!(buffer.plain_text(), "hello there!");
    }

    #[test]
    fn batch_normalizes_once_at_end() {
        let mut buffer = hello();
        let report = buffer.apply_batch(&[
            Operation::RemoveNode {
                path: vec![0],
                node: Node::paragraph("hello"),
            },
            Operation::InsertNode {
                path: vec![0],
                node: Node::paragraph("replaced"),
            },
        ]);
        assert!(report.is_clean());
        assert_eq!(buffer.content(), &Content::paragraph("replaced"));
    }

    #[test]
    fn removing_everything_leaves_empty_paragraph() {
        let mut buffer = hello();
        buffer.apply_batch(&[Operation::RemoveNode {
            path: vec![0],
            node: Node::paragraph("hello"),
        }]);
        assert_eq!(buffer.content(), &Content::empty());
    }

    #[test]
    fn change_journal_collects_successful_ops() {
        let mut buffer = hello();
        assert!(buffer.take_change().is_none());

        buffer.apply_batch(&[
            Operation::insert_text(vec![0, 0], 5, "!"),
            Operation::insert_text(vec![7, 0], 0, "bad"),
        ]);
        assert!(buffer.has_pending_change());

        let change = buffer.take_change().unwrap();
        assert_eq!(
            change.operations,
            vec![Operation::insert_text(vec![0, 0], 5, "!")]
        );
        assert_eq!(change.snapshot, Content::paragraph("hello!"));
        assert!(buffer.take_change().is_none());
    }

    #[test]
    fn replace_installs_snapshot_and_clears_journal() {
        let mut buffer = hello();
        buffer
            .apply(&Operation::insert_text(vec![0, 0], 0, ">"))
            .unwrap();
        buffer.replace(Content::new(vec![]));
        assert_eq!(buffer.content(), &Content::empty());
        assert!(!buffer.has_pending_change());
    }
}
