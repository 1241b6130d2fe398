//! The rich-text document tree.
//!
//! Content is an ordered list of block nodes. A node is either an element
//! (`{"type": "paragraph", "children": [...]}`) or a text leaf
//! (`{"text": "hello", "bold": true}`). Extra keys on an element are its
//! properties; extra keys on a text leaf are its marks.
//!
//! Content is never empty: deserializing or constructing a [`Content`]
//! normalizes it (see [`Content::normalize`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DocumentId, SyncError};

/// Element kind used when content has to be filled in.
pub const DEFAULT_BLOCK: &str = "paragraph";

/// Free-form node properties (element attributes or text marks).
pub type Properties = Map<String, Value>;

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// A block or inline element with children.
    Element(Element),
    /// A text leaf.
    Text(Text),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element kind ("paragraph", "heading", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered child nodes.
    pub children: Vec<Node>,
    /// Remaining element attributes.
    #[serde(flatten)]
    pub properties: Properties,
}

/// A text leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// The text itself.
    pub text: String,
    /// Formatting marks (bold, italic, ...).
    #[serde(flatten)]
    pub marks: Properties,
}

impl Text {
    /// Create an unmarked text leaf.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Properties::new(),
        }
    }

    /// Number of characters (Unicode scalar values).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl Node {
    /// Create an unmarked text leaf node.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    /// Create an element node without extra properties.
    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(Element {
            kind: kind.into(),
            children,
            properties: Properties::new(),
        })
    }

    /// Create a paragraph holding a single text leaf.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element(DEFAULT_BLOCK, vec![Self::text(text)])
    }

    /// Whether this node is a text leaf.
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Children of an element, `None` for text leaves.
    pub fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) => None,
        }
    }

    /// Mutable children of an element, `None` for text leaves.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element(el) => Some(&mut el.children),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
        }
    }

    fn normalize(&mut self) {
        if let Node::Element(el) = self {
            if el.children.is_empty() {
                el.children.push(Node::text(""));
            }
            el.children.iter_mut().for_each(Node::normalize);
        }
    }

    fn is_normalized(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(el) => {
                !el.children.is_empty() && el.children.iter().all(Node::is_normalized)
            }
        }
    }
}

/// The content of a document: a non-empty, ordered sequence of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Node>", into = "Vec<Node>")]
pub struct Content(Vec<Node>);

impl Content {
    /// Create content from blocks, normalizing them.
    pub fn new(blocks: Vec<Node>) -> Self {
        let mut content = Self(blocks);
        content.normalize();
        content
    }

    /// A single empty paragraph.
    pub fn empty() -> Self {
        Self(vec![Node::paragraph("")])
    }

    /// A single paragraph holding `text`.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self(vec![Node::paragraph(text)])
    }

    /// The top-level blocks.
    pub fn blocks(&self) -> &[Node] {
        &self.0
    }

    /// Mutable access to the top-level blocks.
    ///
    /// Mutations may break the non-empty invariant until the next
    /// [`Content::normalize`] call.
    pub fn blocks_mut(&mut self) -> &mut Vec<Node> {
        &mut self.0
    }

    /// Consume the content, returning its blocks.
    pub fn into_blocks(self) -> Vec<Node> {
        self.0
    }

    /// Restore the tree invariants.
    ///
    /// - zero blocks become a single empty paragraph
    /// - an element with zero children receives one empty text leaf
    pub fn normalize(&mut self) {
        if self.0.is_empty() {
            self.0.push(Node::paragraph(""));
        }
        self.0.iter_mut().for_each(Node::normalize);
    }

    /// Whether the tree currently satisfies its invariants.
    pub fn is_normalized(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Node::is_normalized)
    }

    /// Plain text of the document, one line per top-level block.
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse content from JSON.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize content to JSON.
    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Node>> for Content {
    fn from(blocks: Vec<Node>) -> Self {
        Self::new(blocks)
    }
}

impl From<Content> for Vec<Node> {
    fn from(content: Content) -> Self {
        content.0
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: DocumentId,
    /// Human-readable title.
    pub title: String,
    /// Document content.
    pub content: Content,
}

impl Document {
    /// Create a document holding a single empty paragraph.
    pub fn new(id: DocumentId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: Content::empty(),
        }
    }

    /// Replace the content.
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }
}
