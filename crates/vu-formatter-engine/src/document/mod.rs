//! # Document Tree
//!
//! The tree the external document parser hands over, reduced to what the VU
//! rewriter reads: node kind, container context, title, the attribute bag,
//! attribute definitions, list item text and its source location.
//!
//! The rewriter only ever edits list item text and list membership; it never
//! creates nodes of a new kind.

pub mod attributes;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use attributes::{AttributeEntry, AttributeSet, AttributeTracker};

/// Titles of the sidebars that hold VU lists.
pub const VU_SECTION_TITLES: [&str; 2] = ["Valid Usage", "Valid Usage (Implicit)"];
/// Node attribute naming the API a refpage block documents.
pub const REFPAGE_ATTRIBUTE: &str = "refpage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    ListItem,
    Text,
}

/// The flavour of a container block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Context {
    Open,
    Sidebar,
    #[default]
    #[serde(other)]
    Other,
}

/// Best-effort source position of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "is_other")]
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Attribute definitions that take effect at this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_entries: Vec<AttributeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

fn is_other(context: &Context) -> bool {
    *context == Context::Other
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            context: Context::Other,
            title: None,
            attributes: BTreeMap::new(),
            attribute_entries: Vec::new(),
            text: None,
            source: None,
            children: Vec::new(),
        }
    }

    pub fn container(context: Context) -> Self {
        Self {
            context,
            ..Self::new(NodeKind::Container)
        }
    }

    /// An open block documenting `api`.
    pub fn refpage(api: impl Into<String>) -> Self {
        Self::container(Context::Open).with_attribute(REFPAGE_ATTRIBUTE, api)
    }

    pub fn sidebar(title: impl Into<String>) -> Self {
        Self::container(Context::Sidebar).with_title(title)
    }

    pub fn list() -> Self {
        Self::new(NodeKind::List)
    }

    pub fn item(text: impl Into<String>) -> Self {
        Self::new(NodeKind::ListItem).with_text(text)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_entry(mut self, entry: AttributeEntry) -> Self {
        self.attribute_entries.push(entry);
        self
    }

    pub fn with_source(mut self, file: impl Into<String>, line: u32) -> Self {
        self.source = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// The API named by an open block's `refpage` attribute.
    pub fn refpage_api(&self) -> Option<&str> {
        if self.kind == NodeKind::Container && self.context == Context::Open {
            self.attributes.get(REFPAGE_ATTRIBUTE).map(String::as_str)
        } else {
            None
        }
    }

    /// Whether this is a sidebar titled as a VU section.
    pub fn is_vu_section(&self) -> bool {
        self.kind == NodeKind::Container
            && self.context == Context::Sidebar
            && self
                .title
                .as_deref()
                .is_some_and(|t| VU_SECTION_TITLES.contains(&t))
    }
}

/// A parsed document: header attributes plus top-level blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Attributes defined when the document finished loading its header.
    #[serde(default)]
    pub attributes: AttributeSet,
    #[serde(default)]
    pub blocks: Vec<Node>,
}

impl Document {
    pub fn new(attributes: AttributeSet, blocks: Vec<Node>) -> Self {
        Self { attributes, blocks }
    }

    /// Every list item text in document order, for inspection and tests.
    pub fn item_texts(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for node in nodes {
                if node.kind == NodeKind::ListItem
                    && let Some(text) = &node.text
                {
                    out.push(text);
                }
                collect(&node.children, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.blocks, &mut out);
        out
    }
}
