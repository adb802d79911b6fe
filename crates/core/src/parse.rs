//! HTML parsing into an indexed node tree.
//!
//! This module provides the [`Document`] and [`Element`] types. A document is
//! parsed once and never mutated afterwards: every element and text node is
//! stored in a flat arena at its pre-order position, so a node's descendants
//! always occupy the contiguous index range `index + 1 ..= index + count`.
//!
//! # Example
//!
//! ```rust
//! use blogsift_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let root = doc.root();
//! assert_eq!(root.tag_name(), Some("html"));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use scraper::{ElementRef, Html};

use crate::diff::{DiffInfo, diff};
use crate::serialize::{self, MarkupStyle};
use crate::{Result, SiftError};

/// Attributes and tag name of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether both elements carry the same attribute set, ignoring order.
    pub fn same_attrs(&self, other: &ElementData) -> bool {
        self.attrs.len() == other.attrs.len() && self.attrs.iter().all(|pair| other.attrs.contains(pair))
    }
}

/// The two kinds of node kept in a document.
///
/// Comments, doctypes and processing instructions are dropped at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// A node stored in the document arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Element or text payload.
    pub kind: NodeKind,
    /// Pre-order indices of the children, in document order.
    pub children: Vec<usize>,
    /// Number of descendants (subtree size minus one).
    pub count: usize,
}

impl Node {
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}

/// Per-index metadata computed once at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Pre-order index of the node.
    pub index: usize,
    /// Index of the parent node, `None` for the root.
    pub parent_index: Option<usize>,
    /// 0-based position among the element siblings that precede this node.
    pub sibling_index: usize,
}

/// Represents a parsed HTML document.
///
/// A Document owns its node storage. Everything else (element handles,
/// diffs, alignment rows, content trees) borrows it by index, so documents
/// can be shared read-only across threads.
///
/// # Example
///
/// ```rust
/// use blogsift_core::parse::Document;
///
/// let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hello</p></body></html>").unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// assert_eq!(doc.at(0).unwrap().tag_name(), Some("html"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    entries: Vec<IndexEntry>,
    doctype: Option<String>,
    source: Option<PathBuf>,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Parse`] if the input is blank or no root element
    /// is found.
    pub fn parse(html: &str) -> Result<Self> {
        if html.trim().is_empty() {
            return Err(SiftError::Parse("document is empty".to_string()));
        }

        let parsed = Html::parse_document(html);
        let doctype = parsed.tree.root().children().find_map(|node| match node.value() {
            scraper::Node::Doctype(doctype) => Some(doctype.name().to_string()),
            _ => None,
        });
        let root = parsed
            .tree
            .root()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or_else(|| SiftError::Parse("document has no root element".to_string()))?;

        let (nodes, entries) = index_tree(root);
        Ok(Self { nodes, entries, doctype, source: None })
    }

    /// Reads and parses an HTML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)?;
        let mut doc = Self::parse(&html)?;
        doc.source = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Gets the file this document was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Gets the doctype name (e.g. `html`) if the source declared one.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Number of indexed nodes (elements and text).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a successfully parsed document.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets the root element (index 0).
    pub fn root(&self) -> Element<'_> {
        Element { document: self, index: 0 }
    }

    /// Gets the node at a pre-order index.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::IndexOutOfRange`] if no node has that index.
    pub fn at(&self, index: usize) -> Result<Element<'_>> {
        self.get(index)
            .ok_or(SiftError::IndexOutOfRange { index, len: self.nodes.len() })
    }

    /// Gets the node at a pre-order index, if present.
    pub fn get(&self, index: usize) -> Option<Element<'_>> {
        (index < self.nodes.len()).then_some(Element { document: self, index })
    }

    /// Gets the index entry of a node.
    pub fn entry(&self, index: usize) -> Option<&IndexEntry> {
        self.entries.get(index)
    }

    /// All index entries in pre-order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Iterates over every node (elements and text) in document order.
    pub fn nodes(&self) -> impl Iterator<Item = Element<'_>> {
        (0..self.nodes.len()).map(move |index| Element { document: self, index })
    }

    /// Iterates over the elements whose tag is one of `tags`, in document order.
    pub fn elements_by_tag<'a>(&'a self, tags: &'a [&'a str]) -> impl Iterator<Item = Element<'a>> + 'a {
        self.nodes()
            .filter(move |el| el.tag_name().is_some_and(|name| tags.contains(&name)))
    }

    /// Structural diff of this document's root against another's.
    pub fn diff<'a>(&'a self, other: &'a Document) -> DiffInfo<'a> {
        diff(self.root(), other.root())
    }

    /// Finds the lowest common ancestor of two nodes.
    ///
    /// Repeatedly steps up from whichever side has the higher index until
    /// both meet. This relies on an ancestor's index never exceeding the
    /// index of any of its descendants.
    ///
    /// # Errors
    ///
    /// [`SiftError::IndexOutOfRange`] for unknown indices, and
    /// [`SiftError::UnreachableAlignment`] if a walk runs past the root.
    pub fn common_ancestor(&self, a: usize, b: usize) -> Result<usize> {
        let mut left = *self.entry(a).ok_or(SiftError::IndexOutOfRange { index: a, len: self.len() })?;
        let mut right = *self.entry(b).ok_or(SiftError::IndexOutOfRange { index: b, len: self.len() })?;

        loop {
            if left.index == right.index {
                return Ok(left.index);
            }
            let cursor = if left.index > right.index { &mut left } else { &mut right };
            let parent = cursor.parent_index.ok_or_else(|| {
                SiftError::UnreachableAlignment(format!("no common ancestor for nodes {} and {}", a, b))
            })?;
            *cursor = self.entries[parent];
        }
    }

    /// Gets the title of the document.
    ///
    /// Returns the normalized text of the first `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        self.elements_by_tag(&["title"]).next().map(|el| el.to_text())
    }

    /// Gets all text content from the document.
    ///
    /// Script, style and noscript contents are skipped.
    pub fn text_content(&self) -> String {
        self.root().to_text()
    }

    /// Serializes the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.to_html_excluding(&BTreeSet::new())
    }

    /// Serializes the whole document, leaving out the subtrees rooted at `removed`.
    pub(crate) fn to_html_excluding(&self, removed: &BTreeSet<usize>) -> String {
        let mut out = String::new();
        if let Some(doctype) = &self.doctype {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
        serialize::write_markup(self, 0, MarkupStyle::Faithful, removed, &mut out);
        out
    }

    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}

/// Assigns pre-order indices in a single walk over the parsed tree.
///
/// Returns the node arena and its index map; no counter survives the walk.
fn index_tree(root: ElementRef<'_>) -> (Vec<Node>, Vec<IndexEntry>) {
    let mut nodes: Vec<Node> = Vec::new();
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut stack = vec![(*root, None::<usize>)];

    while let Some((node_ref, parent)) = stack.pop() {
        let kind = match node_ref.value() {
            scraper::Node::Element(el) => NodeKind::Element(ElementData {
                name: el.name().to_lowercase(),
                attrs: el
                    .attrs()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            }),
            scraper::Node::Text(text) => NodeKind::Text(text.to_string()),
            _ => continue,
        };

        let index = nodes.len();
        let sibling_index = match parent {
            Some(p) => nodes[p].children.iter().filter(|&&c| nodes[c].is_element()).count(),
            None => 0,
        };
        if let Some(p) = parent {
            nodes[p].children.push(index);
        }

        let is_element = matches!(kind, NodeKind::Element(_));
        nodes.push(Node { kind, children: Vec::new(), count: 0 });
        entries.push(IndexEntry { index, parent_index: parent, sibling_index });

        if is_element {
            for child in node_ref.children().rev() {
                stack.push((child, Some(index)));
            }
        }
    }

    // Children always carry larger indices than their parents, so a reverse
    // sweep sees every subtree complete before its parent.
    for index in (1..nodes.len()).rev() {
        if let Some(parent) = entries[index].parent_index {
            nodes[parent].count += nodes[index].count + 1;
        }
    }

    (nodes, entries)
}

/// Options for [`Element::selector_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorOptions {
    /// Append `:nth-child(n)` when a parent holds several elements of the same tag.
    pub nth: bool,
    /// Append `.class` for each class token.
    pub classes: bool,
}

/// A lightweight handle on one node of a [`Document`].
///
/// Two handles are equal iff they point into the same document (by
/// identity) at the same index.
///
/// # Example
///
/// ```rust
/// use blogsift_core::parse::Document;
///
/// let doc = Document::parse(r#"<div class="post main"><p>Link text</p></div>"#).unwrap();
/// let div = doc.elements_by_tag(&["div"]).next().unwrap();
///
/// assert!(div.has_class("post"));
/// assert_eq!(div.to_text(), "Link text");
/// ```
#[derive(Clone, Copy)]
pub struct Element<'a> {
    document: &'a Document,
    index: usize,
}

impl<'a> Element<'a> {
    /// Gets the document this node belongs to.
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Gets the pre-order index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the index entry (parent and sibling position).
    pub fn entry(&self) -> &'a IndexEntry {
        &self.document.entries[self.index]
    }

    /// Gets the underlying node payload.
    pub fn kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element(_))
    }

    /// Raw text of a text node, `None` for elements.
    pub fn text_value(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// Tag name of an element node, `None` for text.
    pub fn tag_name(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Element(data) => Some(&data.name),
            NodeKind::Text(_) => None,
        }
    }

    /// Tag name of this node or, for text, of its nearest element ancestor.
    pub fn tag_name_or_ancestor(&self) -> Option<&'a str> {
        let mut cursor = Some(*self);
        while let Some(el) = cursor {
            if let Some(name) = el.tag_name() {
                return Some(name);
            }
            cursor = el.parent();
        }
        None
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Element(data) => data.attr(name),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether the `class` attribute contains `name` as a whitespace-separated token.
    pub fn has_class(&self, name: &str) -> bool {
        self.attr("class")
            .is_some_and(|class| class.split_whitespace().any(|token| token == name))
    }

    /// Gets the parent node, `None` at the root.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.entry()
            .parent_index
            .map(|index| Element { document: self.document, index })
    }

    /// Iterates over all child nodes.
    pub fn children(self) -> impl Iterator<Item = Element<'a>> + 'a {
        let document = self.document;
        self.node()
            .children
            .iter()
            .map(move |&index| Element { document, index })
    }

    /// Iterates over element children only.
    pub fn element_children(self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.children().filter(Element::is_element)
    }

    /// Whether this node has at least one element child.
    pub fn has_children(&self) -> bool {
        self.element_children().next().is_some()
    }

    /// Number of descendants.
    pub fn descendant_count(&self) -> usize {
        self.node().count
    }

    /// Iterates over all descendants in document order.
    pub fn descendants(self) -> impl Iterator<Item = Element<'a>> + 'a {
        let document = self.document;
        (self.index + 1..=self.index + self.node().count).map(move |index| Element { document, index })
    }

    /// Whether `other` is a strict descendant of this node in the same document.
    pub fn contains(&self, other: &Element<'_>) -> bool {
        std::ptr::eq(self.document, other.document)
            && self.index < other.index
            && other.index <= self.index + self.node().count
    }

    /// Whitespace-normalized text of the subtree.
    ///
    /// Each text node is collapsed and trimmed, then concatenated without a
    /// separator. Script, style and noscript subtrees are skipped.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        serialize::write_text(self.document, self.index, &mut out);
        out
    }

    /// Compact markup of the subtree.
    ///
    /// Text is whitespace-normalized, script/style/noscript collapse to an
    /// ellipsis placeholder and void tags are emitted without a closing tag.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        serialize::write_markup(
            self.document,
            self.index,
            MarkupStyle::Compact,
            &BTreeSet::new(),
            &mut out,
        );
        out
    }

    /// Markup of the subtree as parsed, with text and attributes entity-escaped.
    pub fn outer_html(&self) -> String {
        self.outer_html_excluding(&BTreeSet::new())
    }

    /// Same as [`Element::outer_html`], leaving out the subtrees rooted at `removed`.
    pub fn outer_html_excluding(&self, removed: &BTreeSet<usize>) -> String {
        let mut out = String::new();
        serialize::write_markup(self.document, self.index, MarkupStyle::Faithful, removed, &mut out);
        out
    }

    /// CSS selector path from the root, without classes or positions.
    pub fn selector(&self) -> String {
        self.selector_with(SelectorOptions::default())
    }

    /// CSS selector path from the root.
    ///
    /// The walk stops early at the first ancestor carrying an `id`, which is
    /// emitted as `#id`. Implicit `tbody`/`colgroup` wrappers are inserted
    /// below `table`, matching what browsers build.
    pub fn selector_with(&self, options: SelectorOptions) -> String {
        let mut path: Vec<String> = Vec::new();
        let mut cursor = Some(*self);

        while let Some(el) = cursor {
            cursor = el.parent();
            let NodeKind::Element(data) = el.kind() else { continue };
            let mut selector = data.name.clone();

            if data.name == "table"
                && let Some(last) = path.last()
            {
                if last.starts_with("tr") {
                    path.push("tbody".to_string());
                } else if last.starts_with("col") {
                    path.push("colgroup".to_string());
                }
            }

            if data.name != "body" {
                if let Some(id) = data.attr("id") {
                    path.push(format!("#{}", id));
                    break;
                }
                if options.classes
                    && let Some(class) = data.attr("class")
                {
                    for token in class.split_whitespace() {
                        selector.push('.');
                        selector.push_str(token);
                    }
                }
                if options.nth
                    && let Some(parent) = el.parent()
                {
                    let same_tag = parent
                        .element_children()
                        .filter(|sibling| sibling.tag_name() == Some(data.name.as_str()))
                        .count();
                    if same_tag > 1 {
                        selector.push_str(&format!(":nth-child({})", el.entry().sibling_index + 1));
                    }
                }
            }
            path.push(selector);
        }

        path.reverse();
        path.join(" > ")
    }

    fn node(&self) -> &'a Node {
        self.document.node(self.index)
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document) && self.index == other.index
    }
}

impl Eq for Element<'_> {}

impl std::hash::Hash for Element<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.document, state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self)
    }
}

impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element(data) => write!(f, "{}: <{}>", self.index, data.name),
            NodeKind::Text(text) => write!(f, "{}: {}", self.index, serialize::normalize_whitespace(text)),
        }
    }
}
