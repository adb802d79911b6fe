//! Content tree construction.
//!
//! Candidate nodes are scattered points in a document. [`build_tree`] turns
//! them into a proper tree by inserting their lowest common ancestors, so
//! each inner node's total weight reflects how much of the observed
//! difference lies below it.

use std::fmt::Write as _;

use crate::parse::{Document, Element};
use crate::{Result, SiftError};

/// Number of characters of text shown per line of [`ContentTree::debug_outline`].
const OUTLINE_TEXT_CHARS: usize = 20;

/// One node of a [`ContentTree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Pre-order index of the document node this tree node stands for.
    pub index: usize,
    /// Own weight; 0 for inserted ancestors.
    pub weight: f64,
    total_weight: Option<f64>,
    /// Arena id of the parent.
    pub parent: Option<usize>,
    /// Arena ids of the children, in document order.
    pub children: Vec<usize>,
}

impl TreeNode {
    fn new(index: usize, weight: f64) -> Self {
        Self { index, weight, total_weight: None, parent: None, children: Vec::new() }
    }

    /// Own weight plus the weight of every descendant.
    pub fn total_weight(&self) -> f64 {
        self.total_weight.unwrap_or(self.weight)
    }
}

/// A tree over the candidate nodes of one document.
///
/// Nodes live in an arena; `parent` and `children` hold arena ids.
#[derive(Debug, Clone)]
pub struct ContentTree<'a> {
    document: &'a Document,
    nodes: Vec<TreeNode>,
    root: usize,
}

impl<'a> ContentTree<'a> {
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Arena id of the root.
    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total weight of the whole tree.
    pub fn total_weight(&self) -> f64 {
        self.nodes[self.root].total_weight()
    }

    /// The document node a tree node stands for.
    pub fn element(&self, id: usize) -> Option<Element<'a>> {
        self.nodes.get(id).and_then(|node| self.document.get(node.index))
    }

    /// Renders the tree one node per line.
    ///
    /// Nodes at or above `threshold` are marked `+`, others `-`. Totals above
    /// 1 are printed, followed by the tag and the start of the node's text.
    pub fn debug_outline(&self, threshold: f64) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            let total = node.total_weight();

            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str(if total >= threshold { "+ " } else { "- " });
            if total > 1.0 {
                let _ = write!(out, "{}) ", total);
            }
            if let Some(el) = self.document.get(node.index) {
                if let Some(tag) = el.tag_name() {
                    let _ = write!(out, "<{}>", tag);
                }
                out.extend(el.to_text().chars().take(OUTLINE_TEXT_CHARS));
            }

            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    fn push(&mut self, node: TreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn append_child(&mut self, parent: usize, child: usize) {
        debug_assert!(
            self.nodes[parent].index < self.nodes[child].index,
            "child index {} must be greater than parent index {}",
            self.nodes[child].index,
            self.nodes[parent].index
        );
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Swaps `parent`'s last child for `node` and returns the detached child.
    fn replace_last_child(&mut self, parent: usize, node: usize) -> Result<usize> {
        let popped = *self.nodes[parent]
            .children
            .last()
            .ok_or_else(|| SiftError::UnreachableAlignment(format!("node {} has no child to replace", self.nodes[parent].index)))?;
        debug_assert!(
            self.nodes[parent].index < self.nodes[node].index && self.nodes[node].index < self.nodes[popped].index,
            "invalid order: {} < {} < {}",
            self.nodes[parent].index,
            self.nodes[node].index,
            self.nodes[popped].index
        );

        if let Some(last) = self.nodes[parent].children.last_mut() {
            *last = node;
        }
        self.nodes[node].parent = Some(parent);
        self.nodes[popped].parent = None;
        Ok(popped)
    }

    /// Finds or creates the node for `index` on the path from `from` to the root.
    fn insert_ancestor(&mut self, from: usize, index: usize) -> Result<usize> {
        let mut cursor = from;
        while self.nodes[cursor].index > index {
            cursor = self.nodes[cursor].parent.ok_or_else(|| {
                SiftError::UnreachableAlignment(format!("no tree node at or above index {}", index))
            })?;
        }
        if self.nodes[cursor].index == index {
            return Ok(cursor);
        }

        let node = self.push(TreeNode::new(index, 0.0));
        let popped = self.replace_last_child(cursor, node)?;
        self.append_child(node, popped);
        Ok(node)
    }

    /// Computes and memoizes total weights below `id`.
    fn update_total_weight(&mut self, id: usize) -> f64 {
        if let Some(total) = self.nodes[id].total_weight {
            return total;
        }
        let mut sum = self.nodes[id].weight;
        for position in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[position];
            sum += self.update_total_weight(child);
        }
        self.nodes[id].total_weight = Some(sum);
        sum
    }
}

/// Builds the content tree over `elements`.
///
/// Elements must come from one document in strictly ascending index order.
/// Returns `None` for an empty list, and a single node when the first
/// element is the document root.
///
/// # Errors
///
/// Returns [`SiftError::UnreachableAlignment`] when elements from several
/// documents are mixed or the order is not ascending.
pub fn build_tree<'a, F>(elements: &[Element<'a>], weight: F) -> Result<Option<ContentTree<'a>>>
where
    F: Fn(Element<'a>) -> f64,
{
    let Some(&first) = elements.first() else {
        return Ok(None);
    };
    let document = first.document();
    let mut tree = ContentTree { document, nodes: Vec::new(), root: 0 };

    if first.index() == 0 {
        let root = tree.push(TreeNode::new(0, weight(first)));
        tree.update_total_weight(root);
        return Ok(Some(tree));
    }

    let trunk = tree.push(TreeNode::new(0, 0.0));
    let mut last = tree.push(TreeNode::new(first.index(), weight(first)));
    tree.append_child(trunk, last);

    for &el in &elements[1..] {
        if !std::ptr::eq(el.document(), document) {
            return Err(SiftError::UnreachableAlignment(format!(
                "node {} belongs to another document",
                el.index()
            )));
        }
        let last_index = tree.nodes[last].index;
        if el.index() <= last_index {
            return Err(SiftError::UnreachableAlignment(format!(
                "nodes out of order: {} after {}",
                el.index(),
                last_index
            )));
        }

        let branch_index = document.common_ancestor(last_index, el.index())?;
        let branch = tree.insert_ancestor(last, branch_index)?;
        let leaf = tree.push(TreeNode::new(el.index(), weight(el)));
        tree.append_child(branch, leaf);
        last = leaf;
    }

    tree.update_total_weight(trunk);
    tracing::trace!(nodes = tree.len(), total = tree.total_weight(), "built content tree");
    Ok(Some(tree))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = "<html><head></head><body><div><p>a</p><p>b</p></div><footer>c</footer></body></html>";

    fn texts(doc: &Document) -> Vec<Element<'_>> {
        doc.nodes().filter(|el| el.is_text()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[], |_| 1.0).unwrap().is_none());
    }

    #[test]
    fn test_root_only() {
        let doc = Document::parse(HTML).unwrap();
        let tree = build_tree(&[doc.root()], |_| 1.0).unwrap().unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.element(tree.root()), Some(doc.root()));
        assert_eq!(tree.total_weight(), 1.0);
    }

    #[test]
    fn test_common_ancestors_are_inserted() {
        let doc = Document::parse(HTML).unwrap();
        let tree = build_tree(&texts(&doc), |_| 1.0).unwrap().unwrap();

        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.index, 0);
        assert_eq!(tree.total_weight(), 3.0);

        let body = tree.node(root.children[0]).unwrap();
        assert_eq!(tree.element(root.children[0]).unwrap().tag_name(), Some("body"));
        assert_eq!(body.weight, 0.0);
        assert_eq!(body.children.len(), 2);

        let div = tree.node(body.children[0]).unwrap();
        assert_eq!(div.total_weight(), 2.0);
        assert_eq!(div.children.len(), 2);
    }

    #[test]
    fn test_total_weight_is_monotone() {
        let doc = Document::parse(HTML).unwrap();
        let tree = build_tree(&texts(&doc), |el| el.to_text().len() as f64).unwrap().unwrap();

        for node in tree.nodes() {
            assert!(node.total_weight() >= node.weight);
            for &child in &node.children {
                let child = tree.node(child).unwrap();
                assert!(node.index < child.index);
                assert!(node.total_weight() >= child.total_weight());
            }
        }
    }

    #[test]
    fn test_zero_weight_nodes_are_computed_once() {
        let doc = Document::parse(HTML).unwrap();
        let mut tree = build_tree(&texts(&doc), |_| 0.0).unwrap().unwrap();

        let root = tree.root();
        assert_eq!(tree.update_total_weight(root), 0.0);
        assert_eq!(tree.update_total_weight(root), 0.0);
        assert!(tree.nodes().iter().all(|node| node.total_weight.is_some()));
    }

    #[test]
    fn test_mixed_documents_are_rejected() {
        let a = Document::parse(HTML).unwrap();
        let b = Document::parse(HTML).unwrap();
        let elements = vec![texts(&a)[0], texts(&b)[1]];

        let result = build_tree(&elements, |_| 1.0);
        assert!(matches!(result, Err(SiftError::UnreachableAlignment(_))));
    }

    #[test]
    fn test_descending_order_is_rejected() {
        let doc = Document::parse(HTML).unwrap();
        let mut elements = texts(&doc);
        elements.reverse();

        let result = build_tree(&elements, |_| 1.0);
        assert!(matches!(result, Err(SiftError::UnreachableAlignment(_))));
    }

    #[test]
    fn test_debug_outline() {
        let doc = Document::parse(HTML).unwrap();
        let tree = build_tree(&texts(&doc), |_| 1.0).unwrap().unwrap();

        let expected = "+ 3) <html>abc\n  + 3) <body>abc\n    + 2) <div>ab\n      - a\n      - b\n    - c";
        assert_eq!(tree.debug_outline(1.5), expected);
    }
}
