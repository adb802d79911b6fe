//! Pairwise structural diff between two node subtrees.
//!
//! The walk compares tag names, attributes and children position by
//! position. Every disagreement becomes a [`Patch`] keyed by the offset of
//! the original node from the left-hand subtree root, so a patch key plus the
//! root's index always lands on the node in the left document.

use std::collections::BTreeMap;

use crate::parse::{Element, NodeKind};

/// What kind of disagreement a [`Patch`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// The node is replaced by an element of another kind or tag.
    Node,
    /// The node is replaced by a text node.
    Text,
    /// Same tag, different attributes.
    Props,
    /// The right-hand side has an extra child (keyed at the parent).
    Insert,
    /// The right-hand side has no node at this position.
    Remove,
}

/// One disagreement between two subtrees.
#[derive(Debug, Clone, Copy)]
pub struct Patch<'a> {
    pub kind: PatchKind,
    /// Node on the left-hand side, `None` for inserts.
    pub original: Option<Element<'a>>,
    /// Node on the right-hand side, `None` for removals.
    pub replacement: Option<Element<'a>>,
}

impl<'a> Patch<'a> {
    /// Whether this patch is a meaningful difference.
    ///
    /// Two text nodes only count when at least one of them has non-blank
    /// text; any replacement involving an element always counts. Attribute,
    /// insert and remove patches never do.
    pub fn is_replace(&self) -> bool {
        if !matches!(self.kind, PatchKind::Node | PatchKind::Text) {
            return false;
        }
        match (self.original, self.replacement) {
            (Some(a), Some(b)) => match (a.text_value(), b.text_value()) {
                (Some(left), Some(right)) => !left.trim().is_empty() || !right.trim().is_empty(),
                _ => true,
            },
            _ => false,
        }
    }
}

/// Result of [`diff`]: all patches keyed by offset from the left root.
#[derive(Debug, Clone)]
pub struct DiffInfo<'a> {
    root: Element<'a>,
    patches: BTreeMap<usize, Vec<Patch<'a>>>,
}

impl<'a> DiffInfo<'a> {
    /// The left-hand subtree root the offsets are relative to.
    pub fn root(&self) -> Element<'a> {
        self.root
    }

    /// All patches, ordered by offset.
    pub fn patches(&self) -> &BTreeMap<usize, Vec<Patch<'a>>> {
        &self.patches
    }

    /// Patches recorded at one offset.
    pub fn get(&self, offset: usize) -> &[Patch<'a>] {
        self.patches.get(&offset).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of offsets carrying at least one patch.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Left-hand nodes with a replace signal, in document order.
    pub fn replaced(&self) -> Vec<Element<'a>> {
        self.patches
            .values()
            .filter_map(|patches| patches.iter().find(|patch| patch.is_replace()))
            .filter_map(|patch| patch.original)
            .collect()
    }
}

/// Compares two subtrees structurally.
///
/// Children are paired by position. Elements with the same tag are compared
/// attribute-wise and descended into; any other pairing is recorded as a
/// whole-node replacement and not descended into.
pub fn diff<'a>(a: Element<'a>, b: Element<'a>) -> DiffInfo<'a> {
    let mut patches: BTreeMap<usize, Vec<Patch<'a>>> = BTreeMap::new();
    let mut stack = vec![(a, Some(b))];

    while let Some((left, right)) = stack.pop() {
        let offset = left.index() - a.index();
        let mut record = |kind: PatchKind, original: Option<Element<'a>>, replacement: Option<Element<'a>>| {
            patches.entry(offset).or_default().push(Patch { kind, original, replacement });
        };

        let Some(right) = right else {
            record(PatchKind::Remove, Some(left), None);
            continue;
        };

        match (left.kind(), right.kind()) {
            (NodeKind::Element(l), NodeKind::Element(r)) if l.name == r.name => {
                if !l.same_attrs(r) {
                    record(PatchKind::Props, Some(left), Some(right));
                }

                let left_children: Vec<_> = left.children().collect();
                let right_children: Vec<_> = right.children().collect();
                for extra in right_children.iter().skip(left_children.len()) {
                    record(PatchKind::Insert, None, Some(*extra));
                }
                for (position, child) in left_children.iter().enumerate().rev() {
                    stack.push((*child, right_children.get(position).copied()));
                }
            }
            (_, NodeKind::Element(_)) => record(PatchKind::Node, Some(left), Some(right)),
            (NodeKind::Text(l), NodeKind::Text(r)) => {
                if l != r {
                    record(PatchKind::Text, Some(left), Some(right));
                }
            }
            (NodeKind::Element(_), NodeKind::Text(_)) => record(PatchKind::Text, Some(left), Some(right)),
        }
    }

    DiffInfo { root: a, patches }
}
