//! Iterators over the node tree.

use std::iter::FusedIterator;

use crate::allocators::slots::{NodeId, SlotTable};

use super::hierarchy::Node;

/// Iterator over a sibling list, first to last.
///
/// Returned by [`Hierarchy::children`](crate::Hierarchy::children) and
/// [`Hierarchy::roots`](crate::Hierarchy::roots).
pub struct Children<'a> {
    nodes: &'a SlotTable<Node>,
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a> Children<'a> {
    pub(crate) fn new(nodes: &'a SlotTable<Node>, head: Option<u32>, len: usize) -> Self {
        Self {
            nodes,
            cursor: head,
            remaining: len,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let index = self.cursor?;
        self.cursor = self.nodes[index].next;
        self.remaining -= 1;
        Some(self.nodes.id_at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}
impl FusedIterator for Children<'_> {}

/// Iterator from a node's parent up to its root.
///
/// Returned by [`Hierarchy::ancestors`](crate::Hierarchy::ancestors).
pub struct Ancestors<'a> {
    nodes: &'a SlotTable<Node>,
    cursor: Option<u32>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(nodes: &'a SlotTable<Node>, start: Option<u32>) -> Self {
        Self {
            nodes,
            cursor: start,
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let index = self.cursor?;
        self.cursor = self.nodes[index].parent;
        Some(self.nodes.id_at(index))
    }
}

impl FusedIterator for Ancestors<'_> {}

/// Slot indices of a subtree in finalization order: every node after all
/// of its descendants, sibling subtrees in list order.
pub(crate) fn post_order(nodes: &SlotTable<Node>, root: u32) -> Vec<u32> {
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];

    while let Some((index, expanded)) = stack.pop() {
        if expanded {
            order.push(index);
            continue;
        }

        stack.push((index, true));

        // Push in reverse so the first child is visited first
        let mut child = nodes[index].children.tail;
        while let Some(c) = child {
            stack.push((c, false));
            child = nodes[c].prev;
        }
    }

    order
}
