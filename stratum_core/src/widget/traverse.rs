// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, WidgetId};
use super::tree::WidgetTree;

/// An iterator over the direct children of a widget, back to front.
///
/// Created by [`WidgetTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a WidgetTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a WidgetTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// An iterator over the strict ancestors of a widget, nearest first.
///
/// Created by [`WidgetTree::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a WidgetTree,
    current: u32,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(tree: &'a WidgetTree, start: u32) -> Self {
        Self {
            tree,
            current: tree.parent[start as usize],
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.parent[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// Collects the subtree rooted at `root` in pre-order (parents before
/// children, siblings back to front).
pub(crate) fn subtree_preorder(tree: &WidgetTree, root: u32) -> Vec<u32> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    stack.push(root);
    while let Some(idx) = stack.pop() {
        out.push(idx);
        // Push children front-to-back so the back-most child pops first.
        let mut c = tree.last_child[idx as usize];
        while c != INVALID {
            stack.push(c);
            c = tree.prev_sibling[c as usize];
        }
    }
    out
}
