// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tab-order focus rings.
//!
//! Every widget sits on exactly one circular ring threaded through
//! `focus_next`/`focus_prev`. A ring holds the widgets of one window, in tab
//! order, starting at the window itself. Detached widgets form singleton
//! rings. The rings are independent of the parent/child links: tab order can
//! be rearranged without touching z-order.

use alloc::vec::Vec;

use super::id::WidgetId;
use super::tree::WidgetTree;
use crate::error::CompositorError;

impl WidgetTree {
    /// Returns the widget after `id` in tab order.
    #[must_use]
    pub fn next_in_focus_chain(&self, id: WidgetId) -> WidgetId {
        self.validate(id);
        self.id_at(self.focus_next[id.idx as usize])
    }

    /// Returns the widget before `id` in tab order.
    #[must_use]
    pub fn prev_in_focus_chain(&self, id: WidgetId) -> WidgetId {
        self.validate(id);
        self.id_at(self.focus_prev[id.idx as usize])
    }

    /// Returns the whole ring containing `id`, starting at `id`.
    #[must_use]
    pub fn focus_chain(&self, id: WidgetId) -> Vec<WidgetId> {
        self.validate(id);
        let mut out = Vec::new();
        let mut w = id.idx;
        loop {
            out.push(self.id_at(w));
            w = self.focus_next[w as usize];
            if w == id.idx {
                break;
            }
        }
        out
    }

    /// Moves `second` directly after `first` in tab order.
    ///
    /// # Errors
    ///
    /// [`CompositorError::TabOrderCycle`] if both are the same widget, and
    /// [`CompositorError::TabOrderAcrossWindows`] if they live in different
    /// windows.
    pub fn set_tab_order(
        &mut self,
        first: WidgetId,
        second: WidgetId,
    ) -> Result<(), CompositorError> {
        self.validate(first);
        self.validate(second);
        if first == second {
            return Err(CompositorError::TabOrderCycle(first));
        }
        if self.window_at(first.idx) != self.window_at(second.idx) {
            return Err(CompositorError::TabOrderAcrossWindows(first, second));
        }
        if self.focus_next[first.idx as usize] == second.idx {
            return Ok(());
        }
        self.focus_unlink(second.idx);
        self.focus_insert_after(second.idx, first.idx);
        Ok(())
    }

    /// Checks that every ring is doubly linked and stays within one window.
    ///
    /// # Panics
    ///
    /// Panics with `"corrupted focus chain"` if a link is broken, points at a
    /// freed slot, or crosses a window boundary.
    pub fn verify_focus_chain(&self) {
        for idx in 0..self.len {
            if self.free_list.contains(&idx) {
                continue;
            }
            let next = self.focus_next[idx as usize];
            let prev = self.focus_prev[idx as usize];
            assert!(
                !self.free_list.contains(&next) && !self.free_list.contains(&prev),
                "corrupted focus chain: slot {idx} links to a freed slot"
            );
            assert!(
                self.focus_prev[next as usize] == idx && self.focus_next[prev as usize] == idx,
                "corrupted focus chain: slot {idx} is not doubly linked"
            );
            assert!(
                self.window_at(next) == self.window_at(idx),
                "corrupted focus chain: slot {idx} links into another window"
            );
        }
    }

    // -- Crate-internal ring surgery --

    /// Removes `idx` from its ring, leaving it as a singleton.
    pub(crate) fn focus_unlink(&mut self, idx: u32) {
        let next = self.focus_next[idx as usize];
        let prev = self.focus_prev[idx as usize];
        self.focus_next[prev as usize] = next;
        self.focus_prev[next as usize] = prev;
        self.focus_next[idx as usize] = idx;
        self.focus_prev[idx as usize] = idx;
    }

    /// Inserts the singleton `idx` after `after`.
    fn focus_insert_after(&mut self, idx: u32, after: u32) {
        let next = self.focus_next[after as usize];
        self.focus_next[after as usize] = idx;
        self.focus_prev[idx as usize] = after;
        self.focus_next[idx as usize] = next;
        self.focus_prev[next as usize] = idx;
    }

    /// Closes `members` into a ring in the given order.
    fn focus_link_ring(&mut self, members: &[u32]) {
        let Some(&first) = members.first() else {
            return;
        };
        let mut prev = first;
        for &w in &members[1..] {
            self.focus_next[prev as usize] = w;
            self.focus_prev[w as usize] = prev;
            prev = w;
        }
        self.focus_next[prev as usize] = first;
        self.focus_prev[first as usize] = prev;
    }

    /// Moves `idx` and its window-bounded descendants from their current ring
    /// into the ring of `idx`'s current window.
    ///
    /// Call after the parent link changed; `old_window` is the window `idx`
    /// belonged to before. The moved segment keeps its internal order and is
    /// appended at the end of the destination ring, or closes into its own
    /// ring if `idx` is now a window.
    pub(crate) fn reparent_focus(&mut self, idx: u32, old_window: u32) {
        if old_window == self.window_at(idx) {
            return;
        }

        let mut moved = Vec::new();
        moved.push(idx);
        let mut remaining = Vec::new();
        let mut w = self.focus_next[idx as usize];
        while w != idx {
            if self.is_ancestor_at(idx, w) {
                moved.push(w);
            } else {
                remaining.push(w);
            }
            w = self.focus_next[w as usize];
        }

        self.focus_link_ring(&remaining);

        if self.is_window_at(idx) {
            self.focus_link_ring(&moved);
        } else {
            let top = self.window_at(idx);
            let prev = self.focus_prev[top as usize];
            let last = moved[moved.len() - 1];
            self.focus_next[prev as usize] = idx;
            self.focus_prev[idx as usize] = prev;
            self.focus_next[last as usize] = top;
            self.focus_prev[top as usize] = last;
            // Link the segment interior.
            for pair in moved.windows(2) {
                self.focus_next[pair[0] as usize] = pair[1];
                self.focus_prev[pair[1] as usize] = pair[0];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::widget::WindowType;

    /// Attaches `child` under `parent` and threads it into the window's ring.
    fn attach(tree: &mut WidgetTree, parent: WidgetId, child: WidgetId) {
        let old_window = tree.window_at(child.idx);
        tree.append_child(parent, child);
        tree.reparent_focus(child.idx, old_window);
    }

    fn detach(tree: &mut WidgetTree, child: WidgetId) {
        let old_window = tree.window_at(child.idx);
        tree.remove_from_parent(child);
        tree.reparent_focus(child.idx, old_window);
    }

    #[test]
    fn new_widget_is_a_singleton_ring() {
        let mut tree = WidgetTree::new();
        let w = tree.create(WindowType::Widget);
        assert_eq!(tree.focus_chain(w), vec![w]);
        tree.verify_focus_chain();
    }

    #[test]
    fn children_join_in_attach_order() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        attach(&mut tree, win, a);
        attach(&mut tree, win, b);
        assert_eq!(tree.focus_chain(win), vec![win, a, b]);
        assert_eq!(tree.prev_in_focus_chain(win), b);
        tree.verify_focus_chain();
    }

    #[test]
    fn set_tab_order_moves_second_after_first() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        let c = tree.create(WindowType::Widget);
        for w in [a, b, c] {
            attach(&mut tree, win, w);
        }
        tree.set_tab_order(a, c).unwrap();
        assert_eq!(tree.focus_chain(win), vec![win, a, c, b]);
        tree.verify_focus_chain();
    }

    #[test]
    fn set_tab_order_rejects_self_and_foreign_windows() {
        let mut tree = WidgetTree::new();
        let w1 = tree.create(WindowType::Window);
        let w2 = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        attach(&mut tree, w1, a);
        assert_eq!(
            tree.set_tab_order(a, a),
            Err(CompositorError::TabOrderCycle(a))
        );
        assert_eq!(
            tree.set_tab_order(a, w2),
            Err(CompositorError::TabOrderAcrossWindows(a, w2))
        );
    }

    #[test]
    fn detach_then_attach_moves_whole_segment() {
        let mut tree = WidgetTree::new();
        let p1 = tree.create(WindowType::Window);
        let p2 = tree.create(WindowType::Window);
        let x = tree.create(WindowType::Widget);
        let w = tree.create(WindowType::Widget);
        let w1 = tree.create(WindowType::Widget);
        let w2 = tree.create(WindowType::Widget);
        let y = tree.create(WindowType::Widget);
        attach(&mut tree, p1, x);
        attach(&mut tree, p1, w);
        attach(&mut tree, w, w1);
        attach(&mut tree, w, w2);
        attach(&mut tree, p1, y);
        assert_eq!(tree.focus_chain(p1), vec![p1, x, w, w1, w2, y]);

        detach(&mut tree, w);
        assert_eq!(tree.focus_chain(p1), vec![p1, x, y]);
        assert_eq!(tree.focus_chain(w), vec![w, w1, w2]);
        tree.verify_focus_chain();

        attach(&mut tree, p2, w);
        assert_eq!(tree.focus_chain(p2), vec![p2, w, w1, w2]);
        assert_eq!(tree.focus_chain(p1), vec![p1, x, y]);
        tree.verify_focus_chain();
    }

    #[test]
    fn nested_windows_keep_their_own_ring() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let dialog = tree.create(WindowType::Dialog);
        let d1 = tree.create(WindowType::Widget);
        attach(&mut tree, dialog, d1);
        attach(&mut tree, win, dialog);
        assert_eq!(tree.focus_chain(win), vec![win]);
        assert_eq!(tree.focus_chain(dialog), vec![dialog, d1]);
        tree.verify_focus_chain();
    }

    #[test]
    fn destroy_unlinks_from_ring() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        attach(&mut tree, win, a);
        attach(&mut tree, win, b);
        tree.destroy(a);
        assert_eq!(tree.focus_chain(win), vec![win, b]);
        tree.verify_focus_chain();
    }

    #[test]
    #[should_panic(expected = "corrupted focus chain")]
    fn verify_detects_broken_links() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        attach(&mut tree, win, a);
        // Break the back link.
        tree.focus_prev[win.idx as usize] = win.idx;
        tree.verify_focus_chain();
    }
}
