// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque-region cache and occlusion culling.
//!
//! Each widget caches the union of the opaque areas of its visible,
//! non-window children, in its own coordinates and clipped to its own rect.
//! Anything that can change that union marks the [`OPAQUE`](crate::dirty::OPAQUE)
//! channel, which propagates eagerly to every ancestor.
//! Marking also drops the cached entries of the widget and its ancestors, so
//! the read-only queries below recompute anything invalidated.
//! [`WidgetTree::refresh_opaque_cache`] drains the channel and rebuilds the
//! affected entries bottom-up.

use alloc::vec::Vec;

use kurbo::Rect;

use super::flags::WidgetFlags;
use super::id::{INVALID, WidgetId};
use super::tree::WidgetTree;
use crate::dirty;
use crate::region::{Region, intersect_rects, rect_is_empty};

impl WidgetTree {
    /// Rebuilds every opaque-children entry invalidated since the last
    /// refresh.
    pub fn refresh_opaque_cache(&mut self) {
        let mut affected: Vec<u32> = self
            .dirty
            .drain(dirty::OPAQUE)
            .affected()
            .deterministic()
            .run()
            .collect();
        affected.retain(|&idx| idx < self.len && !self.free_list.contains(&idx));
        if affected.is_empty() {
            return;
        }
        for &idx in &affected {
            self.opaque_children[idx as usize] = None;
        }

        // Every ancestor of an affected widget is affected too, so rebuilding
        // deepest first only ever reads fresh child entries.
        affected.sort_by_cached_key(|&idx| core::cmp::Reverse(self.depth_at(idx)));
        for idx in affected {
            let region = self.compute_opaque_children(idx);
            self.opaque_children[idx as usize] = Some(region);
        }
    }

    /// Enables or disables subtracting opaque siblings from repaint regions.
    pub fn set_subtract_opaque_siblings(&mut self, on: bool) {
        self.subtract_siblings = on;
    }

    /// Returns the area of the widget guaranteed to be covered by opaque
    /// content, in widget coordinates.
    ///
    /// This is the whole rect for an opaque widget, otherwise the opaque
    /// area of its children. A mask restricts either to the masked part.
    #[must_use]
    pub fn opaque_region(&self, id: WidgetId) -> Region {
        self.validate(id);
        self.opaque_region_at(id.idx)
    }

    /// Returns the union of the opaque regions of the widget's visible,
    /// non-window children, in widget coordinates.
    #[must_use]
    pub fn opaque_children_region(&self, id: WidgetId) -> Region {
        self.validate(id);
        self.opaque_children_at(id.idx)
    }

    /// Removes from `region` (widget coordinates) everything covered by
    /// opaque widgets stacked above `id`, at every level up to its window.
    ///
    /// Returns `true` if any visible sibling above (opaque or not) overlaps
    /// the widget and the region; such a widget cannot be repainted on its
    /// own.
    pub fn subtract_opaque_siblings(&self, id: WidgetId, region: &mut Region) -> bool {
        self.validate(id);
        self.subtract_opaque_siblings_at(id.idx, region)
    }

    /// Removes the widget's opaque-children region from `region`.
    pub fn subtract_opaque_children(&self, id: WidgetId, region: &mut Region) {
        self.validate(id);
        self.subtract_opaque_children_at(id.idx, region);
    }

    /// Returns `true` if a visible sibling stacked above the widget, or above
    /// one of its ancestors, intersects `rect` (widget coordinates).
    #[must_use]
    pub fn is_overlapped(&self, id: WidgetId, rect: Rect) -> bool {
        self.validate(id);
        self.is_overlapped_at(id.idx, rect)
    }

    // -- Crate-internal --

    pub(crate) fn opaque_region_at(&self, idx: u32) -> Region {
        let mut r = if self.flags[idx as usize].is_opaque() {
            Region::from_rect(self.local_rect_at(idx))
        } else {
            self.opaque_children_at(idx)
        };
        if let Some(mask) = &self.mask[idx as usize] {
            r.intersect(mask);
        }
        r
    }

    pub(crate) fn opaque_children_at(&self, idx: u32) -> Region {
        match &self.opaque_children[idx as usize] {
            Some(r) => r.clone(),
            None => self.compute_opaque_children(idx),
        }
    }

    pub(crate) fn subtract_opaque_children_at(&self, idx: u32, region: &mut Region) {
        if self.first_child[idx as usize] == INVALID || region.is_empty() {
            return;
        }
        let opaque = self.opaque_children_at(idx);
        if !opaque.is_empty() {
            region.subtract(&opaque);
        }
    }

    pub(crate) fn subtract_opaque_siblings_at(&self, idx: u32, region: &mut Region) -> bool {
        if self.is_window_at(idx) || region.is_empty() {
            return false;
        }
        let bounds = region.bounding_rect();
        let mut overlapped = false;
        // Offset from `idx` coordinates to the current level's parent.
        let mut parent_offset = self.pos_at(idx);
        let mut w = idx;
        while !self.is_window_at(w) {
            let p = self.parent[w as usize];
            let w_rect = self.effective_rect_at(w);
            let dirty_bounds = bounds + parent_offset;
            let mut s = self.next_sibling[w as usize];
            while s != INVALID {
                if self.is_occluder_at(s) {
                    let s_rect = self.effective_rect_at(s);
                    if !rect_is_empty(intersect_rects(s_rect, w_rect))
                        && !rect_is_empty(intersect_rects(s_rect, dirty_bounds))
                    {
                        overlapped = true;
                        if self.subtract_siblings {
                            let mut opaque = self.opaque_region_at(s);
                            if !opaque.is_empty() {
                                opaque.translate(self.pos_at(s) - parent_offset);
                                region.subtract(&opaque);
                            }
                        }
                    }
                }
                s = self.next_sibling[s as usize];
            }
            if region.is_empty() {
                break;
            }
            parent_offset += self.pos_at(p);
            w = p;
        }
        overlapped
    }

    pub(crate) fn is_overlapped_at(&self, idx: u32, rect: Rect) -> bool {
        let mut r = rect;
        let mut w = idx;
        while !self.is_window_at(w) {
            r = r + self.pos_at(w);
            let mut s = self.next_sibling[w as usize];
            while s != INVALID {
                if self.is_occluder_at(s) {
                    let overlap = intersect_rects(self.rect[s as usize], r);
                    if !rect_is_empty(overlap) {
                        match &self.mask[s as usize] {
                            Some(mask) => {
                                if mask.intersects_rect(overlap - self.pos_at(s)) {
                                    return true;
                                }
                            }
                            None => return true,
                        }
                    }
                }
                s = self.next_sibling[s as usize];
            }
            let p = self.parent[w as usize];
            r = intersect_rects(r, self.local_rect_at(p));
            if rect_is_empty(r) {
                return false;
            }
            w = p;
        }
        false
    }

    // -- Private helpers --

    /// A sibling takes part in occlusion when it is visible and not a window.
    #[inline]
    fn is_occluder_at(&self, idx: u32) -> bool {
        self.flags[idx as usize].contains(WidgetFlags::VISIBLE)
            && !self.window_type[idx as usize].is_window()
    }

    /// Geometry in parent coordinates, shrunk to the mask's bounds.
    pub(crate) fn effective_rect_at(&self, idx: u32) -> Rect {
        let rect = self.rect[idx as usize];
        match &self.mask[idx as usize] {
            Some(mask) => {
                let r = intersect_rects(
                    mask.bounding_rect() + rect.origin().to_vec2(),
                    rect,
                );
                if rect_is_empty(r) { Rect::ZERO } else { r }
            }
            None => rect,
        }
    }

    fn compute_opaque_children(&self, idx: u32) -> Region {
        let mut r = Region::new();
        let mut c = self.first_child[idx as usize];
        while c != INVALID {
            if self.is_occluder_at(c) {
                let mut child = self.opaque_region_at(c);
                if !child.is_empty() {
                    child.translate(self.pos_at(c));
                    r.union(&child);
                }
            }
            c = self.next_sibling[c as usize];
        }
        r.intersect_rect(self.local_rect_at(idx));
        r
    }

    fn depth_at(&self, idx: u32) -> usize {
        let mut depth = 0;
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            depth += 1;
            p = self.parent[p as usize];
        }
        depth
    }
}
