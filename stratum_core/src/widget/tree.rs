// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays widget storage with allocation, topology, and geometry.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use kurbo::{Insets, Point, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::flags::WidgetFlags;
use super::id::{INVALID, NativeId, WidgetId, WindowType};
use super::traverse::{Ancestors, Children, subtree_preorder};
use crate::dirty;
use crate::region::{Region, intersect_rects, rect_is_empty};

/// Largest width or height a widget can have.
pub const MAX_WIDGET_SIZE: f64 = 16_777_215.0;

/// Geometry given to new child widgets.
pub const DEFAULT_CHILD_RECT: Rect = Rect::new(0.0, 0.0, 100.0, 30.0);

/// Geometry given to new windows.
pub const DEFAULT_WINDOW_RECT: Rect = Rect::new(0.0, 0.0, 640.0, 480.0);

/// Struct-of-arrays storage for all widgets.
///
/// Widgets are addressed by [`WidgetId`] handles. Each widget occupies a slot
/// in parallel arrays; destroyed widgets are recycled via a free list, and
/// generation counters prevent stale handle access.
///
/// The tree is pure bookkeeping: it never talks to a backend. Lifecycle,
/// painting, and native-window management live in
/// [`Compositor`](crate::Compositor), which owns a tree.
#[derive(Debug)]
pub struct WidgetTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Focus chain --
    pub(crate) focus_next: Vec<u32>,
    pub(crate) focus_prev: Vec<u32>,

    // -- Geometry --
    pub(crate) rect: Vec<Rect>,
    pub(crate) min_size: Vec<Size>,
    pub(crate) max_size: Vec<Size>,
    /// Geometry last reported through a move/resize notification.
    pub(crate) notified_rect: Vec<Rect>,
    pub(crate) frame_strut: Vec<Insets>,

    // -- State --
    pub(crate) flags: Vec<WidgetFlags>,
    pub(crate) window_type: Vec<WindowType>,
    pub(crate) mask: Vec<Option<Region>>,
    pub(crate) native: Vec<Option<NativeId>>,
    pub(crate) kind_data: Vec<Option<Box<dyn Any>>>,

    // -- Opaque-region cache --
    pub(crate) opaque_children: Vec<Option<Region>>,
    pub(crate) subtract_siblings: bool,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            focus_next: Vec::new(),
            focus_prev: Vec::new(),
            rect: Vec::new(),
            min_size: Vec::new(),
            max_size: Vec::new(),
            notified_rect: Vec::new(),
            frame_strut: Vec::new(),
            flags: Vec::new(),
            window_type: Vec::new(),
            mask: Vec::new(),
            native: Vec::new(),
            kind_data: Vec::new(),
            opaque_children: Vec::new(),
            subtract_siblings: true,
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    // -- Allocation API --

    /// Creates a detached widget of the given type and returns its handle.
    ///
    /// The widget starts hidden, with no native handle, default geometry for
    /// its type, and a singleton focus ring.
    pub fn create(&mut self, window_type: WindowType) -> WidgetId {
        let rect = if window_type.is_window() {
            DEFAULT_WINDOW_RECT
        } else {
            DEFAULT_CHILD_RECT
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.focus_next[i] = idx;
            self.focus_prev[i] = idx;
            self.rect[i] = rect;
            self.min_size[i] = Size::ZERO;
            self.max_size[i] = Size::new(MAX_WIDGET_SIZE, MAX_WIDGET_SIZE);
            self.notified_rect[i] = rect;
            self.frame_strut[i] = Insets::ZERO;
            self.flags[i] = WidgetFlags::INITIAL;
            self.window_type[i] = window_type;
            self.mask[i] = None;
            self.native[i] = None;
            self.kind_data[i] = None;
            self.opaque_children[i] = None;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.focus_next.push(idx);
            self.focus_prev.push(idx);
            self.rect.push(rect);
            self.min_size.push(Size::ZERO);
            self.max_size
                .push(Size::new(MAX_WIDGET_SIZE, MAX_WIDGET_SIZE));
            self.notified_rect.push(rect);
            self.frame_strut.push(Insets::ZERO);
            self.flags.push(WidgetFlags::INITIAL);
            self.window_type.push(window_type);
            self.mask.push(None);
            self.native.push(None);
            self.kind_data.push(None);
            self.opaque_children.push(None);
            self.generation.push(0);
            idx
        };

        self.dirty.mark(idx, dirty::OPAQUE);
        if window_type.is_window() {
            self.dirty.mark(idx, dirty::FRAME_STRUT);
        }

        self.id_at(idx)
    }

    /// Frees a widget's slot.
    ///
    /// The widget is detached from its parent and unlinked from its focus
    /// ring first.
    ///
    /// # Panics
    ///
    /// Panics if the widget has children (destroy them first) or if the
    /// handle is stale.
    pub fn destroy(&mut self, id: WidgetId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy widget with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.remove_dependency(p, idx, dirty::OPAQUE);
            self.mark_opaque_at(p);
        }
        self.focus_unlink(idx);

        self.dirty.remove_key(idx);
        self.kind_data[idx as usize] = None;
        self.mask[idx as usize] = None;
        self.opaque_children[idx as usize] = None;
        self.native[idx as usize] = None;

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the number of live widgets.
    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Appends `child` as the topmost child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `parent` is `child` or one of its descendants.
    pub fn append_child(&mut self, parent: WidgetId, child: WidgetId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            !self.contains_in_subtree(c, p),
            "cannot parent a widget to itself or its descendant"
        );

        self.link_last(p, c);

        // Parent depends on child: occlusion changes flow upward.
        let _ = self.dirty.add_dependency(p, c, dirty::OPAQUE);
        self.mark_opaque_at(c);
    }

    /// Inserts `child` directly below `sibling` in the sibling order.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or
    /// `sibling` has no parent.
    pub fn insert_before(&mut self, child: WidgetId, sibling: WidgetId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        assert!(
            !self.contains_in_subtree(c, p),
            "cannot parent a widget to itself or its descendant"
        );

        self.link_before(c, s);

        let _ = self.dirty.add_dependency(p, c, dirty::OPAQUE);
        self.mark_opaque_at(c);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the widget has no parent.
    pub fn remove_from_parent(&mut self, child: WidgetId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "widget has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(p, c, dirty::OPAQUE);
        self.mark_opaque_at(p);
    }

    /// Returns the parent of a widget, if any.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        self.opt_id(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a widget, back to
    /// front.
    #[must_use]
    pub fn children(&self, id: WidgetId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over the strict ancestors of a widget, nearest
    /// first.
    #[must_use]
    pub fn ancestors(&self, id: WidgetId) -> Ancestors<'_> {
        self.validate(id);
        Ancestors::new(self, id.idx)
    }

    /// Returns the frontmost child of a widget.
    #[must_use]
    pub fn topmost_child(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        self.opt_id(self.last_child[id.idx as usize])
    }

    /// Returns the widget and all its descendants in pre-order.
    #[must_use]
    pub fn subtree(&self, id: WidgetId) -> Vec<WidgetId> {
        self.validate(id);
        subtree_preorder(self, id.idx)
            .into_iter()
            .map(|idx| self.id_at(idx))
            .collect()
    }

    /// Returns the live widgets without a parent.
    #[must_use]
    pub fn roots(&self) -> Vec<WidgetId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                roots.push(self.id_at(idx));
            }
        }
        roots
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `id` within the
    /// same window. Window boundaries stop the search.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: WidgetId, id: WidgetId) -> bool {
        self.validate(ancestor);
        self.validate(id);
        self.is_ancestor_at(ancestor.idx, id.idx)
    }

    /// Returns `true` if the widget is a window: it has no parent or its
    /// type is not [`WindowType::Widget`].
    #[must_use]
    pub fn is_window(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.is_window_at(id.idx)
    }

    /// Returns the window containing the widget (itself if it is a window).
    #[must_use]
    pub fn window(&self, id: WidgetId) -> WidgetId {
        self.validate(id);
        self.id_at(self.window_at(id.idx))
    }

    /// Returns the nearest strict ancestor that owns a native handle.
    #[must_use]
    pub fn native_parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        self.native_parent_at(id.idx).map(|idx| self.id_at(idx))
    }

    // -- Property getters --

    /// Returns the geometry in parent coordinates (screen coordinates for
    /// top-level widgets).
    #[must_use]
    pub fn rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.rect[id.idx as usize]
    }

    /// Returns the widget's rect in its own coordinates, `(0, 0, w, h)`.
    #[must_use]
    pub fn local_rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.local_rect_at(id.idx)
    }

    /// Returns the minimum size.
    #[must_use]
    pub fn min_size(&self, id: WidgetId) -> Size {
        self.validate(id);
        self.min_size[id.idx as usize]
    }

    /// Returns the maximum size.
    #[must_use]
    pub fn max_size(&self, id: WidgetId) -> Size {
        self.validate(id);
        self.max_size[id.idx as usize]
    }

    /// Returns the flags.
    #[must_use]
    pub fn flags(&self, id: WidgetId) -> WidgetFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns `true` if every flag in `flag` is set.
    #[must_use]
    pub fn test(&self, id: WidgetId, flag: WidgetFlags) -> bool {
        self.flags(id).contains(flag)
    }

    /// Returns `true` if the widget is logically visible.
    #[must_use]
    pub fn is_visible(&self, id: WidgetId) -> bool {
        self.test(id, WidgetFlags::VISIBLE)
    }

    /// Returns `true` if the widget counts as opaque for occlusion.
    #[must_use]
    pub fn is_opaque(&self, id: WidgetId) -> bool {
        self.flags(id).is_opaque()
    }

    /// Returns the window type.
    #[must_use]
    pub fn window_type(&self, id: WidgetId) -> WindowType {
        self.validate(id);
        self.window_type[id.idx as usize]
    }

    /// Returns the pixel mask, in widget coordinates.
    #[must_use]
    pub fn mask(&self, id: WidgetId) -> Option<&Region> {
        self.validate(id);
        self.mask[id.idx as usize].as_ref()
    }

    /// Returns the native handle, if the widget owns one.
    #[must_use]
    pub fn native_id(&self, id: WidgetId) -> Option<NativeId> {
        self.validate(id);
        self.native[id.idx as usize]
    }

    /// Returns the raw native handle value, or `0` for alien widgets.
    #[must_use]
    pub fn internal_id(&self, id: WidgetId) -> u64 {
        self.native_id(id).map_or(0, |n| n.0)
    }

    /// Returns the cached frame strut. Only meaningful for windows.
    #[must_use]
    pub fn cached_frame_strut(&self, id: WidgetId) -> Insets {
        self.validate(id);
        self.frame_strut[id.idx as usize]
    }

    // -- Kind data --

    /// Attaches higher-layer data to a widget, replacing any previous value.
    pub fn set_kind_data(&mut self, id: WidgetId, data: Box<dyn Any>) {
        self.validate(id);
        self.kind_data[id.idx as usize] = Some(data);
    }

    /// Returns the attached data if it has type `T`.
    #[must_use]
    pub fn kind_data<T: Any>(&self, id: WidgetId) -> Option<&T> {
        self.validate(id);
        self.kind_data[id.idx as usize]
            .as_ref()
            .and_then(|d| d.downcast_ref::<T>())
    }

    /// Returns the attached data mutably if it has type `T`.
    pub fn kind_data_mut<T: Any>(&mut self, id: WidgetId) -> Option<&mut T> {
        self.validate(id);
        self.kind_data[id.idx as usize]
            .as_mut()
            .and_then(|d| d.downcast_mut::<T>())
    }

    // -- Coordinate mapping --

    /// Maps `point` from `id`'s coordinates into `ancestor`'s.
    ///
    /// # Panics
    ///
    /// Panics if `ancestor` is neither `id` nor one of its ancestors.
    #[must_use]
    pub fn map_to(&self, id: WidgetId, ancestor: WidgetId, point: Point) -> Point {
        self.validate(id);
        self.validate(ancestor);
        point + self.offset_to_ancestor_at(id.idx, ancestor.idx)
    }

    /// Returns the widget's origin in its window's coordinates.
    #[must_use]
    pub fn map_to_window(&self, id: WidgetId) -> Vec2 {
        self.validate(id);
        self.offset_to_window_at(id.idx)
    }

    /// Maps `point` from widget coordinates to screen coordinates.
    #[must_use]
    pub fn map_to_global(&self, id: WidgetId, point: Point) -> Point {
        self.validate(id);
        let w = self.window_at(id.idx);
        point + self.offset_to_window_at(id.idx) + self.pos_at(w)
    }

    /// Returns the part of the widget not clipped away by its ancestors, in
    /// widget coordinates. Stops at the widget's window.
    #[must_use]
    pub fn clip_rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.clip_rect_at(id.idx)
    }

    // -- Crate-internal mutation --

    pub(crate) fn set_rect_at(&mut self, idx: u32, rect: Rect) {
        self.rect[idx as usize] = rect;
        self.mark_opaque_at(idx);
    }

    pub(crate) fn insert_flags_at(&mut self, idx: u32, flags: WidgetFlags) {
        self.flags[idx as usize].insert(flags);
    }

    pub(crate) fn remove_flags_at(&mut self, idx: u32, flags: WidgetFlags) {
        self.flags[idx as usize].remove(flags);
    }

    pub(crate) fn set_native_at(&mut self, idx: u32, native: Option<NativeId>) {
        self.native[idx as usize] = native;
    }

    pub(crate) fn set_mask_at(&mut self, idx: u32, mask: Option<Region>) {
        self.mask[idx as usize] = mask;
        self.mark_opaque_at(idx);
    }

    pub(crate) fn set_size_bounds_at(&mut self, idx: u32, min: Size, max: Size) {
        self.min_size[idx as usize] = min;
        self.max_size[idx as usize] = max;
    }

    /// Clamps `size` to the widget's bounds and to non-negative values.
    pub(crate) fn clamp_size_at(&self, idx: u32, size: Size) -> Size {
        let min = self.min_size[idx as usize];
        let max = self.max_size[idx as usize];
        Size::new(
            size.width.min(max.width).max(min.width).max(0.0),
            size.height.min(max.height).max(min.height).max(0.0),
        )
    }

    /// Moves `c` to the top of its parent's children. Returns `false` when it
    /// is already there or has no parent.
    pub(crate) fn raise_at(&mut self, c: u32) -> bool {
        let p = self.parent[c as usize];
        if p == INVALID || self.next_sibling[c as usize] == INVALID {
            return false;
        }
        self.unlink_from_parent(c);
        self.link_last(p, c);
        true
    }

    /// Moves `c` to the bottom of its parent's children. Returns `false`
    /// when it is already there or has no parent.
    pub(crate) fn lower_at(&mut self, c: u32) -> bool {
        let p = self.parent[c as usize];
        if p == INVALID || self.prev_sibling[c as usize] == INVALID {
            return false;
        }
        let first = self.first_child[p as usize];
        self.unlink_from_parent(c);
        self.link_before(c, first);
        true
    }

    /// Moves `c` directly below its sibling `s`. Returns `false` when the two
    /// are not siblings, are the same widget, or are already in that order.
    pub(crate) fn stack_under_at(&mut self, c: u32, s: u32) -> bool {
        let p = self.parent[c as usize];
        if c == s || p == INVALID || self.parent[s as usize] != p {
            return false;
        }
        if self.next_sibling[c as usize] == s {
            return false;
        }
        self.unlink_from_parent(c);
        self.link_before(c, s);
        true
    }

    /// Marks the widget's opaque entry and every ancestor's dirty.
    /// Marks `idx` and its ancestors for an opaque-cache rebuild and drops
    /// their entries, so reads before the next refresh recompute.
    pub(crate) fn mark_opaque_at(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::OPAQUE, &EagerPolicy);
        let mut w = idx;
        while w != INVALID {
            self.opaque_children[w as usize] = None;
            w = self.parent[w as usize];
        }
    }

    // -- Crate-internal queries --

    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> WidgetId {
        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    #[inline]
    pub(crate) fn opt_id(&self, idx: u32) -> Option<WidgetId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    #[inline]
    pub(crate) fn is_window_at(&self, idx: u32) -> bool {
        self.parent[idx as usize] == INVALID || self.window_type[idx as usize].is_window()
    }

    pub(crate) fn window_at(&self, idx: u32) -> u32 {
        let mut w = idx;
        while !self.is_window_at(w) {
            w = self.parent[w as usize];
        }
        w
    }

    pub(crate) fn native_parent_at(&self, idx: u32) -> Option<u32> {
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if self.native[p as usize].is_some() {
                return Some(p);
            }
            p = self.parent[p as usize];
        }
        None
    }

    #[inline]
    pub(crate) fn pos_at(&self, idx: u32) -> Vec2 {
        self.rect[idx as usize].origin().to_vec2()
    }

    #[inline]
    pub(crate) fn local_rect_at(&self, idx: u32) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.rect[idx as usize].size())
    }

    /// Offset of `idx`'s origin in its window's coordinates.
    pub(crate) fn offset_to_window_at(&self, idx: u32) -> Vec2 {
        let mut offset = Vec2::ZERO;
        let mut w = idx;
        while !self.is_window_at(w) {
            offset += self.pos_at(w);
            w = self.parent[w as usize];
        }
        offset
    }

    /// Offset of `idx`'s origin in `ancestor`'s coordinates.
    pub(crate) fn offset_to_ancestor_at(&self, idx: u32, ancestor: u32) -> Vec2 {
        let mut offset = Vec2::ZERO;
        let mut w = idx;
        while w != ancestor {
            assert!(
                self.parent[w as usize] != INVALID,
                "target is not an ancestor of the widget"
            );
            offset += self.pos_at(w);
            w = self.parent[w as usize];
        }
        offset
    }

    pub(crate) fn clip_rect_at(&self, idx: u32) -> Rect {
        let mut r = self.local_rect_at(idx);
        let mut offset = Vec2::ZERO;
        let mut w = idx;
        while !self.is_window_at(w) {
            offset -= self.pos_at(w);
            w = self.parent[w as usize];
            r = intersect_rects(
                r,
                Rect::from_origin_size(offset.to_point(), self.rect[w as usize].size()),
            );
        }
        if rect_is_empty(r) { Rect::ZERO } else { r }
    }

    /// Window-bounded strict ancestry test.
    pub(crate) fn is_ancestor_at(&self, ancestor: u32, idx: u32) -> bool {
        let mut w = idx;
        while !self.is_window_at(w) {
            w = self.parent[w as usize];
            if w == ancestor {
                return true;
            }
        }
        false
    }

    /// Returns `true` if `idx` lies in the subtree rooted at `root`
    /// (crossing window boundaries).
    pub(crate) fn contains_in_subtree(&self, root: u32, idx: u32) -> bool {
        let mut w = idx;
        while w != INVALID {
            if w == root {
                return true;
            }
            w = self.parent[w as usize];
        }
        false
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: WidgetId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale WidgetId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    // -- Link helpers --

    /// Appends `c` after the last child of `p` without touching dirty state.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = INVALID;
        let last = self.last_child[p as usize];
        self.prev_sibling[c as usize] = last;
        if last == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[last as usize] = c;
        }
        self.last_child[p as usize] = c;
    }

    /// Inserts `c` before `s` without touching dirty state.
    fn link_before(&mut self, c: u32, s: u32) {
        let p = self.parent[s as usize];
        let prev = self.prev_sibling[s as usize];
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = prev;
        if prev == INVALID {
            // `s` was the first child.
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[prev as usize] = c;
        }
        self.prev_sibling[s as usize] = c;
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    pub(crate) fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p as usize] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut tree = WidgetTree::new();
        let id = tree.create(WindowType::Widget);
        assert!(tree.is_alive(id));
        assert_eq!(tree.widget_count(), 1);
        tree.destroy(id);
        assert!(!tree.is_alive(id));
        assert_eq!(tree.widget_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = WidgetTree::new();
        let id1 = tree.create(WindowType::Widget);
        tree.destroy(id1);
        let id2 = tree.create(WindowType::Widget);
        assert!(!tree.is_alive(id1));
        assert!(tree.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn new_widgets_start_hidden_with_defaults() {
        let mut tree = WidgetTree::new();
        let w = tree.create(WindowType::Window);
        let c = tree.create(WindowType::Widget);
        assert_eq!(tree.flags(w), WidgetFlags::HIDDEN);
        assert_eq!(tree.rect(w), DEFAULT_WINDOW_RECT);
        assert_eq!(tree.rect(c), DEFAULT_CHILD_RECT);
        assert_eq!(tree.internal_id(c), 0, "new widgets are alien");
    }

    #[test]
    fn append_child_orders_back_to_front() {
        let mut tree = WidgetTree::new();
        let parent = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        tree.append_child(parent, a);
        tree.append_child(parent, b);

        assert_eq!(tree.parent(a), Some(parent));
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![a, b]);
        assert_eq!(tree.topmost_child(parent), Some(b));
    }

    #[test]
    fn insert_before_and_remove() {
        let mut tree = WidgetTree::new();
        let parent = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        let c = tree.create(WindowType::Widget);
        tree.append_child(parent, a);
        tree.append_child(parent, c);
        tree.insert_before(b, c);
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![a, b, c]);

        tree.remove_from_parent(c);
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(tree.topmost_child(parent), Some(b), "last_child follows removal");
        assert_eq!(tree.parent(c), None);
    }

    #[test]
    fn restacking_helpers_report_noops() {
        let mut tree = WidgetTree::new();
        let parent = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        let c = tree.create(WindowType::Widget);
        for w in [a, b, c] {
            tree.append_child(parent, w);
        }

        assert!(!tree.raise_at(c.idx), "already on top");
        assert!(tree.raise_at(a.idx));
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![b, c, a]);

        assert!(!tree.lower_at(b.idx), "already at the bottom");
        assert!(tree.lower_at(a.idx));
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![a, b, c]);

        assert!(!tree.stack_under_at(a.idx, b.idx), "already directly below");
        assert!(tree.stack_under_at(c.idx, a.idx));
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![c, a, b]);
        assert!(!tree.stack_under_at(c.idx, c.idx));
    }

    #[test]
    fn subtree_is_preorder_back_to_front() {
        let mut tree = WidgetTree::new();
        let root = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let a1 = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        tree.append_child(root, a);
        tree.append_child(a, a1);
        tree.append_child(root, b);
        assert_eq!(tree.subtree(root), vec![root, a, a1, b]);
    }

    #[test]
    fn mapping_accumulates_positions_up_to_window() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        tree.append_child(win, a);
        tree.append_child(a, b);
        tree.set_rect_at(win.idx, Rect::new(100.0, 100.0, 500.0, 400.0));
        tree.set_rect_at(a.idx, Rect::new(10.0, 20.0, 110.0, 120.0));
        tree.set_rect_at(b.idx, Rect::new(5.0, 5.0, 25.0, 25.0));

        assert_eq!(tree.map_to_window(b), Vec2::new(15.0, 25.0));
        assert_eq!(tree.map_to(b, a, Point::new(1.0, 1.0)), Point::new(6.0, 6.0));
        assert_eq!(
            tree.map_to_global(b, Point::ORIGIN),
            Point::new(115.0, 125.0)
        );
        assert_eq!(tree.window(b), win);
        assert!(tree.is_ancestor_of(win, b));
        assert!(!tree.is_ancestor_of(b, win));
    }

    #[test]
    fn clip_rect_is_limited_by_ancestors() {
        let mut tree = WidgetTree::new();
        let win = tree.create(WindowType::Window);
        let a = tree.create(WindowType::Widget);
        let b = tree.create(WindowType::Widget);
        tree.append_child(win, a);
        tree.append_child(a, b);
        tree.set_rect_at(win.idx, Rect::new(0.0, 0.0, 200.0, 200.0));
        tree.set_rect_at(a.idx, Rect::new(150.0, 0.0, 250.0, 100.0));
        tree.set_rect_at(b.idx, Rect::new(20.0, 20.0, 80.0, 80.0));

        // `a` is cut at x = 200 in window space, i.e. x = 50 in `a`, x = 30 in `b`.
        assert_eq!(tree.clip_rect(a), Rect::new(0.0, 0.0, 50.0, 100.0));
        assert_eq!(tree.clip_rect(b), Rect::new(0.0, 0.0, 30.0, 60.0));
    }

    #[test]
    fn clamp_size_honors_bounds() {
        let mut tree = WidgetTree::new();
        let w = tree.create(WindowType::Widget);
        tree.set_size_bounds_at(w.idx, Size::new(10.0, 10.0), Size::new(50.0, 40.0));
        assert_eq!(
            tree.clamp_size_at(w.idx, Size::new(5.0, 100.0)),
            Size::new(10.0, 40.0)
        );
    }

    #[test]
    fn kind_data_downcasts() {
        let mut tree = WidgetTree::new();
        let w = tree.create(WindowType::Widget);
        tree.set_kind_data(w, Box::new(42_u32));
        assert_eq!(tree.kind_data::<u32>(w), Some(&42));
        assert_eq!(tree.kind_data::<i64>(w), None);
        if let Some(v) = tree.kind_data_mut::<u32>(w) {
            *v = 7;
        }
        assert_eq!(tree.kind_data::<u32>(w), Some(&7));
    }

    #[test]
    #[should_panic(expected = "cannot destroy widget with children")]
    fn destroy_with_children_panics() {
        let mut tree = WidgetTree::new();
        let parent = tree.create(WindowType::Window);
        let child = tree.create(WindowType::Widget);
        tree.append_child(parent, child);
        tree.destroy(parent);
    }

    #[test]
    #[should_panic(expected = "cannot parent a widget to itself or its descendant")]
    fn append_to_descendant_panics() {
        let mut tree = WidgetTree::new();
        let a = tree.create(WindowType::Window);
        let b = tree.create(WindowType::Widget);
        tree.append_child(a, b);
        tree.remove_from_parent(b);
        tree.append_child(a, b);
        let c = tree.create(WindowType::Widget);
        tree.append_child(b, c);
        tree.remove_from_parent(b);
        tree.append_child(c, b);
    }

    #[test]
    #[should_panic(expected = "stale WidgetId")]
    fn destroyed_handle_panics_on_rect() {
        let mut tree = WidgetTree::new();
        let id = tree.create(WindowType::Widget);
        tree.destroy(id);
        let _ = tree.rect(id);
    }

    #[test]
    #[should_panic(expected = "stale WidgetId")]
    fn destroyed_handle_panics_on_parent() {
        let mut tree = WidgetTree::new();
        let id = tree.create(WindowType::Widget);
        tree.destroy(id);
        let _ = tree.parent(id);
    }
}
