// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-window dirty tracking, painting, and presentation.
//!
//! Every top-level window that has been created owns one [`BackingStore`].
//! Invalidation accumulates in two places:
//!
//! - the **composite** dirty region (window coordinates), repainted from the
//!   window root with every widget that intersects it;
//! - the **dirty-widget list**, per-widget regions in widget coordinates that
//!   may be painted directly when the widget is opaque and nothing above it
//!   overlaps.
//!
//! A sync culls each widget's region by occlusion, paints back to front
//! through the [`Rasterizer`], and flushes the painted area to the native
//! handles that show it.
//!
//! ```text
//! mark_dirty ──► dirty widgets ──┐
//!            └─► composite ──────┼─► sync ──► draw_widget ──► flush ──► present
//!                                │             (rasterizer)
//! mark_dirty_on_screen ──────────┘
//! ```

use alloc::vec::Vec;
use core::mem;

use bitflags::bitflags;
use kurbo::{Rect, Size, Vec2};

use crate::backend::WindowBackend;
use crate::error::CompositorError;
use crate::paint::{PaintContext, PaintRequest, Rasterizer};
use crate::region::Region;
use crate::trace::{
    PaintEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PresentEvent, SyncBeginEvent,
    SyncEndEvent, SyncSummaryBuilder, Tracer,
};
use crate::widget::traverse::subtree_preorder;
use crate::widget::{INVALID, NativeId, WidgetFlags, WidgetId, WidgetTree};

bitflags! {
    /// How [`BackingStore::draw_widget`] treats a widget and its children.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct DrawFlags: u8 {
        /// The widget is the root of this paint: clip to its clip rect,
        /// always fill its background, and skip on-screen marking.
        const AS_ROOT = 1 << 0;
        /// Paint children after the widget.
        const RECURSIVE = 1 << 1;
        /// Skip opaque children; they are painted separately.
        const DONT_DRAW_OPAQUE_CHILDREN = 1 << 2;
        /// Paint the widget under its opaque children too.
        const DONT_SUBTRACT_OPAQUE_CHILDREN = 1 << 3;
    }
}

/// What the caller must do after a mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UpdateRequest {
    /// Nothing; an update is already queued or the mark was dropped.
    None,
    /// Queue one update request for the window.
    Post,
    /// Sync the window now.
    Immediate,
}

/// Everything a sync borrows from the compositor.
pub(crate) struct PaintEnv<'a, 't, B: ?Sized, R: ?Sized> {
    pub(crate) tree: &'a mut WidgetTree,
    pub(crate) backend: &'a mut B,
    pub(crate) rasterizer: &'a mut R,
    pub(crate) requests: &'a mut Vec<PaintRequest>,
    pub(crate) tracer: &'a mut Tracer<'t>,
    pub(crate) sync_index: u64,
    /// A synchronous repaint is running; bypasses the wait for the first map.
    pub(crate) in_repaint: bool,
    pub(crate) summary: Option<SyncSummaryBuilder>,
}

/// Dirty state and paint driver for one top-level window.
#[derive(Clone, Debug)]
pub struct BackingStore {
    window: WidgetId,
    /// Composite region, window coordinates.
    dirty: Region,
    /// Widgets with pending local regions, in mark order.
    dirty_widgets: Vec<(WidgetId, Region)>,
    /// Painted but not yet presented on the window handle, window
    /// coordinates.
    dirty_on_screen: Region,
    /// Painted but not yet presented on a native child, in that child's
    /// coordinates.
    needs_flush: Vec<(WidgetId, Region)>,
    /// Window size at the last sync.
    surface_size: Size,
    flushing: bool,
    in_top_level_resize: bool,
    full_update_pending: bool,
    update_posted: bool,
    /// Regions collapse to their bounds past this many rectangles.
    max_rects: usize,
}

impl BackingStore {
    pub(crate) fn new(window: WidgetId, max_rects: usize) -> Self {
        Self {
            window,
            dirty: Region::new(),
            dirty_widgets: Vec::new(),
            dirty_on_screen: Region::new(),
            needs_flush: Vec::new(),
            surface_size: Size::ZERO,
            flushing: false,
            in_top_level_resize: false,
            full_update_pending: false,
            update_posted: false,
            max_rects,
        }
    }

    /// Returns the window this store paints.
    #[must_use]
    pub fn window(&self) -> WidgetId {
        self.window
    }

    /// Returns the composite dirty region in window coordinates.
    #[must_use]
    pub fn dirty_region(&self) -> &Region {
        &self.dirty
    }

    /// Returns the pending region of `widget` in the dirty-widget list.
    #[must_use]
    pub fn widget_dirty_region(&self, widget: WidgetId) -> Option<&Region> {
        self.dirty_widgets
            .iter()
            .find(|(w, _)| *w == widget)
            .map(|(_, r)| r)
    }

    /// Returns the number of widgets in the dirty-widget list.
    #[must_use]
    pub fn dirty_widget_count(&self) -> usize {
        self.dirty_widgets.len()
    }

    /// Returns `true` if anything waits to be painted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty() || !self.dirty_widgets.is_empty() || self.full_update_pending
    }

    /// Returns the painted area not yet presented on the window handle.
    #[must_use]
    pub fn dirty_on_screen(&self) -> &Region {
        &self.dirty_on_screen
    }

    /// Returns `true` while a sync is painting.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Returns `true` while bookkeeping is suspended for an interactive
    /// resize.
    #[must_use]
    pub fn in_top_level_resize(&self) -> bool {
        self.in_top_level_resize
    }

    /// Returns `true` if an update request is queued for this window.
    #[must_use]
    pub fn update_posted(&self) -> bool {
        self.update_posted
    }

    pub(crate) fn clear_update_posted(&mut self) {
        self.update_posted = false;
    }

    // -----------------------------------------------------------------------
    // Marking
    // -----------------------------------------------------------------------

    /// Records `region` (widget coordinates) of `widget` as needing repaint.
    ///
    /// Visibility and closing-down checks are the caller's.
    pub(crate) fn mark_dirty(
        &mut self,
        tree: &WidgetTree,
        widget: WidgetId,
        region: &Region,
        immediate: bool,
        invalidate_buffer: bool,
        tracer: &mut Tracer<'_>,
    ) -> UpdateRequest {
        if self.in_top_level_resize || region.is_empty() {
            return UpdateRequest::None;
        }
        if self.full_update_pending {
            return self.request(immediate);
        }

        let idx = widget.idx;
        let offset = tree.offset_to_window_at(idx);

        #[cfg(feature = "trace-rich")]
        tracer.dirty_mark(&crate::trace::DirtyMarkEvent {
            widget,
            bounds: crate::trace::DamageRect::from_rect(region.bounding_rect() + offset),
            invalidate_buffer,
            immediate,
        });
        #[cfg(not(feature = "trace-rich"))]
        let _ = tracer;

        let widget_rect = tree.effective_rect_at(idx) - tree.pos_at(idx);
        if self.dirty.contains_rect(widget_rect + offset) {
            // Already covered by the composite region.
            return if immediate {
                UpdateRequest::Immediate
            } else {
                UpdateRequest::None
            };
        }

        if invalidate_buffer {
            self.dirty.union(&region.translated(offset));
            self.dirty.simplify(self.max_rects);
            return self.request(immediate);
        }

        if let Some((_, pending)) = self.dirty_widgets.iter_mut().find(|(w, _)| *w == widget) {
            if !pending.contains_rect(widget_rect) {
                pending.union(region);
                pending.simplify(self.max_rects);
            }
        } else {
            self.dirty_widgets.push((widget, region.clone()));
        }
        self.request(immediate)
    }

    fn request(&mut self, immediate: bool) -> UpdateRequest {
        if immediate {
            UpdateRequest::Immediate
        } else if self.update_posted {
            UpdateRequest::None
        } else {
            self.update_posted = true;
            UpdateRequest::Post
        }
    }

    /// Records `region` (widget coordinates) of `widget` as painted but not
    /// yet presented. `window_offset` is the widget's origin in the window.
    pub(crate) fn mark_dirty_on_screen(
        &mut self,
        tree: &WidgetTree,
        region: &Region,
        widget: WidgetId,
        window_offset: Vec2,
    ) {
        if region.is_empty() {
            return;
        }
        let idx = widget.idx;
        if widget == self.window {
            self.dirty_on_screen.union(region);
            return;
        }

        if tree.native[idx as usize].is_none() && !tree.is_window_at(idx) {
            let Some(native_parent) = tree.native_parent_at(idx) else {
                return;
            };
            if native_parent == self.window.idx {
                self.dirty_on_screen.union(&region.translated(window_offset));
                return;
            }
            let offset = tree.offset_to_ancestor_at(idx, native_parent);
            self.add_needs_flush(tree.id_at(native_parent), region.translated(offset));
            return;
        }

        self.add_needs_flush(widget, region.clone());
    }

    fn add_needs_flush(&mut self, widget: WidgetId, region: Region) {
        if let Some((_, pending)) = self.needs_flush.iter_mut().find(|(w, _)| *w == widget) {
            pending.union(&region);
        } else {
            self.needs_flush.push((widget, region));
        }
    }

    /// Drops the pending entries of `root` and its whole subtree.
    pub(crate) fn remove_dirty_widget(&mut self, tree: &WidgetTree, root: u32) {
        let subtree = subtree_preorder(tree, root);
        let in_subtree = |w: &WidgetId| subtree.contains(&w.idx);
        self.dirty_widgets.retain(|(w, _)| !in_subtree(w));
        self.needs_flush.retain(|(w, _)| !in_subtree(w));
    }

    /// Shifts the pending region of `widget` by `delta` and clips it to
    /// `clip` (widget coordinates).
    pub(crate) fn translate_widget_dirty(&mut self, widget: WidgetId, delta: Vec2, clip: Rect) {
        if let Some((_, pending)) = self.dirty_widgets.iter_mut().find(|(w, _)| *w == widget) {
            pending.translate(delta);
            pending.intersect_rect(clip);
        }
    }

    /// Clears all dirty state. An invisible window repaints fully when shown.
    pub(crate) fn discard(&mut self) {
        self.dirty.clear();
        self.dirty_widgets.clear();
        self.full_update_pending = false;
    }

    /// Schedules a full repaint on the next sync.
    pub(crate) fn request_full_update(&mut self) -> UpdateRequest {
        self.full_update_pending = true;
        self.request(false)
    }

    /// Suspends bookkeeping until [`end_resize`](Self::end_resize).
    pub(crate) fn begin_resize(&mut self) {
        self.in_top_level_resize = true;
    }

    /// Resumes bookkeeping and schedules a full repaint.
    pub(crate) fn end_resize(&mut self) -> UpdateRequest {
        if !mem::replace(&mut self.in_top_level_resize, false) {
            return UpdateRequest::None;
        }
        self.request_full_update()
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Paints everything dirty and presents it. Returns `false` when the
    /// window cannot paint yet (unmapped, waiting for its map, updates
    /// disabled) or is hidden.
    ///
    /// # Errors
    ///
    /// [`CompositorError::RecursiveRepaint`] if a sync of this window is
    /// already painting.
    pub(crate) fn sync<B, R>(&mut self, env: &mut PaintEnv<'_, '_, B, R>) -> Result<bool, CompositorError>
    where
        B: WindowBackend + ?Sized,
        R: Rasterizer + ?Sized,
    {
        if self.flushing {
            return Err(CompositorError::RecursiveRepaint(self.window));
        }
        let w = self.window.idx;
        let flags = env.tree.flags[w as usize];
        if !flags.contains(WidgetFlags::VISIBLE) {
            self.discard();
            return Ok(false);
        }
        if !flags.contains(WidgetFlags::MAPPED)
            || (flags.contains(WidgetFlags::WAITING_FOR_MAP) && !env.in_repaint)
            || flags.contains(WidgetFlags::UPDATES_DISABLED)
        {
            // Keep the dirty state; it is served once the window maps.
            return Ok(false);
        }

        env.tree.refresh_opaque_cache();

        #[expect(
            clippy::cast_possible_truncation,
            reason = "dirty lists and regions stay far below u32::MAX entries"
        )]
        let begin = SyncBeginEvent {
            sync_index: env.sync_index,
            window: self.window,
            dirty_widgets: self.dirty_widgets.len() as u32,
            dirty_rects: self.dirty.rect_count() as u32,
        };
        env.tracer.sync_begin(&begin);
        env.summary = Some(SyncSummaryBuilder::new(&begin));

        let window_size = env.tree.rect[w as usize].size();
        let repaint_all =
            self.full_update_pending || self.in_top_level_resize || self.surface_size != window_size;
        if repaint_all {
            self.dirty = Region::from_rect(env.tree.local_rect_at(w));
            self.dirty_widgets.clear();
        }
        self.surface_size = window_size;
        self.full_update_pending = false;
        if let Some(summary) = env.summary.as_mut() {
            summary.set_full_repaint(repaint_all);
        }

        // Cull.
        env.tracer.phase_begin(&PhaseBeginEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Sync,
        });
        let mut to_clean = self.dirty.clone();
        let mut direct: Vec<(WidgetId, Region)> = Vec::new();
        for (widget, mut region) in mem::take(&mut self.dirty_widgets) {
            let tree = &*env.tree;
            if !tree.is_alive(widget) {
                continue;
            }
            let idx = widget.idx;
            region.intersect_rect(tree.clip_rect_at(idx));
            if let Some(mask) = &tree.mask[idx as usize] {
                region.intersect(mask);
            }
            let overlapped = tree.subtract_opaque_siblings_at(idx, &mut region);
            tree.subtract_opaque_children_at(idx, &mut region);
            if region.is_empty() {
                continue;
            }

            let in_window = region.translated(tree.offset_to_window_at(idx));
            to_clean.union(&in_window);
            if !overlapped
                && tree.flags[idx as usize].is_opaque()
                && !self.dirty.intersects_rect(in_window.bounding_rect())
            {
                direct.push((widget, region));
            } else {
                self.dirty.union(&in_window);
            }
        }
        self.dirty.simplify(self.max_rects);
        env.tracer.phase_end(&PhaseEndEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Sync,
        });

        if to_clean.is_empty() {
            // Exposed areas may still be waiting.
            self.flush(env);
            self.end_sync(env, 0.0);
            return Ok(true);
        }

        self.dirty_on_screen.union(&to_clean);
        let composite = mem::take(&mut self.dirty);

        // Paint.
        env.tracer.phase_begin(&PhaseBeginEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Paint,
        });
        self.flushing = true;
        for (widget, region) in direct {
            let idx = widget.idx;
            let mut flags = DrawFlags::RECURSIVE | DrawFlags::DONT_DRAW_OPAQUE_CHILDREN;
            if idx == w {
                flags |= DrawFlags::AS_ROOT;
            }
            let offset = env.tree.offset_to_window_at(idx);
            self.draw_widget(env, idx, &region, offset, flags);
        }
        if repaint_all || !composite.is_empty() {
            self.draw_widget(
                env,
                w,
                &composite,
                Vec2::ZERO,
                DrawFlags::AS_ROOT | DrawFlags::RECURSIVE,
            );
        }
        self.flushing = false;
        env.tracer.phase_end(&PhaseEndEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Paint,
        });

        #[cfg(feature = "trace-rich")]
        {
            let rects: Vec<crate::trace::DamageRect> = to_clean
                .rects()
                .iter()
                .map(|r| crate::trace::DamageRect::from_rect(*r))
                .collect();
            env.tracer.damage_rects(env.sync_index, &rects);
        }

        self.flush(env);
        self.end_sync(env, to_clean.area());
        Ok(true)
    }

    fn end_sync<B: ?Sized, R: ?Sized>(&mut self, env: &mut PaintEnv<'_, '_, B, R>, cleaned_area: f64) {
        let Some(summary) = env.summary.take() else {
            return;
        };
        let summary = summary.finish();
        env.tracer.sync_end(&SyncEndEvent {
            sync_index: env.sync_index,
            window: self.window,
            painted_widgets: summary.painted_widgets,
            cleaned_area,
        });
        env.tracer.sync_summary(&summary);
    }

    /// Handles an expose of `region` (widget coordinates) on the native
    /// widget `widget`.
    pub(crate) fn sync_exposed<B, R>(
        &mut self,
        env: &mut PaintEnv<'_, '_, B, R>,
        widget: WidgetId,
        region: &Region,
    ) -> Result<(), CompositorError>
    where
        B: WindowBackend + ?Sized,
        R: Rasterizer + ?Sized,
    {
        let tree = &*env.tree;
        if !tree.flags[self.window.idx as usize].contains(WidgetFlags::VISIBLE)
            || self.in_top_level_resize
        {
            return Ok(());
        }
        let idx = widget.idx;
        let flags = tree.flags[idx as usize];
        let Some(handle) = tree.native[idx as usize] else {
            return Ok(());
        };
        if !flags.contains(WidgetFlags::VISIBLE)
            || flags.contains(WidgetFlags::UPDATES_DISABLED)
            || region.is_empty()
        {
            return Ok(());
        }

        if !self.is_dirty() {
            self.present(env, handle, region);
            return Ok(());
        }

        let offset = if widget == self.window {
            Vec2::ZERO
        } else {
            tree.offset_to_window_at(idx)
        };
        self.mark_dirty_on_screen(tree, region, widget, offset);
        self.sync(env)?;
        Ok(())
    }

    /// Presents everything painted since the last flush.
    pub(crate) fn flush<B, R>(&mut self, env: &mut PaintEnv<'_, '_, B, R>)
    where
        B: WindowBackend + ?Sized,
        R: ?Sized,
    {
        env.tracer.phase_begin(&PhaseBeginEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Flush,
        });
        if !self.dirty_on_screen.is_empty() {
            let region = mem::take(&mut self.dirty_on_screen);
            if let Some(handle) = env.tree.native[self.window.idx as usize] {
                self.present(env, handle, &region);
            }
        }
        for (widget, region) in mem::take(&mut self.needs_flush) {
            if !env.tree.is_alive(widget) || region.is_empty() {
                continue;
            }
            if let Some(handle) = env.tree.native[widget.idx as usize] {
                self.present(env, handle, &region);
            }
        }
        env.tracer.phase_end(&PhaseEndEvent {
            sync_index: env.sync_index,
            phase: PhaseKind::Flush,
        });
    }

    fn present<B, R>(&self, env: &mut PaintEnv<'_, '_, B, R>, handle: NativeId, region: &Region)
    where
        B: WindowBackend + ?Sized,
        R: ?Sized,
    {
        env.backend.present(handle, region);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "regions stay far below u32::MAX rectangles"
        )]
        let e = PresentEvent {
            sync_index: env.sync_index,
            handle,
            rect_count: region.rect_count() as u32,
        };
        env.tracer.present(&e);
        if let Some(summary) = env.summary.as_mut() {
            summary.present(&e);
        }
    }

    // -----------------------------------------------------------------------
    // Painting
    // -----------------------------------------------------------------------

    /// Paints `region` (widget coordinates) of `idx`, whose origin sits at
    /// `offset` in the window, then its children when recursive.
    pub(crate) fn draw_widget<B, R>(
        &mut self,
        env: &mut PaintEnv<'_, '_, B, R>,
        idx: u32,
        region: &Region,
        offset: Vec2,
        flags: DrawFlags,
    ) where
        B: WindowBackend + ?Sized,
        R: Rasterizer + ?Sized,
    {
        if region.is_empty() {
            return;
        }
        let as_root = flags.contains(DrawFlags::AS_ROOT);
        let id = env.tree.id_at(idx);

        let mut to_paint = region.clone();
        if as_root {
            to_paint.intersect_rect(env.tree.clip_rect_at(idx));
        }
        if !flags.contains(DrawFlags::DONT_SUBTRACT_OPAQUE_CHILDREN) {
            env.tree.subtract_opaque_children_at(idx, &mut to_paint);
        }

        if !to_paint.is_empty() {
            let wflags = env.tree.flags[idx as usize];
            let background = (as_root || wflags.contains(WidgetFlags::AUTO_FILL_BACKGROUND))
                && !wflags
                    .intersects(WidgetFlags::OPAQUE_PAINT | WidgetFlags::NO_SYSTEM_BACKGROUND);

            env.tree.insert_flags_at(idx, WidgetFlags::IN_PAINT);
            if background {
                env.rasterizer.paint_background(id, &to_paint, offset);
            }
            {
                let mut ctx = PaintContext::new(&*env.tree, id, env.requests);
                env.rasterizer.paint(id, &to_paint, offset, &mut ctx);
            }
            env.tree.remove_flags_at(idx, WidgetFlags::IN_PAINT);

            #[expect(
                clippy::cast_possible_truncation,
                reason = "regions stay far below u32::MAX rectangles"
            )]
            let e = PaintEvent {
                sync_index: env.sync_index,
                widget: id,
                rect_count: to_paint.rect_count() as u32,
                area: to_paint.area(),
                background,
            };
            env.tracer.paint(&e);
            if let Some(summary) = env.summary.as_mut() {
                summary.paint(&e);
            }

            let tree = &*env.tree;
            let on_screen = tree.native[idx as usize].is_some()
                || tree
                    .native_parent_at(idx)
                    .is_some_and(|p| !tree.is_window_at(p));
            if !as_root && on_screen {
                self.mark_dirty_on_screen(tree, &to_paint, id, offset);
            }
        }

        if flags.contains(DrawFlags::RECURSIVE) && env.tree.first_child[idx as usize] != INVALID {
            self.paint_siblings(env, idx, region, offset, flags - DrawFlags::AS_ROOT);
        }
    }

    /// Paints the children of `parent` over `region` (parent coordinates),
    /// back to front. A lower child is painted only where no opaque child
    /// above it covers.
    fn paint_siblings<B, R>(
        &mut self,
        env: &mut PaintEnv<'_, '_, B, R>,
        parent: u32,
        region: &Region,
        offset: Vec2,
        flags: DrawFlags,
    ) where
        B: WindowBackend + ?Sized,
        R: Rasterizer + ?Sized,
    {
        let skip_opaque = flags.contains(DrawFlags::DONT_DRAW_OPAQUE_CHILDREN);

        // Walk top-down collecting what each child may paint, then paint
        // bottom-up.
        let mut stack: Vec<(u32, Region)> = Vec::new();
        {
            let tree = &*env.tree;
            let mut remaining = region.clone();
            let mut c = tree.last_child[parent as usize];
            while c != INVALID && !remaining.is_empty() {
                let cflags = tree.flags[c as usize];
                let eligible = cflags.contains(WidgetFlags::VISIBLE)
                    && !tree.window_type[c as usize].is_window()
                    && !(skip_opaque && cflags.is_opaque());
                if eligible {
                    let effective = tree.effective_rect_at(c);
                    if remaining.intersects_rect(effective) {
                        let mut child_region = remaining.clone();
                        child_region.intersect_rect(effective);
                        if cflags.is_opaque() {
                            match &tree.mask[c as usize] {
                                Some(mask) => remaining.subtract(&mask.translated(tree.pos_at(c))),
                                None => remaining.subtract_rect(tree.rect[c as usize]),
                            }
                        }
                        stack.push((c, child_region));
                    }
                }
                c = tree.prev_sibling[c as usize];
            }
        }

        for (c, mut child_region) in stack.into_iter().rev() {
            if env.tree.flags[c as usize].contains(WidgetFlags::UPDATES_DISABLED) {
                continue;
            }
            let pos = env.tree.pos_at(c);
            child_region.translate(-pos);
            if let Some(mask) = &env.tree.mask[c as usize] {
                child_region.intersect(mask);
            }
            self.draw_widget(env, c, &child_region, offset + pos, flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend, RecordingRasterizer};
    use crate::widget::WindowType;

    struct Fixture {
        tree: WidgetTree,
        backend: RecordingBackend,
        raster: RecordingRasterizer,
        requests: Vec<PaintRequest>,
        window: WidgetId,
        store: BackingStore,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tree = WidgetTree::new();
            let window = tree.create(WindowType::Window);
            tree.set_rect_at(window.idx, Rect::new(0.0, 0.0, 200.0, 100.0));
            tree.set_native_at(window.idx, Some(NativeId(1)));
            tree.insert_flags_at(
                window.idx,
                WidgetFlags::CREATED | WidgetFlags::VISIBLE | WidgetFlags::MAPPED,
            );
            tree.remove_flags_at(window.idx, WidgetFlags::HIDDEN);
            let mut store = BackingStore::new(window, 32);
            store.surface_size = Size::new(200.0, 100.0);
            Self {
                tree,
                backend: RecordingBackend::new(),
                raster: RecordingRasterizer::default(),
                requests: Vec::new(),
                window,
                store,
            }
        }

        fn child(&mut self, parent: WidgetId, rect: Rect, flags: WidgetFlags) -> WidgetId {
            let c = self.tree.create(WindowType::Widget);
            self.tree.append_child(parent, c);
            self.tree.set_rect_at(c.idx, rect);
            self.tree.remove_flags_at(c.idx, WidgetFlags::HIDDEN);
            self.tree
                .insert_flags_at(c.idx, WidgetFlags::CREATED | WidgetFlags::VISIBLE | flags);
            c
        }

        fn mark(&mut self, widget: WidgetId, rect: Rect) -> UpdateRequest {
            let mut tracer = Tracer::none();
            self.store.mark_dirty(
                &self.tree,
                widget,
                &Region::from_rect(rect),
                false,
                false,
                &mut tracer,
            )
        }

        fn invalidate(&mut self, widget: WidgetId, rect: Rect) -> UpdateRequest {
            let mut tracer = Tracer::none();
            self.store.mark_dirty(
                &self.tree,
                widget,
                &Region::from_rect(rect),
                false,
                true,
                &mut tracer,
            )
        }

        fn sync(&mut self) -> Result<bool, CompositorError> {
            let mut tracer = Tracer::none();
            let mut env = PaintEnv {
                tree: &mut self.tree,
                backend: &mut self.backend,
                rasterizer: &mut self.raster,
                requests: &mut self.requests,
                tracer: &mut tracer,
                sync_index: 0,
                in_repaint: false,
                summary: None,
            };
            self.store.sync(&mut env)
        }
    }

    #[test]
    fn first_mark_posts_one_request() {
        let mut f = Fixture::new();
        let w = f.window;
        assert_eq!(f.mark(w, Rect::new(0.0, 0.0, 10.0, 10.0)), UpdateRequest::Post);
        assert_eq!(f.mark(w, Rect::new(20.0, 0.0, 30.0, 10.0)), UpdateRequest::None);
        assert_eq!(f.store.dirty_widget_count(), 1);
        let pending = f.store.widget_dirty_region(w).unwrap();
        assert_eq!(pending.area(), 200.0, "marks on one widget are unioned");
    }

    #[test]
    fn marks_covered_by_composite_are_dropped() {
        let mut f = Fixture::new();
        let c = f.child(f.window, Rect::new(10.0, 10.0, 50.0, 50.0), WidgetFlags::empty());
        f.invalidate(f.window, Rect::new(0.0, 0.0, 100.0, 100.0));
        f.mark(c, Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(f.store.dirty_widget_count(), 0);
    }

    #[test]
    fn sync_paints_union_and_presents_once() {
        let mut f = Fixture::new();
        let c = f.child(f.window, Rect::new(10.0, 10.0, 60.0, 60.0), WidgetFlags::empty());
        for i in 0..4 {
            let x = f64::from(i) * 10.0;
            f.mark(c, Rect::new(x, 0.0, x + 10.0, 10.0));
        }
        f.sync().unwrap();

        let presents: Vec<_> = f
            .backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Present(..)))
            .collect();
        assert_eq!(presents.len(), 1, "one flush per sync");
        let Call::Present(handle, region) = presents[0] else {
            unreachable!()
        };
        assert_eq!(*handle, NativeId(1));
        assert_eq!(
            *region,
            Region::from_rect(Rect::new(10.0, 10.0, 50.0, 20.0)),
            "presented region is the union of the marks"
        );
        assert!(!f.store.is_dirty());
    }

    #[test]
    fn opaque_unoverlapped_widget_paints_directly() {
        let mut f = Fixture::new();
        let c = f.child(f.window, Rect::new(10.0, 10.0, 60.0, 60.0), WidgetFlags::OPAQUE_PAINT);
        f.mark(c, Rect::new(0.0, 0.0, 10.0, 10.0));
        f.sync().unwrap();
        let painted: Vec<_> = f.raster.painted.iter().map(|p| p.widget).collect();
        assert_eq!(painted, vec![c], "the window root is not repainted");
        assert_eq!(f.raster.painted[0].offset, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn overlapped_widget_repaints_from_root() {
        let mut f = Fixture::new();
        let a = f.child(f.window, Rect::new(0.0, 0.0, 50.0, 50.0), WidgetFlags::OPAQUE_PAINT);
        let b = f.child(f.window, Rect::new(40.0, 40.0, 80.0, 80.0), WidgetFlags::empty());
        f.mark(a, Rect::new(0.0, 0.0, 50.0, 50.0));
        f.sync().unwrap();
        let painted: Vec<_> = f.raster.painted.iter().map(|p| p.widget).collect();
        assert_eq!(painted, vec![a, b], "transparent sibling above forces composition");
    }

    #[test]
    fn lower_sibling_is_clipped_by_opaque_upper_sibling() {
        let mut f = Fixture::new();
        let b = f.child(f.window, Rect::new(0.0, 0.0, 100.0, 100.0), WidgetFlags::empty());
        let c = f.child(f.window, Rect::new(0.0, 0.0, 50.0, 100.0), WidgetFlags::OPAQUE_PAINT);
        f.invalidate(f.window, Rect::new(0.0, 0.0, 200.0, 100.0));
        f.sync().unwrap();

        let b_paint = f.raster.painted.iter().find(|p| p.widget == b).unwrap();
        assert_eq!(
            b_paint.region,
            Region::from_rect(Rect::new(50.0, 0.0, 100.0, 100.0)),
            "B paints only where C does not cover"
        );
        let order: Vec<_> = f.raster.painted.iter().map(|p| p.widget).collect();
        assert_eq!(order, vec![f.window, b, c], "back to front");
    }

    #[test]
    fn invisible_window_discards_dirty_state() {
        let mut f = Fixture::new();
        let w = f.window;
        f.mark(w, Rect::new(0.0, 0.0, 10.0, 10.0));
        f.tree.remove_flags_at(w.idx, WidgetFlags::VISIBLE);
        f.sync().unwrap();
        assert!(!f.store.is_dirty());
        assert!(f.raster.painted.is_empty());
    }

    #[test]
    fn waiting_for_map_defers_sync() {
        let mut f = Fixture::new();
        let w = f.window;
        f.tree.insert_flags_at(w.idx, WidgetFlags::WAITING_FOR_MAP);
        f.mark(w, Rect::new(0.0, 0.0, 10.0, 10.0));
        f.sync().unwrap();
        assert!(f.store.is_dirty(), "dirty state survives until the map");
        assert!(f.raster.painted.is_empty());
    }

    #[test]
    fn surface_size_change_repaints_everything() {
        let mut f = Fixture::new();
        let w = f.window;
        f.tree.set_rect_at(w.idx, Rect::new(0.0, 0.0, 300.0, 100.0));
        f.mark(w, Rect::new(0.0, 0.0, 1.0, 1.0));
        f.sync().unwrap();
        assert_eq!(
            f.raster.painted[0].region,
            Region::from_rect(Rect::new(0.0, 0.0, 300.0, 100.0))
        );
    }

    #[test]
    fn resize_suspends_marks_until_the_end() {
        let mut f = Fixture::new();
        let w = f.window;
        f.store.begin_resize();
        assert_eq!(f.mark(w, Rect::new(0.0, 0.0, 10.0, 10.0)), UpdateRequest::None);
        assert!(!f.store.is_dirty());
        assert_eq!(f.store.end_resize(), UpdateRequest::Post);
        assert!(f.store.is_dirty(), "a full repaint follows the resize");
        assert_eq!(f.store.end_resize(), UpdateRequest::None);
    }

    #[test]
    fn native_child_is_flushed_on_its_own_handle() {
        let mut f = Fixture::new();
        let c = f.child(f.window, Rect::new(10.0, 10.0, 60.0, 60.0), WidgetFlags::empty());
        f.tree.set_native_at(c.idx, Some(NativeId(2)));
        f.mark(c, Rect::new(0.0, 0.0, 10.0, 10.0));
        f.sync().unwrap();
        assert!(f.backend.calls.iter().any(|call| matches!(
            call,
            Call::Present(NativeId(2), r) if *r == Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
        )));
    }

    #[test]
    fn remove_dirty_widget_drops_the_subtree() {
        let mut f = Fixture::new();
        let a = f.child(f.window, Rect::new(0.0, 0.0, 50.0, 50.0), WidgetFlags::empty());
        let b = f.child(a, Rect::new(0.0, 0.0, 10.0, 10.0), WidgetFlags::empty());
        f.mark(b, Rect::new(0.0, 0.0, 5.0, 5.0));
        f.mark(f.window, Rect::new(100.0, 0.0, 110.0, 10.0));
        f.store.remove_dirty_widget(&f.tree, a.idx);
        assert_eq!(f.store.dirty_widget_count(), 1);
        assert!(f.store.widget_dirty_region(b).is_none());
    }

    #[test]
    fn sync_while_flushing_is_rejected() {
        let mut f = Fixture::new();
        f.store.flushing = true;
        assert_eq!(f.sync(), Err(CompositorError::RecursiveRepaint(f.window)));
    }
}
