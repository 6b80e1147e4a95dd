// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Show, hide, create, and destroy.

use alloc::vec::Vec;

use kurbo::Rect;

use super::{Compositor, trace_call, trace_lifecycle};
use crate::backend::{CreateParams, WindowBackend};
use crate::backing_store::BackingStore;
use crate::error::CompositorError;
use crate::notify::Notification;
use crate::paint::Rasterizer;
use crate::region::Region;
use crate::trace::{BackendCall, LifecycleTransition, Tracer};
use crate::widget::traverse::subtree_preorder;
use crate::widget::{INVALID, WidgetFlags, WidgetId};

/// Lifecycle state of a widget, derived from its flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisibilityState {
    /// Native allocation failed; the next create or show retries.
    PendingCreate,
    /// Resources exist but the widget is not on screen.
    Created,
    /// On screen as far as the compositor knows.
    Mapped,
    /// Not shown, either never or explicitly.
    Hidden,
    /// The handle is stale.
    Destroyed,
}

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Returns the widget's lifecycle state. Stale handles report
    /// [`VisibilityState::Destroyed`].
    #[must_use]
    pub fn visibility_state(&self, id: WidgetId) -> VisibilityState {
        if !self.tree.is_alive(id) {
            return VisibilityState::Destroyed;
        }
        let flags = self.tree.flags[id.idx as usize];
        if flags.contains(WidgetFlags::MAPPED) {
            VisibilityState::Mapped
        } else if flags.is_explicitly_hidden() {
            VisibilityState::Hidden
        } else if flags.contains(WidgetFlags::CREATED) {
            VisibilityState::Created
        } else if flags.contains(WidgetFlags::CREATE_PENDING) {
            VisibilityState::PendingCreate
        } else {
            VisibilityState::Hidden
        }
    }

    /// Shows the widget, creating it first if needed.
    ///
    /// A widget whose parent is hidden becomes visible together with the
    /// parent.
    ///
    /// # Errors
    ///
    /// Native allocation failure; the widget stays hidden and pending.
    pub fn show(&mut self, id: WidgetId) -> Result<(), CompositorError> {
        self.show_traced(id, &mut Tracer::none())
    }

    /// [`show`](Self::show) with tracing.
    ///
    /// # Errors
    ///
    /// See [`show`](Self::show).
    pub fn show_traced(
        &mut self,
        id: WidgetId,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        self.tree.validate(id);
        self.show_at(id.idx, tracer)
    }

    /// Hides the widget and its subtree.
    pub fn hide(&mut self, id: WidgetId) {
        self.hide_traced(id, &mut Tracer::none());
    }

    /// [`hide`](Self::hide) with tracing.
    pub fn hide_traced(&mut self, id: WidgetId, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        self.hide_at(id.idx, tracer);
    }

    /// Shows or hides the widget.
    ///
    /// # Errors
    ///
    /// See [`show`](Self::show).
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> Result<(), CompositorError> {
        if visible {
            self.show(id)
        } else {
            self.hide(id);
            Ok(())
        }
    }

    /// Allocates the widget's resources without showing it. Idempotent.
    ///
    /// # Errors
    ///
    /// Native allocation failure; a later call retries.
    ///
    /// # Panics
    ///
    /// Panics if the compositor is not initialized.
    pub fn create(&mut self, id: WidgetId) -> Result<(), CompositorError> {
        self.create_traced(id, &mut Tracer::none())
    }

    /// [`create`](Self::create) with tracing.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_traced(
        &mut self,
        id: WidgetId,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        self.tree.validate(id);
        self.create_at(id.idx, tracer)
    }

    /// Destroys the widget and its whole subtree, child windows included.
    pub fn destroy_widget(&mut self, id: WidgetId) {
        self.destroy_widget_traced(id, &mut Tracer::none());
    }

    /// [`destroy_widget`](Self::destroy_widget) with tracing.
    pub fn destroy_widget_traced(&mut self, id: WidgetId, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        self.destroy_at(id.idx, tracer);
    }

    // -----------------------------------------------------------------------
    // Show
    // -----------------------------------------------------------------------

    pub(crate) fn show_at(&mut self, idx: u32, tracer: &mut Tracer<'_>) -> Result<(), CompositorError> {
        let flags = self.tree.flags[idx as usize];
        if flags.contains(WidgetFlags::VISIBLE) && !flags.contains(WidgetFlags::HIDDEN) {
            self.tree.insert_flags_at(idx, WidgetFlags::EXPLICIT_SHOW_HIDE);
            return Ok(());
        }

        let parent = self.tree.parent[idx as usize];
        let is_window = self.tree.is_window_at(idx);
        if is_window || self.tree.flags[parent as usize].contains(WidgetFlags::CREATED) {
            self.create_at(idx, tracer)?;
        }

        self.tree.remove_flags_at(idx, WidgetFlags::HIDDEN);
        self.tree.insert_flags_at(idx, WidgetFlags::EXPLICIT_SHOW_HIDE);

        let parent_visible = parent != INVALID
            && self.tree.flags[parent as usize].contains(WidgetFlags::VISIBLE);
        if !is_window && !parent_visible {
            return Ok(());
        }
        self.show_helper(idx, tracer);
        Ok(())
    }

    fn show_helper(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        if self.tree.flags[idx as usize].contains(WidgetFlags::LAYOUT_PENDING) {
            self.tree.remove_flags_at(idx, WidgetFlags::LAYOUT_PENDING);
            self.notify(Notification::LayoutRequest(id));
        }
        self.send_pending_geometry(idx);

        self.tree.insert_flags_at(idx, WidgetFlags::VISIBLE);
        self.tree.mark_opaque_at(idx);
        self.notify(Notification::Shown(id));
        trace_lifecycle(tracer, id, LifecycleTransition::Shown);

        self.map_at(idx, tracer);

        if self.tree.window_type[idx as usize].raises_on_show()
            && let Some(handle) = self.tree.native[idx as usize]
        {
            trace_call(tracer, BackendCall::Raise, id, Some(handle));
            self.backend.raise(handle);
        }

        self.show_children(idx, tracer);
    }

    /// Shows the implicitly hidden children of a widget that just became
    /// visible. Children whose allocation fails stay pending.
    fn show_children(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        for child in self.child_indices(idx) {
            let flags = self.tree.flags[child as usize];
            if self.tree.is_window_at(child)
                || flags.contains(WidgetFlags::HIDDEN)
                || flags.contains(WidgetFlags::VISIBLE)
            {
                continue;
            }
            if self.create_at(child, tracer).is_err() {
                continue;
            }
            self.show_helper(child, tracer);
        }
    }

    fn map_at(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        let is_window = self.tree.is_window_at(idx);
        if is_window && self.tree.rect[idx as usize].is_zero_area() {
            self.tree.insert_flags_at(idx, WidgetFlags::OUTSIDE_WS_RANGE);
            return;
        }
        self.tree.remove_flags_at(idx, WidgetFlags::OUTSIDE_WS_RANGE);

        if let Some(handle) = self.tree.native[idx as usize] {
            trace_call(tracer, BackendCall::Map, id, Some(handle));
            self.backend.map(handle);
        }
        // A child counts as mapped only under a mapped parent; it gains the
        // flag when its window maps.
        if !is_window
            && !self.tree.flags[self.tree.parent[idx as usize] as usize]
                .contains(WidgetFlags::MAPPED)
        {
            return;
        }
        self.tree.insert_flags_at(idx, WidgetFlags::MAPPED);
        trace_lifecycle(tracer, id, LifecycleTransition::Mapped);

        if is_window {
            if self.tree.native[idx as usize].is_some() {
                self.tree.insert_flags_at(idx, WidgetFlags::WAITING_FOR_MAP);
            }
            if let Some(store) = self.stores.get_mut(&idx) {
                let request = store.request_full_update();
                self.apply_request(idx, request);
            }
        } else {
            let rect = self.tree.local_rect_at(idx);
            self.invalidate_buffer_at(idx, Region::from_rect(rect), tracer);
        }
    }

    // -----------------------------------------------------------------------
    // Hide
    // -----------------------------------------------------------------------

    pub(crate) fn hide_at(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let flags = self.tree.flags[idx as usize];
        if flags.is_explicitly_hidden() {
            return;
        }
        self.tree
            .insert_flags_at(idx, WidgetFlags::HIDDEN | WidgetFlags::EXPLICIT_SHOW_HIDE);
        if flags.contains(WidgetFlags::VISIBLE) {
            self.hide_helper(idx, tracer);
        }
    }

    pub(crate) fn hide_helper(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        let native = self.tree.native[idx as usize];
        if let Some(handle) = native {
            trace_call(tracer, BackendCall::Unmap, id, Some(handle));
            self.backend.unmap(handle);
        } else if !self.tree.is_window_at(idx) {
            // Uncover the parent while the widget still counts as visible.
            let parent = self.tree.parent[idx as usize];
            let area = Region::from_rect(self.tree.effective_rect_at(idx));
            self.invalidate_buffer_at(parent, area, tracer);
        }

        self.tree.remove_flags_at(
            idx,
            WidgetFlags::VISIBLE | WidgetFlags::MAPPED | WidgetFlags::WAITING_FOR_MAP,
        );
        self.tree.mark_opaque_at(idx);
        self.notify(Notification::Hidden(id));
        trace_lifecycle(tracer, id, LifecycleTransition::Hidden);

        self.hide_children(idx, native.is_some(), tracer);
        self.remove_dirty_subtree(idx);
        for w in subtree_preorder(&self.tree, idx) {
            let wid = self.tree.id_at(w);
            self.context.release_grabs(wid);
        }
    }

    /// Clears visibility below `idx`, leaving explicit flags alone. Native
    /// children are unmapped only when no ancestor was unmapped natively.
    fn hide_children(&mut self, idx: u32, natively_hidden: bool, tracer: &mut Tracer<'_>) {
        for child in self.child_indices(idx) {
            let flags = self.tree.flags[child as usize];
            if self.tree.is_window_at(child) || !flags.contains(WidgetFlags::VISIBLE) {
                continue;
            }
            let id = self.tree.id_at(child);
            let native = self.tree.native[child as usize];
            if let Some(handle) = native
                && !natively_hidden
            {
                trace_call(tracer, BackendCall::Unmap, id, Some(handle));
                self.backend.unmap(handle);
            }
            self.tree
                .remove_flags_at(child, WidgetFlags::VISIBLE | WidgetFlags::MAPPED);
            self.tree.mark_opaque_at(child);
            self.notify(Notification::Hidden(id));
            trace_lifecycle(tracer, id, LifecycleTransition::Hidden);
            self.hide_children(child, natively_hidden || native.is_some(), tracer);
        }
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub(crate) fn create_at(&mut self, idx: u32, tracer: &mut Tracer<'_>) -> Result<(), CompositorError> {
        assert!(
            self.context.is_initialized(),
            "widget created before the compositor was initialized"
        );
        if self.tree.flags[idx as usize].contains(WidgetFlags::CREATED) {
            return Ok(());
        }

        let parent = self.tree.parent[idx as usize];
        let is_window = self.tree.is_window_at(idx);
        if !is_window && !self.tree.flags[parent as usize].contains(WidgetFlags::CREATED) {
            self.create_at(parent, tracer)?;
        }

        if self.needs_native_at(idx) {
            self.create_native_at(idx, tracer)?;
        }

        let id = self.tree.id_at(idx);
        self.tree.remove_flags_at(idx, WidgetFlags::CREATE_PENDING);
        self.tree.insert_flags_at(idx, WidgetFlags::CREATED);
        if is_window {
            self.stores
                .insert(idx, BackingStore::new(id, self.config.max_dirty_rects));
        }
        self.notify(Notification::Created(id));
        trace_lifecycle(tracer, id, LifecycleTransition::Created);
        Ok(())
    }

    /// Allocates a native handle for `idx`, promoting alien ancestors first
    /// unless the widget opts out.
    ///
    /// A widget that is already created and visible is mapped right away,
    /// and native descendants that were parented further up move under the
    /// new handle.
    pub(crate) fn create_native_at(
        &mut self,
        idx: u32,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        if self.tree.native[idx as usize].is_some() {
            return Ok(());
        }
        let id = self.tree.id_at(idx);
        let flags = self.tree.flags[idx as usize];
        let is_window = self.tree.is_window_at(idx);

        if !is_window && !flags.contains(WidgetFlags::DONT_CREATE_NATIVE_ANCESTORS) {
            let parent = self.tree.parent[idx as usize];
            if self.tree.native[parent as usize].is_none() {
                self.tree.insert_flags_at(parent, WidgetFlags::NATIVE_WINDOW);
                self.create_native_at(parent, tracer)?;
            }
        }

        let (parent_handle, geometry) = if is_window {
            (None, self.tree.rect[idx as usize])
        } else {
            match self.tree.native_parent_at(idx) {
                Some(np) => {
                    let origin = self.tree.offset_to_ancestor_at(idx, np).to_point();
                    let size = self.tree.rect[idx as usize].size();
                    (self.tree.native[np as usize], Rect::from_origin_size(origin, size))
                }
                None => (None, self.tree.rect[idx as usize]),
            }
        };
        let params = CreateParams {
            widget: id,
            parent: parent_handle,
            geometry,
            window_type: self.tree.window_type[idx as usize],
            translucent: flags.contains(WidgetFlags::TRANSLUCENT_BACKGROUND),
        };

        trace_call(tracer, BackendCall::Create, id, None);
        let handle = match self.backend.create(&params) {
            Ok(handle) => handle,
            Err(err) => {
                self.tree.insert_flags_at(idx, WidgetFlags::CREATE_PENDING);
                self.notify(Notification::CreateFailed(id, err));
                trace_lifecycle(tracer, id, LifecycleTransition::CreateFailed);
                return Err(err.into());
            }
        };

        self.tree.set_native_at(idx, Some(handle));
        self.context.register(handle, id);
        if let Some(mask) = &self.tree.mask[idx as usize] {
            trace_call(tracer, BackendCall::SetMask, id, Some(handle));
            self.backend.set_mask(handle, Some(mask));
        }
        if is_window {
            self.tree.dirty.mark(idx, crate::dirty::FRAME_STRUT);
        }
        self.notify(Notification::NativeHandleChanged {
            widget: id,
            handle: Some(handle),
        });

        if flags.contains(WidgetFlags::CREATED) {
            for d in self.first_native_descendants(idx) {
                let Some(dh) = self.tree.native[d as usize] else {
                    continue;
                };
                let pos = self.tree.offset_to_ancestor_at(d, idx).to_point();
                trace_call(tracer, BackendCall::Reparent, self.tree.id_at(d), Some(dh));
                self.backend.reparent(dh, Some(handle), pos);
            }
            if flags.contains(WidgetFlags::VISIBLE) {
                trace_call(tracer, BackendCall::Map, id, Some(handle));
                self.backend.map(handle);
                let rect = self.tree.local_rect_at(idx);
                self.invalidate_buffer_at(idx, Region::from_rect(rect), tracer);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Destroy
    // -----------------------------------------------------------------------

    pub(crate) fn destroy_at(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        if self.tree.flags[idx as usize].contains(WidgetFlags::VISIBLE) {
            self.hide_helper(idx, tracer);
        }
        for child in self.child_indices(idx) {
            self.destroy_at(child, tracer);
        }

        self.remove_dirty_subtree(idx);
        self.context.release_grabs(id);
        if let Some(handle) = self.tree.native[idx as usize] {
            trace_call(tracer, BackendCall::Destroy, id, Some(handle));
            self.backend.destroy(handle);
            self.context.unregister(handle);
        }
        self.stores.remove(&idx);
        self.posted.retain(|w| *w != id);
        self.paint_requests.retain(|r| r.widget != id);

        let parent = self.tree.parent[idx as usize];
        if parent != INVALID {
            let parent = self.tree.id_at(parent);
            self.notify(Notification::ChildRemoved { parent, child: id });
        }
        self.tree.destroy(id);
        self.notify(Notification::Destroyed(id));
        trace_lifecycle(tracer, id, LifecycleTransition::Destroyed);
    }

    /// Returns the children of `idx`, back to front.
    pub(crate) fn child_indices(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut c = self.tree.first_child[idx as usize];
        while c != INVALID {
            out.push(c);
            c = self.tree.next_sibling[c as usize];
        }
        out
    }
}
