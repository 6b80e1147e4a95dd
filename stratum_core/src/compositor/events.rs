// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update requests, the event-loop iteration, and backend confirmations.

use alloc::vec::Vec;
use core::mem;

use kurbo::Rect;

use super::{Compositor, trace_lifecycle};
use crate::backend::{BackendEvent, WindowBackend};
use crate::backing_store::UpdateRequest;
use crate::error::CompositorError;
use crate::paint::Rasterizer;
use crate::region::Region;
use crate::trace::{LifecycleTransition, Tracer};
use crate::widget::{WidgetFlags, WidgetId};

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Schedules a repaint of the whole widget on the next
    /// [`process_pending`](Self::process_pending).
    pub fn update(&mut self, id: WidgetId) {
        let rect = self.tree.local_rect(id);
        self.update_region(id, Region::from_rect(rect));
    }

    /// Schedules a repaint of `rect` (widget coordinates).
    pub fn update_rect(&mut self, id: WidgetId, rect: Rect) {
        self.update_region(id, Region::from_rect(rect));
    }

    /// Schedules a repaint of `region` (widget coordinates).
    pub fn update_region(&mut self, id: WidgetId, region: Region) {
        self.tree.validate(id);
        self.update_at(id.idx, region, &mut Tracer::none());
    }

    /// Repaints the whole widget before returning.
    ///
    /// # Errors
    ///
    /// [`CompositorError::RecursiveRepaint`] if the widget's window is
    /// painting.
    pub fn repaint(&mut self, id: WidgetId) -> Result<(), CompositorError> {
        let rect = self.tree.local_rect(id);
        self.repaint_region(id, Region::from_rect(rect))
    }

    /// Repaints `region` (widget coordinates) before returning.
    ///
    /// # Errors
    ///
    /// See [`repaint`](Self::repaint).
    pub fn repaint_region(&mut self, id: WidgetId, region: Region) -> Result<(), CompositorError> {
        self.repaint_traced(id, region, &mut Tracer::none())
    }

    /// [`repaint_region`](Self::repaint_region) with tracing.
    ///
    /// # Errors
    ///
    /// See [`repaint`](Self::repaint).
    pub fn repaint_traced(
        &mut self,
        id: WidgetId,
        region: Region,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        self.tree.validate(id);
        self.repaint_at(id.idx, region, tracer)
    }

    // -- Coarse requests --

    /// Requests a repaint of `region`, or of the whole widget. Synchronous
    /// requests paint before returning.
    ///
    /// # Errors
    ///
    /// See [`repaint`](Self::repaint).
    pub fn request_repaint(
        &mut self,
        id: WidgetId,
        region: Option<Region>,
        synchronous: bool,
    ) -> Result<(), CompositorError> {
        let region = region.unwrap_or_else(|| Region::from_rect(self.tree.local_rect(id)));
        if synchronous {
            self.repaint_region(id, region)
        } else {
            self.update_region(id, region);
            Ok(())
        }
    }

    /// Requests new geometry for the widget.
    pub fn request_geometry(&mut self, id: WidgetId, rect: Rect) {
        self.set_geometry(id, rect);
    }

    /// Requests a new parent for the widget.
    pub fn request_reparent(&mut self, id: WidgetId, new_parent: Option<WidgetId>) {
        self.set_parent(id, new_parent);
    }

    /// Requests that the widget be shown or hidden.
    ///
    /// # Errors
    ///
    /// See [`show`](Self::show).
    pub fn request_visibility(&mut self, id: WidgetId, visible: bool) -> Result<(), CompositorError> {
        self.set_visible(id, visible)
    }

    // -- Event loop --

    /// Runs one event-loop iteration and returns the number of windows that
    /// painted or presented.
    ///
    /// Remote requests and updates queued by the previous iteration's paint
    /// callbacks are applied first; then every window with a posted update
    /// syncs once. Updates requested while painting wait for the next call.
    pub fn process_pending(&mut self) -> usize {
        self.process_pending_traced(&mut Tracer::none())
    }

    /// [`process_pending`](Self::process_pending) with tracing.
    pub fn process_pending_traced(&mut self, tracer: &mut Tracer<'_>) -> usize {
        #[cfg(feature = "std")]
        for (id, rect) in self.remote.take() {
            if !self.tree.is_alive(id) {
                continue;
            }
            let rect = rect.unwrap_or_else(|| self.tree.local_rect_at(id.idx));
            self.update_at(id.idx, Region::from_rect(rect), tracer);
        }

        for request in mem::take(&mut self.paint_requests) {
            if self.tree.is_alive(request.widget) {
                self.update_at(request.widget.idx, request.region, tracer);
            }
        }

        let mut syncs = 0;
        for window in mem::take(&mut self.posted) {
            if !self.tree.is_alive(window) {
                continue;
            }
            let Some(store) = self.stores.get_mut(&window.idx) else {
                continue;
            };
            store.clear_update_posted();
            match self.sync_window(window.idx, false, tracer) {
                Ok(true) => syncs += 1,
                Ok(false) => {}
                // Nothing paints between iterations; a collision means the
                // store is still flushing, so retry next iteration.
                Err(_) => self.posted.push(window),
            }
        }
        syncs
    }

    /// Applies a notification from the window system.
    ///
    /// Events for handles the compositor does not know are ignored.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        self.handle_backend_event_traced(event, &mut Tracer::none());
    }

    /// [`handle_backend_event`](Self::handle_backend_event) with tracing.
    pub fn handle_backend_event_traced(&mut self, event: BackendEvent, tracer: &mut Tracer<'_>) {
        let Some(id) = self.context.widget_for(event.handle()) else {
            return;
        };
        let idx = id.idx;
        match event {
            BackendEvent::Mapped(_) => {
                self.tree.remove_flags_at(idx, WidgetFlags::WAITING_FOR_MAP);
                // Late confirmation of a map the compositor has since undone.
                if self.tree.flags[idx as usize].contains(WidgetFlags::OUTSIDE_WS_RANGE) {
                    return;
                }
                for w in self.window_subtree(idx) {
                    if self.tree.flags[w as usize].contains(WidgetFlags::VISIBLE) {
                        self.tree.insert_flags_at(w, WidgetFlags::MAPPED);
                    }
                }
                trace_lifecycle(tracer, id, LifecycleTransition::Mapped);
                self.request_full_update_at(idx);
            }
            BackendEvent::Unmapped(_) => {
                for w in self.window_subtree(idx) {
                    self.tree.remove_flags_at(w, WidgetFlags::MAPPED);
                }
                trace_lifecycle(tracer, id, LifecycleTransition::Unmapped);
            }
            BackendEvent::Exposed { region, .. } => {
                if self.sync_exposed_at(idx, &region, tracer).is_err() {
                    // The window is still painting; the exposed area is
                    // already marked on screen, so flush it next iteration.
                    let window = self.tree.window_at(idx);
                    self.apply_request(window, UpdateRequest::Post);
                }
            }
            BackendEvent::Configured { rect, .. } => {
                if !self.tree.is_window_at(idx) {
                    return;
                }
                let old = self.tree.rect[idx as usize];
                if old == rect {
                    return;
                }
                self.tree.set_rect_at(idx, rect);
                if old.size() != rect.size() {
                    self.request_full_update_at(idx);
                }
                self.notify_geometry(idx, old);
            }
            BackendEvent::FrameExtentsChanged(_) => {
                self.tree.dirty.mark(idx, crate::dirty::FRAME_STRUT);
            }
            BackendEvent::ResizeStarted(_) => {
                if self.config.resize_optimization
                    && self.tree.is_window_at(idx)
                    && !self.resize_optimization_blocked(idx)
                    && let Some(store) = self.stores.get_mut(&idx)
                {
                    store.begin_resize();
                }
            }
            BackendEvent::ResizeFinished(_) => {
                if let Some(store) = self.stores.get_mut(&idx) {
                    let request = store.end_resize();
                    self.apply_request(idx, request);
                }
            }
        }
    }

    /// Returns a handle other threads can queue updates through.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn remote(&self) -> crate::remote::RemoteUpdater {
        self.remote.clone()
    }

    fn request_full_update_at(&mut self, idx: u32) {
        if !self.tree.is_window_at(idx) {
            let rect = self.tree.local_rect_at(idx);
            self.invalidate_buffer_at(idx, Region::from_rect(rect), &mut Tracer::none());
            return;
        }
        if let Some(store) = self.stores.get_mut(&idx) {
            let request = store.request_full_update();
            self.apply_request(idx, request);
        }
    }

    /// `idx` and its descendants, not descending into child windows.
    pub(crate) fn window_subtree(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        stack.push(idx);
        while let Some(w) = stack.pop() {
            out.push(w);
            for c in self.child_indices(w) {
                if !self.tree.is_window_at(c) {
                    stack.push(c);
                }
            }
        }
        out
    }
}
