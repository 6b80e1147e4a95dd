// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sibling z-order.

use super::{Compositor, trace_call};
use crate::backend::WindowBackend;
use crate::notify::Notification;
use crate::paint::Rasterizer;
use crate::region::Region;
use crate::trace::{BackendCall, Tracer};
use crate::widget::{INVALID, WidgetId};

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Moves the widget to the top of its siblings.
    pub fn raise(&mut self, id: WidgetId) {
        self.raise_traced(id, &mut Tracer::none());
    }

    /// [`raise`](Self::raise) with tracing.
    pub fn raise_traced(&mut self, id: WidgetId, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        let idx = id.idx;
        if self.tree.parent[idx as usize] == INVALID {
            self.forward_window_stacking(idx, BackendCall::Raise, tracer);
            return;
        }
        if !self.tree.raise_at(idx) {
            return;
        }
        if self.tree.is_window_at(idx) {
            self.forward_window_stacking(idx, BackendCall::Raise, tracer);
        } else if let Some(handle) = self.tree.native[idx as usize] {
            trace_call(tracer, BackendCall::Raise, id, Some(handle));
            self.backend.raise(handle);
        }

        // Only what was covered by siblings now below needs repainting.
        if !self.tree.is_window_at(idx) {
            let mut region = Region::from_rect(self.tree.local_rect_at(idx));
            self.tree.refresh_opaque_cache();
            self.tree.subtract_opaque_siblings_at(idx, &mut region);
            self.invalidate_buffer_at(idx, region, tracer);
        }
        self.finish_restack(idx);
    }

    /// Moves the widget to the bottom of its siblings.
    pub fn lower(&mut self, id: WidgetId) {
        self.lower_traced(id, &mut Tracer::none());
    }

    /// [`lower`](Self::lower) with tracing.
    pub fn lower_traced(&mut self, id: WidgetId, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        let idx = id.idx;
        if self.tree.parent[idx as usize] == INVALID {
            self.forward_window_stacking(idx, BackendCall::Lower, tracer);
            return;
        }
        if !self.tree.lower_at(idx) {
            return;
        }
        if self.tree.is_window_at(idx) {
            self.forward_window_stacking(idx, BackendCall::Lower, tracer);
        } else if let Some(handle) = self.tree.native[idx as usize] {
            trace_call(tracer, BackendCall::Lower, id, Some(handle));
            self.backend.lower(handle);
        }
        self.invalidate_restacked(idx, tracer);
        self.finish_restack(idx);
    }

    /// Moves the widget directly below `sibling`. A non-sibling or the widget
    /// itself is ignored.
    pub fn stack_under(&mut self, id: WidgetId, sibling: WidgetId) {
        self.stack_under_traced(id, sibling, &mut Tracer::none());
    }

    /// [`stack_under`](Self::stack_under) with tracing.
    pub fn stack_under_traced(&mut self, id: WidgetId, sibling: WidgetId, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        self.tree.validate(sibling);
        let idx = id.idx;
        if !self.tree.stack_under_at(idx, sibling.idx) {
            return;
        }
        if let (Some(handle), Some(under)) = (
            self.tree.native[idx as usize],
            self.tree.native[sibling.idx as usize],
        ) {
            trace_call(tracer, BackendCall::StackUnder, id, Some(handle));
            self.backend.stack_under(handle, under);
        }
        self.invalidate_restacked(idx, tracer);
        self.finish_restack(idx);
    }

    /// The window manager owns top-level stacking: always forward.
    fn forward_window_stacking(&mut self, idx: u32, call: BackendCall, tracer: &mut Tracer<'_>) {
        let Some(handle) = self.tree.native[idx as usize] else {
            return;
        };
        trace_call(tracer, call, self.tree.id_at(idx), Some(handle));
        match call {
            BackendCall::Lower => self.backend.lower(handle),
            _ => self.backend.raise(handle),
        }
    }

    /// Repaints a widget that moved down, exposing siblings now above it.
    fn invalidate_restacked(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        if self.tree.is_window_at(idx) {
            return;
        }
        let rect = self.tree.local_rect_at(idx);
        self.invalidate_buffer_at(idx, Region::from_rect(rect), tracer);
    }

    fn finish_restack(&mut self, idx: u32) {
        self.tree.mark_opaque_at(idx);
        self.notify(Notification::ZOrderChanged(self.tree.id_at(idx)));
    }
}
