// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the paint pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! compositor calls while marking, syncing, painting and presenting. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`SyncSummaryBuilder`] collects paint and present statistics during one
//! backing-store sync and produces a [`SyncSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`DirtyMarkEvent`] and
//!   [`DamageRect`] events plus the corresponding `TraceSink` methods.

use crate::widget::{NativeId, WidgetId};

#[cfg(feature = "trace-rich")]
use kurbo::Rect;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a backing-store sync is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Recording dirty regions.
    Mark,
    /// Culling dirty widgets against opaque siblings and children.
    Sync,
    /// Delivering paint requests to the rasterizer.
    Paint,
    /// Presenting painted regions through the backend.
    Flush,
}

/// Which backend call was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendCall {
    /// A native window was allocated.
    Create,
    /// A native window was released.
    Destroy,
    /// A native window was mapped.
    Map,
    /// A native window was unmapped.
    Unmap,
    /// A native window was moved.
    Move,
    /// A native window was resized.
    Resize,
    /// A native window was raised.
    Raise,
    /// A native window was lowered.
    Lower,
    /// A native window was restacked under a sibling.
    StackUnder,
    /// A native window's mask changed.
    SetMask,
    /// A native window was reparented.
    Reparent,
}

/// A lifecycle transition of one widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleTransition {
    /// Resources were allocated.
    Created,
    /// Native allocation failed; the widget is pending.
    CreateFailed,
    /// The widget became visible.
    Shown,
    /// The widget was hidden.
    Hidden,
    /// The widget was mapped on screen.
    Mapped,
    /// The widget was unmapped.
    Unmapped,
    /// The widget was destroyed.
    Destroyed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a backing store starts a sync.
#[derive(Clone, Copy, Debug)]
pub struct SyncBeginEvent {
    /// Monotonic sync counter, shared by all windows.
    pub sync_index: u64,
    /// Top-level window being synced.
    pub window: WidgetId,
    /// Number of widgets in the dirty list.
    pub dirty_widgets: u32,
    /// Number of rectangles in the composite dirty region.
    pub dirty_rects: u32,
}

/// Emitted when a backing store finishes a sync.
#[derive(Clone, Copy, Debug)]
pub struct SyncEndEvent {
    /// Sync counter.
    pub sync_index: u64,
    /// Top-level window that was synced.
    pub window: WidgetId,
    /// Number of widgets handed to the rasterizer.
    pub painted_widgets: u32,
    /// Area made clean by this sync, in window pixels.
    pub cleaned_area: f64,
}

/// Marks the beginning of a sync phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Sync counter.
    pub sync_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a sync phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Sync counter.
    pub sync_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted for each widget handed to the rasterizer.
#[derive(Clone, Copy, Debug)]
pub struct PaintEvent {
    /// Sync counter.
    pub sync_index: u64,
    /// Widget being painted.
    pub widget: WidgetId,
    /// Rectangles in the paint region.
    pub rect_count: u32,
    /// Area of the paint region.
    pub area: f64,
    /// Whether the background was filled first.
    pub background: bool,
}

/// Emitted for each region presented on a native handle.
#[derive(Clone, Copy, Debug)]
pub struct PresentEvent {
    /// Sync counter.
    pub sync_index: u64,
    /// Handle presented on.
    pub handle: NativeId,
    /// Rectangles in the presented region.
    pub rect_count: u32,
}

/// Emitted for each call into the window backend.
#[derive(Clone, Copy, Debug)]
pub struct BackendCallEvent {
    /// Which call.
    pub call: BackendCall,
    /// Widget the call was made for.
    pub widget: WidgetId,
    /// Handle the call targeted, if it had one yet.
    pub handle: Option<NativeId>,
}

/// Emitted on lifecycle transitions.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEvent {
    /// Widget that changed.
    pub widget: WidgetId,
    /// What happened.
    pub transition: LifecycleTransition,
}

/// Per-sync statistics produced by [`SyncSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct SyncSummary {
    /// Sync counter.
    pub sync_index: u64,
    /// Top-level window.
    pub window: WidgetId,
    /// Whether the whole window was repainted.
    pub full_repaint: bool,
    /// Widgets handed to the rasterizer.
    pub painted_widgets: u32,
    /// Total painted area, summed over widgets.
    pub painted_area: f64,
    /// Present calls issued by the flush.
    pub presents: u32,
    /// Rectangles presented, summed over present calls.
    pub presented_rects: u32,
}

/// A dirty-region registration (requires `trace-rich` feature).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DirtyMarkEvent {
    /// Widget the region belongs to.
    pub widget: WidgetId,
    /// Bounding box of the region, in window coordinates.
    pub bounds: DamageRect,
    /// Whether the region went straight into the composite region.
    pub invalidate_buffer: bool,
    /// Whether the caller asked for an immediate sync.
    pub immediate: bool,
}

/// An axis-aligned damage rectangle in window pixels.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl DamageRect {
    /// Snaps `rect` outward to whole pixels.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "window coordinates fit in i32; sub-pixel parts are rounded outward"
    )]
    pub fn from_rect(rect: Rect) -> Self {
        let r = rect.expand();
        Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width().max(0.0) as u32,
            height: r.height().max(0.0) as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compositor.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a backing store starts a sync.
    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        _ = e;
    }

    /// Called when a backing store finishes a sync.
    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        _ = e;
    }

    /// Called at the beginning of a sync phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a sync phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called for each widget handed to the rasterizer.
    fn on_paint(&mut self, e: &PaintEvent) {
        _ = e;
    }

    /// Called for each present on a native handle.
    fn on_present(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called for each backend call.
    fn on_backend_call(&mut self, e: &BackendCallEvent) {
        _ = e;
    }

    /// Called on lifecycle transitions.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called with a per-sync summary.
    fn on_sync_summary(&mut self, s: &SyncSummary) {
        _ = s;
    }

    /// Called for each dirty-region registration (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_dirty_mark(&mut self, e: &DirtyMarkEvent) {
        _ = e;
    }

    /// Called with the rectangles cleaned by a sync (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, sync_index: u64, rects: &[DamageRect]) {
        _ = (sync_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`SyncBeginEvent`].
    #[inline]
    pub fn sync_begin(&mut self, e: &SyncBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncEndEvent`].
    #[inline]
    pub fn sync_end(&mut self, e: &SyncEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PaintEvent`].
    #[inline]
    pub fn paint(&mut self, e: &PaintEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_paint(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentEvent`].
    #[inline]
    pub fn present(&mut self, e: &PresentEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BackendCallEvent`].
    #[inline]
    pub fn backend_call(&mut self, e: &BackendCallEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_backend_call(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LifecycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lifecycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncSummary`].
    #[inline]
    pub fn sync_summary(&mut self, s: &SyncSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_sync_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a dirty-region registration (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn dirty_mark(&mut self, e: &DirtyMarkEvent) {
        if let Some(s) = &mut self.sink {
            s.on_dirty_mark(e);
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, sync_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(sync_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// SyncSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates paint and present statistics during a sync and produces a
/// [`SyncSummary`].
#[derive(Debug)]
pub struct SyncSummaryBuilder {
    sync_index: u64,
    window: WidgetId,
    full_repaint: bool,
    painted_widgets: u32,
    painted_area: f64,
    presents: u32,
    presented_rects: u32,
}

impl SyncSummaryBuilder {
    /// Starts building a summary for the given sync.
    #[must_use]
    pub fn new(begin: &SyncBeginEvent) -> Self {
        Self {
            sync_index: begin.sync_index,
            window: begin.window,
            full_repaint: false,
            painted_widgets: 0,
            painted_area: 0.0,
            presents: 0,
            presented_rects: 0,
        }
    }

    /// Records a painted widget.
    pub fn paint(&mut self, e: &PaintEvent) {
        self.painted_widgets += 1;
        self.painted_area += e.area;
    }

    /// Records a present call.
    pub fn present(&mut self, e: &PresentEvent) {
        self.presents += 1;
        self.presented_rects += e.rect_count;
    }

    /// Marks the sync as a full-window repaint.
    pub fn set_full_repaint(&mut self, full: bool) {
        self.full_repaint = full;
    }

    /// Consumes the builder and produces the final [`SyncSummary`].
    #[must_use]
    pub fn finish(self) -> SyncSummary {
        SyncSummary {
            sync_index: self.sync_index,
            window: self.window,
            full_repaint: self.full_repaint,
            painted_widgets: self.painted_widgets,
            painted_area: self.painted_area,
            presents: self.presents,
            presented_rects: self.presented_rects,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> WidgetId {
        WidgetId {
            idx: 0,
            generation: 0,
        }
    }

    fn sample_begin() -> SyncBeginEvent {
        SyncBeginEvent {
            sync_index: 42,
            window: window(),
            dirty_widgets: 3,
            dirty_rects: 2,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_sync_begin(&sample_begin());
        sink.on_lifecycle(&LifecycleEvent {
            widget: window(),
            transition: LifecycleTransition::Shown,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.sync_begin(&sample_begin());
        tracer.phase_begin(&PhaseBeginEvent {
            sync_index: 42,
            phase: PhaseKind::Paint,
        });
    }

    #[test]
    fn summary_builder_accumulates() {
        let mut builder = SyncSummaryBuilder::new(&sample_begin());
        for area in [100.0, 250.0] {
            builder.paint(&PaintEvent {
                sync_index: 42,
                widget: window(),
                rect_count: 1,
                area,
                background: false,
            });
        }
        builder.present(&PresentEvent {
            sync_index: 42,
            handle: NativeId(1),
            rect_count: 3,
        });
        builder.set_full_repaint(true);

        let summary = builder.finish();
        assert_eq!(summary.sync_index, 42);
        assert_eq!(summary.painted_widgets, 2);
        assert_eq!(summary.painted_area, 350.0);
        assert_eq!(summary.presents, 1);
        assert_eq!(summary.presented_rects, 3);
        assert!(summary.full_repaint);
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = SyncSummaryBuilder::new(&sample_begin()).finish();
        assert_eq!(summary.painted_widgets, 0);
        assert_eq!(summary.presents, 0);
        assert!(!summary.full_repaint);
    }

    #[cfg(feature = "trace-rich")]
    #[test]
    fn damage_rect_snaps_outward() {
        let d = DamageRect::from_rect(Rect::new(0.5, 1.2, 10.1, 5.0));
        assert_eq!(
            d,
            DamageRect {
                x: 0,
                y: 1,
                width: 11,
                height: 4,
            }
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            syncs: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
                self.syncs.push(e.sync_index);
            }
        }

        let mut sink = RecordingSink { syncs: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.sync_begin(&sample_begin());
        drop(tracer);
        assert_eq!(sink.syncs, &[42]);
    }
}
