// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles for the backend and rasterizer contracts.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::{Insets, Point, Size, Vec2};

use crate::backend::{BackendCapabilities, CreateParams, WindowBackend};
use crate::error::BackendError;
use crate::paint::{PaintContext, Rasterizer};
use crate::region::Region;
use crate::widget::{NativeId, WidgetId};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Initialize,
    Create {
        widget: WidgetId,
        handle: NativeId,
        parent: Option<NativeId>,
    },
    Destroy(NativeId),
    Map(NativeId),
    Unmap(NativeId),
    MoveTo(NativeId, Point),
    Resize(NativeId, Size),
    Raise(NativeId),
    Lower(NativeId),
    StackUnder(NativeId, NativeId),
    SetMask(NativeId, Option<Region>),
    Reparent(NativeId, Option<NativeId>, Point),
    Present(NativeId, Region),
}

/// Backend that records every call and hands out sequential handles.
#[derive(Debug)]
pub(crate) struct RecordingBackend {
    pub(crate) calls: Vec<Call>,
    next_handle: u64,
    /// Number of upcoming `create` calls that fail.
    pub(crate) fail_creates: u32,
    pub(crate) capabilities: BackendCapabilities,
    pub(crate) extents: Insets,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_handle: 1,
            fail_creates: 0,
            capabilities: BackendCapabilities::default(),
            extents: Insets::ZERO,
        }
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn presents(&self) -> Vec<(NativeId, Region)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Present(h, r) => Some((*h, r.clone())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn created(&self) -> Vec<WidgetId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Create { widget, .. } => Some(*widget),
                _ => None,
            })
            .collect()
    }
}

impl WindowBackend for RecordingBackend {
    fn initialize(&mut self) -> Result<(), BackendError> {
        self.calls.push(Call::Initialize);
        Ok(())
    }

    fn create(&mut self, params: &CreateParams) -> Result<NativeId, BackendError> {
        if self.fail_creates > 0 {
            self.fail_creates -= 1;
            return Err(BackendError::ResourceExhausted);
        }
        let handle = NativeId(self.next_handle);
        self.next_handle += 1;
        self.calls.push(Call::Create {
            widget: params.widget,
            handle,
            parent: params.parent,
        });
        Ok(handle)
    }

    fn destroy(&mut self, handle: NativeId) {
        self.calls.push(Call::Destroy(handle));
    }

    fn map(&mut self, handle: NativeId) {
        self.calls.push(Call::Map(handle));
    }

    fn unmap(&mut self, handle: NativeId) {
        self.calls.push(Call::Unmap(handle));
    }

    fn move_to(&mut self, handle: NativeId, pos: Point) {
        self.calls.push(Call::MoveTo(handle, pos));
    }

    fn resize(&mut self, handle: NativeId, size: Size) {
        self.calls.push(Call::Resize(handle, size));
    }

    fn raise(&mut self, handle: NativeId) {
        self.calls.push(Call::Raise(handle));
    }

    fn lower(&mut self, handle: NativeId) {
        self.calls.push(Call::Lower(handle));
    }

    fn stack_under(&mut self, handle: NativeId, sibling: NativeId) {
        self.calls.push(Call::StackUnder(handle, sibling));
    }

    fn set_mask(&mut self, handle: NativeId, mask: Option<&Region>) {
        self.calls.push(Call::SetMask(handle, mask.cloned()));
    }

    fn reparent(&mut self, handle: NativeId, parent: Option<NativeId>, pos: Point) {
        self.calls.push(Call::Reparent(handle, parent, pos));
    }

    fn present(&mut self, handle: NativeId, region: &Region) {
        self.calls.push(Call::Present(handle, region.clone()));
    }

    fn frame_extents(&mut self, _handle: NativeId) -> Insets {
        self.extents
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }
}

/// One recorded paint call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Painted {
    pub(crate) widget: WidgetId,
    pub(crate) region: Region,
    pub(crate) offset: Vec2,
}

type PaintHook = Box<dyn FnMut(WidgetId, &mut PaintContext<'_>)>;

/// Rasterizer that records what it was asked to paint.
#[derive(Default)]
pub(crate) struct RecordingRasterizer {
    pub(crate) painted: Vec<Painted>,
    pub(crate) backgrounds: Vec<WidgetId>,
    /// Runs inside every paint call.
    pub(crate) hook: Option<PaintHook>,
}

impl core::fmt::Debug for RecordingRasterizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordingRasterizer")
            .field("painted", &self.painted)
            .field("backgrounds", &self.backgrounds)
            .finish_non_exhaustive()
    }
}

impl RecordingRasterizer {
    pub(crate) fn widgets(&self) -> Vec<WidgetId> {
        self.painted.iter().map(|p| p.widget).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.painted.clear();
        self.backgrounds.clear();
    }
}

impl Rasterizer for RecordingRasterizer {
    fn paint(
        &mut self,
        widget: WidgetId,
        region: &Region,
        offset: Vec2,
        ctx: &mut PaintContext<'_>,
    ) {
        self.painted.push(Painted {
            widget,
            region: region.clone(),
            offset,
        });
        if let Some(hook) = self.hook.as_mut() {
            hook(widget, ctx);
        }
    }

    fn paint_background(&mut self, widget: WidgetId, _region: &Region, _offset: Vec2) {
        self.backgrounds.push(widget);
    }
}
