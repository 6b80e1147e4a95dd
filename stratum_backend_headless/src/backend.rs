// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory window system.
//!
//! [`HeadlessBackend`] keeps a tree of native windows the way a window
//! server would: per-parent stacking lists, geometry, masks, and presented
//! areas. Top-level maps are confirmed asynchronously: the `Mapped` event is
//! queued and delivered when the caller drains [`take_events`].
//!
//! The window-manager side is scripted: [`configure`], [`expose`],
//! [`begin_resize`], and friends queue the events a real window manager
//! would send.
//!
//! [`take_events`]: HeadlessBackend::take_events
//! [`configure`]: HeadlessBackend::configure
//! [`expose`]: HeadlessBackend::expose
//! [`begin_resize`]: HeadlessBackend::begin_resize

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use kurbo::{Insets, Point, Rect, Size};
use stratum_core::backend::{BackendCapabilities, BackendEvent, CreateParams, WindowBackend};
use stratum_core::error::BackendError;
use stratum_core::region::Region;
use stratum_core::trace::BackendCall;
use stratum_core::widget::{NativeId, WidgetId, WindowType};

/// One native window.
#[derive(Clone, Debug)]
pub struct HeadlessWindow {
    widget: WidgetId,
    window_type: WindowType,
    parent: Option<NativeId>,
    /// Stacked back to front.
    children: Vec<NativeId>,
    rect: Rect,
    mapped: bool,
    translucent: bool,
    mask: Option<Region>,
    presented: Region,
    present_count: u32,
}

impl HeadlessWindow {
    /// Returns the widget the window was created for.
    #[must_use]
    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    /// Returns the kind of window.
    #[must_use]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Returns the native parent, `None` for top-level windows.
    #[must_use]
    pub fn parent(&self) -> Option<NativeId> {
        self.parent
    }

    /// Returns the native children, back to front.
    #[must_use]
    pub fn children(&self) -> &[NativeId] {
        &self.children
    }

    /// Returns the geometry in the parent's coordinates.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Returns `true` if the window is on screen.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Returns `true` if the window has an alpha channel.
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.translucent
    }

    /// Returns the shape mask.
    #[must_use]
    pub fn mask(&self) -> Option<&Region> {
        self.mask.as_ref()
    }

    /// Returns everything presented so far, in window coordinates.
    #[must_use]
    pub fn presented(&self) -> &Region {
        &self.presented
    }

    /// Returns the number of present calls.
    #[must_use]
    pub fn present_count(&self) -> u32 {
        self.present_count
    }
}

/// A [`WindowBackend`] that keeps every window in memory.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    initialized: bool,
    /// Slot `i` holds handle `i + 1`; handle zero is reserved.
    windows: Vec<Option<HeadlessWindow>>,
    /// Top-level windows, back to front.
    top_level: Vec<NativeId>,
    events: VecDeque<BackendEvent>,
    log: Vec<(BackendCall, NativeId)>,
    failing_creates: u32,
    capabilities: BackendCapabilities,
    insets: Insets,
}

impl HeadlessBackend {
    /// Creates an empty window system with default capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the reported capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Makes the next `n` creates fail with
    /// [`BackendError::ResourceExhausted`].
    pub fn fail_next_creates(&mut self, n: u32) {
        self.failing_creates = n;
    }

    /// Returns the window behind `handle`, if it exists.
    #[must_use]
    pub fn window(&self, handle: NativeId) -> Option<&HeadlessWindow> {
        let slot = usize::try_from(handle.0.checked_sub(1)?).ok()?;
        self.windows.get(slot)?.as_ref()
    }

    fn window_mut(&mut self, handle: NativeId) -> Option<&mut HeadlessWindow> {
        let slot = usize::try_from(handle.0.checked_sub(1)?).ok()?;
        self.windows.get_mut(slot)?.as_mut()
    }

    /// Returns the number of live windows.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.iter().flatten().count()
    }

    /// Returns the windows stacked under `parent` (the root for `None`),
    /// back to front.
    #[must_use]
    pub fn stacking(&self, parent: Option<NativeId>) -> &[NativeId] {
        match parent {
            None => &self.top_level,
            Some(p) => self.window(p).map(|w| w.children.as_slice()).unwrap_or(&[]),
        }
    }

    /// Returns every call that changed a window, oldest first.
    #[must_use]
    pub fn log(&self) -> &[(BackendCall, NativeId)] {
        &self.log
    }

    /// Returns `true` if window-system events are waiting.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Removes and returns the queued window-system events.
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        self.events.drain(..).collect()
    }

    // -- Scripted window manager --

    /// Moves or resizes a window as the window manager would.
    pub fn configure(&mut self, handle: NativeId, rect: Rect) {
        if let Some(w) = self.window_mut(handle) {
            w.rect = rect;
            self.events.push_back(BackendEvent::Configured { handle, rect });
        }
    }

    /// Asks for part of a window to be redrawn.
    pub fn expose(&mut self, handle: NativeId, region: Region) {
        if self.window(handle).is_some() {
            self.events.push_back(BackendEvent::Exposed { handle, region });
        }
    }

    /// Takes a window off screen without the compositor asking.
    pub fn withdraw(&mut self, handle: NativeId) {
        if let Some(w) = self.window_mut(handle) {
            w.mapped = false;
            self.events.push_back(BackendEvent::Unmapped(handle));
        }
    }

    /// Starts an interactive resize.
    pub fn begin_resize(&mut self, handle: NativeId) {
        self.events.push_back(BackendEvent::ResizeStarted(handle));
    }

    /// Finishes an interactive resize.
    pub fn end_resize(&mut self, handle: NativeId) {
        self.events.push_back(BackendEvent::ResizeFinished(handle));
    }

    /// Changes the decoration insets of every top-level window.
    pub fn set_frame_insets(&mut self, insets: Insets) {
        self.insets = insets;
        for &handle in &self.top_level {
            self.events.push_back(BackendEvent::FrameExtentsChanged(handle));
        }
    }

    // -- Internals --

    fn siblings_mut(&mut self, parent: Option<NativeId>) -> Option<&mut Vec<NativeId>> {
        match parent {
            None => Some(&mut self.top_level),
            Some(p) => self.window_mut(p).map(|w| &mut w.children),
        }
    }

    fn unlink(&mut self, handle: NativeId) {
        let Some(parent) = self.window(handle).map(HeadlessWindow::parent) else {
            return;
        };
        if let Some(list) = self.siblings_mut(parent) {
            list.retain(|&h| h != handle);
        }
    }

    fn restack(&mut self, handle: NativeId, place: impl FnOnce(&mut Vec<NativeId>)) {
        let Some(parent) = self.window(handle).map(HeadlessWindow::parent) else {
            return;
        };
        if let Some(list) = self.siblings_mut(parent) {
            list.retain(|&h| h != handle);
            place(list);
        }
    }

    fn record(&mut self, call: BackendCall, handle: NativeId) {
        self.log.push((call, handle));
    }
}

impl WindowBackend for HeadlessBackend {
    fn initialize(&mut self) -> Result<(), BackendError> {
        self.initialized = true;
        Ok(())
    }

    fn create(&mut self, params: &CreateParams) -> Result<NativeId, BackendError> {
        if !self.initialized {
            return Err(BackendError::NotInitialized);
        }
        if self.failing_creates > 0 {
            self.failing_creates -= 1;
            return Err(BackendError::ResourceExhausted);
        }
        if let Some(parent) = params.parent
            && self.window(parent).is_none()
        {
            return Err(BackendError::InvalidHandle);
        }
        let window = HeadlessWindow {
            widget: params.widget,
            window_type: params.window_type,
            parent: params.parent,
            children: Vec::new(),
            rect: params.geometry,
            mapped: false,
            translucent: params.translucent,
            mask: None,
            presented: Region::new(),
            present_count: 0,
        };
        let slot = match self.windows.iter().position(Option::is_none) {
            Some(slot) => {
                self.windows[slot] = Some(window);
                slot
            }
            None => {
                self.windows.push(Some(window));
                self.windows.len() - 1
            }
        };
        let handle = NativeId(slot as u64 + 1);
        if let Some(list) = self.siblings_mut(params.parent) {
            list.push(handle);
        }
        self.record(BackendCall::Create, handle);
        Ok(handle)
    }

    fn destroy(&mut self, handle: NativeId) {
        let Some(children) = self.window(handle).map(|w| w.children.clone()) else {
            return;
        };
        // The window server destroys native descendants with their parent.
        for child in children {
            self.destroy(child);
        }
        self.unlink(handle);
        if let Some(slot) = usize::try_from(handle.0 - 1).ok()
            && let Some(entry) = self.windows.get_mut(slot)
        {
            *entry = None;
        }
        self.events.retain(|e| e.handle() != handle);
        self.record(BackendCall::Destroy, handle);
    }

    fn map(&mut self, handle: NativeId) {
        let Some(w) = self.window_mut(handle) else {
            return;
        };
        w.mapped = true;
        let top_level = w.parent.is_none();
        self.record(BackendCall::Map, handle);
        if top_level {
            self.events.push_back(BackendEvent::Mapped(handle));
        }
    }

    fn unmap(&mut self, handle: NativeId) {
        if let Some(w) = self.window_mut(handle) {
            w.mapped = false;
            self.record(BackendCall::Unmap, handle);
        }
    }

    fn move_to(&mut self, handle: NativeId, pos: Point) {
        if let Some(w) = self.window_mut(handle) {
            w.rect = Rect::from_origin_size(pos, w.rect.size());
            self.record(BackendCall::Move, handle);
        }
    }

    fn resize(&mut self, handle: NativeId, size: Size) {
        if let Some(w) = self.window_mut(handle) {
            w.rect = Rect::from_origin_size(w.rect.origin(), size);
            self.record(BackendCall::Resize, handle);
        }
    }

    fn raise(&mut self, handle: NativeId) {
        self.restack(handle, |list| list.push(handle));
        self.record(BackendCall::Raise, handle);
    }

    fn lower(&mut self, handle: NativeId) {
        self.restack(handle, |list| list.insert(0, handle));
        self.record(BackendCall::Lower, handle);
    }

    fn stack_under(&mut self, handle: NativeId, sibling: NativeId) {
        self.restack(handle, |list| {
            let at = list.iter().position(|&h| h == sibling).unwrap_or(0);
            list.insert(at, handle);
        });
        self.record(BackendCall::StackUnder, handle);
    }

    fn set_mask(&mut self, handle: NativeId, mask: Option<&Region>) {
        if let Some(w) = self.window_mut(handle) {
            w.mask = mask.cloned();
            self.record(BackendCall::SetMask, handle);
        }
    }

    fn reparent(&mut self, handle: NativeId, parent: Option<NativeId>, pos: Point) {
        if self.window(handle).is_none() {
            return;
        }
        self.unlink(handle);
        if let Some(w) = self.window_mut(handle) {
            w.parent = parent;
            w.rect = Rect::from_origin_size(pos, w.rect.size());
        }
        if let Some(list) = self.siblings_mut(parent) {
            list.push(handle);
        }
        self.record(BackendCall::Reparent, handle);
    }

    fn present(&mut self, handle: NativeId, region: &Region) {
        if let Some(w) = self.window_mut(handle) {
            w.presented.union(region);
            w.present_count += 1;
        }
    }

    fn frame_extents(&mut self, handle: NativeId) -> Insets {
        match self.window(handle) {
            Some(w) if w.parent.is_none() => self.insets,
            _ => Insets::ZERO,
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }
}
