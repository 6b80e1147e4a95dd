// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for native windowing integrations.
//!
//! The compositor never talks to a window system directly. Everything it
//! needs from one goes through [`WindowBackend`]: allocating and releasing
//! native handles, mapping, stacking, geometry, masks, and presenting painted
//! regions.
//!
//! Calls are fire-and-forget. A backend that learns something asynchronously
//! (the window manager mapped a window, moved it, exposed part of it) reports
//! it by handing a [`BackendEvent`] to
//! [`Compositor::handle_backend_event`](crate::Compositor::handle_backend_event).
//!
//! # Crate boundaries
//!
//! `stratum_core` owns the widget tree, occlusion, lifecycle, backing stores,
//! and this contract module. Backend crates depend on `stratum_core` and
//! provide platform glue; `stratum_backend_headless` is an in-memory
//! implementation used for tests and tooling.

use kurbo::{Insets, Point, Rect, Size};

use crate::error::BackendError;
use crate::region::Region;
use crate::widget::{NativeId, WidgetId, WindowType};

/// Parameters for allocating a native window.
#[derive(Clone, Debug)]
pub struct CreateParams {
    /// Widget the handle is for.
    pub widget: WidgetId,
    /// Native parent, or `None` for a top-level window.
    pub parent: Option<NativeId>,
    /// Geometry in the native parent's coordinates (screen coordinates for
    /// top-level windows).
    pub geometry: Rect,
    /// Kind of window to create.
    pub window_type: WindowType,
    /// The window needs an alpha channel.
    pub translucent: bool,
}

/// What a backend can do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Translucent alien widgets can be composited into their window.
    ///
    /// When `false`, a widget that turns on
    /// [`TRANSLUCENT_BACKGROUND`](crate::widget::WidgetFlags::TRANSLUCENT_BACKGROUND)
    /// is promoted to a native window.
    pub translucent_aliens: bool,
    /// The window manager reports decoration extents.
    pub frame_extents: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            translucent_aliens: true,
            frame_extents: true,
        }
    }
}

/// Asynchronous notifications from the window system.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// The window is now on screen.
    Mapped(NativeId),
    /// The window was taken off screen by the window system.
    Unmapped(NativeId),
    /// Part of the window must be redrawn, in window coordinates.
    Exposed {
        /// Window that was exposed.
        handle: NativeId,
        /// Exposed area.
        region: Region,
    },
    /// The window manager moved or resized the window.
    Configured {
        /// Window that changed.
        handle: NativeId,
        /// New geometry in screen coordinates.
        rect: Rect,
    },
    /// Decoration insets changed and must be re-queried.
    FrameExtentsChanged(NativeId),
    /// An interactive resize started.
    ResizeStarted(NativeId),
    /// An interactive resize finished.
    ResizeFinished(NativeId),
}

impl BackendEvent {
    /// Returns the handle the event is about.
    #[must_use]
    pub fn handle(&self) -> NativeId {
        match self {
            Self::Mapped(h)
            | Self::Unmapped(h)
            | Self::FrameExtentsChanged(h)
            | Self::ResizeStarted(h)
            | Self::ResizeFinished(h) => *h,
            Self::Exposed { handle, .. } | Self::Configured { handle, .. } => *handle,
        }
    }
}

/// A native windowing system.
///
/// Implementations allocate handles and forward operations to the platform.
/// Both real backends and test doubles implement this trait.
pub trait WindowBackend {
    /// Connects to the window system. Called once by
    /// [`Compositor::initialize`](crate::Compositor::initialize).
    ///
    /// # Errors
    ///
    /// Returns an error if the window system is unavailable.
    fn initialize(&mut self) -> Result<(), BackendError>;

    /// Allocates a native window.
    ///
    /// # Errors
    ///
    /// [`BackendError::ResourceExhausted`] when no handle can be allocated;
    /// the compositor leaves the widget pending and retries later.
    fn create(&mut self, params: &CreateParams) -> Result<NativeId, BackendError>;

    /// Releases a native window.
    fn destroy(&mut self, handle: NativeId);

    /// Puts a window on screen.
    fn map(&mut self, handle: NativeId);

    /// Takes a window off screen.
    fn unmap(&mut self, handle: NativeId);

    /// Moves a window, in its native parent's coordinates.
    fn move_to(&mut self, handle: NativeId, pos: Point);

    /// Resizes a window.
    fn resize(&mut self, handle: NativeId, size: Size);

    /// Raises a window above its siblings.
    fn raise(&mut self, handle: NativeId);

    /// Lowers a window below its siblings.
    fn lower(&mut self, handle: NativeId);

    /// Restacks `handle` directly below `sibling`.
    fn stack_under(&mut self, handle: NativeId, sibling: NativeId);

    /// Sets or clears a window's shape mask, in window coordinates.
    fn set_mask(&mut self, handle: NativeId, mask: Option<&Region>);

    /// Moves a window under a new native parent (`None` for the root).
    fn reparent(&mut self, handle: NativeId, parent: Option<NativeId>, pos: Point);

    /// Presents the painted `region` (window coordinates) of a window.
    fn present(&mut self, handle: NativeId, region: &Region);

    /// Returns the window manager's decoration insets for a top-level window.
    fn frame_extents(&mut self, handle: NativeId) -> Insets {
        _ = handle;
        Insets::ZERO
    }

    /// Reports what this backend supports.
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_handle_covers_struct_variants() {
        let handle = NativeId(7);
        let events = [
            BackendEvent::Mapped(handle),
            BackendEvent::Exposed {
                handle,
                region: Region::from_rect(Rect::new(0.0, 0.0, 1.0, 1.0)),
            },
            BackendEvent::Configured {
                handle,
                rect: Rect::ZERO,
            },
            BackendEvent::ResizeFinished(handle),
        ];
        for e in &events {
            assert_eq!(e.handle(), handle, "{e:?}");
        }
    }

    #[test]
    fn default_capabilities_composite_translucency() {
        let caps = BackendCapabilities::default();
        assert!(caps.translucent_aliens);
        assert!(caps.frame_extents);
    }
}
