// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget and native-window identity types.

use core::fmt;

/// Sentinel value indicating "no widget" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a widget in a [`WidgetTree`](super::WidgetTree).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a widget is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId {
    /// Slot index into the tree's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the tree's generation for this slot.
    pub(crate) generation: u32,
}

impl WidgetId {
    /// Rebuilds a handle from its raw parts, as when decoding a trace
    /// recording. Only the tree that issued the handle can resolve it.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({}@gen{})", self.idx, self.generation)
    }
}

/// A platform window handle handed out by a
/// [`WindowBackend`](crate::backend::WindowBackend).
///
/// Zero is reserved: [`WidgetTree::internal_id`](super::WidgetTree::internal_id)
/// reports `0` for alien widgets.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeId(pub u64);

impl fmt::Debug for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeId({:#x})", self.0)
    }
}

/// What kind of surface a widget is.
///
/// Anything other than [`Widget`](Self::Widget) is a window: it gets its own
/// native handle and backing store when created, is positioned in screen
/// coordinates, and never takes part in its parent's occlusion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// A child surface composited into its window.
    #[default]
    Widget,
    /// A regular top-level window.
    Window,
    /// A dialog window.
    Dialog,
    /// A popup (menus, completion lists). Raised when shown.
    Popup,
    /// A tool window. Raised when shown.
    Tool,
    /// A tooltip. Raised when shown.
    ToolTip,
}

impl WindowType {
    /// Returns `true` for every type except [`Widget`](Self::Widget).
    #[must_use]
    pub const fn is_window(self) -> bool {
        !matches!(self, Self::Widget)
    }

    /// Returns `true` for types that are raised above their siblings on show.
    #[must_use]
    pub const fn raises_on_show(self) -> bool {
        matches!(self, Self::Popup | Self::Tool | Self::ToolTip)
    }
}
