// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor configuration.

/// Configuration for the [`Compositor`](crate::Compositor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Every created child widget gets its own native handle.
    pub native_children: bool,
    /// Subtract opaque siblings stacked above a widget from its repaint
    /// region. Turning this off paints every overlapped pixel.
    pub subtract_opaque_siblings: bool,
    /// Suspend dirty bookkeeping while a top-level window is being resized
    /// interactively, then repaint it whole.
    pub resize_optimization: bool,
    /// A dirty region holding more rectangles than this collapses to its
    /// bounding box.
    pub max_dirty_rects: usize,
}

impl CompositorConfig {
    /// Alien children composited into their window's backing store.
    #[must_use]
    pub const fn alien() -> Self {
        Self {
            native_children: false,
            subtract_opaque_siblings: true,
            resize_optimization: true,
            max_dirty_rects: 32,
        }
    }

    /// Every child owns a native window; the resize optimization is off
    /// because native children repaint on their own.
    #[must_use]
    pub const fn native() -> Self {
        Self {
            native_children: true,
            subtract_opaque_siblings: true,
            resize_optimization: false,
            max_dirty_rects: 32,
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::alien()
    }
}
