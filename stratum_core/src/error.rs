// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Invariant violations (stale handles, reparent cycles, corrupted focus
//! rings, creating windows before initialization) panic at the call site.
//! The enums here cover the conditions a caller can recover from or must be
//! told about.

use core::fmt;

use crate::widget::{NativeId, WidgetId};

/// Errors reported by a [`WindowBackend`](crate::backend::WindowBackend).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The backend was used before [`initialize`](crate::backend::WindowBackend::initialize).
    NotInitialized,
    /// The window system ran out of handles or memory.
    ResourceExhausted,
    /// The handle does not name a live native window.
    InvalidHandle(NativeId),
    /// The backend cannot perform the operation.
    Unsupported(&'static str),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "window backend not initialized"),
            Self::ResourceExhausted => write!(f, "native window allocation failed"),
            Self::InvalidHandle(id) => write!(f, "invalid native handle {id:?}"),
            Self::Unsupported(what) => write!(f, "unsupported backend operation: {what}"),
        }
    }
}

impl core::error::Error for BackendError {}

/// Errors returned by [`Compositor`](crate::Compositor) operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositorError {
    /// The backend failed; for native allocation the widget is left pending
    /// and creation is retried on the next `create` or `show`.
    Backend(BackendError),
    /// A synchronous repaint was requested while the window was painting.
    RecursiveRepaint(WidgetId),
    /// The widget already has a layout installed.
    LayoutAlreadySet(WidgetId),
    /// A tab order was requested between a widget and itself.
    TabOrderCycle(WidgetId),
    /// A tab order was requested between widgets of different windows.
    TabOrderAcrossWindows(WidgetId, WidgetId),
}

impl fmt::Display for CompositorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "backend error: {err}"),
            Self::RecursiveRepaint(id) => {
                write!(f, "recursive repaint of {id:?} during an active paint pass")
            }
            Self::LayoutAlreadySet(id) => write!(f, "{id:?} already has a layout"),
            Self::TabOrderCycle(id) => write!(f, "tab order cycle through {id:?} and itself"),
            Self::TabOrderAcrossWindows(a, b) => {
                write!(f, "{a:?} and {b:?} are in different windows")
            }
        }
    }
}

impl core::error::Error for CompositorError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for CompositorError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}
