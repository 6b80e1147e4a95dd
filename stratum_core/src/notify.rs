// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural and lifecycle notifications.
//!
//! The compositor appends a [`Notification`] for every observable change and
//! never reads the queue back. Higher layers (reflection, accessibility,
//! event dispatch) drain it with
//! [`Compositor::drain_notifications`](crate::Compositor::drain_notifications).

use kurbo::{Point, Size};

use crate::error::BackendError;
use crate::widget::{NativeId, WidgetId};

/// An observable change to a widget.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Resources were allocated. Always precedes the widget's first paint
    /// or map.
    Created(WidgetId),
    /// Native allocation failed; the widget stays pending.
    CreateFailed(WidgetId, BackendError),
    /// The widget became visible.
    Shown(WidgetId),
    /// The widget was hidden.
    Hidden(WidgetId),
    /// The widget moved.
    Moved {
        /// Widget that moved.
        widget: WidgetId,
        /// Previous position in parent coordinates.
        old: Point,
        /// New position in parent coordinates.
        new: Point,
    },
    /// The widget was resized.
    Resized {
        /// Widget that was resized.
        widget: WidgetId,
        /// Previous size.
        old: Size,
        /// New size.
        new: Size,
    },
    /// The widget's position among its siblings changed.
    ZOrderChanged(WidgetId),
    /// The widget moved to a different parent.
    ParentChanged {
        /// Widget that moved.
        widget: WidgetId,
        /// Parent before the change.
        old: Option<WidgetId>,
        /// Parent after the change.
        new: Option<WidgetId>,
    },
    /// A child was attached.
    ChildAdded {
        /// New parent.
        parent: WidgetId,
        /// Attached child.
        child: WidgetId,
    },
    /// A child was detached.
    ChildRemoved {
        /// Former parent.
        parent: WidgetId,
        /// Detached child.
        child: WidgetId,
    },
    /// The widget was destroyed; its handle is now stale.
    Destroyed(WidgetId),
    /// A pending layout must run.
    LayoutRequest(WidgetId),
    /// The widget's native handle was assigned, replaced, or released.
    NativeHandleChanged {
        /// Widget whose handle changed.
        widget: WidgetId,
        /// New handle, if any.
        handle: Option<NativeId>,
    },
}

impl Notification {
    /// Returns the widget the notification is primarily about.
    #[must_use]
    pub fn widget(&self) -> WidgetId {
        match self {
            Self::Created(w)
            | Self::CreateFailed(w, _)
            | Self::Shown(w)
            | Self::Hidden(w)
            | Self::ZOrderChanged(w)
            | Self::Destroyed(w)
            | Self::LayoutRequest(w) => *w,
            Self::Moved { widget, .. }
            | Self::Resized { widget, .. }
            | Self::ParentChanged { widget, .. }
            | Self::NativeHandleChanged { widget, .. } => *widget,
            Self::ChildAdded { child, .. } | Self::ChildRemoved { child, .. } => *child,
        }
    }
}
