// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update requests from threads other than the GUI thread.
//!
//! The compositor itself is single-threaded. A [`RemoteUpdater`] is the one
//! `Send` handle into it: other threads queue repaint requests, and the GUI
//! thread applies them at the start of the next
//! [`process_pending`](crate::compositor::Compositor::process_pending).

use std::sync::{Arc, Mutex, PoisonError};
use std::vec::Vec;

use kurbo::Rect;

use crate::widget::WidgetId;

/// Queue of repaint requests shared with a compositor.
///
/// Cloning is cheap; all clones feed the same queue. Requests for widgets
/// destroyed before they are applied are dropped.
#[derive(Clone, Debug, Default)]
pub struct RemoteUpdater {
    /// `None` repaints the whole widget.
    queue: Arc<Mutex<Vec<(WidgetId, Option<Rect>)>>>,
}

impl RemoteUpdater {
    /// Requests a repaint of the whole widget.
    pub fn update(&self, widget: WidgetId) {
        self.push(widget, None);
    }

    /// Requests a repaint of `rect` (widget coordinates).
    pub fn update_rect(&self, widget: WidgetId, rect: Rect) {
        self.push(widget, Some(rect));
    }

    /// Returns the number of requests not yet applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn take(&self) -> Vec<(WidgetId, Option<Rect>)> {
        core::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, widget: WidgetId, rect: Option<Rect>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((widget, rect));
    }
}
