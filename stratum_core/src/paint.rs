// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizer contract and the context handed to paint callbacks.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use crate::error::CompositorError;
use crate::region::Region;
use crate::widget::{WidgetId, WidgetTree};

/// Draws widget contents into a backing surface.
///
/// The backing store calls this during a sync, back to front, with regions
/// already clipped by masks and reduced by occlusion.
pub trait Rasterizer {
    /// Paints `widget` over `region` (widget coordinates). `offset` is the
    /// widget's origin in the backing surface.
    fn paint(
        &mut self,
        widget: WidgetId,
        region: &Region,
        offset: Vec2,
        ctx: &mut PaintContext<'_>,
    );

    /// Fills the widget's background over `region` before [`paint`](Self::paint).
    fn paint_background(&mut self, widget: WidgetId, region: &Region, offset: Vec2) {
        _ = (widget, region, offset);
    }
}

/// An update requested from inside a paint callback.
#[derive(Clone, Debug)]
pub(crate) struct PaintRequest {
    pub(crate) widget: WidgetId,
    pub(crate) region: Region,
}

/// What a paint callback may do while the backing store is painting.
///
/// `update` requests are queued and served on the next event-loop
/// iteration. Synchronous repaints are refused: the window is mid-paint.
#[derive(Debug)]
pub struct PaintContext<'a> {
    tree: &'a WidgetTree,
    widget: WidgetId,
    requests: &'a mut Vec<PaintRequest>,
}

impl<'a> PaintContext<'a> {
    pub(crate) fn new(
        tree: &'a WidgetTree,
        widget: WidgetId,
        requests: &'a mut Vec<PaintRequest>,
    ) -> Self {
        Self {
            tree,
            widget,
            requests,
        }
    }

    /// Returns the widget being painted.
    #[must_use]
    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    /// Returns the widget tree, read-only.
    #[must_use]
    pub fn tree(&self) -> &WidgetTree {
        self.tree
    }

    /// Queues an update of `region` (widget coordinates) of `widget` for the
    /// next event-loop iteration.
    pub fn update(&mut self, widget: WidgetId, region: Region) {
        if region.is_empty() {
            return;
        }
        self.requests.push(PaintRequest { widget, region });
    }

    /// Queues an update of a rectangle of `widget`.
    pub fn update_rect(&mut self, widget: WidgetId, rect: Rect) {
        self.update(widget, Region::from_rect(rect));
    }

    /// Requests a synchronous repaint.
    ///
    /// # Errors
    ///
    /// Always returns [`CompositorError::RecursiveRepaint`]: painting cannot
    /// nest. Use [`update`](Self::update) instead.
    pub fn repaint(&mut self, widget: WidgetId, region: &Region) -> Result<(), CompositorError> {
        _ = region;
        Err(CompositorError::RecursiveRepaint(widget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WindowType;

    #[test]
    fn updates_are_queued_and_repaints_refused() {
        let mut tree = WidgetTree::new();
        let w = tree.create(WindowType::Window);
        let mut requests = Vec::new();
        let mut ctx = PaintContext::new(&tree, w, &mut requests);

        ctx.update_rect(w, Rect::new(0.0, 0.0, 10.0, 10.0));
        ctx.update(w, Region::new());
        assert_eq!(
            ctx.repaint(w, &Region::from_rect(Rect::new(0.0, 0.0, 1.0, 1.0))),
            Err(CompositorError::RecursiveRepaint(w))
        );
        assert_eq!(ctx.widget(), w);

        assert_eq!(requests.len(), 1, "empty updates are dropped");
        assert_eq!(requests[0].widget, w);
    }
}
