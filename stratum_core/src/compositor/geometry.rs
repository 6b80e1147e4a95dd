// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry changes, size bounds, and scrolling.

use kurbo::{Point, Rect, Size, Vec2};

use super::{Compositor, trace_call};
use crate::backend::WindowBackend;
use crate::notify::Notification;
use crate::paint::Rasterizer;
use crate::region::{Region, intersect_rects, rect_is_empty};
use crate::trace::{BackendCall, Tracer};
use crate::widget::{WidgetFlags, WidgetId};

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Sets the widget's geometry in parent coordinates (screen coordinates
    /// for top-level windows). The size is clamped to the widget's bounds.
    pub fn set_geometry(&mut self, id: WidgetId, rect: Rect) {
        self.set_geometry_traced(id, rect, &mut Tracer::none());
    }

    /// [`set_geometry`](Self::set_geometry) with tracing.
    pub fn set_geometry_traced(&mut self, id: WidgetId, rect: Rect, tracer: &mut Tracer<'_>) {
        self.tree.validate(id);
        self.set_geometry_at(id.idx, rect, tracer);
    }

    /// Moves the widget, keeping its size.
    pub fn move_widget(&mut self, id: WidgetId, pos: Point) {
        let size = self.tree.rect(id).size();
        self.set_geometry(id, Rect::from_origin_size(pos, size));
    }

    /// Resizes the widget, keeping its position.
    pub fn resize_widget(&mut self, id: WidgetId, size: Size) {
        let origin = self.tree.rect(id).origin();
        self.set_geometry(id, Rect::from_origin_size(origin, size));
    }

    /// Sets the minimum size, raising the maximum if needed, and re-clamps
    /// the current geometry.
    pub fn set_minimum_size(&mut self, id: WidgetId, min: Size) {
        self.tree.validate(id);
        let min = Size::new(min.width.max(0.0), min.height.max(0.0));
        let old_max = self.tree.max_size[id.idx as usize];
        let max = Size::new(old_max.width.max(min.width), old_max.height.max(min.height));
        self.apply_size_bounds(id.idx, min, max);
    }

    /// Sets the maximum size, lowering the minimum if needed, and re-clamps
    /// the current geometry.
    pub fn set_maximum_size(&mut self, id: WidgetId, max: Size) {
        self.tree.validate(id);
        let max = Size::new(max.width.max(0.0), max.height.max(0.0));
        let old_min = self.tree.min_size[id.idx as usize];
        let min = Size::new(old_min.width.min(max.width), old_min.height.min(max.height));
        self.apply_size_bounds(id.idx, min, max);
    }

    fn apply_size_bounds(&mut self, idx: u32, min: Size, max: Size) {
        self.tree.set_size_bounds_at(idx, min, max);
        let rect = self.tree.rect[idx as usize];
        let clamped = self.tree.clamp_size_at(idx, rect.size());
        if clamped != rect.size() {
            let rect = Rect::from_origin_size(rect.origin(), clamped);
            self.set_geometry_at(idx, rect, &mut Tracer::none());
        }
    }

    /// Scrolls the widget's content by `(dx, dy)`.
    ///
    /// Without `rect`, non-window children move along and the whole widget
    /// repaints. With `rect` (widget coordinates), only that area scrolls and
    /// children stay put. Pending dirty regions of the widget move with the
    /// content.
    pub fn scroll(&mut self, id: WidgetId, dx: f64, dy: f64, rect: Option<Rect>) {
        self.tree.validate(id);
        let idx = id.idx;
        let delta = Vec2::new(dx, dy);
        if delta == Vec2::ZERO {
            return;
        }
        let mut tracer = Tracer::none();

        let scroll_rect = match rect {
            Some(r) => r,
            None => {
                for child in self.child_indices(idx) {
                    if self.tree.is_window_at(child) {
                        continue;
                    }
                    let old = self.tree.rect[child as usize];
                    self.tree.set_rect_at(child, old + delta);
                    if let Some(handle) = self.tree.native[child as usize] {
                        let pos = self.native_pos_at(child);
                        trace_call(&mut tracer, BackendCall::Move, self.tree.id_at(child), Some(handle));
                        self.backend.move_to(handle, pos);
                    }
                    self.notify_geometry(child, old);
                }
                self.tree.local_rect_at(idx)
            }
        };

        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::VISIBLE) || flags.contains(WidgetFlags::UPDATES_DISABLED) {
            return;
        }
        let scroll_rect = intersect_rects(scroll_rect, self.tree.clip_rect_at(idx));
        if rect_is_empty(scroll_rect) {
            return;
        }

        let window = self.tree.window_at(idx);
        if let Some(store) = self.stores.get_mut(&window) {
            store.translate_widget_dirty(id, delta, scroll_rect);
        }

        let mut region = Region::from_rect(scroll_rect);
        self.tree.refresh_opaque_cache();
        if self.tree.is_overlapped_at(idx, scroll_rect) {
            self.tree.subtract_opaque_siblings_at(idx, &mut region);
        }
        self.invalidate_buffer_at(idx, region, &mut tracer);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn set_geometry_at(&mut self, idx: u32, rect: Rect, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        let old = self.tree.rect[idx as usize];
        let size = self.tree.clamp_size_at(idx, rect.size());
        let new = Rect::from_origin_size(rect.origin(), size);
        let is_window = self.tree.is_window_at(idx);
        if new == old && !is_window {
            return;
        }
        let moved = old.origin() != new.origin();
        let resized = old.size() != new.size();
        let flags = self.tree.flags[idx as usize];

        self.tree.set_rect_at(idx, new);

        if is_window {
            if flags.contains(WidgetFlags::CREATED) {
                self.window_geometry_sys(idx, moved, resized, tracer);
            }
        } else {
            if let Some(handle) = self.tree.native[idx as usize] {
                if moved {
                    let pos = self.native_pos_at(idx);
                    trace_call(tracer, BackendCall::Move, id, Some(handle));
                    self.backend.move_to(handle, pos);
                }
                if resized {
                    trace_call(tracer, BackendCall::Resize, id, Some(handle));
                    self.backend.resize(handle, size);
                }
            } else if moved {
                self.move_native_descendants(idx, tracer);
            }
            if flags.contains(WidgetFlags::VISIBLE) {
                self.invalidate_geometry_change(idx, old, new, tracer);
            }
        }

        self.notify_geometry(idx, old);
    }

    /// Forwards a top-level geometry change to the backend.
    fn window_geometry_sys(&mut self, idx: u32, moved: bool, resized: bool, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        let Some(handle) = self.tree.native[idx as usize] else {
            return;
        };
        let rect = self.tree.rect[idx as usize];
        let flags = self.tree.flags[idx as usize];

        if rect.is_zero_area() {
            self.tree.insert_flags_at(idx, WidgetFlags::OUTSIDE_WS_RANGE);
            if flags.contains(WidgetFlags::VISIBLE | WidgetFlags::MAPPED) {
                trace_call(tracer, BackendCall::Unmap, id, Some(handle));
                self.backend.unmap(handle);
                for w in self.window_subtree(idx) {
                    self.tree
                        .remove_flags_at(w, WidgetFlags::MAPPED | WidgetFlags::WAITING_FOR_MAP);
                }
            }
            return;
        }

        let was_outside = flags.contains(WidgetFlags::OUTSIDE_WS_RANGE);
        self.tree.remove_flags_at(idx, WidgetFlags::OUTSIDE_WS_RANGE);
        if moved || was_outside {
            trace_call(tracer, BackendCall::Move, id, Some(handle));
            self.backend.move_to(handle, rect.origin());
        }
        if resized || was_outside {
            trace_call(tracer, BackendCall::Resize, id, Some(handle));
            self.backend.resize(handle, rect.size());
        }
        if was_outside && flags.contains(WidgetFlags::VISIBLE) {
            trace_call(tracer, BackendCall::Map, id, Some(handle));
            self.backend.map(handle);
            self.tree.insert_flags_at(idx, WidgetFlags::WAITING_FOR_MAP);
            for w in self.window_subtree(idx) {
                if self.tree.flags[w as usize].contains(WidgetFlags::VISIBLE) {
                    self.tree.insert_flags_at(w, WidgetFlags::MAPPED);
                }
            }
        }
        if (resized || was_outside)
            && let Some(store) = self.stores.get_mut(&idx)
        {
            let request = store.request_full_update();
            self.apply_request(idx, request);
        }
    }

    /// Repaints what a visible child widget uncovered in its parent and the
    /// child itself.
    fn invalidate_geometry_change(&mut self, idx: u32, old: Rect, new: Rect, tracer: &mut Tracer<'_>) {
        let parent = self.tree.parent[idx as usize];
        let old_eff = self.effective_rect_for(idx, old);
        let new_eff = self.tree.effective_rect_at(idx);
        let local_new = self.tree.local_rect_at(idx);

        let static_resize = self.tree.flags[idx as usize].contains(WidgetFlags::STATIC_CONTENTS)
            && old.origin() == new.origin();
        if static_resize {
            // Old pixels stay valid; only newly exposed strips repaint.
            let mut fresh = Region::from_rect(local_new);
            fresh.subtract_rect(Rect::from_origin_size(Point::ORIGIN, old.size()));
            self.invalidate_buffer_at(idx, fresh, tracer);
        } else {
            self.invalidate_buffer_at(idx, Region::from_rect(local_new), tracer);
        }

        let mut uncovered = Region::from_rect(old_eff);
        uncovered.subtract_rect(new_eff);
        self.invalidate_buffer_at(parent, uncovered, tracer);
    }

    /// Geometry `rect` shrunk to the widget's mask bounds, in parent
    /// coordinates.
    fn effective_rect_for(&self, idx: u32, rect: Rect) -> Rect {
        match &self.tree.mask[idx as usize] {
            Some(mask) => {
                let r = intersect_rects(mask.bounding_rect() + rect.origin().to_vec2(), rect);
                if rect_is_empty(r) { Rect::ZERO } else { r }
            }
            None => rect,
        }
    }

    /// Position of a native child in its native parent's coordinates.
    pub(crate) fn native_pos_at(&self, idx: u32) -> Point {
        match self.tree.native_parent_at(idx) {
            Some(np) => self.tree.offset_to_ancestor_at(idx, np).to_point(),
            None => self.tree.rect[idx as usize].origin(),
        }
    }

    /// Repositions native widgets parented across the moved alien `idx`.
    fn move_native_descendants(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        for d in self.first_native_descendants(idx) {
            let Some(handle) = self.tree.native[d as usize] else {
                continue;
            };
            let pos = self.native_pos_at(d);
            trace_call(tracer, BackendCall::Move, self.tree.id_at(d), Some(handle));
            self.backend.move_to(handle, pos);
        }
    }

    /// Sends `Moved`/`Resized` for a change from `old`, or defers them while
    /// the widget is not shown.
    pub(crate) fn notify_geometry(&mut self, idx: u32, old: Rect) {
        let new = self.tree.rect[idx as usize];
        let moved = old.origin() != new.origin();
        let resized = old.size() != new.size();
        if !moved && !resized {
            return;
        }
        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::CREATED | WidgetFlags::VISIBLE) {
            if moved {
                self.tree.insert_flags_at(idx, WidgetFlags::MOVE_PENDING);
            }
            if resized {
                self.tree.insert_flags_at(idx, WidgetFlags::RESIZE_PENDING);
            }
            return;
        }
        self.send_geometry_notifications(idx, moved, resized);
    }

    /// Sends the geometry notifications deferred while the widget was hidden.
    pub(crate) fn send_pending_geometry(&mut self, idx: u32) {
        let flags = self.tree.flags[idx as usize];
        let moved = flags.contains(WidgetFlags::MOVE_PENDING);
        let resized = flags.contains(WidgetFlags::RESIZE_PENDING);
        self.tree
            .remove_flags_at(idx, WidgetFlags::MOVE_PENDING | WidgetFlags::RESIZE_PENDING);
        self.send_geometry_notifications(idx, moved, resized);
    }

    fn send_geometry_notifications(&mut self, idx: u32, moved: bool, resized: bool) {
        let id = self.tree.id_at(idx);
        let old = self.tree.notified_rect[idx as usize];
        let new = self.tree.rect[idx as usize];
        if moved && old.origin() != new.origin() {
            self.notify(Notification::Moved {
                widget: id,
                old: old.origin(),
                new: new.origin(),
            });
        }
        if resized && old.size() != new.size() {
            self.notify(Notification::Resized {
                widget: id,
                old: old.size(),
                new: new.size(),
            });
        }
        self.tree.notified_rect[idx as usize] = new;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::{Point, Rect, Size, Vec2};

    use crate::compositor::tests::{child, compositor, compositor_with, shown_window};
    use crate::config::CompositorConfig;
    use crate::notify::Notification;
    use crate::region::Region;
    use crate::testing::Call;
    use crate::widget::{WidgetFlags, WindowType};

    #[test]
    fn hidden_widget_defers_geometry_notifications() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = c.create_widget(Some(w), WindowType::Widget);
        c.drain_notifications();

        c.set_geometry(a, Rect::new(5.0, 5.0, 25.0, 15.0));
        c.move_widget(a, Point::new(7.0, 7.0));
        assert!(c.drain_notifications().is_empty());
        assert!(c.tree().test(a, WidgetFlags::MOVE_PENDING | WidgetFlags::RESIZE_PENDING));

        c.show(a).unwrap();
        let n = c.drain_notifications();
        assert!(n.contains(&Notification::Moved {
            widget: a,
            old: Point::ORIGIN,
            new: Point::new(7.0, 7.0),
        }));
        assert!(n.contains(&Notification::Resized {
            widget: a,
            old: Size::new(100.0, 30.0),
            new: Size::new(20.0, 10.0),
        }));
        let moved = n.iter().position(|n| matches!(n, Notification::Moved { .. })).unwrap();
        let shown = n.iter().position(|n| *n == Notification::Shown(a)).unwrap();
        assert!(moved < shown);
    }

    #[test]
    fn visible_widget_notifies_in_call_order() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 10.0, 10.0));
        c.drain_notifications();

        c.move_widget(a, Point::new(1.0, 0.0));
        c.resize_widget(a, Size::new(20.0, 10.0));
        c.move_widget(a, Point::new(2.0, 0.0));
        let n = c.drain_notifications();
        assert_eq!(n.len(), 3);
        assert!(matches!(n[0], Notification::Moved { .. }));
        assert!(matches!(n[1], Notification::Resized { .. }));
        assert_eq!(
            n[2],
            Notification::Moved {
                widget: a,
                old: Point::new(1.0, 0.0),
                new: Point::new(2.0, 0.0),
            }
        );
    }

    #[test]
    fn unchanged_geometry_is_a_no_op() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 10.0, 10.0));
        c.process_pending();
        c.drain_notifications();
        c.set_geometry(a, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(c.drain_notifications().is_empty());
        assert!(!c.backing_store(w).unwrap().is_dirty());
    }

    #[test]
    fn size_is_clamped_to_bounds() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        c.set_minimum_size(w, Size::new(50.0, 50.0));
        c.set_geometry(w, Rect::new(0.0, 0.0, 10.0, 500.0));
        assert_eq!(c.tree().rect(w).size(), Size::new(50.0, 500.0));

        c.set_maximum_size(w, Size::new(40.0, 100.0));
        assert_eq!(c.tree().min_size(w), Size::new(40.0, 50.0), "minimum follows");
        assert_eq!(c.tree().rect(w).size(), Size::new(40.0, 100.0), "re-clamped");
    }

    #[test]
    fn moving_an_alien_repaints_old_and_new_area() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 20.0, 20.0));
        c.process_pending();
        c.rasterizer_mut().clear();

        c.move_widget(a, Point::new(50.0, 0.0));
        c.process_pending();
        let painted = c.rasterizer().painted.clone();
        let root = painted.iter().find(|p| p.widget == w).unwrap();
        assert!(root.region.contains_rect(Rect::new(0.0, 0.0, 20.0, 20.0)));
        let moved = painted.iter().find(|p| p.widget == a).unwrap();
        assert_eq!(moved.offset, Vec2::new(50.0, 0.0));
        assert!(moved.region.contains_rect(Rect::new(0.0, 0.0, 20.0, 20.0)));
    }

    #[test]
    fn native_child_moves_in_native_parent_coordinates() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(10.0, 10.0, 90.0, 90.0));
        let b = c.create_widget(Some(a), WindowType::Widget);
        c.set_attribute(
            b,
            WidgetFlags::NATIVE_WINDOW | WidgetFlags::DONT_CREATE_NATIVE_ANCESTORS,
            true,
        );
        c.set_geometry(b, Rect::new(5.0, 5.0, 15.0, 15.0));
        c.show(b).unwrap();
        let hb = c.tree().native_id(b).unwrap();

        c.move_widget(b, Point::new(6.0, 5.0));
        assert!(c.backend().calls.contains(&Call::MoveTo(hb, Point::new(16.0, 15.0))));

        c.move_widget(a, Point::new(20.0, 10.0));
        assert_eq!(
            c.backend().calls.last(),
            Some(&Call::MoveTo(hb, Point::new(26.0, 15.0))),
            "native descendant of a moved alien follows it"
        );
    }

    #[test]
    fn zero_size_window_is_unmapped_and_remapped() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let handle = c.tree().native_id(w).unwrap();

        c.set_geometry(w, Rect::new(0.0, 0.0, 0.0, 100.0));
        assert!(c.tree().test(w, WidgetFlags::OUTSIDE_WS_RANGE));
        assert!(!c.tree().test(w, WidgetFlags::MAPPED));
        assert_eq!(c.backend().calls.last(), Some(&Call::Unmap(handle)));

        c.set_geometry(w, Rect::new(0.0, 0.0, 80.0, 100.0));
        assert!(c.tree().test(w, WidgetFlags::MAPPED));
        assert_eq!(c.backend().calls.last(), Some(&Call::Map(handle)));
    }

    #[test]
    fn window_resize_repaints_everything() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        c.rasterizer_mut().clear();
        c.resize_widget(w, Size::new(300.0, 100.0));
        let handle = c.tree().native_id(w).unwrap();
        assert!(c.backend().calls.contains(&Call::Resize(handle, Size::new(300.0, 100.0))));
        c.process_pending();
        let root = &c.rasterizer().painted[0];
        assert_eq!(root.region, Region::from_rect(Rect::new(0.0, 0.0, 300.0, 100.0)));
    }

    #[test]
    fn static_contents_resize_repaints_new_strip_only() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 20.0, 20.0));
        c.set_attribute(a, WidgetFlags::STATIC_CONTENTS, true);
        c.process_pending();
        c.rasterizer_mut().clear();

        c.resize_widget(a, Size::new(30.0, 20.0));
        c.process_pending();
        let painted: Region = c
            .rasterizer()
            .painted
            .iter()
            .filter(|p| p.widget == a)
            .fold(Region::new(), |mut acc, p| {
                acc.union(&p.region);
                acc
            });
        assert_eq!(painted, Region::from_rect(Rect::new(20.0, 0.0, 30.0, 20.0)));
    }

    #[test]
    fn scroll_moves_children_and_pending_dirt() {
        let mut c = compositor_with(CompositorConfig::alien());
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 100.0, 100.0));
        let inner = child(&mut c, a, Rect::new(10.0, 10.0, 20.0, 20.0));
        c.process_pending();
        c.drain_notifications();

        c.scroll(a, 0.0, 5.0, None);
        assert_eq!(c.tree().rect(inner).origin(), Point::new(10.0, 15.0));
        assert_eq!(
            c.drain_notifications(),
            vec![Notification::Moved {
                widget: inner,
                old: Point::new(10.0, 10.0),
                new: Point::new(10.0, 15.0),
            }]
        );
        assert!(c.backing_store(w).unwrap().is_dirty());
    }

    #[test]
    fn scroll_of_hidden_widget_only_moves_children() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        let a = c.create_widget(Some(w), WindowType::Widget);
        c.scroll(w, 3.0, 0.0, None);
        assert!(c.tree().test(a, WidgetFlags::MOVE_PENDING));
        c.scroll(w, 0.0, 0.0, None);
    }
}
