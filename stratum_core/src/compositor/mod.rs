// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor: widget lifecycle, invalidation, and painting on top of a
//! [`WidgetTree`].
//!
//! [`Compositor`] owns everything: the tree, the process [`Context`], one
//! [`BackingStore`] per created window, the backend, and the rasterizer.
//! Every mutation takes `&mut self`, so there is exactly one GUI thread by
//! construction.
//!
//! Operations are grouped by concern:
//!
//! | Module       | Operations                                                      |
//! |--------------|-----------------------------------------------------------------|
//! | `visibility` | `show`, `hide`, `create`, `destroy_widget`, `visibility_state`  |
//! | `geometry`   | `set_geometry`, `move_widget`, `resize_widget`, `scroll`        |
//! | `stacking`   | `raise`, `lower`, `stack_under`                                 |
//! | `reparent`   | `set_parent`, `set_parent_with_type`                            |
//! | `events`     | `update`, `repaint`, `process_pending`, `handle_backend_event`  |
//!
//! Most entry points have a `_traced` variant taking a [`Tracer`]; the plain
//! variant passes [`Tracer::none`].

mod events;
mod geometry;
mod reparent;
mod stacking;
mod visibility;

pub use visibility::VisibilityState;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::any::Any;

use kurbo::{Insets, Rect};

use crate::backend::WindowBackend;
use crate::backing_store::{BackingStore, PaintEnv, UpdateRequest};
use crate::config::CompositorConfig;
use crate::context::Context;
use crate::dirty;
use crate::error::CompositorError;
use crate::notify::Notification;
use crate::paint::{PaintRequest, Rasterizer};
use crate::region::Region;
use crate::trace::{
    BackendCall, BackendCallEvent, LifecycleEvent, LifecycleTransition, Tracer,
};
use crate::widget::{AttributeEffects, NativeId, WidgetFlags, WidgetId, WidgetTree, effects_of};

/// Widget compositor over a window backend and a rasterizer.
#[derive(Debug)]
pub struct Compositor<B, R> {
    tree: WidgetTree,
    context: Context,
    config: CompositorConfig,
    backend: B,
    rasterizer: R,
    /// Backing stores keyed by window slot.
    stores: BTreeMap<u32, BackingStore>,
    notifications: Vec<Notification>,
    /// Windows with a queued update request, in post order.
    posted: Vec<WidgetId>,
    /// Updates requested from paint callbacks, served next iteration.
    paint_requests: Vec<PaintRequest>,
    sync_index: u64,
    #[cfg(feature = "std")]
    remote: crate::remote::RemoteUpdater,
}

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Creates a compositor. Call [`initialize`](Self::initialize) before
    /// creating widgets.
    #[must_use]
    pub fn new(backend: B, rasterizer: R, config: CompositorConfig) -> Self {
        let mut tree = WidgetTree::new();
        tree.set_subtract_opaque_siblings(config.subtract_opaque_siblings);
        Self {
            tree,
            context: Context::new(),
            config,
            backend,
            rasterizer,
            stores: BTreeMap::new(),
            notifications: Vec::new(),
            posted: Vec::new(),
            paint_requests: Vec::new(),
            sync_index: 0,
            #[cfg(feature = "std")]
            remote: crate::remote::RemoteUpdater::default(),
        }
    }

    /// Connects the backend. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the window system is unavailable.
    pub fn initialize(&mut self) -> Result<(), CompositorError> {
        if self.context.is_initialized() {
            return Ok(());
        }
        self.backend.initialize()?;
        self.context.set_initialized(true);
        Ok(())
    }

    /// Destroys every widget and disconnects.
    ///
    /// Only `Destroyed` notifications are queued while shutting down.
    /// Creating widgets afterwards panics until the next
    /// [`initialize`](Self::initialize).
    pub fn shutdown(&mut self) {
        if !self.context.is_initialized() {
            return;
        }
        self.context.set_closing_down(true);
        for root in self.tree.roots() {
            self.destroy_widget(root);
        }
        self.posted.clear();
        self.paint_requests.clear();
        self.context.set_closing_down(false);
        self.context.set_initialized(false);
    }

    // -- Accessors --

    /// Returns the widget tree.
    #[must_use]
    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    /// Returns the registry and grab state.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Returns the window backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the window backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Returns the rasterizer.
    #[must_use]
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Returns the rasterizer mutably.
    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    /// Returns the backing store of `window`, if it has been created.
    #[must_use]
    pub fn backing_store(&self, window: WidgetId) -> Option<&BackingStore> {
        self.tree.validate(window);
        self.stores.get(&window.idx)
    }

    /// Returns the number of syncs run so far.
    #[must_use]
    pub fn sync_count(&self) -> u64 {
        self.sync_index
    }

    // -- Widgets --

    /// Creates a hidden widget under `parent` (or a top-level widget).
    ///
    /// A child of a visible parent stays hidden until shown; a child of a
    /// hidden parent is shown along with it.
    ///
    /// # Panics
    ///
    /// Panics if the compositor is not initialized or `parent` is stale.
    pub fn create_widget(
        &mut self,
        parent: Option<WidgetId>,
        window_type: crate::widget::WindowType,
    ) -> WidgetId {
        assert!(
            self.context.is_initialized(),
            "widget created before the compositor was initialized"
        );
        let id = self.tree.create(window_type);
        if let Some(parent) = parent {
            let old_window = id.idx;
            self.tree.append_child(parent, id);
            self.tree.reparent_focus(id.idx, old_window);
            let parent_visible = self.tree.flags[parent.idx as usize].contains(WidgetFlags::VISIBLE);
            if !window_type.is_window() && !parent_visible {
                self.tree.remove_flags_at(id.idx, WidgetFlags::HIDDEN);
            }
            self.notify(Notification::ChildAdded { parent, child: id });
        }
        id
    }

    /// Sets or clears caller-settable attributes and runs their side effects.
    ///
    /// # Panics
    ///
    /// Panics if `attrs` contains compositor-owned state flags or `id` is
    /// stale.
    pub fn set_attribute(&mut self, id: WidgetId, attrs: WidgetFlags, on: bool) {
        self.tree.validate(id);
        assert!(
            WidgetFlags::ATTRIBUTES.contains(attrs),
            "cannot set internal state flags: {:?}",
            attrs.difference(WidgetFlags::ATTRIBUTES)
        );
        let idx = id.idx;
        let before = self.tree.flags[idx as usize];
        if on {
            self.tree.insert_flags_at(idx, attrs);
        } else {
            self.tree.remove_flags_at(idx, attrs);
        }
        let changed = before.symmetric_difference(self.tree.flags[idx as usize]);
        if changed.is_empty() {
            return;
        }

        let effects = effects_of(changed);
        let mut tracer = Tracer::none();
        if effects.contains(AttributeEffects::INVALIDATE_OPAQUE) {
            self.tree.mark_opaque_at(idx);
        }
        if effects.contains(AttributeEffects::INVALIDATE_BACKEND)
            && self.tree.flags[idx as usize].contains(WidgetFlags::CREATED)
            && self.tree.native[idx as usize].is_none()
            && self.needs_native_at(idx)
            && self.create_native_at(idx, &mut tracer).is_err()
        {
            // Reported as `CreateFailed`; the widget stays pending and is not
            // repainted until it has a handle.
            return;
        }
        if effects.contains(AttributeEffects::REPAINT) {
            let rect = self.tree.local_rect_at(idx);
            self.update_at(idx, Region::from_rect(rect), &mut tracer);
        }
    }

    /// Sets or clears the widget's mask (widget coordinates). An empty mask
    /// clears it.
    ///
    /// Only native widgets forward the mask to the backend; alien widgets are
    /// clipped while painting.
    pub fn set_mask(&mut self, id: WidgetId, mask: Option<Region>) {
        self.tree.validate(id);
        let idx = id.idx;
        let mask = mask.filter(|m| !m.is_empty());
        let old = self.tree.mask[idx as usize].clone();
        if old == mask {
            return;
        }
        self.tree.set_mask_at(idx, mask.clone());

        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::CREATED) {
            return;
        }
        let mut tracer = Tracer::none();
        if let Some(handle) = self.tree.native[idx as usize] {
            trace_call(&mut tracer, BackendCall::SetMask, id, Some(handle));
            self.backend.set_mask(handle, mask.as_ref());
        }
        if !flags.contains(WidgetFlags::VISIBLE) {
            return;
        }

        let rect = self.tree.local_rect_at(idx);
        let Some(new_mask) = mask else {
            // Everything outside the old mask is new.
            let mut expose = Region::from_rect(rect);
            if let Some(old) = &old {
                expose.subtract(old);
            }
            self.update_at(idx, expose, &mut tracer);
            return;
        };
        if self.tree.is_window_at(idx) {
            // The surface is reshaped; repaint what either shape shows.
            let mut area = old.unwrap_or_else(|| Region::from_rect(rect));
            area.union(&new_mask);
            self.update_at(idx, area, &mut tracer);
            return;
        }
        // The parent shows through where the widget no longer covers.
        let mut parent_expose = Region::from_rect(rect);
        parent_expose.subtract(&new_mask);
        if !parent_expose.is_empty() {
            parent_expose.translate(self.tree.pos_at(idx));
            let p = self.tree.parent[idx as usize];
            self.update_at(p, parent_expose, &mut tracer);
        }
        if let Some(old) = &old {
            self.update_at(idx, new_mask.difference(old), &mut tracer);
        }
    }

    /// Installs a layout on the widget; it runs on the next show.
    ///
    /// # Errors
    ///
    /// [`CompositorError::LayoutAlreadySet`] if one is installed already.
    pub fn install_layout(&mut self, id: WidgetId) -> Result<(), CompositorError> {
        self.tree.validate(id);
        if self.tree.test(id, WidgetFlags::HAS_LAYOUT) {
            return Err(CompositorError::LayoutAlreadySet(id));
        }
        self.tree
            .insert_flags_at(id.idx, WidgetFlags::HAS_LAYOUT | WidgetFlags::LAYOUT_PENDING);
        Ok(())
    }

    /// Marks the widget's layout as needing to run. Visible widgets get a
    /// `LayoutRequest` right away; hidden ones on their next show.
    pub fn invalidate_layout(&mut self, id: WidgetId) {
        self.tree.validate(id);
        if !self.tree.test(id, WidgetFlags::HAS_LAYOUT) {
            return;
        }
        if self.tree.test(id, WidgetFlags::VISIBLE) {
            self.notify(Notification::LayoutRequest(id));
        } else {
            self.tree.insert_flags_at(id.idx, WidgetFlags::LAYOUT_PENDING);
        }
    }

    /// Returns the window manager's decoration insets. Zero for non-windows
    /// and for windows that have no native handle yet.
    pub fn frame_strut(&mut self, id: WidgetId) -> Insets {
        self.tree.validate(id);
        if !self.tree.is_window_at(id.idx) {
            return Insets::ZERO;
        }
        self.refresh_frame_struts();
        self.tree.frame_strut[id.idx as usize]
    }

    /// Returns the widget's geometry including window decorations.
    pub fn frame_geometry(&mut self, id: WidgetId) -> Rect {
        let strut = self.frame_strut(id);
        self.tree.rect(id) + strut
    }

    fn refresh_frame_struts(&mut self) {
        let stale: Vec<u32> = self
            .tree
            .dirty
            .drain(dirty::FRAME_STRUT)
            .deterministic()
            .run()
            .collect();
        let supported = self.backend.capabilities().frame_extents;
        for idx in stale {
            if !self.tree.is_alive(self.tree.id_at(idx)) {
                continue;
            }
            match self.tree.native[idx as usize] {
                Some(handle) if supported && self.tree.is_window_at(idx) => {
                    self.tree.frame_strut[idx as usize] = self.backend.frame_extents(handle);
                }
                Some(_) => self.tree.frame_strut[idx as usize] = Insets::ZERO,
                // Query once the handle exists.
                None => self.tree.dirty.mark(idx, dirty::FRAME_STRUT),
            }
        }
    }

    /// Places `second` directly after `first` in the tab order.
    ///
    /// # Errors
    ///
    /// See [`WidgetTree::set_tab_order`].
    pub fn set_tab_order(
        &mut self,
        first: WidgetId,
        second: WidgetId,
    ) -> Result<(), CompositorError> {
        self.tree.set_tab_order(first, second)
    }

    /// Attaches higher-layer data to the widget.
    pub fn set_kind_data(&mut self, id: WidgetId, data: Box<dyn Any>) {
        self.tree.set_kind_data(id, data);
    }

    /// Returns the widget's kind data mutably, if it has type `T`.
    pub fn kind_data_mut<T: Any>(&mut self, id: WidgetId) -> Option<&mut T> {
        self.tree.kind_data_mut(id)
    }

    // -- Grabs --

    /// Gives the mouse grab to `id`, taking it from any other holder.
    pub fn grab_mouse(&mut self, id: WidgetId) -> Option<WidgetId> {
        self.tree.validate(id);
        self.context.grab_mouse(id)
    }

    /// Gives the keyboard grab to `id`, taking it from any other holder.
    pub fn grab_keyboard(&mut self, id: WidgetId) -> Option<WidgetId> {
        self.tree.validate(id);
        self.context.grab_keyboard(id)
    }

    /// Releases the mouse grab if `id` holds it.
    pub fn release_mouse(&mut self, id: WidgetId) {
        self.context.release_mouse(id);
    }

    /// Releases the keyboard grab if `id` holds it.
    pub fn release_keyboard(&mut self, id: WidgetId) {
        self.context.release_keyboard(id);
    }

    /// Returns and clears the queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        core::mem::take(&mut self.notifications)
    }

    // -----------------------------------------------------------------------
    // Crate-internal plumbing
    // -----------------------------------------------------------------------

    pub(crate) fn notify(&mut self, n: Notification) {
        if self.context.is_closing_down() && !matches!(n, Notification::Destroyed(_)) {
            return;
        }
        self.notifications.push(n);
    }

    /// Returns `true` if the widget must own a native handle once created.
    pub(crate) fn needs_native_at(&self, idx: u32) -> bool {
        let flags = self.tree.flags[idx as usize];
        self.tree.is_window_at(idx)
            || flags.contains(WidgetFlags::NATIVE_WINDOW)
            || self.config.native_children
            || (flags.contains(WidgetFlags::TRANSLUCENT_BACKGROUND)
                && !self.backend.capabilities().translucent_aliens)
    }

    /// Repaints `region` (local coordinates of `idx`) and everything that
    /// intersects it, through the window's composite region.
    pub(crate) fn invalidate_buffer_at(
        &mut self,
        idx: u32,
        region: Region,
        tracer: &mut Tracer<'_>,
    ) {
        if self.context.is_closing_down() || region.is_empty() {
            return;
        }
        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::VISIBLE) || flags.contains(WidgetFlags::UPDATES_DISABLED) {
            return;
        }
        let mut region = region;
        region.intersect_rect(self.tree.clip_rect_at(idx));
        if let Some(mask) = &self.tree.mask[idx as usize] {
            region.intersect(mask);
        }
        if region.is_empty() {
            return;
        }
        self.mark_at(idx, &region, false, true, tracer);
    }

    /// Schedules a repaint of `region` (local coordinates of `idx`).
    pub(crate) fn update_at(&mut self, idx: u32, region: Region, tracer: &mut Tracer<'_>) {
        if self.context.is_closing_down() {
            return;
        }
        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::VISIBLE) || flags.contains(WidgetFlags::UPDATES_DISABLED) {
            return;
        }
        let mut region = region;
        region.intersect_rect(self.tree.local_rect_at(idx));
        if region.is_empty() {
            return;
        }
        self.mark_at(idx, &region, false, false, tracer);
    }

    /// Repaints `region` (local coordinates of `idx`) before returning.
    pub(crate) fn repaint_at(
        &mut self,
        idx: u32,
        region: Region,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        let window = self.tree.window_at(idx);
        if self.stores.get(&window).is_some_and(BackingStore::is_flushing) {
            return Err(CompositorError::RecursiveRepaint(self.tree.id_at(idx)));
        }
        if self.context.is_closing_down() {
            return Ok(());
        }
        let flags = self.tree.flags[idx as usize];
        if !flags.contains(WidgetFlags::VISIBLE) || flags.contains(WidgetFlags::UPDATES_DISABLED) {
            return Ok(());
        }
        let mut region = region;
        region.intersect_rect(self.tree.local_rect_at(idx));
        if region.is_empty() {
            return Ok(());
        }
        if self.mark_at(idx, &region, true, false, tracer) == UpdateRequest::Immediate {
            self.sync_window(window, true, tracer)?;
        }
        Ok(())
    }

    fn mark_at(
        &mut self,
        idx: u32,
        region: &Region,
        immediate: bool,
        invalidate_buffer: bool,
        tracer: &mut Tracer<'_>,
    ) -> UpdateRequest {
        let window = self.tree.window_at(idx);
        let Some(store) = self.stores.get_mut(&window) else {
            return UpdateRequest::None;
        };
        let id = self.tree.id_at(idx);
        let request = store.mark_dirty(&self.tree, id, region, immediate, invalidate_buffer, tracer);
        self.apply_request(window, request);
        request
    }

    /// Queues the window for the next event-loop iteration if asked to.
    pub(crate) fn apply_request(&mut self, window: u32, request: UpdateRequest) {
        if request == UpdateRequest::Post {
            let id = self.tree.id_at(window);
            if !self.posted.contains(&id) {
                self.posted.push(id);
            }
        }
    }

    /// Runs one sync of `window`'s backing store. Returns `true` if the
    /// store painted or presented.
    pub(crate) fn sync_window(
        &mut self,
        window: u32,
        in_repaint: bool,
        tracer: &mut Tracer<'_>,
    ) -> Result<bool, CompositorError> {
        let Self {
            tree,
            backend,
            rasterizer,
            stores,
            paint_requests,
            sync_index,
            ..
        } = self;
        let Some(store) = stores.get_mut(&window) else {
            return Ok(false);
        };
        *sync_index += 1;
        let mut env = PaintEnv {
            tree,
            backend,
            rasterizer,
            requests: paint_requests,
            tracer,
            sync_index: *sync_index,
            in_repaint,
            summary: None,
        };
        store.sync(&mut env)
    }

    /// Serves an expose of `region` on the native widget `idx`.
    pub(crate) fn sync_exposed_at(
        &mut self,
        idx: u32,
        region: &Region,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompositorError> {
        let window = self.tree.window_at(idx);
        let id = self.tree.id_at(idx);
        let Self {
            tree,
            backend,
            rasterizer,
            stores,
            paint_requests,
            sync_index,
            ..
        } = self;
        let Some(store) = stores.get_mut(&window) else {
            return Ok(());
        };
        *sync_index += 1;
        let mut env = PaintEnv {
            tree,
            backend,
            rasterizer,
            requests: paint_requests,
            tracer,
            sync_index: *sync_index,
            in_repaint: false,
            summary: None,
        };
        store.sync_exposed(&mut env, id, region)
    }

    /// Drops pending dirty entries of `idx`'s subtree from its window's
    /// store.
    pub(crate) fn remove_dirty_subtree(&mut self, idx: u32) {
        let window = self.tree.window_at(idx);
        if let Some(store) = self.stores.get_mut(&window) {
            store.remove_dirty_widget(&self.tree, idx);
        }
    }

    /// Returns `true` if the window's resize optimization must stay off:
    /// some widget has static contents or a native child exists.
    pub(crate) fn resize_optimization_blocked(&self, window: u32) -> bool {
        crate::widget::traverse::subtree_preorder(&self.tree, window)
            .into_iter()
            .filter(|&i| i == window || !self.tree.is_window_at(i))
            .any(|i| {
                self.tree.flags[i as usize].contains(WidgetFlags::STATIC_CONTENTS)
                    || (i != window && self.tree.native[i as usize].is_some())
            })
    }
}

/// Records a backend call on `tracer`.
pub(crate) fn trace_call(
    tracer: &mut Tracer<'_>,
    call: BackendCall,
    widget: WidgetId,
    handle: Option<NativeId>,
) {
    tracer.backend_call(&BackendCallEvent {
        call,
        widget,
        handle,
    });
}

/// Records a lifecycle transition on `tracer`.
pub(crate) fn trace_lifecycle(
    tracer: &mut Tracer<'_>,
    widget: WidgetId,
    transition: LifecycleTransition,
) {
    tracer.lifecycle(&LifecycleEvent { widget, transition });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend, RecordingRasterizer};
    use crate::widget::WindowType;

    pub(crate) type TestCompositor = Compositor<RecordingBackend, RecordingRasterizer>;

    pub(crate) fn compositor() -> TestCompositor {
        compositor_with(CompositorConfig::default())
    }

    pub(crate) fn compositor_with(config: CompositorConfig) -> TestCompositor {
        let mut c = Compositor::new(RecordingBackend::new(), RecordingRasterizer::default(), config);
        c.initialize().unwrap();
        c
    }

    /// Creates, shows, and confirms the map of a 200x100 window.
    pub(crate) fn shown_window(c: &mut TestCompositor) -> WidgetId {
        let w = c.create_widget(None, WindowType::Window);
        c.set_geometry(w, Rect::new(0.0, 0.0, 200.0, 100.0));
        c.show(w).unwrap();
        confirm_map(c, w);
        w
    }

    pub(crate) fn confirm_map(c: &mut TestCompositor, w: WidgetId) {
        let handle = c.tree().native_id(w).unwrap();
        c.handle_backend_event(crate::backend::BackendEvent::Mapped(handle));
        c.process_pending();
    }

    pub(crate) fn child(c: &mut TestCompositor, parent: WidgetId, rect: Rect) -> WidgetId {
        let w = c.create_widget(Some(parent), WindowType::Widget);
        c.set_geometry(w, rect);
        c.show(w).unwrap();
        w
    }

    #[test]
    #[should_panic(expected = "widget created before the compositor was initialized")]
    fn creating_before_initialize_panics() {
        let mut c = Compositor::new(
            RecordingBackend::new(),
            RecordingRasterizer::default(),
            CompositorConfig::default(),
        );
        c.create_widget(None, WindowType::Window);
    }

    #[test]
    fn initialize_runs_once() {
        let mut c = compositor();
        c.initialize().unwrap();
        assert_eq!(c.backend().count(|call| *call == Call::Initialize), 1);
    }

    #[test]
    fn children_of_hidden_parents_follow_the_parent() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        let a = c.create_widget(Some(w), WindowType::Widget);
        assert!(!c.tree().test(a, WidgetFlags::HIDDEN), "shown with its parent");
        c.show(w).unwrap();
        let b = c.create_widget(Some(w), WindowType::Widget);
        assert!(c.tree().test(b, WidgetFlags::HIDDEN), "visible parent: stays hidden");
        assert!(c.tree().is_visible(a));
        assert!(!c.tree().is_visible(b));
    }

    #[test]
    #[should_panic(expected = "cannot set internal state flags")]
    fn setting_state_flags_panics() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        c.set_attribute(w, WidgetFlags::VISIBLE, true);
    }

    #[test]
    fn opaque_attribute_invalidates_parent_cache() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        c.update(w);
        c.process_pending();
        assert!(c.tree().opaque_children_region(w).is_empty());

        c.set_attribute(a, WidgetFlags::OPAQUE_PAINT, true);
        assert_eq!(
            c.tree().opaque_region(a).area(),
            2500.0,
            "read without a sync in between"
        );
        assert_eq!(
            c.tree().opaque_children_region(w),
            Region::from_rect(Rect::new(0.0, 0.0, 50.0, 50.0))
        );
    }

    #[test]
    fn native_window_attribute_creates_handle_for_created_widget() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(c.tree().internal_id(a), 0, "alien by default");

        c.set_attribute(a, WidgetFlags::NATIVE_WINDOW, true);
        let handle = c.tree().native_id(a).expect("promoted to native");
        assert_eq!(c.context().widget_for(handle), Some(a));
        assert!(c.backend().calls.contains(&Call::Map(handle)), "visible: mapped at once");
    }

    #[test]
    fn translucent_widget_is_promoted_without_alien_translucency() {
        let mut backend = RecordingBackend::new();
        backend.capabilities.translucent_aliens = false;
        let mut c = Compositor::new(
            backend,
            RecordingRasterizer::default(),
            CompositorConfig::default(),
        );
        c.initialize().unwrap();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        c.set_attribute(a, WidgetFlags::TRANSLUCENT_BACKGROUND, true);
        assert!(c.tree().native_id(a).is_some());
    }

    #[test]
    fn failed_promotion_leaves_the_widget_pending() {
        let mut backend = RecordingBackend::new();
        backend.capabilities.translucent_aliens = false;
        let mut c = Compositor::new(
            backend,
            RecordingRasterizer::default(),
            CompositorConfig::default(),
        );
        c.initialize().unwrap();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        c.process_pending();
        c.drain_notifications();

        c.backend_mut().fail_creates = 1;
        c.set_attribute(a, WidgetFlags::TRANSLUCENT_BACKGROUND, true);
        assert!(c.tree().native_id(a).is_none());
        assert!(c.tree().test(a, WidgetFlags::CREATE_PENDING));
        assert!(
            c.drain_notifications()
                .contains(&Notification::CreateFailed(a, crate::error::BackendError::ResourceExhausted)),
            "the failure is reported"
        );
        assert!(!c.backing_store(w).unwrap().is_dirty(), "no repaint without a handle");
    }

    #[test]
    fn updates_disabled_drops_updates() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        c.set_attribute(w, WidgetFlags::UPDATES_DISABLED, true);
        c.update(w);
        assert!(!c.backing_store(w).unwrap().is_dirty());
        c.set_attribute(w, WidgetFlags::UPDATES_DISABLED, false);
        assert!(c.backing_store(w).unwrap().is_dirty(), "re-enabling repaints");
    }

    #[test]
    fn mask_is_forwarded_only_for_native_widgets() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let a = child(&mut c, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        let mask = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));

        c.set_mask(a, Some(mask.clone()));
        assert_eq!(c.backend().count(|call| matches!(call, Call::SetMask(..))), 0);
        assert_eq!(c.tree().mask(a), Some(&mask));

        c.set_mask(w, Some(mask.clone()));
        let handle = c.tree().native_id(w).unwrap();
        assert!(c.backend().calls.contains(&Call::SetMask(handle, Some(mask))));

        c.set_mask(a, Some(Region::new()));
        assert_eq!(c.tree().mask(a), None, "an empty mask clears it");
    }

    #[test]
    fn window_mask_change_repaints_the_window() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let left = Rect::new(0.0, 0.0, 50.0, 50.0);
        let right = Rect::new(100.0, 0.0, 150.0, 50.0);

        c.set_mask(w, Some(Region::from_rect(left)));
        assert_eq!(c.process_pending(), 1, "the reshaped window repaints");
        let (_, presented) = c.backend().presents().last().cloned().unwrap();
        assert_eq!(presented, Region::from_rect(left));

        c.set_mask(w, Some(Region::from_rect(right)));
        assert_eq!(c.process_pending(), 1);
        let (_, presented) = c.backend().presents().last().cloned().unwrap();
        assert_eq!(presented, Region::from_rect(right), "clipped to the new shape");
    }

    #[test]
    fn second_layout_is_rejected() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        c.install_layout(w).unwrap();
        assert_eq!(c.install_layout(w), Err(CompositorError::LayoutAlreadySet(w)));
    }

    #[test]
    fn pending_layout_runs_on_show() {
        let mut c = compositor();
        let w = c.create_widget(None, WindowType::Window);
        c.install_layout(w).unwrap();
        c.show(w).unwrap();
        let n = c.drain_notifications();
        let layout = n.iter().position(|n| *n == Notification::LayoutRequest(w)).unwrap();
        let shown = n.iter().position(|n| *n == Notification::Shown(w)).unwrap();
        assert!(layout < shown, "layout runs before the widget becomes visible");

        c.invalidate_layout(w);
        assert_eq!(c.drain_notifications(), vec![Notification::LayoutRequest(w)]);
    }

    #[test]
    fn frame_strut_is_queried_lazily() {
        let mut c = compositor();
        c.backend_mut().extents = Insets::new(1.0, 20.0, 1.0, 1.0);
        let w = c.create_widget(None, WindowType::Window);
        assert_eq!(c.frame_strut(w), Insets::ZERO, "no handle yet");

        c.create(w).unwrap();
        assert_eq!(c.frame_strut(w), Insets::new(1.0, 20.0, 1.0, 1.0));

        c.backend_mut().extents = Insets::new(2.0, 2.0, 2.0, 2.0);
        assert_eq!(c.frame_strut(w).y0, 20.0, "cached until invalidated");
        let handle = c.tree().native_id(w).unwrap();
        c.handle_backend_event(crate::backend::BackendEvent::FrameExtentsChanged(handle));
        assert_eq!(c.frame_strut(w).y0, 2.0);

        let geometry = c.frame_geometry(w);
        assert_eq!(geometry.width(), c.tree().rect(w).width() + 4.0);
    }

    #[test]
    fn grabs_are_exclusive() {
        let mut c = compositor();
        let a = c.create_widget(None, WindowType::Window);
        let b = c.create_widget(None, WindowType::Window);
        c.grab_mouse(a);
        assert_eq!(c.grab_mouse(b), Some(a));
        c.release_mouse(a);
        assert_eq!(c.context().mouse_grabber(), Some(b));
    }

    #[test]
    fn shutdown_destroys_everything() {
        let mut c = compositor();
        let w = shown_window(&mut c);
        let _a = child(&mut c, w, Rect::new(0.0, 0.0, 10.0, 10.0));
        c.drain_notifications();
        c.shutdown();
        assert_eq!(c.tree().widget_count(), 0);
        assert_eq!(c.context().native_count(), 0);
        assert!(
            c.drain_notifications()
                .iter()
                .all(|n| matches!(n, Notification::Destroyed(_))),
            "only destruction is reported while closing down"
        );
        assert!(!c.context().is_initialized());
    }
}
