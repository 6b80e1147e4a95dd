// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide compositor state.
//!
//! One [`Context`] lives inside each [`Compositor`](crate::Compositor). It
//! holds what a toolkit would otherwise keep in globals: whether the window
//! system is up, the native-handle registry, and the mouse and keyboard grab
//! holders.

use alloc::collections::BTreeMap;

use crate::widget::{NativeId, WidgetId};

/// Registry, initialization state, and input grabs.
#[derive(Debug, Default)]
pub struct Context {
    initialized: bool,
    closing_down: bool,
    registry: BTreeMap<NativeId, WidgetId>,
    mouse_grabber: Option<WidgetId>,
    keyboard_grabber: Option<WidgetId>,
}

impl Context {
    /// Creates an uninitialized context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` between `initialize` and `shutdown`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns `true` while the compositor is shutting down.
    #[must_use]
    pub fn is_closing_down(&self) -> bool {
        self.closing_down
    }

    pub(crate) fn set_initialized(&mut self, on: bool) {
        self.initialized = on;
    }

    pub(crate) fn set_closing_down(&mut self, on: bool) {
        self.closing_down = on;
    }

    // -- Registry --

    /// Returns the widget owning `native`.
    #[must_use]
    pub fn widget_for(&self, native: NativeId) -> Option<WidgetId> {
        self.registry.get(&native).copied()
    }

    /// Returns the number of registered native handles.
    #[must_use]
    pub fn native_count(&self) -> usize {
        self.registry.len()
    }

    /// Registers `native` for `widget`, dropping any handle the widget was
    /// registered under before.
    pub(crate) fn register(&mut self, native: NativeId, widget: WidgetId) {
        self.registry.retain(|_, w| *w != widget);
        self.registry.insert(native, widget);
    }

    pub(crate) fn unregister(&mut self, native: NativeId) {
        self.registry.remove(&native);
    }

    // -- Grabs --

    /// Returns the widget holding the mouse grab.
    #[must_use]
    pub fn mouse_grabber(&self) -> Option<WidgetId> {
        self.mouse_grabber
    }

    /// Returns the widget holding the keyboard grab.
    #[must_use]
    pub fn keyboard_grabber(&self) -> Option<WidgetId> {
        self.keyboard_grabber
    }

    /// Gives the mouse grab to `widget`, returning the holder it was taken
    /// from.
    pub fn grab_mouse(&mut self, widget: WidgetId) -> Option<WidgetId> {
        let previous = self.mouse_grabber.take().filter(|w| *w != widget);
        self.mouse_grabber = Some(widget);
        previous
    }

    /// Gives the keyboard grab to `widget`, returning the holder it was taken
    /// from.
    pub fn grab_keyboard(&mut self, widget: WidgetId) -> Option<WidgetId> {
        let previous = self.keyboard_grabber.take().filter(|w| *w != widget);
        self.keyboard_grabber = Some(widget);
        previous
    }

    /// Releases the mouse grab if `widget` holds it.
    pub fn release_mouse(&mut self, widget: WidgetId) {
        if self.mouse_grabber == Some(widget) {
            self.mouse_grabber = None;
        }
    }

    /// Releases the keyboard grab if `widget` holds it.
    pub fn release_keyboard(&mut self, widget: WidgetId) {
        if self.keyboard_grabber == Some(widget) {
            self.keyboard_grabber = None;
        }
    }

    /// Releases every grab `widget` holds.
    pub(crate) fn release_grabs(&mut self, widget: WidgetId) {
        self.release_mouse(widget);
        self.release_keyboard(widget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(idx: u32) -> WidgetId {
        WidgetId { idx, generation: 0 }
    }

    #[test]
    fn reregistering_drops_the_old_handle() {
        let mut ctx = Context::new();
        ctx.register(NativeId(1), id(0));
        ctx.register(NativeId(2), id(0));
        assert_eq!(ctx.widget_for(NativeId(1)), None);
        assert_eq!(ctx.widget_for(NativeId(2)), Some(id(0)));
        assert_eq!(ctx.native_count(), 1);

        ctx.unregister(NativeId(2));
        assert_eq!(ctx.native_count(), 0);
    }

    #[test]
    fn grabbing_releases_the_previous_holder() {
        let mut ctx = Context::new();
        assert_eq!(ctx.grab_mouse(id(1)), None);
        assert_eq!(ctx.grab_mouse(id(1)), None, "regrab by the holder");
        assert_eq!(ctx.grab_mouse(id(2)), Some(id(1)));
        assert_eq!(ctx.mouse_grabber(), Some(id(2)));

        ctx.release_mouse(id(1));
        assert_eq!(ctx.mouse_grabber(), Some(id(2)), "only the holder releases");

        ctx.grab_keyboard(id(2));
        ctx.release_grabs(id(2));
        assert_eq!(ctx.mouse_grabber(), None);
        assert_eq!(ctx.keyboard_grabber(), None);
    }
}
