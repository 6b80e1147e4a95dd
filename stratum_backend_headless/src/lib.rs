// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless backend for stratum.
//!
//! - [`HeadlessBackend`]: an in-memory window system implementing
//!   [`WindowBackend`](stratum_core::backend::WindowBackend), with a
//!   scriptable window manager.
//! - [`CellRasterizer`]: paints widgets as character fills on a text grid.
//! - [`pump`]: one event-loop iteration, delivering queued window-system
//!   events before processing pending updates.
//!
//! Together they run the whole compositor without a display, for tests,
//! demos, and CI.

#![no_std]

extern crate alloc;

mod backend;
mod raster;

pub use backend::{HeadlessBackend, HeadlessWindow};
pub use raster::{CellRasterizer, PaintRecord};

use stratum_core::compositor::Compositor;
use stratum_core::paint::Rasterizer;

/// Delivers every queued window-system event, then runs
/// [`Compositor::process_pending`]. Returns the number of syncs.
pub fn pump<R: Rasterizer>(compositor: &mut Compositor<HeadlessBackend, R>) -> usize {
    while compositor.backend().has_pending_events() {
        for event in compositor.backend_mut().take_events() {
            compositor.handle_backend_event(event);
        }
    }
    compositor.process_pending()
}
