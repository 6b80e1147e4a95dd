// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget tree, occlusion culling, and backing-store compositing.
//!
//! `stratum_core` manages a tree of rectangular widgets that are either
//! backed by a native window-system handle or *alien*: painted into the
//! backing store of their nearest native ancestor. It is `no_std`
//! compatible (with `alloc`) and stores the tree in struct-of-arrays layout
//! with generational index handles.
//!
//! # Architecture
//!
//! Every mutation goes through one [`Compositor`], which owns the tree, the
//! per-window backing stores, the backend and the rasterizer:
//!
//! ```text
//!   show / set_geometry / raise / set_parent / update
//!       │
//!       ▼
//!   WidgetTree ──► BackingStore::mark_dirty ──► posted windows
//!                                                   │
//!                 ┌─────────────────────────────────┘
//!                 ▼
//!   process_pending() ──► BackingStore::sync ──► Rasterizer::paint
//!                                │
//!                                ▼
//!                       WindowBackend::present
//!                                ▲
//!   BackendEvent (map, expose, configure) ──► handle_backend_event()
//! ```
//!
//! **[`widget`]**: Struct-of-arrays widget tree with generational handles,
//! attribute and state flags, the tab-order focus ring, and the cached
//! opaque-region computation used for occlusion culling.
//!
//! **[`compositor`]**: The lifecycle state machine (create, show, map, hide,
//! destroy), geometry, stacking, reparenting, and the event-loop iteration.
//!
//! **[`backing_store`]**: Per-window dirty tracking. Updates requested in
//! one iteration coalesce into one paint and one present.
//!
//! **[`dirty`]**: Dirty channels via `understory_dirty`. Opaque-region
//! invalidation propagates to ancestors; frame struts are local.
//!
//! **[`backend`]** and **[`paint`]**: The [`WindowBackend`] and
//! [`Rasterizer`] traits that platform integrations implement.
//!
//! **[`region`]**: Exact rectilinear region algebra.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! paint-pipeline instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   the thread-safe [`remote`] update queue.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-widget
//!   dirty-mark and paint events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod backend;
pub mod backing_store;
pub mod compositor;
pub mod config;
pub mod context;
pub mod dirty;
pub mod error;
pub mod notify;
pub mod paint;
pub mod region;
#[cfg(feature = "std")]
pub mod remote;
pub mod trace;
pub mod widget;

#[cfg(test)]
mod testing;

pub use backend::{BackendCapabilities, BackendEvent, CreateParams, WindowBackend};
pub use compositor::{Compositor, VisibilityState};
pub use config::CompositorConfig;
pub use error::{BackendError, CompositorError};
pub use notify::Notification;
pub use paint::{PaintContext, Rasterizer};
pub use region::Region;
pub use widget::{NativeId, WidgetFlags, WidgetId, WidgetTree, WindowType};
