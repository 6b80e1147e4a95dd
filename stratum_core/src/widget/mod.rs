// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget tree data model.
//!
//! A *widget* is a rectangular surface in a tree. Each widget has:
//!
//! - An identity ([`WidgetId`]), a generational handle that becomes stale
//!   when the widget is destroyed.
//! - Topology: parent, child, and sibling links forming an ordered tree.
//!   Siblings are stored back to front; later children are stacked higher.
//! - Geometry in parent coordinates (screen coordinates for top-level
//!   widgets), size bounds, and an optional pixel mask.
//! - [`WidgetFlags`]: caller-settable attributes and compositor-owned
//!   lifecycle state.
//! - An optional [`NativeId`]. Widgets without one are *alien*: they are
//!   composited into the backing store of their nearest native ancestor.
//! - A slot on a tab-order focus ring (see [`WidgetTree::focus_chain`]).
//!
//! Widgets are stored in struct-of-arrays layout with index-based handles.
//!
//! # Dirty tracking
//!
//! Geometry, mask, stacking and child-list changes mark the
//! [`OPAQUE`](crate::dirty::OPAQUE) channel, which propagates to ancestors.
//! [`WidgetTree::refresh_opaque_cache`] consumes it.

mod flags;
mod focus;
mod id;
mod opaque;
pub(crate) mod traverse;
mod tree;

pub use flags::{ATTRIBUTE_EFFECTS, AttributeEffects, WidgetFlags, effects_of};
pub use id::{INVALID, NativeId, WidgetId, WindowType};
pub use traverse::{Ancestors, Children};
pub use tree::{DEFAULT_CHILD_RECT, DEFAULT_WINDOW_RECT, MAX_WIDGET_SIZE, WidgetTree};
