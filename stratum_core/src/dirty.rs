// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The widget tree uses multi-channel dirty tracking (via [`understory_dirty`])
//! for the derived state it caches. Each channel represents an independent
//! category of invalidation.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`OPAQUE`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with dependency edges
//!   from parent to child (a parent depends on its children). Marking a widget
//!   marks every ancestor, because a widget's opaque-children region is built
//!   from the opaque regions of its whole subtree.
//!
//! - **Local-only**: [`FRAME_STRUT`] is marked with the default policy on
//!   top-level windows whose decoration insets must be re-queried from the
//!   backend.
//!
//! # Consumption
//!
//! The opaque-region cache drops the entries of a marked widget and its
//! ancestors at mark time, and drains [`OPAQUE`] before each sync to rebuild
//! them. Frame-strut queries drain [`FRAME_STRUT`] before every lookup.

use understory_dirty::Channel;

/// Occlusion-relevant state changed: geometry, opacity attributes, mask,
/// visibility, children, or stacking.
pub const OPAQUE: Channel = Channel::new(0);

/// Window decoration insets must be re-queried.
pub const FRAME_STRUT: Channel = Channel::new(1);
