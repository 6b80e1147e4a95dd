// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-widget flag bitset and the attribute side-effect table.

use bitflags::bitflags;

bitflags! {
    /// Per-widget boolean state.
    ///
    /// The low half holds caller-settable attributes, changed through
    /// [`Compositor::set_attribute`](crate::Compositor::set_attribute). The
    /// high half holds lifecycle state owned by the compositor; every state
    /// query (visible, mapped, created, ...) reads these bits and nothing else.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WidgetFlags: u32 {
        /// The widget paints every pixel of its rect with opaque content.
        const OPAQUE_PAINT = 1 << 0;
        /// The system background is not painted underneath the widget.
        const NO_SYSTEM_BACKGROUND = 1 << 1;
        /// The widget fills its background before painting.
        const AUTO_FILL_BACKGROUND = 1 << 2;
        /// The widget has a translucent background; never opaque.
        const TRANSLUCENT_BACKGROUND = 1 << 3;
        /// The widget must own a native window handle.
        const NATIVE_WINDOW = 1 << 4;
        /// Creating a native handle for this widget does not promote its
        /// alien ancestors.
        const DONT_CREATE_NATIVE_ANCESTORS = 1 << 5;
        /// Contents persist across resizes; disables the top-level resize
        /// optimization for the owning window.
        const STATIC_CONTENTS = 1 << 6;
        /// Update and repaint requests are dropped.
        const UPDATES_DISABLED = 1 << 7;

        /// Resources exist (native handle if one is required).
        const CREATED = 1 << 16;
        /// Native allocation failed; retried on the next create or show.
        const CREATE_PENDING = 1 << 17;
        /// Logically visible: shown and every ancestor visible.
        const VISIBLE = 1 << 18;
        /// Hidden, either initially or by request.
        const HIDDEN = 1 << 19;
        /// The hidden bit was set or cleared by an explicit call.
        const EXPLICIT_SHOW_HIDE = 1 << 20;
        /// On screen as far as the compositor knows.
        const MAPPED = 1 << 21;
        /// A move notification is owed once the widget is shown.
        const MOVE_PENDING = 1 << 22;
        /// A resize notification is owed once the widget is shown.
        const RESIZE_PENDING = 1 << 23;
        /// A native window was mapped and the backend has not confirmed yet.
        const WAITING_FOR_MAP = 1 << 24;
        /// A top-level window with an empty size; kept unmapped.
        const OUTSIDE_WS_RANGE = 1 << 25;
        /// The rasterizer is currently painting this widget.
        const IN_PAINT = 1 << 26;
        /// The installed layout must run before the next show.
        const LAYOUT_PENDING = 1 << 27;
        /// A layout is installed.
        const HAS_LAYOUT = 1 << 28;
    }
}

impl WidgetFlags {
    /// Flags callers may toggle through `set_attribute`.
    pub const ATTRIBUTES: Self = Self::OPAQUE_PAINT
        .union(Self::NO_SYSTEM_BACKGROUND)
        .union(Self::AUTO_FILL_BACKGROUND)
        .union(Self::TRANSLUCENT_BACKGROUND)
        .union(Self::NATIVE_WINDOW)
        .union(Self::DONT_CREATE_NATIVE_ANCESTORS)
        .union(Self::STATIC_CONTENTS)
        .union(Self::UPDATES_DISABLED);

    /// Flags set on a freshly created widget.
    pub const INITIAL: Self = Self::HIDDEN;

    /// Returns `true` if these flags make a widget opaque for occlusion.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.intersects(
            Self::OPAQUE_PAINT
                .union(Self::NO_SYSTEM_BACKGROUND)
                .union(Self::AUTO_FILL_BACKGROUND),
        ) && !self.contains(Self::TRANSLUCENT_BACKGROUND)
    }

    /// Returns `true` if the widget was hidden by an explicit call.
    #[must_use]
    pub const fn is_explicitly_hidden(self) -> bool {
        self.contains(Self::HIDDEN.union(Self::EXPLICIT_SHOW_HIDE))
    }
}

bitflags! {
    /// Side effects run synchronously when an attribute is toggled.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttributeEffects: u8 {
        /// Drop cached opaque regions of the widget and its ancestors.
        const INVALIDATE_OPAQUE = 1 << 0;
        /// Re-evaluate whether the widget needs a native handle.
        const INVALIDATE_BACKEND = 1 << 1;
        /// Repaint the widget.
        const REPAINT = 1 << 2;
    }
}

/// Attribute → side-effect table.
///
/// Attributes missing from the table have no side effect beyond the bit.
pub const ATTRIBUTE_EFFECTS: &[(WidgetFlags, AttributeEffects)] = &[
    (
        WidgetFlags::OPAQUE_PAINT,
        AttributeEffects::INVALIDATE_OPAQUE,
    ),
    (
        WidgetFlags::NO_SYSTEM_BACKGROUND,
        AttributeEffects::INVALIDATE_OPAQUE,
    ),
    (
        WidgetFlags::AUTO_FILL_BACKGROUND,
        AttributeEffects::INVALIDATE_OPAQUE.union(AttributeEffects::REPAINT),
    ),
    (
        WidgetFlags::TRANSLUCENT_BACKGROUND,
        AttributeEffects::INVALIDATE_OPAQUE
            .union(AttributeEffects::INVALIDATE_BACKEND)
            .union(AttributeEffects::REPAINT),
    ),
    (
        WidgetFlags::NATIVE_WINDOW,
        AttributeEffects::INVALIDATE_BACKEND,
    ),
    (WidgetFlags::UPDATES_DISABLED, AttributeEffects::REPAINT),
];

/// Returns the combined side effects of toggling `attrs`.
#[must_use]
pub fn effects_of(attrs: WidgetFlags) -> AttributeEffects {
    ATTRIBUTE_EFFECTS
        .iter()
        .filter(|(flag, _)| attrs.intersects(*flag))
        .fold(AttributeEffects::empty(), |acc, (_, fx)| acc | *fx)
}
