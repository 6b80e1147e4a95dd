// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Moving widgets between parents.

use alloc::vec;
use alloc::vec::Vec;

use super::{Compositor, trace_call};
use crate::backend::WindowBackend;
use crate::backing_store::BackingStore;
use crate::notify::Notification;
use crate::paint::Rasterizer;
use crate::trace::{BackendCall, Tracer};
use crate::widget::{INVALID, WidgetFlags, WidgetId, WindowType};

impl<B: WindowBackend, R: Rasterizer> Compositor<B, R> {
    /// Moves the widget under `new_parent`, or makes it top-level.
    ///
    /// The widget ends up hidden unless it will be shown along with a hidden
    /// new parent.
    ///
    /// # Panics
    ///
    /// Panics if `new_parent` is the widget itself or one of its descendants.
    pub fn set_parent(&mut self, id: WidgetId, new_parent: Option<WidgetId>) {
        self.set_parent_traced(id, new_parent, None, &mut Tracer::none());
    }

    /// Moves the widget under `new_parent` and changes its window type.
    pub fn set_parent_with_type(
        &mut self,
        id: WidgetId,
        new_parent: Option<WidgetId>,
        window_type: WindowType,
    ) {
        self.set_parent_traced(id, new_parent, Some(window_type), &mut Tracer::none());
    }

    /// [`set_parent`](Self::set_parent) with an optional window-type
    /// override and tracing.
    pub fn set_parent_traced(
        &mut self,
        id: WidgetId,
        new_parent: Option<WidgetId>,
        window_type: Option<WindowType>,
        tracer: &mut Tracer<'_>,
    ) {
        self.tree.validate(id);
        let idx = id.idx;
        let old_parent = self.tree.parent[idx as usize];
        let new_idx = new_parent.map_or(INVALID, |p| {
            self.tree.validate(p);
            p.idx
        });
        if old_parent == new_idx
            && window_type.is_none_or(|t| t == self.tree.window_type[idx as usize])
        {
            return;
        }
        if new_idx != INVALID {
            assert!(
                !self.tree.contains_in_subtree(idx, new_idx),
                "cannot parent a widget to itself or its descendant"
            );
        }

        let flags = self.tree.flags[idx as usize];
        let explicitly_hidden = flags.is_explicitly_hidden();
        let was_created = flags.contains(WidgetFlags::CREATED);
        let old_window = self.tree.window_at(idx);

        // Leave the old parent.
        if flags.contains(WidgetFlags::VISIBLE) {
            self.hide_helper(idx, tracer);
        }
        self.remove_dirty_subtree(idx);
        let old = self.tree.opt_id(old_parent);
        if let Some(old) = old {
            self.tree.remove_from_parent(id);
            self.notify(Notification::ChildRemoved {
                parent: old,
                child: id,
            });
        }

        // Join the new one.
        if let Some(t) = window_type {
            self.tree.window_type[idx as usize] = t;
        }
        if let Some(parent) = new_parent {
            self.tree.append_child(parent, id);
            self.notify(Notification::ChildAdded { parent, child: id });
        }
        self.tree.reparent_focus(idx, old_window);

        let is_window = self.tree.is_window_at(idx);
        if old_window == idx && !is_window {
            self.stores.remove(&idx);
            self.posted.retain(|w| *w != id);
        }
        if was_created {
            self.rehome_native_handles(idx, tracer);
        }

        let hide = is_window
            || self.tree.flags[new_idx as usize].contains(WidgetFlags::VISIBLE)
            || explicitly_hidden;
        if hide {
            self.tree.insert_flags_at(idx, WidgetFlags::HIDDEN);
        } else {
            self.tree.remove_flags_at(idx, WidgetFlags::HIDDEN);
        }
        self.tree.flags[idx as usize].set(WidgetFlags::EXPLICIT_SHOW_HIDE, explicitly_hidden);

        self.notify(Notification::ParentChanged {
            widget: id,
            old,
            new: new_parent,
        });
    }

    /// Reattaches the native handles of a moved, created subtree under their
    /// new native ancestors.
    fn rehome_native_handles(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let id = self.tree.id_at(idx);
        let parent = self.tree.parent[idx as usize];
        let parent_created = parent == INVALID
            || self.tree.flags[parent as usize].contains(WidgetFlags::CREATED)
            || self.create_at(parent, tracer).is_ok();

        if self.tree.is_window_at(idx) {
            match self.tree.native[idx as usize] {
                Some(handle) => {
                    let pos = self.tree.rect[idx as usize].origin();
                    trace_call(tracer, BackendCall::Reparent, id, Some(handle));
                    self.backend.reparent(handle, None, pos);
                }
                None => {
                    if self.create_native_at(idx, tracer).is_err() {
                        // Reported as `CreateFailed`. Without a handle the
                        // window counts as uncreated so the next show retries.
                        self.tree.remove_flags_at(idx, WidgetFlags::CREATED);
                        return;
                    }
                }
            }
            if !self.stores.contains_key(&idx) {
                self.stores
                    .insert(idx, BackingStore::new(id, self.config.max_dirty_rects));
            }
            self.tree.dirty.mark(idx, crate::dirty::FRAME_STRUT);
            return;
        }

        let natives = if self.tree.native[idx as usize].is_some() {
            vec![idx]
        } else {
            self.first_native_descendants(idx)
        };
        if natives.is_empty() {
            return;
        }
        if parent_created
            && !self.tree.flags[idx as usize].contains(WidgetFlags::DONT_CREATE_NATIVE_ANCESTORS)
            && self.tree.native[parent as usize].is_none()
        {
            self.tree.insert_flags_at(parent, WidgetFlags::NATIVE_WINDOW);
            if self.create_native_at(parent, tracer).is_err() {
                // Reported as `CreateFailed`; the parent stays alien and the
                // handles below attach to the nearest native ancestor.
                self.tree.remove_flags_at(parent, WidgetFlags::NATIVE_WINDOW);
            }
        }
        for n in natives {
            let Some(handle) = self.tree.native[n as usize] else {
                continue;
            };
            let new_parent = self
                .tree
                .native_parent_at(n)
                .and_then(|p| self.tree.native[p as usize]);
            let pos = self.native_pos_at(n);
            trace_call(tracer, BackendCall::Reparent, self.tree.id_at(n), Some(handle));
            self.backend.reparent(handle, new_parent, pos);
        }
    }

    /// Returns the native widgets below `idx` with no native widget between
    /// them and `idx`. Child windows are skipped.
    pub(crate) fn first_native_descendants(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = self.child_indices(idx);
        stack.reverse();
        while let Some(w) = stack.pop() {
            if self.tree.is_window_at(w) {
                continue;
            }
            if self.tree.native[w as usize].is_some() {
                out.push(w);
                continue;
            }
            let mut children = self.child_indices(w);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}
