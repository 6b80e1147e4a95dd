// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of a widget tree.

use serde_json::{Value, json};

use stratum_core::widget::{WidgetId, WidgetTree};

/// Returns every top-level widget and its descendants as a JSON array.
///
/// Each node carries its id, window type, geometry in parent coordinates,
/// flags, native handle (if any), and children back to front.
#[must_use]
pub fn tree_snapshot(tree: &WidgetTree) -> Value {
    Value::Array(tree.roots().into_iter().map(|r| node(tree, r)).collect())
}

fn node(tree: &WidgetTree, id: WidgetId) -> Value {
    let r = tree.rect(id);
    json!({
        "id": format!("{id:?}"),
        "type": format!("{:?}", tree.window_type(id)),
        "rect": [r.x0, r.y0, r.width(), r.height()],
        "flags": format!("{:?}", tree.flags(id)),
        "native": tree.native_id(id).map(|h| h.0),
        "children": tree.children(id).map(|c| node(tree, c)).collect::<Vec<_>>(),
    })
}
