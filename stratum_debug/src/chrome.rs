// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Recordings carry no wall-clock time. Each event is placed one
//! microsecond after the previous one, so the timeline shows ordering and
//! nesting, not duration.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Syncs and phases become duration slices on one track per window;
/// everything else is an instant event.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Window of the sync in progress, for placing phase and paint events.
    let mut track = 0_u32;

    for (ts, recorded) in (0_u64..).zip(decode(bytes)) {
        match recorded {
            RecordedEvent::SyncBegin(e) => {
                track = e.window.index();
                events.push(json!({
                    "ph": "B",
                    "name": "Sync",
                    "cat": "Sync",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "args": {
                        "sync_index": e.sync_index,
                        "dirty_widgets": e.dirty_widgets,
                        "dirty_rects": e.dirty_rects,
                    }
                }));
            }
            RecordedEvent::SyncEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Sync",
                    "cat": "Sync",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.window.index(),
                    "args": {
                        "sync_index": e.sync_index,
                        "painted_widgets": e.painted_widgets,
                        "cleaned_area": e.cleaned_area,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Phase",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "args": { "sync_index": e.sync_index }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Phase",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "args": { "sync_index": e.sync_index }
                }));
            }
            RecordedEvent::Paint(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Paint",
                    "cat": "Paint",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "s": "t",
                    "args": {
                        "widget": format!("{:?}", e.widget),
                        "rect_count": e.rect_count,
                        "area": e.area,
                        "background": e.background,
                    }
                }));
            }
            RecordedEvent::Present(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Present",
                    "cat": "Paint",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "s": "t",
                    "args": {
                        "handle": e.handle.0,
                        "rect_count": e.rect_count,
                    }
                }));
            }
            RecordedEvent::BackendCall(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.call),
                    "cat": "Backend",
                    "ts": ts,
                    "pid": 1,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "widget": format!("{:?}", e.widget),
                        "handle": e.handle.map(|h| h.0),
                    }
                }));
            }
            RecordedEvent::Lifecycle(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.transition),
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 1,
                    "tid": 1,
                    "s": "p",
                    "args": { "widget": format!("{:?}", e.widget) }
                }));
            }
            RecordedEvent::SyncSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SyncSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": 0,
                    "tid": s.window.index(),
                    "s": "t",
                    "args": {
                        "sync_index": s.sync_index,
                        "full_repaint": s.full_repaint,
                        "painted_widgets": s.painted_widgets,
                        "painted_area": s.painted_area,
                        "presents": s.presents,
                        "presented_rects": s.presented_rects,
                    }
                }));
            }
            RecordedEvent::DirtyMark(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DirtyMark",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 1,
                    "tid": 2,
                    "s": "p",
                    "args": {
                        "widget": format!("{:?}", e.widget),
                        "bounds": [e.bounds.x, e.bounds.y, e.bounds.width, e.bounds.height],
                        "invalidate_buffer": e.invalidate_buffer,
                        "immediate": e.immediate,
                    }
                }));
            }
            RecordedEvent::DamageRectsCount { sync_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": track,
                    "s": "t",
                    "args": {
                        "sync_index": sync_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
