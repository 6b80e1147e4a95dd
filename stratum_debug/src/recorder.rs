// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! [`on_damage_rects`](TraceSink::on_damage_rects) stores only the count.

use stratum_core::trace::{
    BackendCall, BackendCallEvent, DamageRect, DirtyMarkEvent, LifecycleEvent,
    LifecycleTransition, PaintEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PresentEvent,
    SyncBeginEvent, SyncEndEvent, SyncSummary, TraceSink,
};
use stratum_core::widget::{NativeId, WidgetId};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SYNC_BEGIN: u8 = 1;
const TAG_SYNC_END: u8 = 2;
const TAG_PHASE_BEGIN: u8 = 3;
const TAG_PHASE_END: u8 = 4;
const TAG_PAINT: u8 = 5;
const TAG_PRESENT: u8 = 6;
const TAG_BACKEND_CALL: u8 = 7;
const TAG_LIFECYCLE: u8 = 8;
const TAG_SYNC_SUMMARY: u8 = 9;
const TAG_DIRTY_MARK: u8 = 10;
const TAG_DAMAGE_RECTS_COUNT: u8 = 11;

const PHASES: [PhaseKind; 4] = [
    PhaseKind::Mark,
    PhaseKind::Sync,
    PhaseKind::Paint,
    PhaseKind::Flush,
];

const CALLS: [BackendCall; 11] = [
    BackendCall::Create,
    BackendCall::Destroy,
    BackendCall::Map,
    BackendCall::Unmap,
    BackendCall::Move,
    BackendCall::Resize,
    BackendCall::Raise,
    BackendCall::Lower,
    BackendCall::StackUnder,
    BackendCall::SetMask,
    BackendCall::Reparent,
];

const TRANSITIONS: [LifecycleTransition; 7] = [
    LifecycleTransition::Created,
    LifecycleTransition::CreateFailed,
    LifecycleTransition::Shown,
    LifecycleTransition::Hidden,
    LifecycleTransition::Mapped,
    LifecycleTransition::Unmapped,
    LifecycleTransition::Destroyed,
];

/// Position of `value` in `table`; tables are small and exhaustive.
#[expect(
    clippy::cast_possible_truncation,
    reason = "discriminant tables have fewer than 256 entries"
)]
fn discriminant<T: PartialEq>(table: &[T], value: &T) -> u8 {
    table.iter().position(|v| v == value).unwrap_or(0) as u8
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_widget(&mut self, w: WidgetId) {
        self.write_u32(w.index());
        self.write_u32(w.generation());
    }

    fn write_option_handle(&mut self, h: Option<NativeId>) {
        match h {
            Some(NativeId(raw)) => {
                self.write_u8(1);
                self.write_u64(raw);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        self.write_u8(TAG_SYNC_BEGIN);
        self.write_u64(e.sync_index);
        self.write_widget(e.window);
        self.write_u32(e.dirty_widgets);
        self.write_u32(e.dirty_rects);
    }

    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        self.write_u8(TAG_SYNC_END);
        self.write_u64(e.sync_index);
        self.write_widget(e.window);
        self.write_u32(e.painted_widgets);
        self.write_f64(e.cleaned_area);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.sync_index);
        self.write_u8(discriminant(&PHASES, &e.phase));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.sync_index);
        self.write_u8(discriminant(&PHASES, &e.phase));
    }

    fn on_paint(&mut self, e: &PaintEvent) {
        self.write_u8(TAG_PAINT);
        self.write_u64(e.sync_index);
        self.write_widget(e.widget);
        self.write_u32(e.rect_count);
        self.write_f64(e.area);
        self.write_bool(e.background);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.write_u8(TAG_PRESENT);
        self.write_u64(e.sync_index);
        self.write_u64(e.handle.0);
        self.write_u32(e.rect_count);
    }

    fn on_backend_call(&mut self, e: &BackendCallEvent) {
        self.write_u8(TAG_BACKEND_CALL);
        self.write_u8(discriminant(&CALLS, &e.call));
        self.write_widget(e.widget);
        self.write_option_handle(e.handle);
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_widget(e.widget);
        self.write_u8(discriminant(&TRANSITIONS, &e.transition));
    }

    fn on_sync_summary(&mut self, s: &SyncSummary) {
        self.write_u8(TAG_SYNC_SUMMARY);
        self.write_u64(s.sync_index);
        self.write_widget(s.window);
        self.write_bool(s.full_repaint);
        self.write_u32(s.painted_widgets);
        self.write_f64(s.painted_area);
        self.write_u32(s.presents);
        self.write_u32(s.presented_rects);
    }

    fn on_dirty_mark(&mut self, e: &DirtyMarkEvent) {
        self.write_u8(TAG_DIRTY_MARK);
        self.write_widget(e.widget);
        self.write_i32(e.bounds.x);
        self.write_i32(e.bounds.y);
        self.write_u32(e.bounds.width);
        self.write_u32(e.bounds.height);
        self.write_bool(e.invalidate_buffer);
        self.write_bool(e.immediate);
    }

    fn on_damage_rects(&mut self, sync_index: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(sync_index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "damage rect count capped at u32::MAX for recording"
        )]
        self.write_u32(rects.len().min(u32::MAX as usize) as u32);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SyncBeginEvent`].
    SyncBegin(SyncBeginEvent),
    /// A [`SyncEndEvent`].
    SyncEnd(SyncEndEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PaintEvent`].
    Paint(PaintEvent),
    /// A [`PresentEvent`].
    Present(PresentEvent),
    /// A [`BackendCallEvent`].
    BackendCall(BackendCallEvent),
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// A [`SyncSummary`].
    SyncSummary(SyncSummary),
    /// A [`DirtyMarkEvent`].
    DirtyMark(DirtyMarkEvent),
    /// Damage-rect count for a sync.
    DamageRectsCount {
        /// Sync counter.
        sync_index: u64,
        /// Number of damage rects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_widget(&mut self) -> Option<WidgetId> {
        Some(WidgetId::from_raw(self.read_u32()?, self.read_u32()?))
    }

    fn read_option_handle(&mut self) -> Option<Option<NativeId>> {
        let present = self.read_u8()?;
        let raw = self.read_u64()?;
        Some((present != 0).then_some(NativeId(raw)))
    }

    fn read_from<T: Copy>(&mut self, table: &[T]) -> Option<T> {
        table.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_next(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_SYNC_BEGIN => RecordedEvent::SyncBegin(SyncBeginEvent {
                sync_index: self.read_u64()?,
                window: self.read_widget()?,
                dirty_widgets: self.read_u32()?,
                dirty_rects: self.read_u32()?,
            }),
            TAG_SYNC_END => RecordedEvent::SyncEnd(SyncEndEvent {
                sync_index: self.read_u64()?,
                window: self.read_widget()?,
                painted_widgets: self.read_u32()?,
                cleaned_area: self.read_f64()?,
            }),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                sync_index: self.read_u64()?,
                phase: self.read_from(&PHASES)?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                sync_index: self.read_u64()?,
                phase: self.read_from(&PHASES)?,
            }),
            TAG_PAINT => RecordedEvent::Paint(PaintEvent {
                sync_index: self.read_u64()?,
                widget: self.read_widget()?,
                rect_count: self.read_u32()?,
                area: self.read_f64()?,
                background: self.read_bool()?,
            }),
            TAG_PRESENT => RecordedEvent::Present(PresentEvent {
                sync_index: self.read_u64()?,
                handle: NativeId(self.read_u64()?),
                rect_count: self.read_u32()?,
            }),
            TAG_BACKEND_CALL => RecordedEvent::BackendCall(BackendCallEvent {
                call: self.read_from(&CALLS)?,
                widget: self.read_widget()?,
                handle: self.read_option_handle()?,
            }),
            TAG_LIFECYCLE => RecordedEvent::Lifecycle(LifecycleEvent {
                widget: self.read_widget()?,
                transition: self.read_from(&TRANSITIONS)?,
            }),
            TAG_SYNC_SUMMARY => RecordedEvent::SyncSummary(SyncSummary {
                sync_index: self.read_u64()?,
                window: self.read_widget()?,
                full_repaint: self.read_bool()?,
                painted_widgets: self.read_u32()?,
                painted_area: self.read_f64()?,
                presents: self.read_u32()?,
                presented_rects: self.read_u32()?,
            }),
            TAG_DIRTY_MARK => RecordedEvent::DirtyMark(DirtyMarkEvent {
                widget: self.read_widget()?,
                bounds: DamageRect {
                    x: self.read_i32()?,
                    y: self.read_i32()?,
                    width: self.read_u32()?,
                    height: self.read_u32()?,
                },
                invalidate_buffer: self.read_bool()?,
                immediate: self.read_bool()?,
            }),
            TAG_DAMAGE_RECTS_COUNT => RecordedEvent::DamageRectsCount {
                sync_index: self.read_u64()?,
                count: self.read_u32()?,
            },
            // Unknown tag: stop iteration.
            _ => return None,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        self.decode_next(tag)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> WidgetId {
        WidgetId::from_raw(3, 1)
    }

    #[test]
    fn sync_events_decode_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_sync_begin(&SyncBeginEvent {
            sync_index: 4,
            window: window(),
            dirty_widgets: 2,
            dirty_rects: 1,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            sync_index: 4,
            phase: PhaseKind::Paint,
        });
        rec.on_paint(&PaintEvent {
            sync_index: 4,
            widget: window(),
            rect_count: 1,
            area: 2500.0,
            background: true,
        });
        rec.on_phase_end(&PhaseEndEvent {
            sync_index: 4,
            phase: PhaseKind::Paint,
        });
        rec.on_present(&PresentEvent {
            sync_index: 4,
            handle: NativeId(0x10),
            rect_count: 1,
        });
        rec.on_sync_end(&SyncEndEvent {
            sync_index: 4,
            window: window(),
            painted_widgets: 1,
            cleaned_area: 2500.0,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 6);
        match &events[0] {
            RecordedEvent::SyncBegin(e) => {
                assert_eq!(e.sync_index, 4);
                assert_eq!(e.window, window());
                assert_eq!(e.dirty_widgets, 2);
            }
            other => panic!("expected SyncBegin, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::Paint(e) => {
                assert_eq!(e.widget, window());
                assert_eq!(e.area, 2500.0);
                assert!(e.background, "background flag survives");
            }
            other => panic!("expected Paint, got {other:?}"),
        }
        assert!(matches!(
            events[3],
            RecordedEvent::PhaseEnd(PhaseEndEvent {
                phase: PhaseKind::Paint,
                ..
            })
        ));
        match &events[4] {
            RecordedEvent::Present(e) => assert_eq!(e.handle, NativeId(0x10)),
            other => panic!("expected Present, got {other:?}"),
        }
    }

    #[test]
    fn backend_calls_keep_optional_handles() {
        let mut rec = RecorderSink::new();
        rec.on_backend_call(&BackendCallEvent {
            call: BackendCall::Create,
            widget: window(),
            handle: None,
        });
        rec.on_backend_call(&BackendCallEvent {
            call: BackendCall::StackUnder,
            widget: window(),
            handle: Some(NativeId(7)),
        });
        rec.on_lifecycle(&LifecycleEvent {
            widget: window(),
            transition: LifecycleTransition::Unmapped,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match (&events[0], &events[1], &events[2]) {
            (
                RecordedEvent::BackendCall(a),
                RecordedEvent::BackendCall(b),
                RecordedEvent::Lifecycle(l),
            ) => {
                assert_eq!(a.call, BackendCall::Create);
                assert_eq!(a.handle, None);
                assert_eq!(b.call, BackendCall::StackUnder);
                assert_eq!(b.handle, Some(NativeId(7)));
                assert_eq!(l.transition, LifecycleTransition::Unmapped);
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn dirty_marks_and_damage_counts() {
        let mut rec = RecorderSink::new();
        rec.on_dirty_mark(&DirtyMarkEvent {
            widget: window(),
            bounds: DamageRect {
                x: -4,
                y: 2,
                width: 10,
                height: 20,
            },
            invalidate_buffer: true,
            immediate: false,
        });
        let rects = [DamageRect {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        }; 3];
        rec.on_damage_rects(9, &rects);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[0] {
            RecordedEvent::DirtyMark(e) => {
                assert_eq!(e.bounds.x, -4);
                assert_eq!(e.bounds.height, 20);
                assert!(e.invalidate_buffer, "flag survives");
                assert!(!e.immediate, "flag survives");
            }
            other => panic!("expected DirtyMark, got {other:?}"),
        }
        assert!(matches!(
            events[1],
            RecordedEvent::DamageRectsCount {
                sync_index: 9,
                count: 3
            }
        ));
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_sync_summary(&SyncSummary {
            sync_index: 1,
            window: window(),
            full_repaint: true,
            painted_widgets: 3,
            painted_area: 100.0,
            presents: 1,
            presented_rects: 2,
        });
        let bytes = rec.into_bytes();
        assert_eq!(decode(&bytes).count(), 1);
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 0);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert_eq!(decode(&[]).count(), 0);
    }
}
