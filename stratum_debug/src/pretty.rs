// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.

use std::io::Write;

use stratum_core::trace::{
    BackendCallEvent, DamageRect, DirtyMarkEvent, LifecycleEvent, PaintEvent, PhaseBeginEvent,
    PhaseEndEvent, PresentEvent, SyncBeginEvent, SyncEndEvent, SyncSummary, TraceSink,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Write errors are ignored; a trace is best effort.
#[derive(Debug)]
pub struct PrettyPrintSink<W> {
    out: W,
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        let _ = writeln!(
            self.out,
            "[sync {}] begin {:?}: {} dirty widgets, {} dirty rects",
            e.sync_index, e.window, e.dirty_widgets, e.dirty_rects
        );
    }

    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        let _ = writeln!(
            self.out,
            "[sync {}] end {:?}: painted {} widgets, cleaned {:.0}px",
            e.sync_index, e.window, e.painted_widgets, e.cleaned_area
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(self.out, "[sync {}]   {:?} {{", e.sync_index, e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(self.out, "[sync {}]   }} {:?}", e.sync_index, e.phase);
    }

    fn on_paint(&mut self, e: &PaintEvent) {
        let _ = writeln!(
            self.out,
            "[sync {}]     paint {:?}: {} rects, {:.0}px{}",
            e.sync_index,
            e.widget,
            e.rect_count,
            e.area,
            if e.background { " +background" } else { "" }
        );
    }

    fn on_present(&mut self, e: &PresentEvent) {
        let _ = writeln!(
            self.out,
            "[sync {}]     present {:?}: {} rects",
            e.sync_index, e.handle, e.rect_count
        );
    }

    fn on_backend_call(&mut self, e: &BackendCallEvent) {
        match e.handle {
            Some(h) => {
                let _ = writeln!(self.out, "backend {:?} {:?} on {h:?}", e.call, e.widget);
            }
            None => {
                let _ = writeln!(self.out, "backend {:?} {:?}", e.call, e.widget);
            }
        }
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(self.out, "lifecycle {:?} {:?}", e.widget, e.transition);
    }

    fn on_sync_summary(&mut self, s: &SyncSummary) {
        let _ = writeln!(
            self.out,
            "[sync {}] summary {:?}: full={} widgets={} area={:.0}px presents={} rects={}",
            s.sync_index,
            s.window,
            s.full_repaint,
            s.painted_widgets,
            s.painted_area,
            s.presents,
            s.presented_rects
        );
    }

    fn on_dirty_mark(&mut self, e: &DirtyMarkEvent) {
        let b = e.bounds;
        let _ = writeln!(
            self.out,
            "mark {:?} {}x{}+{}+{}{}{}",
            e.widget,
            b.width,
            b.height,
            b.x,
            b.y,
            if e.invalidate_buffer { " buffer" } else { "" },
            if e.immediate { " immediate" } else { "" }
        );
    }

    fn on_damage_rects(&mut self, sync_index: u64, rects: &[DamageRect]) {
        let _ = writeln!(self.out, "[sync {sync_index}] {} damage rects", rects.len());
    }
}

#[cfg(test)]
mod tests {
    use stratum_core::trace::{BackendCall, LifecycleTransition, PhaseKind};
    use stratum_core::widget::{NativeId, WidgetId};

    use super::*;

    fn lines(sink: PrettyPrintSink<Vec<u8>>) -> Vec<String> {
        String::from_utf8(sink.into_inner())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn one_line_per_event() {
        let w = WidgetId::from_raw(0, 0);
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            sync_index: 2,
            phase: PhaseKind::Flush,
        });
        sink.on_backend_call(&BackendCallEvent {
            call: BackendCall::Map,
            widget: w,
            handle: Some(NativeId(1)),
        });
        sink.on_lifecycle(&LifecycleEvent {
            widget: w,
            transition: LifecycleTransition::Mapped,
        });
        let lines = lines(sink);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[sync 2]   Flush {");
        assert!(lines[1].starts_with("backend Map"), "got {}", lines[1]);
        assert!(lines[1].ends_with("on NativeId(0x1)"), "got {}", lines[1]);
        assert!(lines[2].ends_with("Mapped"), "got {}", lines[2]);
    }

    #[test]
    fn paint_lines_flag_backgrounds() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_paint(&PaintEvent {
            sync_index: 1,
            widget: WidgetId::from_raw(4, 0),
            rect_count: 2,
            area: 150.0,
            background: true,
        });
        let lines = lines(sink);
        assert!(lines[0].ends_with("2 rects, 150px +background"), "got {}", lines[0]);
    }
}
