// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless compositing walk-through.
//!
//! Builds a small widget tree on the [`HeadlessBackend`], then drives it
//! through show, update, restack, move, hide, and an expose from the window
//! manager. After each step the character grid is printed. Every trace event
//! goes to a [`PrettyPrintSink`] on stderr and a [`RecorderSink`]; the
//! recording is exported as Chrome trace JSON at the end.

use std::fs::File;
use std::io::BufWriter;

use kurbo::{Point, Rect};
use stratum_backend_headless::{CellRasterizer, HeadlessBackend};
use stratum_core::backend::BackendEvent;
use stratum_core::compositor::Compositor;
use stratum_core::config::CompositorConfig;
use stratum_core::region::Region;
use stratum_core::trace::{
    BackendCallEvent, DamageRect, DirtyMarkEvent, LifecycleEvent, PaintEvent, PhaseBeginEvent,
    PhaseEndEvent, PresentEvent, SyncBeginEvent, SyncEndEvent, SyncSummary, TraceSink, Tracer,
};
use stratum_core::widget::{WidgetFlags, WindowType};

use stratum_debug::pretty::PrettyPrintSink;
use stratum_debug::recorder::RecorderSink;

const TRACE_PATH: &str = "tree_demo_trace.json";

type Demo = Compositor<HeadlessBackend, CellRasterizer>;

/// Forwards every event to two sinks.
struct Tee<A, B>(A, B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        self.0.on_sync_begin(e);
        self.1.on_sync_begin(e);
    }
    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        self.0.on_sync_end(e);
        self.1.on_sync_end(e);
    }
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.0.on_phase_begin(e);
        self.1.on_phase_begin(e);
    }
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.0.on_phase_end(e);
        self.1.on_phase_end(e);
    }
    fn on_paint(&mut self, e: &PaintEvent) {
        self.0.on_paint(e);
        self.1.on_paint(e);
    }
    fn on_present(&mut self, e: &PresentEvent) {
        self.0.on_present(e);
        self.1.on_present(e);
    }
    fn on_backend_call(&mut self, e: &BackendCallEvent) {
        self.0.on_backend_call(e);
        self.1.on_backend_call(e);
    }
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.0.on_lifecycle(e);
        self.1.on_lifecycle(e);
    }
    fn on_sync_summary(&mut self, s: &SyncSummary) {
        self.0.on_sync_summary(s);
        self.1.on_sync_summary(s);
    }
    fn on_dirty_mark(&mut self, e: &DirtyMarkEvent) {
        self.0.on_dirty_mark(e);
        self.1.on_dirty_mark(e);
    }
    fn on_damage_rects(&mut self, sync_index: u64, rects: &[DamageRect]) {
        self.0.on_damage_rects(sync_index, rects);
        self.1.on_damage_rects(sync_index, rects);
    }
}

type Sinks = Tee<PrettyPrintSink<std::io::Stderr>, RecorderSink>;

/// One traced event-loop iteration: window-system events, then updates.
fn pump(c: &mut Demo, sinks: &mut Sinks) -> usize {
    let mut tracer = Tracer::new(sinks);
    let events: Vec<BackendEvent> = c.backend_mut().take_events();
    for event in events {
        c.handle_backend_event_traced(event, &mut tracer);
    }
    c.process_pending_traced(&mut tracer)
}

fn step(title: &str, c: &mut Demo, sinks: &mut Sinks) {
    let syncs = pump(c, sinks);
    println!("-- {title} ({syncs} sync{})", if syncs == 1 { "" } else { "s" });
    print!("{}", c.rasterizer().to_text());
    for n in c.drain_notifications() {
        println!("   {n:?}");
    }
}

fn main() {
    let mut sinks = Tee(PrettyPrintSink::new(std::io::stderr()), RecorderSink::new());
    let mut c = Compositor::new(
        HeadlessBackend::new(),
        CellRasterizer::new(32, 10),
        CompositorConfig::default(),
    );
    if let Err(err) = c.initialize() {
        eprintln!("cannot initialize: {err}");
        return;
    }

    // -- tree --------------------------------------------------------------
    let window = c.create_widget(None, WindowType::Window);
    c.set_geometry(window, Rect::new(0.0, 0.0, 32.0, 10.0));
    let panel = c.create_widget(Some(window), WindowType::Widget);
    c.set_geometry(panel, Rect::new(2.0, 1.0, 18.0, 9.0));
    c.set_attribute(panel, WidgetFlags::OPAQUE_PAINT, true);
    let button = c.create_widget(Some(panel), WindowType::Widget);
    c.set_geometry(button, Rect::new(2.0, 2.0, 10.0, 4.0));
    let overlay = c.create_widget(Some(window), WindowType::Widget);
    c.set_geometry(overlay, Rect::new(12.0, 3.0, 28.0, 7.0));

    for (id, fill) in [(window, '.'), (panel, 'p'), (button, 'B'), (overlay, 'o')] {
        c.rasterizer_mut().set_fill(id, fill);
    }

    {
        let mut tracer = Tracer::new(&mut sinks);
        if let Err(err) = c.show_traced(window, &mut tracer) {
            eprintln!("cannot show the window: {err}");
            return;
        }
    }
    step("mapped", &mut c, &mut sinks);

    // -- interaction -------------------------------------------------------
    c.update(button);
    step("button updated", &mut c, &mut sinks);

    c.raise(panel);
    step("panel raised over the overlay", &mut c, &mut sinks);

    c.move_widget(overlay, Point::new(4.0, 0.0));
    c.raise(overlay);
    step("overlay moved and raised", &mut c, &mut sinks);

    c.hide(button);
    step("button hidden", &mut c, &mut sinks);

    if let Some(handle) = c.tree().native_id(window) {
        c.backend_mut()
            .expose(handle, Region::from_rect(Rect::new(0.0, 0.0, 32.0, 10.0)));
    }
    step("window exposed", &mut c, &mut sinks);

    println!("-- tree");
    let snapshot = stratum_debug::snapshot::tree_snapshot(c.tree());
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("cannot serialize the tree: {err}"),
    }

    c.shutdown();

    // -- export ------------------------------------------------------------
    let Tee(_, recorder) = sinks;
    let bytes = recorder.into_bytes();
    match File::create(TRACE_PATH) {
        Ok(file) => {
            let mut writer = BufWriter::new(file);
            match stratum_debug::chrome::export(&bytes, &mut writer) {
                Ok(()) => println!("wrote {TRACE_PATH} ({} bytes recorded)", bytes.len()),
                Err(err) => eprintln!("cannot write {TRACE_PATH}: {err}"),
            }
        }
        Err(err) => eprintln!("cannot create {TRACE_PATH}: {err}"),
    }
}
