// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Character-cell rasterizer.
//!
//! [`CellRasterizer`] paints each widget as a solid fill of one character
//! into a grid of cells, one cell per unit of window coordinates. It makes
//! occlusion and partial repaints visible in plain text.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Rect, Vec2};
use stratum_core::paint::{PaintContext, Rasterizer};
use stratum_core::region::Region;
use stratum_core::widget::WidgetId;

/// One paint call as seen by the rasterizer.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintRecord {
    /// Widget painted.
    pub widget: WidgetId,
    /// Bounds of the painted region, in surface coordinates.
    pub bounds: Rect,
    /// Area of the painted region.
    pub area: f64,
}

/// A [`Rasterizer`] that fills widgets with characters.
#[derive(Debug)]
pub struct CellRasterizer {
    width: usize,
    height: usize,
    cells: Vec<char>,
    fills: HashMap<WidgetId, char>,
    backgrounds: HashMap<WidgetId, char>,
    log: Vec<PaintRecord>,
}

impl CellRasterizer {
    /// Creates a `width` by `height` grid of `'.'`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec!['.'; width * height],
            fills: HashMap::new(),
            backgrounds: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Paints `widget` with `fill` from now on. Unassigned widgets paint
    /// `'?'`.
    pub fn set_fill(&mut self, widget: WidgetId, fill: char) {
        self.fills.insert(widget, fill);
    }

    /// Fills `widget`'s background with `fill` before it paints.
    pub fn set_background(&mut self, widget: WidgetId, fill: char) {
        self.backgrounds.insert(widget, fill);
    }

    /// Returns the cell at (`x`, `y`).
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    /// Returns the paint calls since the last [`clear_log`](Self::clear_log).
    #[must_use]
    pub fn log(&self) -> &[PaintRecord] {
        &self.log
    }

    /// Forgets recorded paint calls.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Returns the grid as text, one line per row.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.cells.chunks(self.width.max(1)) {
            out.extend(row);
            out.push('\n');
        }
        out
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "coordinates are clamped to the grid before conversion"
    )]
    fn fill(&mut self, region: &Region, offset: Vec2, fill: char) {
        let (w, h) = (self.width as f64, self.height as f64);
        for r in region.rects() {
            let r = *r + offset;
            let x0 = r.x0.floor().clamp(0.0, w) as usize;
            let x1 = r.x1.ceil().clamp(0.0, w) as usize;
            let y0 = r.y0.floor().clamp(0.0, h) as usize;
            let y1 = r.y1.ceil().clamp(0.0, h) as usize;
            for y in y0..y1 {
                self.cells[y * self.width + x0..y * self.width + x1].fill(fill);
            }
        }
    }
}

impl Rasterizer for CellRasterizer {
    fn paint(
        &mut self,
        widget: WidgetId,
        region: &Region,
        offset: Vec2,
        _ctx: &mut PaintContext<'_>,
    ) {
        let fill = self.fills.get(&widget).copied().unwrap_or('?');
        self.fill(region, offset, fill);
        self.log.push(PaintRecord {
            widget,
            bounds: region.bounding_rect() + offset,
            area: region.area(),
        });
    }

    fn paint_background(&mut self, widget: WidgetId, region: &Region, offset: Vec2) {
        if let Some(&fill) = self.backgrounds.get(&widget) {
            self.fill(region, offset, fill);
        }
    }
}
