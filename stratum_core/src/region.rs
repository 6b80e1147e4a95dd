// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectilinear regions.
//!
//! A [`Region`] is a set of pairwise-disjoint, axis-aligned rectangles. It
//! backs every area the compositor reasons about: dirty regions, masks,
//! opaque regions, and the clip handed to the rasterizer.
//!
//! Operations split rectangles instead of approximating them, so regions
//! built from integral coordinates stay integral and set algebra is exact.
//! Equality is semantic: two regions compare equal when they cover the same
//! area, regardless of how that area is decomposed.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

/// A set of disjoint axis-aligned rectangles.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region.
    pub const EMPTY: Self = Self { rects: Vec::new() };

    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Creates a region covering a single rectangle.
    ///
    /// Empty or inverted rectangles produce the empty region.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    /// Creates a region covering the union of `rects`.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.union_rect(rect);
        }
        region
    }

    /// Returns `true` if the region covers no area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Returns the disjoint rectangles making up the region.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Returns the number of rectangles in the decomposition.
    #[inline]
    #[must_use]
    pub fn rect_count(&self) -> usize {
        self.rects.len()
    }

    /// Returns the smallest rectangle containing the whole region, or
    /// [`Rect::ZERO`] when empty.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(*first, |acc, r| acc.union(*r))
    }

    /// Returns the covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(|r| r.width() * r.height()).sum()
    }

    /// Removes everything from the region.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Returns `true` if `point` lies inside the region.
    ///
    /// Rectangles are half-open: the right and bottom edges are excluded.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.rects
            .iter()
            .any(|r| point.x >= r.x0 && point.x < r.x1 && point.y >= r.y0 && point.y < r.y1)
    }

    /// Returns `true` if every point of `rect` is covered by the region.
    ///
    /// An empty `rect` is never contained.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if rect_is_empty(rect) {
            return false;
        }
        let mut rest = Self::from_rect(rect);
        rest.subtract(self);
        rest.is_empty()
    }

    /// Returns `true` if the region overlaps `rect`.
    #[must_use]
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects
            .iter()
            .any(|r| !rect_is_empty(intersect_rects(*r, rect)))
    }

    /// Returns `true` if the two regions overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        other.rects.iter().any(|r| self.intersects_rect(*r))
    }

    /// Adds `rect` to the region.
    pub fn union_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) {
            return;
        }
        if self.rects.iter().any(|r| rect_contains(*r, rect)) {
            return;
        }
        self.rects.retain(|r| !rect_contains(rect, *r));

        let mut pieces = Vec::with_capacity(4);
        pieces.push(rect);
        for existing in &self.rects {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                subtract_into(piece, *existing, &mut next);
            }
            pieces = next;
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
        self.coalesce();
    }

    /// Adds `other` to the region.
    pub fn union(&mut self, other: &Self) {
        for rect in &other.rects {
            self.union_rect(*rect);
        }
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) || self.rects.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.rects.len() + 3);
        for r in self.rects.drain(..) {
            subtract_into(r, rect, &mut out);
        }
        self.rects = out;
        self.coalesce();
    }

    /// Removes `other` from the region.
    pub fn subtract(&mut self, other: &Self) {
        for rect in &other.rects {
            if self.rects.is_empty() {
                return;
            }
            self.subtract_rect(*rect);
        }
    }

    /// Restricts the region to `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| intersect_rects(*r, rect))
            .filter(|r| !rect_is_empty(*r))
            .collect();
    }

    /// Restricts the region to `other`.
    pub fn intersect(&mut self, other: &Self) {
        let mut out = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                let r = intersect_rects(*a, *b);
                if !rect_is_empty(r) {
                    out.push(r);
                }
            }
        }
        self.rects = out;
        self.coalesce();
    }

    /// Returns the intersection of the two regions.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.intersect(other);
        out
    }

    /// Returns the region with `other` removed.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.subtract(other);
        out
    }

    /// Moves the region by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        if offset == Vec2::ZERO {
            return;
        }
        for r in &mut self.rects {
            *r = *r + offset;
        }
    }

    /// Returns the region moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        let mut out = self.clone();
        out.translate(offset);
        out
    }

    /// Collapses the region to its bounding rectangle once it holds more
    /// than `max_rects` rectangles.
    ///
    /// The result always covers the original region.
    pub fn simplify(&mut self, max_rects: usize) {
        if self.rects.len() > max_rects.max(1) {
            let bounds = self.bounding_rect();
            self.rects.clear();
            self.rects.push(bounds);
        }
    }

    /// Merges rectangles that share a full edge.
    fn coalesce(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.rects.len() {
                for j in (i + 1)..self.rects.len() {
                    if let Some(joined) = join_rects(self.rects[i], self.rects[j]) {
                        self.rects[i] = joined;
                        self.rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.difference(other).is_empty() && other.difference(self).is_empty()
    }
}

/// Returns `true` for zero-area, inverted, or NaN rectangles.
#[inline]
pub(crate) fn rect_is_empty(r: Rect) -> bool {
    !(r.x1 > r.x0 && r.y1 > r.y0)
}

/// Intersection that may come back inverted; check with [`rect_is_empty`].
#[inline]
pub(crate) fn intersect_rects(a: Rect, b: Rect) -> Rect {
    Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1))
}

/// Returns `true` if `outer` fully covers `inner`.
#[inline]
fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Pushes the up to four pieces of `a - b` into `out`.
fn subtract_into(a: Rect, b: Rect, out: &mut Vec<Rect>) {
    let overlap = intersect_rects(a, b);
    if rect_is_empty(overlap) {
        out.push(a);
        return;
    }
    if overlap.y0 > a.y0 {
        out.push(Rect::new(a.x0, a.y0, a.x1, overlap.y0));
    }
    if overlap.y1 < a.y1 {
        out.push(Rect::new(a.x0, overlap.y1, a.x1, a.y1));
    }
    if overlap.x0 > a.x0 {
        out.push(Rect::new(a.x0, overlap.y0, overlap.x0, overlap.y1));
    }
    if overlap.x1 < a.x1 {
        out.push(Rect::new(overlap.x1, overlap.y0, a.x1, overlap.y1));
    }
}

/// Joins two disjoint rectangles when their union is itself a rectangle.
fn join_rects(a: Rect, b: Rect) -> Option<Rect> {
    if a.x0 == b.x0 && a.x1 == b.x1 && (a.y1 == b.y0 || b.y1 == a.y0) {
        return Some(Rect::new(a.x0, a.y0.min(b.y0), a.x1, a.y1.max(b.y1)));
    }
    if a.y0 == b.y0 && a.y1 == b.y1 && (a.x1 == b.x0 || b.x1 == a.x0) {
        return Some(Rect::new(a.x0.min(b.x0), a.y0, a.x1.max(b.x1), a.y1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    fn assert_disjoint(region: &Region) {
        let rects = region.rects();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(
                    rect_is_empty(intersect_rects(*a, *b)),
                    "{a:?} overlaps {b:?}"
                );
            }
        }
    }

    #[test]
    fn empty_rect_gives_empty_region() {
        assert!(Region::from_rect(r(10.0, 10.0, 10.0, 20.0)).is_empty());
        assert!(Region::from_rect(r(10.0, 10.0, 5.0, 20.0)).is_empty());
        assert_eq!(Region::new().bounding_rect(), Rect::ZERO);
    }

    #[test]
    fn union_of_overlapping_rects_stays_disjoint() {
        let mut region = Region::from_rect(r(0.0, 0.0, 50.0, 50.0));
        region.union_rect(r(25.0, 25.0, 75.0, 75.0));
        assert_disjoint(&region);
        assert_eq!(region.area(), 2500.0 + 2500.0 - 625.0);
        assert_eq!(region.bounding_rect(), r(0.0, 0.0, 75.0, 75.0));
    }

    #[test]
    fn union_of_adjacent_rects_coalesces() {
        let mut region = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
        region.union_rect(r(10.0, 0.0, 20.0, 10.0));
        assert_eq!(region.rect_count(), 1, "adjacent rects merge");
        assert_eq!(region.rects()[0], r(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn union_with_covered_rect_is_noop() {
        let mut region = Region::from_rect(r(0.0, 0.0, 100.0, 100.0));
        region.union_rect(r(10.0, 10.0, 20.0, 20.0));
        assert_eq!(region.rect_count(), 1);
    }

    #[test]
    fn subtract_punches_hole() {
        let mut region = Region::from_rect(r(0.0, 0.0, 100.0, 100.0));
        region.subtract_rect(r(25.0, 25.0, 75.0, 75.0));
        assert_disjoint(&region);
        assert_eq!(region.area(), 10_000.0 - 2500.0);
        assert!(!region.contains_point(Point::new(50.0, 50.0)));
        assert!(region.contains_point(Point::new(10.0, 50.0)));
    }

    #[test]
    fn subtract_corner_matches_expected_l_shape() {
        let mut region = Region::from_rect(r(0.0, 0.0, 100.0, 100.0));
        region.subtract_rect(r(0.0, 0.0, 50.0, 50.0));
        let expected = Region::from_rects([r(50.0, 0.0, 100.0, 50.0), r(0.0, 50.0, 100.0, 100.0)]);
        assert_eq!(region, expected);
    }

    #[test]
    fn intersect_clips_every_piece() {
        let mut region = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(20.0, 0.0, 30.0, 10.0)]);
        region.intersect_rect(r(5.0, 5.0, 25.0, 25.0));
        let expected = Region::from_rects([r(5.0, 5.0, 10.0, 10.0), r(20.0, 5.0, 25.0, 10.0)]);
        assert_eq!(region, expected);
    }

    #[test]
    fn region_intersection_and_intersects() {
        let a = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
        let b = Region::from_rect(r(10.0, 0.0, 20.0, 10.0));
        assert!(!a.intersects(&b), "touching edges do not overlap");
        assert!(a.intersection(&b).is_empty());

        let c = Region::from_rect(r(5.0, 5.0, 15.0, 15.0));
        assert!(a.intersects(&c));
        assert_eq!(a.intersection(&c), Region::from_rect(r(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn contains_rect_requires_full_cover() {
        let region = Region::from_rects([r(0.0, 0.0, 10.0, 20.0), r(10.0, 0.0, 20.0, 10.0)]);
        assert!(region.contains_rect(r(0.0, 0.0, 20.0, 10.0)));
        assert!(!region.contains_rect(r(0.0, 0.0, 20.0, 20.0)));
        assert!(!region.contains_rect(Rect::ZERO));
    }

    #[test]
    fn translate_moves_all_rects() {
        let region = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(20.0, 20.0, 30.0, 30.0)]);
        let moved = region.translated(Vec2::new(5.0, -5.0));
        assert_eq!(
            moved,
            Region::from_rects([r(5.0, -5.0, 15.0, 5.0), r(25.0, 15.0, 35.0, 25.0)])
        );
    }

    #[test]
    fn simplify_collapses_to_bounds() {
        let mut region = Region::from_rects([
            r(0.0, 0.0, 1.0, 1.0),
            r(5.0, 5.0, 6.0, 6.0),
            r(9.0, 9.0, 10.0, 10.0),
        ]);
        region.simplify(2);
        assert_eq!(region.rect_count(), 1);
        assert_eq!(region.bounding_rect(), r(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn equality_ignores_decomposition() {
        let a = Region::from_rects([r(0.0, 0.0, 10.0, 5.0), r(0.0, 5.0, 10.0, 10.0)]);
        let b = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
        assert_eq!(a, b);
        assert_ne!(a, Region::from_rect(r(0.0, 0.0, 10.0, 9.0)));
    }
}
