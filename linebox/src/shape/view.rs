// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use crate::services::{Painter, PositionedGlyph};
use crate::shape::{GlyphData, TextShape, TextShapeRun};
use crate::style::Direction;
use crate::util::{Point, is_space_like, is_zero_width_space_like};

struct ViewGlyph<'a> {
    run_index: usize,
    run: &'a TextShapeRun,
    glyph: &'a GlyphData,
    ch: char,
}

/// A logical sub-range of a shared [`TextShape`].
///
/// Nothing is cached: every query rescans the glyphs that overlap the range.
#[derive(Clone, Debug)]
pub struct TextShapeView {
    shape: Rc<TextShape>,
    start: usize,
    end: usize,
}

impl TextShapeView {
    /// Creates a view over `start..end` of `shape`.
    pub fn new(shape: Rc<TextShape>, start: usize, end: usize) -> Self {
        debug_assert!(
            start <= end && end <= shape.text().len(),
            "view range out of bounds"
        );
        Self { shape, start, end }
    }

    /// Creates a view over the whole shape.
    pub fn full(shape: Rc<TextShape>) -> Self {
        let end = shape.text().len();
        Self::new(shape, 0, end)
    }

    /// The underlying shape.
    pub fn shape(&self) -> &Rc<TextShape> {
        &self.shape
    }

    /// Start of the range, relative to the shape's text.
    pub fn start(&self) -> usize {
        self.start
    }

    /// End of the range, relative to the shape's text.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns `true` if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text covered by the view.
    pub fn text(&self) -> &str {
        &self.shape.text()[self.start..self.end]
    }

    /// Glyphs whose source character lies in the range, runs in visual order.
    fn glyphs(&self) -> impl Iterator<Item = ViewGlyph<'_>> + '_ {
        let text = self.shape.text();
        let (start, end) = (self.start, self.end);
        let rtl = self.shape.direction().is_rtl();
        self.shape
            .runs()
            .iter()
            .enumerate()
            .filter(move |(_, run)| run.offset() + run.length() > start && run.offset() < end)
            .flat_map(move |(run_index, run)| {
                // Clusters ascend along LTR runs and descend along RTL runs.
                run.glyphs()
                    .iter()
                    .map(move |glyph| (run.offset() + glyph.character_index, glyph))
                    .skip_while(move |&(offset, _)| if rtl { offset >= end } else { offset < start })
                    .take_while(move |&(offset, _)| if rtl { offset >= start } else { offset < end })
                    .map(move |(offset, glyph)| ViewGlyph {
                        run_index,
                        run,
                        glyph,
                        ch: text
                            .get(offset..)
                            .and_then(|rest| rest.chars().next())
                            .unwrap_or_default(),
                    })
            })
    }

    /// Number of places justification may insert space.
    pub fn expansion_opportunity_count(&self) -> usize {
        self.glyphs().filter(|glyph| is_space_like(glyph.ch)).count()
    }

    /// Largest ascent and descent of the fonts used in the range.
    pub fn max_ascent_and_descent(&self) -> (f32, f32) {
        let mut ascent = 0_f32;
        let mut descent = 0_f32;
        for glyph in self.glyphs() {
            ascent = ascent.max(glyph.run.ascent());
            descent = descent.max(glyph.run.descent());
        }
        (ascent, descent)
    }

    /// Advance of the range with `expansion` added per space-like character.
    pub fn width(&self, expansion: f32) -> f32 {
        self.glyphs()
            .map(|glyph| {
                if is_space_like(glyph.ch) {
                    glyph.glyph.advance + expansion
                } else {
                    glyph.glyph.advance
                }
            })
            .sum()
    }

    /// Paints the range with its left edge at `origin.x` and baseline at
    /// `origin.y`, one glyph batch per run. Returns the advance consumed.
    pub fn draw(&self, painter: &mut dyn Painter, origin: Point, expansion: f32) -> f32 {
        let mut pen = origin.x;
        let mut batch: Vec<PositionedGlyph> = Vec::new();
        let mut current: Option<(usize, &TextShapeRun)> = None;
        for glyph in self.glyphs() {
            if let Some((run_index, run)) = current {
                if run_index != glyph.run_index {
                    show_batch(painter, run, &mut batch);
                }
            }
            current = Some((glyph.run_index, glyph.run));
            if !is_zero_width_space_like(glyph.ch) {
                batch.push(PositionedGlyph {
                    id: glyph.glyph.glyph_id,
                    x: pen + glyph.glyph.x_offset,
                    y: origin.y + glyph.glyph.y_offset,
                });
            }
            pen += glyph.glyph.advance;
            if is_space_like(glyph.ch) {
                pen += expansion;
            }
        }
        if let Some((_, run)) = current {
            show_batch(painter, run, &mut batch);
        }
        pen - origin.x
    }

    /// Distance from the view's left edge to the caret before `offset`.
    pub fn caret_position(&self, offset: usize) -> f32 {
        let offset = offset.clamp(self.start, self.end);
        let left_edge = match self.shape.direction() {
            Direction::Ltr => self.shape.position_for_offset(self.start),
            Direction::Rtl => self.shape.position_for_offset(self.end),
        };
        self.shape.position_for_offset(offset) - left_edge
    }

    /// Offset of the cluster under `position`, measured from the view's left edge.
    pub fn offset_for_position(&self, position: f32) -> usize {
        let left_edge = match self.shape.direction() {
            Direction::Ltr => self.shape.position_for_offset(self.start),
            Direction::Rtl => self.shape.position_for_offset(self.end),
        };
        self.shape
            .offset_for_position(position + left_edge)
            .clamp(self.start, self.end)
    }
}

fn show_batch(painter: &mut dyn Painter, run: &TextShapeRun, batch: &mut Vec<PositionedGlyph>) {
    if !batch.is_empty() {
        painter.show_glyphs(run.font(), run.font_size(), batch);
        batch.clear();
    }
}
