// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::ops::Range;

use tracing::trace;

use super::breaker::{BreakToken, LineBreaker};
use super::builder::{LineBox, LineBuilder, LineSink, apply_line_height};
use crate::items::LineItemsData;
use crate::services::{Painter, Services};
use crate::shape::ShapeCache;
use crate::style::LayoutConfig;
use crate::util::{Point, Rect};

/// The lines produced by one call to [`LineLayout::layout_fragment`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutFragment {
    /// Range of [`LineLayout::lines`] placed in this fragment.
    pub lines: Range<usize>,
    /// Sum of the heights of those lines.
    pub block_size: f32,
    /// Where the next fragment resumes, if content remains.
    pub break_token: Option<BreakToken>,
}

/// Line layout of one paragraph.
///
/// Owns the paragraph's items and the shapes computed for them, and keeps the
/// lines of the most recent layout.
#[derive(Debug)]
pub struct LineLayout {
    data: LineItemsData,
    config: LayoutConfig,
    cache: ShapeCache,
    lines: Vec<LineBox>,
}

impl LineLayout {
    /// Creates a layout for `data`.
    pub fn new(data: LineItemsData, config: LayoutConfig) -> Self {
        Self {
            data,
            config,
            cache: ShapeCache::new(),
            lines: Vec::new(),
        }
    }

    /// The paragraph's items.
    pub fn data(&self) -> &LineItemsData {
        &self.data
    }

    /// The paragraph configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replaces the configuration. Lines must be broken again afterwards.
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.lines.clear();
    }

    /// Lines of the last layout, in block order.
    pub fn lines(&self) -> &[LineBox] {
        &self.lines
    }

    /// Total height of the lines of the last layout.
    pub fn height(&self) -> f32 {
        self.lines.iter().map(|line| line.height).sum()
    }

    /// Creates a breaker over the paragraph, for callers driving lines one at
    /// a time.
    pub fn line_breaker<'a>(&'a mut self, services: Services<'a>) -> LineBreaker<'a> {
        LineBreaker::new(&self.data, services, &mut self.cache, &self.config)
    }

    /// Breaks the whole paragraph into lines of `available_width`.
    pub fn break_all_lines(&mut self, services: Services<'_>, available_width: f32) {
        self.layout_fragment(services, available_width, None, None, &mut ());
    }

    /// Lays out lines until the paragraph ends or the next line would exceed
    /// `block_size`. The first line of a fragment is always placed.
    ///
    /// Without a `resume` token previous lines are discarded and layout
    /// starts from the beginning of the paragraph. Line positions are
    /// relative to the top of the fragment.
    pub fn layout_fragment(
        &mut self,
        services: Services<'_>,
        available_width: f32,
        block_size: Option<f32>,
        resume: Option<&BreakToken>,
        sink: &mut dyn LineSink,
    ) -> LayoutFragment {
        if resume.is_none() {
            self.lines.clear();
        }
        let strut = self.strut(services);
        let first_line = self.lines.len();

        let mut breaker = LineBreaker::new(&self.data, services, &mut self.cache, &self.config);
        let mut builder = LineBuilder::new(&self.data, &self.config, strut);
        if let Some(token) = resume {
            breaker.resume(token);
            builder.resume(token);
        }

        let mut y = 0.;
        let mut break_token = None;
        while !breaker.is_done() {
            let token = breaker.break_token();
            let info = breaker.next_line(available_width);
            let line = builder.build_line(info, y);
            if let Some(limit) = block_size {
                if self.lines.len() > first_line && y + line.height > limit {
                    trace!(
                        line = token.line_count(),
                        offset = token.text_offset(),
                        "fragmentainer full"
                    );
                    break_token = Some(token);
                    break;
                }
            }
            builder.emit(&line, sink);
            y += line.height;
            self.lines.push(line);
        }

        LayoutFragment {
            lines: first_line..self.lines.len(),
            block_size: y,
            break_token,
        }
    }

    /// Width of the widest unbreakable unit, such as a word.
    pub fn min_content(&mut self, services: Services<'_>) -> f32 {
        let mut breaker = LineBreaker::new(&self.data, services, &mut self.cache, &self.config);
        breaker.set_intrinsic(true);
        let mut width = 0_f32;
        while !breaker.is_done() {
            let line = breaker.next_line(0.);
            width = width.max(line.line_offset + line.width);
        }
        width
    }

    /// Width of the paragraph without soft wrapping.
    pub fn max_content(&mut self, services: Services<'_>) -> f32 {
        let mut breaker = LineBreaker::new(&self.data, services, &mut self.cache, &self.config);
        let mut width = 0_f32;
        while !breaker.is_done() {
            let line = breaker.next_line(f32::INFINITY);
            width = width.max(line.line_offset + line.width);
        }
        width
    }

    /// Bounds of every line and everything painted on it.
    pub fn overflow_rect(&self) -> Rect {
        self.lines
            .iter()
            .map(LineBox::overflow_rect)
            .reduce(|rect, line| rect.union(&line))
            .unwrap_or_default()
    }

    /// Paints every line with the paragraph's top-left corner at `origin`.
    pub fn paint(&self, painter: &mut dyn Painter, origin: Point) {
        for line in &self.lines {
            let baseline = origin.y + line.baseline;
            for run in &line.runs {
                if run.has_only_trailing_spaces {
                    continue;
                }
                let Some(shape) = &run.shape else {
                    continue;
                };
                let mut x = origin.x + run.x;
                for _ in 0..run.repeat {
                    x += shape.draw(painter, Point::new(x, baseline), run.expansion);
                }
            }
        }
    }

    /// Logical offset closest to `point`, relative to the paragraph's
    /// top-left corner.
    pub fn offset_for_point(&self, point: Point) -> usize {
        let line = self
            .lines
            .iter()
            .find(|line| point.y < line.y + line.height)
            .or_else(|| self.lines.last());
        line.map_or(0, |line| line.offset_for_x(point.x))
    }

    /// Top of the caret before `offset`, relative to the paragraph's
    /// top-left corner.
    pub fn caret_position_for_offset(&self, offset: usize) -> Option<Point> {
        let last = self.lines.len().checked_sub(1)?;
        self.lines.iter().enumerate().find_map(|(index, line)| {
            let on_line = line.text_range.contains(&offset)
                || (index == last && offset == line.text_range.end);
            if !on_line {
                return None;
            }
            line.caret_x(offset).map(|x| Point::new(x, line.y))
        })
    }

    /// Minimum ascent and descent of non-empty lines, from the font of the
    /// first text.
    fn strut(&self, services: Services<'_>) -> (f32, f32) {
        let style = self
            .data
            .items()
            .iter()
            .find(|item| item.is_text())
            .map(|item| self.data.style(item))
            .or_else(|| self.data.styles().first());
        let Some(style) = style else {
            return (0., 0.);
        };
        let Some(font) = services.fonts.font_for_char(' ', style.prefer_emoji) else {
            return (0., 0.);
        };
        let metrics = services.fonts.metrics(font, style.font_size);
        apply_line_height(style, metrics.ascent, metrics.descent)
    }
}
