// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::ops::Range;

use smallvec::SmallVec;

use super::breaker::{BreakToken, LineInfo};
use crate::bidi::BidiParagraph;
use crate::items::{LineItemKind, LineItemsData};
use crate::shape::TextShapeView;
use crate::style::{LayoutConfig, LineHeight, TextAlign, TextStyle};
use crate::util::{Rect, nearly_zero};

/// Inline boxes enclosing a run, outermost first.
type BoxStack = SmallVec<[usize; 4]>;

/// Receives the geometry of each line as it is realized.
///
/// Every method has an empty default so implementors only pick what they need.
pub trait LineSink {
    /// A run has been placed on line `line`.
    fn place_run(&mut self, line: usize, run: &PlacedRun) {
        let _ = (line, run);
    }

    /// An inline box has a fragment on line `line`.
    fn place_inline_box(&mut self, line: usize, fragment: &InlineBoxFragment) {
        let _ = (line, fragment);
    }

    /// Line `line` is complete.
    fn finish_line(&mut self, line: usize, line_box: &LineBox) {
        let _ = (line, line_box);
    }
}

impl LineSink for () {}

/// What a placed run represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlacedRunKind {
    /// Shaped text.
    Text,
    /// Preserved tabs.
    Tab,
    /// Leader text, possibly repeated.
    Leader,
    /// An atomic inline, by index into [`LineItemsData::replaced`].
    Replaced(usize),
    /// A float anchor, by index into [`LineItemsData::floats`].
    Float(usize),
    /// A positioned box anchor, by index into [`LineItemsData::positioned`].
    Positioned(usize),
    /// The start edge of an inline box.
    InlineStart(usize),
    /// The end edge of an inline box.
    InlineEnd(usize),
    /// A soft or forced break.
    Break,
    /// Bidi controls.
    Control,
}

impl PlacedRunKind {
    fn from_item(kind: LineItemKind) -> Self {
        match kind {
            LineItemKind::NormalText => Self::Text,
            LineItemKind::TabulationText => Self::Tab,
            LineItemKind::LeaderText => Self::Leader,
            LineItemKind::Replaced(index) => Self::Replaced(index),
            LineItemKind::Floating(index) => Self::Float(index),
            LineItemKind::Positioned(index) => Self::Positioned(index),
            LineItemKind::InlineStart(index) => Self::InlineStart(index),
            LineItemKind::InlineEnd(index) => Self::InlineEnd(index),
            LineItemKind::SoftBreakOpportunity | LineItemKind::HardBreakOpportunity => {
                Self::Break
            }
            LineItemKind::BidiControl => Self::Control,
        }
    }
}

/// A run with its final horizontal position.
#[derive(Clone, Debug)]
pub struct PlacedRun {
    /// What the run represents.
    pub kind: PlacedRunKind,
    /// Index into [`LineItemsData::items`].
    pub item_index: usize,
    /// Range of the paragraph text covered by the run.
    pub text_range: Range<usize>,
    /// Left edge, relative to the paragraph.
    pub x: f32,
    /// Advance, including every repetition.
    pub width: f32,
    /// Bidi level used for reordering.
    pub bidi_level: u8,
    /// Justification added per expansion opportunity.
    pub expansion: f32,
    /// Glyphs, for runs that have them.
    pub shape: Option<TextShapeView>,
    /// Number of times the glyphs are drawn. Greater than one only for leaders.
    pub repeat: usize,
    /// The run hangs past the end of the line.
    pub has_only_trailing_spaces: bool,
}

/// The part of an inline box that falls on one line.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineBoxFragment {
    /// Index into [`LineItemsData::inline_boxes`].
    pub box_index: usize,
    /// Left edge, relative to the paragraph.
    pub x: f32,
    /// Width including the edges that fall on this line.
    pub width: f32,
    /// The box opens on this line.
    pub starts_here: bool,
    /// The box closes on this line.
    pub ends_here: bool,
}

/// A realized line.
#[derive(Clone, Debug)]
pub struct LineBox {
    /// Range of the paragraph text on the line, trailing spaces included.
    pub text_range: Range<usize>,
    /// Left edge of the content.
    pub x: f32,
    /// Top edge, relative to the top of the fragment.
    pub y: f32,
    /// Width of the content, excluding hanging spaces.
    pub width: f32,
    /// Width of hanging spaces.
    pub trailing_width: f32,
    /// Height above the baseline.
    pub ascent: f32,
    /// Depth below the baseline.
    pub descent: f32,
    /// Line height.
    pub height: f32,
    /// Baseline, relative to the top of the fragment.
    pub baseline: f32,
    /// Runs in visual order.
    pub runs: Vec<PlacedRun>,
    /// Fragments of inline boxes on this line.
    pub inline_boxes: Vec<InlineBoxFragment>,
    /// Number of floats before any content.
    pub leading_float_count: usize,
    /// The line ends with a forced break.
    pub ends_with_break: bool,
    /// The line has no content and takes no space.
    pub is_empty: bool,
    /// First line of the paragraph.
    pub is_first_line: bool,
    /// Last line of the paragraph.
    pub is_last_line: bool,
}

impl LineBox {
    /// The content box of the line.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// The bounds of the line and everything placed on it.
    pub fn overflow_rect(&self) -> Rect {
        self.runs
            .iter()
            .filter(|run| run.width > 0.)
            .map(|run| Rect::new(run.x, self.y, run.x + run.width, self.y + self.height))
            .fold(self.bounds(), |rect, run| rect.union(&run))
    }

    /// Logical offset closest to `x`.
    pub fn offset_for_x(&self, x: f32) -> usize {
        let mut candidates = self
            .runs
            .iter()
            .filter(|run| !run.text_range.is_empty() && (run.width > 0. || run.shape.is_some()))
            .peekable();
        let Some(&first) = candidates.peek() else {
            return self.text_range.start;
        };
        let mut hit = first;
        if x >= first.x {
            for run in candidates {
                hit = run;
                if x < run.x + run.width {
                    break;
                }
            }
        }
        let local = x - hit.x;
        match &hit.shape {
            Some(shape) => {
                let base = hit.text_range.start - shape.start();
                base + shape.offset_for_position(local)
            }
            None => {
                let rtl = hit.bidi_level & 1 == 1;
                if (local < hit.width * 0.5) != rtl {
                    hit.text_range.start
                } else {
                    hit.text_range.end
                }
            }
        }
    }

    /// Horizontal caret position before `offset`, if the offset is on this line.
    pub fn caret_x(&self, offset: usize) -> Option<f32> {
        let containing = self
            .runs
            .iter()
            .find(|run| run.text_range.contains(&offset))
            .or_else(|| self.runs.iter().find(|run| run.text_range.end == offset))?;
        Some(match &containing.shape {
            Some(shape) => {
                let base = containing.text_range.start - shape.start();
                containing.x + shape.caret_position(offset - base)
            }
            None => {
                let at_end = offset >= containing.text_range.end;
                let rtl = containing.bidi_level & 1 == 1;
                if at_end != rtl {
                    containing.x + containing.width
                } else {
                    containing.x
                }
            }
        })
    }
}

/// Realizes [`LineInfo`]s into [`LineBox`]es, one line at a time.
///
/// The builder only positions content that the breaker has already decided on.
/// It keeps the stack of inline boxes left open at the end of each line so
/// that boxes spanning several lines produce one fragment per line.
#[derive(Debug)]
pub struct LineBuilder<'a> {
    data: &'a LineItemsData,
    config: &'a LayoutConfig,
    strut: (f32, f32),
    open_boxes: BoxStack,
    line_index: usize,
}

impl<'a> LineBuilder<'a> {
    /// Creates a builder. `strut` is the minimum ascent and descent of
    /// non-empty lines.
    pub fn new(data: &'a LineItemsData, config: &'a LayoutConfig, strut: (f32, f32)) -> Self {
        Self {
            data,
            config,
            strut,
            open_boxes: BoxStack::new(),
            line_index: 0,
        }
    }

    /// Continues after lines produced before `token`, reopening the inline
    /// boxes still open at that point.
    pub fn resume(&mut self, token: &BreakToken) {
        self.open_boxes.clear();
        let end = token.item_index().min(self.data.items().len());
        for item in &self.data.items()[..end] {
            match item.kind() {
                LineItemKind::InlineStart(index) => self.open_boxes.push(index),
                LineItemKind::InlineEnd(index) => {
                    if let Some(position) = self.open_boxes.iter().rposition(|&open| open == index)
                    {
                        self.open_boxes.remove(position);
                    }
                }
                _ => {}
            }
        }
        self.line_index = token.line_count();
    }

    /// Positions the content of `info` with its top edge at `y`.
    pub fn build_line(&mut self, mut info: LineInfo, y: f32) -> LineBox {
        let justified = self.config.text_align == TextAlign::Justify && info.justify();
        let leader = if justified {
            None
        } else {
            self.leader_repeat(&info)
        };
        if let Some((index, repeat)) = leader {
            // Leaders stretch by whole repetitions to take up free space.
            let extra = info.runs[index].width * (repeat - 1) as f32;
            info.runs[index].width += extra;
            info.width += extra;
        }
        let enclosing = self.enclosing_boxes(&info);
        let levels = self.line_levels(&info);
        let order: Vec<usize> = if self.data.is_bidi_enabled() {
            BidiParagraph::reorder_visual(&levels)
        } else {
            (0..info.runs.len()).collect()
        };

        let (ascent, descent) = if info.is_empty_line {
            (0., 0.)
        } else {
            self.line_metrics(&info)
        };

        let offset = self.align_offset(&info, justified);
        // Spaces hanging on the left edge of a right-to-left line.
        let hang_left: f32 = if self.data.base_direction().is_rtl() {
            order
                .iter()
                .map(|&index| &info.runs[index])
                .take_while(|run| run.has_only_trailing_spaces || nearly_zero(run.width))
                .filter(|run| run.has_only_trailing_spaces)
                .map(|run| run.width)
                .sum()
        } else {
            0.
        };
        let content_left = offset;
        let mut pen = offset - hang_left;

        let mut runs = Vec::with_capacity(info.runs.len());
        let mut repeats = vec![1; info.runs.len()];
        if let Some((index, repeat)) = leader {
            repeats[index] = repeat;
        }
        for &index in &order {
            let run = &info.runs[index];
            runs.push(PlacedRun {
                kind: PlacedRunKind::from_item(run.kind),
                item_index: run.item_index,
                text_range: run.text_range.clone(),
                x: pen,
                width: run.width,
                bidi_level: levels[index],
                expansion: run.expansion,
                shape: run.shape.clone(),
                repeat: repeats[index],
                has_only_trailing_spaces: run.has_only_trailing_spaces,
            });
            pen += run.width;
        }

        let inline_boxes = inline_box_fragments(&order, &runs, &enclosing);
        let height = if info.is_empty_line { 0. } else { ascent + descent };
        let line = LineBox {
            text_range: info.text_range.clone(),
            x: content_left,
            y,
            width: info.width,
            trailing_width: info.trailing_width,
            ascent,
            descent,
            height,
            baseline: y + ascent,
            runs,
            inline_boxes,
            leading_float_count: info.leading_float_count,
            ends_with_break: info.ends_with_break,
            is_empty: info.is_empty_line,
            is_first_line: info.is_first_line,
            is_last_line: info.is_last_line,
        };
        self.line_index += 1;
        line
    }

    /// Reports a built line to `sink`.
    pub fn emit(&self, line: &LineBox, sink: &mut dyn LineSink) {
        let index = self.line_index.saturating_sub(1);
        for run in &line.runs {
            sink.place_run(index, run);
        }
        for fragment in &line.inline_boxes {
            sink.place_inline_box(index, fragment);
        }
        sink.finish_line(index, line);
    }

    fn leader_repeat(&self, info: &LineInfo) -> Option<(usize, usize)> {
        let free = info.available_width - info.width;
        let index = info
            .runs
            .iter()
            .position(|run| run.kind == LineItemKind::LeaderText)?;
        let run = &info.runs[index];
        let unit = run.shape.as_ref()?.width(0.);
        if unit <= 0. || free <= 0. {
            return None;
        }
        let repeat = 1 + (free / unit).floor() as usize;
        (repeat > 1).then_some((index, repeat))
    }

    /// Levels after resetting trailing whitespace to the paragraph level.
    fn line_levels(&self, info: &LineInfo) -> Vec<u8> {
        let base = self.data.base_direction().level();
        let mut levels: Vec<u8> = info.runs.iter().map(|run| run.bidi_level).collect();
        for (level, run) in levels.iter_mut().zip(&info.runs).rev() {
            let resets = run.has_only_trailing_spaces
                || matches!(
                    run.kind,
                    LineItemKind::BidiControl
                        | LineItemKind::SoftBreakOpportunity
                        | LineItemKind::HardBreakOpportunity
                );
            if !resets {
                break;
            }
            *level = base;
        }
        levels
    }

    fn align_offset(&self, info: &LineInfo, justified: bool) -> f32 {
        let rtl = self.data.base_direction().is_rtl();
        let free = info.available_width - info.width;
        let start = if rtl { 0. } else { info.line_offset };
        if justified || (!self.config.align_when_overflowing && free <= 0.) {
            return if rtl && free > 0. { free } else { start };
        }
        match (self.config.text_align, rtl) {
            (TextAlign::Left, _) | (TextAlign::Start, false) | (TextAlign::End, true) => start,
            (TextAlign::Right, _) | (TextAlign::Start, true) | (TextAlign::End, false) => {
                start + free
            }
            (TextAlign::Center, _) => start + free * 0.5,
            // Lines that cannot be justified are start aligned.
            (TextAlign::Justify, false) => start,
            (TextAlign::Justify, true) => start + free,
        }
    }

    fn line_metrics(&self, info: &LineInfo) -> (f32, f32) {
        let (mut ascent, mut descent) = self.strut;
        for run in &info.runs {
            let item = &self.data.items()[run.item_index];
            match run.kind {
                LineItemKind::Replaced(index) => {
                    let replaced = &self.data.replaced()[index];
                    ascent = ascent.max(replaced.ascent);
                    descent = descent.max(replaced.descent);
                }
                _ => {
                    if run.has_only_trailing_spaces {
                        continue;
                    }
                    let Some(shape) = &run.shape else {
                        continue;
                    };
                    let (a, d) = shape.max_ascent_and_descent();
                    let (a, d) = apply_line_height(self.data.style(item), a, d);
                    ascent = ascent.max(a);
                    descent = descent.max(d);
                }
            }
        }
        (ascent, descent)
    }

    fn enclosing_boxes(&mut self, info: &LineInfo) -> Vec<BoxStack> {
        let mut stack = self.open_boxes.clone();
        let enclosing = info
            .runs
            .iter()
            .map(|run| match run.kind {
                LineItemKind::InlineStart(index) => {
                    stack.push(index);
                    stack.clone()
                }
                LineItemKind::InlineEnd(index) => {
                    let current = stack.clone();
                    if let Some(position) = stack.iter().rposition(|&open| open == index) {
                        stack.remove(position);
                    }
                    current
                }
                _ => stack.clone(),
            })
            .collect();
        self.open_boxes = stack;
        enclosing
    }
}

/// Applies half-leading for an explicit line height.
pub(crate) fn apply_line_height(style: &TextStyle, ascent: f32, descent: f32) -> (f32, f32) {
    match style.line_height {
        LineHeight::Normal => (ascent, descent),
        LineHeight::Px(height) => {
            let half_leading = (height - (ascent + descent)) * 0.5;
            (ascent + half_leading, descent + half_leading)
        }
    }
}

fn inline_box_fragments(
    order: &[usize],
    runs: &[PlacedRun],
    enclosing: &[BoxStack],
) -> Vec<InlineBoxFragment> {
    let mut fragments: Vec<InlineBoxFragment> = Vec::new();
    for (run, &logical) in runs.iter().zip(order) {
        for &box_index in &enclosing[logical] {
            let right = run.x + run.width;
            let position = match fragments
                .iter()
                .position(|fragment| fragment.box_index == box_index)
            {
                Some(position) => {
                    let fragment = &mut fragments[position];
                    let left = fragment.x.min(run.x);
                    fragment.width = (fragment.x + fragment.width).max(right) - left;
                    fragment.x = left;
                    position
                }
                None => {
                    fragments.push(InlineBoxFragment {
                        box_index,
                        x: run.x,
                        width: run.width,
                        starts_here: false,
                        ends_here: false,
                    });
                    fragments.len() - 1
                }
            };
            match run.kind {
                PlacedRunKind::InlineStart(index) if index == box_index => {
                    fragments[position].starts_here = true;
                }
                PlacedRunKind::InlineEnd(index) if index == box_index => {
                    fragments[position].ends_here = true;
                }
                _ => {}
            }
        }
    }
    fragments
}
