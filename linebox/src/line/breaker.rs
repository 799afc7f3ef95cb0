// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy line breaking.

use core::ops::Range;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::items::{CollapseState, LineItem, LineItemKind, LineItemsData};
use crate::services::Services;
use crate::shape::{ShapeCache, TextShape, TextShapeView};
use crate::style::{LayoutConfig, OverflowWrap, TextStyle, WhiteSpaceCollapse};
use crate::util::nearly_eq;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BreakerState {
    /// Accumulating content that decides where the line ends.
    Continue,
    /// The break point is chosen; only trailing spaces may still be appended.
    Trailing,
    /// No items left.
    Done,
}

/// A point between two lines from which breaking can resume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakToken {
    pub(crate) item_index: usize,
    pub(crate) offset: usize,
    pub(crate) line_count: usize,
}

impl BreakToken {
    /// Index of the first item not yet placed.
    pub fn item_index(&self) -> usize {
        self.item_index
    }

    /// Text offset of the first character not yet placed.
    pub fn text_offset(&self) -> usize {
        self.offset
    }

    /// Number of lines produced before this point.
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

/// One item, or the part of it that falls on a line, with its measurements.
#[derive(Clone, Debug)]
pub struct LineItemRun {
    /// Index into [`LineItemsData::items`].
    pub item_index: usize,
    /// Kind of the item.
    pub kind: LineItemKind,
    /// Range of the paragraph text covered by the run.
    pub text_range: Range<usize>,
    /// Advance of the run, including any justification expansion.
    pub width: f32,
    /// Space added per expansion opportunity by [`LineInfo::justify`].
    pub expansion: f32,
    /// The glyphs of the run. `None` for runs without glyphs.
    pub shape: Option<TextShapeView>,
    /// A line may end after this run.
    pub can_break_after: bool,
    /// The run contains a break opportunity that was not taken.
    pub may_break_inside: bool,
    /// The run is whitespace that hangs past the end of the line.
    pub has_only_trailing_spaces: bool,
    /// Resolved bidi level.
    pub bidi_level: u8,
}

impl LineItemRun {
    fn is_content(&self) -> bool {
        self.width > 0. || matches!(self.kind, LineItemKind::Replaced(_))
    }

    fn is_transparent(&self) -> bool {
        matches!(
            self.kind,
            LineItemKind::BidiControl
                | LineItemKind::SoftBreakOpportunity
                | LineItemKind::HardBreakOpportunity
                | LineItemKind::Positioned(_)
                | LineItemKind::Floating(_)
                | LineItemKind::InlineStart(_)
                | LineItemKind::InlineEnd(_)
        )
    }
}

/// The content of one line, in logical order.
#[derive(Clone, Debug)]
pub struct LineInfo {
    /// Runs in logical order.
    pub runs: Vec<LineItemRun>,
    /// Range of the paragraph text consumed by the line, trailing spaces included.
    pub text_range: Range<usize>,
    /// Range of items touched by the line.
    pub item_range: Range<usize>,
    /// Advance of the runs, excluding trailing spaces.
    pub width: f32,
    /// Advance of the trailing spaces.
    pub trailing_width: f32,
    /// Width available to content, after the line offset.
    pub available_width: f32,
    /// Inline offset of the line's start edge, from text-indent.
    pub line_offset: f32,
    /// Number of floats at the start of the line, before any content.
    pub leading_float_count: usize,
    /// The line ends with a forced break.
    pub ends_with_break: bool,
    /// The line has nothing that generates a line box.
    pub is_empty_line: bool,
    /// First line of the paragraph.
    pub is_first_line: bool,
    /// Last line of the paragraph.
    pub is_last_line: bool,
    has_content: bool,
}

impl LineInfo {
    fn new(
        item_index: usize,
        offset: usize,
        is_first_line: bool,
        line_offset: f32,
        available_width: f32,
    ) -> Self {
        Self {
            runs: Vec::new(),
            text_range: offset..offset,
            item_range: item_index..item_index,
            width: 0.,
            trailing_width: 0.,
            available_width,
            line_offset,
            leading_float_count: 0,
            ends_with_break: false,
            is_empty_line: true,
            is_first_line,
            is_last_line: false,
            has_content: false,
        }
    }

    /// Distributes the free space of the line over its expansion
    /// opportunities. Returns `false`, leaving the line untouched, for the last
    /// line, lines ending in a forced break and lines without opportunities.
    pub fn justify(&mut self) -> bool {
        let free = self.available_width - self.width;
        if self.ends_with_break || self.is_last_line || free <= 0. || nearly_eq(free, 0.) {
            return false;
        }
        let count: usize = self
            .runs
            .iter()
            .filter(|run| !run.has_only_trailing_spaces)
            .filter_map(|run| run.shape.as_ref())
            .map(TextShapeView::expansion_opportunity_count)
            .sum();
        if count == 0 {
            return false;
        }
        let expansion = free / count as f32;
        for run in &mut self.runs {
            if run.has_only_trailing_spaces {
                continue;
            }
            let Some(shape) = &run.shape else {
                continue;
            };
            let opportunities = shape.expansion_opportunity_count();
            if opportunities > 0 {
                run.expansion = expansion;
                run.width += expansion * opportunities as f32;
            }
        }
        self.width = self.available_width;
        true
    }

    fn push(&mut self, run: LineItemRun) {
        self.width += run.width;
        self.has_content |= run.is_content();
        self.runs.push(run);
    }

    fn recompute_width(&mut self) {
        self.width = self.runs.iter().map(|run| run.width).sum();
        self.has_content = self.runs.iter().any(LineItemRun::is_content);
    }
}

/// Produces one [`LineInfo`] per call from [`LineItemsData`].
#[derive(Debug)]
pub struct LineBreaker<'a> {
    data: &'a LineItemsData,
    services: Services<'a>,
    cache: &'a mut ShapeCache,
    break_opportunities: Vec<usize>,
    text_indent: f32,
    intrinsic: bool,
    item_index: usize,
    offset: usize,
    line_count: usize,
    state: BreakerState,
}

impl<'a> LineBreaker<'a> {
    pub(crate) fn new(
        data: &'a LineItemsData,
        services: Services<'a>,
        cache: &'a mut ShapeCache,
        config: &LayoutConfig,
    ) -> Self {
        let break_opportunities = services.unicode.line_break_opportunities(data.text());
        let state = if data.items().is_empty() {
            BreakerState::Done
        } else {
            BreakerState::Continue
        };
        Self {
            data,
            services,
            cache,
            break_opportunities,
            text_indent: config.text_indent,
            intrinsic: false,
            item_index: 0,
            offset: 0,
            line_count: 0,
            state,
        }
    }

    /// Breaks for min-content sizing, where `overflow-wrap: break-word` does
    /// not introduce break opportunities.
    pub(crate) fn set_intrinsic(&mut self, intrinsic: bool) {
        self.intrinsic = intrinsic;
    }

    /// Continues from a point returned by [`break_token`](Self::break_token).
    pub fn resume(&mut self, token: &BreakToken) {
        self.item_index = token.item_index.min(self.data.items().len());
        self.offset = token.offset;
        self.line_count = token.line_count;
        self.state = if self.is_done() {
            BreakerState::Done
        } else {
            BreakerState::Continue
        };
    }

    /// The point the next line starts from.
    pub fn break_token(&self) -> BreakToken {
        BreakToken {
            item_index: self.item_index,
            offset: self.offset,
            line_count: self.line_count,
        }
    }

    /// Returns `true` once every item has been placed on a line.
    pub fn is_done(&self) -> bool {
        self.item_index == self.data.items().len()
    }

    /// Number of lines produced so far, including lines before a resume point.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Fills one line of `available_width`.
    pub fn next_line(&mut self, available_width: f32) -> LineInfo {
        let is_first_line = self.line_count == 0;
        let line_offset = if is_first_line { self.text_indent } else { 0. };
        let mut line = LineInfo::new(
            self.item_index,
            self.offset,
            is_first_line,
            line_offset,
            available_width - line_offset,
        );
        let start = (self.item_index, self.offset);

        while self.state == BreakerState::Continue {
            let data = self.data;
            let Some(item) = data.items().get(self.item_index) else {
                self.state = BreakerState::Done;
                break;
            };
            match item.kind() {
                LineItemKind::NormalText
                | LineItemKind::TabulationText
                | LineItemKind::LeaderText => self.handle_text(&mut line, item),
                LineItemKind::Replaced(index) => {
                    let replaced = &data.replaced()[index];
                    let style = data.style(item);
                    let run = LineItemRun {
                        can_break_after: style.white_space.auto_wrap()
                            && self.is_break_opportunity(item.range().end),
                        ..self.marker_run(item, replaced.width)
                    };
                    self.place_unit(&mut line, run, replaced.width, style.overflow_wrap);
                }
                LineItemKind::SoftBreakOpportunity => {
                    let can_break = data.style(item).white_space.auto_wrap() && line.has_content;
                    self.commit_marker(&mut line, item, 0., can_break);
                }
                LineItemKind::HardBreakOpportunity => {
                    self.commit_marker(&mut line, item, 0., false);
                    line.ends_with_break = true;
                    self.state = BreakerState::Trailing;
                }
                LineItemKind::Floating(_) => {
                    if !line.has_content {
                        line.leading_float_count += 1;
                    }
                    self.commit_marker(&mut line, item, 0., false);
                }
                LineItemKind::BidiControl | LineItemKind::Positioned(_) => {
                    self.commit_marker(&mut line, item, 0., false);
                }
                LineItemKind::InlineStart(index) => {
                    let width = data.inline_boxes()[index].inline_start;
                    self.commit_marker(&mut line, item, width, false);
                }
                LineItemKind::InlineEnd(index) => {
                    // A break opportunity before the end of a box moves after it.
                    let can_break = line
                        .runs
                        .last_mut()
                        .is_some_and(|run| core::mem::take(&mut run.can_break_after));
                    let width = data.inline_boxes()[index].inline_end;
                    self.commit_marker(&mut line, item, width, can_break);
                }
            }
        }

        if self.state == BreakerState::Trailing && !line.ends_with_break {
            self.consume_trailing_spaces(&mut line);
        }
        if (self.item_index, self.offset) == start && !self.is_done() {
            debug_assert!(false, "line made no progress");
            self.force_progress(&mut line);
        }
        self.finish_line(&mut line);
        self.state = if self.is_done() {
            BreakerState::Done
        } else {
            BreakerState::Continue
        };
        line
    }

    fn handle_text(&mut self, line: &mut LineInfo, item: &'a LineItem) {
        let index = self.item_index;
        let shape = if item.collapse() == CollapseState::Collapsed {
            None
        } else {
            self.cache.get_or_shape(index, self.data, self.services)
        };
        let Some(shape) = shape else {
            self.commit_marker(line, item, 0., false);
            return;
        };
        let style = self.data.style(item);
        let breakable =
            style.white_space.auto_wrap() && item.kind() != LineItemKind::LeaderText;
        let hangs = hangs_spaces(item, style);

        let mut unit_start = self.offset;
        for unit_end in self.unit_ends(item, breakable) {
            let view = view_of(&shape, item, unit_start, unit_end);
            let width = view.width(0.);
            let fit_width = if hangs {
                let content_end = trim_spaces_end(self.data.text(), unit_start, unit_end);
                if content_end == unit_end {
                    width
                } else {
                    view_of(&shape, item, unit_start, content_end).width(0.)
                }
            } else {
                width
            };
            let run = LineItemRun {
                item_index: index,
                kind: item.kind(),
                text_range: unit_start..unit_end,
                width,
                expansion: 0.,
                shape: Some(view),
                can_break_after: breakable && self.is_break_opportunity(unit_end),
                may_break_inside: false,
                has_only_trailing_spaces: false,
                bidi_level: item.bidi_level(),
            };
            if !self.place_unit(line, run, fit_width, style.overflow_wrap) {
                return;
            }
            unit_start = unit_end;
        }
    }

    /// Ends of the unbreakable units from the cursor to the end of `item`.
    fn unit_ends(&self, item: &LineItem, breakable: bool) -> Vec<usize> {
        let end = item.range().end;
        let mut ends = Vec::new();
        if breakable {
            let first = self
                .break_opportunities
                .partition_point(|&offset| offset <= self.offset);
            ends.extend(
                self.break_opportunities[first..]
                    .iter()
                    .copied()
                    .take_while(|&offset| offset < end),
            );
        }
        ends.push(end);
        ends
    }

    fn is_break_opportunity(&self, offset: usize) -> bool {
        self.break_opportunities.binary_search(&offset).is_ok()
    }

    fn fits(line: &LineInfo, width: f32) -> bool {
        let total = line.width + width;
        total <= line.available_width || nearly_eq(total, line.available_width)
    }

    fn allows_emergency_break(&self, overflow_wrap: OverflowWrap) -> bool {
        match overflow_wrap {
            OverflowWrap::Normal => false,
            OverflowWrap::Anywhere => true,
            OverflowWrap::BreakWord => !self.intrinsic,
        }
    }

    /// Places one unbreakable unit. Returns `false` when the line has ended.
    fn place_unit(
        &mut self,
        line: &mut LineInfo,
        run: LineItemRun,
        fit_width: f32,
        overflow_wrap: OverflowWrap,
    ) -> bool {
        if Self::fits(line, fit_width) {
            self.commit(line, run);
            return true;
        }
        let emergency = self.allows_emergency_break(overflow_wrap);
        if !line.has_content {
            // Nothing else is on the line, so the unit goes here even if it
            // overflows.
            if emergency {
                if let Some(end) = self.emergency_break_end(line, &run, true) {
                    debug!(offset = end, "emergency break in overlong unit");
                    self.commit_prefix(line, run, end);
                    self.state = BreakerState::Trailing;
                    return false;
                }
            }
            self.commit(line, run);
            return true;
        }
        if let Some(index) = line.runs.iter().rposition(|earlier| earlier.can_break_after) {
            self.rewind(line, index);
            self.state = BreakerState::Trailing;
            return false;
        }
        if emergency {
            match self.emergency_break_end(line, &run, false) {
                Some(end) => {
                    debug!(offset = end, "emergency break inside unit");
                    self.commit_prefix(line, run, end);
                }
                None => debug!(offset = run.text_range.start, "emergency break before unit"),
            }
            self.state = BreakerState::Trailing;
            return false;
        }
        self.commit(line, run);
        true
    }

    /// Longest grapheme-aligned prefix of `run` that fits. At the start of a
    /// line the first grapheme is taken even if it does not fit.
    fn emergency_break_end(
        &self,
        line: &LineInfo,
        run: &LineItemRun,
        at_line_start: bool,
    ) -> Option<usize> {
        let shape = run.shape.as_ref()?;
        let item = &self.data.items()[run.item_index];
        let start = run.text_range.start;
        let text = &self.data.text()[run.text_range.clone()];
        let mut end = None;
        for boundary in self.services.unicode.grapheme_boundaries(text) {
            if boundary == 0 || boundary >= text.len() {
                continue;
            }
            let width = view_of(shape.shape(), item, start, start + boundary).width(0.);
            if Self::fits(line, width) {
                end = Some(start + boundary);
            } else {
                if end.is_none() && at_line_start {
                    end = Some(start + boundary);
                }
                break;
            }
        }
        end
    }

    fn commit_prefix(&mut self, line: &mut LineInfo, run: LineItemRun, end: usize) {
        let data = self.data;
        let item = &data.items()[run.item_index];
        let view = match &run.shape {
            Some(shape) => view_of(shape.shape(), item, run.text_range.start, end),
            None => {
                self.commit(line, run);
                return;
            }
        };
        let prefix = LineItemRun {
            text_range: run.text_range.start..end,
            width: view.width(0.),
            shape: Some(view),
            can_break_after: true,
            ..run
        };
        self.commit(line, prefix);
    }

    fn commit(&mut self, line: &mut LineInfo, run: LineItemRun) {
        self.seek_after(run.item_index, run.text_range.end);
        line.push(run);
    }

    fn marker_run(&self, item: &LineItem, width: f32) -> LineItemRun {
        LineItemRun {
            item_index: self.item_index,
            kind: item.kind(),
            text_range: self.offset..item.range().end,
            width,
            expansion: 0.,
            shape: None,
            can_break_after: false,
            may_break_inside: false,
            has_only_trailing_spaces: false,
            bidi_level: item.bidi_level(),
        }
    }

    fn commit_marker(&mut self, line: &mut LineInfo, item: &LineItem, width: f32, can_break: bool) {
        let run = LineItemRun {
            can_break_after: can_break,
            ..self.marker_run(item, width)
        };
        self.commit(line, run);
    }

    /// Moves the cursor past `end` within item `item_index`.
    fn seek_after(&mut self, item_index: usize, end: usize) {
        let items = self.data.items();
        if end >= items[item_index].range().end {
            self.item_index = item_index + 1;
            self.offset = items
                .get(self.item_index)
                .map_or(self.data.text().len(), |item| item.range().start);
        } else {
            self.item_index = item_index;
            self.offset = end;
        }
    }

    /// Drops every run after `index` and resumes after it.
    fn rewind(&mut self, line: &mut LineInfo, index: usize) {
        let line_start = (line.item_range.start, line.text_range.start);
        line.runs.truncate(index + 1);
        let (item_index, end) = {
            let run = &line.runs[index];
            (run.item_index, run.text_range.end)
        };
        self.seek_after(item_index, end);
        debug_assert!(
            (self.item_index, self.offset) >= line_start,
            "rewound past the start of the line"
        );
        line.recompute_width();
    }

    /// Appends whitespace that hangs after the chosen break point.
    fn consume_trailing_spaces(&mut self, line: &mut LineInfo) {
        let data = self.data;
        while let Some(item) = data.items().get(self.item_index) {
            if item.kind() != LineItemKind::NormalText {
                break;
            }
            if item.collapse() == CollapseState::Collapsed {
                self.commit_marker(line, item, 0., false);
                continue;
            }
            if !hangs_spaces(item, data.style(item)) {
                break;
            }
            let rest = &data.text()[self.offset..item.range().end];
            let spaces = rest.len() - rest.trim_start_matches(' ').len();
            if spaces == 0 {
                break;
            }
            let start = self.offset;
            let end = start + spaces;
            let shape = self
                .cache
                .get_or_shape(self.item_index, data, self.services)
                .map(|shape| view_of(&shape, item, start, end));
            let run = LineItemRun {
                item_index: self.item_index,
                kind: item.kind(),
                text_range: start..end,
                width: shape.as_ref().map_or(0., |view| view.width(0.)),
                expansion: 0.,
                shape,
                can_break_after: true,
                may_break_inside: false,
                has_only_trailing_spaces: true,
                bidi_level: item.bidi_level(),
            };
            self.commit(line, run);
            if end < item.range().end {
                break;
            }
        }
    }

    fn force_progress(&mut self, line: &mut LineInfo) {
        let data = self.data;
        if let Some(item) = data.items().get(self.item_index) {
            let shape = self
                .cache
                .get_or_shape(self.item_index, data, self.services)
                .map(|shape| view_of(&shape, item, self.offset, item.range().end));
            let run = LineItemRun {
                width: shape.as_ref().map_or(0., |view| view.width(0.)),
                shape,
                ..self.marker_run(item, 0.)
            };
            self.commit(line, run);
        }
    }

    fn finish_line(&mut self, line: &mut LineInfo) {
        merge_runs(&mut line.runs);
        self.mark_trailing_spaces(&mut line.runs);
        for run in &mut line.runs {
            if let Some(shape) = &run.shape {
                let item = &self.data.items()[run.item_index];
                let breakable = self.data.style(item).white_space.auto_wrap();
                let first = self
                    .break_opportunities
                    .partition_point(|&offset| offset <= run.text_range.start);
                run.may_break_inside = breakable
                    && self
                        .break_opportunities
                        .get(first)
                        .is_some_and(|&offset| offset < run.text_range.end);
                debug_assert!(
                    shape.end() <= shape.shape().text().len(),
                    "view extends past its shape"
                );
            }
        }

        line.width = 0.;
        line.trailing_width = 0.;
        for run in &line.runs {
            if run.has_only_trailing_spaces {
                line.trailing_width += run.width;
            } else {
                line.width += run.width;
            }
        }
        line.has_content = line.runs.iter().any(LineItemRun::is_content);
        line.is_empty_line = !line.runs.iter().any(|run| {
            run.is_content() || run.kind == LineItemKind::HardBreakOpportunity
        });
        line.text_range.end = self.offset.max(line.text_range.start);
        line.item_range.end = self.item_index.max(line.item_range.start);
        line.is_last_line = self.is_done();
        self.line_count += 1;

        trace!(
            line = self.line_count - 1,
            start = line.text_range.start,
            end = line.text_range.end,
            width = line.width,
            forced = line.ends_with_break,
            "line"
        );
    }

    /// Splits trailing spaces off the last content run so they can hang.
    fn mark_trailing_spaces(&self, runs: &mut Vec<LineItemRun>) {
        let mut index = runs.len();
        while index > 0 {
            index -= 1;
            let run = &runs[index];
            if run.is_transparent() {
                continue;
            }
            if run.kind != LineItemKind::NormalText {
                break;
            }
            let Some(shape) = &run.shape else {
                // Collapsed spaces.
                continue;
            };
            let item = &self.data.items()[run.item_index];
            if !hangs_spaces(item, self.data.style(item)) {
                break;
            }
            let range = run.text_range.clone();
            let content_end = trim_spaces_end(self.data.text(), range.start, range.end);
            if content_end == range.start {
                runs[index].has_only_trailing_spaces = true;
                continue;
            }
            if content_end < range.end {
                let head_view = view_of(shape.shape(), item, range.start, content_end);
                let tail_view = view_of(shape.shape(), item, content_end, range.end);
                let tail = LineItemRun {
                    text_range: content_end..range.end,
                    width: tail_view.width(0.),
                    shape: Some(tail_view),
                    may_break_inside: false,
                    has_only_trailing_spaces: true,
                    ..run.clone()
                };
                let head = &mut runs[index];
                head.text_range = range.start..content_end;
                head.width = head_view.width(0.);
                head.shape = Some(head_view);
                head.can_break_after = false;
                runs.insert(index + 1, tail);
            }
            break;
        }
    }
}

/// Joins consecutive pieces of the same item back into one run.
fn merge_runs(runs: &mut Vec<LineItemRun>) {
    let mut merged: Vec<LineItemRun> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        if let Some(last) = merged.last_mut() {
            if last.item_index == run.item_index
                && last.text_range.end == run.text_range.start
                && last.has_only_trailing_spaces == run.has_only_trailing_spaces
            {
                if let (Some(left), Some(right)) = (&last.shape, &run.shape) {
                    let view =
                        TextShapeView::new(left.shape().clone(), left.start(), right.end());
                    last.text_range.end = run.text_range.end;
                    last.width += run.width;
                    last.shape = Some(view);
                    last.can_break_after = run.can_break_after;
                    continue;
                }
            }
        }
        merged.push(run);
    }
    *runs = merged;
}

/// Whether spaces at the end of a line hang past it.
fn hangs_spaces(item: &LineItem, style: &TextStyle) -> bool {
    item.kind() == LineItemKind::NormalText
        && (style.white_space.collapse() != WhiteSpaceCollapse::Preserve
            || style.white_space.auto_wrap())
}

fn trim_spaces_end(text: &str, start: usize, end: usize) -> usize {
    start + text[start..end].trim_end_matches(' ').len()
}

/// View of the paragraph range `start..end` over the shape of `item`.
fn view_of(shape: &Rc<TextShape>, item: &LineItem, start: usize, end: usize) -> TextShapeView {
    let base = item.range().start;
    TextShapeView::new(shape.clone(), start - base, end - base)
}
