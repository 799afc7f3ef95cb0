// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::items::{InlineBox, LineItemsBuilder};
use crate::line::{InlineBoxFragment, LineBox, LineLayout, LineSink, PlacedRun, PlacedRunKind};
use crate::style::{Direction, LayoutConfig, LineHeight, TextAlign, TextStyle, WhiteSpace};
use crate::util::Point;

use super::utils::{ADVANCE, ASCENT, DESCENT, RecordingPainter, TestEnv, line_texts};

fn aligned(env: &TestEnv, text: &str, text_align: TextAlign, width: f32) -> LineLayout {
    let config = LayoutConfig {
        text_align,
        ..Default::default()
    };
    env.layout_with(text, &TextStyle::default(), config, width)
}

fn rtl_layout(env: &TestEnv, text: &str, width: f32) -> LineLayout {
    let data = env.items(text, &TextStyle::default(), Direction::Rtl);
    let mut layout = LineLayout::new(data, LayoutConfig::default());
    layout.break_all_lines(env.services(), width);
    layout
}

#[test]
fn alignment_offsets() {
    let env = TestEnv::new();
    let cases = [
        (TextAlign::Start, 0.),
        (TextAlign::Left, 0.),
        (TextAlign::End, 80.),
        (TextAlign::Right, 80.),
        (TextAlign::Center, 40.),
        (TextAlign::Justify, 0.),
    ];
    for (text_align, x) in cases {
        let layout = aligned(&env, "ab", text_align, 100.);
        assert_eq!(layout.lines()[0].x, x, "{text_align:?}");
    }
}

#[test]
fn overflowing_lines_are_start_aligned() {
    let env = TestEnv::new();
    let layout = aligned(&env, "abcdefghij", TextAlign::Center, 50.);
    assert_eq!(layout.lines()[0].x, 0.);

    let config = LayoutConfig {
        text_align: TextAlign::Center,
        align_when_overflowing: true,
        ..Default::default()
    };
    let layout = env.layout_with("abcdefghij", &TextStyle::default(), config, 50.);
    assert_eq!(layout.lines()[0].x, -25.);
}

#[test]
fn text_indent_offsets_first_line() {
    let env = TestEnv::new();
    let config = LayoutConfig {
        text_indent: 15.,
        ..Default::default()
    };
    let layout = env.layout_with("aaa bbb", &TextStyle::default(), config, 50.);

    assert_eq!(line_texts(&layout), ["aaa ", "bbb"]);
    assert_eq!(layout.lines()[0].x, 15.);
    assert_eq!(layout.lines()[1].x, 0.);
}

#[test]
fn justify_distributes_free_space() {
    let env = TestEnv::new();
    let layout = aligned(&env, "aaa bbb ccc", TextAlign::Justify, 75.);

    let first = &layout.lines()[0];
    assert_eq!(first.width, 75.);
    assert_eq!(first.runs[0].expansion, 5.);
    assert_eq!(first.runs[0].width, 75.);
    // The last line keeps its natural width.
    let last = &layout.lines()[1];
    assert_eq!(last.width, 3. * ADVANCE);
    assert_eq!(last.runs[0].expansion, 0.);
}

#[test]
fn justify_skips_lines_ending_in_forced_breaks() {
    let env = TestEnv::new();
    let style = TextStyle::default();
    let mut builder = LineItemsBuilder::new();
    builder.append_text("aa bb", &style);
    builder.append_forced_break();
    builder.append_text("cc", &style);
    let data = builder.finish(Direction::Ltr, &env.unicode);
    let config = LayoutConfig {
        text_align: TextAlign::Justify,
        ..Default::default()
    };
    let mut layout = LineLayout::new(data, config);
    layout.break_all_lines(env.services(), 100.);

    assert_eq!(layout.lines()[0].width, 5. * ADVANCE);
}

#[test]
fn leader_fills_free_space() {
    let env = TestEnv::new();
    let style = TextStyle::default();
    let mut builder = LineItemsBuilder::new();
    builder.append_text("Chapter", &style);
    builder.append_leader(".", &style);
    builder.append_text("5", &style);
    let data = builder.finish(Direction::Ltr, &env.unicode);
    let mut layout = LineLayout::new(data, LayoutConfig::default());
    layout.break_all_lines(env.services(), 200.);

    let line = &layout.lines()[0];
    assert_eq!(line.width, 200.);
    let leader = line
        .runs
        .iter()
        .find(|run| run.kind == PlacedRunKind::Leader)
        .expect("leader run");
    assert_eq!(leader.repeat, 12);
    assert_eq!(leader.width, 12. * ADVANCE);
    assert_eq!(leader.x, 7. * ADVANCE);

    let mut painter = RecordingPainter::default();
    layout.paint(&mut painter, Point::ZERO);
    let dots = painter.glyphs().filter(|glyph| glyph.id == '.' as u32).count();
    assert_eq!(dots, 12);
}

#[test]
fn rtl_paragraph_is_right_aligned_and_reordered() {
    let env = TestEnv::new();
    let layout = rtl_layout(&env, "\u{05D0}\u{05D1} ab", 100.);

    let line = &layout.lines()[0];
    assert_eq!(line.x, 50.);
    let placed: Vec<_> = line
        .runs
        .iter()
        .map(|run| (run.text_range.clone(), run.x, run.bidi_level))
        .collect();
    assert_eq!(placed, vec![(5..7, 50., 2), (0..5, 70., 1)]);
}

#[test]
fn mixed_ltr_paragraph_keeps_logical_order_of_ltr_runs() {
    let env = TestEnv::new();
    let layout = env.layout("ab \u{05D0}\u{05D1} cd", 200.);

    let ranges: Vec<_> = layout.lines()[0]
        .runs
        .iter()
        .map(|run| run.text_range.clone())
        .collect();
    assert_eq!(ranges, vec![0..3, 3..7, 7..10]);
    let levels: Vec<_> = layout.lines()[0].runs.iter().map(|run| run.bidi_level).collect();
    assert_eq!(levels, vec![0, 1, 0]);
}

#[test]
fn rtl_trailing_spaces_hang_on_the_left() {
    let env = TestEnv::new();
    let mut builder = LineItemsBuilder::new();
    builder.set_block_level(false);
    builder.append_text("ab ", &TextStyle::default());
    let data = builder.finish(Direction::Rtl, &env.unicode);
    let mut layout = LineLayout::new(data, LayoutConfig::default());
    layout.break_all_lines(env.services(), 100.);

    let line = &layout.lines()[0];
    assert_eq!(line.x, 80.);
    assert_eq!(line.trailing_width, ADVANCE);
    let space = &line.runs[0];
    assert!(space.has_only_trailing_spaces);
    assert_eq!(space.x, 70.);
    assert_eq!(space.bidi_level, 1);
    assert_eq!(line.runs[1].x, 80.);
}

#[test]
fn ltr_spaces_only_line_starts_at_the_left_edge() {
    let env = TestEnv::new();
    let style = TextStyle {
        white_space: WhiteSpace::PreWrap,
        ..Default::default()
    };
    let layout = env.layout_with("      aaaaaa", &style, LayoutConfig::default(), 50.);

    assert_eq!(line_texts(&layout), ["      ", "aaaaaa"]);
    let spaces = &layout.lines()[0].runs[0];
    assert!(spaces.has_only_trailing_spaces);
    assert_eq!(spaces.x, 0.);
    assert_eq!(layout.overflow_rect().x0, 0.);
}

#[test]
fn line_metrics_use_strut_and_line_height() {
    let env = TestEnv::new();
    let layout = env.layout("ab", 100.);
    let line = &layout.lines()[0];
    assert_eq!((line.ascent, line.descent), (ASCENT, DESCENT));
    assert_eq!(line.baseline, ASCENT);
    assert_eq!(line.height, ASCENT + DESCENT);

    let style = TextStyle {
        line_height: LineHeight::Px(20.),
        ..Default::default()
    };
    let layout = env.layout_with("ab", &style, LayoutConfig::default(), 100.);
    let line = &layout.lines()[0];
    assert_eq!((line.ascent, line.descent), (ASCENT + 2., DESCENT + 2.));
    assert_eq!(line.height, 20.);
}

#[test]
fn lines_stack_vertically() {
    let env = TestEnv::new();
    let layout = env.layout("aaa bbb ccc", 35.);

    let tops: Vec<_> = layout.lines().iter().map(|line| line.y).collect();
    assert_eq!(tops, vec![0., 16., 32.]);
    assert_eq!(layout.height(), 48.);
    // Hanging spaces are placed, so they count towards the overflow.
    let rect = layout.overflow_rect();
    assert_eq!((rect.x0, rect.y0, rect.x1, rect.y1), (0., 0., 40., 48.));
}

#[test]
fn fragments_resume_from_break_token() {
    let env = TestEnv::new();
    let data = env.items("aaa bbb ccc ddd", &TextStyle::default(), Direction::Ltr);
    let mut layout = LineLayout::new(data, LayoutConfig::default());

    let first = layout.layout_fragment(env.services(), 35., Some(40.), None, &mut ());
    assert_eq!(first.lines, 0..2);
    assert_eq!(first.block_size, 32.);
    let token = first.break_token.expect("content remains");
    assert_eq!(token.text_offset(), 8);

    let second = layout.layout_fragment(env.services(), 35., Some(40.), Some(&token), &mut ());
    assert_eq!(second.lines, 2..4);
    assert!(second.break_token.is_none());
    assert_eq!(line_texts(&layout), ["aaa ", "bbb ", "ccc ", "ddd"]);
    let third = &layout.lines()[2];
    assert_eq!(third.y, 0.);
    assert!(!third.is_first_line);
}

#[test]
fn fragment_always_takes_one_line() {
    let env = TestEnv::new();
    let data = env.items("aaa bbb", &TextStyle::default(), Direction::Ltr);
    let mut layout = LineLayout::new(data, LayoutConfig::default());

    let fragment = layout.layout_fragment(env.services(), 35., Some(1.), None, &mut ());
    assert_eq!(fragment.lines, 0..1);
    assert!(fragment.break_token.is_some());
}

#[test]
fn inline_box_fragments_per_line() {
    let env = TestEnv::new();
    let style = TextStyle::default();
    let mut builder = LineItemsBuilder::new();
    builder.append_text("aaa ", &style);
    builder.enter_inline(InlineBox {
        id: 1,
        inline_start: 0.,
        inline_end: 0.,
        bidi: None,
    });
    builder.append_text("bbb ccc ddd", &style);
    builder.exit_inline();
    let data = builder.finish(Direction::Ltr, &env.unicode);
    let mut layout = LineLayout::new(data, LayoutConfig::default());
    layout.break_all_lines(env.services(), 75.);

    assert_eq!(line_texts(&layout), ["aaa bbb ", "ccc ddd"]);
    let first = &layout.lines()[0].inline_boxes;
    assert_eq!(first.len(), 1);
    assert!(first[0].starts_here && !first[0].ends_here);
    assert_eq!(first[0].x, 4. * ADVANCE);
    let second = &layout.lines()[1].inline_boxes;
    assert_eq!(second.len(), 1);
    assert!(!second[0].starts_here && second[0].ends_here);
    assert_eq!(second[0].x, 0.);
    assert_eq!(second[0].width, 7. * ADVANCE);
}

#[derive(Default)]
struct RecordingSink {
    runs: Vec<(usize, PlacedRunKind)>,
    boxes: Vec<(usize, usize)>,
    lines: Vec<usize>,
}

impl LineSink for RecordingSink {
    fn place_run(&mut self, line: usize, run: &PlacedRun) {
        self.runs.push((line, run.kind));
    }

    fn place_inline_box(&mut self, line: usize, fragment: &InlineBoxFragment) {
        self.boxes.push((line, fragment.box_index));
    }

    fn finish_line(&mut self, line: usize, _line_box: &LineBox) {
        self.lines.push(line);
    }
}

#[test]
fn sink_receives_every_line() {
    let env = TestEnv::new();
    let style = TextStyle::default();
    let mut builder = LineItemsBuilder::new();
    builder.enter_inline(InlineBox {
        id: 1,
        inline_start: 2.,
        inline_end: 2.,
        bidi: None,
    });
    builder.append_text("aaa bbb", &style);
    builder.exit_inline();
    let data = builder.finish(Direction::Ltr, &env.unicode);
    let mut layout = LineLayout::new(data, LayoutConfig::default());
    let mut sink = RecordingSink::default();
    layout.layout_fragment(env.services(), 50., None, None, &mut sink);

    assert_eq!(sink.lines, vec![0, 1]);
    assert_eq!(sink.boxes, vec![(0, 0), (1, 0)]);
    assert_eq!(sink.runs.first(), Some(&(0, PlacedRunKind::InlineStart(0))));
    assert_eq!(sink.runs.last(), Some(&(1, PlacedRunKind::InlineEnd(0))));
}

#[test]
fn paint_draws_glyphs_on_the_baseline() {
    let env = TestEnv::new();
    let layout = env.layout("ab cd", 100.);
    let mut painter = RecordingPainter::default();
    layout.paint(&mut painter, Point::new(5., 100.));

    let glyphs: Vec<_> = painter.glyphs().map(|glyph| (glyph.x, glyph.y)).collect();
    let expected: Vec<_> = (0..5)
        .map(|index| (5. + index as f32 * ADVANCE, 100. + ASCENT))
        .collect();
    assert_eq!(glyphs, expected);
}

#[test]
fn paint_skips_hanging_spaces() {
    let env = TestEnv::new();
    let layout = env.layout("aaa bbb", 35.);
    let mut painter = RecordingPainter::default();
    layout.paint(&mut painter, Point::ZERO);

    assert_eq!(painter.glyphs().count(), 6);
}

#[test]
fn hit_testing_and_carets() {
    let env = TestEnv::new();
    let layout = env.layout("abc def", 100.);

    assert_eq!(layout.offset_for_point(Point::new(25., 5.)), 2);
    assert_eq!(layout.offset_for_point(Point::new(-10., 5.)), 0);
    assert_eq!(layout.offset_for_point(Point::new(500., 5.)), 7);
    assert_eq!(layout.caret_position_for_offset(4), Some(Point::new(40., 0.)));
    assert_eq!(layout.caret_position_for_offset(7), Some(Point::new(70., 0.)));
    assert_eq!(layout.caret_position_for_offset(8), None);
}

#[test]
fn hit_testing_across_lines() {
    let env = TestEnv::new();
    let layout = env.layout("aaa bbb", 45.);

    assert_eq!(line_texts(&layout), ["aaa ", "bbb"]);
    assert_eq!(layout.offset_for_point(Point::new(15., 20.)), 5);
    assert_eq!(layout.offset_for_point(Point::new(15., 500.)), 5);
    assert_eq!(layout.caret_position_for_offset(7), Some(Point::new(30., 16.)));
    assert_eq!(layout.caret_position_for_offset(5), Some(Point::new(10., 16.)));
}

#[test]
fn hit_testing_rtl() {
    let env = TestEnv::new();
    let layout = rtl_layout(&env, "\u{05D0}\u{05D1}\u{05D2}", 100.);

    assert_eq!(layout.lines()[0].x, 70.);
    assert_eq!(layout.offset_for_point(Point::new(95., 5.)), 0);
    assert_eq!(layout.offset_for_point(Point::new(75., 5.)), 4);
    assert_eq!(layout.caret_position_for_offset(0), Some(Point::new(100., 0.)));
    assert_eq!(layout.caret_position_for_offset(6), Some(Point::new(70., 0.)));
}
