// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::items::{LineItemsBuilder, LineItemsData};
use crate::line::LineLayout;
use crate::services::{
    FontId, FontMetrics, FontService, Painter, PositionedGlyph, ShapeRequest, ShapedGlyph,
    Services, Shaper,
};
use crate::style::{Direction, FontFeature, LayoutConfig, TextStyle};
use crate::unicode::IcuUnicode;
use crate::util::is_zero_width_space_like;

/// Advance of one glyph of the primary font at the default font size.
pub(crate) const ADVANCE: f32 = 10.;
/// Advance of one glyph of the fallback font at the default font size.
pub(crate) const FALLBACK_ADVANCE: f32 = 20.;
pub(crate) const ASCENT: f32 = 12.;
pub(crate) const DESCENT: f32 = 4.;

const PRIMARY: FontId = FontId(0);
const FALLBACK: FontId = FontId(1);
const FIXED_ONE: f32 = 65536.;

/// Deterministic fonts: one glyph per character, fixed advances.
///
/// Characters listed in `fallback_chars` come from a second, wider font and
/// characters in `missing_chars` have no font at all. With `ligatures`, "fi"
/// shapes to a single glyph.
#[derive(Debug, Default)]
pub(crate) struct MockFonts {
    pub(crate) fallback_chars: Vec<char>,
    pub(crate) missing_chars: Vec<char>,
    pub(crate) ligatures: bool,
}

impl MockFonts {
    fn advance(font: FontId, font_size: f32) -> f32 {
        let base = if font == FALLBACK {
            FALLBACK_ADVANCE
        } else {
            ADVANCE
        };
        base * font_size / 16.
    }
}

impl FontService for MockFonts {
    fn font_for_char(&self, ch: char, _prefer_emoji: bool) -> Option<FontId> {
        if self.missing_chars.contains(&ch) {
            None
        } else if self.fallback_chars.contains(&ch) {
            Some(FALLBACK)
        } else {
            Some(PRIMARY)
        }
    }

    fn font_features(&self, _font: FontId) -> Vec<FontFeature> {
        Vec::new()
    }

    fn metrics(&self, font: FontId, font_size: f32) -> FontMetrics {
        let scale = font_size / 16.;
        let space_width = Self::advance(font, font_size);
        FontMetrics {
            ascent: ASCENT * scale,
            descent: DESCENT * scale,
            space_glyph: ' ' as u32,
            space_width,
            tab_width: space_width * 8.,
        }
    }
}

impl Shaper for MockFonts {
    fn shape(&self, request: &ShapeRequest<'_>) -> Vec<ShapedGlyph> {
        let advance = Self::advance(request.font, request.font_size);
        let mut glyphs = Vec::new();
        let mut chars = request.text.char_indices().peekable();
        while let Some((offset, ch)) = chars.next() {
            if self.ligatures && ch == 'f' && chars.peek().is_some_and(|&(_, next)| next == 'i') {
                chars.next();
                glyphs.push(glyph(0xFB01, offset, advance));
                continue;
            }
            let advance = if is_zero_width_space_like(ch) {
                0.
            } else {
                advance
            };
            glyphs.push(glyph(ch as u32, offset, advance));
        }
        if request.direction.is_rtl() {
            glyphs.reverse();
        }
        glyphs
    }
}

fn glyph(glyph_id: u32, cluster: usize, advance: f32) -> ShapedGlyph {
    ShapedGlyph {
        glyph_id,
        cluster: cluster as u32,
        x_offset: 0,
        y_offset: 0,
        x_advance: (advance * FIXED_ONE) as i32,
        y_advance: 0,
    }
}

/// Records every glyph batch it is asked to show.
#[derive(Debug, Default)]
pub(crate) struct RecordingPainter {
    pub(crate) batches: Vec<(FontId, Vec<PositionedGlyph>)>,
}

impl RecordingPainter {
    pub(crate) fn glyphs(&self) -> impl Iterator<Item = &PositionedGlyph> {
        self.batches.iter().flat_map(|(_, glyphs)| glyphs)
    }
}

impl Painter for RecordingPainter {
    fn show_glyphs(&mut self, font: FontId, _font_size: f32, glyphs: &[PositionedGlyph]) {
        self.batches.push((font, glyphs.to_vec()));
    }
}

pub(crate) struct TestEnv {
    pub(crate) fonts: MockFonts,
    pub(crate) unicode: IcuUnicode,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        Self {
            fonts: MockFonts::default(),
            unicode: IcuUnicode::new(),
        }
    }

    pub(crate) fn with_fonts(fonts: MockFonts) -> Self {
        Self {
            fonts,
            unicode: IcuUnicode::new(),
        }
    }

    pub(crate) fn services(&self) -> Services<'_> {
        Services::new(&self.fonts, &self.fonts, &self.unicode)
    }

    pub(crate) fn items(&self, text: &str, style: &TextStyle, direction: Direction) -> LineItemsData {
        let mut builder = LineItemsBuilder::new();
        builder.append_text(text, style);
        builder.finish(direction, &self.unicode)
    }

    /// Lays out `text` in the default style at `width`.
    pub(crate) fn layout(&self, text: &str, width: f32) -> LineLayout {
        self.layout_with(text, &TextStyle::default(), LayoutConfig::default(), width)
    }

    pub(crate) fn layout_with(
        &self,
        text: &str,
        style: &TextStyle,
        config: LayoutConfig,
        width: f32,
    ) -> LineLayout {
        let data = self.items(text, style, Direction::Ltr);
        let mut layout = LineLayout::new(data, config);
        layout.break_all_lines(self.services(), width);
        layout
    }
}

/// Text of every line of `layout`, trailing spaces included.
pub(crate) fn line_texts(layout: &LineLayout) -> Vec<&str> {
    layout
        .lines()
        .iter()
        .map(|line| &layout.data().text()[line.text_range.clone()])
        .collect()
}
