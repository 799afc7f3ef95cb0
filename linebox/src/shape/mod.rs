// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Segmentation of text into font and script homogeneous runs and shaping of
//! those runs into glyphs.

mod cache;
mod view;

pub(crate) use cache::ShapeCache;
pub use view::TextShapeView;

use tracing::debug;

use crate::services::{FontId, ShapeRequest, Services};
use crate::style::{Direction, FontFeature, TextStyle};
use crate::unicode::is_weak_script;
use crate::util::{is_space_like, is_zero_width_space_like};
use crate::Script;

/// Upper bound on the number of characters in a single run.
pub(crate) const MAX_RUN_CHARS: usize = 1 << 16;

const FIXED_ONE: f32 = 65536.;

/// A shaped glyph.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct GlyphData {
    /// Glyph identifier in the run's font.
    pub glyph_id: u32,
    /// Byte offset of the source character within the run. Several glyphs may
    /// share a cluster.
    pub character_index: usize,
    /// Horizontal offset from the pen position.
    pub x_offset: f32,
    /// Vertical offset from the baseline, y pointing down.
    pub y_offset: f32,
    /// Horizontal advance including letter and word spacing.
    pub advance: f32,
}

/// A maximal span of text shaped with one font and one script.
#[derive(Clone, Debug)]
pub struct TextShapeRun {
    font: FontId,
    font_size: f32,
    script: Script,
    offset: usize,
    length: usize,
    width: f32,
    ascent: f32,
    descent: f32,
    glyphs: Vec<GlyphData>,
}

impl TextShapeRun {
    /// Font of every glyph in the run.
    pub fn font(&self) -> FontId {
        self.font
    }

    /// Font size the run was shaped at.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Resolved script of the run.
    pub fn script(&self) -> Script {
        self.script
    }

    /// Logical start of the run in the shape's text.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the run in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Sum of glyph advances.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Ascent of the run's font.
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Descent of the run's font.
    pub fn descent(&self) -> f32 {
        self.descent
    }

    /// Glyphs in visual order.
    pub fn glyphs(&self) -> &[GlyphData] {
        &self.glyphs
    }

    /// Distance from the run's left edge to the caret before logical `offset`.
    pub fn position_for_offset(&self, offset: usize, direction: Direction) -> f32 {
        match direction {
            Direction::Ltr => self
                .glyphs
                .iter()
                .filter(|glyph| glyph.character_index < offset)
                .map(|glyph| glyph.advance)
                .sum(),
            Direction::Rtl => {
                let mut position = 0.;
                let mut glyphs = self.glyphs.iter().peekable();
                while let Some(glyph) = glyphs.next_if(|glyph| glyph.character_index > offset) {
                    position += glyph.advance;
                }
                // The whole cluster at `offset` lies left of its caret.
                while let Some(glyph) = glyphs.next_if(|glyph| glyph.character_index == offset) {
                    position += glyph.advance;
                }
                position
            }
        }
    }

    /// Like [`Self::position_for_offset`] but `offset` counts clusters from
    /// the run's left edge.
    ///
    /// Offsets past the last cluster map to the right edge.
    pub fn position_for_visual_offset(&self, offset: usize, direction: Direction) -> f32 {
        let cluster = self
            .glyphs
            .chunk_by(|a, b| a.character_index == b.character_index)
            .nth(offset)
            .map(|cluster| cluster[0].character_index);
        match cluster {
            Some(cluster) => self.position_for_offset(cluster, direction),
            None => self.width,
        }
    }

    /// Logical offset of the cluster under `position`.
    pub fn offset_for_position(&self, position: f32, direction: Direction) -> usize {
        if position <= 0. {
            return match direction {
                Direction::Ltr => 0,
                Direction::Rtl => self.length,
            };
        }
        let mut cumulative = 0.;
        let mut index = 0;
        while index < self.glyphs.len() {
            let cluster = self.glyphs[index].character_index;
            while index < self.glyphs.len() && self.glyphs[index].character_index == cluster {
                cumulative += self.glyphs[index].advance;
                index += 1;
            }
            let hit = match direction {
                Direction::Ltr => position < cumulative,
                Direction::Rtl => position <= cumulative,
            };
            if hit {
                return cluster;
            }
        }
        match direction {
            Direction::Ltr => self.length,
            Direction::Rtl => 0,
        }
    }
}

/// Immutable shaped text.
///
/// Runs are stored in visual order: for right-to-left shapes the run array is
/// reversed relative to the logical order of the text.
#[derive(Clone, Debug)]
pub struct TextShape {
    text: String,
    direction: Direction,
    width: f32,
    runs: Vec<TextShapeRun>,
}

impl TextShape {
    /// Segments `text` into runs sharing a font and script and shapes each run.
    ///
    /// When no font can be found at the start of a segment, shaping stops and
    /// the shape covers only the text before that point.
    pub fn create_for_text(
        text: &str,
        direction: Direction,
        disable_spacing: bool,
        style: &TextStyle,
        services: Services<'_>,
    ) -> Self {
        let mut runs = Vec::new();
        let mut features = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let Some(segment) = next_segment(text, start, style, services) else {
                debug!(
                    offset = start,
                    len = text.len(),
                    "no font for segment start, truncating shape"
                );
                break;
            };
            features.clear();
            features.extend(services.fonts.font_features(segment.font));
            features.extend_from_slice(&style.font_features);
            runs.push(shape_run(
                text,
                &segment,
                direction,
                disable_spacing,
                style,
                &features,
                services,
            ));
            start = segment.end;
        }
        Self::from_logical_runs(text, direction, runs)
    }

    /// Shapes `text`, every character of which is assumed to be a tab, as
    /// fixed advance tab stops.
    pub fn create_for_tabs(
        text: &str,
        direction: Direction,
        style: &TextStyle,
        services: Services<'_>,
    ) -> Self {
        let font = services
            .fonts
            .font_for_char('\t', false)
            .or_else(|| services.fonts.font_for_char(' ', false));
        let Some(font) = font else {
            debug!(len = text.len(), "no font for tabs");
            return Self::from_logical_runs(text, direction, Vec::new());
        };
        let metrics = services.fonts.metrics(font, style.font_size);
        let tab_width = style
            .tab_size
            .map(|spaces| spaces * metrics.space_width)
            .unwrap_or(metrics.tab_width);

        let offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let mut runs = Vec::new();
        for chunk in offsets.chunks(MAX_RUN_CHARS) {
            let run_start = chunk[0];
            let last = chunk[chunk.len() - 1];
            let run_end = last + text[last..].chars().next().map_or(0, char::len_utf8);
            let mut glyphs: Vec<GlyphData> = chunk
                .iter()
                .map(|&offset| GlyphData {
                    glyph_id: metrics.space_glyph,
                    character_index: offset - run_start,
                    x_offset: 0.,
                    y_offset: 0.,
                    advance: tab_width,
                })
                .collect();
            if direction.is_rtl() {
                glyphs.reverse();
            }
            runs.push(TextShapeRun {
                font,
                font_size: style.font_size,
                script: Script::Common,
                offset: run_start,
                length: run_end - run_start,
                width: tab_width * chunk.len() as f32,
                ascent: metrics.ascent,
                descent: metrics.descent,
                glyphs,
            });
        }
        Self::from_logical_runs(text, direction, runs)
    }

    fn from_logical_runs(text: &str, direction: Direction, mut runs: Vec<TextShapeRun>) -> Self {
        if direction.is_rtl() {
            runs.reverse();
        }
        let width = runs.iter().map(|run| run.width).sum();
        Self {
            text: text.to_owned(),
            direction,
            width,
            runs,
        }
    }

    /// The shaped text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Direction the text was shaped in.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Total advance of all runs.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Runs in visual order.
    pub fn runs(&self) -> &[TextShapeRun] {
        &self.runs
    }

    /// End of the text covered by runs. Less than `text().len()` when shaping
    /// was cut short.
    pub fn shaped_len(&self) -> usize {
        self.runs
            .iter()
            .map(|run| run.offset + run.length)
            .max()
            .unwrap_or(0)
    }

    /// Distance from the left edge to the caret before logical `offset`.
    ///
    /// The offset after the last character maps to the full width for
    /// left-to-right text and to zero for right-to-left text.
    pub fn position_for_offset(&self, offset: usize) -> f32 {
        let mut x = 0.;
        for run in &self.runs {
            if (run.offset..run.offset + run.length).contains(&offset) {
                return x + run.position_for_offset(offset - run.offset, self.direction);
            }
            x += run.width;
        }
        match self.direction {
            Direction::Ltr => self.width,
            Direction::Rtl => 0.,
        }
    }

    /// Logical offset of the cluster under `position`, measured from the left edge.
    pub fn offset_for_position(&self, position: f32) -> usize {
        if position <= 0. {
            return match self.direction {
                Direction::Ltr => 0,
                Direction::Rtl => self.shaped_len(),
            };
        }
        let mut x = 0.;
        for run in &self.runs {
            let hit = match self.direction {
                Direction::Ltr => position < x + run.width,
                Direction::Rtl => position <= x + run.width,
            };
            if hit {
                return run.offset + run.offset_for_position(position - x, self.direction);
            }
            x += run.width;
        }
        match self.direction {
            Direction::Ltr => self.shaped_len(),
            Direction::Rtl => 0,
        }
    }
}

struct Segment {
    font: FontId,
    script: Script,
    start: usize,
    end: usize,
}

/// Finds the maximal segment starting at `start` that shares one font and
/// one script.
fn next_segment(
    text: &str,
    start: usize,
    style: &TextStyle,
    services: Services<'_>,
) -> Option<Segment> {
    let rest = &text[start..];
    let lead = rest
        .chars()
        .find(|&ch| !is_zero_width_space_like(ch))
        .or_else(|| rest.chars().next())?;
    let font = services.fonts.font_for_char(lead, style.prefer_emoji)?;
    let mut script = services.unicode.script(lead);

    let mut end = start;
    for (count, (offset, ch)) in rest.char_indices().enumerate() {
        if count == MAX_RUN_CHARS {
            break;
        }
        if !is_zero_width_space_like(ch) {
            if services.fonts.font_for_char(ch, style.prefer_emoji) != Some(font) {
                break;
            }
            let ch_script = services.unicode.script(ch);
            if !is_weak_script(ch_script) {
                if is_weak_script(script) {
                    script = ch_script;
                } else if ch_script != script && !services.unicode.script_permits(ch, script) {
                    break;
                }
            }
        }
        end = start + offset + ch.len_utf8();
    }
    // The lead character always belongs to its own segment.
    if end == start {
        end = start + rest.chars().next().map_or(0, char::len_utf8);
    }
    Some(Segment {
        font,
        script,
        start,
        end,
    })
}

fn shape_run(
    text: &str,
    segment: &Segment,
    direction: Direction,
    disable_spacing: bool,
    style: &TextStyle,
    features: &[FontFeature],
    services: Services<'_>,
) -> TextShapeRun {
    let slice = &text[segment.start..segment.end];
    let shaped = services.shaper.shape(&ShapeRequest {
        font: segment.font,
        font_size: style.font_size,
        text: slice,
        direction,
        script: segment.script,
        features,
    });
    let metrics = services.fonts.metrics(segment.font, style.font_size);

    let mut width = 0.;
    let glyphs = shaped
        .iter()
        .map(|glyph| {
            let character_index = glyph.cluster as usize;
            // Vertical advance is folded into the horizontal one.
            let mut advance = (glyph.x_advance - glyph.y_advance) as f32 / FIXED_ONE;
            if !disable_spacing {
                if let Some(ch) = slice.get(character_index..).and_then(|s| s.chars().next()) {
                    if !is_zero_width_space_like(ch) {
                        advance += style.letter_spacing;
                    }
                    if is_space_like(ch) {
                        advance += style.word_spacing;
                    }
                }
            }
            width += advance;
            GlyphData {
                glyph_id: glyph.glyph_id,
                character_index,
                x_offset: glyph.x_offset as f32 / FIXED_ONE,
                y_offset: -(glyph.y_offset as f32) / FIXED_ONE,
                advance,
            }
        })
        .collect();

    TextShapeRun {
        font: segment.font,
        font_size: style.font_size,
        script: segment.script,
        offset: segment.start,
        length: segment.end - segment.start,
        width,
        ascent: metrics.ascent,
        descent: metrics.descent,
        glyphs,
    }
}
