// Copyright 2025 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborators that inline layout calls out to.
//!
//! Every service is treated as pure: calls never re-enter layout and results
//! depend only on their arguments.

use core::fmt;

use crate::style::{Direction, FontFeature};
use crate::Script;

/// Opaque handle to a font resource owned by a [`FontService`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Metrics of a font at a given size, in pixels.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of the em box. Positive.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the em box. Positive.
    pub descent: f32,
    /// Glyph used for spaces and tabs.
    pub space_glyph: u32,
    /// Advance of the space glyph.
    pub space_width: f32,
    /// Default advance of a tab stop.
    pub tab_width: f32,
}

/// Font selection and metrics.
pub trait FontService {
    /// Returns the font that should render `ch`, or `None` if no font covers it.
    fn font_for_char(&self, ch: char, prefer_emoji: bool) -> Option<FontId>;

    /// OpenType features the font declares as defaults.
    fn font_features(&self, font: FontId) -> Vec<FontFeature>;

    /// Metrics for `font` at `font_size` pixels.
    fn metrics(&self, font: FontId, font_size: f32) -> FontMetrics;
}

/// A request to shape one font and script homogeneous slice of text.
#[derive(Clone, Debug)]
pub struct ShapeRequest<'a> {
    /// Font to shape with.
    pub font: FontId,
    /// Font size in pixels.
    pub font_size: f32,
    /// The slice to shape.
    pub text: &'a str,
    /// Direction of the slice.
    pub direction: Direction,
    /// Resolved script of the slice.
    pub script: Script,
    /// Font defaults followed by style features.
    pub features: &'a [FontFeature],
}

/// One glyph produced by a [`Shaper`].
///
/// Offsets and advances are 16.16 fixed point pixels with y pointing up.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct ShapedGlyph {
    /// Glyph identifier in the font.
    pub glyph_id: u32,
    /// Byte offset of the source character within [`ShapeRequest::text`].
    pub cluster: u32,
    /// Horizontal offset.
    pub x_offset: i32,
    /// Vertical offset.
    pub y_offset: i32,
    /// Horizontal advance.
    pub x_advance: i32,
    /// Vertical advance.
    pub y_advance: i32,
}

/// Converts a slice of text into positioned glyphs.
pub trait Shaper {
    /// Shapes `request.text`. Glyphs are returned in visual order, so for
    /// right-to-left text cluster values decrease along the result.
    fn shape(&self, request: &ShapeRequest<'_>) -> Vec<ShapedGlyph>;
}

/// Unicode segmentation, script and bidi queries.
pub trait UnicodeServices {
    /// The Unicode `Script` property of `ch`.
    fn script(&self, ch: char) -> Script;

    /// Returns `true` if `ch` may be used with `script` per `Script_Extensions`.
    fn script_permits(&self, ch: char, script: Script) -> bool;

    /// Byte offsets, excluding zero, where a line may end. Includes `text.len()`.
    fn line_break_opportunities(&self, text: &str) -> Vec<usize>;

    /// Byte offsets of grapheme cluster boundaries, including `0` and `text.len()`.
    fn grapheme_boundaries(&self, text: &str) -> Vec<usize>;

    /// Resolved embedding level for every byte of `text`.
    fn bidi_levels(&self, text: &str, base: Direction) -> Vec<u8>;
}

/// A glyph with its final position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionedGlyph {
    /// Glyph identifier in the font.
    pub id: u32,
    /// Absolute x coordinate of the glyph origin.
    pub x: f32,
    /// Absolute y coordinate of the glyph origin.
    pub y: f32,
}

/// Receives glyphs to rasterize or record.
pub trait Painter {
    /// Paints one batch of glyphs from a single font.
    fn show_glyphs(&mut self, font: FontId, font_size: f32, glyphs: &[PositionedGlyph]);
}

/// The services a layout pass needs, bundled for passing around.
#[derive(Copy, Clone)]
pub struct Services<'a> {
    /// Font selection and metrics.
    pub fonts: &'a dyn FontService,
    /// Glyph shaping.
    pub shaper: &'a dyn Shaper,
    /// Unicode analysis.
    pub unicode: &'a dyn UnicodeServices,
}

impl<'a> Services<'a> {
    /// Bundles the given services.
    pub fn new(
        fonts: &'a dyn FontService,
        shaper: &'a dyn Shaper,
        unicode: &'a dyn UnicodeServices,
    ) -> Self {
        Self {
            fonts,
            shaper,
            unicode,
        }
    }
}

impl fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
