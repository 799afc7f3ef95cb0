// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Computed styles consumed by inline layout.

/// Inline base direction.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left to right.
    #[default]
    Ltr,
    /// Right to left.
    Rtl,
}

impl Direction {
    /// Returns the direction implied by a bidi embedding level.
    pub fn from_level(level: u8) -> Self {
        if level & 1 != 0 { Self::Rtl } else { Self::Ltr }
    }

    /// Returns the paragraph embedding level for this direction.
    pub fn level(self) -> u8 {
        match self {
            Self::Ltr => 0,
            Self::Rtl => 1,
        }
    }

    /// Returns `true` for right to left.
    pub fn is_rtl(self) -> bool {
        self == Self::Rtl
    }
}

/// An OpenType feature setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontFeature {
    /// Feature tag.
    pub tag: [u8; 4],
    /// Feature value; `0` disables, `1` enables.
    pub value: u32,
}

impl FontFeature {
    /// Creates a feature setting.
    pub const fn new(tag: &[u8; 4], value: u32) -> Self {
        Self { tag: *tag, value }
    }
}

/// How whitespace is collapsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WhiteSpaceCollapse {
    /// Sequences of spaces, tabs and newlines collapse into a single space.
    Collapse,
    /// Every character is kept; tabs and newlines are tagged specially.
    Preserve,
    /// Spaces collapse but newlines are forced breaks.
    PreserveNewline,
}

/// The CSS `white-space` shorthand.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Collapse and wrap.
    #[default]
    Normal,
    /// Collapse, never wrap.
    NoWrap,
    /// Preserve, never wrap.
    Pre,
    /// Preserve and wrap.
    PreWrap,
    /// Preserve newlines and wrap.
    PreLine,
}

impl WhiteSpace {
    /// The collapse mode this value selects.
    pub fn collapse(self) -> WhiteSpaceCollapse {
        match self {
            Self::Normal | Self::NoWrap => WhiteSpaceCollapse::Collapse,
            Self::Pre | Self::PreWrap => WhiteSpaceCollapse::Preserve,
            Self::PreLine => WhiteSpaceCollapse::PreserveNewline,
        }
    }

    /// Whether lines may wrap at soft break opportunities.
    pub fn auto_wrap(self) -> bool {
        matches!(self, Self::Normal | Self::PreWrap | Self::PreLine)
    }
}

/// The CSS `overflow-wrap` property.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum OverflowWrap {
    /// Only break at soft break opportunities.
    #[default]
    Normal,
    /// Break anywhere when a word cannot fit, and let that affect min-content.
    Anywhere,
    /// Break anywhere when a word cannot fit.
    BreakWord,
}

/// Line height.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub enum LineHeight {
    /// Ascent plus descent of the tallest content.
    #[default]
    Normal,
    /// An absolute line height.
    Px(f32),
}

/// Directional override for a bidi control.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BidiOverride {
    /// Isolate with the given direction (`LRI`/`RLI`).
    Isolate(Direction),
    /// Isolate with direction taken from the first strong character (`FSI`).
    IsolateAuto,
    /// Embed with the given direction (`LRE`/`RLE`).
    Embed(Direction),
    /// Force a direction (`LRO`/`RLO`).
    Override(Direction),
    /// Isolate and force a direction (`LRI LRO` / `RLI RLO`).
    IsolateOverride(Direction),
}

impl BidiOverride {
    /// Control characters opening this override, in order.
    pub(crate) fn openers(self) -> &'static [char] {
        match self {
            Self::Isolate(Direction::Ltr) => &['\u{2066}'],
            Self::Isolate(Direction::Rtl) => &['\u{2067}'],
            Self::IsolateAuto => &['\u{2068}'],
            Self::Embed(Direction::Ltr) => &['\u{202A}'],
            Self::Embed(Direction::Rtl) => &['\u{202B}'],
            Self::Override(Direction::Ltr) => &['\u{202D}'],
            Self::Override(Direction::Rtl) => &['\u{202E}'],
            Self::IsolateOverride(Direction::Ltr) => &['\u{2066}', '\u{202D}'],
            Self::IsolateOverride(Direction::Rtl) => &['\u{2067}', '\u{202E}'],
        }
    }

    /// Control characters closing this override, in order.
    pub(crate) fn closers(self) -> &'static [char] {
        match self {
            Self::Isolate(_) | Self::IsolateAuto => &['\u{2069}'],
            Self::Embed(_) | Self::Override(_) => &['\u{202C}'],
            Self::IsolateOverride(_) => &['\u{202C}', '\u{2069}'],
        }
    }
}

/// Computed style of a piece of inline text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f32,
    /// Extra advance after every visible glyph.
    pub letter_spacing: f32,
    /// Extra advance after every space-like glyph.
    pub word_spacing: f32,
    /// Feature settings, applied after the font's own.
    pub font_features: Vec<FontFeature>,
    /// Whitespace handling.
    pub white_space: WhiteSpace,
    /// Emergency breaking.
    pub overflow_wrap: OverflowWrap,
    /// Tab size in multiples of the space advance. `None` uses the font's tab width.
    pub tab_size: Option<f32>,
    /// Prefer color emoji fonts when selecting fonts.
    pub prefer_emoji: bool,
    /// Line height contributed by this text.
    pub line_height: LineHeight,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.,
            letter_spacing: 0.,
            word_spacing: 0.,
            font_features: Vec::new(),
            white_space: WhiteSpace::Normal,
            overflow_wrap: OverflowWrap::Normal,
            tab_size: None,
            prefer_emoji: false,
            line_height: LineHeight::Normal,
        }
    }
}

/// Horizontal alignment of lines.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum TextAlign {
    /// Align to the start edge for the base direction.
    #[default]
    Start,
    /// Align to the end edge for the base direction.
    End,
    /// Align to the left edge.
    Left,
    /// Align to the right edge.
    Right,
    /// Center.
    Center,
    /// Stretch spaces to fill the line. The last line is start aligned.
    Justify,
}

/// Paragraph level configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Alignment of lines within the available width.
    pub text_align: TextAlign,
    /// Indentation of the first line.
    pub text_indent: f32,
    /// Align lines even when their content overflows.
    pub align_when_overflowing: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            text_align: TextAlign::Start,
            text_indent: 0.,
            align_when_overflowing: false,
        }
    }
}
