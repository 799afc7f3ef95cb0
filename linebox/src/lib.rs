// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paragraph-level inline layout.
//!
//! Inline content is collected with a [`LineItemsBuilder`], which applies
//! whitespace collapsing and bidi isolation and produces an immutable
//! [`LineItemsData`]. A [`LineLayout`] then drives the [`LineBreaker`] over
//! those items one line at a time, shaping text into [`TextShape`]s on demand,
//! and realizes every [`LineInfo`] into positioned [`LineBox`]es with a
//! [`LineBuilder`].
//!
//! Fonts, shaping, Unicode analysis and painting are reached through the
//! traits in [`services`]. [`IcuUnicode`] and [`FontCollection`] are the
//! default implementations.
//!
//! ```no_run
//! use linebox::{
//!     Direction, FontCollection, IcuUnicode, LayoutConfig, LineItemsBuilder, LineLayout,
//!     Services, TextStyle,
//! };
//!
//! # fn main() -> Result<(), linebox::Error> {
//! let mut fonts = FontCollection::new();
//! fonts.add_font(std::fs::read("Roboto-Regular.ttf").unwrap(), 0)?;
//! let unicode = IcuUnicode::new();
//! let services = Services::new(&fonts, &fonts, &unicode);
//!
//! let mut builder = LineItemsBuilder::new();
//! builder.append_text("Hello,   world!", &TextStyle::default());
//! let data = builder.finish(Direction::Ltr, &unicode);
//!
//! let mut layout = LineLayout::new(data, LayoutConfig::default());
//! layout.break_all_lines(services, 200.0);
//! for line in layout.lines() {
//!     println!("{:?} {}", line.text_range, line.width);
//! }
//! # Ok(())
//! # }
//! ```

mod bidi;
mod error;
mod fonts;
mod unicode;
mod util;

pub mod items;
pub mod line;
pub mod services;
pub mod shape;
pub mod style;

#[cfg(test)]
mod tests;

pub use bidi::BidiParagraph;
pub use error::Error;
pub use fonts::FontCollection;
pub use items::{
    CollapseState, FloatBox, InlineBox, LineItem, LineItemKind, LineItemsBuilder, LineItemsData,
    ReplacedBox,
};
pub use line::{
    BreakToken, InlineBoxFragment, LayoutFragment, LineBox, LineBreaker, LineBuilder, LineInfo,
    LineItemRun, LineLayout, LineSink, PlacedRun, PlacedRunKind,
};
pub use services::{
    FontId, FontMetrics, FontService, Painter, PositionedGlyph, ShapeRequest, ShapedGlyph,
    Services, Shaper, UnicodeServices,
};
pub use shape::{GlyphData, TextShape, TextShapeRun, TextShapeView};
pub use style::{
    BidiOverride, Direction, FontFeature, LayoutConfig, LineHeight, OverflowWrap, TextAlign,
    TextStyle, WhiteSpace, WhiteSpaceCollapse,
};
pub use unicode::IcuUnicode;
pub use util::{Point, Rect};

pub use icu_properties::props::Script;
