// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattened inline content.

mod builder;

pub use builder::LineItemsBuilder;

use core::ops::Range;

use crate::style::{BidiOverride, Direction, TextStyle};

/// A box that opens and closes around inline content, such as a `<span>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InlineBox {
    /// User-specified identifier for the box.
    pub id: u64,
    /// Border, padding and margin on the inline-start side.
    pub inline_start: f32,
    /// Border, padding and margin on the inline-end side.
    pub inline_end: f32,
    /// Bidi isolation or override applied to the content.
    pub bidi: Option<BidiOverride>,
}

/// A float. Its placement is left to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FloatBox {
    /// User-specified identifier for the float.
    pub id: u64,
    /// Margin box width.
    pub width: f32,
    /// Margin box height.
    pub height: f32,
}

/// An atomic inline, such as an image, laid out inline with text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplacedBox {
    /// User-specified identifier for the box.
    pub id: u64,
    /// Width of the box in pixels.
    pub width: f32,
    /// Height above the baseline.
    pub ascent: f32,
    /// Depth below the baseline.
    pub descent: f32,
}

/// How an item takes part in whitespace collapsing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollapseState {
    /// The item does not end with collapsible whitespace.
    NotCollapsible,
    /// The item ends with a collapsible space.
    Collapsible,
    /// The item is a collapsed space: it keeps its offsets but has no width.
    Collapsed,
    /// The item is transparent to collapsing of its neighbours.
    OpaqueToCollapsing,
}

/// What an item represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineItemKind {
    /// Regular text.
    NormalText,
    /// Preserved tab characters.
    TabulationText,
    /// Repeating filler text.
    LeaderText,
    /// A zero width position where a line may end.
    SoftBreakOpportunity,
    /// A position where a line must end. Covers its newline character.
    HardBreakOpportunity,
    /// Bidi control characters.
    BidiControl,
    /// A float, by index into [`LineItemsData::floats`].
    Floating(usize),
    /// An out-of-flow positioned box, by index into [`LineItemsData::positioned`].
    Positioned(usize),
    /// An atomic inline, by index into [`LineItemsData::replaced`].
    Replaced(usize),
    /// Start of an inline box, by index into [`LineItemsData::inline_boxes`].
    InlineStart(usize),
    /// End of an inline box, by index into [`LineItemsData::inline_boxes`].
    InlineEnd(usize),
}

/// One unit of inline content.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem {
    pub(crate) kind: LineItemKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) collapse: CollapseState,
    pub(crate) bidi_level: u8,
    pub(crate) style: usize,
}

impl LineItem {
    /// What the item represents.
    pub fn kind(&self) -> LineItemKind {
        self.kind
    }

    /// Range of the item in [`LineItemsData::text`].
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Collapse state.
    pub fn collapse(&self) -> CollapseState {
        self.collapse
    }

    /// Resolved bidi level.
    pub fn bidi_level(&self) -> u8 {
        self.bidi_level
    }

    /// Index of the item's style in [`LineItemsData::styles`].
    pub fn style_index(&self) -> usize {
        self.style
    }

    /// Returns `true` for items whose text is shaped.
    pub fn is_text(&self) -> bool {
        matches!(
            self.kind,
            LineItemKind::NormalText | LineItemKind::TabulationText | LineItemKind::LeaderText
        )
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The flattened content of one inline formatting context.
///
/// Built once by [`LineItemsBuilder`] and immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct LineItemsData {
    pub(crate) text: String,
    pub(crate) items: Vec<LineItem>,
    pub(crate) styles: Vec<TextStyle>,
    pub(crate) inline_boxes: Vec<InlineBox>,
    pub(crate) floats: Vec<FloatBox>,
    pub(crate) positioned: Vec<u64>,
    pub(crate) replaced: Vec<ReplacedBox>,
    pub(crate) base_direction: Direction,
    pub(crate) bidi_enabled: bool,
    pub(crate) block_level: bool,
}

impl LineItemsData {
    /// The concatenated text of every item.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Items in logical order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The text of `item`.
    pub fn item_text(&self, item: &LineItem) -> &str {
        &self.text[item.range()]
    }

    /// The style of `item`.
    pub fn style(&self, item: &LineItem) -> &TextStyle {
        &self.styles[item.style]
    }

    /// Distinct styles referenced by items.
    pub fn styles(&self) -> &[TextStyle] {
        &self.styles
    }

    /// Inline boxes, in the order they were entered.
    pub fn inline_boxes(&self) -> &[InlineBox] {
        &self.inline_boxes
    }

    /// Floats.
    pub fn floats(&self) -> &[FloatBox] {
        &self.floats
    }

    /// Identifiers of out-of-flow positioned boxes.
    pub fn positioned(&self) -> &[u64] {
        &self.positioned
    }

    /// Atomic inlines.
    pub fn replaced(&self) -> &[ReplacedBox] {
        &self.replaced
    }

    /// Paragraph base direction.
    pub fn base_direction(&self) -> Direction {
        self.base_direction
    }

    /// Whether bidi levels were resolved.
    pub fn is_bidi_enabled(&self) -> bool {
        self.bidi_enabled
    }

    /// Whether the content belongs to a block container.
    pub fn is_block_level(&self) -> bool {
        self.block_level
    }
}
