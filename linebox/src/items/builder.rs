// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tracing::trace;

use super::{
    CollapseState, FloatBox, InlineBox, LineItem, LineItemKind, LineItemsData, ReplacedBox,
};
use crate::bidi::BidiParagraph;
use crate::services::UnicodeServices;
use crate::style::{BidiOverride, Direction, TextStyle, WhiteSpaceCollapse};

const OBJECT_REPLACEMENT: char = '\u{FFFC}';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SpaceState {
    /// Nothing but collapsed space since the start of the block or a forced break.
    LineStart,
    /// Only preserved, wrappable spaces since the start of the line.
    LeadingPreserved,
    /// The last character was a space; further collapsible spaces are dropped.
    AfterSpace,
    AfterContent,
}

#[derive(Clone, Debug)]
struct RemovedSpace {
    offset: usize,
    item: usize,
    style: usize,
    item_removed: bool,
}

/// Collects inline content into [`LineItemsData`].
///
/// Whitespace is collapsed as text is appended, according to each style's
/// [`WhiteSpace`](crate::style::WhiteSpace). Inline boxes and explicit bidi
/// contexts insert the control characters needed to isolate their content.
#[derive(Debug)]
pub struct LineItemsBuilder {
    data: LineItemsData,
    last_style: usize,
    open_text: Option<usize>,
    space: SpaceState,
    trailing_space: Option<usize>,
    removed_space: Option<RemovedSpace>,
    /// Open inline boxes and whether each one pushed a bidi context.
    inline_stack: Vec<(usize, bool)>,
    bidi_stack: Vec<BidiOverride>,
}

impl Default for LineItemsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemsBuilder {
    /// Creates a builder for a block container.
    pub fn new() -> Self {
        let data = LineItemsData {
            styles: vec![TextStyle::default()],
            block_level: true,
            ..Default::default()
        };
        Self {
            data,
            last_style: 0,
            open_text: None,
            space: SpaceState::LineStart,
            trailing_space: None,
            removed_space: None,
            inline_stack: Vec::new(),
            bidi_stack: Vec::new(),
        }
    }

    /// Sets whether the content is the whole of a block container.
    ///
    /// Trailing collapsible space is removed on [`finish`](Self::finish) only
    /// for block-level content.
    pub fn set_block_level(&mut self, block_level: bool) {
        self.data.block_level = block_level;
    }

    /// The text appended so far, after collapsing.
    pub fn text(&self) -> &str {
        &self.data.text
    }

    /// Appends `text` with `style`, collapsing whitespace as the style requires.
    pub fn append_text(&mut self, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let style_index = self.intern_style(style);
        self.open_text = None;
        match style.white_space.collapse() {
            WhiteSpaceCollapse::Collapse => {
                for ch in text.chars() {
                    self.append_collapsible_char(ch, style_index);
                }
            }
            WhiteSpaceCollapse::PreserveNewline => {
                for ch in text.chars() {
                    if ch == '\n' {
                        self.push_hard_break(style_index);
                    } else {
                        self.append_collapsible_char(ch, style_index);
                    }
                }
            }
            WhiteSpaceCollapse::Preserve => {
                let auto_wrap = style.white_space.auto_wrap();
                for ch in text.chars() {
                    self.append_preserved_char(ch, style_index, auto_wrap);
                }
            }
        }
    }

    /// Appends leader text, which is never collapsed and repeats to fill space.
    pub fn append_leader(&mut self, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let style_index = self.intern_style(style);
        self.before_content();
        self.open_text = None;
        for ch in text.chars() {
            self.push_char(LineItemKind::LeaderText, ch, style_index, CollapseState::NotCollapsible);
        }
        self.open_text = None;
        self.space = SpaceState::AfterContent;
    }

    /// Appends a forced line break, such as `<br>`.
    pub fn append_forced_break(&mut self) {
        self.push_hard_break(self.last_style);
    }

    /// Appends an explicit break opportunity, such as `<wbr>`.
    pub fn append_soft_break(&mut self) {
        self.push_opaque(LineItemKind::SoftBreakOpportunity);
    }

    /// Appends a float. It occupies no text.
    pub fn append_floating(&mut self, float: FloatBox) {
        self.data.floats.push(float);
        self.push_opaque(LineItemKind::Floating(self.data.floats.len() - 1));
    }

    /// Appends an out-of-flow positioned box. It occupies no text.
    pub fn append_positioned(&mut self, id: u64) {
        self.data.positioned.push(id);
        self.push_opaque(LineItemKind::Positioned(self.data.positioned.len() - 1));
    }

    /// Appends an atomic inline, represented in the text by U+FFFC.
    pub fn append_replaced(&mut self, replaced: ReplacedBox) {
        self.data.replaced.push(replaced);
        let kind = LineItemKind::Replaced(self.data.replaced.len() - 1);
        self.before_content();
        self.open_text = None;
        self.push_char(kind, OBJECT_REPLACEMENT, self.last_style, CollapseState::NotCollapsible);
        self.open_text = None;
        self.space = SpaceState::AfterContent;
    }

    /// Opens an inline box. Its bidi override, if any, applies until the
    /// matching [`exit_inline`](Self::exit_inline).
    pub fn enter_inline(&mut self, inline_box: InlineBox) {
        let bidi = inline_box.bidi;
        self.data.inline_boxes.push(inline_box);
        let index = self.data.inline_boxes.len() - 1;
        self.push_opaque(LineItemKind::InlineStart(index));
        if let Some(bidi) = bidi {
            self.enter_bidi(bidi);
        }
        self.inline_stack.push((index, bidi.is_some()));
    }

    /// Closes the innermost open inline box.
    pub fn exit_inline(&mut self) {
        let Some((index, pushed_bidi)) = self.inline_stack.pop() else {
            debug_assert!(false, "exit_inline without enter_inline");
            return;
        };
        if pushed_bidi {
            self.exit_bidi();
        }
        self.push_opaque(LineItemKind::InlineEnd(index));
    }

    /// Opens a bidi context by inserting its control characters.
    pub fn enter_bidi(&mut self, bidi: BidiOverride) {
        self.push_controls(bidi.openers());
        self.bidi_stack.push(bidi);
    }

    /// Closes the innermost bidi context.
    pub fn exit_bidi(&mut self) {
        let Some(bidi) = self.bidi_stack.pop() else {
            debug_assert!(false, "exit_bidi without enter_bidi");
            return;
        };
        self.push_controls(bidi.closers());
    }

    /// Removes the last collapsible space if nothing but collapse-opaque items
    /// follow it. The removal can be undone with
    /// [`restore_trailing_collapsible_space`](Self::restore_trailing_collapsible_space)
    /// until more content is appended.
    pub fn remove_trailing_collapsible_space(&mut self) {
        let Some(offset) = self.trailing_space.take() else {
            return;
        };
        let Some(index) = self
            .data
            .items
            .iter()
            .rposition(|item| item.kind == LineItemKind::NormalText && item.range().contains(&offset))
        else {
            return;
        };
        self.data.text.remove(offset);
        let item = &mut self.data.items[index];
        item.end -= 1;
        item.collapse = CollapseState::NotCollapsible;
        let style = item.style;
        let item_removed = item.is_empty();
        let first_shifted = if item_removed {
            self.data.items.remove(index);
            index
        } else {
            index + 1
        };
        for item in &mut self.data.items[first_shifted..] {
            item.start -= 1;
            item.end -= 1;
        }
        self.open_text = None;
        self.removed_space = Some(RemovedSpace {
            offset,
            item: index,
            style,
            item_removed,
        });
    }

    /// Puts back a space taken by
    /// [`remove_trailing_collapsible_space`](Self::remove_trailing_collapsible_space).
    pub fn restore_trailing_collapsible_space(&mut self) {
        let Some(removed) = self.removed_space.take() else {
            return;
        };
        self.data.text.insert(removed.offset, ' ');
        if removed.item_removed {
            self.data.items.insert(
                removed.item,
                LineItem {
                    kind: LineItemKind::NormalText,
                    start: removed.offset,
                    end: removed.offset,
                    collapse: CollapseState::Collapsible,
                    bidi_level: 0,
                    style: removed.style,
                },
            );
        }
        let item = &mut self.data.items[removed.item];
        item.end += 1;
        item.collapse = CollapseState::Collapsible;
        for item in &mut self.data.items[removed.item + 1..] {
            item.start += 1;
            item.end += 1;
        }
        self.open_text = None;
        self.trailing_space = Some(removed.offset);
        self.space = SpaceState::AfterSpace;
    }

    /// Closes any open inline boxes and bidi contexts, resolves bidi levels
    /// for `base_direction` and splits items wherever the level changes.
    pub fn finish(
        mut self,
        base_direction: Direction,
        unicode: &dyn UnicodeServices,
    ) -> LineItemsData {
        while !self.inline_stack.is_empty() {
            self.exit_inline();
        }
        while !self.bidi_stack.is_empty() {
            self.exit_bidi();
        }
        if self.data.block_level {
            self.remove_trailing_collapsible_space();
        }

        let mut data = self.data;
        data.base_direction = base_direction;
        data.bidi_enabled |= base_direction.is_rtl();
        if data.bidi_enabled {
            let mut bidi = BidiParagraph::new();
            bidi.set_paragraph(&data.text, base_direction, unicode);
            data.items = split_at_level_changes(&data.items, &bidi);
        } else {
            let level = base_direction.level();
            for item in &mut data.items {
                item.bidi_level = level;
            }
        }
        trace!(
            items = data.items.len(),
            text_len = data.text.len(),
            bidi = data.bidi_enabled,
            "finished line items"
        );
        data
    }

    fn intern_style(&mut self, style: &TextStyle) -> usize {
        let index = match self.data.styles.iter().position(|known| known == style) {
            Some(index) => index,
            None => {
                self.data.styles.push(style.clone());
                self.data.styles.len() - 1
            }
        };
        self.last_style = index;
        index
    }

    fn append_collapsible_char(&mut self, ch: char, style: usize) {
        if !matches!(ch, ' ' | '\t' | '\n' | '\r') {
            self.append_content_char(LineItemKind::NormalText, ch, style);
            return;
        }
        match self.space {
            SpaceState::LineStart => {
                self.open_text = None;
                self.push_char(LineItemKind::NormalText, ' ', style, CollapseState::Collapsed);
                self.open_text = None;
                self.space = SpaceState::AfterSpace;
            }
            SpaceState::AfterSpace => {}
            SpaceState::LeadingPreserved | SpaceState::AfterContent => {
                self.trailing_space = Some(self.data.text.len());
                self.push_char(LineItemKind::NormalText, ' ', style, CollapseState::Collapsible);
                self.space = SpaceState::AfterSpace;
            }
        }
    }

    fn append_preserved_char(&mut self, ch: char, style: usize, auto_wrap: bool) {
        let kind = match ch {
            '\n' => {
                self.push_hard_break(style);
                return;
            }
            '\t' => LineItemKind::TabulationText,
            ' ' => LineItemKind::NormalText,
            _ => {
                self.append_content_char(LineItemKind::NormalText, ch, style);
                return;
            }
        };
        self.trailing_space = None;
        self.push_char(kind, ch, style, CollapseState::NotCollapsible);
        self.space = match self.space {
            SpaceState::LineStart | SpaceState::LeadingPreserved if auto_wrap => {
                SpaceState::LeadingPreserved
            }
            _ => SpaceState::AfterContent,
        };
    }

    fn append_content_char(&mut self, kind: LineItemKind, ch: char, style: usize) {
        self.before_content();
        self.push_char(kind, ch, style, CollapseState::NotCollapsible);
        self.space = SpaceState::AfterContent;
    }

    /// Leading preserved spaces are followed by a break opportunity so the
    /// content after them can move to the next line.
    fn before_content(&mut self) {
        if self.space == SpaceState::LeadingPreserved {
            self.push_opaque(LineItemKind::SoftBreakOpportunity);
        }
        self.trailing_space = None;
    }

    fn push_hard_break(&mut self, style: usize) {
        self.remove_trailing_collapsible_space();
        self.open_text = None;
        self.push_char(
            LineItemKind::HardBreakOpportunity,
            '\n',
            style,
            CollapseState::NotCollapsible,
        );
        self.open_text = None;
        self.space = SpaceState::LineStart;
    }

    fn push_controls(&mut self, controls: &[char]) {
        self.open_text = None;
        for &ch in controls {
            self.push_char(
                LineItemKind::BidiControl,
                ch,
                self.last_style,
                CollapseState::OpaqueToCollapsing,
            );
        }
        self.open_text = None;
        self.data.bidi_enabled = true;
    }

    fn push_opaque(&mut self, kind: LineItemKind) {
        let offset = self.data.text.len();
        self.data.items.push(LineItem {
            kind,
            start: offset,
            end: offset,
            collapse: CollapseState::OpaqueToCollapsing,
            bidi_level: 0,
            style: self.last_style,
        });
        self.open_text = None;
    }

    /// Appends `ch`, extending the open item when it has the same kind and style.
    fn push_char(&mut self, kind: LineItemKind, ch: char, style: usize, collapse: CollapseState) {
        let start = self.data.text.len();
        self.data.text.push(ch);
        self.removed_space = None;
        if maybe_rtl(ch) {
            self.data.bidi_enabled = true;
        }
        let end = self.data.text.len();
        if let Some(index) = self.open_text {
            let len = self.data.items.len();
            let item = &mut self.data.items[index];
            if index + 1 == len
                && item.kind == kind
                && item.style == style
                && item.end == start
            {
                item.end = end;
                item.collapse = collapse;
                return;
            }
        }
        self.data.items.push(LineItem {
            kind,
            start,
            end,
            collapse,
            bidi_level: 0,
            style,
        });
        self.open_text = Some(self.data.items.len() - 1);
    }
}

/// Characters that may resolve to a right-to-left level.
fn maybe_rtl(ch: char) -> bool {
    matches!(
        ch,
        '\u{0590}'..='\u{08FF}'
            | '\u{200F}'
            | '\u{202B}'
            | '\u{202E}'
            | '\u{2067}'
            | '\u{FB1D}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
            | '\u{10800}'..='\u{10FFF}'
            | '\u{1E800}'..='\u{1EFFF}'
    )
}

fn split_at_level_changes(items: &[LineItem], bidi: &BidiParagraph) -> Vec<LineItem> {
    let mut split = Vec::with_capacity(items.len());
    for item in items {
        if item.is_empty() {
            // Closing items belong with what precedes them.
            let level = match item.kind {
                LineItemKind::InlineEnd(_) if item.start > 0 => bidi.level_at(item.start - 1),
                _ => bidi.level_at(item.start),
            };
            split.push(LineItem {
                bidi_level: level,
                ..item.clone()
            });
            continue;
        }
        let mut start = item.start;
        while start < item.end {
            let (run_end, level) = bidi.get_logical_run(start);
            let end = if run_end > start {
                run_end.min(item.end)
            } else {
                item.end
            };
            let collapse = if end < item.end && item.collapse == CollapseState::Collapsible {
                CollapseState::NotCollapsible
            } else {
                item.collapse
            };
            split.push(LineItem {
                start,
                end,
                collapse,
                bidi_level: level,
                ..item.clone()
            });
            start = end;
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::WhiteSpace;
    use crate::unicode::IcuUnicode;

    fn style(white_space: WhiteSpace) -> TextStyle {
        TextStyle {
            white_space,
            ..TextStyle::default()
        }
    }

    fn kinds(data: &LineItemsData) -> Vec<(LineItemKind, usize, usize)> {
        data.items()
            .iter()
            .map(|item| (item.kind(), item.range().start, item.range().end))
            .collect()
    }

    #[test]
    fn collapses_runs_of_spaces() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("a   b", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "a b");
        assert_eq!(kinds(&data), [(LineItemKind::NormalText, 0, 3)]);
    }

    #[test]
    fn collapses_across_appends() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("a ", &TextStyle::default());
        builder.append_text("  b", &TextStyle::default());
        assert_eq!(builder.text(), "a b");
    }

    #[test]
    fn leading_space_is_collapsed() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("  ab", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), " ab");
        assert_eq!(data.items()[0].collapse(), CollapseState::Collapsed);
        assert_eq!(
            kinds(&data),
            [(LineItemKind::NormalText, 0, 1), (LineItemKind::NormalText, 1, 3)]
        );
    }

    #[test]
    fn trailing_space_removed_for_block_only() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("ab ", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "ab");

        let mut builder = LineItemsBuilder::new();
        builder.set_block_level(false);
        builder.append_text("ab ", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "ab ");
        assert_eq!(data.items()[0].collapse(), CollapseState::Collapsible);
    }

    #[test]
    fn restore_undoes_removal() {
        let mut builder = LineItemsBuilder::new();
        builder.set_block_level(false);
        builder.append_text("ab ", &TextStyle::default());
        builder.remove_trailing_collapsible_space();
        builder.append_floating(FloatBox::default());
        assert_eq!(builder.text(), "ab");
        builder.restore_trailing_collapsible_space();
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "ab ");
        assert_eq!(
            kinds(&data),
            [(LineItemKind::NormalText, 0, 3), (LineItemKind::Floating(0), 3, 3)]
        );
    }

    #[test]
    fn removed_single_space_item_leaves_no_trace() {
        let mut builder = LineItemsBuilder::new();
        builder.set_block_level(false);
        builder.append_text("ab", &TextStyle::default());
        builder.append_text(" ", &style(WhiteSpace::PreLine));
        builder.remove_trailing_collapsible_space();
        assert_eq!(builder.text(), "ab");
        builder.restore_trailing_collapsible_space();
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(
            kinds(&data),
            [(LineItemKind::NormalText, 0, 2), (LineItemKind::NormalText, 2, 3)]
        );
    }

    #[test]
    fn forced_break_resets_line_start() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("ab ", &TextStyle::default());
        builder.append_forced_break();
        builder.append_text(" cd", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "ab\n cd");
        assert_eq!(
            kinds(&data),
            [
                (LineItemKind::NormalText, 0, 2),
                (LineItemKind::HardBreakOpportunity, 2, 3),
                (LineItemKind::NormalText, 3, 4),
                (LineItemKind::NormalText, 4, 6),
            ]
        );
    }

    #[test]
    fn preserved_leading_spaces_get_break_opportunity() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("  ab", &style(WhiteSpace::PreWrap));
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "  ab");
        assert_eq!(
            kinds(&data),
            [
                (LineItemKind::NormalText, 0, 2),
                (LineItemKind::SoftBreakOpportunity, 2, 2),
                (LineItemKind::NormalText, 2, 4),
            ]
        );

        let mut builder = LineItemsBuilder::new();
        builder.append_text("  ab", &style(WhiteSpace::Pre));
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(kinds(&data), [(LineItemKind::NormalText, 0, 4)]);
    }

    #[test]
    fn pre_splits_tabs_and_newlines() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("a\tb\nc", &style(WhiteSpace::Pre));
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "a\tb\nc");
        assert_eq!(
            kinds(&data),
            [
                (LineItemKind::NormalText, 0, 1),
                (LineItemKind::TabulationText, 1, 2),
                (LineItemKind::NormalText, 2, 3),
                (LineItemKind::HardBreakOpportunity, 3, 4),
                (LineItemKind::NormalText, 4, 5),
            ]
        );
    }

    #[test]
    fn pre_line_drops_space_before_newline() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("ab  \ncd", &style(WhiteSpace::PreLine));
        assert_eq!(builder.text(), "ab\ncd");
    }

    #[test]
    fn inline_bidi_isolate() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("a", &TextStyle::default());
        builder.enter_inline(InlineBox {
            bidi: Some(BidiOverride::Isolate(Direction::Rtl)),
            ..InlineBox::default()
        });
        builder.append_text("\u{05D0}\u{05D1}", &TextStyle::default());
        builder.exit_inline();
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert!(data.is_bidi_enabled());
        assert_eq!(data.text(), "a\u{2067}\u{05D0}\u{05D1}\u{2069}");
        let hebrew = data
            .items()
            .iter()
            .find(|item| item.kind() == LineItemKind::NormalText && item.range().start > 1)
            .map(LineItem::bidi_level);
        assert_eq!(hebrew, Some(1));
        assert_eq!(data.items()[0].bidi_level(), 0);
        assert!(matches!(
            data.items().last().map(LineItem::kind),
            Some(LineItemKind::InlineEnd(0))
        ));
    }

    #[test]
    fn isolate_override_uses_directional_isolates() {
        let mut builder = LineItemsBuilder::new();
        builder.enter_bidi(BidiOverride::IsolateOverride(Direction::Rtl));
        builder.append_text("ab", &TextStyle::default());
        builder.exit_bidi();
        builder.enter_bidi(BidiOverride::IsolateOverride(Direction::Ltr));
        builder.append_text("c", &TextStyle::default());
        builder.exit_bidi();
        assert_eq!(
            builder.text(),
            "\u{2067}\u{202E}ab\u{202C}\u{2069}\u{2066}\u{202D}c\u{202C}\u{2069}"
        );
    }

    #[test]
    fn items_split_at_level_changes() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("ab \u{05D0}\u{05D1}", &TextStyle::default());
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        let levels: Vec<_> = data
            .items()
            .iter()
            .map(|item| (item.range().start, item.range().end, item.bidi_level()))
            .collect();
        assert_eq!(levels, [(0, 3, 0), (3, 7, 1)]);
    }

    #[test]
    fn replaced_occupies_one_character() {
        let mut builder = LineItemsBuilder::new();
        builder.append_text("a ", &TextStyle::default());
        builder.append_replaced(ReplacedBox {
            width: 20.,
            ..ReplacedBox::default()
        });
        let data = builder.finish(Direction::Ltr, &IcuUnicode::new());
        assert_eq!(data.text(), "a \u{FFFC}");
        assert_eq!(
            kinds(&data),
            [(LineItemKind::NormalText, 0, 2), (LineItemKind::Replaced(0), 2, 5)]
        );
    }
}
