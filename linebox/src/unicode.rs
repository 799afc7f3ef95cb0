// Copyright 2025 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ICU4X backed Unicode services.

use core::fmt;

use icu_properties::props::Script;
use icu_properties::script::{ScriptWithExtensions, ScriptWithExtensionsBorrowed};
use icu_properties::{CodePointMapData, CodePointMapDataBorrowed, PropertyNamesShort};
use icu_segmenter::options::LineBreakOptions;
use icu_segmenter::{
    GraphemeClusterSegmenter, GraphemeClusterSegmenterBorrowed, LineSegmenter,
    LineSegmenterBorrowed,
};
use unicode_bidi::{BidiInfo, Level};

use crate::services::UnicodeServices;
use crate::style::Direction;

/// [`UnicodeServices`] implemented with compiled ICU4X data and `unicode-bidi`.
pub struct IcuUnicode {
    scripts: CodePointMapDataBorrowed<'static, Script>,
    script_extensions: ScriptWithExtensionsBorrowed<'static>,
    line_segmenter: LineSegmenterBorrowed<'static>,
    grapheme_segmenter: GraphemeClusterSegmenterBorrowed<'static>,
}

impl IcuUnicode {
    /// Creates the services from the data compiled into the binary.
    pub fn new() -> Self {
        Self {
            scripts: CodePointMapData::<Script>::new(),
            script_extensions: ScriptWithExtensions::new(),
            line_segmenter: LineSegmenter::new_auto(LineBreakOptions::default()),
            grapheme_segmenter: GraphemeClusterSegmenter::new(),
        }
    }
}

impl Default for IcuUnicode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IcuUnicode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcuUnicode").finish_non_exhaustive()
    }
}

impl UnicodeServices for IcuUnicode {
    fn script(&self, ch: char) -> Script {
        self.scripts.get(ch)
    }

    fn script_permits(&self, ch: char, script: Script) -> bool {
        self.script_extensions.has_script(ch, script)
    }

    fn line_break_opportunities(&self, text: &str) -> Vec<usize> {
        self.line_segmenter
            .segment_str(text)
            .filter(|&offset| offset != 0)
            .collect()
    }

    fn grapheme_boundaries(&self, text: &str) -> Vec<usize> {
        self.grapheme_segmenter.segment_str(text).collect()
    }

    fn bidi_levels(&self, text: &str, base: Direction) -> Vec<u8> {
        if text.is_empty() {
            return Vec::new();
        }
        let level = match base {
            Direction::Ltr => Level::ltr(),
            Direction::Rtl => Level::rtl(),
        };
        BidiInfo::new(text, Some(level))
            .levels
            .iter()
            .map(|level| level.number())
            .collect()
    }
}

/// Returns `true` for scripts that do not constrain their neighbours.
pub(crate) fn is_weak_script(script: Script) -> bool {
    script == Script::Common || script == Script::Inherited || script == Script::Unknown
}

/// ISO 15924 tag of `script`.
pub(crate) fn script_tag(script: Script) -> [u8; 4] {
    PropertyNamesShort::<Script>::new()
        .get(script)
        .and_then(|name| name.as_bytes().try_into().ok())
        .unwrap_or(*b"Zzzz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_and_extensions() {
        let unicode = IcuUnicode::new();
        assert_eq!(unicode.script('a'), Script::Latin);
        assert_eq!(unicode.script('\u{05D0}'), Script::Hebrew);
        assert_eq!(unicode.script(' '), Script::Common);
        // ARABIC COMMA is Common but extends to Arabic.
        assert!(unicode.script_permits('\u{060C}', Script::Arabic));
        assert!(!unicode.script_permits('a', Script::Arabic));
    }

    #[test]
    fn line_breaks_after_spaces() {
        let unicode = IcuUnicode::new();
        assert_eq!(unicode.line_break_opportunities("ab cd ef"), vec![3, 6, 8]);
    }

    #[test]
    fn bidi_levels_per_byte() {
        let unicode = IcuUnicode::new();
        // Hebrew alef is two bytes in UTF-8.
        let levels = unicode.bidi_levels("a\u{05D0}", Direction::Ltr);
        assert_eq!(levels, vec![0, 1, 1]);
        assert!(unicode.bidi_levels("", Direction::Rtl).is_empty());
    }

    #[test]
    fn tags() {
        assert_eq!(&script_tag(Script::Latin), b"Latn");
        assert_eq!(&script_tag(Script::Arabic), b"Arab");
        assert_eq!(&script_tag(Script::Common), b"Zyyy");
    }
}
