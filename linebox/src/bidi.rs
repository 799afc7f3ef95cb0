// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paragraph bidi levels and visual reordering.

use crate::services::UnicodeServices;
use crate::style::Direction;

/// Resolved embedding levels for one paragraph.
#[derive(Clone, Default, Debug)]
pub struct BidiParagraph {
    levels: Vec<u8>,
    base_level: u8,
}

impl BidiParagraph {
    /// Creates an empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the level of every byte of `text`.
    pub fn set_paragraph(
        &mut self,
        text: &str,
        base_direction: Direction,
        unicode: &dyn UnicodeServices,
    ) {
        self.base_level = base_direction.level();
        self.levels = unicode.bidi_levels(text, base_direction);
        debug_assert_eq!(self.levels.len(), text.len(), "one level per byte");
    }

    /// Level of the paragraph direction.
    pub fn base_level(&self) -> u8 {
        self.base_level
    }

    /// Level of the byte at `offset`. Offsets past the end report the base level.
    pub fn level_at(&self, offset: usize) -> u8 {
        self.levels.get(offset).copied().unwrap_or(self.base_level)
    }

    /// Returns the end of the maximal run starting at `start` whose bytes share
    /// one level, and that level.
    pub fn get_logical_run(&self, start: usize) -> (usize, u8) {
        let Some(&level) = self.levels.get(start) else {
            return (start, self.base_level);
        };
        let len = self.levels[start..]
            .iter()
            .position(|&other| other != level)
            .unwrap_or(self.levels.len() - start);
        (start + len, level)
    }

    /// Computes the visual order of positions with the given `levels`.
    ///
    /// `result[visual] == logical`: starting from the highest level and
    /// descending to the lowest odd level, every maximal sequence at or above
    /// the current level is reversed.
    pub fn reorder_visual(levels: &[u8]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..levels.len()).collect();
        let mut max_level = 0;
        let mut lowest_odd_level = u8::MAX;
        for &level in levels {
            max_level = max_level.max(level);
            if level & 1 != 0 {
                lowest_odd_level = lowest_odd_level.min(level);
            }
        }
        if lowest_odd_level == u8::MAX {
            return indices;
        }

        for level in (lowest_odd_level..=max_level).rev() {
            let mut i = 0;
            while i < levels.len() {
                if levels[indices[i]] >= level {
                    let mut end = i + 1;
                    while end < levels.len() && levels[indices[end]] >= level {
                        end += 1;
                    }
                    indices[i..end].reverse();
                    i = end;
                }
                i += 1;
            }
        }
        indices
    }
}
