// Copyright 2025 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory font collection using `skrifa` for coverage and metrics and
//! `harfrust` for shaping.

use core::fmt;

use skrifa::instance::{LocationRef, Size};
use skrifa::raw::TableProvider;
use skrifa::MetadataProvider;

use crate::error::Error;
use crate::services::{FontId, FontMetrics, FontService, ShapeRequest, ShapedGlyph, Shaper};
use crate::style::{Direction, FontFeature};
use crate::unicode::script_tag;

/// CSS initial `tab-size`, in spaces.
const DEFAULT_TAB_SPACES: f32 = 8.;

struct LoadedFont {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    is_emoji: bool,
    features: Vec<FontFeature>,
    shaper_data: harfrust::ShaperData,
}

impl LoadedFont {
    fn skrifa(&self) -> Option<skrifa::FontRef<'_>> {
        skrifa::FontRef::from_index(&self.data, self.index).ok()
    }
}

/// A fallback list of fonts. Characters are mapped to the first registered
/// font whose character map covers them.
#[derive(Default)]
pub struct FontCollection {
    fonts: Vec<LoadedFont>,
}

impl FontCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the font at `index` within `data`.
    pub fn add_font(&mut self, data: Vec<u8>, index: u32) -> Result<FontId, Error> {
        self.push(data, index, false)
    }

    /// Registers a color emoji font. Emoji fonts are tried first for
    /// characters that prefer emoji presentation.
    pub fn add_emoji_font(&mut self, data: Vec<u8>, index: u32) -> Result<FontId, Error> {
        self.push(data, index, true)
    }

    /// Sets the default features applied whenever `font` is shaped.
    pub fn set_font_features(&mut self, font: FontId, features: Vec<FontFeature>) {
        if let Some(loaded) = self.fonts.get_mut(font.0 as usize) {
            loaded.features = features;
        }
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Returns `true` if no fonts are registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    fn push(&mut self, data: Vec<u8>, index: u32, is_emoji: bool) -> Result<FontId, Error> {
        let (units_per_em, shaper_data) = {
            let font = skrifa::FontRef::from_index(&data, index).map_err(|err| {
                Error::InvalidFont {
                    index,
                    reason: err.to_string(),
                }
            })?;
            font.cmap().map_err(|_| Error::MissingTable("cmap"))?;
            let units_per_em = font
                .head()
                .map_err(|_| Error::MissingTable("head"))?
                .units_per_em();
            let harf_font = harfrust::FontRef::from_index(&data, index).map_err(|err| {
                Error::InvalidFont {
                    index,
                    reason: err.to_string(),
                }
            })?;
            (units_per_em, harfrust::ShaperData::new(&harf_font))
        };
        let id = FontId(u32::try_from(self.fonts.len()).unwrap_or(u32::MAX));
        self.fonts.push(LoadedFont {
            data,
            index,
            units_per_em,
            is_emoji,
            features: Vec::new(),
            shaper_data,
        });
        Ok(id)
    }

    fn covers(font: &LoadedFont, ch: char) -> bool {
        font.skrifa()
            .and_then(|font| font.charmap().map(ch))
            .is_some_and(|glyph| glyph.to_u32() != 0)
    }
}

impl fmt::Debug for FontCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCollection")
            .field("fonts", &self.fonts.len())
            .finish()
    }
}

impl FontService for FontCollection {
    fn font_for_char(&self, ch: char, prefer_emoji: bool) -> Option<FontId> {
        let preferred = self
            .fonts
            .iter()
            .enumerate()
            .filter(|(_, font)| font.is_emoji == prefer_emoji);
        let rest = self
            .fonts
            .iter()
            .enumerate()
            .filter(|(_, font)| font.is_emoji != prefer_emoji);
        preferred
            .chain(rest)
            .find(|(_, font)| Self::covers(font, ch))
            .and_then(|(index, _)| u32::try_from(index).ok())
            .map(FontId)
    }

    fn font_features(&self, font: FontId) -> Vec<FontFeature> {
        self.fonts
            .get(font.0 as usize)
            .map(|font| font.features.clone())
            .unwrap_or_default()
    }

    fn metrics(&self, font: FontId, font_size: f32) -> FontMetrics {
        let Some(font) = self.fonts.get(font.0 as usize).and_then(LoadedFont::skrifa) else {
            return FontMetrics::default();
        };
        let size = Size::new(font_size);
        let metrics = font.metrics(size, LocationRef::default());
        let space_glyph = font.charmap().map(' ');
        let space_width = space_glyph
            .and_then(|glyph| {
                font.glyph_metrics(size, LocationRef::default())
                    .advance_width(glyph)
            })
            .unwrap_or(font_size * 0.25);
        FontMetrics {
            ascent: metrics.ascent,
            descent: -metrics.descent,
            space_glyph: space_glyph.map(|glyph| glyph.to_u32()).unwrap_or(0),
            space_width,
            tab_width: space_width * DEFAULT_TAB_SPACES,
        }
    }
}

impl Shaper for FontCollection {
    fn shape(&self, request: &ShapeRequest<'_>) -> Vec<ShapedGlyph> {
        let Some(font) = self.fonts.get(request.font.0 as usize) else {
            return Vec::new();
        };
        let Ok(font_ref) = harfrust::FontRef::from_index(&font.data, font.index) else {
            return Vec::new();
        };
        let shaper = font
            .shaper_data
            .shaper(&font_ref)
            .point_size(Some(request.font_size))
            .build();

        let mut buffer = harfrust::UnicodeBuffer::new();
        buffer.push_str(request.text);
        buffer.set_direction(match request.direction {
            Direction::Ltr => harfrust::Direction::LeftToRight,
            Direction::Rtl => harfrust::Direction::RightToLeft,
        });
        let tag = script_tag(request.script);
        if let Some(script) = harfrust::Script::from_iso15924_tag(harfrust::Tag::new(&tag)) {
            buffer.set_script(script);
        }
        buffer.guess_segment_properties();

        let features: Vec<harfrust::Feature> = request
            .features
            .iter()
            .map(|feature| {
                harfrust::Feature::new(harfrust::Tag::new(&feature.tag), feature.value, ..)
            })
            .collect();
        let glyphs = shaper.shape(buffer, &features);

        // Font units to 16.16 fixed point pixels.
        let scale = request.font_size / f32::from(font.units_per_em.max(1)) * 65536.;
        let fixed = |units: i32| (units as f32 * scale).round() as i32;
        glyphs
            .glyph_infos()
            .iter()
            .zip(glyphs.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_id: info.glyph_id,
                cluster: info.cluster,
                x_offset: fixed(pos.x_offset),
                y_offset: fixed(pos.y_offset),
                x_advance: fixed(pos.x_advance),
                y_advance: fixed(pos.y_advance),
            })
            .collect()
    }
}
