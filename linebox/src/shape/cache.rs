// Copyright 2025 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use hashbrown::HashMap;

use super::TextShape;
use crate::items::{CollapseState, LineItemKind, LineItemsData};
use crate::services::Services;
use crate::style::Direction;

/// Shapes of text items, keyed by item index.
///
/// Items are shaped whole, the first time any part of them is measured, and
/// narrowed with [`TextShapeView`](super::TextShapeView)s afterwards.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShapeCache {
    shapes: HashMap<usize, Rc<TextShape>>,
}

impl ShapeCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the shape of item `index`, shaping it on first use.
    ///
    /// Items without glyphs, including collapsed spaces, have no shape.
    pub(crate) fn get_or_shape(
        &mut self,
        index: usize,
        data: &LineItemsData,
        services: Services<'_>,
    ) -> Option<Rc<TextShape>> {
        let item = data.items().get(index)?;
        if item.collapse() == CollapseState::Collapsed || item.is_empty() {
            return None;
        }
        if let Some(shape) = self.shapes.get(&index) {
            return Some(shape.clone());
        }
        let text = data.item_text(item);
        let style = data.style(item);
        let direction = Direction::from_level(item.bidi_level());
        let shape = match item.kind() {
            LineItemKind::NormalText | LineItemKind::LeaderText => {
                TextShape::create_for_text(text, direction, false, style, services)
            }
            LineItemKind::TabulationText => {
                TextShape::create_for_tabs(text, direction, style, services)
            }
            _ => return None,
        };
        let shape = Rc::new(shape);
        self.shapes.insert(index, shape.clone());
        Some(shape)
    }
}
