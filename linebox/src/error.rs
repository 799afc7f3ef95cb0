// Copyright 2025 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors produced when loading fonts.
///
/// Layout itself never fails: missing fonts truncate a shape instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The font data could not be parsed.
    #[error("invalid font data at index {index}: {reason}")]
    InvalidFont {
        /// Collection index that was requested.
        index: u32,
        /// Parser message.
        reason: String,
    },
    /// A table required for layout is absent.
    #[error("font is missing the `{0}` table")]
    MissingTable(&'static str),
}
