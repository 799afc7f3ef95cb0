// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod env;

pub(crate) use env::{
    line_texts, MockFonts, RecordingPainter, TestEnv, ADVANCE, ASCENT, DESCENT, FALLBACK_ADVANCE,
};
