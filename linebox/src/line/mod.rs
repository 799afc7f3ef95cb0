// Copyright 2021 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Breaking items into lines and positioning the lines.

mod breaker;
mod builder;
mod layout;

pub use breaker::{BreakToken, LineBreaker, LineInfo, LineItemRun};
pub use builder::{InlineBoxFragment, LineBox, LineBuilder, LineSink, PlacedRun, PlacedRunKind};
pub use layout::{LayoutFragment, LineLayout};
