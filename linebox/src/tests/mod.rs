// Copyright 2024 the Linebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod test_layout;
mod utils;
