// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination stores backed by external state

mod file;

pub use file::FileStore;
