// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Literal buffer-line prefixes the renderer keys off of to apply
//! styling (spec §6). Opaque to everything except the renderer.

pub const WORKED_FOR_MARKER: &str = "\u{1}worked_for\u{1}";
pub const HELP_MARKER: &str = "\u{1}help\u{1}";
pub const STDERR_MARKER: &str = "\u{1}stderr\u{1}";
pub const ABOUT_VERSION_MARKER: &str = "\u{1}about_version\u{1}";
pub const ABOUT_COPYRIGHT_MARKER: &str = "\u{1}about_copyright\u{1}";
pub const ABOUT_LINK_MARKER: &str = "\u{1}about_link\u{1}";
