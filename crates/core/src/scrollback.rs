// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded append-only line store with anchored-scroll semantics.
//!
//! A [`ScrollbackBuffer`] is append-only from the producer's side (a
//! streaming shell command or agent turn) and scrollable from the
//! viewer's side (a live SSH terminal session). Appending while the
//! viewport is scrolled up does not yank the view back to the bottom —
//! the visible slice stays anchored until truncation evicts it.

use serde::{Deserialize, Serialize};

/// A read-only view into the buffer for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub scroll_offset: usize,
    pub at_bottom: bool,
}

/// Persisted form of a buffer, for restart recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBuffer {
    pub lines: Vec<String>,
    pub scroll_offset: usize,
}

/// Bounded append-only line store.
///
/// Invariant maintained after every operation: `0 <= scroll_offset <=
/// lines.len() <= max_lines`.
#[derive(Debug, Clone)]
pub struct ScrollbackBuffer {
    lines: Vec<String>,
    max_lines: usize,
    scroll_offset: usize,
}

impl ScrollbackBuffer {
    /// Default bound on line count (spec §3: `MaxLines`, default 10_000).
    pub const DEFAULT_MAX_LINES: usize = 10_000;

    pub fn new(max_lines: usize) -> Self {
        Self { lines: Vec::new(), max_lines: max_lines.max(1), scroll_offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Append one or more lines, preserving the anchored-scroll invariant:
    /// while `scroll_offset > 0` the currently visible content stays put
    /// (the offset grows by the number of appended lines), then both
    /// values are clamped by truncation.
    pub fn append<I, S>(&mut self, new_lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut appended = 0usize;
        for line in new_lines {
            self.lines.push(line.into());
            appended += 1;
        }
        if appended == 0 {
            return;
        }
        if self.scroll_offset > 0 {
            self.scroll_offset += appended;
        }
        self.truncate();
    }

    /// Evict front lines beyond `max_lines`, clamping `scroll_offset`.
    fn truncate(&mut self) {
        if self.lines.len() > self.max_lines {
            let excess = self.lines.len() - self.max_lines;
            self.lines.drain(0..excess);
        }
        self.scroll_offset = self.scroll_offset.min(self.lines.len());
    }

    /// Pin the viewport back to the bottom.
    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
    }

    /// Move the viewport by `delta` lines (positive = scroll up/back in
    /// history), clamped so it never exceeds what `viewport` rows of
    /// history actually exist.
    pub fn scroll(&mut self, delta: i64, viewport: usize) {
        let total = self.lines.len();
        let max_scroll = if viewport == 0 { total } else { total.saturating_sub(viewport.min(total)) };
        let next = (self.scroll_offset as i64 + delta).clamp(0, max_scroll as i64);
        self.scroll_offset = next as usize;
    }

    /// Render the current viewport.
    ///
    /// `viewport <= 0` or `viewport > total` is treated as "show
    /// everything" (spec §4.3).
    pub fn snapshot(&self, viewport: i64) -> Snapshot {
        let total = self.lines.len();
        let viewport = if viewport <= 0 || viewport as usize > total { total } else { viewport as usize };

        let max_scroll = total.saturating_sub(viewport);
        let scroll_offset = self.scroll_offset.min(max_scroll);

        let end = total.saturating_sub(scroll_offset);
        let start = end.saturating_sub(viewport);

        Snapshot {
            lines: self.lines[start..end].to_vec(),
            total_lines: total,
            scroll_offset,
            at_bottom: scroll_offset == 0,
        }
    }

    /// Export for persistence.
    pub fn export(&self) -> PersistedBuffer {
        PersistedBuffer { lines: self.lines.clone(), scroll_offset: self.scroll_offset }
    }

    /// Restore from a persisted snapshot, front-trimming to `max_lines`
    /// and clamping `scroll_offset` into range.
    pub fn restore(max_lines: usize, persisted: PersistedBuffer) -> Self {
        let mut buf = Self::new(max_lines);
        let PersistedBuffer { mut lines, scroll_offset } = persisted;
        if lines.len() > buf.max_lines {
            let excess = lines.len() - buf.max_lines;
            lines.drain(0..excess);
        }
        let clamped = scroll_offset.min(lines.len());
        buf.lines = lines;
        buf.scroll_offset = clamped;
        buf
    }
}

#[cfg(test)]
#[path = "scrollback_tests.rs"]
mod tests;
