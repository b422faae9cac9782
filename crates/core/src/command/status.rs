// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/status` panel rendering (spec §4.2.3).

use crate::model::{TabSnapshot, UsageInfo, UsageWindow};

const FILLED: char = '█';
const EMPTY: char = '░';

/// Render the `/status` panel lines for a tab. `usage` is `None` when no
/// usage info has ever been fetched for the user; `now_unix` is the
/// current time, threaded in for testability rather than read from the
/// wall clock here.
pub fn render_status(tab: &TabSnapshot, usage: Option<&UsageInfo>, bar_width: usize, now_unix: i64) -> Vec<String> {
    let model = match tab.model_reasoning_effort {
        Some(effort) => format!("{} {}", tab.model, effort),
        None => tab.model.clone(),
    };
    let session = if tab.session_id.is_empty() { "none".to_string() } else { tab.session_id.clone() };

    let mut rows = vec![("Model".to_string(), model), ("Directory".to_string(), tab.repo.path.clone()), ("Session".to_string(), session)];

    if let Some(info) = usage {
        let total_tokens = info.input_tokens + info.output_tokens;
        rows.push(("Tokens used".to_string(), format!("{}K", total_tokens / 1000)));
        if info.chatgpt {
            if let Some(window) = &info.primary {
                rows.push(("5h limit".to_string(), render_usage_window(window, bar_width, now_unix)));
            }
            if let Some(window) = &info.secondary {
                rows.push(("Week limit".to_string(), render_usage_window(window, bar_width, now_unix)));
            }
        }
    }

    let width = rows.iter().map(|(label, _)| label.len() + 1).max().unwrap_or(0) + 2;
    rows.into_iter().map(|(label, value)| format!("{:<width$}{value}", format!("{label}:"))).collect()
}

fn render_usage_window(window: &UsageWindow, bar_width: usize, now_unix: i64) -> String {
    let percent = (100.0 - window.used_percent).round().clamp(0.0, 100.0) as i64;
    let filled = ((percent as f64 / 100.0) * bar_width as f64).round() as usize;
    let filled = filled.min(bar_width);
    let bar: String = std::iter::repeat(FILLED).take(filled).chain(std::iter::repeat(EMPTY).take(bar_width - filled)).collect();

    let remaining = (window.reset_at as i64 - now_unix).max(0) as u64;
    let reset_dt = chrono::DateTime::from_timestamp(window.reset_at as i64, 0).map(|dt| dt.format("%H:%M %d %b").to_string()).unwrap_or_default();

    format!("{bar} {percent}% / reset in {} @{reset_dt}", format_duration(remaining))
}

/// `formatStatusDuration` (spec §4.2.3, S6): ceiling to whole minutes,
/// then `0m` / `<N>m` / `<H>h<M>m` (no space, 0 parts omitted) / `<D>d
/// <H>h <M>m` (space-joined, 0 parts omitted).
pub fn format_duration(total_seconds: u64) -> String {
    let minutes_total = total_seconds.div_ceil(60);
    if minutes_total == 0 {
        return "0m".to_string();
    }
    let days = minutes_total / (24 * 60);
    let rem = minutes_total % (24 * 60);
    let hours = rem / 60;
    let mins = rem % 60;

    if days > 0 {
        let mut parts = vec![format!("{days}d")];
        if hours > 0 {
            parts.push(format!("{hours}h"));
        }
        if mins > 0 {
            parts.push(format!("{mins}m"));
        }
        return parts.join(" ");
    }
    if hours > 0 {
        let mut s = format!("{hours}h");
        if mins > 0 {
            s.push_str(&format!("{mins}m"));
        }
        return s;
    }
    format!("{mins}m")
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
