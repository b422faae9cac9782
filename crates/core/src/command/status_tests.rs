// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;
use crate::model::{Repo, ReasoningEffort, TabStatus};

fn tab() -> TabSnapshot {
    TabSnapshot {
        id: "tab-0".to_string(),
        name: "A".to_string(),
        repo: Repo { name: "demo".to_string(), path: "/repos/demo".to_string() },
        model: "gpt-5.1".to_string(),
        model_reasoning_effort: Some(ReasoningEffort::Medium),
        session_id: String::new(),
        status: TabStatus::Idle,
    }
}

#[test]
fn s5_status_rendering_non_chatgpt() {
    let usage = UsageInfo { chatgpt: false, primary: None, secondary: None, input_tokens: 1234, output_tokens: 766 };
    let lines = render_status(&tab(), Some(&usage), 10, 0);
    assert_eq!(lines, vec!["Model:        gpt-5.1 medium", "Directory:    /repos/demo", "Session:      none", "Tokens used:  2K",]);
}

#[test]
fn no_usage_info_omits_tokens_and_limit_lines() {
    let lines = render_status(&tab(), None, 10, 0);
    assert_eq!(lines, vec!["Model:     gpt-5.1 medium", "Directory: /repos/demo", "Session:   none",]);
}

#[test]
fn chatgpt_usage_renders_limit_windows() {
    let usage = UsageInfo {
        chatgpt: true,
        primary: Some(UsageWindow { used_percent: 40.0, reset_at: 3600 }),
        secondary: Some(UsageWindow { used_percent: 90.0, reset_at: 7200 }),
        input_tokens: 0,
        output_tokens: 0,
    };
    let lines = render_status(&tab(), Some(&usage), 10, 0);
    let five_h = lines.iter().find(|l| l.starts_with("5h limit:")).expect("5h limit line");
    assert!(five_h.contains("60%"));
    let week = lines.iter().find(|l| l.starts_with("Week limit:")).expect("Week limit line");
    assert!(week.contains("10%"));
}

#[parameterized(
    under_a_minute = { 61, "2m" },
    hours_and_minutes = { 5415, "1h31m" },
    exact_minute = { 120, "2m" },
    zero = { 0, "0m" },
    whole_hour_no_minutes = { 3600, "1h" },
    days = { 90_000, "1d 1h" },
)]
fn s6_duration_formatting(seconds: u64, expected: &str) {
    assert_eq!(format_duration(seconds), expected);
}

#[test]
fn bar_is_full_width_at_zero_percent_used() {
    let window = UsageWindow { used_percent: 0.0, reset_at: 100 };
    let rendered = render_usage_window(&window, 10, 0);
    assert!(rendered.starts_with("██████████ 100%"));
}

#[test]
fn bar_is_empty_at_full_percent_used() {
    let window = UsageWindow { used_percent: 100.0, reset_at: 100 };
    let rendered = render_usage_window(&window, 10, 0);
    assert!(rendered.starts_with("░░░░░░░░░░ 0%"));
}
