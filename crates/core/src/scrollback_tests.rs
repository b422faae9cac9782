// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn lines(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("line {i}")).collect()
}

#[test]
fn invariant_holds_after_append() {
    let mut buf = ScrollbackBuffer::new(10);
    buf.append(lines(25));
    assert!(buf.scroll_offset() <= buf.len());
    assert!(buf.len() <= 10);
}

#[test]
fn append_while_pinned_stays_pinned() {
    let mut buf = ScrollbackBuffer::new(1000);
    buf.append(lines(5));
    assert_eq!(buf.scroll_offset(), 0);
    buf.append(lines(5));
    assert_eq!(buf.scroll_offset(), 0);
}

#[test]
fn anchored_scroll_s4() {
    let mut buf = ScrollbackBuffer::new(1000);
    buf.append(lines(100));
    buf.scroll(5, 10);
    assert_eq!(buf.scroll_offset(), 5);

    buf.append(lines(3));
    assert_eq!(buf.scroll_offset(), 8);

    // Per the normative formula in spec §4.3: end = total - offset,
    // start = end - viewport.
    let snap = buf.snapshot(10);
    assert_eq!(snap.lines.len(), 10);
    assert_eq!(snap.lines[0], "line 85");
    assert_eq!(snap.lines[9], "line 94");
}

#[test]
fn truncation_clamps_scroll_offset() {
    let mut buf = ScrollbackBuffer::new(10);
    buf.append(lines(10));
    buf.scroll(10, 5);
    assert_eq!(buf.scroll_offset(), 5);
    // Appending past capacity evicts the front and must re-clamp.
    buf.append(lines(5));
    assert!(buf.scroll_offset() <= buf.len());
    assert_eq!(buf.len(), 10);
}

#[test]
fn snapshot_viewport_zero_or_oversized_shows_everything() {
    let mut buf = ScrollbackBuffer::new(100);
    buf.append(lines(7));
    let snap = buf.snapshot(0);
    assert_eq!(snap.lines.len(), 7);
    let snap = buf.snapshot(1000);
    assert_eq!(snap.lines.len(), 7);
}

#[test]
fn at_bottom_iff_scroll_offset_zero() {
    let mut buf = ScrollbackBuffer::new(100);
    buf.append(lines(20));
    assert!(buf.snapshot(5).at_bottom);
    buf.scroll(3, 5);
    assert!(!buf.snapshot(5).at_bottom);
}

#[test]
fn export_restore_round_trip() {
    let mut buf = ScrollbackBuffer::new(100);
    buf.append(lines(20));
    buf.scroll(4, 5);
    let exported = buf.export();
    let restored = ScrollbackBuffer::restore(100, exported.clone());
    assert_eq!(restored.export(), exported);
}

#[test]
fn restore_front_trims_and_clamps_offset() {
    let persisted = PersistedBuffer { lines: lines(20), scroll_offset: 15 };
    let restored = ScrollbackBuffer::restore(10, persisted);
    assert_eq!(restored.len(), 10);
    assert!(restored.scroll_offset() <= 10);
}

#[test]
fn reset_scroll_pins_to_bottom() {
    let mut buf = ScrollbackBuffer::new(100);
    buf.append(lines(20));
    buf.scroll(5, 5);
    assert_ne!(buf.scroll_offset(), 0);
    buf.reset_scroll();
    assert_eq!(buf.scroll_offset(), 0);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn invariant_always_holds(
            ops in proptest::collection::vec(0..4u8, 1..50),
            append_len in 0..5usize,
            viewport in 0..20usize,
            delta in -20i64..20i64,
        ) {
            let mut buf = ScrollbackBuffer::new(15);
            for op in ops {
                match op {
                    0 => buf.append(lines(append_len)),
                    1 => buf.scroll(delta, viewport),
                    2 => buf.reset_scroll(),
                    _ => { let _ = buf.snapshot(viewport as i64); }
                }
                prop_assert!(buf.scroll_offset() <= buf.len());
                prop_assert!(buf.len() <= 15);
            }
        }

        #[test]
        fn snapshot_length_never_exceeds_viewport(
            n in 0..40usize,
            viewport in 1..20i64,
        ) {
            let mut buf = ScrollbackBuffer::new(100);
            buf.append(lines(n));
            let snap = buf.snapshot(viewport);
            prop_assert!(snap.lines.len() as i64 <= viewport);
            prop_assert_eq!(snap.at_bottom, snap.scroll_offset == 0);
        }
    }
}
