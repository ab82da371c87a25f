use chrono::{Duration, NaiveDate, NaiveDateTime};
use inbox_pulse::binning::{bin_messages, bin_thread, windows};
use inbox_pulse::matrix::{assemble_counts, ReportOptions};
use inbox_pulse::smoothing::smooth;
use inbox_pulse::types::{CountRow, Increment, IncrementUnit, Message, Thread};
use proptest::prelude::*;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn thread_at(offsets_min: &[i64]) -> Thread {
    let mut offsets = offsets_min.to_vec();
    offsets.sort_unstable();
    Thread {
        name: "Bob".to_string(),
        messages: offsets
            .into_iter()
            .map(|m| Message {
                time: epoch() + Duration::minutes(m),
                author: "Bob".to_string(),
                body: String::new(),
            })
            .collect(),
    }
}

fn increment_strategy() -> impl Strategy<Value = Increment> {
    prop_oneof![
        (1u32..48).prop_map(|n| Increment::new(n, IncrementUnit::Hours).unwrap()),
        (1u32..30).prop_map(|n| Increment::new(n, IncrementUnit::Days).unwrap()),
        (1u32..4).prop_map(|n| Increment::new(n, IncrementUnit::Months).unwrap()),
    ]
}

proptest! {
    #[test]
    fn windows_are_contained_contiguous_and_ascending(
        span_min in 0i64..(400 * 24 * 60),
        increment in increment_strategy(),
    ) {
        let start = epoch();
        let end = start + Duration::minutes(span_min);
        let ws = windows(start, end, increment);

        if let Some(first) = ws.first() {
            prop_assert_eq!(first.start, start);
        }
        for (i, w) in ws.iter().enumerate() {
            prop_assert!(w.start < w.end);
            prop_assert!(w.end <= end);
            prop_assert_eq!(increment.step(start, i as u32 + 1), Some(w.end));
        }
        for pair in ws.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        // No further full window would fit
        let next = increment.step(start, ws.len() as u32 + 1);
        prop_assert!(next.map_or(true, |next| next > end));
    }

    #[test]
    fn binning_never_invents_messages(
        offsets in prop::collection::vec(0i64..(60 * 24 * 60), 0..200),
        increment in increment_strategy(),
    ) {
        let thread = thread_at(&offsets);
        let start = epoch();
        let end = start + Duration::days(60);
        let ws = windows(start, end, increment);
        let counts = bin_messages(&thread.messages, &ws);

        prop_assert_eq!(counts.len(), ws.len());

        let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
        let covered = match (ws.first(), ws.last()) {
            (Some(first), Some(last)) => thread
                .messages
                .iter()
                .filter(|m| first.start <= m.time && m.time < last.end)
                .count() as u64,
            _ => 0,
        };
        prop_assert!(total <= thread.messages.len() as u64);
        prop_assert_eq!(total, covered);
    }

    #[test]
    fn binning_matches_per_window_filter(
        offsets in prop::collection::vec(0i64..(40 * 24 * 60), 0..100),
        hours in 1u32..72,
    ) {
        let thread = thread_at(&offsets);
        let start = epoch();
        let end = start + Duration::days(30);
        let increment = Increment::new(hours, IncrementUnit::Hours).unwrap();
        let ws = windows(start, end, increment);

        let counts = bin_thread(&thread, start, end, increment);
        let expected: Vec<u32> = ws
            .iter()
            .map(|w| thread.messages.iter().filter(|m| w.contains(m.time)).count() as u32)
            .collect();
        prop_assert_eq!(counts, expected);
    }

    #[test]
    fn message_before_start_leaves_thread_uncounted(
        early_min in 1i64..(5 * 24 * 60),
        offsets in prop::collection::vec(0i64..(30 * 24 * 60), 0..100),
        increment in increment_strategy(),
    ) {
        let mut all = offsets.clone();
        all.push(-early_min);
        let thread = thread_at(&all);
        let start = epoch();
        let end = start + Duration::days(30);

        let counts = bin_thread(&thread, start, end, increment);
        prop_assert_eq!(counts.len(), windows(start, end, increment).len());
        prop_assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn rebinning_is_idempotent(
        offsets in prop::collection::vec(0i64..(20 * 24 * 60), 0..100),
        increment in increment_strategy(),
    ) {
        let thread = thread_at(&offsets);
        let start = epoch();
        let end = start + Duration::days(20);
        prop_assert_eq!(
            bin_thread(&thread, start, end, increment),
            bin_thread(&thread, start, end, increment)
        );
    }

    #[test]
    fn smoothing_preserves_length(
        counts in prop::collection::vec(0u32..1000, 0..300),
        window in 1usize..200,
    ) {
        prop_assert_eq!(smooth(&counts, window).unwrap().len(), counts.len());
    }

    #[test]
    fn smoothing_with_window_one_is_identity(counts in prop::collection::vec(0u32..1000, 0..300)) {
        let smoothed = smooth(&counts, 1).unwrap();
        let expected: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();
        prop_assert_eq!(smoothed, expected);
    }

    #[test]
    fn smoothing_is_trailing_mean(
        counts in prop::collection::vec(0u32..1000, 1..200),
        window in 1usize..50,
    ) {
        let smoothed = smooth(&counts, window).unwrap();
        for (i, value) in smoothed.iter().enumerate() {
            let from = (i + 1).saturating_sub(window);
            let slice = &counts[from..=i];
            let mean = slice.iter().map(|&c| f64::from(c)).sum::<f64>() / slice.len() as f64;
            prop_assert!((value - mean).abs() < 1e-9, "index {}: {} vs {}", i, value, mean);
        }
    }

    #[test]
    fn assembler_rejects_any_length_mismatch(
        window_count in 1usize..20,
        delta in prop_oneof![-5i64..0, 1i64..5],
    ) {
        let start = epoch();
        let ws = windows(start, start + Duration::days(window_count as i64), Increment::days(1).unwrap());
        prop_assert_eq!(ws.len(), window_count);

        let len = (window_count as i64 + delta).max(0) as usize;
        prop_assume!(len != window_count);
        let rows = vec![CountRow { name: "Bob".to_string(), counts: vec![1; len] }];

        prop_assert!(assemble_counts(&rows, &ws, &ReportOptions::default()).is_err());
    }
}
