//! Property tests for the table state machine.
//!
//! Arbitrary interleavings of staff actions and ticks must never panic,
//! never run time backwards, and never bill an idle table.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use table_tracker::tables::models::{TableState, RECENT_SESSIONS_CAP};
use table_tracker::tables::{GameType, TableStatus};

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    End,
    /// Advance the clock by this many seconds, then tick
    Tick(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::End),
        (0u32..180).prop_map(Op::Tick),
    ]
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

proptest! {
    #[test]
    fn state_machine_invariants_hold(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let mut table = TableState::new(GameType::Snooker, 1, 4.0);
        let mut now = epoch();
        let mut running_elapsed = table.elapsed_seconds();

        for op in ops {
            let before_status = table.status();
            let before_elapsed = table.elapsed_seconds();

            match op {
                Op::Start => {
                    let result = table.start(now);
                    // Start succeeds exactly from idle or paused.
                    prop_assert_eq!(result.is_ok(), before_status != TableStatus::Running);
                }
                Op::Pause => {
                    let result = table.pause(now);
                    prop_assert_eq!(result.is_ok(), before_status == TableStatus::Running);
                }
                Op::End => {
                    let result = table.end(now, "admin");
                    prop_assert_eq!(result.is_ok(), before_status != TableStatus::Idle);
                    if let Ok(session) = result {
                        prop_assert!(session.duration_minutes >= 0.0);
                        prop_assert!(session.amount >= 0.0);
                        // Ending always returns the table to a clean idle.
                        prop_assert_eq!(table.status(), TableStatus::Idle);
                        prop_assert_eq!(table.elapsed_seconds(), 0);
                    }
                }
                Op::Tick(secs) => {
                    now += chrono::Duration::seconds(i64::from(secs));
                    table.tick(now);
                    match before_status {
                        // Time only accrues while running.
                        TableStatus::Running => {
                            prop_assert_eq!(
                                table.elapsed_seconds(),
                                before_elapsed + i64::from(secs)
                            );
                        }
                        _ => prop_assert_eq!(table.elapsed_seconds(), before_elapsed),
                    }
                }
            }

            // Elapsed time never decreases except through the end reset.
            if table.status() != TableStatus::Idle {
                prop_assert!(table.elapsed_seconds() >= running_elapsed.min(before_elapsed));
            }
            running_elapsed = table.elapsed_seconds();

            // An idle table never holds partial session state.
            if table.status() == TableStatus::Idle {
                prop_assert_eq!(table.elapsed_seconds(), 0);
            }

            // The display window never exceeds its cap.
            prop_assert!(table.recent_sessions().len() <= RECENT_SESSIONS_CAP);
        }
    }

    #[test]
    fn amount_matches_elapsed_at_every_tick(ticks in proptest::collection::vec(0u32..90, 1..50), rate_step in 4u32..=20) {
        let rate = f64::from(rate_step) * 0.5;
        let mut table = TableState::new(GameType::Pool, 1, rate);
        let mut now = epoch();
        table.start(now).unwrap();

        for secs in ticks {
            now += chrono::Duration::seconds(i64::from(secs));
            table.tick(now);

            let expected = (table.elapsed_seconds() as f64 / 60.0 * rate * 100.0).round() / 100.0;
            prop_assert!((table.view().amount - expected).abs() < 1e-9);
        }
    }
}
