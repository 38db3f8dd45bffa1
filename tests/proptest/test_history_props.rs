//! Property-based tests for the history queue
//!
//! Random sequences of adds and navigation steps must keep the queue
//! bounded, free of consecutive duplicates, and the cursor in range.

use psbridge::models::CommandKind;
use psbridge::CommandHistory;
use proptest::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Clone)]
enum Step {
    Add(String),
    Up,
    Down,
    Reset,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => "[a-c]{0,2}".prop_map(Step::Add),
        2 => Just(Step::Up),
        2 => Just(Step::Down),
        1 => Just(Step::Reset),
    ]
}

fn history(max: usize) -> CommandHistory {
    // never saved, so the path is never touched
    CommandHistory::with_path(max, PathBuf::from("unused-history.json"))
}

proptest! {
    #[test]
    fn test_no_consecutive_duplicates(commands in prop::collection::vec("[a-c]{1,2}", 0..60)) {
        let history = history(1000);
        for cmd in &commands {
            history.add(cmd, CommandKind::Interactive);
        }

        let entries = history.entries();
        for pair in entries.windows(2) {
            prop_assert_ne!(&pair[0].command, &pair[1].command);
        }
    }

    #[test]
    fn test_bounded_and_keeps_newest(
        max in 1usize..20,
        count in 0usize..80,
    ) {
        let history = history(max);
        for i in 0..count {
            history.add(&format!("cmd-{}", i), CommandKind::Interactive);
        }

        prop_assert!(history.len() <= max);
        prop_assert_eq!(history.len(), count.min(max));
        if count > 0 {
            let newest = history.recent(1).pop().map(|e| e.command);
            prop_assert_eq!(newest, Some(format!("cmd-{}", count - 1)));
        }
    }

    #[test]
    fn test_navigation_stays_in_range(max in 1usize..10, steps in prop::collection::vec(step(), 0..100)) {
        let history = history(max);

        for step in steps {
            match step {
                Step::Add(cmd) => {
                    history.add(&cmd, CommandKind::Interactive);
                }
                Step::Up => {
                    let result = history.previous();
                    prop_assert_eq!(result.is_none(), history.is_empty());
                    if let Some(cmd) = result {
                        prop_assert!(!cmd.is_empty());
                    }
                }
                Step::Down => {
                    let result = history.next();
                    prop_assert_eq!(result.is_none(), history.is_empty());
                }
                Step::Reset => history.reset_cursor(),
            }

            prop_assert!(history.cursor() <= history.len());
            prop_assert!(history.len() <= max);
        }
    }

    #[test]
    fn test_up_then_down_returns_to_blank(commands in prop::collection::vec("[a-z]{1,6}", 1..20)) {
        let history = history(100);
        for cmd in &commands {
            history.add(cmd, CommandKind::Interactive);
        }

        let len = history.len();
        for _ in 0..len + 3 {
            history.previous();
        }
        prop_assert_eq!(history.cursor(), 0);

        let mut last = None;
        for _ in 0..len + 3 {
            last = history.next();
        }
        prop_assert_eq!(last.as_deref(), Some(""));
        prop_assert_eq!(history.cursor(), len);
    }
}
