//! Assertion macros for toptalk harnesses.
//!
//! These wrap `pretty_assertions` with messages that say which store key or
//! cycle outcome was wrong.

/// Assert the exact contents of a list in a `FakeQueueStore`.
///
/// ```rust
/// assert_list!(pipeline.publisher().store(), "iplist201401060920", [LINE_A, LINE_B]);
/// ```
#[macro_export]
macro_rules! assert_list {
    ($store:expr, $key:expr, [$($payload:expr),* $(,)?]) => {{
        let expected: Vec<String> = vec![$(($payload).to_string()),*];
        let actual = $store.list($key);
        pretty_assertions::assert_eq!(
            actual, expected,
            "assert_list! failed for key {:?}", $key
        );
    }};
}

/// Assert a cycle completed and return its report.
#[macro_export]
macro_rules! assert_completed {
    ($outcome:expr, $window:expr) => {{
        match $outcome {
            toptalk::CycleOutcome::Completed { window, report } => {
                pretty_assertions::assert_eq!(window.as_str(), $window);
                report
            }
            other => panic!(
                "assert_completed! failed: expected window {} to complete, got {:?}",
                $window, other
            ),
        }
    }};
}

/// Assert a cycle was skipped for the given [`NotReady`](toptalk_core::NotReady) pattern.
#[macro_export]
macro_rules! assert_not_ready {
    ($outcome:expr, $pattern:pat) => {{
        match $outcome {
            toptalk::CycleOutcome::NotReady($pattern) => {}
            other => panic!(
                "assert_not_ready! failed: expected {}, got {:?}",
                stringify!($pattern),
                other
            ),
        }
    }};
}
