//! Byte-exact comparison of two captures.
//!
//! ## Notes
//! - Captures are compared as raw bytes. `"42\n"` and `"42"` are different outputs.
//! - An absent capture is never treated as an empty one: the verdict says which side is missing.

use crate::execution::ExecutionError;
use crate::verdict::{ComparisonVerdict, FirstDifference, Outcome};

/// What one program left behind for a fixture: its capture (if any) and how the invocation ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Side<'a> {
    pub output: Option<&'a [u8]>,
    pub error: Option<&'a ExecutionError>,
}

impl<'a> Side<'a> {
    pub fn new(output: Option<&'a [u8]>, error: Option<&'a ExecutionError>) -> Self {
        Self { output, error }
    }

    /// A side that finished normally with `output`.
    pub fn completed(output: &'a [u8]) -> Self {
        Self::new(Some(output), None)
    }
}

/// Compare two captures without considering how the invocations ended.
///
/// ## Parameters
/// - `fixture`: identifier recorded on the verdict.
/// - `baseline`, `candidate`: the captures; `None` when no capture exists.
///
/// ## Returns
/// - `BaselineMissing` / `CandidateMissing` when a side is absent (baseline checked first), otherwise
///   `Match` or `Mismatch` with the first differing location.
pub fn compare(fixture: &str, baseline: Option<&[u8]>, candidate: Option<&[u8]>) -> ComparisonVerdict {
    compare_sides(
        fixture,
        Side::new(baseline, None),
        Side::new(candidate, None),
    )
}

/// Judge a fixture from both sides, including execution errors.
///
/// Precedence: baseline missing, candidate missing, baseline errored, candidate errored, then the byte
/// comparison.
pub fn compare_sides(fixture: &str, baseline: Side<'_>, candidate: Side<'_>) -> ComparisonVerdict {
    let Some(baseline_output) = baseline.output else {
        return ComparisonVerdict::new(fixture, Outcome::BaselineMissing).with_cause(baseline.error.cloned());
    };
    let Some(candidate_output) = candidate.output else {
        return ComparisonVerdict::new(fixture, Outcome::CandidateMissing).with_cause(candidate.error.cloned());
    };
    if let Some(err) = baseline.error {
        return ComparisonVerdict::new(fixture, Outcome::BaselineErrored).with_cause(Some(err.clone()));
    }
    if let Some(err) = candidate.error {
        return ComparisonVerdict::new(fixture, Outcome::CandidateErrored).with_cause(Some(err.clone()));
    }

    match first_difference(baseline_output, candidate_output) {
        None => ComparisonVerdict::new(fixture, Outcome::Match),
        Some(diff) => ComparisonVerdict::new(fixture, Outcome::Mismatch).with_first_difference(diff),
    }
}

/// Locate the first byte at which `a` and `b` differ.
///
/// ## Returns
/// - `None` when the slices are identical.
/// - The offset of the first differing byte, or the shorter length when one slice is a prefix of the other.
///   Line and column are 1-based and counted in `a`.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<FirstDifference> {
    if a == b {
        return None;
    }

    let offset = a
        .iter()
        .zip(b.iter())
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()));

    let prefix = &a[..offset];
    let line = prefix.iter().filter(|&&byte| byte == b'\n').count() + 1;
    let line_start = prefix.iter().rposition(|&byte| byte == b'\n').map_or(0, |pos| pos + 1);

    Some(FirstDifference {
        byte_offset: offset,
        line,
        column: offset - line_start + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_identical_outputs_match() {
        let verdict = compare("t1", Some(&b"42\n"[..]), Some(&b"42\n"[..]));
        assert_eq!(verdict.outcome, Outcome::Match);
        assert!(verdict.first_difference.is_none());
    }

    #[test]
    fn test_trailing_newline_is_a_mismatch() {
        let verdict = compare("t1", Some(&b"42\n"[..]), Some(&b"42"[..]));
        assert_eq!(verdict.outcome, Outcome::Mismatch);
        assert_eq!(
            verdict.first_difference,
            Some(FirstDifference {
                byte_offset: 3,
                line: 2,
                column: 1
            })
        );
    }

    #[test]
    fn test_no_whitespace_normalization() {
        let verdict = compare("t1", Some(&b"a b\n"[..]), Some(&b"a  b\n"[..]));
        assert_eq!(verdict.outcome, Outcome::Mismatch);
        assert_eq!(verdict.first_difference.map(|d| d.column), Some(3));
    }

    #[test]
    fn test_difference_on_later_line() {
        let diff = first_difference(b"one\ntwo\nthree\n", b"one\ntwo\nthr33\n").unwrap();
        assert_eq!(diff.byte_offset, 11);
        assert_eq!(diff.line, 3);
        assert_eq!(diff.column, 4);
    }

    #[test]
    fn test_missing_is_not_empty() {
        let verdict = compare("t1", Some(&b""[..]), None);
        assert_eq!(verdict.outcome, Outcome::CandidateMissing);

        let verdict = compare("t1", None, Some(&b""[..]));
        assert_eq!(verdict.outcome, Outcome::BaselineMissing);

        let verdict = compare("t1", Some(&b""[..]), Some(&b""[..]));
        assert_eq!(verdict.outcome, Outcome::Match);
    }

    #[test]
    fn test_baseline_missing_takes_precedence() {
        let verdict = compare("t1", None, None);
        assert_eq!(verdict.outcome, Outcome::BaselineMissing);
    }

    #[test]
    fn test_errored_side_is_reported_even_when_bytes_agree() {
        let timeout = ExecutionError::TimedOut {
            after: Duration::from_secs(10),
        };
        let verdict = compare_sides(
            "t1",
            Side::completed(b"1\n"),
            Side::new(Some(&b"1\n"[..]), Some(&timeout)),
        );
        assert_eq!(verdict.outcome, Outcome::CandidateErrored);
        assert_eq!(verdict.cause, Some(timeout));
    }

    #[test]
    fn test_missing_carries_launch_cause() {
        let launch = ExecutionError::LaunchFailed {
            reason: "executable not found".to_string(),
        };
        let verdict = compare_sides("t1", Side::new(None, Some(&launch)), Side::completed(b""));
        assert_eq!(verdict.outcome, Outcome::BaselineMissing);
        assert_eq!(verdict.cause, Some(launch));
    }

    proptest! {
        #[test]
        fn prop_match_iff_equal(a in proptest::collection::vec(any::<u8>(), 0..64),
                                b in proptest::collection::vec(any::<u8>(), 0..64)) {
            let verdict = compare("p", Some(a.as_slice()), Some(b.as_slice()));
            prop_assert_eq!(verdict.outcome == Outcome::Match, a == b);
        }

        #[test]
        fn prop_first_difference_is_first(a in proptest::collection::vec(any::<u8>(), 0..64),
                                          b in proptest::collection::vec(any::<u8>(), 0..64)) {
            if let Some(diff) = first_difference(&a, &b) {
                let offset = diff.byte_offset;
                prop_assert!(offset <= a.len().min(b.len()));
                prop_assert_eq!(&a[..offset], &b[..offset]);
                prop_assert!(offset == a.len() || offset == b.len() || a[offset] != b[offset]);
            }
        }

        #[test]
        fn prop_comparison_is_symmetric_in_outcome(a in proptest::collection::vec(any::<u8>(), 0..32),
                                                   b in proptest::collection::vec(any::<u8>(), 0..32)) {
            let forward = compare("p", Some(a.as_slice()), Some(b.as_slice()));
            let backward = compare("p", Some(b.as_slice()), Some(a.as_slice()));
            prop_assert_eq!(forward.outcome, backward.outcome);
            prop_assert_eq!(
                forward.first_difference.map(|d| d.byte_offset),
                backward.first_difference.map(|d| d.byte_offset)
            );
        }
    }
}
