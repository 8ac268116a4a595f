//! Run reports.
//!
//! A [`ReportBuilder`] accumulates verdicts in fixture-enumeration order while a run is in progress;
//! [`ReportBuilder::finish`] freezes it into a read-only [`RunReport`].

use std::time::Duration;

use serde::Serialize;

use crate::verdict::ComparisonVerdict;

/// Finalized result of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    verdicts: Vec<ComparisonVerdict>,
    enumerated: usize,
    cancelled: bool,
    duration: Duration,
}

/// Derived counts of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Fixtures enumerated for the run.
    pub total: usize,
    pub passed: usize,
    /// Evaluated fixtures whose verdict is anything but `Match`.
    pub failed: usize,
    /// Fixtures that never got a verdict because the run was cancelled.
    pub not_evaluated: usize,
    /// Failed fixture identifiers, in enumeration order.
    pub failed_fixtures: Vec<String>,
}

impl RunReport {
    pub fn verdicts(&self) -> &[ComparisonVerdict] {
        &self.verdicts
    }

    pub fn enumerated(&self) -> usize {
        self.enumerated
    }

    pub fn evaluated(&self) -> usize {
        self.verdicts.len()
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.evaluated() - self.passed()
    }

    /// Identifiers of every evaluated fixture whose verdict is not `Match`, in enumeration order.
    pub fn failed_fixtures(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|v| !v.passed())
            .map(|v| v.fixture.as_str())
            .collect()
    }

    /// True when every enumerated fixture was evaluated and matched.
    pub fn all_passed(&self) -> bool {
        !self.cancelled && self.evaluated() == self.enumerated && self.failed() == 0
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.enumerated,
            passed: self.passed(),
            failed: self.failed(),
            not_evaluated: self.enumerated - self.evaluated(),
            failed_fixtures: self.failed_fixtures().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Incrementally built report. Callers push verdicts in enumeration order.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    verdicts: Vec<ComparisonVerdict>,
    enumerated: usize,
    cancelled: bool,
}

impl ReportBuilder {
    pub fn new(enumerated: usize) -> Self {
        Self {
            verdicts: Vec::with_capacity(enumerated),
            enumerated,
            cancelled: false,
        }
    }

    pub fn push(&mut self, verdict: ComparisonVerdict) {
        debug_assert!(
            self.verdicts.len() < self.enumerated,
            "more verdicts than enumerated fixtures"
        );
        self.verdicts.push(verdict);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn finish(self, duration: Duration) -> RunReport {
        RunReport {
            verdicts: self.verdicts,
            enumerated: self.enumerated,
            cancelled: self.cancelled,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Outcome;

    fn report(outcomes: &[(&str, Outcome)], enumerated: usize, cancelled: bool) -> RunReport {
        let mut builder = ReportBuilder::new(enumerated);
        for (id, outcome) in outcomes {
            builder.push(ComparisonVerdict::new(*id, *outcome));
        }
        if cancelled {
            builder.mark_cancelled();
        }
        builder.finish(Duration::from_millis(5))
    }

    #[test]
    fn test_counts() {
        let report = report(
            &[
                ("a", Outcome::Match),
                ("b", Outcome::Mismatch),
                ("c", Outcome::Match),
                ("d", Outcome::CandidateMissing),
            ],
            4,
            false,
        );
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failed_fixtures(), ["b", "d"]);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_failed_list_matches_non_match_verdicts_in_order() {
        let report = report(
            &[
                ("z", Outcome::BaselineErrored),
                ("a", Outcome::Match),
                ("m", Outcome::CandidateErrored),
            ],
            3,
            false,
        );
        let expected: Vec<&str> = report
            .verdicts()
            .iter()
            .filter(|v| v.outcome != Outcome::Match)
            .map(|v| v.fixture.as_str())
            .collect();
        assert_eq!(report.failed_fixtures(), expected);
    }

    #[test]
    fn test_empty_run_passes() {
        let report = report(&[], 0, false);
        assert!(report.all_passed());
        assert_eq!(report.summary().total, 0);
    }

    #[test]
    fn test_cancelled_run_counts_unevaluated() {
        let report = report(&[("a", Outcome::Match)], 3, true);
        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.not_evaluated, 2);
        assert!(!report.all_passed());
    }
}
