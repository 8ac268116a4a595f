#![no_main]

use difftest_core::{Outcome, compare, first_difference};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the split point between the two captures
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let at = usize::from(split).min(rest.len());
    let (baseline, candidate) = rest.split_at(at);

    let verdict = compare("fuzz", Some(baseline), Some(candidate));
    assert_eq!(verdict.outcome == Outcome::Match, baseline == candidate);

    if let Some(diff) = first_difference(baseline, candidate) {
        assert!(diff.byte_offset <= baseline.len().min(candidate.len()));
        assert!(diff.line >= 1 && diff.column >= 1);
        assert_eq!(baseline[..diff.byte_offset], candidate[..diff.byte_offset]);
    }
});
