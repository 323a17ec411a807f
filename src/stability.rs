//! Type-stability analysis over a sequence of trial records.

use std::fmt;

use serde::Serialize;

use crate::fingerprint::TypeFingerprint;
use crate::trial::TrialRecord;

/// Where a divergence was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DivergenceSite {
    Result,
    Argument { position: usize },
    Checkpoint { name: &'static str, position: usize },
}

impl fmt::Display for DivergenceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceSite::Result => f.write_str("result"),
            DivergenceSite::Argument { position } => write!(f, "argument {position}"),
            DivergenceSite::Checkpoint { name, .. } => write!(f, "checkpoint `{name}`"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StabilityVerdict {
    /// Every trial matched the first one. Runs with fewer than two completed
    /// trials are vacuously stable.
    Stable,
    Unstable {
        divergent_at: usize,
        site: DivergenceSite,
        expected: TypeFingerprint,
        found: TypeFingerprint,
    },
}

impl StabilityVerdict {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityVerdict::Stable)
    }
}

impl fmt::Display for StabilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityVerdict::Stable => f.write_str("stable"),
            StabilityVerdict::Unstable {
                divergent_at,
                site,
                expected,
                found,
            } => write!(
                f,
                "unstable (trial {divergent_at}: {site} {expected} -> {found})"
            ),
        }
    }
}

/// Compare every record against the first; stop at the first mismatch.
pub fn analyze(records: &[TrialRecord]) -> StabilityVerdict {
    let Some((first, rest)) = records.split_first() else {
        return StabilityVerdict::Stable;
    };
    rest.iter()
        .find_map(|record| diverges(first, record))
        .unwrap_or(StabilityVerdict::Stable)
}

fn diverges(first: &TrialRecord, record: &TrialRecord) -> Option<StabilityVerdict> {
    let unstable = |site, expected, found| StabilityVerdict::Unstable {
        divergent_at: record.trial_index,
        site,
        expected,
        found,
    };

    if record.result_fingerprint != first.result_fingerprint {
        return Some(unstable(
            DivergenceSite::Result,
            first.result_fingerprint,
            record.result_fingerprint,
        ));
    }

    let expected_args = first.argument_fingerprints.as_slice();
    let found_args = record.argument_fingerprints.as_slice();
    for position in 0..expected_args.len().max(found_args.len()) {
        let expected = expected_args.get(position).copied();
        let found = found_args.get(position).copied();
        if expected != found {
            return Some(unstable(
                DivergenceSite::Argument { position },
                expected.unwrap_or(TypeFingerprint::NOTHING),
                found.unwrap_or(TypeFingerprint::NOTHING),
            ));
        }
    }

    let expected_cps = &first.checkpoints;
    let found_cps = &record.checkpoints;
    for position in 0..expected_cps.len().max(found_cps.len()) {
        let expected = expected_cps.get(position);
        let found = found_cps.get(position);
        if expected != found {
            let name = expected.or(found).map_or("", |cp| cp.name);
            return Some(unstable(
                DivergenceSite::Checkpoint { name, position },
                expected.map_or(TypeFingerprint::NOTHING, |cp| cp.fingerprint),
                found.map_or(TypeFingerprint::NOTHING, |cp| cp.fingerprint),
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CheckpointFingerprint;
    use crate::fingerprint::FingerprintList;

    fn record(index: usize, result: TypeFingerprint) -> TrialRecord {
        TrialRecord {
            trial_index: index,
            duration_ns: 1,
            bytes_allocated: 0,
            counter_anomaly: false,
            result_fingerprint: result,
            argument_fingerprints: FingerprintList::new(),
            checkpoints: Vec::new(),
            checkpoints_truncated: false,
        }
    }

    #[test]
    fn empty_and_single_runs_are_stable() {
        assert_eq!(analyze(&[]), StabilityVerdict::Stable);
        assert_eq!(
            analyze(&[record(1, TypeFingerprint::I64)]),
            StabilityVerdict::Stable
        );
    }

    #[test]
    fn pinpoints_first_result_divergence() {
        let mut records: Vec<_> = (1..=6).map(|i| record(i, TypeFingerprint::F64)).collect();
        records[2].result_fingerprint = TypeFingerprint::I64;
        records[4].result_fingerprint = TypeFingerprint::STR;

        let verdict = analyze(&records);
        assert_eq!(
            verdict,
            StabilityVerdict::Unstable {
                divergent_at: 3,
                site: DivergenceSite::Result,
                expected: TypeFingerprint::F64,
                found: TypeFingerprint::I64,
            }
        );
        assert_eq!(verdict.to_string(), "unstable (trial 3: result f64 -> i64)");
    }

    #[test]
    fn argument_changes_are_divergences() {
        let mut a = record(1, TypeFingerprint::F64);
        a.argument_fingerprints.push(TypeFingerprint::I64);
        let mut b = record(2, TypeFingerprint::F64);
        b.argument_fingerprints.push(TypeFingerprint::F64);

        match analyze(&[a, b]) {
            StabilityVerdict::Unstable { divergent_at, site, .. } => {
                assert_eq!(divergent_at, 2);
                assert_eq!(site, DivergenceSite::Argument { position: 0 });
            }
            StabilityVerdict::Stable => panic!("argument change went unnoticed"),
        }
    }

    #[test]
    fn missing_checkpoint_is_reported_by_name() {
        let mut a = record(1, TypeFingerprint::F64);
        a.checkpoints.push(CheckpointFingerprint {
            name: "acc",
            fingerprint: TypeFingerprint::I64,
        });
        let b = record(2, TypeFingerprint::F64);

        assert_eq!(
            analyze(&[a, b]),
            StabilityVerdict::Unstable {
                divergent_at: 2,
                site: DivergenceSite::Checkpoint {
                    name: "acc",
                    position: 0
                },
                expected: TypeFingerprint::I64,
                found: TypeFingerprint::NOTHING,
            }
        );
    }
}
