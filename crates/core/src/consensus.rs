//! Reduces validated estimates to one robust time, window and verdict.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{AggregatedResult, ValidatedEstimate, Verdict};

pub const SUPERMAJORITY_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum VotePolicy {
    /// Most frequent label wins; ties go to the label seen first.
    #[default]
    Majority,
    /// The plurality label should hold at least `threshold` (above one half)
    /// of the votes; when it does not, plain majority still decides.
    Supermajority { threshold: f64 },
}

impl VotePolicy {
    pub fn supermajority() -> Self {
        VotePolicy::Supermajority {
            threshold: SUPERMAJORITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot aggregate zero estimates")]
pub struct InsufficientSamples;

pub fn aggregate(
    estimates: Vec<ValidatedEstimate>,
    policy: VotePolicy,
) -> Result<AggregatedResult, InsufficientSamples> {
    let times: Vec<f64> = estimates.iter().map(|e| e.time).collect();
    let starts: Vec<f64> = estimates.iter().map(|e| e.window.0).collect();
    let ends: Vec<f64> = estimates.iter().map(|e| e.window.1).collect();

    let robust_time = median(&times).ok_or(InsufficientSamples)?;
    let robust_window = (
        median(&starts).ok_or(InsufficientSamples)?,
        median(&ends).ok_or(InsufficientSamples)?,
    );
    let verdict = vote(estimates.iter().map(|e| e.verdict), policy).ok_or(InsufficientSamples)?;

    Ok(AggregatedResult {
        samples: estimates,
        robust_time,
        robust_window,
        verdict,
    })
}

/// Median of `values`; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Label counts in order of first appearance.
pub fn tally(verdicts: impl IntoIterator<Item = Verdict>) -> Vec<(Verdict, usize)> {
    let mut counts: Vec<(Verdict, usize)> = Vec::with_capacity(Verdict::ALL.len());
    for verdict in verdicts {
        match counts.iter_mut().find(|(v, _)| *v == verdict) {
            Some((_, count)) => *count += 1,
            None => counts.push((verdict, 1)),
        }
    }
    counts
}

/// Plurality vote. Under `Supermajority` the plurality label is still the
/// answer; the policy only records whether it cleared the threshold, so a
/// lower-count label can never win.
pub fn vote(verdicts: impl IntoIterator<Item = Verdict>, policy: VotePolicy) -> Option<Verdict> {
    let counts = tally(verdicts);
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let (verdict, count) = plurality(&counts)?;

    if let VotePolicy::Supermajority { threshold } = policy {
        let share = count as f64 / total as f64;
        if share >= threshold {
            debug!(%verdict, share, threshold, "supermajority reached");
        } else {
            info!(%verdict, share, threshold, "no supermajority, using plurality");
        }
    }
    Some(verdict)
}

fn plurality(counts: &[(Verdict, usize)]) -> Option<(Verdict, usize)> {
    // Strict comparison keeps the earliest entry on equal counts.
    let mut best: Option<(Verdict, usize)> = None;
    for &(verdict, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((verdict, count));
        }
    }
    best
}
