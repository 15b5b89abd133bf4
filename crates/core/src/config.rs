use serde::{Deserialize, Serialize};

use crate::{
    consensus::VotePolicy,
    error::{DashguardError, Result},
};

pub const DEFAULT_SAMPLE_COUNT: usize = 5;
pub const MAX_SAMPLE_COUNT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of independent sampling calls per run.
    pub sample_count: usize,
    pub vote_policy: VotePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            vote_policy: VotePolicy::Majority,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SAMPLE_COUNT).contains(&self.sample_count) {
            return Err(DashguardError::invalid_config(format!(
                "sample count must be between 1 and {MAX_SAMPLE_COUNT}, got {}",
                self.sample_count
            )));
        }
        if let VotePolicy::Supermajority { threshold } = self.vote_policy
            && !(threshold > 0.5 && threshold <= 1.0)
        {
            return Err(DashguardError::invalid_config(format!(
                "supermajority threshold must be in (0.5, 1], got {threshold}"
            )));
        }
        Ok(())
    }
}
