//! One analysis run, from sampling to the assembled report.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::AnalysisConfig,
    consensus::aggregate,
    describer::describe_all,
    error::{DashguardError, Result},
    oracle::Oracle,
    payload::VideoPayload,
    prompts::PromptTemplates,
    sampler::collect_samples,
    sections::sectionize,
    types::{Report, Verdict},
};

/// Where a run currently is. `Failed` is only reachable from `Aggregating`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Sampling {
        requested: usize,
    },
    Aggregating {
        valid: usize,
        rejected: usize,
        failed: usize,
    },
    Sectionizing {
        robust_time: f64,
    },
    Describing {
        verdict: Verdict,
    },
    Complete,
    Failed {
        reason: String,
    },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed { .. })
    }
}

/// Observer for run state transitions.
pub trait ProgressSink: Send + Sync {
    fn on_state(&self, state: &RunState);
}

impl ProgressSink for () {
    fn on_state(&self, _state: &RunState) {}
}

pub struct Analyzer {
    oracle: Arc<dyn Oracle>,
    prompts: Arc<PromptTemplates>,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        prompts: Arc<PromptTemplates>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            oracle,
            prompts,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the whole pipeline for one video.
    ///
    /// Either every stage completes and a final report comes back, or the run
    /// fails with `InsufficientSamples` and nothing partial is returned.
    pub async fn analyze(
        &self,
        video: &VideoPayload,
        duration: f64,
        progress: &dyn ProgressSink,
    ) -> Result<Report> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DashguardError::InvalidDuration { duration });
        }
        let oracle = self.oracle.as_ref();
        let requested = self.config.sample_count;

        progress.on_state(&RunState::Sampling { requested });
        info!(
            requested,
            video_bytes = video.byte_len(),
            "sampling collision estimates"
        );
        let batch = collect_samples(oracle, video, requested).await;

        progress.on_state(&RunState::Aggregating {
            valid: batch.estimates.len(),
            rejected: batch.rejected,
            failed: batch.failed,
        });
        let rejected = batch.rejected;
        let failed = batch.failed;
        let result = match aggregate(batch.estimates, self.config.vote_policy) {
            Ok(result) => result,
            Err(_) => {
                let error = DashguardError::InsufficientSamples {
                    requested,
                    rejected,
                    failed,
                };
                warn!(requested, rejected, failed, "no valid samples, run failed");
                progress.on_state(&RunState::Failed {
                    reason: error.to_string(),
                });
                return Err(error);
            }
        };
        info!(
            valid = result.samples.len(),
            rejected,
            failed,
            robust_time = result.robust_time,
            verdict = %result.verdict,
            "consensus reached"
        );

        progress.on_state(&RunState::Sectionizing {
            robust_time: result.robust_time,
        });
        let timeline = sectionize(result.robust_time, duration)?;

        progress.on_state(&RunState::Describing {
            verdict: result.verdict,
        });
        let descriptions =
            describe_all(oracle, video, &self.prompts, &timeline, result.verdict).await;

        let report = Report {
            result,
            sections: timeline.sections(),
            descriptions,
        };
        info!(
            failed_sections = report.failed_sections(),
            "report assembled"
        );
        progress.on_state(&RunState::Complete);
        Ok(report)
    }
}
