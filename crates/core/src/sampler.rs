//! First fan-out: N independent collision estimates.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    oracle::{InferenceRequest, Oracle, OracleError, ResponseMode},
    payload::VideoPayload,
    prompts::SAMPLING_PROMPT,
    types::ValidatedEstimate,
    validator::{Rejection, validate},
};

#[derive(Debug)]
pub enum SampleOutcome {
    Valid(ValidatedEstimate),
    /// The call succeeded but the payload did not validate.
    Rejected(Rejection),
    /// The call itself failed.
    Failed(OracleError),
}

/// Settled sampling phase, with rejections and failures counted apart.
#[derive(Debug, Default)]
pub struct SampleBatch {
    pub estimates: Vec<ValidatedEstimate>,
    pub rejected: usize,
    pub failed: usize,
}

impl SampleBatch {
    pub fn requested(&self) -> usize {
        self.estimates.len() + self.rejected + self.failed
    }
}

impl FromIterator<SampleOutcome> for SampleBatch {
    fn from_iter<I: IntoIterator<Item = SampleOutcome>>(outcomes: I) -> Self {
        let mut batch = SampleBatch::default();
        for outcome in outcomes {
            match outcome {
                SampleOutcome::Valid(estimate) => batch.estimates.push(estimate),
                SampleOutcome::Rejected(_) => batch.rejected += 1,
                SampleOutcome::Failed(_) => batch.failed += 1,
            }
        }
        batch
    }
}

pub async fn request_sample(oracle: &dyn Oracle, video: &VideoPayload, index: usize) -> SampleOutcome {
    let request = InferenceRequest {
        prompt: SAMPLING_PROMPT.to_string(),
        video: video.clone(),
        mode: ResponseMode::Json,
    };

    match oracle.infer(request).await {
        Ok(raw) => match validate(&raw) {
            Ok(estimate) => {
                debug!(
                    sample = index,
                    time = estimate.time,
                    verdict = %estimate.verdict,
                    "sample accepted"
                );
                SampleOutcome::Valid(estimate)
            }
            Err(rejection) => {
                warn!(sample = index, reason = %rejection, raw = %raw, "sample rejected");
                SampleOutcome::Rejected(rejection)
            }
        },
        Err(error) => {
            warn!(sample = index, error = %error, "sample request failed");
            SampleOutcome::Failed(error)
        }
    }
}

/// Issue `count` sampling calls concurrently and wait for all of them.
pub async fn collect_samples(oracle: &dyn Oracle, video: &VideoPayload, count: usize) -> SampleBatch {
    let requests = (0..count).map(|index| request_sample(oracle, video, index));
    join_all(requests).await.into_iter().collect()
}
