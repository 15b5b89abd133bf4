//! Run generations and the latest-completed-run slot.
//!
//! Every run takes a new generation number when it starts. A run that
//! finishes after a newer one began is stale: its result is dropped and the
//! caller gets `Superseded` instead.

use std::{path::Path, sync::Arc};

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{DashguardError, Result},
    payload::VideoPayload,
    pipeline::{Analyzer, ProgressSink},
    types::Report,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Complete(Report),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub ticket: RunTicket,
    pub outcome: RunOutcome,
}

/// Generation counter plus the most recent completed run, as observers see it.
#[derive(Debug, Clone, Default)]
pub struct RunSnapshot {
    pub generation: u64,
    pub latest: Option<Arc<CompletedRun>>,
}

/// Both fields change inside one `watch` update so a stale run can never
/// publish over a newer one, and every subscriber sees each change.
struct LatestRun {
    slot: watch::Sender<RunSnapshot>,
}

impl LatestRun {
    fn new() -> Self {
        Self {
            slot: watch::Sender::new(RunSnapshot::default()),
        }
    }

    fn advance(&self) -> u64 {
        let mut generation = 0;
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.latest = None;
            generation = slot.generation;
        });
        generation
    }

    fn publish(&self, run: CompletedRun) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.generation != run.ticket.generation {
                return false;
            }
            slot.latest = Some(Arc::new(run));
            true
        })
    }
}

pub struct RunSupervisor {
    analyzer: Analyzer,
    latest: LatestRun,
}

impl RunSupervisor {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            latest: LatestRun::new(),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn current_generation(&self) -> u64 {
        self.latest.slot.borrow().generation
    }

    /// Start a new generation, making every earlier run stale and clearing
    /// the previous result.
    pub fn begin(&self) -> RunTicket {
        RunTicket {
            run_id: Uuid::new_v4(),
            generation: self.latest.advance(),
        }
    }

    pub fn is_current(&self, ticket: &RunTicket) -> bool {
        self.current_generation() == ticket.generation
    }

    pub fn latest(&self) -> Option<Arc<CompletedRun>> {
        self.latest.slot.borrow().latest.clone()
    }

    /// Observe generation changes and published runs. Each receiver is woken
    /// when a run starts (slot cleared) and when the current run publishes.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.latest.slot.subscribe()
    }

    /// Read and encode the video, then run it as a new generation.
    pub async fn run_file(
        &self,
        path: &Path,
        duration: f64,
        progress: &dyn ProgressSink,
    ) -> Result<Report> {
        let ticket = self.begin();
        let video = VideoPayload::from_file(path).await?;
        self.run_ticket(ticket, video, duration, progress).await
    }

    /// Run `video` as a new generation. The payload is used for this run only.
    pub async fn run(
        &self,
        video: VideoPayload,
        duration: f64,
        progress: &dyn ProgressSink,
    ) -> Result<Report> {
        let ticket = self.begin();
        self.run_ticket(ticket, video, duration, progress).await
    }

    async fn run_ticket(
        &self,
        ticket: RunTicket,
        video: VideoPayload,
        duration: f64,
        progress: &dyn ProgressSink,
    ) -> Result<Report> {
        info!(run_id = %ticket.run_id, generation = ticket.generation, "run started");
        let result = self.analyzer.analyze(&video, duration, progress).await;
        drop(video);

        let outcome = match &result {
            Ok(report) => RunOutcome::Complete(report.clone()),
            Err(error) => RunOutcome::Failed(error.to_string()),
        };
        if !self.latest.publish(CompletedRun { ticket, outcome }) {
            warn!(
                run_id = %ticket.run_id,
                generation = ticket.generation,
                current = self.current_generation(),
                "discarding superseded run"
            );
            return Err(DashguardError::Superseded {
                generation: ticket.generation,
            });
        }
        result
    }
}
