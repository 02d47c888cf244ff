//! Render Job Client: submits a block snapshot and follows the job to a result.
//!
//! DESIGN
//! ======
//! The backend answers a submit either synchronously (result or failure) or
//! with a job id. For a job id, one poll task is spawned: it sleeps the poll
//! interval, checks status, and reports back over an unbounded channel until
//! the job is terminal or the poll timeout fires.
//!
//! Every update carries the generation of the submission that spawned it. A
//! new submit, `cancel`, or drop aborts the poll task and bumps the
//! generation, so an update already sitting in the channel is discarded when
//! [`RenderJobClient::pump`] drains it.
//!
//! ERROR HANDLING
//! ==============
//! Every failure ends as [`RenderState::Failed`] with a user-facing
//! [`RenderFailure`]. Nothing is retried; the caller re-submits.

#[cfg(test)]
#[path = "render_job_test.rs"]
mod render_job_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::error::{ErrorCode, RenderFailure};
use crate::net::api::RenderApi;
use crate::net::types::{JobStatus, RenderJob, RenderRequest, SubmitOutcome, parse_status, parse_submit_response};

/// What the user sees of the current submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Submitting,
    Polling { job_id: String, status: JobStatus },
    Succeeded { result_url: String },
    Failed(RenderFailure),
}

impl RenderState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed(_))
    }

    #[must_use]
    pub fn result_url(&self) -> Option<&str> {
        match self {
            Self::Succeeded { result_url } => Some(result_url),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct JobUpdate {
    generation: u64,
    event: PollEvent,
}

#[derive(Debug)]
enum PollEvent {
    Progress(JobStatus),
    Finished(Result<String, RenderFailure>),
}

pub struct RenderJobClient {
    api: Arc<dyn RenderApi>,
    poll: PollConfig,
    generation: u64,
    state: RenderState,
    job: Option<RenderJob>,
    poller: Option<JoinHandle<()>>,
    updates_tx: mpsc::UnboundedSender<JobUpdate>,
    updates_rx: mpsc::UnboundedReceiver<JobUpdate>,
}

impl RenderJobClient {
    #[must_use]
    pub fn new(api: Arc<dyn RenderApi>, poll: PollConfig) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            api,
            poll,
            generation: 0,
            state: RenderState::Idle,
            job: None,
            poller: None,
            updates_tx,
            updates_rx,
        }
    }

    /// Submit `request`, cancelling any poll still running for an earlier
    /// submission. Returns once the backend has answered the submit; a
    /// queued job is then followed in the background.
    pub async fn submit(&mut self, request: &RenderRequest) -> &RenderState {
        self.stop_polling();
        self.generation += 1;
        let generation = self.generation;
        self.state = RenderState::Submitting;
        self.job = None;
        info!(
            template_id = %request.template_id,
            block_count = request.text_data.len(),
            generation,
            "render submit"
        );

        let outcome = match self.api.submit(request).await {
            Ok(body) => parse_submit_response(&body),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), generation, "render submit failed");
                self.settle(Err(RenderFailure::submission()));
                return &self.state;
            }
        };

        match outcome {
            SubmitOutcome::Immediate { result_url } => self.settle(Ok(result_url)),
            SubmitOutcome::Failed { error } => self.settle(Err(RenderFailure::job(error.as_deref()))),
            SubmitOutcome::Unexpected => {
                warn!(generation, "render submit returned an unrecognized body");
                self.settle(Err(RenderFailure::unexpected()));
            }
            SubmitOutcome::Queued { job_id } => self.start_polling(job_id, generation),
        }
        &self.state
    }

    /// Apply every poll update received so far. Returns how many were applied;
    /// updates from superseded submissions are dropped.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            if self.apply(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until the current job reaches a terminal state, or return at once
    /// if nothing is being polled.
    pub async fn wait_for_terminal(&mut self) -> &RenderState {
        self.pump();
        while matches!(self.state, RenderState::Polling { .. }) {
            let Some(poller) = self.poller.as_mut() else {
                break;
            };
            tokio::select! {
                biased;
                update = self.updates_rx.recv() => {
                    if let Some(update) = update {
                        self.apply(update);
                    }
                }
                _ = poller => {
                    self.poller = None;
                    self.pump();
                    if matches!(self.state, RenderState::Polling { .. }) {
                        warn!(generation = self.generation, "render poll task ended without a result");
                        self.settle(Err(RenderFailure::polling()));
                    }
                }
            }
        }
        &self.state
    }

    /// Abandon the current submission. Late updates for it are ignored.
    pub fn cancel(&mut self) {
        self.stop_polling();
        self.generation += 1;
        if matches!(self.state, RenderState::Submitting | RenderState::Polling { .. }) {
            info!(generation = self.generation, "render cancelled");
            self.state = RenderState::Idle;
            self.job = None;
        }
    }

    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// The current submission, once the backend has answered it.
    #[must_use]
    pub fn job(&self) -> Option<&RenderJob> {
        self.job.as_ref()
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|h| !h.is_finished())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn start_polling(&mut self, job_id: String, generation: u64) {
        info!(%job_id, generation, interval_ms = self.poll.interval_ms, "render job queued");
        self.job = Some(RenderJob {
            job_id: Some(job_id.clone()),
            status: JobStatus::Pending,
            result_url: None,
            error_message: None,
        });
        self.state = RenderState::Polling { job_id: job_id.clone(), status: JobStatus::Pending };

        let api = Arc::clone(&self.api);
        let tx = self.updates_tx.clone();
        let poll = self.poll;
        self.poller = Some(tokio::spawn(async move {
            let polling = poll_until_terminal(api.as_ref(), &job_id, poll.interval(), &tx, generation);
            let result = match tokio::time::timeout(poll.timeout(), polling).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%job_id, generation, timeout_secs = poll.timeout_secs, "render poll timed out");
                    Err(RenderFailure::timed_out())
                }
            };
            if tx.send(JobUpdate { generation, event: PollEvent::Finished(result) }).is_err() {
                debug!(%job_id, generation, "render client gone before poll finished");
            }
        }));
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
            debug!(generation = self.generation, "render poll stopped");
        }
    }

    fn apply(&mut self, update: JobUpdate) -> bool {
        if update.generation != self.generation {
            warn!(generation = update.generation, current = self.generation, "discarding stale render update");
            return false;
        }
        match update.event {
            PollEvent::Progress(status) => {
                if let RenderState::Polling { status: current, .. } = &mut self.state {
                    *current = status;
                }
                if let Some(job) = &mut self.job {
                    job.status = status;
                }
            }
            PollEvent::Finished(result) => self.settle(result),
        }
        true
    }

    fn settle(&mut self, result: Result<String, RenderFailure>) {
        self.stop_polling();
        let job_id = self.job.take().and_then(|job| job.job_id);
        match result {
            Ok(result_url) => {
                info!(job_id = job_id.as_deref(), generation = self.generation, "render succeeded");
                self.job = Some(RenderJob {
                    job_id,
                    status: JobStatus::Succeeded,
                    result_url: Some(result_url.clone()),
                    error_message: None,
                });
                self.state = RenderState::Succeeded { result_url };
            }
            Err(failure) => {
                info!(
                    job_id = job_id.as_deref(),
                    generation = self.generation,
                    code = failure.error_code(),
                    "render failed"
                );
                self.job = Some(RenderJob {
                    job_id,
                    status: JobStatus::Failed,
                    result_url: None,
                    error_message: Some(failure.message().to_owned()),
                });
                self.state = RenderState::Failed(failure);
            }
        }
    }
}

impl Drop for RenderJobClient {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn poll_until_terminal(
    api: &dyn RenderApi,
    job_id: &str,
    interval: Duration,
    tx: &mpsc::UnboundedSender<JobUpdate>,
    generation: u64,
) -> Result<String, RenderFailure> {
    loop {
        tokio::time::sleep(interval).await;

        let body = api.status(job_id).await.map_err(|e| {
            warn!(job_id, generation, error = %e, "render status check failed");
            RenderFailure::polling()
        })?;
        let report = parse_status(&body);

        match report.status {
            Some(JobStatus::Succeeded) => {
                return report.result_url.ok_or_else(|| {
                    warn!(job_id, generation, "render succeeded without a result reference");
                    RenderFailure::unexpected()
                });
            }
            Some(JobStatus::Failed) => return Err(RenderFailure::job(report.error.as_deref())),
            Some(status) => {
                debug!(job_id, generation, status = status.as_str(), "render poll");
                if tx.send(JobUpdate { generation, event: PollEvent::Progress(status) }).is_err() {
                    debug!(job_id, generation, "render client gone during poll");
                }
            }
            None => {
                warn!(job_id, generation, status = ?report.raw_status, "unknown render status, still polling");
            }
        }
    }
}
