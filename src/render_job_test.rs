use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::{Value, json};

use super::*;
use crate::error::{ApiError, JOB_FAILED, POLL_FAILED, SUBMIT_FAILED, TIMED_OUT, UNEXPECTED_RESPONSE};

// =============================================================================
// MOCK
// =============================================================================

/// Scripted render service. The last scripted status for a job repeats.
#[derive(Default)]
struct MockRender {
    submits: Mutex<VecDeque<Result<Value, ApiError>>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    status_calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<RenderRequest>>,
}

impl MockRender {
    fn submit_returns(self, response: Result<Value, ApiError>) -> Self {
        self.submits.lock().unwrap().push_back(response);
        self
    }

    fn status_returns(self, job_id: &str, responses: Vec<Result<Value, ApiError>>) -> Self {
        self.statuses.lock().unwrap().insert(job_id.to_owned(), responses.into());
        self
    }

    fn calls_for(&self, job_id: &str) -> usize {
        self.status_calls.lock().unwrap().iter().filter(|id| *id == job_id).count()
    }
}

#[async_trait::async_trait]
impl RenderApi for MockRender {
    async fn submit(&self, request: &RenderRequest) -> Result<Value, ApiError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Request("no scripted submit".into())))
    }

    async fn status(&self, job_id: &str) -> Result<Value, ApiError> {
        self.status_calls.lock().unwrap().push(job_id.to_owned());
        let mut statuses = self.statuses.lock().unwrap();
        let Some(queue) = statuses.get_mut(job_id) else {
            return Err(ApiError::Status { status: 404, body: String::new() });
        };
        if queue.len() > 1 {
            return queue.pop_front().unwrap();
        }
        match queue.front() {
            Some(Ok(body)) => Ok(body.clone()),
            _ => queue.pop_front().unwrap_or_else(|| Err(ApiError::Request("no scripted status".into()))),
        }
    }
}

const INTERVAL: Duration = Duration::from_secs(2);

fn client(mock: MockRender) -> (RenderJobClient, Arc<MockRender>) {
    let mock = Arc::new(mock);
    let client = RenderJobClient::new(mock.clone(), PollConfig { interval_ms: 2000, timeout_secs: 120 });
    (client, mock)
}

fn request() -> RenderRequest {
    RenderRequest { template_id: "tmpl".into(), text_data: Vec::new() }
}

fn running() -> Result<Value, ApiError> {
    Ok(json!({ "status": "running" }))
}

// =============================================================================
// SYNCHRONOUS ANSWERS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn immediate_image_url_succeeds_without_polling() {
    let (mut client, mock) = client(MockRender::default().submit_returns(Ok(json!({ "image_url": "/out.png" }))));

    let state = client.submit(&request()).await.clone();
    assert_eq!(state, RenderState::Succeeded { result_url: "/out.png".into() });
    assert!(!client.is_polling());
    assert_eq!(client.job().unwrap().job_id, None);
    assert_eq!(mock.submitted.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_failure_surfaces_backend_message() {
    let (mut client, mock) =
        client(MockRender::default().submit_returns(Ok(json!({ "status": "failed", "error": "bad font" }))));

    client.submit(&request()).await;
    let failure = client.state().failure().unwrap();
    assert_eq!(failure.message(), "bad font");
    assert_eq!(client.job().unwrap().error_message.as_deref(), Some("bad font"));
    assert!(!client.is_polling());
    assert!(mock.status_calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submit_transport_failure() {
    let (mut client, _) =
        client(MockRender::default().submit_returns(Err(ApiError::Request("connection refused".into()))));
    client.submit(&request()).await;
    assert_eq!(client.state(), &RenderState::Failed(RenderFailure::Submission(SUBMIT_FAILED.into())));
}

#[tokio::test(start_paused = true)]
async fn unrecognized_submit_body() {
    let (mut client, _) = client(MockRender::default().submit_returns(Ok(json!({ "accepted": true }))));
    client.submit(&request()).await;
    assert_eq!(client.state().failure().unwrap().message(), UNEXPECTED_RESPONSE);
}

// =============================================================================
// POLLING
// =============================================================================

#[tokio::test(start_paused = true)]
async fn queued_job_polls_until_success() {
    let (mut client, mock) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "abc" })))
            .status_returns("abc", vec![running(), Ok(json!({ "status": "succeeded", "output_url": "/x.png" }))]),
    );

    let state = client.submit(&request()).await.clone();
    assert_eq!(state, RenderState::Polling { job_id: "abc".into(), status: JobStatus::Pending });
    assert!(client.is_polling());

    let state = client.wait_for_terminal().await.clone();
    assert_eq!(state.result_url(), Some("/x.png"));
    assert!(!client.is_polling());
    assert_eq!(mock.calls_for("abc"), 2);

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(mock.calls_for("abc"), 2, "polling must stop at a terminal status");
}

#[tokio::test(start_paused = true)]
async fn progress_is_visible_through_pump() {
    let (mut client, _) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "task_id": "t1", "status": "Task queued." })))
            .status_returns("t1", vec![Ok(json!({ "status": "STARTED" }))]),
    );

    client.submit(&request()).await;
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    assert_eq!(client.pump(), 1);
    assert_eq!(client.state(), &RenderState::Polling { job_id: "t1".into(), status: JobStatus::Running });
    assert_eq!(client.job().unwrap().status, JobStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn backend_job_failure_without_message_uses_fallback() {
    let (mut client, _) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "abc" })))
            .status_returns("abc", vec![Ok(json!({ "status": "FAILURE" }))]),
    );
    client.submit(&request()).await;
    client.wait_for_terminal().await;
    assert_eq!(client.state(), &RenderState::Failed(RenderFailure::Job(JOB_FAILED.into())));
}

#[tokio::test(start_paused = true)]
async fn status_check_failure_stops_polling() {
    let (mut client, mock) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "abc" })))
            .status_returns("abc", vec![running(), Err(ApiError::Request("reset".into()))]),
    );
    client.submit(&request()).await;
    client.wait_for_terminal().await;
    assert_eq!(client.state().failure().unwrap().message(), POLL_FAILED);

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(mock.calls_for("abc"), 2, "a failed status check is not retried");
}

#[tokio::test(start_paused = true)]
async fn success_without_result_reference_is_unexpected() {
    let (mut client, _) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "abc" })))
            .status_returns("abc", vec![Ok(json!({ "status": "completed" }))]),
    );
    client.submit(&request()).await;
    client.wait_for_terminal().await;
    assert_eq!(client.state().failure().unwrap().message(), UNEXPECTED_RESPONSE);
}

#[tokio::test(start_paused = true)]
async fn unknown_status_keeps_polling() {
    let (mut client, mock) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "abc" })))
            .status_returns(
                "abc",
                vec![Ok(json!({ "status": "warming_up" })), Ok(json!({ "status": "done", "result": "/r.png" }))],
            ),
    );
    client.submit(&request()).await;
    assert_eq!(client.wait_for_terminal().await.result_url(), Some("/r.png"));
    assert_eq!(mock.calls_for("abc"), 2);
}

#[tokio::test(start_paused = true)]
async fn poll_times_out() {
    let mock = Arc::new(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "slow" })))
            .status_returns("slow", vec![running()]),
    );
    let mut client = RenderJobClient::new(mock.clone(), PollConfig { interval_ms: 1000, timeout_secs: 5 });

    client.submit(&request()).await;
    client.wait_for_terminal().await;
    assert_eq!(client.state(), &RenderState::Failed(RenderFailure::TimedOut(TIMED_OUT.into())));
    assert!(mock.calls_for("slow") <= 5);
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn second_submit_supersedes_first_poll() {
    let (mut client, mock) = client(
        MockRender::default()
            .submit_returns(Ok(json!({ "job_id": "a" })))
            .submit_returns(Ok(json!({ "job_id": "b" })))
            .status_returns("a", vec![running()])
            .status_returns("b", vec![running(), Ok(json!({ "status": "succeeded", "output_url": "/b.png" }))]),
    );

    client.submit(&request()).await;
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    let first_generation = client.generation();
    assert_eq!(mock.calls_for("a"), 1);

    client.submit(&request()).await;
    // A result for the first job that was already in flight.
    client
        .updates_tx
        .send(JobUpdate { generation: first_generation, event: PollEvent::Finished(Ok("/a.png".into())) })
        .unwrap();

    assert_eq!(client.wait_for_terminal().await.result_url(), Some("/b.png"));

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(client.pump(), 0);
    assert_eq!(client.state().result_url(), Some("/b.png"));
    assert_eq!(mock.calls_for("a"), 1, "the first poll must stop when the second job is submitted");
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_late_updates() {
    let (mut client, mock) = client(
        MockRender::default().submit_returns(Ok(json!({ "job_id": "abc" }))).status_returns("abc", vec![running()]),
    );
    client.submit(&request()).await;
    let generation = client.generation();

    client.cancel();
    assert_eq!(client.state(), &RenderState::Idle);
    assert!(!client.is_polling());

    client.updates_tx.send(JobUpdate { generation, event: PollEvent::Finished(Ok("/late.png".into())) }).unwrap();
    assert_eq!(client.pump(), 0);
    assert_eq!(client.state(), &RenderState::Idle);

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(mock.calls_for("abc"), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_success_keeps_result() {
    let (mut client, _) = client(MockRender::default().submit_returns(Ok(json!({ "image_url": "/done.png" }))));
    client.submit(&request()).await;
    client.cancel();
    assert_eq!(client.state().result_url(), Some("/done.png"));
}

#[tokio::test(start_paused = true)]
async fn drop_aborts_the_poll() {
    let (mut client, mock) = client(
        MockRender::default().submit_returns(Ok(json!({ "job_id": "abc" }))).status_returns("abc", vec![running()]),
    );
    client.submit(&request()).await;
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    assert_eq!(mock.calls_for("abc"), 1);

    drop(client);
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(mock.calls_for("abc"), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_without_a_job_returns_immediately() {
    let (mut client, _) = client(MockRender::default());
    assert_eq!(client.wait_for_terminal().await, &RenderState::Idle);
}
