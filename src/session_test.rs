#![allow(clippy::float_cmp)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use canvas::input::GestureEvent;
use serde_json::{Value, json};

use super::*;
use crate::error::ApiError;

// =============================================================================
// MOCK
// =============================================================================

/// Template and render services in one scripted double.
#[derive(Default)]
struct MockBackend {
    templates: Mutex<VecDeque<Result<Value, ApiError>>>,
    asset: Mutex<Option<Vec<u8>>>,
    submits: Mutex<VecDeque<Result<Value, ApiError>>>,
    statuses: Mutex<VecDeque<Value>>,
    submitted: Mutex<Vec<RenderRequest>>,
    status_calls: Mutex<usize>,
}

impl MockBackend {
    fn template(self, body: Value) -> Self {
        self.templates.lock().unwrap().push_back(Ok(body));
        self
    }

    fn template_error(self, err: ApiError) -> Self {
        self.templates.lock().unwrap().push_back(Err(err));
        self
    }

    fn asset(self, bytes: Vec<u8>) -> Self {
        *self.asset.lock().unwrap() = Some(bytes);
        self
    }

    fn submit_returns(self, body: Value) -> Self {
        self.submits.lock().unwrap().push_back(Ok(body));
        self
    }

    fn statuses(self, bodies: Vec<Value>) -> Self {
        self.statuses.lock().unwrap().extend(bodies);
        self
    }
}

#[async_trait::async_trait]
impl TemplateApi for MockBackend {
    async fn fetch_template(&self, _template_id: &str) -> Result<Value, ApiError> {
        self.templates.lock().unwrap().pop_front().unwrap_or_else(|| Err(ApiError::Request("unscripted".into())))
    }

    async fn fetch_asset(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
        self.asset.lock().unwrap().clone().ok_or(ApiError::Status { status: 404, body: String::new() })
    }
}

#[async_trait::async_trait]
impl RenderApi for MockBackend {
    async fn submit(&self, request: &RenderRequest) -> Result<Value, ApiError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.submits.lock().unwrap().pop_front().unwrap_or_else(|| Err(ApiError::Request("unscripted".into())))
    }

    async fn status(&self, _job_id: &str) -> Result<Value, ApiError> {
        *self.status_calls.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            return Ok(statuses.pop_front().unwrap());
        }
        statuses.front().cloned().ok_or(ApiError::Request("unscripted".into()))
    }
}

fn session(mock: MockBackend) -> (EditorSession, Arc<MockBackend>) {
    let mock = Arc::new(mock);
    let config = ClientConfig::default().with_asset_base_url("https://cdn.test").unwrap();
    let session = EditorSession::new(config, EditorConfig::default(), mock.clone(), mock.clone());
    (session, mock)
}

fn name_template() -> Value {
    json!({
        "name": "Classic",
        "text_blocks": [{
            "title": "NAME", "default_text": "Your Name",
            "x": 10, "y": 10, "width": 100, "height": 30, "font_size": 24
        }]
    })
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(width, height).write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

// =============================================================================
// OPEN
// =============================================================================

#[tokio::test]
async fn open_seeds_exactly_the_template_blocks() {
    let (mut session, _) = session(MockBackend::default().template(name_template()));

    let engine = session.open("tmpl-1").await.unwrap();
    let doc = engine.doc();
    assert_eq!(doc.len(), 1);
    let block = doc.get("NAME").unwrap();
    assert_eq!((block.x, block.y, block.width, block.height), (10.0, 10.0, 100.0, 30.0));
    assert_eq!(block.text, "Your Name");

    assert_eq!(session.template_id(), "tmpl-1");
    assert_eq!(session.template_name(), "Classic");
    assert!(session.load_error().is_none());
}

#[tokio::test]
async fn open_failure_shows_no_editor() {
    let (mut session, _) =
        session(MockBackend::default().template_error(ApiError::Status { status: 500, body: String::new() }));

    assert!(session.open("tmpl-1").await.is_err());
    assert!(session.engine().is_none());
    assert!(matches!(session.load_error(), Some(LoadError::Fetch(_))));
}

#[tokio::test]
async fn failed_reload_drops_the_previous_editor() {
    let (mut session, _) = session(
        MockBackend::default()
            .template(name_template())
            .template_error(ApiError::Request("offline".into())),
    );
    session.open("a").await.unwrap();
    assert!(session.open("b").await.is_err());
    assert!(session.engine().is_none());
    assert_eq!(session.template_id(), "");
}

#[tokio::test]
async fn reload_replaces_the_whole_collection() {
    let other = json!({
        "name": "Modern",
        "text_blocks": [
            { "title": "ROLE", "x": 0, "y": 0, "width": 80, "height": 20, "font_size": 12 },
            { "title": "ROLE", "x": 0, "y": 40, "width": 80, "height": 20, "font_size": 12 }
        ]
    });
    let (mut session, _) = session(MockBackend::default().template(name_template()).template(other));

    session.open("a").await.unwrap();
    session.engine_mut().unwrap().add_block("TITLE", None);
    let engine = session.open("b").await.unwrap();
    assert_eq!(engine.doc().ids(), vec!["ROLE".to_owned(), "ROLE-2".to_owned()]);
}

#[tokio::test]
async fn background_is_fitted_to_the_page() {
    let mut template = name_template();
    template["image_path"] = json!("/static/bg.png");
    let (mut session, _) = session(MockBackend::default().template(template).asset(png_bytes(143, 572)));

    let engine = session.open("tmpl").await.unwrap();
    let background = engine.scene().backend().background().unwrap();
    assert_eq!(background.source, "https://cdn.test/static/bg.png");
    assert_eq!((background.natural.width, background.natural.height), (143.0, 572.0));
    assert_eq!(background.placement.height, 1144.0);
    assert_eq!(background.placement.width, 286.0);
    assert!(session.background_warning().is_none());
}

#[tokio::test]
async fn missing_background_is_only_a_warning() {
    let mut template = name_template();
    template["image_path"] = json!("/static/missing.png");
    let (mut session, _) = session(MockBackend::default().template(template));

    let engine = session.open("tmpl").await.unwrap();
    assert!(engine.scene().backend().background().is_none());
    assert!(engine.scene().background_error().is_some());
    assert!(matches!(session.background_warning(), Some(LoadError::Background(_))));
}

// =============================================================================
// EDITING
// =============================================================================

#[tokio::test]
async fn adding_twice_gives_distinct_offset_blocks() {
    let (mut session, _) = session(MockBackend::default().template(name_template()));
    session.open("tmpl").await.unwrap();

    let engine = session.engine_mut().unwrap();
    let (first, _) = engine.add_block("TITLE", None);
    let (second, _) = engine.add_block("TITLE", None);
    assert_ne!(first, second);
    let (a, b) = (engine.block(&first).unwrap().position(), engine.block(&second).unwrap().position());
    assert_ne!((a.x, a.y), (b.x, b.y));
}

#[tokio::test]
async fn drag_past_the_corner_clamps_to_origin() {
    let (mut session, _) = session(MockBackend::default().template(name_template()));
    session.open("tmpl").await.unwrap();

    let end = session.move_block("NAME", Point::new(-50.0, -50.0)).unwrap();
    assert_eq!((end.x, end.y), (0.0, 0.0));
}

#[tokio::test]
async fn form_text_edit_reports_actions_without_selecting() {
    let (mut session, _) = session(MockBackend::default().template(name_template()));
    session.open("tmpl").await.unwrap();

    let actions = session.set_text("NAME", "Grace Hopper");
    assert!(actions.iter().any(|a| matches!(a, Action::BlockUpdated { id, .. } if id == "NAME")));
    assert!(actions.contains(&Action::RenderNeeded));
    let engine = session.engine().unwrap();
    assert_eq!(engine.doc().get("NAME").unwrap().text, "Grace Hopper");
    assert!(engine.selection().is_none());
    assert!(engine.editing().is_none());
}

#[tokio::test]
async fn move_unknown_block_is_none() {
    let (mut session, _) = session(MockBackend::default().template(name_template()));
    session.open("tmpl").await.unwrap();
    assert!(session.move_block("NOPE", Point::new(0.0, 0.0)).is_none());
    assert!(session.set_text("NOPE", "x").is_empty());
}

// =============================================================================
// RENDER
// =============================================================================

#[tokio::test(start_paused = true)]
async fn render_polls_to_a_resolved_result() {
    let (mut session, mock) = session(
        MockBackend::default()
            .template(name_template())
            .submit_returns(json!({ "job_id": "abc" }))
            .statuses(vec![json!({ "status": "running" }), json!({ "status": "succeeded", "output_url": "/x.png" })]),
    );
    session.open("tmpl").await.unwrap();
    assert!(!session.set_text("NAME", "Ada Lovelace").is_empty());
    session.move_block("NAME", Point::new(40.0, 60.0));

    session.submit_render().await;
    let state = session.wait_for_render().await.clone();
    assert_eq!(state.result_url(), Some("/x.png"));
    assert_eq!(session.result_url().as_deref(), Some("https://cdn.test/x.png"));

    let submitted = mock.submitted.lock().unwrap();
    assert_eq!(submitted[0].template_id, "tmpl");
    let data = &submitted[0].text_data[0];
    assert_eq!(data.user_text, "Ada Lovelace");
    assert_eq!((data.x, data.y), (40, 60));
    drop(submitted);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(*mock.status_calls.lock().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_render_leaves_the_editor_usable() {
    let (mut session, _) = session(
        MockBackend::default()
            .template(name_template())
            .submit_returns(json!({ "status": "failed", "error": "bad font" }))
            .submit_returns(json!({ "image_url": "/retry.png" })),
    );
    session.open("tmpl").await.unwrap();

    session.submit_render().await;
    assert_eq!(session.render_state().failure().unwrap().message(), "bad font");

    let engine = session.engine_mut().unwrap();
    let (id, _) = engine.add_block("DETAILS", None);
    engine.apply_gesture(GestureEvent::MoveStart { id: id.clone(), at: Point::new(0.0, 0.0) });
    engine.apply_gesture(GestureEvent::MoveDelta { dx: 5.0, dy: 5.0 });
    engine.apply_gesture(GestureEvent::GestureEnd);
    assert_eq!(engine.doc().len(), 2);

    session.submit_render().await;
    assert_eq!(session.result_url().as_deref(), Some("https://cdn.test/retry.png"));
}

#[tokio::test(start_paused = true)]
async fn render_without_editor_is_a_no_op() {
    let (mut session, mock) = session(MockBackend::default());
    assert_eq!(session.submit_render().await, &RenderState::Idle);
    assert!(mock.submitted.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_polling_and_drops_the_scene() {
    let (mut session, mock) = session(
        MockBackend::default()
            .template(name_template())
            .submit_returns(json!({ "job_id": "abc" }))
            .statuses(vec![json!({ "status": "running" })]),
    );
    session.open("tmpl").await.unwrap();
    session.submit_render().await;

    session.teardown();
    assert!(session.engine().is_none());
    assert_eq!(session.render_state(), &RenderState::Idle);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(session.pump(), 0);
    assert_eq!(*mock.status_calls.lock().unwrap(), 0);
}
