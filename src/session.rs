//! Editor session: one editor, its template, and its render submissions.
//!
//! The session owns everything a single editing page needs. There is no
//! process-wide state; two sessions never share blocks or jobs.
//!
//! A failed template load leaves the session without an editor
//! ([`EditorSession::engine`] is `None`) and the error in
//! [`EditorSession::load_error`]. A failed background only records a warning.
//! Tearing down cancels any poll and drops the editor, so nothing that arrives
//! afterwards can touch it.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use canvas::doc::BlockId;
use canvas::engine::{Action, EditorConfig, EngineCore};
use canvas::geom::{Point, Size};
use canvas::input::GestureEvent;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ErrorCode, LoadError};
use crate::net::api::{RenderApi, TemplateApi};
use crate::net::types::RenderRequest;
use crate::render_job::{RenderJobClient, RenderState};
use crate::template::TemplateLoader;

pub struct EditorSession {
    config: ClientConfig,
    editor_config: EditorConfig,
    loader: TemplateLoader,
    renderer: RenderJobClient,
    template_id: String,
    template_name: String,
    engine: Option<EngineCore>,
    load_error: Option<LoadError>,
    background_warning: Option<LoadError>,
}

impl EditorSession {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        editor_config: EditorConfig,
        templates: Arc<dyn TemplateApi>,
        render: Arc<dyn RenderApi>,
    ) -> Self {
        let loader = TemplateLoader::new(templates, &config.asset_base_url);
        let renderer = RenderJobClient::new(render, config.poll);
        Self {
            config,
            editor_config,
            loader,
            renderer,
            template_id: String::new(),
            template_name: String::new(),
            engine: None,
            load_error: None,
            background_warning: None,
        }
    }

    /// Load `template_id` and seed a fresh editor with it, replacing any
    /// blocks from a previous template. A pending render is cancelled.
    ///
    /// # Errors
    ///
    /// Returns the load error (also kept in [`Self::load_error`]) when the
    /// template cannot be fetched or decoded. No editor is available then.
    pub async fn open(&mut self, template_id: &str) -> Result<&EngineCore, &LoadError> {
        self.renderer.cancel();
        self.background_warning = None;

        let loaded = match self.loader.load(template_id).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(template_id, error = %e, code = e.error_code(), "template load failed");
                self.engine = None;
                self.template_id.clear();
                self.template_name.clear();
                return Err(&*self.load_error.insert(e));
            }
        };

        let mut engine = self.engine.take().unwrap_or_else(|| EngineCore::new(self.editor_config));
        let (ids, ticket) = engine.load_template(loaded.seeds, loaded.background_url.clone());
        info!(template_id = %loaded.template_id, block_count = ids.len(), "editor opened");

        if let Some(url) = loaded.background_url.as_deref() {
            match self.loader.fetch_background(url).await {
                Ok((width, height)) => {
                    engine.background_loaded(ticket, Size::new(f64::from(width), f64::from(height)));
                }
                Err(e) => {
                    warn!(url, error = %e, "background unavailable, editing without it");
                    engine.background_failed(ticket, &e.to_string());
                    self.background_warning = Some(e);
                }
            }
        }

        self.template_id = loaded.template_id;
        self.template_name = loaded.name;
        self.load_error = None;
        Ok(&*self.engine.insert(engine))
    }

    #[must_use]
    pub fn engine(&self) -> Option<&EngineCore> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut EngineCore> {
        self.engine.as_mut()
    }

    /// Replace a block's text as a form edit would, leaving the selection
    /// alone. Empty for an unknown block or when no editor is open.
    pub fn set_text(&mut self, id: &str, text: &str) -> Vec<Action> {
        self.engine.as_mut().map(|engine| engine.set_text(id, text)).unwrap_or_default()
    }

    /// Drag a block so its top-left lands at `to`, clamped to the canvas.
    /// Returns the block's final position.
    pub fn move_block(&mut self, id: &str, to: Point) -> Option<Point> {
        let engine = self.engine.as_mut()?;
        let from = engine.block(id)?.position();
        let (dx, dy) = to.delta_from(from);
        let id: BlockId = id.to_owned();
        engine.apply_gesture(GestureEvent::MoveStart { id: id.clone(), at: from });
        engine.apply_gesture(GestureEvent::MoveDelta { dx, dy });
        engine.apply_gesture(GestureEvent::GestureEnd);
        engine.block(&id).map(canvas::doc::TextBlock::position)
    }

    /// Submit the current blocks for rendering. Without an open editor this
    /// does nothing and returns the unchanged state.
    pub async fn submit_render(&mut self) -> &RenderState {
        let Some(engine) = self.engine.as_ref() else {
            warn!("render requested without an open template");
            return self.renderer.state();
        };
        let request = RenderRequest::from_blocks(&self.template_id, engine.doc());
        self.renderer.submit(&request).await
    }

    /// Apply any poll results that have arrived.
    pub fn pump(&mut self) -> usize {
        self.renderer.pump()
    }

    /// Wait for the current render to finish.
    pub async fn wait_for_render(&mut self) -> &RenderState {
        self.renderer.wait_for_terminal().await
    }

    #[must_use]
    pub fn render_state(&self) -> &RenderState {
        self.renderer.state()
    }

    /// Result URL of the last successful render, resolved against the asset origin.
    #[must_use]
    pub fn result_url(&self) -> Option<String> {
        self.renderer.state().result_url().map(|url| self.config.resolve_asset(url))
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }

    #[must_use]
    pub fn background_warning(&self) -> Option<&LoadError> {
        self.background_warning.as_ref()
    }

    #[must_use]
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    #[must_use]
    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Close the editor: stop polling and drop the scene.
    pub fn teardown(&mut self) {
        self.renderer.cancel();
        if self.engine.take().is_some() {
            info!(template_id = %self.template_id, "editor closed");
        }
    }
}
