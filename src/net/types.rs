//! Wire types for the template and render services.
//!
//! Template descriptors are decoded with serde, tolerating missing optional
//! fields. Render responses vary by backend, so they are read field by field
//! from a `serde_json::Value`.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use canvas::consts::MIN_FONT_SIZE;
use canvas::doc::{BlockSeed, BlockStore, TextAlign, TextBlock};
use canvas::geom::clamp_font_size;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// TEMPLATE
// =============================================================================

/// `GET /templates/{id}` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub text_blocks: Vec<TemplateBlockDef>,
}

impl TemplateDescriptor {
    /// Block seeds in template order.
    #[must_use]
    pub fn seeds(&self) -> Vec<BlockSeed> {
        self.text_blocks.iter().map(TemplateBlockDef::to_seed).collect()
    }
}

/// One text region in a template. Only the geometry is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateBlockDef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub default_text: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub font_path: Option<String>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub max_width: Option<f64>,
    #[serde(default)]
    pub text_align: Option<String>,
}

impl TemplateBlockDef {
    #[must_use]
    pub fn to_seed(&self) -> BlockSeed {
        BlockSeed {
            title: self.title.clone(),
            kind: self.kind.clone(),
            text: self.default_text.clone().unwrap_or_default(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            max_width: self.max_width.filter(|mw| *mw > 0.0),
            font_size: clamp_font_size(self.font_size, MIN_FONT_SIZE),
            color: self
                .color
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "#000000".to_owned()),
            font_family: self.font_path.clone().unwrap_or_default(),
            bold: self.bold.unwrap_or(false),
            italic: self.italic.unwrap_or(false),
            text_align: parse_align(self.text_align.as_deref()),
        }
    }
}

fn parse_align(raw: Option<&str>) -> TextAlign {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("center" | "centre") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        _ => TextAlign::Left,
    }
}

// =============================================================================
// RENDER REQUEST
// =============================================================================

/// `POST /render/generate-image` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub template_id: String,
    pub text_data: Vec<TextData>,
}

/// One block as the renderer expects it. Geometry is whole pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextData {
    pub title: String,
    pub user_text: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub font_size: u32,
    pub color: String,
    /// `null` when the block uses the system default font.
    pub font_path: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub max_width: i64,
}

impl RenderRequest {
    /// Snapshot every block in the store, in stable id order.
    #[must_use]
    pub fn from_blocks(template_id: &str, doc: &BlockStore) -> Self {
        Self {
            template_id: template_id.to_owned(),
            text_data: doc.sorted_blocks().into_iter().map(TextData::from_block).collect(),
        }
    }
}

impl TextData {
    #[must_use]
    pub fn from_block(block: &TextBlock) -> Self {
        let max_width = if block.max_width > 0.0 { block.max_width } else { block.width };
        Self {
            title: block.id.clone(),
            user_text: block.text.clone(),
            x: px(block.x),
            y: px(block.y),
            width: px(block.width),
            height: px(block.height),
            font_size: block.font_size,
            color: block.color.clone(),
            font_path: Some(block.font_family.clone()).filter(|f| !f.trim().is_empty()),
            bold: block.bold,
            italic: block.italic,
            max_width: px(max_width),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn px(value: f64) -> i64 {
    value.round() as i64
}

// =============================================================================
// JOB STATUS
// =============================================================================

/// Lifecycle of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Parse a status string, accepting the synonyms different queue backends use.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "received" => Some(Self::Pending),
            "running" | "started" | "processing" | "in_progress" | "retry" => Some(Self::Running),
            "succeeded" | "success" | "completed" | "done" | "finished" => Some(Self::Succeeded),
            "failed" | "failure" | "error" | "revoked" | "cancelled" => Some(Self::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// One submission as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// `None` when the backend answered synchronously.
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
}

/// How the backend answered a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The result is ready.
    Immediate { result_url: String },
    /// The job was queued; poll with this id.
    Queued { job_id: String },
    /// The backend rejected the job outright.
    Failed { error: Option<String> },
    Unexpected,
}

/// `GET /render/status/{id}` response, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// `None` when the status string is missing or unknown.
    pub status: Option<JobStatus>,
    pub raw_status: Option<String>,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

/// Interpret a submit response body.
#[must_use]
pub fn parse_submit_response(body: &Value) -> SubmitOutcome {
    let status = str_field(body, "status").and_then(JobStatus::parse);
    if status == Some(JobStatus::Failed) {
        return SubmitOutcome::Failed { error: error_message(body) };
    }
    if let Some(url) = str_field(body, "image_url") {
        return SubmitOutcome::Immediate { result_url: url.to_owned() };
    }
    if status == Some(JobStatus::Succeeded) {
        if let Some(url) = result_url(body) {
            return SubmitOutcome::Immediate { result_url: url };
        }
    }
    match id_field(body, "job_id").or_else(|| id_field(body, "task_id")) {
        Some(job_id) => SubmitOutcome::Queued { job_id },
        None => SubmitOutcome::Unexpected,
    }
}

/// Interpret a status response body.
#[must_use]
pub fn parse_status(body: &Value) -> StatusReport {
    let raw_status = str_field(body, "status").map(str::to_owned);
    StatusReport {
        status: raw_status.as_deref().and_then(JobStatus::parse),
        raw_status,
        result_url: result_url(body),
        error: error_message(body),
    }
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Job ids are opaque; some backends send them as numbers.
fn id_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn result_url(body: &Value) -> Option<String> {
    let direct = str_field(body, "output_url").or_else(|| str_field(body, "image_url"));
    let nested = || match body.get("result")? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
        obj @ Value::Object(_) => str_field(obj, "output_url").or_else(|| str_field(obj, "image_url")),
        _ => None,
    };
    direct.or_else(nested).map(str::to_owned)
}

fn error_message(body: &Value) -> Option<String> {
    str_field(body, "error")
        .or_else(|| str_field(body, "message"))
        .or_else(|| body.get("result").and_then(|r| str_field(r, "error")))
        .map(str::to_owned)
}
