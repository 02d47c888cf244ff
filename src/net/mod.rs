//! REST collaborators: wire types, client traits, and the reqwest client.
//!
//! DESIGN
//! ======
//! The template and render services are external. [`api::TemplateApi`] and
//! [`api::RenderApi`] are the seams; [`api::HttpApi`] implements both over
//! reqwest. Response bodies come back as `serde_json::Value` and are
//! interpreted in [`types`], so the tolerant parsing is pure and testable.

pub mod api;
pub mod types;

/// Resolve `reference` against `base` unless it is already absolute.
#[must_use]
pub fn resolve_reference(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("http://") || reference.starts_with("https://") || reference.starts_with("data:") {
        return reference.to_owned();
    }
    format!("{}/{}", base.trim_end_matches('/'), reference.trim_start_matches('/'))
}
