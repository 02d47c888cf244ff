//! Template Loader: fetches a template definition and its background.
//!
//! A fetch or decode failure is a [`LoadError`] and the caller shows no
//! editor. The background is fetched separately so that a missing image only
//! costs the picture, not the session.

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;

use std::sync::Arc;

use canvas::doc::BlockSeed;
use tracing::info;

use crate::error::LoadError;
use crate::net::api::TemplateApi;
use crate::net::resolve_reference;
use crate::net::types::TemplateDescriptor;

/// A fetched template, ready to seed the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTemplate {
    pub template_id: String,
    pub name: String,
    /// Absolute background image URL, if the template has one.
    pub background_url: Option<String>,
    pub seeds: Vec<BlockSeed>,
}

pub struct TemplateLoader {
    api: Arc<dyn TemplateApi>,
    asset_base_url: String,
}

impl TemplateLoader {
    #[must_use]
    pub fn new(api: Arc<dyn TemplateApi>, asset_base_url: &str) -> Self {
        Self { api, asset_base_url: asset_base_url.trim_end_matches('/').to_owned() }
    }

    /// Fetch and decode the template `template_id`.
    ///
    /// # Errors
    ///
    /// [`LoadError::Fetch`] when the request fails, [`LoadError::Malformed`]
    /// when the id is empty or the body is not a template descriptor.
    pub async fn load(&self, template_id: &str) -> Result<LoadedTemplate, LoadError> {
        let template_id = template_id.trim();
        if template_id.is_empty() {
            return Err(LoadError::Malformed("empty template id".into()));
        }

        let body = self.api.fetch_template(template_id).await?;
        let descriptor: TemplateDescriptor =
            serde_json::from_value(body).map_err(|e| LoadError::Malformed(e.to_string()))?;

        let background_url = descriptor
            .image_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| resolve_reference(&self.asset_base_url, p));
        let seeds = descriptor.seeds();
        info!(template_id, block_count = seeds.len(), has_background = background_url.is_some(), "template loaded");

        Ok(LoadedTemplate { template_id: template_id.to_owned(), name: descriptor.name, background_url, seeds })
    }

    /// Fetch a background image and return its natural size in pixels.
    ///
    /// # Errors
    ///
    /// [`LoadError::Background`] when the image cannot be fetched or decoded.
    pub async fn fetch_background(&self, image_url: &str) -> Result<(u32, u32), LoadError> {
        let bytes = self
            .api
            .fetch_asset(image_url)
            .await
            .map_err(|e| LoadError::Background(e.to_string()))?;
        decode_dimensions(&bytes)
    }
}

/// Natural size of an encoded PNG or JPEG.
///
/// # Errors
///
/// [`LoadError::Background`] when the bytes are not a decodable image.
pub fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32), LoadError> {
    let image = image::load_from_memory(bytes).map_err(|e| LoadError::Background(format!("decode failed: {e}")))?;
    Ok((image.width(), image.height()))
}
