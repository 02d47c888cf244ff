//! Resume builder client core.
//!
//! The canvas editor (block model, scene synchronizer, interaction
//! controller) lives in the [`canvas`] crate. This crate wires it to the
//! REST collaborators:
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `ClientConfig` from environment variables |
//! | [`error`] | Error enums with stable codes |
//! | [`net`] | Wire types, `TemplateApi` / `RenderApi`, and the reqwest client |
//! | [`template`] | Template Loader |
//! | [`render_job`] | Render Job Client: submit and poll |
//! | [`session`] | Editor session that owns one editor and its jobs |

pub mod config;
pub mod error;
pub mod net;
pub mod render_job;
pub mod session;
pub mod template;

pub use canvas;
