//! Canvas editing engine for the resume template editor.
//!
//! This crate owns the interactive page: the authoritative collection of text
//! blocks placed over a template background, the retained scene graph that
//! mirrors it, and the gesture state machine that turns pointer and keyboard
//! input into block mutations. It compiles natively (for tests and the CLI)
//! and to WebAssembly, where [`engine::Engine`] binds it to a browser canvas.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Interaction controller ([`engine::EngineCore`]) and the browser-bound [`engine::Engine`] |
//! | [`doc`] | Block model: text blocks, sparse updates, and the keyed store |
//! | [`scene`] | Scene synchronizer and the swappable [`scene::SceneBackend`] seam |
//! | [`retained`] | In-memory retained scene graph used as the default backend |
//! | [`geom`] | Points, sizes, rectangles, clamping, and display viewport conversion |
//! | [`text`] | Text measurement and word wrapping |
//! | [`input`] | Input event types, gesture events, and the interaction state |
//! | [`hit`] | Hit-testing against block bodies and resize handles |
//! | [`render`] | Paints the retained scene onto a `Canvas2D` context |
//! | [`consts`] | Shared numeric constants (size floors, canvas size, handle slop) |

pub mod consts;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod input;
pub mod render;
pub mod retained;
pub mod scene;
pub mod text;
