//! Editing sessions for dialogue text-to-speech projects
//!
//! A [`Session`] moves through three phases: Input (raw dialogue text),
//! Edit (per-speaker and per-line settings) and Preview (generated audio).
//! It owns the active project, applies field edits optimistically while
//! syncing them to the service, and drives line and project generation.

pub mod browser;
pub mod commands;
pub mod config;
pub mod error;
pub mod frontend;
pub mod generation;
pub mod repl;
pub mod session;
pub mod sync;
pub mod view;

pub use browser::{EMPTY_LISTING, ProjectListing};
pub use config::Config;
pub use error::{EditorError, Result};
pub use frontend::{ConsoleFrontend, Frontend, Notice};
pub use session::{ActiveProject, Flow, Phase, Session};
pub use sync::{FieldPath, LineField, SpeakerField, SyncLedger, SyncReport};
pub use view::{EditorView, PreviewView, Screen};
