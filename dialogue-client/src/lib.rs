//! Client library for the dialogue text-to-speech production service
//!
//! Provides the project document model, the voice catalog, and the
//! [`DialogueBackend`] trait with two implementations: [`HttpBackend`] for a
//! running service and [`MemoryBackend`] for offline use and tests.

pub mod backend;
pub mod catalog;
pub mod error;
pub mod http;
pub mod memory;
pub mod model;

pub use backend::{DialogueBackend, FieldUpdate, FieldValue};
pub use catalog::{UNKNOWN_VOICE, VoiceCatalog, VoiceDetail, VoiceGroup, VoiceOption};
pub use error::{ApiError, Result};
pub use http::HttpBackend;
pub use memory::{BackendCall, MEMORY_BASE_URL, MemoryBackend, Operation};
pub use model::{
    AgeGroup, Artifact, DialogueLine, Gender, PITCH_RATIO_RANGE, Project, ProjectSummary,
    SPEED_RATIO_RANGE, Speaker, VOLUME_RATIO_RANGE, resolve_audio_url,
};
