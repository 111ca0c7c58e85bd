//! In-memory dialogue service
//!
//! Behaves like the HTTP service closely enough to drive an editing session
//! without a network: projects are stored in memory, analysis splits
//! `Name: text` lines into speakers, and generation fabricates artifact
//! paths. Every call is recorded and any operation can be made to fail,
//! which is what the editor's tests rely on.

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{DialogueBackend, FieldUpdate};
use crate::catalog::VoiceCatalog;
use crate::error::{ApiError, Result};
use crate::model::{AgeGroup, Artifact, DialogueLine, Gender, Project, ProjectSummary, Speaker};

/// Base URL artifacts resolve against
pub const MEMORY_BASE_URL: &str = "memory://dialogue";

/// Speaker name for lines without a `Name:` prefix
const NARRATOR: &str = "Narrator";

static SPEAKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:：]{1,32}?)\s*[:：]\s*(.+)$").unwrap());

/// Backend operations, used to inject failures and filter recorded calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchCatalog,
    Analyze,
    UpdateSpeaker,
    UpdateLine,
    GenerateLine,
    GenerateAll,
    ListProjects,
    LoadProject,
    FetchAudio,
}

/// A call received by the backend, with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    FetchCatalog,
    Analyze {
        text: String,
    },
    UpdateSpeaker {
        project_id: String,
        speaker_id: String,
        body: Value,
    },
    UpdateLine {
        project_id: String,
        line_id: String,
        body: Value,
    },
    GenerateLine {
        project_id: String,
        line_id: String,
    },
    GenerateAll {
        project_id: String,
    },
    ListProjects,
    LoadProject {
        project_id: String,
    },
    FetchAudio {
        url: String,
    },
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            BackendCall::FetchCatalog => Operation::FetchCatalog,
            BackendCall::Analyze { .. } => Operation::Analyze,
            BackendCall::UpdateSpeaker { .. } => Operation::UpdateSpeaker,
            BackendCall::UpdateLine { .. } => Operation::UpdateLine,
            BackendCall::GenerateLine { .. } => Operation::GenerateLine,
            BackendCall::GenerateAll { .. } => Operation::GenerateAll,
            BackendCall::ListProjects => Operation::ListProjects,
            BackendCall::LoadProject { .. } => Operation::LoadProject,
            BackendCall::FetchAudio { .. } => Operation::FetchAudio,
        }
    }
}

struct StoredProject {
    project: Project,
    /// Logical clock value of the last write, newest listed first
    touched: u64,
}

#[derive(Default)]
struct MemoryState {
    projects: IndexMap<String, StoredProject>,
    next_id: u64,
    clock: u64,
    calls: Vec<BackendCall>,
    failures: HashSet<Operation>,
    audio: HashMap<String, Vec<u8>>,
}

/// In-memory backend. Clones share the same store.
#[derive(Clone)]
pub struct MemoryBackend {
    catalog: VoiceCatalog,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(VoiceCatalog::sample())
    }
}

impl MemoryBackend {
    pub fn new(catalog: VoiceCatalog) -> Self {
        Self {
            catalog,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later call of `operation` fail with a 500
    pub fn fail(&self, operation: Operation) {
        self.lock().failures.insert(operation);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Calls of one operation, in order
    pub fn calls_of(&self, operation: Operation) -> Vec<BackendCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// The service's copy of a project
    pub fn stored_project(&self, project_id: &str) -> Option<Project> {
        self.lock()
            .projects
            .get(project_id)
            .map(|stored| stored.project.clone())
    }

    /// Store a project directly and return its new id
    pub fn insert_project(&self, mut project: Project) -> String {
        let mut state = self.lock();
        let id = next_project_id(&mut state);
        project.id = None;
        state.clock += 1;
        let touched = state.clock;
        state
            .projects
            .insert(id.clone(), StoredProject { project, touched });
        id
    }

    /// Record a call, then fail it if its operation is set to fail
    fn begin(&self, call: BackendCall) -> Result<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push(call);

        if state.failures.contains(&operation) {
            return Err(ApiError::Status {
                status_code: 500,
                message: format!("injected failure for {:?}", operation),
            });
        }
        Ok(state)
    }
}

fn next_project_id(state: &mut MemoryState) -> String {
    state.next_id += 1;
    format!("project-{}", state.next_id)
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

fn touch(state: &mut MemoryState, project_id: &str) {
    state.clock += 1;
    let clock = state.clock;
    if let Some(stored) = state.projects.get_mut(project_id) {
        stored.touched = clock;
        stored.project.updated_at = Some(now());
    }
}

fn stored_mut<'a>(state: &'a mut MemoryState, project_id: &str) -> Result<&'a mut Project> {
    state
        .projects
        .get_mut(project_id)
        .map(|stored| &mut stored.project)
        .ok_or_else(|| ApiError::not_found("project", project_id))
}

/// Split `Name: text` lines into speakers and dialogue lines
fn analyze_text(text: &str, catalog: &VoiceCatalog) -> Project {
    let voices: Vec<&String> = catalog.voices_by_category.values().flatten().collect();
    let mut speakers: Vec<Speaker> = Vec::new();
    let mut dialogues: Vec<DialogueLine> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (name, content) = match SPEAKER_LINE.captures(line) {
            Some(caps) => (caps[1].trim().to_string(), caps[2].trim().to_string()),
            None => (NARRATOR.to_string(), line.to_string()),
        };

        let speaker_id = match speakers.iter().find(|s| s.name == name) {
            Some(speaker) => speaker.id.clone(),
            None => {
                let index = speakers.len();
                let voice_type = if voices.is_empty() {
                    "default".to_string()
                } else {
                    voices[index % voices.len()].clone()
                };
                let id = format!("speaker_{}", index + 1);
                speakers.push(Speaker {
                    id: id.clone(),
                    name,
                    gender: Gender::Unknown,
                    age_group: AgeGroup::Adult,
                    voice_type,
                });
                id
            }
        };

        let mut dialogue = DialogueLine::new(
            &format!("line_{}", dialogues.len()),
            &speaker_id,
            &content,
        );
        dialogue.context = dialogues.last().map(|previous| previous.text.clone());
        dialogues.push(dialogue);
    }

    let timestamp = now();
    Project {
        id: None,
        version: "1.0".to_string(),
        title: format!("Dialogue_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")),
        original_text: text.to_string(),
        speakers,
        dialogues,
        output_audio: None,
        created_at: Some(timestamp.clone()),
        updated_at: Some(timestamp),
    }
}

/// Merge a one-field body into the item with `id` in `collection`,
/// the way the service merges update bodies into its stored document
fn merge_update(
    project: &mut Project,
    collection: &str,
    kind: &'static str,
    id: &str,
    body: &Value,
) -> Result<()> {
    let mut document =
        serde_json::to_value(&*project).map_err(|e| ApiError::Decode(e.to_string()))?;

    {
        let item = document
            .get_mut(collection)
            .and_then(Value::as_array_mut)
            .and_then(|items| {
                items
                    .iter_mut()
                    .find(|item| item.get("id").and_then(Value::as_str) == Some(id))
            })
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ApiError::not_found(kind, id))?;

        if let Some(fields) = body.as_object() {
            for (key, value) in fields {
                item.insert(key.clone(), value.clone());
            }
        }
    }

    *project = serde_json::from_value(document).map_err(|e| ApiError::Status {
        status_code: 422,
        message: e.to_string(),
    })?;
    Ok(())
}

fn fake_wav(name: &str) -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(name.as_bytes());
    bytes
}

#[async_trait]
impl DialogueBackend for MemoryBackend {
    async fn fetch_catalog(&self) -> Result<VoiceCatalog> {
        let _state = self.begin(BackendCall::FetchCatalog)?;
        Ok(self.catalog.clone())
    }

    async fn analyze(&self, text: &str) -> Result<Project> {
        let mut state = self.begin(BackendCall::Analyze {
            text: text.to_string(),
        })?;

        if text.trim().is_empty() {
            return Err(ApiError::Status {
                status_code: 400,
                message: "text must not be empty".to_string(),
            });
        }

        let project = analyze_text(text, &self.catalog);
        let id = next_project_id(&mut state);
        state.clock += 1;
        let touched = state.clock;
        state.projects.insert(
            id.clone(),
            StoredProject {
                project: project.clone(),
                touched,
            },
        );

        Ok(Project {
            id: Some(id),
            ..project
        })
    }

    async fn update_speaker(
        &self,
        project_id: &str,
        speaker_id: &str,
        update: &FieldUpdate,
    ) -> Result<()> {
        let body = update.to_body();
        let mut state = self.begin(BackendCall::UpdateSpeaker {
            project_id: project_id.to_string(),
            speaker_id: speaker_id.to_string(),
            body: body.clone(),
        })?;

        let project = stored_mut(&mut state, project_id)?;
        merge_update(project, "speakers", "speaker", speaker_id, &body)?;
        touch(&mut state, project_id);
        Ok(())
    }

    async fn update_line(
        &self,
        project_id: &str,
        line_id: &str,
        update: &FieldUpdate,
    ) -> Result<()> {
        let body = update.to_body();
        let mut state = self.begin(BackendCall::UpdateLine {
            project_id: project_id.to_string(),
            line_id: line_id.to_string(),
            body: body.clone(),
        })?;

        let project = stored_mut(&mut state, project_id)?;
        merge_update(project, "dialogues", "line", line_id, &body)?;
        touch(&mut state, project_id);
        Ok(())
    }

    async fn generate_line(&self, project_id: &str, line_id: &str) -> Result<Artifact> {
        let mut state = self.begin(BackendCall::GenerateLine {
            project_id: project_id.to_string(),
            line_id: line_id.to_string(),
        })?;

        let project = stored_mut(&mut state, project_id)?;
        let speaker_id = project
            .line(line_id)
            .map(|line| line.speaker_id.clone())
            .ok_or_else(|| ApiError::not_found("line", line_id))?;
        if project.speaker(&speaker_id).is_none() {
            return Err(ApiError::Status {
                status_code: 400,
                message: format!("no voice for speaker {}", speaker_id),
            });
        }

        let filename = format!("{}_{}.wav", project_id, line_id);
        if let Some(line) = project.line_mut(line_id) {
            line.audio_file = Some(format!("dialogue_output/{}", filename));
        }

        let audio_url = format!("/audio/{}", filename);
        state.audio.insert(audio_url.clone(), fake_wav(&filename));
        touch(&mut state, project_id);

        Ok(Artifact {
            audio_url,
            output_audio: None,
        })
    }

    async fn generate_all(&self, project_id: &str) -> Result<Artifact> {
        let mut state = self.begin(BackendCall::GenerateAll {
            project_id: project_id.to_string(),
        })?;

        let project = stored_mut(&mut state, project_id)?;
        if project.dialogues.is_empty() {
            return Err(ApiError::Status {
                status_code: 500,
                message: "no audio generated".to_string(),
            });
        }

        let filename = format!("{}_final.wav", project_id);
        project.output_audio = Some(format!("dialogue_output/{}", filename));

        let audio_url = format!("/audio/{}", filename);
        state.audio.insert(audio_url.clone(), fake_wav(&filename));
        touch(&mut state, project_id);

        Ok(Artifact {
            audio_url,
            output_audio: None,
        })
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let state = self.begin(BackendCall::ListProjects)?;

        let mut stored: Vec<(&String, &StoredProject)> = state.projects.iter().collect();
        stored.sort_by(|a, b| b.1.touched.cmp(&a.1.touched));

        Ok(stored
            .into_iter()
            .map(|(id, stored)| ProjectSummary {
                id: id.clone(),
                title: stored.project.title.clone(),
                created_at: stored.project.created_at.clone(),
                updated_at: stored.project.updated_at.clone(),
            })
            .collect())
    }

    async fn load_project(&self, project_id: &str) -> Result<Project> {
        let state = self.begin(BackendCall::LoadProject {
            project_id: project_id.to_string(),
        })?;

        let stored = state
            .projects
            .get(project_id)
            .ok_or_else(|| ApiError::not_found("project", project_id))?;

        Ok(Project {
            id: Some(project_id.to_string()),
            ..stored.project.clone()
        })
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        let state = self.begin(BackendCall::FetchAudio {
            url: url.to_string(),
        })?;

        let path = url.strip_prefix(MEMORY_BASE_URL).unwrap_or(url);
        state
            .audio
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::not_found("audio", path))
    }

    fn base_url(&self) -> &str {
        MEMORY_BASE_URL
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
