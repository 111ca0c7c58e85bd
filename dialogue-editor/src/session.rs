//! The editing session: phase machine and active project
//!
//! ```text
//!   Input --analyze--> Edit --generate_all / preview_existing--> Preview
//!   Input <--back----- Edit <--back------------------------------ Preview
//!   any --load_project--> Edit          any --new_project--> Input
//! ```
//!
//! Every operation takes `&mut self` and runs to completion, so at most one
//! mutating operation touches the active project at a time and field
//! updates reach the service in the order they were issued.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dialogue_client::{ApiError, Artifact, DialogueBackend, Project, VoiceCatalog};

use crate::browser::{EMPTY_LISTING, ProjectListing};
use crate::error::{EditorError, Result};
use crate::frontend::{BusyGuard, Frontend, Notice};
use crate::generation;
use crate::sync::{
    self, FieldPath, LineEdit, LineField, SpeakerEdit, SpeakerField, SyncLedger, SyncReport,
};
use crate::view::{EditorView, PreviewView, Screen};

pub const NEW_PROJECT_PROMPT: &str =
    "The current project has not been saved. Start a new project anyway?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Input,
    Edit,
    Preview,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Input => "input",
            Phase::Edit => "edit",
            Phase::Preview => "preview",
        };
        write!(f, "{}", name)
    }
}

/// Result of an operation the user may decline
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<T> {
    Completed(T),
    /// The user said no; nothing changed
    Declined,
}

impl<T> Flow<T> {
    pub fn is_declined(&self) -> bool {
        matches!(self, Flow::Declined)
    }
}

/// The project being edited, its service id and its unsynced fields
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveProject {
    pub id: String,
    pub project: Project,
    pub ledger: SyncLedger,
}

impl ActiveProject {
    /// Wrap a project returned by the service, which must carry its id
    pub fn new(project: Project) -> Result<Self> {
        let id = project
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Decode("project has no id".to_string()))?;

        Ok(Self {
            id,
            project,
            ledger: SyncLedger::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Input,
    Edit,
    Preview(PreviewView),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Input => Phase::Input,
            State::Edit => Phase::Edit,
            State::Preview(_) => Phase::Preview,
        }
    }
}

/// One user's editing session against a dialogue service
pub struct Session {
    state: State,
    active: Option<ActiveProject>,
    catalog: VoiceCatalog,
    locale: String,
    backend: Arc<dyn DialogueBackend>,
    frontend: Arc<dyn Frontend>,
}

impl Session {
    /// Fetch the voice catalog and start in the Input phase
    pub async fn start(
        backend: Arc<dyn DialogueBackend>,
        frontend: Arc<dyn Frontend>,
        locale: &str,
    ) -> Result<Self> {
        let catalog = {
            let _busy = BusyGuard::show(&frontend, "Loading voice catalog...");
            backend.fetch_catalog().await
        };
        let catalog = match catalog {
            Ok(catalog) => catalog,
            Err(e) => {
                frontend.notify(Notice::Error(format!("Failed to load configuration: {}", e)));
                return Err(e.into());
            }
        };

        log::info!(
            "Loaded {} voices from the {} backend",
            catalog.voice_count(),
            backend.name()
        );

        let session = Self {
            state: State::Input,
            active: None,
            catalog,
            locale: locale.to_string(),
            backend,
            frontend,
        };
        session.render();
        Ok(session)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn active(&self) -> Option<&ActiveProject> {
        self.active.as_ref()
    }

    pub fn project(&self) -> Option<&Project> {
        self.active.as_ref().map(|active| &active.project)
    }

    pub fn project_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.id.as_str())
    }

    /// Playback targets, while in Preview
    pub fn preview(&self) -> Option<&PreviewView> {
        match &self.state {
            State::Preview(view) => Some(view),
            _ => None,
        }
    }

    /// Editor view of the active project, derived fresh from the model
    pub fn editor_view(&self) -> Option<EditorView> {
        self.active.as_ref().map(|active| {
            EditorView::derive(
                &active.id,
                &active.project,
                &self.catalog,
                &self.locale,
                &active.ledger,
            )
        })
    }

    pub fn screen(&self) -> Screen {
        match &self.state {
            State::Input => Screen::Input,
            State::Edit => self.editor_view().map_or(Screen::Input, Screen::Edit),
            State::Preview(view) => Screen::Preview(view.clone()),
        }
    }

    pub fn render(&self) {
        self.frontend.render(&self.screen());
    }

    fn transition(&mut self, state: State) {
        log::info!("{} -> {}", self.state.phase(), state.phase());
        self.state = state;
        self.render();
    }

    fn require_phase(&self, expected: Phase, action: &'static str) -> Result<()> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(EditorError::InvalidTransition { phase, action })
        }
    }

    /// Surface a failure to the user, then hand it back
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::debug!("Operation failed: {:?}", e);
            self.frontend.notify(Notice::Error(e.to_string()));
        }
        result
    }

    /// Analyze raw dialogue text into a new active project.
    ///
    /// Blank text is rejected before any request is made. On failure the
    /// session stays in Input with its previous project, if any.
    pub async fn analyze(&mut self, text: &str) -> Result<()> {
        let result = self.analyze_text(text).await;
        self.report(result)
    }

    async fn analyze_text(&mut self, text: &str) -> Result<()> {
        self.require_phase(Phase::Input, "analyze text")?;

        let text = text.trim();
        if text.is_empty() {
            return Err(EditorError::Validation(
                "Please enter some dialogue text".to_string(),
            ));
        }

        let project = {
            let _busy = BusyGuard::show(&self.frontend, "Analyzing dialogue...");
            self.backend.analyze(text).await?
        };
        let active = ActiveProject::new(project)?;
        log::info!(
            "Analyzed project {}: {} speakers, {} lines",
            active.id,
            active.project.speakers.len(),
            active.project.dialogues.len()
        );

        self.active = Some(active);
        self.transition(State::Edit);
        Ok(())
    }

    /// Preview goes back to Edit, Edit goes back to Input
    pub fn back(&mut self) -> Result<()> {
        let result = match self.phase() {
            Phase::Preview => {
                self.transition(State::Edit);
                Ok(())
            }
            Phase::Edit => {
                self.transition(State::Input);
                Ok(())
            }
            Phase::Input => Err(EditorError::InvalidTransition {
                phase: Phase::Input,
                action: "go back",
            }),
        };
        self.report(result)
    }

    /// Drop the active project and return to Input.
    ///
    /// Asks first when a project is loaded.
    pub fn new_project(&mut self) -> Result<Flow<()>> {
        let result = self.reset();
        self.report(result)
    }

    fn reset(&mut self) -> Result<Flow<()>> {
        if self.active.is_some() && !self.frontend.confirm(NEW_PROJECT_PROMPT)? {
            return Ok(Flow::Declined);
        }

        self.active = None;
        self.transition(State::Input);
        Ok(Flow::Completed(()))
    }

    /// Load a stored project, replacing the active one, and go to Edit
    pub async fn load_project(&mut self, project_id: &str) -> Result<()> {
        let result = self.load(project_id).await;
        self.report(result)
    }

    async fn load(&mut self, project_id: &str) -> Result<()> {
        let project = {
            let _busy = BusyGuard::show(&self.frontend, "Loading project...");
            self.backend.load_project(project_id).await?
        };
        let active = ActiveProject::new(project)?;
        log::info!("Loaded project {} ({})", active.id, active.project.title);

        self.active = Some(active);
        self.transition(State::Edit);
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<ProjectListing> {
        let result = self.fetch_listing().await;
        self.report(result)
    }

    async fn fetch_listing(&self) -> Result<ProjectListing> {
        let _busy = BusyGuard::show(&self.frontend, "Loading projects...");
        let projects = self.backend.list_projects().await?;
        Ok(ProjectListing::new(projects))
    }

    /// List stored projects and load the one the user picks
    pub async fn browse_projects(&mut self) -> Result<Flow<()>> {
        let result = self.browse().await;
        self.report(result)
    }

    async fn browse(&mut self) -> Result<Flow<()>> {
        let listing = self.fetch_listing().await?;
        if listing.is_empty() {
            self.frontend.notify(Notice::Info(EMPTY_LISTING.to_string()));
            return Ok(Flow::Declined);
        }

        let selection = self
            .frontend
            .select(&listing.to_string(), listing.len())?;
        let Some(summary) = selection.and_then(|index| listing.get(index)) else {
            return Ok(Flow::Declined);
        };

        self.load(&summary.id).await?;
        Ok(Flow::Completed(()))
    }

    /// Change one speaker field locally and send it to the service
    pub async fn edit_speaker(
        &mut self,
        speaker_id: &str,
        field: SpeakerField,
        value: &str,
    ) -> Result<SyncReport> {
        let result = self.update_speaker(speaker_id, field, value).await;
        self.report(result)
    }

    async fn update_speaker(
        &mut self,
        speaker_id: &str,
        field: SpeakerField,
        value: &str,
    ) -> Result<SyncReport> {
        self.require_phase(Phase::Edit, "edit a speaker")?;
        let edit = SpeakerEdit::parse(field, value)?;

        let active = self.active.as_mut().ok_or(EditorError::NoActiveProject)?;
        sync::sync_speaker(
            self.backend.as_ref(),
            &self.frontend,
            &self.catalog,
            active,
            speaker_id,
            edit,
        )
        .await
    }

    /// Change one dialogue line field locally and send it to the service
    pub async fn edit_line(
        &mut self,
        line_id: &str,
        field: LineField,
        value: &str,
    ) -> Result<SyncReport> {
        let result = self.update_line(line_id, field, value).await;
        self.report(result)
    }

    async fn update_line(
        &mut self,
        line_id: &str,
        field: LineField,
        value: &str,
    ) -> Result<SyncReport> {
        self.require_phase(Phase::Edit, "edit a line")?;
        let edit = LineEdit::parse(field, value, &self.catalog, &self.locale)?;

        let active = self.active.as_mut().ok_or(EditorError::NoActiveProject)?;
        sync::sync_line(self.backend.as_ref(), &self.frontend, active, line_id, edit).await
    }

    /// Retitle the active project.
    ///
    /// The service has no project-level update, so the title is marked as
    /// unsynced for as long as this project stays loaded.
    pub fn rename_project(&mut self, title: &str) -> Result<()> {
        let result = self.retitle(title);
        self.report(result)
    }

    fn retitle(&mut self, title: &str) -> Result<()> {
        self.require_phase(Phase::Edit, "rename the project")?;

        let title = title.trim();
        if title.is_empty() {
            return Err(EditorError::Validation(
                "Title must not be empty".to_string(),
            ));
        }

        let active = self.active.as_mut().ok_or(EditorError::NoActiveProject)?;
        active.project.title = title.to_string();
        active.ledger.record(FieldPath::Title, false);
        self.frontend.notify(Notice::Info(
            "Title changed locally; the service does not store project titles".to_string(),
        ));
        Ok(())
    }

    /// Regenerate one line's audio; stays in Edit
    pub async fn generate_line(&mut self, line_id: &str) -> Result<Flow<Artifact>> {
        let result = self.regenerate_line(line_id).await;
        self.report(result)
    }

    async fn regenerate_line(&mut self, line_id: &str) -> Result<Flow<Artifact>> {
        self.require_phase(Phase::Edit, "generate a line")?;

        let active = self.active.as_mut().ok_or(EditorError::NoActiveProject)?;
        let flow =
            generation::generate_line(self.backend.as_ref(), &self.frontend, active, line_id)
                .await?;

        if let Flow::Completed(artifact) = &flow {
            let url = dialogue_client::resolve_audio_url(self.backend.base_url(), artifact.reference());
            self.frontend.notify(Notice::Info(format!("Line audio: {}", url)));
        }
        Ok(flow)
    }

    /// Generate the whole project's audio and go to Preview
    pub async fn generate_all(&mut self) -> Result<Flow<()>> {
        let result = self.generate_project().await;
        self.report(result)
    }

    async fn generate_project(&mut self) -> Result<Flow<()>> {
        self.require_phase(Phase::Edit, "generate audio")?;

        let active = self.active.as_mut().ok_or(EditorError::NoActiveProject)?;
        let flow = generation::generate_all(self.backend.as_ref(), &self.frontend, active).await?;

        match flow {
            Flow::Completed(artifact) => {
                let view = PreviewView::from_reference(self.backend.base_url(), &artifact.audio_url);
                self.transition(State::Preview(view));
                Ok(Flow::Completed(()))
            }
            Flow::Declined => Ok(Flow::Declined),
        }
    }

    /// Preview the project's existing whole-project audio without generating
    pub fn preview_existing(&mut self) -> Result<()> {
        let result = self.show_existing();
        self.report(result)
    }

    fn show_existing(&mut self) -> Result<()> {
        self.require_phase(Phase::Edit, "preview audio")?;

        let active = self.active.as_ref().ok_or(EditorError::NoActiveProject)?;
        let reference = active
            .project
            .output_audio
            .as_deref()
            .filter(|audio| !audio.is_empty())
            .ok_or(EditorError::NoGeneratedAudio)?;

        let view = PreviewView::from_reference(self.backend.base_url(), reference);
        self.transition(State::Preview(view));
        self.frontend
            .notify(Notice::Success("Loaded generated audio".to_string()));
        Ok(())
    }

    /// Save the previewed artifact to `target`.
    ///
    /// A directory target gets the artifact's own file name.
    pub async fn download(&self, target: &Path) -> Result<PathBuf> {
        let result = self.save_audio(target).await;
        self.report(result)
    }

    async fn save_audio(&self, target: &Path) -> Result<PathBuf> {
        let preview = match &self.state {
            State::Preview(view) => view,
            _ => {
                return Err(EditorError::InvalidTransition {
                    phase: self.phase(),
                    action: "download audio",
                });
            }
        };

        let destination = if target.is_dir() {
            target.join(&preview.file_name)
        } else {
            target.to_path_buf()
        };

        let bytes = {
            let _busy = BusyGuard::show(&self.frontend, "Downloading audio...");
            self.backend.fetch_audio(&preview.download_url).await?
        };
        tokio::fs::write(&destination, &bytes).await?;

        log::info!("Saved {} bytes to {}", bytes.len(), destination.display());
        self.frontend.notify(Notice::Success(format!(
            "Saved audio to {}",
            destination.display()
        )));
        Ok(destination)
    }
}
