//! Single-line and whole-project audio generation
//!
//! Both operations ask for confirmation, hold the busy indicator for the
//! whole request, and only touch the project once the service succeeds.

use std::sync::Arc;

use dialogue_client::{Artifact, DialogueBackend};

use crate::error::{EditorError, Result};
use crate::frontend::{BusyGuard, Frontend, Notice};
use crate::session::{ActiveProject, Flow};

pub const REGENERATE_LINE_PROMPT: &str = "Regenerate audio for this line?";

pub fn generate_all_prompt(line_count: usize) -> String {
    format!(
        "Generate audio for all {} dialogue lines? This may take a while.",
        line_count
    )
}

/// Synthesize one line and store the artifact on that line.
///
/// The whole-project `output_audio` is never touched.
pub async fn generate_line(
    backend: &dyn DialogueBackend,
    frontend: &Arc<dyn Frontend>,
    active: &mut ActiveProject,
    line_id: &str,
) -> Result<Flow<Artifact>> {
    if active.project.line(line_id).is_none() {
        return Err(EditorError::UnknownLine(line_id.to_string()));
    }
    if !frontend.confirm(REGENERATE_LINE_PROMPT)? {
        return Ok(Flow::Declined);
    }

    let artifact = {
        let _busy = BusyGuard::show(frontend, "Generating audio...");
        log::info!("Generating line {} of project {}", line_id, active.id);
        backend.generate_line(&active.id, line_id).await?
    };

    if let Some(line) = active.project.line_mut(line_id) {
        line.audio_file = Some(artifact.reference().to_string());
    }
    frontend.notify(Notice::Success("Audio generated".to_string()));

    Ok(Flow::Completed(artifact))
}

/// Synthesize the whole project and record the result as `output_audio`
pub async fn generate_all(
    backend: &dyn DialogueBackend,
    frontend: &Arc<dyn Frontend>,
    active: &mut ActiveProject,
) -> Result<Flow<Artifact>> {
    let line_count = active.project.dialogues.len();
    if !frontend.confirm(&generate_all_prompt(line_count))? {
        return Ok(Flow::Declined);
    }

    let artifact = {
        let _busy = BusyGuard::show(frontend, "Generating audio, please wait...");
        log::info!(
            "Generating {} lines of project {}",
            line_count,
            active.id
        );
        backend.generate_all(&active.id).await?
    };

    active.project.output_audio = Some(artifact.reference().to_string());
    frontend.notify(Notice::Success("All audio generated".to_string()));

    Ok(Flow::Completed(artifact))
}
