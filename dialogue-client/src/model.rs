//! Project documents exchanged with the dialogue service
//!
//! A project is produced by the service's analysis step and then edited
//! field by field. The client never invents ids: speaker and line ids come
//! from the service and stay stable for the project's lifetime.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Allowed range for `speed_ratio`
pub const SPEED_RATIO_RANGE: RangeInclusive<f64> = 0.2..=3.0;
/// Allowed range for `volume_ratio`
pub const VOLUME_RATIO_RANGE: RangeInclusive<f64> = 0.1..=3.0;
/// Allowed range for `pitch_ratio`
pub const PITCH_RATIO_RANGE: RangeInclusive<f64> = 0.1..=3.0;

fn default_ratio() -> f64 {
    1.0
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_title() -> String {
    "Untitled dialogue".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Child,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Child => "child",
            Gender::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "child" => Some(Gender::Child),
            "unknown" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Teenager,
    #[default]
    Adult,
    Elder,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Child => "child",
            AgeGroup::Teenager => "teenager",
            AgeGroup::Adult => "adult",
            AgeGroup::Elder => "elder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "child" => Some(AgeGroup::Child),
            "teenager" => Some(AgeGroup::Teenager),
            "adult" => Some(AgeGroup::Adult),
            "elder" => Some(AgeGroup::Elder),
            _ => None,
        }
    }
}

/// A named voice role in a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age_group: AgeGroup,
    /// Voice catalog identifier used to synthesize this speaker's lines
    pub voice_type: String,
}

/// One utterance, in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub id: String,
    pub speaker_id: String,
    pub text: String,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default = "default_ratio")]
    pub speed_ratio: f64,
    #[serde(default = "default_ratio")]
    pub volume_ratio: f64,
    #[serde(default = "default_ratio")]
    pub pitch_ratio: f64,
    /// Preceding utterance, used by the service as synthesis context
    #[serde(default)]
    pub context: Option<String>,
    /// Last per-line artifact generated for this line
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl DialogueLine {
    pub fn new(id: &str, speaker_id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            speaker_id: speaker_id.to_string(),
            text: text.to_string(),
            emotion: None,
            speed_ratio: default_ratio(),
            volume_ratio: default_ratio(),
            pitch_ratio: default_ratio(),
            context: None,
            audio_file: None,
            duration: None,
        }
    }

    /// Emotion label, with an empty string treated as none
    pub fn emotion(&self) -> Option<&str> {
        self.emotion.as_deref().filter(|e| !e.is_empty())
    }
}

/// A dialogue-to-speech project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Assigned by the service; the stored document does not carry it,
    /// so the client stamps it on after analysis or loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    #[serde(default)]
    pub dialogues: Vec<DialogueLine>,
    /// Whole-project artifact from the last successful generation
    #[serde(default)]
    pub output_audio: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Project {
    pub fn speaker(&self, id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    pub fn speaker_mut(&mut self, id: &str) -> Option<&mut Speaker> {
        self.speakers.iter_mut().find(|s| s.id == id)
    }

    pub fn line(&self, id: &str) -> Option<&DialogueLine> {
        self.dialogues.iter().find(|d| d.id == id)
    }

    pub fn line_mut(&mut self, id: &str) -> Option<&mut DialogueLine> {
        self.dialogues.iter_mut().find(|d| d.id == id)
    }

    /// Speaker of a line, if the reference resolves
    pub fn speaker_of(&self, line: &DialogueLine) -> Option<&Speaker> {
        self.speaker(&line.speaker_id)
    }

    /// Whether a whole-project artifact has been generated
    pub fn has_output_audio(&self) -> bool {
        self.output_audio.as_deref().is_some_and(|a| !a.is_empty())
    }
}

/// Listing entry for a stored project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Reference to generated audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Playback URL, usually relative to the service (`/audio/<file>`)
    pub audio_url: String,
    /// Stored path on the service, when it reports one
    #[serde(default)]
    pub output_audio: Option<String>,
}

impl Artifact {
    /// The reference to keep on the project: the stored path when known
    pub fn reference(&self) -> &str {
        self.output_audio
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.audio_url)
    }
}

/// Resolve an artifact reference to a URL the service serves.
///
/// Absolute URLs pass through; anything else is reduced to its file name
/// and served from `/audio/`.
pub fn resolve_audio_url(base_url: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    let normalized = reference.replace('\\', "/");
    let filename = normalized.rsplit('/').next().unwrap_or_default();
    format!("{}/audio/{}", base_url.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project_json() -> &'static str {
        r#"{
            "version": "1.0",
            "title": "Morning",
            "original_text": "Alice: Hello\nBob: Hi there",
            "speakers": [
                {"id": "speaker_1", "name": "Alice", "gender": "female", "age_group": "adult", "voice_type": "v1"},
                {"id": "speaker_2", "name": "Bob", "gender": "male", "voice_type": "v2"}
            ],
            "dialogues": [
                {"id": "line_0", "speaker_id": "speaker_1", "text": "Hello", "emotion": null},
                {"id": "line_1", "speaker_id": "speaker_2", "text": "Hi there", "emotion": "开心",
                 "speed_ratio": 1.5, "volume_ratio": 0.8, "pitch_ratio": 1.1,
                 "context": "Hello", "audio_file": null, "duration": null}
            ],
            "output_audio": null,
            "created_at": "2025-01-01T10:00:00",
            "updated_at": "2025-01-01T10:05:00"
        }"#
    }

    #[test]
    fn test_project_parses_service_document() {
        let project: Project = serde_json::from_str(sample_project_json()).unwrap();

        assert!(project.id.is_none());
        assert_eq!(project.title, "Morning");
        assert_eq!(project.speakers.len(), 2);
        assert_eq!(project.dialogues.len(), 2);
        assert_eq!(project.speakers[1].age_group, AgeGroup::Adult);

        let first = &project.dialogues[0];
        assert_eq!(first.speed_ratio, 1.0);
        assert_eq!(first.volume_ratio, 1.0);
        assert_eq!(first.pitch_ratio, 1.0);
        assert!(first.emotion().is_none());

        let second = &project.dialogues[1];
        assert_eq!(second.speed_ratio, 1.5);
        assert_eq!(second.emotion(), Some("开心"));
    }

    #[test]
    fn test_unrecognized_gender_maps_to_unknown() {
        let speaker: Speaker = serde_json::from_str(
            r#"{"id": "s", "name": "Robot", "gender": "robot", "voice_type": "v"}"#,
        )
        .unwrap();
        assert_eq!(speaker.gender, Gender::Unknown);
    }

    #[test]
    fn test_id_is_not_serialized_when_absent() {
        let project: Project = serde_json::from_str(sample_project_json()).unwrap();
        let value = serde_json::to_value(&project).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_empty_emotion_is_none() {
        let mut line = DialogueLine::new("line_0", "speaker_1", "Hello");
        line.emotion = Some(String::new());
        assert!(line.emotion().is_none());
    }

    #[test]
    fn test_has_output_audio_ignores_empty_reference() {
        let mut project: Project = serde_json::from_str(sample_project_json()).unwrap();
        assert!(!project.has_output_audio());

        project.output_audio = Some(String::new());
        assert!(!project.has_output_audio());

        project.output_audio = Some("dialogue_output/p_final.wav".to_string());
        assert!(project.has_output_audio());
    }

    #[test]
    fn test_speaker_of_missing_reference() {
        let mut project: Project = serde_json::from_str(sample_project_json()).unwrap();
        project.dialogues[0].speaker_id = "ghost".to_string();

        let line = project.dialogues[0].clone();
        assert!(project.speaker_of(&line).is_none());
    }

    #[test]
    fn test_artifact_reference_prefers_stored_path() {
        let artifact = Artifact {
            audio_url: "/audio/p_final.wav".to_string(),
            output_audio: Some("dialogue_output/p_final.wav".to_string()),
        };
        assert_eq!(artifact.reference(), "dialogue_output/p_final.wav");

        let artifact = Artifact {
            audio_url: "/audio/p_final.wav".to_string(),
            output_audio: None,
        };
        assert_eq!(artifact.reference(), "/audio/p_final.wav");
    }

    #[test]
    fn test_resolve_audio_url_from_windows_path() {
        let url = resolve_audio_url("http://localhost:8000/", "dialogue_output\\abc_final.wav");
        assert_eq!(url, "http://localhost:8000/audio/abc_final.wav");
    }

    #[test]
    fn test_resolve_audio_url_from_service_path() {
        let url = resolve_audio_url("http://localhost:8000", "/audio/abc_final.wav");
        assert_eq!(url, "http://localhost:8000/audio/abc_final.wav");
    }

    #[test]
    fn test_resolve_audio_url_keeps_absolute() {
        let url = resolve_audio_url("http://localhost:8000", "https://cdn.example.com/a.wav");
        assert_eq!(url, "https://cdn.example.com/a.wav");
    }

    #[test]
    fn test_gender_and_age_parse() {
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("robot"), None);
        assert_eq!(AgeGroup::parse("elder"), Some(AgeGroup::Elder));
        assert_eq!(AgeGroup::parse(""), None);
    }
}
