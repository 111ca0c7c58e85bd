//! Display data derived from the project model
//!
//! Views are pure functions of the model, the catalog and the sync ledger.
//! Nothing here mutates state; the frontend renders whatever it is given.

use std::fmt;

use dialogue_client::{AgeGroup, Gender, Project, VoiceCatalog, VoiceGroup, resolve_audio_url};

use crate::session::Phase;
use crate::sync::{FieldPath, SyncLedger};

/// Shown for a line whose speaker reference does not resolve
pub const UNKNOWN_SPEAKER: &str = "unknown speaker";

pub fn gender_icon(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "👨",
        Gender::Female => "👩",
        _ => "👶",
    }
}

pub fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
        Gender::Child => "Child",
        Gender::Unknown => "Unknown",
    }
}

pub fn age_label(age_group: AgeGroup) -> &'static str {
    match age_group {
        AgeGroup::Child => "Child",
        AgeGroup::Teenager => "Teenager",
        AgeGroup::Adult => "Adult",
        AgeGroup::Elder => "Elder",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerCard {
    pub id: String,
    pub name: String,
    pub icon: &'static str,
    pub gender_label: &'static str,
    pub age_label: &'static str,
    pub voice_type: String,
    /// Catalog name of the selected voice, or "unknown"
    pub voice_name: String,
    pub voice_groups: Vec<VoiceGroup>,
    pub unsynced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    /// 1-based position in playback order
    pub index: usize,
    pub id: String,
    pub speaker_name: String,
    pub text: String,
    pub emotion: Option<String>,
    pub speed_ratio: f64,
    pub volume_ratio: f64,
    pub pitch_ratio: f64,
    pub audio_file: Option<String>,
    pub unsynced: bool,
}

/// Everything the Edit phase shows
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub project_id: String,
    pub title: String,
    /// The title only ever changes locally
    pub title_unsynced: bool,
    pub meta: String,
    pub speakers: Vec<SpeakerCard>,
    pub lines: Vec<LineRow>,
    /// Emotion choices for the active locale; "none" is always offered too
    pub emotions: Vec<String>,
    /// Offer to preview the existing whole-project audio
    pub show_preview_existing: bool,
    pub unsynced_count: usize,
}

impl EditorView {
    pub fn derive(
        project_id: &str,
        project: &Project,
        catalog: &VoiceCatalog,
        locale: &str,
        ledger: &SyncLedger,
    ) -> Self {
        let speakers = project
            .speakers
            .iter()
            .map(|speaker| SpeakerCard {
                id: speaker.id.clone(),
                name: speaker.name.clone(),
                icon: gender_icon(speaker.gender),
                gender_label: gender_label(speaker.gender),
                age_label: age_label(speaker.age_group),
                voice_type: speaker.voice_type.clone(),
                voice_name: catalog.voice_name(&speaker.voice_type).to_string(),
                voice_groups: catalog.grouped_options(&speaker.voice_type),
                unsynced: ledger.speaker_unsynced(&speaker.id),
            })
            .collect();

        let lines = project
            .dialogues
            .iter()
            .enumerate()
            .map(|(i, line)| LineRow {
                index: i + 1,
                id: line.id.clone(),
                speaker_name: project
                    .speaker_of(line)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
                text: line.text.clone(),
                emotion: line.emotion().map(str::to_string),
                speed_ratio: line.speed_ratio,
                volume_ratio: line.volume_ratio,
                pitch_ratio: line.pitch_ratio,
                audio_file: line.audio_file.clone(),
                unsynced: ledger.line_unsynced(&line.id),
            })
            .collect();

        Self {
            project_id: project_id.to_string(),
            title: project.title.clone(),
            title_unsynced: ledger.contains(&FieldPath::Title),
            meta: format!(
                "{} speakers, {} lines",
                project.speakers.len(),
                project.dialogues.len()
            ),
            speakers,
            lines,
            emotions: catalog.emotions(locale).to_vec(),
            show_preview_existing: project.has_output_audio(),
            unsynced_count: ledger.len(),
        }
    }
}

fn unsynced_marker(unsynced: bool) -> &'static str {
    if unsynced { " [unsynced]" } else { "" }
}

impl fmt::Display for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}){}",
            self.title,
            self.project_id,
            unsynced_marker(self.title_unsynced)
        )?;
        writeln!(f, "{}", self.meta)?;
        if self.unsynced_count > 0 {
            writeln!(
                f,
                "{} edit(s) failed to reach the service and are only local",
                self.unsynced_count
            )?;
        }

        writeln!(f, "\nSpeakers:")?;
        writeln!(f, "{:-<60}", "")?;
        for card in &self.speakers {
            writeln!(
                f,
                "  {} {} [{}] {} / {}{}",
                card.icon,
                card.name,
                card.id,
                card.gender_label,
                card.age_label,
                unsynced_marker(card.unsynced)
            )?;
            writeln!(f, "     voice: {} ({})", card.voice_name, card.voice_type)?;
        }

        writeln!(f, "\nDialogue:")?;
        writeln!(f, "{:-<60}", "")?;
        for row in &self.lines {
            writeln!(
                f,
                "  {}. {} [{}]{}",
                row.index,
                row.speaker_name,
                row.id,
                unsynced_marker(row.unsynced)
            )?;
            writeln!(f, "     {}", row.text)?;
            writeln!(
                f,
                "     emotion: {}  speed: {}  volume: {}  pitch: {}",
                row.emotion.as_deref().unwrap_or("none"),
                row.speed_ratio,
                row.volume_ratio,
                row.pitch_ratio
            )?;
        }
        writeln!(f, "{:-<60}", "")?;

        if self.show_preview_existing {
            write!(f, "Generated audio available: 'preview' to play, 'generate' to redo")
        } else {
            write!(f, "'generate' to synthesize all {} lines", self.lines.len())
        }
    }
}

/// Playback and download targets for a generated artifact
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewView {
    pub reference: String,
    pub audio_url: String,
    pub download_url: String,
    pub file_name: String,
}

impl PreviewView {
    pub fn from_reference(base_url: &str, reference: &str) -> Self {
        let audio_url = resolve_audio_url(base_url, reference);
        let file_name = audio_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("dialogue.wav")
            .to_string();

        Self {
            reference: reference.to_string(),
            download_url: audio_url.clone(),
            audio_url,
            file_name,
        }
    }
}

impl fmt::Display for PreviewView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preview")?;
        writeln!(f, "{:-<60}", "")?;
        writeln!(f, "  play:     {}", self.audio_url)?;
        writeln!(f, "  download: {}", self.download_url)?;
        write!(f, "'download [path]' to save, 'back' to keep editing")
    }
}

/// The catalog's voices grouped by category, selected voice marked with `*`
pub fn voice_listing(catalog: &VoiceCatalog, selected: Option<&str>) -> String {
    let groups = catalog.grouped_options(selected.unwrap_or_default());
    if groups.iter().all(|group| group.options.is_empty()) {
        return "No voices available".to_string();
    }

    let mut lines = Vec::new();
    for group in groups.iter().filter(|group| !group.options.is_empty()) {
        lines.push(format!("{}:", group.category));
        for option in &group.options {
            let marker = if option.selected { "*" } else { " " };
            lines.push(format!(
                " {} {:<40} {} - {}",
                marker, option.id, option.name, option.description
            ));
        }
    }
    lines.join("\n")
}

/// What the frontend shows for the active phase
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Input,
    Edit(EditorView),
    Preview(PreviewView),
}

impl Screen {
    pub fn phase(&self) -> Phase {
        match self {
            Screen::Input => Phase::Input,
            Screen::Edit(_) => Phase::Edit,
            Screen::Preview(_) => Phase::Preview,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Input => write!(
                f,
                "Paste dialogue text with 'analyze' (end with a line containing only '.'), \
                 or 'load' an existing project"
            ),
            Screen::Edit(view) => write!(f, "{}", view),
            Screen::Preview(view) => write!(f, "{}", view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_client::{DialogueLine, Speaker};

    fn project() -> Project {
        Project {
            id: Some("p1".to_string()),
            version: "1.0".to_string(),
            title: "Greeting".to_string(),
            original_text: "Alice: Hello\nBob: Hi there".to_string(),
            speakers: vec![
                Speaker {
                    id: "speaker_1".to_string(),
                    name: "Alice".to_string(),
                    gender: Gender::Female,
                    age_group: AgeGroup::Adult,
                    voice_type: "zh_female_vv_uranus_bigtts".to_string(),
                },
                Speaker {
                    id: "speaker_2".to_string(),
                    name: "Bob".to_string(),
                    gender: Gender::Unknown,
                    age_group: AgeGroup::Elder,
                    voice_type: "retired_voice".to_string(),
                },
            ],
            dialogues: vec![
                DialogueLine::new("line_0", "speaker_1", "Hello"),
                DialogueLine::new("line_1", "ghost", "Hi there"),
            ],
            output_audio: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn derive(project: &Project) -> EditorView {
        EditorView::derive(
            "p1",
            project,
            &VoiceCatalog::sample(),
            "chinese",
            &SyncLedger::default(),
        )
    }

    #[test]
    fn test_derive_speaker_cards() {
        let view = derive(&project());

        assert_eq!(view.meta, "2 speakers, 2 lines");
        assert_eq!(view.speakers[0].icon, "👩");
        assert_eq!(view.speakers[0].voice_name, "vivi");
        assert_eq!(view.speakers[1].icon, "👶");
        assert_eq!(view.speakers[1].age_label, "Elder");
        assert_eq!(view.speakers[1].voice_name, "unknown");
    }

    #[test]
    fn test_missing_speaker_reference_degrades() {
        let view = derive(&project());

        assert_eq!(view.lines[0].speaker_name, "Alice");
        assert_eq!(view.lines[1].speaker_name, UNKNOWN_SPEAKER);
        assert_eq!(view.lines[1].index, 2);
    }

    #[test]
    fn test_preview_affordance_follows_output_audio() {
        let mut project = project();
        assert!(!derive(&project).show_preview_existing);

        project.output_audio = Some(String::new());
        assert!(!derive(&project).show_preview_existing);

        project.output_audio = Some("dialogue_output/p1_final.wav".to_string());
        assert!(derive(&project).show_preview_existing);
    }

    #[test]
    fn test_unsynced_fields_are_marked() {
        let mut ledger = SyncLedger::default();
        ledger.record(
            FieldPath::Line {
                id: "line_1".to_string(),
                field: crate::sync::LineField::Text,
            },
            false,
        );

        let view = EditorView::derive("p1", &project(), &VoiceCatalog::sample(), "chinese", &ledger);

        assert!(!view.lines[0].unsynced);
        assert!(view.lines[1].unsynced);
        assert_eq!(view.unsynced_count, 1);
        assert!(view.to_string().contains("[unsynced]"));
    }

    #[test]
    fn test_editor_view_renders_lines_in_order() {
        let rendered = derive(&project()).to_string();

        let hello = rendered.find("Hello").unwrap();
        let hi = rendered.find("Hi there").unwrap();
        assert!(hello < hi);
        assert!(rendered.contains("emotion: none"));
    }

    #[test]
    fn test_voice_listing_groups_and_marks() {
        let listing = voice_listing(&VoiceCatalog::sample(), Some("zh_female_vv_uranus_bigtts"));

        assert!(listing.starts_with("通用场景:"));
        assert!(listing.contains("* zh_female_vv_uranus_bigtts"));
        assert!(listing.contains("角色扮演:"));
        assert_eq!(voice_listing(&VoiceCatalog::default(), None), "No voices available");
    }

    #[test]
    fn test_preview_view_resolves_stored_path() {
        let view = PreviewView::from_reference("http://localhost:8000", "dialogue_output\\p1_final.wav");

        assert_eq!(view.audio_url, "http://localhost:8000/audio/p1_final.wav");
        assert_eq!(view.download_url, view.audio_url);
        assert_eq!(view.file_name, "p1_final.wav");
    }
}
