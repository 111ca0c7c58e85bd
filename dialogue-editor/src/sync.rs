//! Single-field edits, applied locally then forwarded to the service
//!
//! An edit is validated first, then written into the active project, then
//! sent as a one-key update. A failed send is reported and recorded in the
//! [`SyncLedger`] but the local value stays: the project can drift from the
//! service until the same field syncs again.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use dialogue_client::{
    AgeGroup, DialogueBackend, DialogueLine, FieldUpdate, Gender, PITCH_RATIO_RANGE,
    SPEED_RATIO_RANGE, Speaker, VOLUME_RATIO_RANGE, VoiceCatalog,
};

use crate::error::{EditorError, Result};
use crate::frontend::{Frontend, Notice};
use crate::session::ActiveProject;

/// Accepted spellings for "no emotion"
const NO_EMOTION: [&str; 2] = ["", "none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpeakerField {
    Name,
    Gender,
    AgeGroup,
    VoiceType,
}

impl SpeakerField {
    pub const ALL: [SpeakerField; 4] = [
        SpeakerField::Name,
        SpeakerField::Gender,
        SpeakerField::AgeGroup,
        SpeakerField::VoiceType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerField::Name => "name",
            SpeakerField::Gender => "gender",
            SpeakerField::AgeGroup => "age_group",
            SpeakerField::VoiceType => "voice_type",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == value)
            .ok_or_else(|| {
                EditorError::Validation(format!(
                    "Unknown speaker field '{}' (expected one of: {})",
                    value,
                    field_names(&Self::ALL.map(|f| f.as_str()))
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineField {
    Text,
    Emotion,
    SpeedRatio,
    VolumeRatio,
    PitchRatio,
}

impl LineField {
    pub const ALL: [LineField; 5] = [
        LineField::Text,
        LineField::Emotion,
        LineField::SpeedRatio,
        LineField::VolumeRatio,
        LineField::PitchRatio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineField::Text => "text",
            LineField::Emotion => "emotion",
            LineField::SpeedRatio => "speed_ratio",
            LineField::VolumeRatio => "volume_ratio",
            LineField::PitchRatio => "pitch_ratio",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == value)
            .ok_or_else(|| {
                EditorError::Validation(format!(
                    "Unknown line field '{}' (expected one of: {})",
                    value,
                    field_names(&Self::ALL.map(|f| f.as_str()))
                ))
            })
    }

    /// Allowed range for the numeric fields
    pub fn bounds(&self) -> Option<RangeInclusive<f64>> {
        match self {
            LineField::SpeedRatio => Some(SPEED_RATIO_RANGE),
            LineField::VolumeRatio => Some(VOLUME_RATIO_RANGE),
            LineField::PitchRatio => Some(PITCH_RATIO_RANGE),
            LineField::Text | LineField::Emotion => None,
        }
    }
}

fn field_names(names: &[&str]) -> String {
    names.join(", ")
}

/// A validated speaker edit
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerEdit {
    Name(String),
    Gender(Gender),
    AgeGroup(AgeGroup),
    VoiceType(String),
}

impl SpeakerEdit {
    pub fn parse(field: SpeakerField, raw: &str) -> Result<Self> {
        match field {
            SpeakerField::Name => Ok(SpeakerEdit::Name(raw.to_string())),
            SpeakerField::Gender => Gender::parse(raw).map(SpeakerEdit::Gender).ok_or_else(|| {
                EditorError::Validation(format!(
                    "Invalid gender '{}' (expected male, female, child or unknown)",
                    raw
                ))
            }),
            SpeakerField::AgeGroup => {
                AgeGroup::parse(raw).map(SpeakerEdit::AgeGroup).ok_or_else(|| {
                    EditorError::Validation(format!(
                        "Invalid age group '{}' (expected child, teenager, adult or elder)",
                        raw
                    ))
                })
            }
            SpeakerField::VoiceType => {
                let voice = raw.trim();
                if voice.is_empty() {
                    return Err(EditorError::Validation(
                        "Voice identifier must not be empty".to_string(),
                    ));
                }
                Ok(SpeakerEdit::VoiceType(voice.to_string()))
            }
        }
    }

    pub fn field(&self) -> SpeakerField {
        match self {
            SpeakerEdit::Name(_) => SpeakerField::Name,
            SpeakerEdit::Gender(_) => SpeakerField::Gender,
            SpeakerEdit::AgeGroup(_) => SpeakerField::AgeGroup,
            SpeakerEdit::VoiceType(_) => SpeakerField::VoiceType,
        }
    }

    fn apply(&self, speaker: &mut Speaker) {
        match self {
            SpeakerEdit::Name(name) => speaker.name = name.clone(),
            SpeakerEdit::Gender(gender) => speaker.gender = *gender,
            SpeakerEdit::AgeGroup(age_group) => speaker.age_group = *age_group,
            SpeakerEdit::VoiceType(voice) => speaker.voice_type = voice.clone(),
        }
    }

    /// Speaker fields all travel as strings
    fn update(&self) -> FieldUpdate {
        let field = self.field().as_str();
        match self {
            SpeakerEdit::Name(name) => FieldUpdate::text(field, name.as_str()),
            SpeakerEdit::Gender(gender) => FieldUpdate::text(field, gender.as_str()),
            SpeakerEdit::AgeGroup(age_group) => FieldUpdate::text(field, age_group.as_str()),
            SpeakerEdit::VoiceType(voice) => FieldUpdate::text(field, voice.as_str()),
        }
    }
}

/// A validated dialogue line edit
#[derive(Debug, Clone, PartialEq)]
pub enum LineEdit {
    Text(String),
    Emotion(Option<String>),
    SpeedRatio(f64),
    VolumeRatio(f64),
    PitchRatio(f64),
}

impl LineEdit {
    /// Validate a raw value for `field`.
    ///
    /// Ratios must parse and lie within their bounds. An emotion must be one
    /// of the catalog's labels for `locale` when the catalog offers any.
    pub fn parse(field: LineField, raw: &str, catalog: &VoiceCatalog, locale: &str) -> Result<Self> {
        if let Some(bounds) = field.bounds() {
            let value = parse_ratio(field, raw, &bounds)?;
            return Ok(match field {
                LineField::SpeedRatio => LineEdit::SpeedRatio(value),
                LineField::VolumeRatio => LineEdit::VolumeRatio(value),
                _ => LineEdit::PitchRatio(value),
            });
        }

        match field {
            LineField::Emotion => {
                let emotion = raw.trim();
                if NO_EMOTION.iter().any(|none| emotion.eq_ignore_ascii_case(none)) {
                    return Ok(LineEdit::Emotion(None));
                }

                let known = catalog.emotions(locale);
                if !known.is_empty() && !catalog.is_known_emotion(locale, emotion) {
                    return Err(EditorError::Validation(format!(
                        "Unknown emotion '{}' (expected none or one of: {})",
                        emotion,
                        known.join(", ")
                    )));
                }
                Ok(LineEdit::Emotion(Some(emotion.to_string())))
            }
            _ => Ok(LineEdit::Text(raw.to_string())),
        }
    }

    pub fn field(&self) -> LineField {
        match self {
            LineEdit::Text(_) => LineField::Text,
            LineEdit::Emotion(_) => LineField::Emotion,
            LineEdit::SpeedRatio(_) => LineField::SpeedRatio,
            LineEdit::VolumeRatio(_) => LineField::VolumeRatio,
            LineEdit::PitchRatio(_) => LineField::PitchRatio,
        }
    }

    fn apply(&self, line: &mut DialogueLine) {
        match self {
            LineEdit::Text(text) => line.text = text.clone(),
            LineEdit::Emotion(emotion) => line.emotion = emotion.clone(),
            LineEdit::SpeedRatio(value) => line.speed_ratio = *value,
            LineEdit::VolumeRatio(value) => line.volume_ratio = *value,
            LineEdit::PitchRatio(value) => line.pitch_ratio = *value,
        }
    }

    /// Ratios travel as numbers, everything else as strings; no emotion is ""
    fn update(&self) -> FieldUpdate {
        let field = self.field().as_str();
        match self {
            LineEdit::Text(text) => FieldUpdate::text(field, text.as_str()),
            LineEdit::Emotion(emotion) => {
                FieldUpdate::text(field, emotion.as_deref().unwrap_or_default())
            }
            LineEdit::SpeedRatio(value)
            | LineEdit::VolumeRatio(value)
            | LineEdit::PitchRatio(value) => FieldUpdate::number(field, *value),
        }
    }
}

fn parse_ratio(field: LineField, raw: &str, bounds: &RangeInclusive<f64>) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        EditorError::Validation(format!("{} must be a number, got '{}'", field.as_str(), raw))
    })?;

    if !value.is_finite() || !bounds.contains(&value) {
        return Err(EditorError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field.as_str(),
            bounds.start(),
            bounds.end(),
            value
        )));
    }
    Ok(value)
}

/// Address of one editable field in the active project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    Title,
    Speaker { id: String, field: SpeakerField },
    Line { id: String, field: LineField },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Title => write!(f, "title"),
            FieldPath::Speaker { id, field } => write!(f, "speaker {}.{}", id, field.as_str()),
            FieldPath::Line { id, field } => write!(f, "line {}.{}", id, field.as_str()),
        }
    }
}

/// Fields whose latest local value has not reached the service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncLedger {
    unsynced: BTreeSet<FieldPath>,
}

impl SyncLedger {
    /// Record the outcome of the latest sync of `path`
    pub fn record(&mut self, path: FieldPath, synced: bool) {
        if synced {
            self.unsynced.remove(&path);
        } else {
            self.unsynced.insert(path);
        }
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.unsynced.contains(path)
    }

    pub fn speaker_unsynced(&self, speaker_id: &str) -> bool {
        self.unsynced
            .iter()
            .any(|path| matches!(path, FieldPath::Speaker { id, .. } if id == speaker_id))
    }

    pub fn line_unsynced(&self, line_id: &str) -> bool {
        self.unsynced
            .iter()
            .any(|path| matches!(path, FieldPath::Line { id, .. } if id == line_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.unsynced.iter()
    }

    pub fn len(&self) -> usize {
        self.unsynced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unsynced.is_empty()
    }
}

/// Outcome of a field edit that was applied locally
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub path: FieldPath,
    /// Whether the service accepted the update
    pub synced: bool,
}

/// Apply a speaker edit locally and send it to the service.
///
/// Returns `Err` only when the edit cannot be applied at all (unknown
/// speaker). A rejected send still returns `Ok` with `synced: false`.
pub async fn sync_speaker(
    backend: &dyn DialogueBackend,
    frontend: &Arc<dyn Frontend>,
    catalog: &VoiceCatalog,
    active: &mut ActiveProject,
    speaker_id: &str,
    edit: SpeakerEdit,
) -> Result<SyncReport> {
    let speaker = active
        .project
        .speaker_mut(speaker_id)
        .ok_or_else(|| EditorError::UnknownSpeaker(speaker_id.to_string()))?;
    edit.apply(speaker);

    let path = FieldPath::Speaker {
        id: speaker_id.to_string(),
        field: edit.field(),
    };
    let update = edit.update();
    let result = backend
        .update_speaker(&active.id, speaker_id, &update)
        .await;

    let synced = settle(frontend, &mut active.ledger, &path, result);
    if synced {
        if let SpeakerEdit::VoiceType(voice) = &edit {
            frontend.notify(Notice::Success(format!(
                "Voice updated to: {}",
                catalog.voice_name(voice)
            )));
        }
    }

    Ok(SyncReport { path, synced })
}

/// Apply a line edit locally and send it to the service.
///
/// Same failure contract as [`sync_speaker`].
pub async fn sync_line(
    backend: &dyn DialogueBackend,
    frontend: &Arc<dyn Frontend>,
    active: &mut ActiveProject,
    line_id: &str,
    edit: LineEdit,
) -> Result<SyncReport> {
    let line = active
        .project
        .line_mut(line_id)
        .ok_or_else(|| EditorError::UnknownLine(line_id.to_string()))?;
    edit.apply(line);

    let path = FieldPath::Line {
        id: line_id.to_string(),
        field: edit.field(),
    };
    let update = edit.update();
    let result = backend.update_line(&active.id, line_id, &update).await;

    let synced = settle(frontend, &mut active.ledger, &path, result);
    Ok(SyncReport { path, synced })
}

fn settle(
    frontend: &Arc<dyn Frontend>,
    ledger: &mut SyncLedger,
    path: &FieldPath,
    result: dialogue_client::Result<()>,
) -> bool {
    match result {
        Ok(()) => {
            log::debug!("Synced {}", path);
            ledger.record(path.clone(), true);
            true
        }
        Err(e) => {
            log::warn!("Update of {} failed, keeping local value: {}", path, e);
            ledger.record(path.clone(), false);
            frontend.notify(Notice::Error(format!("Update failed: {}", e)));
            false
        }
    }
}
