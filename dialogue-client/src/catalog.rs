//! Voice catalog supplied by the service at session start

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label used when a voice identifier is not in the catalog
pub const UNKNOWN_VOICE: &str = "unknown";

/// Display details for one synthesis voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDetail {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Selectable voices and emotions.
///
/// Category and voice order is preserved as the service sends it, since it
/// drives the order options are offered in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceCatalog {
    #[serde(default)]
    pub voices_by_category: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub voice_details: IndexMap<String, VoiceDetail>,
    /// Emotion labels keyed by locale (`chinese`, `english`)
    #[serde(default)]
    pub emotions: IndexMap<String, Vec<String>>,
}

/// One entry in a voice picker
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    pub description: String,
    pub selected: bool,
}

/// Voice picker entries for one category
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceGroup {
    pub category: String,
    pub options: Vec<VoiceOption>,
}

impl VoiceCatalog {
    pub fn voice(&self, id: &str) -> Option<&VoiceDetail> {
        self.voice_details.get(id)
    }

    /// Display name of a voice, or [`UNKNOWN_VOICE`]
    pub fn voice_name(&self, id: &str) -> &str {
        self.voice(id).map(|v| v.name.as_str()).unwrap_or(UNKNOWN_VOICE)
    }

    /// Emotion labels for a locale; empty when the locale is not offered
    pub fn emotions(&self, locale: &str) -> &[String] {
        self.emotions.get(locale).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_known_emotion(&self, locale: &str, emotion: &str) -> bool {
        self.emotions(locale).iter().any(|e| e == emotion)
    }

    /// Voice picker grouped by category, marking `selected`.
    ///
    /// Identifiers listed in a category without details are skipped.
    pub fn grouped_options(&self, selected: &str) -> Vec<VoiceGroup> {
        self.voices_by_category
            .iter()
            .map(|(category, ids)| VoiceGroup {
                category: category.clone(),
                options: ids
                    .iter()
                    .filter_map(|id| {
                        self.voice(id).map(|detail| VoiceOption {
                            id: id.clone(),
                            name: detail.name.clone(),
                            description: detail.description.clone(),
                            selected: id == selected,
                        })
                    })
                    .collect(),
            })
            .collect()
    }

    /// First voice of the first category, used as a fallback assignment
    pub fn default_voice(&self) -> Option<&str> {
        self.voices_by_category
            .values()
            .flat_map(|ids| ids.iter())
            .find(|id| self.voice_details.contains_key(id.as_str()))
            .map(String::as_str)
    }

    pub fn voice_count(&self) -> usize {
        self.voice_details.len()
    }

    /// Small catalog of real service voices, used by the in-memory backend
    pub fn sample() -> Self {
        let voice = |name: &str, description: &str, gender: &str, category: &str| VoiceDetail {
            name: name.to_string(),
            description: description.to_string(),
            gender: Some(gender.to_string()),
            category: Some(category.to_string()),
        };

        let mut voice_details = IndexMap::new();
        voice_details.insert(
            "zh_female_vv_uranus_bigtts".to_string(),
            voice("vivi", "通用女声，支持中英文", "female", "通用场景"),
        );
        voice_details.insert(
            "zh_male_ruyayichen_saturn_bigtts".to_string(),
            voice("儒雅逸辰", "儒雅有内涵的男声", "male", "视频配音"),
        );
        voice_details.insert(
            "zh_female_jitangnv_saturn_bigtts".to_string(),
            voice("鸡汤女", "温暖治愈系女声", "female", "视频配音"),
        );
        voice_details.insert(
            "ICL_zh_male_shuanglangshaonian_tob".to_string(),
            voice("爽朗少年", "爽朗阳光的少年角色", "male", "角色扮演"),
        );
        voice_details.insert(
            "ICL_zh_female_keainvsheng_tob".to_string(),
            voice("可爱女生", "可爱活泼的女生角色", "female", "角色扮演"),
        );

        let mut voices_by_category = IndexMap::new();
        voices_by_category.insert(
            "通用场景".to_string(),
            vec!["zh_female_vv_uranus_bigtts".to_string()],
        );
        voices_by_category.insert(
            "视频配音".to_string(),
            vec![
                "zh_male_ruyayichen_saturn_bigtts".to_string(),
                "zh_female_jitangnv_saturn_bigtts".to_string(),
            ],
        );
        voices_by_category.insert(
            "角色扮演".to_string(),
            vec![
                "ICL_zh_male_shuanglangshaonian_tob".to_string(),
                "ICL_zh_female_keainvsheng_tob".to_string(),
            ],
        );

        let to_strings =
            |labels: &[&str]| -> Vec<String> { labels.iter().map(|l| l.to_string()).collect() };
        let mut emotions: IndexMap<String, Vec<String>> = IndexMap::new();
        emotions.insert(
            "chinese".to_string(),
            to_strings(&["开心", "悲伤", "生气", "惊讶", "中性", "温柔"]),
        );
        emotions.insert(
            "english".to_string(),
            to_strings(&["中性", "愉悦", "愤怒", "悲伤", "兴奋"]),
        );

        Self {
            voices_by_category,
            voice_details,
            emotions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_service_config_and_keeps_category_order() {
        let json = r#"{
            "emotions": {"chinese": ["开心", "悲伤"], "english": ["中性"]},
            "voice_types": {"male_adult": "b"},
            "voice_details": {
                "b": {"name": "Bee", "description": "second", "support_mix": false},
                "a": {"name": "Ay", "description": "first"}
            },
            "voice_categories": ["z", "a"],
            "voices_by_category": {"z": ["b"], "a": ["a", "missing"]},
            "tts_params": {}
        }"#;

        let catalog: VoiceCatalog = serde_json::from_str(json).unwrap();

        let categories: Vec<&str> = catalog.voices_by_category.keys().map(|k| k.as_str()).collect();
        assert_eq!(categories, vec!["z", "a"]);
        assert_eq!(catalog.emotions("chinese").len(), 2);
        assert_eq!(catalog.voice_count(), 2);
    }

    #[test]
    fn test_voice_name_falls_back_to_unknown() {
        let catalog = VoiceCatalog::sample();
        assert_eq!(catalog.voice_name("zh_female_vv_uranus_bigtts"), "vivi");
        assert_eq!(catalog.voice_name("no_such_voice"), UNKNOWN_VOICE);
    }

    #[test]
    fn test_grouped_options_marks_selection_and_skips_missing() {
        let mut catalog = VoiceCatalog::sample();
        catalog
            .voices_by_category
            .get_mut("通用场景")
            .unwrap()
            .push("missing".to_string());

        let groups = catalog.grouped_options("zh_male_ruyayichen_saturn_bigtts");

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].options.len(), 1);
        let selected: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.options.iter())
            .filter(|o| o.selected)
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(selected, vec!["zh_male_ruyayichen_saturn_bigtts"]);
    }

    #[test]
    fn test_emotions_for_unknown_locale_is_empty() {
        let catalog = VoiceCatalog::sample();
        assert!(catalog.emotions("klingon").is_empty());
        assert!(catalog.is_known_emotion("chinese", "开心"));
        assert!(!catalog.is_known_emotion("chinese", "happy"));
    }

    #[test]
    fn test_default_voice() {
        assert_eq!(
            VoiceCatalog::sample().default_voice(),
            Some("zh_female_vv_uranus_bigtts")
        );
        assert_eq!(VoiceCatalog::default().default_voice(), None);
    }
}
