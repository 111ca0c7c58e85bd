use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::VoiceCatalog;
use crate::error::Result;
use crate::model::{Artifact, Project, ProjectSummary};

/// Value carried by a single-field update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

/// A single changed field, sent as a one-key JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn text(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: FieldValue::Text(value.into()),
        }
    }

    pub fn number(field: &str, value: f64) -> Self {
        Self {
            field: field.to_string(),
            value: FieldValue::Number(value),
        }
    }

    /// Request body: `{ "<field>": <value> }`
    pub fn to_body(&self) -> Value {
        let value = match &self.value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Number(number) => {
                serde_json::Number::from_f64(*number).map_or(Value::Null, Value::Number)
            }
        };

        let mut body = Map::new();
        body.insert(self.field.clone(), value);
        Value::Object(body)
    }
}

/// Operations the editor needs from the dialogue service.
///
/// Every implementation reports non-success as an error; none retries.
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    /// Voice catalog, fetched once per session
    async fn fetch_catalog(&self) -> Result<VoiceCatalog>;

    /// Analyze raw dialogue text into a new project with its id assigned
    async fn analyze(&self, text: &str) -> Result<Project>;

    async fn update_speaker(
        &self,
        project_id: &str,
        speaker_id: &str,
        update: &FieldUpdate,
    ) -> Result<()>;

    async fn update_line(&self, project_id: &str, line_id: &str, update: &FieldUpdate)
    -> Result<()>;

    /// Synthesize a single line
    async fn generate_line(&self, project_id: &str, line_id: &str) -> Result<Artifact>;

    /// Synthesize and concatenate every line of the project
    async fn generate_all(&self, project_id: &str) -> Result<Artifact>;

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>>;

    /// Load a stored project with its id assigned
    async fn load_project(&self, project_id: &str) -> Result<Project>;

    /// Raw bytes of a generated artifact
    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>>;

    /// Base URL artifact references resolve against
    fn base_url(&self) -> &str;

    /// Backend name
    fn name(&self) -> &'static str;
}
