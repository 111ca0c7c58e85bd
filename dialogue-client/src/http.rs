//! HTTP backend for the dialogue editor service
//!
//! Talks to the service's JSON API:
//! - `GET  /api/config`
//! - `POST /api/analyze`
//! - `GET  /api/projects`, `GET /api/projects/{id}`
//! - `PUT  /api/projects/{id}/speaker/{speaker_id}`, `PUT /api/projects/{id}/line/{line_id}`
//! - `POST /api/projects/{id}/generate-line/{line_id}`, `POST /api/projects/{id}/generate`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{DialogueBackend, FieldUpdate};
use crate::catalog::VoiceCatalog;
use crate::error::{ApiError, Result};
use crate::model::{Artifact, Project, ProjectSummary};

/// Backend that calls the service over HTTP
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// Create a backend for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and turn a non-2xx status into `ApiError::Status`
    async fn checked(&self, request_builder: RequestBuilder) -> Result<Response> {
        let response = request_builder
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(error_response) => error_response.detail,
                Err(_) => error_text,
            };

            return Err(ApiError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request_builder: RequestBuilder) -> Result<T> {
        self.checked(request_builder)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Updates succeed on any 2xx. The body is optional; only an explicit
    /// `"success": false` counts as a rejection.
    async fn send_update(&self, path: &str, update: &FieldUpdate) -> Result<()> {
        log::debug!("PUT {} {}", path, update.to_body());

        let request_builder = self.client.put(self.url(path)).json(&update.to_body());
        let body = self
            .checked(request_builder)
            .await?
            .text()
            .await
            .unwrap_or_default();

        match serde_json::from_str::<UpdateResponse>(&body) {
            Ok(response) if !response.success => Err(ApiError::Rejected(response.message)),
            _ => Ok(()),
        }
    }

    async fn send_generate(&self, path: &str) -> Result<Artifact> {
        log::debug!("POST {}", path);

        let response: GenerateResponse = self.send(self.client.post(self.url(path))).await?;
        if !response.success {
            return Err(ApiError::Rejected(response.message));
        }

        let audio_url = response
            .audio_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::Decode("response has no audio_url".to_string()))?;

        Ok(Artifact {
            audio_url,
            output_audio: response.output_audio,
        })
    }
}

// Service request/response types

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    project_id: String,
    project: Project,
}

#[derive(Debug, Deserialize)]
struct ProjectListResponse {
    #[serde(default)]
    projects: Vec<ProjectSummary>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    output_audio: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: String,
}

fn default_success() -> bool {
    true
}

#[async_trait]
impl DialogueBackend for HttpBackend {
    async fn fetch_catalog(&self) -> Result<VoiceCatalog> {
        log::debug!("GET /api/config");
        self.send(self.client.get(self.url("/api/config"))).await
    }

    async fn analyze(&self, text: &str) -> Result<Project> {
        log::debug!("POST /api/analyze ({} chars)", text.chars().count());

        let request_builder = self
            .client
            .post(self.url("/api/analyze"))
            .json(&AnalyzeRequest { text });
        let response: AnalyzeResponse = self.send(request_builder).await?;

        let mut project = response.project;
        project.id = Some(response.project_id);
        Ok(project)
    }

    async fn update_speaker(
        &self,
        project_id: &str,
        speaker_id: &str,
        update: &FieldUpdate,
    ) -> Result<()> {
        let path = format!("/api/projects/{}/speaker/{}", project_id, speaker_id);
        self.send_update(&path, update).await
    }

    async fn update_line(
        &self,
        project_id: &str,
        line_id: &str,
        update: &FieldUpdate,
    ) -> Result<()> {
        let path = format!("/api/projects/{}/line/{}", project_id, line_id);
        self.send_update(&path, update).await
    }

    async fn generate_line(&self, project_id: &str, line_id: &str) -> Result<Artifact> {
        let path = format!("/api/projects/{}/generate-line/{}", project_id, line_id);
        self.send_generate(&path).await
    }

    async fn generate_all(&self, project_id: &str) -> Result<Artifact> {
        let path = format!("/api/projects/{}/generate", project_id);
        self.send_generate(&path).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        log::debug!("GET /api/projects");
        let response: ProjectListResponse =
            self.send(self.client.get(self.url("/api/projects"))).await?;
        Ok(response.projects)
    }

    async fn load_project(&self, project_id: &str) -> Result<Project> {
        let path = format!("/api/projects/{}", project_id);
        log::debug!("GET {}", path);

        let mut project: Project = self.send(self.client.get(self.url(&path))).await?;
        project.id = Some(project_id.to_string());
        Ok(project)
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status_code: status.as_u16(),
                message: format!("Failed to download {}", url),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a local port.
    ///
    /// Returns the base URL and a handle yielding the raw request text.
    async fn serve_once(
        status_line: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (base_url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/api/config"), "http://localhost:8000/api/config");
    }

    #[test]
    fn test_analyze_response_keeps_id_separate() {
        let json = r#"{
            "project_id": "abc",
            "project": {"title": "t", "original_text": "x", "speakers": [], "dialogues": []}
        }"#;
        let response: AnalyzeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.project_id, "abc");
        assert!(response.project.id.is_none());
    }

    #[test]
    fn test_generate_response_without_output_audio() {
        let json = r#"{"success": true, "audio_url": "/audio/abc_final.wav", "message": "ok"}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.audio_url.as_deref(), Some("/audio/abc_final.wav"));
        assert!(response.output_audio.is_none());
    }

    #[test]
    fn test_error_detail_parses() {
        let response: ErrorResponse = serde_json::from_str(r#"{"detail": "not found"}"#).unwrap();
        assert_eq!(response.detail, "not found");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = backend.list_projects().await;
        assert!(matches!(result, Err(ApiError::Request(_))));
    }

    #[tokio::test]
    async fn test_update_with_no_content_succeeds() {
        let (base_url, server) = serve_once("204 No Content", "").await;

        let result = backend(&base_url)
            .update_line("p", "line_0", &FieldUpdate::number("speed_ratio", 1.5))
            .await;

        assert!(result.is_ok());
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /api/projects/p/line/line_0 "));
        assert!(request.contains(r#"{"speed_ratio":1.5}"#));
    }

    #[tokio::test]
    async fn test_update_with_plain_text_body_succeeds() {
        let (base_url, _server) = serve_once("200 OK", "ok").await;

        let result = backend(&base_url)
            .update_speaker("p", "speaker_0", &FieldUpdate::text("name", "Alice"))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_explicitly_rejected() {
        let (base_url, _server) =
            serve_once("200 OK", r#"{"success": false, "message": "locked"}"#).await;

        let result = backend(&base_url)
            .update_line("p", "line_0", &FieldUpdate::text("text", "Hi"))
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(message)) if message == "locked"));
    }

    #[tokio::test]
    async fn test_error_status_uses_detail() {
        let (base_url, _server) =
            serve_once("404 Not Found", r#"{"detail": "Project not found"}"#).await;

        let result = backend(&base_url).load_project("missing").await;

        match result {
            Err(ApiError::Status {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 404);
                assert_eq!(message, "Project not found");
            }
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_error_status_falls_back_to_raw_body() {
        let (base_url, _server) = serve_once("500 Internal Server Error", "boom").await;

        let result = backend(&base_url)
            .update_line("p", "line_0", &FieldUpdate::number("pitch_ratio", 1.2))
            .await;

        match result {
            Err(ApiError::Status {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_projects_decodes_body() {
        let (base_url, _server) = serve_once(
            "200 OK",
            r#"{"projects": [{"id": "abc", "title": "Scene", "created_at": null, "updated_at": null}]}"#,
        )
        .await;

        let projects = backend(&base_url).list_projects().await.unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "abc");
    }
}
