//! HTTP client for the workflow backend that performs generation.
//!
//! The backend exposes one webhook per artifact kind. All of them take a JSON
//! `POST` body:
//!
//! | Endpoint           | Body               | Answer                                  |
//! |--------------------|--------------------|-----------------------------------------|
//! | `/course-draft`    | `{topic}`          | draft JSON (bare or in a 1-element list)|
//! | `/course-icon`     | `{title, description, tags}` | image bytes or image JSON     |
//! | `/lecture-content` | [`LectureRequest`] | lecture JSON, or raw HTML / text        |
//! | `/lecture-image`   | [`LectureRequest`] | image bytes or image JSON               |
//!
//! Image JSON is `{"image": <base64 or data URI>, "mimeType": "image/png"}`.
//!
//! Every request carries the configured timeout; expiry is reported as
//! [`GenerationError::Timeout`] and nothing is retried.

use super::{GenerationService, LectureRequest};
use crate::core::GenerationError;
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact};
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Serialize)]
struct DraftBody<'a> {
    topic: &'a str,
}

#[derive(Serialize)]
struct IconBody<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageBody {
    image: String,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Either a single value or a list whose first element is the value.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrList<T> {
    One(T),
    List(Vec<T>),
}

impl<T> OneOrList<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Self::One(value) => Some(value),
            Self::List(values) => values.into_iter().next(),
        }
    }
}

/// [`GenerationService`] talking to the workflow backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpGenerationService {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (TLS backend missing).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("musai/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        self
    }

    /// Backend base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, GenerationError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(target: "http", "POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        Ok(response)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, GenerationError> {
        let bytes = self
            .post(endpoint, body)
            .await?
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let value: OneOrList<T> =
            serde_json::from_slice(&bytes).map_err(|e| GenerationError::InvalidResponse {
                reason: e.to_string(),
            })?;
        value.into_first().ok_or_else(|| GenerationError::InvalidResponse {
            reason: "empty list".to_string(),
        })
    }

    async fn post_image<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<ImageArtifact, GenerationError> {
        let response = self.post(endpoint, body).await?;
        let content_type = content_type(&response);
        let bytes = response.bytes().await.map_err(|e| self.transport_error(&e))?;

        if content_type.starts_with("image/") {
            return Ok(ImageArtifact::new(content_type, bytes.to_vec()));
        }

        let body: OneOrList<ImageBody> =
            serde_json::from_slice(&bytes).map_err(|e| GenerationError::InvalidResponse {
                reason: format!("expected image bytes or image JSON: {e}"),
            })?;
        let body = body.into_first().ok_or_else(|| GenerationError::InvalidResponse {
            reason: "empty list".to_string(),
        })?;
        decode_image(&body)
    }

    fn transport_error(&self, error: &reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Request {
                reason: error.to_string(),
            }
        }
    }
}

fn content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
        .unwrap_or_default()
}

fn decode_image(body: &ImageBody) -> Result<ImageArtifact, GenerationError> {
    if let Some(image) = ImageArtifact::from_data_uri(&body.image) {
        return Ok(image);
    }
    let data = base64::engine::general_purpose::STANDARD.decode(body.image.trim()).map_err(
        |e| GenerationError::InvalidResponse {
            reason: format!("image is neither a data URI nor base64: {e}"),
        },
    )?;
    let mime = body.mime_type.as_deref().unwrap_or_default();
    Ok(ImageArtifact::new(mime, data))
}

impl GenerationService for HttpGenerationService {
    async fn generate_draft(&self, topic: &str) -> Result<CourseDraft, GenerationError> {
        self.post_json("course-draft", &DraftBody {
            topic,
        })
        .await
    }

    async fn generate_icon(&self, draft: &CourseDraft) -> Result<ImageArtifact, GenerationError> {
        self.post_image("course-icon", &IconBody {
            title: &draft.title,
            description: &draft.description,
            tags: &draft.tags,
        })
        .await
    }

    async fn generate_lecture(
        &self,
        request: &LectureRequest,
    ) -> Result<LectureArtifact, GenerationError> {
        let response = self.post("lecture-content", request).await?;
        let content_type = content_type(&response);
        let text = response.text().await.map_err(|e| self.transport_error(&e))?;

        match content_type.as_str() {
            "text/html" => Ok(LectureArtifact::new(&request.lecture_title, text, true)),
            "text/plain" | "text/markdown" => {
                Ok(LectureArtifact::new(&request.lecture_title, text, false))
            }
            _ => {
                let value: OneOrList<LectureArtifact> = serde_json::from_str(&text).map_err(|e| {
                    GenerationError::InvalidResponse {
                        reason: e.to_string(),
                    }
                })?;
                value.into_first().ok_or_else(|| GenerationError::InvalidResponse {
                    reason: "empty list".to_string(),
                })
            }
        }
    }

    async fn generate_lecture_image(
        &self,
        request: &LectureRequest,
    ) -> Result<ImageArtifact, GenerationError> {
        self.post_image("lecture-image", request).await
    }
}
