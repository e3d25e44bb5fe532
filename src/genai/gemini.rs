//! Gemini REST backend (`:generateContent`, `:predictLongRunning`).
//!
//! Exposes the same operation set as the rest of the [`Provider`] abstraction.
//! All Gemini wire types are private to this module — callers never see them.
//!
//! This module is also the classification boundary: every failure leaving it
//! is a [`GenAiError`] whose variant the retry layer can switch on. HTTP
//! status codes are mapped structurally where possible; the backend's
//! free-text error messages are sniffed in [`classify`] as a fallback,
//! because that text is the only signal some failure modes carry.
//!
//! [`Provider`]: super::Provider

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::{
    ChatTurn, EditedImage, GenAiError, GenerateReply, GenerateRequest, MediaBlob, Role,
    SourceLink, VideoJob,
};

// ── Public client ─────────────────────────────────────────────────────────────

/// Client for the Gemini generative-language REST API.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_base_url: String,
    text_model: String,
    image_model: String,
    video_model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from config values and the API key.
    ///
    /// The key is sent as `x-goog-api-key` on every request.
    pub fn new(
        api_base_url: String,
        text_model: String,
        image_model: String,
        video_model: String,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, GenAiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GenAiError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, text_model, image_model, video_model, api_key })
    }

    /// One `:generateContent` round-trip against the text model.
    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, GenAiError> {
        let payload = WireRequest::from_request(&req);
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base_url, self.text_model
        );
        let parsed: WireResponse = self.post_json(&url, &payload).await?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenAiError::Request("no candidates in response".into()))?;

        let text = candidate.content.text();
        if text.is_empty() {
            return Err(GenAiError::Request("empty or missing content in response".into()));
        }

        let sources = candidate
            .grounding_metadata
            .map(|m| m.sources())
            .unwrap_or_default();

        Ok(GenerateReply { text, sources })
    }

    /// Edit `image` per `instruction` using the image model.
    pub async fn edit_image(
        &self,
        image: MediaBlob,
        instruction: &str,
    ) -> Result<EditedImage, GenAiError> {
        let req = GenerateRequest {
            prompt: instruction.to_string(),
            media: vec![image],
            ..GenerateRequest::default()
        };
        let payload = WireRequest::from_request(&req);
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base_url, self.image_model
        );
        let parsed: WireResponse = self.post_json(&url, &payload).await?;

        let inline = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.inline_data))
            .ok_or_else(|| GenAiError::Request("model returned no image".into()))?;

        let data = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|e| GenAiError::Request(format!("malformed image payload: {e}")))?;

        Ok(EditedImage { mime_type: inline.mime_type, data })
    }

    /// Start a long-running video generation job (`:predictLongRunning`).
    pub async fn start_video(&self, prompt: &str) -> Result<VideoJob, GenAiError> {
        let payload = PredictRequest {
            instances: vec![PredictInstance { prompt: prompt.to_string() }],
            parameters: PredictParameters { number_of_videos: 1 },
        };
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.api_base_url, self.video_model
        );
        let parsed: OperationState = self.post_json(&url, &payload).await?;
        debug!(operation = %parsed.name, "video generation started");
        Ok(VideoJob { name: parsed.name, done: parsed.done, uri: None })
    }

    /// Fetch the current state of a video job.
    ///
    /// A backend "requested entity was not found" here means the key no
    /// longer grants access to the operation — reclassified as `Auth` so the
    /// caller prompts for re-authentication instead of showing a dead error.
    pub async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, GenAiError> {
        let url = format!("{}/{}", self.api_base_url, job.name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| reclassify_not_found(transport_error(&url, e)))?;

        let response = check_status(response).await.map_err(reclassify_not_found)?;
        let parsed = response
            .json::<OperationState>()
            .await
            .map_err(|e| GenAiError::Request(format!("failed to parse operation state: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(reclassify_not_found(classify(&err.message)));
        }

        let uri = parsed.response.and_then(|r| r.first_video_uri());
        trace!(operation = %parsed.name, done = parsed.done, has_uri = uri.is_some(), "poll state");
        Ok(VideoJob { name: parsed.name, done: parsed.done, uri })
    }

    /// The download URI from the backend requires the API key as a query
    /// parameter to be fetchable.
    pub fn video_url(&self, uri: &str) -> String {
        if uri.contains('?') {
            format!("{uri}&key={}", self.api_key)
        } else {
            format!("{uri}?key={}", self.api_key)
        }
    }

    /// POST `payload` as JSON and deserialize the successful response body.
    async fn post_json<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &P,
    ) -> Result<R, GenAiError> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(%url, payload = %json, "full request payload");
        }

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let response = check_status(response).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| GenAiError::Request(format!("failed to parse response body: {e}")))
    }
}

// ── Error classification ──────────────────────────────────────────────────────

/// Markers the backend puts in credential-failure messages.
const AUTH_MARKERS: &[&str] = &["api key not valid", "api_key_invalid", "api key expired"];
/// Markers indicating temporary unavailability, safe to retry.
const OVERLOAD_MARKERS: &[&str] = &["503", "overloaded", "unavailable"];
/// Seen from the operations endpoint when the key loses access mid-poll.
const NOT_FOUND_MARKER: &str = "requested entity was not found";

/// Map a raw backend failure message onto a [`GenAiError`] variant.
///
/// Lower-cases the message and tests substrings — fragile by nature, but the
/// backend's free text is the only signal these failure modes carry. Callers
/// that can see an HTTP status classify on that first (see [`check_status`]).
pub(crate) fn classify(message: &str) -> GenAiError {
    let lower = message.to_lowercase();
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        GenAiError::Auth(message.to_string())
    } else if OVERLOAD_MARKERS.iter().any(|m| lower.contains(m)) {
        GenAiError::Overloaded(message.to_string())
    } else {
        GenAiError::Request(message.to_string())
    }
}

/// Polling-flow refinement: "entity not found" means the credential no
/// longer grants access to the operation.
pub(crate) fn reclassify_not_found(err: GenAiError) -> GenAiError {
    if err.message().to_lowercase().contains(NOT_FOUND_MARKER) {
        GenAiError::Auth(err.message().to_string())
    } else {
        err
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> GenAiError {
    error!(%url, error = %e, "HTTP request failed (transport)");
    classify(&e.to_string())
}

// Error envelope used by the generative-language API.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Consume the response and return it if successful, or a classified error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenAiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let tag = env.error.status.map(|s| format!(" [{s}]")).unwrap_or_default();
        format!("HTTP {status}{tag}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "request returned HTTP error");

    // Status codes classify structurally; the message text is the fallback.
    match status.as_u16() {
        401 | 403 => Err(GenAiError::Auth(message)),
        429 | 503 => Err(GenAiError::Overloaded(message)),
        _ => Err(classify(&message)),
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl WireRequest {
    fn from_request(req: &GenerateRequest) -> Self {
        let mut contents: Vec<Content> = req
            .history
            .iter()
            .map(|t: &ChatTurn| Content {
                role: match t.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
                parts: vec![Part::text(&t.text)],
            })
            .collect();

        let mut parts: Vec<Part> = req.media.iter().map(Part::inline).collect();
        parts.push(Part::text(&req.prompt));
        contents.push(Content { role: "user".to_string(), parts });

        Self {
            contents,
            system_instruction: req.system.as_deref().map(|s| SystemInstruction {
                parts: vec![Part::text(s)],
            }),
            tools: if req.grounded {
                vec![Tool { google_search: GoogleSearch {} }]
            } else {
                Vec::new()
            },
            generation_config: req.json_output.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    /// All text parts joined — the backend may split one reply across parts.
    fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(s: &str) -> Self {
        Self { text: Some(s.to_string()), inline_data: None }
    }

    fn inline(blob: &MediaBlob) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: blob.mime_type.clone(),
                data: BASE64.encode(&blob.data),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

impl GroundingMetadata {
    /// Extract deduplicated web sources, preserving first-seen order.
    fn sources(self) -> Vec<SourceLink> {
        let mut seen = std::collections::HashSet::new();
        self.grounding_chunks
            .into_iter()
            .filter_map(|c| c.web)
            .filter(|w| seen.insert(w.uri.clone()))
            .map(|w| SourceLink {
                title: if w.title.is_empty() { w.uri.clone() } else { w.title },
                url: w.uri,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    number_of_videos: u32,
}

#[derive(Debug, Deserialize)]
struct OperationState {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<OperationResponse>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

impl OperationResponse {
    fn first_video_uri(self) -> Option<String> {
        self.generate_video_response?
            .generated_samples
            .into_iter()
            .next()
            .map(|s| s.video.uri)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: VideoRef,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: String,
}
