//! Generative-AI provider abstraction.
//!
//! `Provider` is an enum over concrete backends. Enum dispatch avoids
//! `dyn` trait objects and the `async-trait` dependency; adding a backend
//! = new module + new variant + new match arm in each operation.
//!
//! Provider instances are shared immutable capabilities — clone them freely
//! (`reqwest::Client` is an `Arc` internally).
//!
//! [`GenAiError`] is the structured failure type every backend must produce.
//! The retry layer switches on its variants, never on message text —
//! classification of raw backend messages happens once, at the client
//! boundary (`gemini::classify`).

pub mod dummy;
pub mod gemini;

use thiserror::Error;

use crate::config::GenAiConfig;

// ── Error ─────────────────────────────────────────────────────────────────────

/// Failure of a generative-AI call, tagged by how the caller should react.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// API key missing, invalid, or rejected. Never resolved by retrying;
    /// callers should prompt for re-authentication.
    #[error("credential rejected: {0}")]
    Auth(String),

    /// Backend signalled temporary unavailability. Safe to retry after a delay.
    #[error("{0}")]
    Overloaded(String),

    /// Malformed input detected before any network attempt was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything else. Not retried; the message is suitable for display.
    #[error("{0}")]
    Request(String),
}

impl GenAiError {
    /// The raw message carried by any variant.
    pub fn message(&self) -> &str {
        match self {
            GenAiError::Auth(m)
            | GenAiError::Overloaded(m)
            | GenAiError::InvalidInput(m)
            | GenAiError::Request(m) => m,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GenAiError::Auth(_))
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self, GenAiError::Overloaded(_))
    }
}

// ── Shared request/response types ─────────────────────────────────────────────

/// Raw media payload sent inline with a generation request.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One prior exchange replayed with a chat request.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// A single text-out generation request.
///
/// `history` carries prior chat turns (oldest first); `prompt` is the final
/// user message. `json_output` asks the model for a JSON response body;
/// `grounded` enables web-search grounding and source extraction.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub media: Vec<MediaBlob>,
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub json_output: bool,
    pub grounded: bool,
}

impl Default for MediaBlob {
    fn default() -> Self {
        Self { mime_type: "application/octet-stream".into(), data: Vec::new() }
    }
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Self::default() }
    }
}

/// A cited web source attached to a grounded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// Text reply, plus any grounding sources the backend attached.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub text: String,
    pub sources: Vec<SourceLink>,
}

/// Result of an image-editing request.
#[derive(Debug, Clone)]
pub struct EditedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// State of a long-running video-generation job.
#[derive(Debug, Clone)]
pub struct VideoJob {
    /// Backend operation name, used to poll for completion.
    pub name: String,
    pub done: bool,
    /// Download URI, present once `done` is set and generation succeeded.
    pub uri: Option<String>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available generative-AI backends.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(gemini::GeminiClient),
    Dummy(dummy::DummyClient),
}

impl Provider {
    /// One text-out round-trip (vision inputs and grounding included).
    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, GenAiError> {
        match self {
            Provider::Gemini(c) => c.generate(req).await,
            Provider::Dummy(c) => c.generate(req).await,
        }
    }

    /// Edit `image` according to `instruction`; returns the edited image.
    pub async fn edit_image(
        &self,
        image: MediaBlob,
        instruction: &str,
    ) -> Result<EditedImage, GenAiError> {
        match self {
            Provider::Gemini(c) => c.edit_image(image, instruction).await,
            Provider::Dummy(c) => c.edit_image(image, instruction).await,
        }
    }

    /// Start a long-running video generation job.
    pub async fn start_video(&self, prompt: &str) -> Result<VideoJob, GenAiError> {
        match self {
            Provider::Gemini(c) => c.start_video(prompt).await,
            Provider::Dummy(c) => c.start_video(prompt).await,
        }
    }

    /// Fetch the current state of a video job.
    pub async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, GenAiError> {
        match self {
            Provider::Gemini(c) => c.poll_video(job).await,
            Provider::Dummy(c) => c.poll_video(job).await,
        }
    }

    /// Turn a job's download URI into a directly fetchable URL.
    pub fn video_url(&self, uri: &str) -> String {
        match self {
            Provider::Gemini(c) => c.video_url(uri),
            Provider::Dummy(c) => c.video_url(uri),
        }
    }
}

/// Construct a [`Provider`] from config and an optional API key.
///
/// `api_key` is sourced from `GENAI_API_KEY` env (never TOML) and is `None`
/// only for the dummy backend.
pub fn build(config: &GenAiConfig, api_key: Option<String>) -> Result<Provider, GenAiError> {
    match config.provider.as_str() {
        "dummy" => Ok(Provider::Dummy(dummy::DummyClient::new())),
        "gemini" => {
            let g = &config.gemini;
            let key = api_key.ok_or_else(|| {
                GenAiError::Auth("GENAI_API_KEY is not set — the gemini backend requires it".into())
            })?;
            let c = gemini::GeminiClient::new(
                g.api_base_url.clone(),
                g.text_model.clone(),
                g.image_model.clone(),
                g.video_model.clone(),
                g.timeout_seconds,
                key,
            )?;
            Ok(Provider::Gemini(c))
        }
        other => Err(GenAiError::Request(format!("unknown genai provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(provider: &str) -> GenAiConfig {
        let mut cfg = GenAiConfig::default();
        cfg.provider = provider.to_string();
        cfg
    }

    #[test]
    fn build_dummy_needs_no_key() {
        let p = build(&test_config("dummy"), None).unwrap();
        assert!(matches!(p, Provider::Dummy(_)));
    }

    #[test]
    fn build_gemini_without_key_is_auth_error() {
        let err = build(&test_config("gemini"), None).unwrap_err();
        assert!(err.is_auth(), "expected Auth, got: {err:?}");
    }

    #[test]
    fn build_unknown_provider_errors() {
        let err = build(&test_config("gpt-42"), None).unwrap_err();
        assert!(err.to_string().contains("unknown genai provider"));
    }

    #[test]
    fn error_message_accessor_matches_display_payload() {
        let e = GenAiError::Overloaded("busy".into());
        assert_eq!(e.message(), "busy");
        assert!(e.is_overloaded());
        assert!(!e.is_auth());
    }
}
