//! Dummy backend — canned replies, no network, no API key.
//!
//! Used for tests and keyless demo runs: every operation of the real client
//! has an offline counterpart with a deterministic response. Call counters
//! let tests assert how often the backend was actually hit (e.g. that a
//! cached video URL skipped generation).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{EditedImage, GenAiError, GenerateReply, GenerateRequest, MediaBlob, SourceLink, VideoJob};

/// Canned JSON returned for `json_output` requests — matches the equipment
/// scan contract so coach round-trips parse end to end.
const SCAN_JSON: &str = r#"{
  "equipment": [
    {"name": "Flat bench", "notes": "with barbell rack"},
    {"name": "Dumbbells", "notes": "5-30 kg"}
  ],
  "suggestions": [
    {
      "name": "Bench press",
      "target_muscles": ["chest", "triceps"],
      "equipment": "Flat bench",
      "summary": "Classic horizontal press."
    }
  ]
}"#;

#[derive(Debug, Clone, Default)]
pub struct DummyClient {
    generate_calls: Arc<AtomicUsize>,
    video_starts: Arc<AtomicUsize>,
}

impl DummyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `generate`/`edit_image` round-trips served.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::Relaxed)
    }

    /// Number of video generations started.
    pub fn video_starts(&self) -> usize {
        self.video_starts.load(Ordering::Relaxed)
    }

    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, GenAiError> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        if req.json_output {
            return Ok(GenerateReply { text: SCAN_JSON.to_string(), sources: Vec::new() });
        }
        let sources = if req.grounded {
            vec![SourceLink {
                title: "Example source".into(),
                url: "https://fitness.example/article".into(),
            }]
        } else {
            Vec::new()
        };
        Ok(GenerateReply { text: format!("[coach] {}", req.prompt), sources })
    }

    pub async fn edit_image(
        &self,
        image: MediaBlob,
        _instruction: &str,
    ) -> Result<EditedImage, GenAiError> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        // Echo the input back — enough for round-trip assertions.
        Ok(EditedImage { mime_type: image.mime_type, data: image.data })
    }

    pub async fn start_video(&self, _prompt: &str) -> Result<VideoJob, GenAiError> {
        self.video_starts.fetch_add(1, Ordering::Relaxed);
        Ok(VideoJob { name: "operations/dummy".into(), done: false, uri: None })
    }

    /// Completes on the first poll.
    pub async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, GenAiError> {
        Ok(VideoJob {
            name: job.name.clone(),
            done: true,
            uri: Some("https://video.invalid/demo.mp4".into()),
        })
    }

    pub fn video_url(&self, uri: &str) -> String {
        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_prefixes_coach() {
        let c = DummyClient::new();
        let reply = c.generate(GenerateRequest::text("hello")).await.unwrap();
        assert_eq!(reply.text, "[coach] hello");
        assert_eq!(c.generate_calls(), 1);
    }

    #[tokio::test]
    async fn json_requests_return_parseable_scan() {
        let c = DummyClient::new();
        let mut req = GenerateRequest::text("scan");
        req.json_output = true;
        let reply = c.generate(req).await.unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&reply.text).is_ok());
    }

    #[tokio::test]
    async fn grounded_requests_carry_a_source() {
        let c = DummyClient::new();
        let mut req = GenerateRequest::text("how much protein?");
        req.grounded = true;
        let reply = c.generate(req).await.unwrap();
        assert_eq!(reply.sources.len(), 1);
    }

    #[tokio::test]
    async fn video_completes_on_first_poll() {
        let c = DummyClient::new();
        let job = c.start_video("squat demo").await.unwrap();
        assert!(!job.done);
        let polled = c.poll_video(&job).await.unwrap();
        assert!(polled.done);
        assert!(polled.uri.is_some());
        assert_eq!(c.video_starts(), 1);
    }
}
