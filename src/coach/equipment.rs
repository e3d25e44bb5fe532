//! Gym-video equipment scan.
//!
//! The model receives the uploaded video inline plus a JSON contract prompt;
//! the reply is parsed into [`EquipmentScan`]. Parsing failures are surfaced
//! as unclassified errors — they are not retried, since resending the same
//! video would most likely reproduce the same malformed reply.

use serde::Deserialize;

use crate::genai::{GenAiError, GenerateRequest, MediaBlob};
use crate::retry::call_with_retry;

use super::{COACH_PERSONA, CoachService, strip_code_fence};

const SCAN_PROMPT: &str = "Watch this gym video and identify every piece of exercise equipment \
visible. Then suggest exercises that can be performed with it. Reply with JSON only, matching: \
{\"equipment\": [{\"name\": string, \"notes\": string|null}], \
\"suggestions\": [{\"name\": string, \"target_muscles\": [string], \
\"equipment\": string, \"summary\": string}]}";

/// A piece of equipment identified in the video.
#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentItem {
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An exercise the model suggests for the identified equipment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseSuggestion {
    pub name: String,
    #[serde(default)]
    pub target_muscles: Vec<String>,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub summary: String,
}

/// Parsed result of a gym-video scan.
#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentScan {
    #[serde(default)]
    pub equipment: Vec<EquipmentItem>,
    #[serde(default)]
    pub suggestions: Vec<ExerciseSuggestion>,
}

impl CoachService {
    /// Identify equipment in `video` and suggest exercises for it.
    pub async fn scan_equipment(
        &self,
        video: MediaBlob,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<EquipmentScan, GenAiError> {
        if video.data.is_empty() {
            return Err(GenAiError::InvalidInput("video payload is empty".into()));
        }
        if !video.mime_type.starts_with("video/") {
            return Err(GenAiError::InvalidInput(format!(
                "expected a video payload, got '{}'",
                video.mime_type
            )));
        }

        let req = GenerateRequest {
            prompt: SCAN_PROMPT.to_string(),
            media: vec![video],
            system: Some(COACH_PERSONA.to_string()),
            json_output: true,
            ..GenerateRequest::default()
        };

        let reply = call_with_retry("equipment scan", self.policy, on_retry, || {
            let req = req.clone();
            async move { self.provider.generate(req).await }
        })
        .await?;

        serde_json::from_str(strip_code_fence(&reply.text)).map_err(|e| {
            GenAiError::Request(format!("could not parse equipment scan reply: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::{Provider, dummy::DummyClient};
    use crate::retry::no_progress;

    fn service() -> CoachService {
        CoachService::new(Provider::Dummy(DummyClient::new()))
    }

    fn video(data: &[u8]) -> MediaBlob {
        MediaBlob { mime_type: "video/mp4".into(), data: data.to_vec() }
    }

    #[tokio::test]
    async fn empty_video_is_invalid_input_before_any_call() {
        let svc = service();
        let err = svc.scan_equipment(video(&[]), no_progress).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidInput(_)));
        // The backend was never reached.
        let Provider::Dummy(d) = svc.provider() else { unreachable!() };
        assert_eq!(d.generate_calls(), 0);
    }

    #[tokio::test]
    async fn non_video_mime_rejected() {
        let svc = service();
        let blob = MediaBlob { mime_type: "image/png".into(), data: vec![1] };
        let err = svc.scan_equipment(blob, no_progress).await.unwrap_err();
        assert!(err.to_string().contains("expected a video payload"));
    }

    #[tokio::test]
    async fn scan_parses_model_json() {
        let svc = service();
        let scan = svc.scan_equipment(video(&[0xff; 16]), no_progress).await.unwrap();
        assert!(!scan.equipment.is_empty());
        assert!(!scan.suggestions.is_empty());
        assert_eq!(scan.suggestions[0].name, "Bench press");
    }

    #[test]
    fn scan_parses_fenced_and_partial_json() {
        let fenced = "```json\n{\"equipment\": [{\"name\": \"Kettlebell\"}]}\n```";
        let scan: EquipmentScan =
            serde_json::from_str(strip_code_fence(fenced)).unwrap();
        assert_eq!(scan.equipment[0].name, "Kettlebell");
        assert!(scan.equipment[0].notes.is_none());
        assert!(scan.suggestions.is_empty());
    }
}
