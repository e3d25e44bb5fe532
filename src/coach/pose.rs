//! Form feedback on an exercise photo.

use crate::genai::{GenAiError, GenerateRequest, MediaBlob};
use crate::retry::call_with_retry;

use super::{COACH_PERSONA, CoachService};

impl CoachService {
    /// Analyse `photo` of the user performing `exercise` and return
    /// corrective feedback.
    pub async fn pose_feedback(
        &self,
        photo: MediaBlob,
        exercise: &str,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<String, GenAiError> {
        if photo.data.is_empty() {
            return Err(GenAiError::InvalidInput("photo payload is empty".into()));
        }
        if !photo.mime_type.starts_with("image/") {
            return Err(GenAiError::InvalidInput(format!(
                "expected an image payload, got '{}'",
                photo.mime_type
            )));
        }
        let exercise = exercise.trim();
        if exercise.is_empty() {
            return Err(GenAiError::InvalidInput("exercise name must not be empty".into()));
        }

        let req = GenerateRequest {
            prompt: format!(
                "This photo shows me performing: {exercise}. Assess my form. Point out what is \
                 correct, what needs fixing, and the single most important correction to make \
                 first. If the photo does not show this exercise, say so."
            ),
            media: vec![photo],
            system: Some(COACH_PERSONA.to_string()),
            ..GenerateRequest::default()
        };

        let reply = call_with_retry("pose feedback", self.policy, on_retry, || {
            let req = req.clone();
            async move { self.provider.generate(req).await }
        })
        .await?;

        Ok(reply.text)
    }
}
