//! Grounded fitness Q&A — answers cite web sources.

use crate::genai::{GenAiError, GenerateRequest, SourceLink};
use crate::retry::call_with_retry;

use super::{COACH_PERSONA, CoachService};

/// Answer plus the web sources the backend grounded it on.
#[derive(Debug, Clone)]
pub struct GroundedAnswer {
    pub answer: String,
    pub sources: Vec<SourceLink>,
}

impl CoachService {
    /// Answer a fitness question with web-search grounding.
    pub async fn ask(
        &self,
        question: &str,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<GroundedAnswer, GenAiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GenAiError::InvalidInput("question must not be empty".into()));
        }

        let req = GenerateRequest {
            prompt: question.to_string(),
            system: Some(COACH_PERSONA.to_string()),
            grounded: true,
            ..GenerateRequest::default()
        };

        let reply = call_with_retry("fitness question", self.policy, on_retry, || {
            let req = req.clone();
            async move { self.provider.generate(req).await }
        })
        .await?;

        Ok(GroundedAnswer { answer: reply.text, sources: reply.sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::{Provider, dummy::DummyClient};
    use crate::retry::no_progress;

    #[tokio::test]
    async fn ask_returns_answer_with_sources() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let got = svc.ask("How much protein per day?", no_progress).await.unwrap();
        assert!(got.answer.contains("protein"));
        assert_eq!(got.sources.len(), 1);
        assert!(got.sources[0].url.starts_with("https://"));
    }

    #[tokio::test]
    async fn empty_question_rejected() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let err = svc.ask("", no_progress).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidInput(_)));
    }
}
