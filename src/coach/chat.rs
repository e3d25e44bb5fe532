//! Stateful coach chat.
//!
//! [`ChatSession`] holds the full turn history and replays it on every
//! request — the backend is stateless. History is only extended after a
//! successful reply, so a failed attempt leaves the session unchanged and
//! a "try again" simply re-sends the same message.

use uuid::Uuid;

use crate::genai::{ChatTurn, GenAiError, GenerateRequest, Role};
use crate::retry::call_with_retry;

use super::{COACH_PERSONA, CoachService};

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), turns: Vec::new() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Prior turns, oldest first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CoachService {
    /// Send `message` in `session` and return the coach's reply.
    pub async fn chat(
        &self,
        session: &mut ChatSession,
        message: &str,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<String, GenAiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(GenAiError::InvalidInput("message must not be empty".into()));
        }

        let req = GenerateRequest {
            prompt: message.to_string(),
            system: Some(COACH_PERSONA.to_string()),
            history: session.turns.clone(),
            ..GenerateRequest::default()
        };

        let reply = call_with_retry("coach chat", self.policy, on_retry, || {
            let req = req.clone();
            async move { self.provider.generate(req).await }
        })
        .await?;

        session.turns.push(ChatTurn { role: Role::User, text: message.to_string() });
        session.turns.push(ChatTurn { role: Role::Model, text: reply.text.clone() });

        Ok(reply.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::{Provider, dummy::DummyClient};
    use crate::retry::no_progress;

    #[tokio::test]
    async fn chat_accumulates_history() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let mut session = ChatSession::new();

        let first = svc.chat(&mut session, "How often should I squat?", no_progress).await.unwrap();
        assert!(first.contains("squat"));
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.turns()[1].role, Role::Model);

        svc.chat(&mut session, "And deadlift?", no_progress).await.unwrap();
        assert_eq!(session.turns().len(), 4);
    }

    #[tokio::test]
    async fn empty_message_leaves_session_untouched() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let mut session = ChatSession::new();
        let err = svc.chat(&mut session, "  ", no_progress).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidInput(_)));
        assert!(session.turns().is_empty());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(ChatSession::new().id(), ChatSession::new().id());
    }
}
