//! Image editing by instruction.

use crate::genai::{EditedImage, GenAiError, MediaBlob};
use crate::retry::call_with_retry;

use super::CoachService;

impl CoachService {
    /// Apply `instruction` to `image` and return the edited result.
    pub async fn edit_image(
        &self,
        image: MediaBlob,
        instruction: &str,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<EditedImage, GenAiError> {
        if image.data.is_empty() {
            return Err(GenAiError::InvalidInput("image payload is empty".into()));
        }
        if !image.mime_type.starts_with("image/") {
            return Err(GenAiError::InvalidInput(format!(
                "expected an image payload, got '{}'",
                image.mime_type
            )));
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(GenAiError::InvalidInput("edit instruction must not be empty".into()));
        }

        call_with_retry("image edit", self.policy, on_retry, || {
            let image = image.clone();
            async move { self.provider.edit_image(image, instruction).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::{Provider, dummy::DummyClient};
    use crate::retry::no_progress;

    #[tokio::test]
    async fn edit_round_trip() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let image = MediaBlob { mime_type: "image/png".into(), data: vec![1, 2, 3] };
        let edited = svc.edit_image(image, "brighten the background", no_progress).await.unwrap();
        assert_eq!(edited.mime_type, "image/png");
        assert_eq!(edited.data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_instruction_rejected() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let image = MediaBlob { mime_type: "image/png".into(), data: vec![1] };
        let err = svc.edit_image(image, " ", no_progress).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidInput(_)));
    }
}
