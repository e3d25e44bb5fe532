//! Exercise demonstration videos.
//!
//! Generation is a two-phase flow: the start call goes through the bounded
//! retry policy like every other operation, but polling is unbounded — the
//! job runs as long as the backend needs, sampled at a fixed interval. Any
//! polling error surfaces immediately (the provider already reclassifies
//! "entity not found" as a credential failure).
//!
//! Finished URLs land in the case-insensitive video cache so a repeat
//! request for the same movement returns without touching the backend.

use std::time::Duration;

use tracing::{debug, info};

use crate::genai::GenAiError;
use crate::retry::call_with_retry;

use super::CoachService;

/// Fixed pause between status polls of a running video job.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

impl CoachService {
    /// Return a download URL for a demo video of `exercise`, generating one
    /// if it is not cached yet.
    pub async fn demo_video(
        &self,
        exercise: &str,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<String, GenAiError> {
        let exercise = exercise.trim();
        if exercise.is_empty() {
            return Err(GenAiError::InvalidInput("exercise name must not be empty".into()));
        }

        {
            let cache = self.video_cache.lock().await;
            if let Some(url) = cache.get(exercise) {
                debug!(%exercise, "demo video cache hit");
                return Ok(url.to_string());
            }
        }

        let prompt = format!(
            "A clear tutorial video of a personal trainer demonstrating the exercise \
             \"{exercise}\" with perfect form, neutral gym background, side view."
        );

        let mut job = call_with_retry("demo video", self.policy, on_retry, || {
            let prompt = prompt.clone();
            async move { self.provider.start_video(&prompt).await }
        })
        .await?;

        while !job.done {
            tokio::time::sleep(POLL_INTERVAL).await;
            job = self.provider.poll_video(&job).await?;
        }

        let uri = job
            .uri
            .ok_or_else(|| GenAiError::Request("video generation finished without a video".into()))?;
        let url = self.provider.video_url(&uri);

        info!(%exercise, "demo video ready");
        self.video_cache.lock().await.insert(exercise, url.clone());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::{Provider, dummy::DummyClient};
    use crate::retry::no_progress;

    #[tokio::test(start_paused = true)]
    async fn demo_video_generates_then_caches() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));

        let first = svc.demo_video("Goblet Squat", no_progress).await.unwrap();
        assert_eq!(first, "https://video.invalid/demo.mp4");

        // Second call, different case: served from cache, no new generation.
        let second = svc.demo_video("goblet squat", no_progress).await.unwrap();
        assert_eq!(first, second);

        let Provider::Dummy(d) = svc.provider() else { unreachable!() };
        assert_eq!(d.video_starts(), 1);
    }

    #[tokio::test]
    async fn blank_exercise_rejected() {
        let svc = CoachService::new(Provider::Dummy(DummyClient::new()));
        let err = svc.demo_video("", no_progress).await.unwrap_err();
        assert!(matches!(err, GenAiError::InvalidInput(_)));
    }
}
