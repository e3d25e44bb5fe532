//! Coaching operations — the application layer over the GenAI provider.
//!
//! [`CoachService`] owns the provider, the one shared [`RetryPolicy`], and
//! the generated-video cache. Each operation lives in its own module and is
//! implemented as an `impl CoachService` block there:
//!
//! - [`equipment`] — gym-video equipment scan + exercise suggestions
//! - [`plan`]      — personalised workout plan
//! - [`pose`]      — form feedback on an exercise photo
//! - [`chat`]      — stateful coach chat
//! - [`qa`]        — grounded fitness Q&A with cited sources
//! - [`imaging`]   — image editing by instruction
//! - [`demo`]      — exercise demo video generation with URL caching
//!
//! Every network-calling operation goes through `call_with_retry` and takes
//! a progress observer so front ends can show retry status. Input validation
//! raises `InvalidInput` before any attempt is made.

pub mod chat;
pub mod demo;
pub mod equipment;
pub mod imaging;
pub mod plan;
pub mod pose;
pub mod qa;

pub use chat::ChatSession;
pub use equipment::{EquipmentItem, EquipmentScan, ExerciseSuggestion};
pub use plan::{UserProfile, WorkoutPlan};
pub use qa::GroundedAnswer;

use tokio::sync::Mutex;

use crate::cache::VideoUrlCache;
use crate::genai::Provider;
use crate::retry::RetryPolicy;

/// System prompt fixing the coach persona for every operation.
pub(crate) const COACH_PERSONA: &str = "You are an experienced, encouraging personal fitness \
coach. Be specific and practical. Prioritise safe technique over intensity. Use metric units.";

pub struct CoachService {
    provider: Provider,
    policy: RetryPolicy,
    video_cache: Mutex<VideoUrlCache>,
}

impl CoachService {
    /// Service with the contract retry policy (3 attempts, 2 s base).
    pub fn new(provider: Provider) -> Self {
        Self::with_policy(provider, RetryPolicy::default())
    }

    pub fn with_policy(provider: Provider, policy: RetryPolicy) -> Self {
        Self { provider, policy, video_cache: Mutex::new(VideoUrlCache::new()) }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

/// Strip a Markdown code fence around a model reply, if present.
///
/// Models asked for JSON sometimes wrap it in ```json … ``` anyway.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "markdown", …) up to the first newline.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fence_with_info_string() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn strip_fence_without_info_string() {
        assert_eq!(strip_code_fence("```\nhello\n```"), "hello");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
