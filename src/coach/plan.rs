//! Personalised workout-plan generation.

use chrono::{DateTime, Utc};

use crate::genai::{GenAiError, GenerateRequest};
use crate::retry::call_with_retry;

use super::{COACH_PERSONA, CoachService};

/// Who the plan is for.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// Free-text training goal ("build strength", "lose weight", …).
    pub goal: String,
    /// Experience level ("beginner", "intermediate", "advanced").
    pub experience: String,
    /// Training days per week, 1..=7.
    pub days_per_week: u8,
    /// Target session length in minutes.
    pub session_minutes: u32,
    /// Equipment the user has access to; empty means bodyweight only.
    pub available_equipment: Vec<String>,
    /// Injuries or other constraints the plan must respect.
    pub constraints: Option<String>,
}

/// A generated plan, Markdown as the model wrote it.
#[derive(Debug, Clone)]
pub struct WorkoutPlan {
    pub markdown: String,
    pub generated_at: DateTime<Utc>,
}

impl UserProfile {
    fn validate(&self) -> Result<(), GenAiError> {
        if self.goal.trim().is_empty() {
            return Err(GenAiError::InvalidInput("training goal must not be empty".into()));
        }
        if !(1..=7).contains(&self.days_per_week) {
            return Err(GenAiError::InvalidInput(format!(
                "days_per_week must be between 1 and 7, got {}",
                self.days_per_week
            )));
        }
        Ok(())
    }

    fn to_prompt(&self) -> String {
        let equipment = if self.available_equipment.is_empty() {
            "bodyweight only".to_string()
        } else {
            self.available_equipment.join(", ")
        };
        let mut prompt = format!(
            "Create a weekly workout plan as Markdown.\n\
             Goal: {}\nExperience: {}\nDays per week: {}\nSession length: {} minutes\n\
             Available equipment: {equipment}\n",
            self.goal, self.experience, self.days_per_week, self.session_minutes
        );
        if let Some(c) = self.constraints.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("Constraints: {c}\n"));
        }
        prompt.push_str(
            "Structure it per training day with exercises, sets, reps, and rest times, \
             and finish with one short recovery tip.",
        );
        prompt
    }
}

impl CoachService {
    /// Generate a workout plan for `profile`.
    pub async fn workout_plan(
        &self,
        profile: &UserProfile,
        on_retry: impl FnMut(u32, u32),
    ) -> Result<WorkoutPlan, GenAiError> {
        profile.validate()?;

        let req = GenerateRequest {
            prompt: profile.to_prompt(),
            system: Some(COACH_PERSONA.to_string()),
            ..GenerateRequest::default()
        };

        let reply = call_with_retry("workout plan", self.policy, on_retry, || {
            let req = req.clone();
            async move { self.provider.generate(req).await }
        })
        .await?;

        Ok(WorkoutPlan { markdown: reply.text, generated_at: Utc::now() })
    }
}
