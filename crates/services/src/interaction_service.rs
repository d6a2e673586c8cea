use std::sync::Arc;

use lingua_core::model::{LessonId, UserId};
use serde_json::Value;
use storage::repository::{InteractionRepository, LessonCatalog};
use tracing::info;

use crate::Clock;
use crate::error::InteractionError;

/// Result of one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub is_correct: bool,
    pub feedback: String,
    /// Answers this learner has given to the interaction so far, this one included.
    pub attempts: u32,
}

/// Checks answers to lesson questions and records them per learner.
#[derive(Clone)]
pub struct InteractionService {
    clock: Clock,
    lessons: Arc<dyn LessonCatalog>,
    interactions: Arc<dyn InteractionRepository>,
}

impl InteractionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonCatalog>,
        interactions: Arc<dyn InteractionRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            interactions,
        }
    }

    /// # Errors
    ///
    /// Returns `InteractionError::EmptyInteractionId` for a blank id,
    /// `InteractionError::LessonNotFound` or `InteractionError::InteractionNotFound`
    /// when the question does not exist, or `InteractionError::Storage`.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        interaction_id: &str,
        answer: &Value,
    ) -> Result<SubmittedAnswer, InteractionError> {
        let interaction_id = interaction_id.trim();
        if interaction_id.is_empty() {
            return Err(InteractionError::EmptyInteractionId);
        }

        let lesson = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(InteractionError::LessonNotFound)?;
        let check = lesson
            .interaction(interaction_id)
            .ok_or(InteractionError::InteractionNotFound)?
            .check(answer);

        let record = self
            .interactions
            .record_answer(
                user_id,
                lesson_id,
                interaction_id,
                answer,
                check.is_correct,
                self.clock.now(),
            )
            .await?;

        info!(
            event = "interaction_answered",
            user_id = %user_id,
            lesson_id = %lesson_id,
            interaction_id,
            is_correct = check.is_correct,
            attempts = record.attempts,
        );
        Ok(SubmittedAnswer {
            is_correct: check.is_correct,
            feedback: check.feedback,
            attempts: record.attempts,
        })
    }
}
