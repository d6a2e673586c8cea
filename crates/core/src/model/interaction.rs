use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::{LessonId, UserId};
use crate::model::lesson::LessonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    MultipleChoice,
    TrueFalse,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionFeedback {
    pub correct: String,
    pub incorrect: String,
}

/// A question embedded in a lesson, answered by the learner while reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    id: String,
    #[serde(rename = "type")]
    kind: InteractionKind,
    question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    correct_answer: Value,
    feedback: InteractionFeedback,
    position: u32,
}

impl Interaction {
    /// # Errors
    ///
    /// Returns `LessonError::EmptyInteractionId`, `LessonError::EmptyQuestion`
    /// or `LessonError::EmptyFeedback` when the matching field is blank.
    pub fn new(
        id: impl Into<String>,
        kind: InteractionKind,
        question: impl Into<String>,
        correct_answer: Value,
        feedback: InteractionFeedback,
        position: u32,
    ) -> Result<Self, LessonError> {
        let id = id.into().trim().to_owned();
        if id.is_empty() {
            return Err(LessonError::EmptyInteractionId);
        }
        let question = question.into().trim().to_owned();
        if question.is_empty() {
            return Err(LessonError::EmptyQuestion);
        }
        let feedback = InteractionFeedback {
            correct: feedback.correct.trim().to_owned(),
            incorrect: feedback.incorrect.trim().to_owned(),
        };
        if feedback.correct.is_empty() || feedback.incorrect.is_empty() {
            return Err(LessonError::EmptyFeedback);
        }
        Ok(Self {
            id,
            kind,
            question,
            options: Vec::new(),
            correct_answer,
            feedback,
            position,
        })
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Compares a submitted answer with the expected one after normalizing both.
    #[must_use]
    pub fn check(&self, answer: &Value) -> AnswerCheck {
        let is_correct = normalize_answer(answer) == normalize_answer(&self.correct_answer);
        let feedback = if is_correct {
            &self.feedback.correct
        } else {
            &self.feedback.incorrect
        };
        AnswerCheck {
            is_correct,
            feedback: feedback.clone(),
        }
    }
}

/// Outcome of checking one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheck {
    pub is_correct: bool,
    pub feedback: String,
}

/// Canonical text form used to compare answers.
///
/// Booleans become `"true"`/`"false"`, integral numbers drop any fraction
/// suffix, strings are trimmed and lowercased, null is empty.
#[must_use]
pub fn normalize_answer(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && n.is_f64() => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

/// A learner's latest answer to one interaction, with the attempt count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub interaction_id: String,
    pub attempts: u32,
    pub last_answer: Value,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InteractionRecord {
    #[must_use]
    pub fn first_attempt(
        user_id: UserId,
        lesson_id: LessonId,
        interaction_id: impl Into<String>,
        answer: Value,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            interaction_id: interaction_id.into(),
            attempts: 1,
            last_answer: answer,
            is_correct,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_attempt(&mut self, answer: Value, is_correct: bool, now: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_answer = answer;
        self.is_correct = is_correct;
        self.updated_at = now;
    }
}
