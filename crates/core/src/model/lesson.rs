use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{LessonId, SectionId};
use crate::model::interaction::Interaction;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson text content cannot be empty")]
    EmptyTextContent,

    #[error("section title cannot be empty")]
    EmptySectionTitle,

    #[error("interaction id cannot be empty")]
    EmptyInteractionId,

    #[error("interaction question cannot be empty")]
    EmptyQuestion,

    #[error("interaction feedback cannot be empty")]
    EmptyFeedback,

    #[error("duplicate interaction id: {0}")]
    DuplicateInteraction(String),
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A canonical lesson stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    id: LessonId,
    title: String,
    text_content: String,
    interactions: Vec<Interaction>,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a lesson, trimming title and text.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` or `LessonError::EmptyTextContent`
    /// when either field is blank after trimming.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        text_content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        let text_content = text_content.into().trim().to_owned();
        if text_content.is_empty() {
            return Err(LessonError::EmptyTextContent);
        }
        Ok(Self {
            id,
            title,
            text_content,
            interactions: Vec::new(),
            created_at,
        })
    }

    /// Attaches the lesson's questions, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::DuplicateInteraction` if two interactions share an id.
    pub fn with_interactions(
        mut self,
        mut interactions: Vec<Interaction>,
    ) -> Result<Self, LessonError> {
        let mut seen = HashSet::new();
        for interaction in &interactions {
            if !seen.insert(interaction.id()) {
                return Err(LessonError::DuplicateInteraction(interaction.id().to_owned()));
            }
        }
        interactions.sort_by_key(Interaction::position);
        self.interactions = interactions;
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn text_content(&self) -> &str {
        &self.text_content
    }

    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    #[must_use]
    pub fn interaction(&self, id: &str) -> Option<&Interaction> {
        self.interactions.iter().find(|i| i.id() == id)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// An ordered step inside a lesson. The lowest `order` is where a learner starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSection {
    id: SectionId,
    lesson_id: LessonId,
    order: u32,
    title: String,
}

impl LessonSection {
    /// # Errors
    ///
    /// Returns `LessonError::EmptySectionTitle` for a blank title.
    pub fn new(
        id: SectionId,
        lesson_id: LessonId,
        order: u32,
        title: impl Into<String>,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptySectionTitle);
        }
        Ok(Self {
            id,
            lesson_id,
            order,
            title,
        })
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}
