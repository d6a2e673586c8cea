use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyName,

    #[error("unknown learning condition: {0}")]
    UnknownCondition(String),
}

/// Learning profile that selects the condition-specific lesson experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningCondition {
    Dyslexia,
    Adhd,
    Autism,
    None,
}

impl LearningCondition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dyslexia => "dyslexia",
            Self::Adhd => "adhd",
            Self::Autism => "autism",
            Self::None => "none",
        }
    }
}

impl fmt::Display for LearningCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningCondition {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dyslexia" => Ok(Self::Dyslexia),
            "adhd" => Ok(Self::Adhd),
            "autism" => Ok(Self::Autism),
            "none" => Ok(Self::None),
            other => Err(UserError::UnknownCondition(other.to_owned())),
        }
    }
}

/// A learner account as far as progress tracking is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    learning_condition: LearningCondition,
    created_at: DateTime<Utc>,
}

impl User {
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` for a blank name.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        learning_condition: LearningCondition,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            learning_condition,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn learning_condition(&self) -> LearningCondition {
        self.learning_condition
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_parses_storage_form() {
        for c in [
            LearningCondition::Dyslexia,
            LearningCondition::Adhd,
            LearningCondition::Autism,
            LearningCondition::None,
        ] {
            assert_eq!(c.as_str().parse::<LearningCondition>().unwrap(), c);
        }
        assert!("other".parse::<LearningCondition>().is_err());
    }
}
