use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua_core::model::{
    InteractionRecord, LegacyCompletions, Lesson, LessonId, LessonSection, Preferences,
    PreferencesPatch, ProgressPatch, ProgressRecord, SectionId, User, UserId,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("invalid write: {0}")]
    Invalid(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-user, per-lesson progress rows.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Rows for the user with `completed = true`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn completed_progress(&self, user_id: UserId)
    -> Result<Vec<ProgressRecord>, StorageError>;

    /// Fetch the row for a `(user, lesson)` pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read.
    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Create the row if missing and return what is stored.
    ///
    /// Concurrent callers observe a single row; an existing row is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written or read back.
    async fn ensure_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        first_section_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError>;

    /// Atomic create-or-update keyed by `(user, lesson)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written or read back.
    async fn upsert_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        patch: &ProgressPatch,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError>;
}

/// Learner accounts and their legacy completion keys.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist or update a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be read.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Legacy keys in the order they were recorded.
    ///
    /// An unknown user has no keys; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the keys cannot be read.
    async fn legacy_completions(&self, user_id: UserId)
    -> Result<LegacyCompletions, StorageError>;

    /// Append a key unless present and return the full list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown user, or other storage errors.
    async fn append_legacy_completion(
        &self,
        user_id: UserId,
        key: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<LegacyCompletions, StorageError>;
}

/// Read side of the lesson catalog plus the writes used for seeding.
#[async_trait]
pub trait LessonCatalog: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn count_all(&self) -> Result<u64, StorageError>;

    /// Titles for the given ids in one lookup. Unknown ids are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn find_titles_by_ids(
        &self,
        ids: &[LessonId],
    ) -> Result<Vec<(LessonId, String)>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Store a lesson and replace its sections in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Invalid` if a section belongs to another lesson,
    /// or other storage errors; nothing is written on error.
    async fn save_lesson(
        &self,
        lesson: &Lesson,
        sections: &[LessonSection],
    ) -> Result<(), StorageError>;

    /// Sections of a lesson by ascending order. An unknown lesson has none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sections cannot be read.
    async fn list_sections(&self, lesson_id: LessonId)
    -> Result<Vec<LessonSection>, StorageError>;

    /// The section with the lowest order, if the lesson has any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sections cannot be read.
    async fn first_section_id(&self, lesson_id: LessonId)
    -> Result<Option<SectionId>, StorageError>;
}

/// Per-learner accessibility settings.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be read.
    async fn get_preferences(&self, user_id: UserId)
    -> Result<Option<Preferences>, StorageError>;

    /// Insert `defaults` unless the user already has settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn ensure_preferences(&self, defaults: &Preferences) -> Result<(), StorageError>;

    /// Apply a patch in one atomic update. Returns `None` when the user has no settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written or read back.
    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Preferences>, StorageError>;

    /// Overwrite every setting, creating the row if needed. `created_at` of an
    /// existing row is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written or read back.
    async fn replace_preferences(&self, preferences: &Preferences)
    -> Result<Preferences, StorageError>;
}

/// Answers learners gave to lesson interactions.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Record an answer atomically: the first answer creates the row with one
    /// attempt, later answers bump the count and overwrite the last answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written or read back.
    async fn record_answer(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        interaction_id: &str,
        answer: &Value,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<InteractionRecord, StorageError>;
}

/// Rejects sections that point at a different lesson.
pub(crate) fn check_sections(
    lesson: &Lesson,
    sections: &[LessonSection],
) -> Result<(), StorageError> {
    match sections.iter().find(|s| s.lesson_id() != lesson.id()) {
        Some(stray) => Err(StorageError::Invalid(format!(
            "section {} belongs to lesson {}",
            stray.id(),
            stray.lesson_id()
        ))),
        None => Ok(()),
    }
}

#[derive(Default)]
struct MemoryState {
    lessons: HashMap<LessonId, Lesson>,
    sections: HashMap<SectionId, LessonSection>,
    users: HashMap<UserId, User>,
    legacy: HashMap<UserId, LegacyCompletions>,
    progress: BTreeMap<(UserId, LessonId), ProgressRecord>,
    preferences: HashMap<UserId, Preferences>,
    interactions: HashMap<(UserId, LessonId, String), InteractionRecord>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All maps sit behind one lock, so every operation is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn completed_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<ProgressRecord> = guard
            .progress
            .values()
            .filter(|r| r.user_id == user_id && r.completed)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.lesson_id.cmp(&b.lesson_id))
        });
        Ok(rows)
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, lesson_id)).cloned())
    }

    async fn ensure_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        first_section_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let mut guard = self.lock()?;
        let row = guard
            .progress
            .entry((user_id, lesson_id))
            .or_insert_with(|| ProgressRecord::started(user_id, lesson_id, first_section_id, now));
        Ok(row.clone())
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        patch: &ProgressPatch,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let mut guard = self.lock()?;
        let row = guard
            .progress
            .entry((user_id, lesson_id))
            .or_insert_with(|| ProgressRecord::started(user_id, lesson_id, "", now));
        row.apply(patch, now);
        Ok(row.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).cloned())
    }

    async fn legacy_completions(
        &self,
        user_id: UserId,
    ) -> Result<LegacyCompletions, StorageError> {
        let guard = self.lock()?;
        Ok(guard.legacy.get(&user_id).cloned().unwrap_or_default())
    }

    async fn append_legacy_completion(
        &self,
        user_id: UserId,
        key: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<LegacyCompletions, StorageError> {
        let mut guard = self.lock()?;
        if !guard.users.contains_key(&user_id) {
            return Err(StorageError::NotFound);
        }
        let legacy = guard.legacy.entry(user_id).or_default();
        legacy.push(key, completed_at);
        Ok(legacy.clone())
    }
}

#[async_trait]
impl LessonCatalog for InMemoryRepository {
    async fn count_all(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.len() as u64)
    }

    async fn find_titles_by_ids(
        &self,
        ids: &[LessonId],
    ) -> Result<Vec<(LessonId, String)>, StorageError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                guard
                    .lessons
                    .get(id)
                    .map(|l| (*id, l.title().to_owned()))
            })
            .collect())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.get(&id).cloned())
    }

    async fn save_lesson(
        &self,
        lesson: &Lesson,
        sections: &[LessonSection],
    ) -> Result<(), StorageError> {
        check_sections(lesson, sections)?;
        let mut guard = self.lock()?;
        guard.lessons.insert(lesson.id(), lesson.clone());
        guard.sections.retain(|_, s| s.lesson_id() != lesson.id());
        for section in sections {
            guard.sections.insert(section.id(), section.clone());
        }
        Ok(())
    }

    async fn list_sections(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonSection>, StorageError> {
        let guard = self.lock()?;
        let mut sections: Vec<LessonSection> = guard
            .sections
            .values()
            .filter(|s| s.lesson_id() == lesson_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| (s.order(), s.id()));
        Ok(sections)
    }

    async fn first_section_id(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<SectionId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sections
            .values()
            .filter(|s| s.lesson_id() == lesson_id)
            .min_by_key(|s| (s.order(), s.id()))
            .map(LessonSection::id))
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryRepository {
    async fn get_preferences(
        &self,
        user_id: UserId,
    ) -> Result<Option<Preferences>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.preferences.get(&user_id).cloned())
    }

    async fn ensure_preferences(&self, defaults: &Preferences) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .preferences
            .entry(defaults.user_id)
            .or_insert_with(|| defaults.clone());
        Ok(())
    }

    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Preferences>, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.preferences.get_mut(&user_id).map(|prefs| {
            prefs.apply(patch, now);
            prefs.clone()
        }))
    }

    async fn replace_preferences(
        &self,
        preferences: &Preferences,
    ) -> Result<Preferences, StorageError> {
        let mut guard = self.lock()?;
        let mut stored = preferences.clone();
        if let Some(existing) = guard.preferences.get(&preferences.user_id) {
            stored.created_at = existing.created_at;
        }
        guard.preferences.insert(stored.user_id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl InteractionRepository for InMemoryRepository {
    async fn record_answer(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        interaction_id: &str,
        answer: &Value,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<InteractionRecord, StorageError> {
        let mut guard = self.lock()?;
        let record = guard
            .interactions
            .entry((user_id, lesson_id, interaction_id.to_owned()))
            .and_modify(|r| r.record_attempt(answer.clone(), is_correct, now))
            .or_insert_with(|| {
                InteractionRecord::first_attempt(
                    user_id,
                    lesson_id,
                    interaction_id,
                    answer.clone(),
                    is_correct,
                    now,
                )
            });
        Ok(record.clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub users: Arc<dyn UserRepository>,
    pub lessons: Arc<dyn LessonCatalog>,
    pub preferences: Arc<dyn PreferencesRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every handle to one repository value.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: ProgressRepository
            + UserRepository
            + LessonCatalog
            + PreferencesRepository
            + InteractionRepository
            + Clone
            + 'static,
    {
        Self {
            progress: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            preferences: Arc::new(repo.clone()),
            interactions: Arc::new(repo),
        }
    }
}
