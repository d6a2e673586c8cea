mod ids;
mod interaction;
mod legacy;
mod lesson;
mod preferences;
mod progress;
mod summary;
mod user;

pub use ids::{IdError, LessonId, OBJECT_ID_HEX_LEN, ObjectId, SectionId, UserId};
pub use interaction::{
    AnswerCheck, Interaction, InteractionFeedback, InteractionKind, InteractionRecord,
    normalize_answer,
};
pub use legacy::{LegacyCompletionMeta, LegacyCompletions, LegacyEntry};
pub use lesson::{Lesson, LessonError, LessonSection};
pub use preferences::{
    ColorOverlay, ContrastTheme, FontFamily, FontSize, Language, LearningPace, LineHeight,
    PreferenceGroup, PreferenceSettings, Preferences, PreferencesError, PreferencesPatch, Spacing,
};
pub use progress::{ProgressPatch, ProgressRecord, dedup_sections};
pub use summary::{CompletedLesson, Summary, SummaryPlan, UNTITLED};
pub use user::{LearningCondition, User, UserError};
