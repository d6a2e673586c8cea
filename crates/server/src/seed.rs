use lingua_core::model::{
    Interaction, InteractionFeedback, InteractionKind, LearningCondition, LessonId, User, UserId,
};
use serde_json::json;
use services::{AppServices, Clock, PreferencesServiceError};
use storage::repository::Storage;
use tracing::info;

/// Learner created by `seed`; pass it as `x-user-id` when trying the API.
pub const DEMO_USER_ID: &str = "65a000000000000000000001";

const DEMO_LESSONS: &[(&str, &str, &str, &[&str])] = &[
    (
        "507f1f77bcf86cd799439011",
        "Colors Around Us",
        "Red apples, blue sky and green grass.",
        &["Look", "Listen", "Quiz"],
    ),
    (
        "507f1f77bcf86cd799439012",
        "Counting to Ten",
        "One, two, three, up to ten.",
        &["Count along", "Practice"],
    ),
    (
        "507f1f77bcf86cd799439013",
        "Daily Routines",
        "Wake up, brush teeth, eat breakfast.",
        &["Morning", "Evening", "Review"],
    ),
];

/// Keys written by older clients: one embedded id, two free-text.
const DEMO_LEGACY_KEYS: &[&str] = &[
    "completed-507f1f77bcf86cd799439012",
    "autism-lesson-1",
    "autism-lesson-2",
];

/// Counts of what a seed run wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub lessons_created: usize,
    pub legacy_keys: usize,
}

/// Insert demo lessons, a demo learner with default preferences and legacy keys.
/// Safe to rerun.
///
/// # Errors
///
/// Returns an error if any write fails.
pub async fn seed_demo(
    storage: &Storage,
    clock: Clock,
) -> Result<SeedReport, Box<dyn std::error::Error + Send + Sync>> {
    let services = AppServices::from_storage(storage, clock);
    let lessons = services.lessons();
    let mut report = SeedReport::default();

    for (id, title, text, sections) in DEMO_LESSONS {
        let id: LessonId = id.parse()?;
        if lessons.get_lesson(id).await?.is_some() {
            continue;
        }
        let check = Interaction::new(
            "ready-check",
            InteractionKind::TrueFalse,
            format!("Are you ready to start \"{title}\"?"),
            json!(true),
            InteractionFeedback {
                correct: "Great, let's begin!".into(),
                incorrect: "Take your time and come back when you are ready.".into(),
            },
            0,
        )?;
        lessons.create_lesson(id, title, text, sections, vec![check]).await?;
        report.lessons_created += 1;
    }

    let user_id: UserId = DEMO_USER_ID.parse()?;
    if storage.users.get_user(user_id).await?.is_none() {
        let user = User::new(user_id, "Demo Learner", LearningCondition::Autism, clock.now())?;
        storage.users.upsert_user(&user).await?;
    }

    let preferences = services.preferences();
    match preferences.get(user_id).await {
        Ok(_) => {}
        Err(PreferencesServiceError::NotFound) => {
            preferences.reset(user_id).await?;
        }
        Err(err) => return Err(err.into()),
    }

    let completions = services.completions();
    for key in DEMO_LEGACY_KEYS {
        report.legacy_keys = completions.complete_lesson_key(user_id, key).await?.len();
    }

    info!(
        event = "seed_complete",
        lessons_created = report.lessons_created,
        legacy_keys = report.legacy_keys,
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use lingua_core::time::fixed_clock;

    #[tokio::test]
    async fn seeding_twice_changes_nothing() {
        let storage = Storage::in_memory();
        let first = seed_demo(&storage, fixed_clock()).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                lessons_created: 3,
                legacy_keys: 3
            }
        );

        let second = seed_demo(&storage, fixed_clock()).await.unwrap();
        assert_eq!(second.lessons_created, 0);
        assert_eq!(second.legacy_keys, 3);

        let summary = AppServices::from_storage(&storage, fixed_clock())
            .summaries()
            .get_summary(DEMO_USER_ID.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.completed_count, 3);
        assert_eq!(summary.total_lessons, 3);

        let services = AppServices::from_storage(&storage, fixed_clock());
        let user_id = DEMO_USER_ID.parse().unwrap();
        let prefs = services.preferences().get(user_id).await.unwrap();
        assert!(prefs.settings.simplified_layout);

        let answer = services
            .interactions()
            .submit_answer(
                user_id,
                "507f1f77bcf86cd799439011".parse().unwrap(),
                "ready-check",
                &json!("TRUE"),
            )
            .await
            .unwrap();
        assert!(answer.is_correct);
    }
}
