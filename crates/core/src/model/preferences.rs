use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::user::LearningCondition;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PreferencesError {
    #[error("sessionDuration must be between 5 and 60 minutes, got {0}")]
    SessionDuration(u32),

    #[error("speechRate must be between 0.5 and 2.0, got {0}")]
    SpeechRate(f64),

    #[error("speechPitch must be between 0.5 and 2.0, got {0}")]
    SpeechPitch(f64),
}

//
// ─── SETTING VALUES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    #[default]
    Default,
    Opendyslexic,
    Arial,
    ComicSans,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContrastTheme {
    #[default]
    Default,
    HighContrast,
    Dark,
    Light,
    YellowBlack,
}

/// Letter and word spacing share one scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Spacing {
    #[default]
    Normal,
    Wide,
    ExtraWide,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineHeight {
    #[default]
    Normal,
    Relaxed,
    Loose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorOverlay {
    #[default]
    None,
    Blue,
    Green,
    Yellow,
    Pink,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningPace {
    Slow,
    #[default]
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Tamil,
    Malayalam,
    Telugu,
    Kannada,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

const SESSION_MINUTES: std::ops::RangeInclusive<u32> = 5..=60;
const SPEECH_FACTOR: std::ops::RangeInclusive<f64> = 0.5..=2.0;

/// Display and pacing settings for one learner. Missing fields read as defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceSettings {
    pub font_size: FontSize,
    pub font_family: FontFamily,
    pub contrast_theme: ContrastTheme,

    pub letter_spacing: Spacing,
    pub word_spacing: Spacing,
    pub line_height: LineHeight,
    pub color_overlay: ColorOverlay,

    pub learning_pace: LearningPace,
    /// Minutes, 5 to 60.
    pub session_duration: u32,
    pub break_reminders: bool,

    pub distraction_free_mode: bool,
    pub reduce_animations: bool,
    pub simplified_layout: bool,
    pub sound_effects: bool,

    pub enable_text_to_speech: bool,
    pub speech_rate: f64,
    pub speech_pitch: f64,
    pub enable_speech_to_text: bool,

    pub preferred_language: Language,
    pub show_progress_bar: bool,
    pub enable_rewards: bool,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            font_size: FontSize::default(),
            font_family: FontFamily::default(),
            contrast_theme: ContrastTheme::default(),
            letter_spacing: Spacing::default(),
            word_spacing: Spacing::default(),
            line_height: LineHeight::default(),
            color_overlay: ColorOverlay::default(),
            learning_pace: LearningPace::default(),
            session_duration: 20,
            break_reminders: true,
            distraction_free_mode: false,
            reduce_animations: false,
            simplified_layout: false,
            sound_effects: true,
            enable_text_to_speech: false,
            speech_rate: 1.0,
            speech_pitch: 1.0,
            enable_speech_to_text: false,
            preferred_language: Language::default(),
            show_progress_bar: true,
            enable_rewards: true,
        }
    }
}

impl PreferenceSettings {
    /// Starting point for a learner with the given condition.
    #[must_use]
    pub fn for_condition(condition: LearningCondition) -> Self {
        let mut settings = Self::default();
        match condition {
            LearningCondition::Dyslexia => {
                settings.font_family = FontFamily::Opendyslexic;
                settings.letter_spacing = Spacing::Wide;
                settings.line_height = LineHeight::Relaxed;
            }
            LearningCondition::Adhd => {
                settings.distraction_free_mode = true;
                settings.learning_pace = LearningPace::Normal;
                settings.break_reminders = true;
            }
            LearningCondition::Autism => {
                settings.distraction_free_mode = true;
                settings.simplified_layout = true;
                settings.reduce_animations = true;
            }
            LearningCondition::None => {}
        }
        settings
    }

    /// Overwrites every field the patch carries.
    pub fn apply(&mut self, patch: &PreferencesPatch) {
        fn set<T: Copy>(field: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *field = v;
            }
        }

        set(&mut self.font_size, patch.font_size);
        set(&mut self.font_family, patch.font_family);
        set(&mut self.contrast_theme, patch.contrast_theme);
        set(&mut self.letter_spacing, patch.letter_spacing);
        set(&mut self.word_spacing, patch.word_spacing);
        set(&mut self.line_height, patch.line_height);
        set(&mut self.color_overlay, patch.color_overlay);
        set(&mut self.learning_pace, patch.learning_pace);
        set(&mut self.session_duration, patch.session_duration);
        set(&mut self.break_reminders, patch.break_reminders);
        set(&mut self.distraction_free_mode, patch.distraction_free_mode);
        set(&mut self.reduce_animations, patch.reduce_animations);
        set(&mut self.simplified_layout, patch.simplified_layout);
        set(&mut self.sound_effects, patch.sound_effects);
        set(&mut self.enable_text_to_speech, patch.enable_text_to_speech);
        set(&mut self.speech_rate, patch.speech_rate);
        set(&mut self.speech_pitch, patch.speech_pitch);
        set(&mut self.enable_speech_to_text, patch.enable_speech_to_text);
        set(&mut self.preferred_language, patch.preferred_language);
        set(&mut self.show_progress_bar, patch.show_progress_bar);
        set(&mut self.enable_rewards, patch.enable_rewards);
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub font_size: Option<FontSize>,
    pub font_family: Option<FontFamily>,
    pub contrast_theme: Option<ContrastTheme>,
    pub letter_spacing: Option<Spacing>,
    pub word_spacing: Option<Spacing>,
    pub line_height: Option<LineHeight>,
    pub color_overlay: Option<ColorOverlay>,
    pub learning_pace: Option<LearningPace>,
    pub session_duration: Option<u32>,
    pub break_reminders: Option<bool>,
    pub distraction_free_mode: Option<bool>,
    pub reduce_animations: Option<bool>,
    pub simplified_layout: Option<bool>,
    pub sound_effects: Option<bool>,
    pub enable_text_to_speech: Option<bool>,
    pub speech_rate: Option<f64>,
    pub speech_pitch: Option<f64>,
    pub enable_speech_to_text: Option<bool>,
    pub preferred_language: Option<Language>,
    pub show_progress_bar: Option<bool>,
    pub enable_rewards: Option<bool>,
}

impl PreferencesPatch {
    /// # Errors
    ///
    /// Returns the first range violation among `session_duration`,
    /// `speech_rate` and `speech_pitch`.
    pub fn validate(&self) -> Result<(), PreferencesError> {
        if let Some(minutes) = self.session_duration {
            if !SESSION_MINUTES.contains(&minutes) {
                return Err(PreferencesError::SessionDuration(minutes));
            }
        }
        if let Some(rate) = self.speech_rate {
            if !SPEECH_FACTOR.contains(&rate) {
                return Err(PreferencesError::SpeechRate(rate));
            }
        }
        if let Some(pitch) = self.speech_pitch {
            if !SPEECH_FACTOR.contains(&pitch) {
                return Err(PreferencesError::SpeechPitch(pitch));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Settings screens that each edit a fixed subset of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceGroup {
    Accessibility,
    Dyslexia,
    Adhd,
    Autism,
}

impl PreferenceGroup {
    /// Drops every field the group does not own.
    #[must_use]
    pub fn restrict(self, patch: &PreferencesPatch) -> PreferencesPatch {
        match self {
            Self::Accessibility => PreferencesPatch {
                font_size: patch.font_size,
                contrast_theme: patch.contrast_theme,
                learning_pace: patch.learning_pace,
                font_family: patch.font_family,
                letter_spacing: patch.letter_spacing,
                distraction_free_mode: patch.distraction_free_mode,
                ..PreferencesPatch::default()
            },
            Self::Dyslexia => PreferencesPatch {
                font_family: patch.font_family,
                letter_spacing: patch.letter_spacing,
                word_spacing: patch.word_spacing,
                line_height: patch.line_height,
                color_overlay: patch.color_overlay,
                ..PreferencesPatch::default()
            },
            Self::Adhd => PreferencesPatch {
                learning_pace: patch.learning_pace,
                session_duration: patch.session_duration,
                break_reminders: patch.break_reminders,
                ..PreferencesPatch::default()
            },
            Self::Autism => PreferencesPatch {
                distraction_free_mode: patch.distraction_free_mode,
                reduce_animations: patch.reduce_animations,
                simplified_layout: patch.simplified_layout,
                sound_effects: patch.sound_effects,
                ..PreferencesPatch::default()
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Dyslexia => "dyslexia",
            Self::Adhd => "adhd",
            Self::Autism => "autism",
        }
    }
}

//
// ─── PREFERENCES ───────────────────────────────────────────────────────────────
//

/// One learner's stored settings. At most one per user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub user_id: UserId,
    #[serde(flatten)]
    pub settings: PreferenceSettings,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Preferences {
    #[must_use]
    pub fn new(user_id: UserId, settings: PreferenceSettings, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            settings,
            last_modified: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &PreferencesPatch, now: DateTime<Utc>) {
        self.settings.apply(patch);
        self.last_modified = now;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn condition_defaults() {
        let dyslexia = PreferenceSettings::for_condition(LearningCondition::Dyslexia);
        assert_eq!(dyslexia.font_family, FontFamily::Opendyslexic);
        assert_eq!(dyslexia.line_height, LineHeight::Relaxed);
        assert!(!dyslexia.distraction_free_mode);

        let autism = PreferenceSettings::for_condition(LearningCondition::Autism);
        assert!(autism.simplified_layout && autism.reduce_animations);

        assert_eq!(
            PreferenceSettings::for_condition(LearningCondition::None),
            PreferenceSettings::default()
        );
    }

    #[test]
    fn patch_parses_wire_names() {
        let patch: PreferencesPatch = serde_json::from_value(json!({
            "fontSize": "extra-large",
            "contrastTheme": "yellow-black",
            "fontFamily": "comic-sans",
            "sessionDuration": 30,
            "unknownField": 1,
        }))
        .unwrap();
        assert_eq!(patch.font_size, Some(FontSize::ExtraLarge));
        assert_eq!(patch.contrast_theme, Some(ContrastTheme::YellowBlack));
        assert_eq!(patch.font_family, Some(FontFamily::ComicSans));

        let mut settings = PreferenceSettings::default();
        settings.apply(&patch);
        assert_eq!(settings.session_duration, 30);
        assert_eq!(settings.word_spacing, Spacing::Normal);

        assert!(serde_json::from_value::<PreferencesPatch>(json!({ "fontSize": "huge" })).is_err());
    }

    #[test]
    fn ranges_are_enforced() {
        let patch = PreferencesPatch {
            session_duration: Some(90),
            ..PreferencesPatch::default()
        };
        assert_eq!(patch.validate(), Err(PreferencesError::SessionDuration(90)));

        let patch = PreferencesPatch {
            speech_pitch: Some(0.1),
            ..PreferencesPatch::default()
        };
        assert_eq!(patch.validate(), Err(PreferencesError::SpeechPitch(0.1)));

        let patch = PreferencesPatch {
            speech_rate: Some(f64::NAN),
            ..PreferencesPatch::default()
        };
        assert!(patch.validate().is_err());
        assert!(PreferencesPatch::default().validate().is_ok());
    }

    #[test]
    fn groups_keep_only_their_fields() {
        let patch = PreferencesPatch {
            font_size: Some(FontSize::Large),
            session_duration: Some(15),
            sound_effects: Some(false),
            ..PreferencesPatch::default()
        };
        let adhd = PreferenceGroup::Adhd.restrict(&patch);
        assert_eq!(adhd.session_duration, Some(15));
        assert_eq!(adhd.font_size, None);

        assert!(PreferenceGroup::Dyslexia.restrict(&patch).is_empty());
        assert_eq!(
            PreferenceGroup::Accessibility.restrict(&patch).font_size,
            Some(FontSize::Large)
        );
        assert_eq!(
            PreferenceGroup::Autism.restrict(&patch).sound_effects,
            Some(false)
        );
    }

    #[test]
    fn settings_serialize_flat() {
        let user: UserId = "65a000000000000000000001".parse().unwrap();
        let prefs = Preferences::new(user, PreferenceSettings::default(), crate::time::fixed_now());
        let value = serde_json::to_value(&prefs).unwrap();
        assert_eq!(value["userId"], "65a000000000000000000001");
        assert_eq!(value["fontSize"], "medium");
        assert_eq!(value["sessionDuration"], 20);
    }
}
