use std::fmt;
use std::str::FromStr;

use crate::error::{AssistError, Result};

/// Which part of a lesson plan to generate.  All four share one prompt
/// family and differ only in the body of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonSection {
    Objectives,
    Activities,
    Materials,
    Assessment,
}

/// Category of content a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Lesson(LessonSection),
    ActivitySuggestion,
    TestQuestions,
    StudentAnalysis,
}

impl TaskKind {
    /// Every task kind, in the order the CLI lists them.
    pub const ALL: [TaskKind; 7] = [
        TaskKind::Lesson(LessonSection::Objectives),
        TaskKind::Lesson(LessonSection::Activities),
        TaskKind::Lesson(LessonSection::Materials),
        TaskKind::Lesson(LessonSection::Assessment),
        TaskKind::ActivitySuggestion,
        TaskKind::TestQuestions,
        TaskKind::StudentAnalysis,
    ];

    /// Canonical wire key, e.g. `lesson-objectives`.
    pub fn key(&self) -> &'static str {
        match self {
            TaskKind::Lesson(LessonSection::Objectives) => "lesson-objectives",
            TaskKind::Lesson(LessonSection::Activities) => "lesson-activities",
            TaskKind::Lesson(LessonSection::Materials) => "lesson-materials",
            TaskKind::Lesson(LessonSection::Assessment) => "lesson-assessment",
            TaskKind::ActivitySuggestion => "activity-suggestions",
            TaskKind::TestQuestions => "test-questions",
            TaskKind::StudentAnalysis => "student-analysis",
        }
    }

    /// Short human description for `tasks` output.
    pub fn describe(&self) -> &'static str {
        match self {
            TaskKind::Lesson(LessonSection::Objectives) => "learning objectives for a lesson plan",
            TaskKind::Lesson(LessonSection::Activities) => "timed classroom activities for a lesson plan",
            TaskKind::Lesson(LessonSection::Materials) => "materials and resources for a lesson plan",
            TaskKind::Lesson(LessonSection::Assessment) => "assessment methods for a lesson plan",
            TaskKind::ActivitySuggestion => "standalone classroom activity ideas",
            TaskKind::TestQuestions => "test questions with answers",
            TaskKind::StudentAnalysis => "performance analysis and recommendations for a student",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TaskKind {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        match key {
            "lesson-objectives" => Ok(TaskKind::Lesson(LessonSection::Objectives)),
            "lesson-activities" => Ok(TaskKind::Lesson(LessonSection::Activities)),
            "lesson-materials" => Ok(TaskKind::Lesson(LessonSection::Materials)),
            "lesson-assessment" => Ok(TaskKind::Lesson(LessonSection::Assessment)),
            "activity-suggestions" => Ok(TaskKind::ActivitySuggestion),
            "test-questions" => Ok(TaskKind::TestQuestions),
            "student-analysis" | "student-profile-suggestions" => Ok(TaskKind::StudentAnalysis),
            other => Err(AssistError::UnknownTaskKind(other.to_string())),
        }
    }
}

// -- Language ---------------------------------------------------------------

/// Response language.  `Th` comes first and is the fallback for anything
/// unrecognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Th,
    En,
    Zh,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Th, Language::En, Language::Zh];

    /// Parse a language code.  Accepts region-suffixed tags such as `en-US`
    /// or `zh_CN`; returns `None` for anything outside the supported set.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "th" => Some(Language::Th),
            "en" => Some(Language::En),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }

    /// Like [`Language::from_code`] but falls back to the default language.
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Th => "th",
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Instruction appended to every prompt so the model answers in this
    /// language.
    pub fn directive(&self) -> &'static str {
        match self {
            Language::Th => "Please respond in Thai language (ภาษาไทย).",
            Language::En => "Please respond in English.",
            Language::Zh => "Please respond in Simplified Chinese (简体中文).",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_key() {
        for kind in TaskKind::ALL {
            let parsed: TaskKind = kind.key().parse().unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(kind.to_string(), kind.key());
        }
    }

    #[test]
    fn profile_suggestions_is_an_alias() {
        let kind: TaskKind = "student-profile-suggestions".parse().unwrap();
        assert_eq!(kind, TaskKind::StudentAnalysis);
        assert_eq!(kind.key(), "student-analysis");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let kind: TaskKind = "  test-questions\n".parse().unwrap();
        assert_eq!(kind, TaskKind::TestQuestions);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        match "not-a-kind".parse::<TaskKind>() {
            Err(AssistError::UnknownTaskKind(k)) => assert_eq!(k, "not-a-kind"),
            other => panic!("expected UnknownTaskKind, got {other:?}"),
        }
    }

    #[test]
    fn keys_are_case_sensitive() {
        assert!("Test-Questions".parse::<TaskKind>().is_err());
        assert!("lesson".parse::<TaskKind>().is_err());
        assert!("".parse::<TaskKind>().is_err());
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::from_code("en"), Some(Language::En));
        assert_eq!(Language::from_code("EN-us"), Some(Language::En));
        assert_eq!(Language::from_code("zh_CN"), Some(Language::Zh));
        assert_eq!(Language::from_code(" th "), Some(Language::Th));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn unknown_language_falls_back_to_thai() {
        assert_eq!(Language::default(), Language::Th);
        assert_eq!(Language::from_code_or_default("de"), Language::Th);
        assert_eq!(Language::ALL[0], Language::default());
    }

    #[test]
    fn directives_name_the_language() {
        assert!(Language::En.directive().contains("English"));
        assert!(Language::Th.directive().contains("Thai"));
        assert!(Language::Zh.directive().contains("Chinese"));
    }
}
