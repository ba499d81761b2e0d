use std::fmt;

use crate::context::{GenerationContext, GenerationRequest};
use crate::error::Result;
use crate::task::{Language, LessonSection, TaskKind};

const CONTENT_ONLY: &str =
    "Return only the requested content, without any introduction, preamble or closing remarks.";

/// A fully composed prompt ready to send to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub task: TaskKind,
    pub language: Language,
    text: String,
}

impl ComposedPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }
}

impl fmt::Display for ComposedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parse `task_kind` and compose its prompt.  Fails with `UnknownTaskKind`
/// before doing anything else when the key is not recognised.
pub fn compose_for(task_kind: &str, context: &GenerationContext) -> Result<ComposedPrompt> {
    let task: TaskKind = task_kind.parse()?;
    Ok(compose(&GenerationRequest::new(task, context.clone())))
}

/// Build the prompt for a request: task template, language directive, and a
/// JSON dump of the full context.
pub fn compose(request: &GenerationRequest) -> ComposedPrompt {
    let ctx = &request.context;
    let body = match request.task {
        TaskKind::Lesson(section) => lesson_prompt(section, ctx),
        TaskKind::ActivitySuggestion => activity_prompt(ctx),
        TaskKind::TestQuestions => test_questions_prompt(ctx),
        TaskKind::StudentAnalysis => student_analysis_prompt(ctx),
    };

    let text = format!(
        "{body}\n\n{CONTENT_ONLY}\n\n{directive}\n\nContext:\n{dump}",
        directive = request.language.directive(),
        dump = ctx.to_pretty_json(),
    );

    ComposedPrompt {
        task: request.task,
        language: request.language,
        text,
    }
}

// -- Templates --------------------------------------------------------------

fn lesson_prompt(section: LessonSection, ctx: &GenerationContext) -> String {
    let subject = ctx.render("subject");
    let grade = ctx.render("grade");
    let topic = ctx.render("topic");
    let duration = ctx.render("duration");

    let header = format!(
        "You are an experienced teacher writing a lesson plan.\n\
         Subject: {subject}\n\
         Grade level: {grade}\n\
         Topic: {topic}\n\
         Lesson duration: {duration} minutes"
    );

    let request = match section {
        LessonSection::Objectives => format!(
            "Write 3-5 clear, measurable learning objectives for this {subject} lesson on \
             \"{topic}\". Start each objective with an action verb and keep them appropriate \
             for {grade} students."
        ),
        LessonSection::Activities => format!(
            "Design a sequence of engaging learning activities for this {duration}-minute lesson \
             on \"{topic}\". For each activity give a short title, the time in minutes, and what \
             the teacher and students do. Cover an opening, main activities and a wrap-up."
        ),
        LessonSection::Materials => format!(
            "List the teaching materials, equipment and resources needed to teach \"{topic}\" \
             to {grade} {subject} students. Group them as teacher materials, student materials \
             and optional digital resources."
        ),
        LessonSection::Assessment => format!(
            "Suggest practical ways to assess whether {grade} students met the objectives of \
             this lesson on \"{topic}\". Include formative checks during the lesson and one \
             summative task, each with clear success criteria."
        ),
    };

    format!("{header}\n\n{request}")
}

fn activity_prompt(ctx: &GenerationContext) -> String {
    let subject = ctx.render("subject");
    let grade = ctx.render("grade");
    let topic = ctx.render("topic");
    let activity_type = ctx.render("activityType");
    let duration = ctx.render("duration");

    format!(
        "Suggest 3 creative {activity_type} classroom activities for {grade} {subject} students \
         on the topic \"{topic}\". Each activity should fit in about {duration} minutes.\n\
         For every activity include: a name, the learning goal, required materials, \
         step-by-step instructions, and how to adapt it for students who need more support."
    )
}

fn test_questions_prompt(ctx: &GenerationContext) -> String {
    let subject = ctx.render("subject");
    let grade = ctx.render("grade");
    let topic = ctx.render("topic");
    let count = ctx.render("questionCount");
    let difficulty = ctx.render("difficulty");
    let question_type = ctx.render("questionType");

    format!(
        "Create {count} {question_type} test questions for {grade} {subject} students on the \
         topic \"{topic}\" at {difficulty} difficulty.\n\
         Number each question. For multiple-choice questions give four options labelled A-D. \
         After each question state the correct answer and a one-sentence explanation."
    )
}

fn student_analysis_prompt(ctx: &GenerationContext) -> String {
    let name = ctx.render("studentName");
    let grade = ctx.render("grade");
    let average = ctx.render("scores.average");
    let behavior = ctx.render("behavior");

    format!(
        "Analyse the learning progress of the student {name} ({grade}).\n\
         Average score: {average}\n\
         Classroom behavior: {behavior}\n\n\
         Describe the student's strengths, the areas that need improvement, and give 3-5 \
         concrete recommendations the teacher can act on, plus one suggestion to share with \
         the student's parents."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistError;
    use serde_json::json;

    fn test_questions_context() -> GenerationContext {
        GenerationContext::try_from(json!({
            "subject": "Mathematics",
            "grade": "Grade 7",
            "topic": "Fractions",
            "questionCount": 5,
            "difficulty": "medium",
            "questionType": "multiple-choice",
            "language": "en"
        }))
        .unwrap()
    }

    fn lesson_context() -> GenerationContext {
        GenerationContext::new()
            .with("subject", "Science")
            .with("grade", "Grade 5")
            .with("topic", "The Water Cycle")
            .with("duration", 50)
    }

    #[test]
    fn test_questions_prompt_carries_every_field() {
        let prompt = compose_for("test-questions", &test_questions_context()).unwrap();
        let text = prompt.as_str();
        assert!(text.contains("5"));
        assert!(text.contains("Mathematics"));
        assert!(text.contains("Fractions"));
        assert!(text.contains("Grade 7"));
        assert!(text.contains("medium"));
        assert!(text.contains("multiple-choice"));
        assert!(text.contains(Language::En.directive()));
        assert_eq!(prompt.language, Language::En);
        assert_eq!(prompt.task, TaskKind::TestQuestions);
    }

    #[test]
    fn every_lesson_section_interpolates_its_fields() {
        let ctx = lesson_context();
        for section in [
            LessonSection::Objectives,
            LessonSection::Activities,
            LessonSection::Materials,
            LessonSection::Assessment,
        ] {
            let prompt = compose(&GenerationRequest::new(TaskKind::Lesson(section), ctx.clone()));
            let text = prompt.as_str();
            assert!(text.contains("Science"), "{section:?}");
            assert!(text.contains("Grade 5"), "{section:?}");
            assert!(text.contains("The Water Cycle"), "{section:?}");
            assert!(text.contains("50 minutes"), "{section:?}");
        }
    }

    #[test]
    fn lesson_sections_produce_distinct_requests() {
        let ctx = lesson_context();
        let objectives = compose_for("lesson-objectives", &ctx).unwrap();
        let materials = compose_for("lesson-materials", &ctx).unwrap();
        assert!(objectives.as_str().contains("learning objectives"));
        assert!(materials.as_str().contains("materials"));
        assert_ne!(objectives, materials);
    }

    #[test]
    fn activity_prompt_uses_activity_type() {
        let ctx = lesson_context().with("activityType", "group");
        let prompt = compose_for("activity-suggestions", &ctx).unwrap();
        assert!(prompt.as_str().contains("group classroom activities"));
        assert!(prompt.as_str().contains("The Water Cycle"));
    }

    #[test]
    fn student_analysis_reads_nested_average() {
        let ctx = GenerationContext::try_from(json!({
            "studentName": "Malee",
            "grade": "Grade 3",
            "scores": { "average": 64 },
            "behavior": "quiet but attentive"
        }))
        .unwrap();
        for key in ["student-analysis", "student-profile-suggestions"] {
            let prompt = compose_for(key, &ctx).unwrap();
            assert!(prompt.as_str().contains("Malee"));
            assert!(prompt.as_str().contains("Average score: 64"));
            assert!(prompt.as_str().contains("quiet but attentive"));
        }
    }

    #[test]
    fn unknown_kind_fails_fast() {
        let err = compose_for("not-a-kind", &GenerationContext::new()).unwrap_err();
        assert!(matches!(err, AssistError::UnknownTaskKind(_)));
    }

    #[test]
    fn missing_fields_substitute_empty() {
        let prompt = compose_for("test-questions", &GenerationContext::new()).unwrap();
        assert!(prompt.as_str().contains("on the topic \"\""));
    }

    #[test]
    fn language_defaults_to_thai() {
        let prompt = compose_for("lesson-objectives", &lesson_context()).unwrap();
        assert_eq!(prompt.language, Language::Th);
        assert!(prompt.as_str().contains(Language::Th.directive()));

        let ctx = lesson_context().with("language", "xx");
        let prompt = compose_for("lesson-objectives", &ctx).unwrap();
        assert_eq!(prompt.language, Language::Th);
    }

    #[test]
    fn context_dump_is_appended() {
        let prompt = compose_for("test-questions", &test_questions_context()).unwrap();
        let text = prompt.as_str();
        let dump_at = text.find("Context:\n").unwrap();
        assert!(text[dump_at..].contains("\"questionType\": \"multiple-choice\""));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn composition_is_deterministic() {
        let ctx = test_questions_context();
        assert_eq!(
            compose_for("test-questions", &ctx).unwrap(),
            compose_for("test-questions", &ctx).unwrap()
        );
    }
}
