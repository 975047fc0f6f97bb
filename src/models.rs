use serde::Deserialize;

// One row of the Tests export. Column names are part of the upstream
// file format, not suggestions; serde renames pin them exactly.
#[derive(Debug, Clone, Deserialize)]
pub struct TestRow {
    #[serde(rename = "TestId")]
    pub test_id: String,
    #[serde(rename = "CourseId")]
    pub course_id: String,
    #[serde(rename = "TestName")]
    pub test_name: String,
    #[serde(rename = "SaveAndResume")]
    pub save_and_resume: String,
    #[serde(rename = "Resumes")]
    pub resumes: String,
    #[serde(rename = "ShowFeedback")]
    pub show_feedback: String,
    #[serde(rename = "ShowStudyGuide")]
    pub show_study_guide: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    #[serde(rename = "TestId")]
    pub test_id: String,
    #[serde(rename = "QuestionId")]
    pub question_id: String,
    #[serde(rename = "QuestionName")]
    pub question_name: String,
    #[serde(rename = "QuestionText")]
    pub question_text: String,
    #[serde(rename = "QuestionType")]
    pub question_type: String,
    #[serde(rename = "QuestionExplanation")]
    pub question_explanation: String,
    #[serde(rename = "IncorrectExplanation")]
    pub incorrect_explanation: String,
    #[serde(rename = "QuestionReference")]
    pub question_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRow {
    #[serde(rename = "TestId")]
    pub test_id: String,
    #[serde(rename = "QuestionId")]
    pub question_id: String,
    #[serde(rename = "AnswerDescription")]
    pub answer_description: String,
    #[serde(rename = "AnswerType")]
    pub answer_type: String,
    #[serde(rename = "AnswerOrder")]
    pub answer_order: String,
}

impl AnswerRow {
    pub fn is_correct(&self) -> bool {
        self.answer_type == "Correct"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRow {
    #[serde(rename = "TestId")]
    pub test_id: String,
    #[serde(rename = "QuestionId")]
    pub question_id: String,
    #[serde(rename = "ScenarioPath")]
    pub scenario_path: String,
}

// The eight question shapes the export can carry. There is no fallback
// variant: an unrecognized non-empty tag aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleSelection,
    MultipleChoice,
    TrueFalse,
    DragMatch,
    SortAnswers,
    DragToParagraph,
    MultipleChoiceWithImage,
    ShortAnswer,
}

impl QuestionKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Multiple Selection" => Some(QuestionKind::MultipleSelection),
            "Multiple Choice" => Some(QuestionKind::MultipleChoice),
            "True / False" => Some(QuestionKind::TrueFalse),
            "Drag Match" => Some(QuestionKind::DragMatch),
            "Sort Answers" => Some(QuestionKind::SortAnswers),
            // [sic] the upstream export misspells "Paragraph"
            "Drag to Pharagraph" => Some(QuestionKind::DragToParagraph),
            "Multiple Choice With Image" => Some(QuestionKind::MultipleChoiceWithImage),
            "Short Answer" => Some(QuestionKind::ShortAnswer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleSelection => "Multiple Selection",
            QuestionKind::MultipleChoice => "Multiple Choice",
            QuestionKind::TrueFalse => "True / False",
            QuestionKind::DragMatch => "Drag Match",
            QuestionKind::SortAnswers => "Sort Answers",
            QuestionKind::DragToParagraph => "Drag to Pharagraph",
            QuestionKind::MultipleChoiceWithImage => "Multiple Choice With Image",
            QuestionKind::ShortAnswer => "Short Answer",
        }
    }

    // LearnDash answerType attribute for this kind.
    pub fn answer_type(&self) -> &'static str {
        match self {
            QuestionKind::MultipleSelection => "multiple",
            QuestionKind::MultipleChoice => "single",
            QuestionKind::TrueFalse => "single",
            QuestionKind::DragMatch => "matrix_sort_answer",
            QuestionKind::SortAnswers => "sort_answer",
            QuestionKind::DragToParagraph => "cloze_answer",
            QuestionKind::MultipleChoiceWithImage => "single",
            QuestionKind::ShortAnswer => "cloze_answer",
        }
    }
}

// One emitted answer option. `sort_text` is serialized as "stortText",
// the consumer's own spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerNode {
    pub answer_text: String,
    pub answer_html: bool,
    pub correct: bool,
    pub sort_text: String,
    pub grading_progression: Option<&'static str>,
    pub graded_type: Option<&'static str>,
}

impl AnswerNode {
    pub fn plain(text: impl Into<String>, correct: bool) -> Self {
        Self {
            answer_text: text.into(),
            answer_html: false,
            correct,
            sort_text: String::new(),
            grading_progression: None,
            graded_type: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            answer_text: text.into(),
            answer_html: true,
            correct: false,
            sort_text: String::new(),
            grading_progression: None,
            graded_type: None,
        }
    }

    pub fn pair(text: impl Into<String>, sort_text: impl Into<String>) -> Self {
        Self {
            answer_text: text.into(),
            answer_html: false,
            correct: false,
            sort_text: sort_text.into(),
            grading_progression: None,
            graded_type: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionNode {
    pub kind: QuestionKind,
    pub title: String,
    pub question_text: String,
    pub category: String,
    pub correct_msg: String,
    pub incorrect_msg: String,
    pub answers: Vec<AnswerNode>,
}

// One fully assembled quiz. Built top-to-bottom, serialized once,
// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct QuizDoc {
    pub course_id: String,
    pub test_id: String,
    pub title: String,
    pub settings: crate::settings::QuizSettings,
    pub questions: Vec<QuestionNode>,
}

impl QuizDoc {
    // Deterministic artifact name: `{courseId:0>4}-Q{testId:0>4}`.
    pub fn document_name(&self) -> String {
        format!("{}-Q{}", self.course_id, self.test_id)
    }

    pub fn file_name(&self) -> String {
        format!("{}.xml", self.document_name())
    }
}

// Identifiers arrive as strings and are padded as strings, matching the
// upstream convention (ids wider than 4 digits pass through unchanged).
pub fn zero_pad(id: &str, width: usize) -> String {
    if id.len() >= width {
        id.to_string()
    } else {
        format!("{}{}", "0".repeat(width - id.len()), id)
    }
}

// Normalized boolean rule for the export's TRUE/FALSE-ish columns. The
// upstream data mixes "TRUE", "True" and bare "1"; one rule is applied
// uniformly everywhere a flag is read.
pub fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
