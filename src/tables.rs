use log::debug;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::error::ConvertError;
use crate::models::{AnswerRow, QuestionRow, ScenarioRow, TestRow};

const TEST_COLUMNS: &[&str] = &[
    "TestId",
    "CourseId",
    "TestName",
    "SaveAndResume",
    "Resumes",
    "ShowFeedback",
    "ShowStudyGuide",
];
const QUESTION_COLUMNS: &[&str] = &[
    "TestId",
    "QuestionId",
    "QuestionName",
    "QuestionText",
    "QuestionType",
    "QuestionExplanation",
    "IncorrectExplanation",
    "QuestionReference",
];
const ANSWER_COLUMNS: &[&str] = &[
    "TestId",
    "QuestionId",
    "AnswerDescription",
    "AnswerType",
    "AnswerOrder",
];
const SCENARIO_COLUMNS: &[&str] = &["TestId", "QuestionId", "ScenarioPath"];

// The four exports, fully loaded and joined. Iteration is driven from
// the Tests side; questions with no matching test are simply never
// visited. All lookups preserve source row order.
pub struct SourceTables {
    tests: Vec<TestRow>,
    questions_by_test: HashMap<String, Vec<QuestionRow>>,
    answers_by_question: HashMap<(String, String), Vec<AnswerRow>>,
    scenarios_by_question: HashMap<(String, String), Vec<ScenarioRow>>,
}

impl SourceTables {
    pub fn load(input_dir: &Path, prefix: &str) -> Result<Self, ConvertError> {
        let tests = load_table(&input_dir.join(format!("{prefix}Tests.csv")), TEST_COLUMNS)?;
        let questions = load_table(
            &input_dir.join(format!("{prefix}Questions.csv")),
            QUESTION_COLUMNS,
        )?;
        let answers = load_table(
            &input_dir.join(format!("{prefix}Answers.csv")),
            ANSWER_COLUMNS,
        )?;
        let scenarios = load_table(
            &input_dir.join(format!("{prefix}Scenarios.csv")),
            SCENARIO_COLUMNS,
        )?;
        Ok(Self::from_rows(tests, questions, answers, scenarios))
    }

    pub fn from_rows(
        tests: Vec<TestRow>,
        questions: Vec<QuestionRow>,
        answers: Vec<AnswerRow>,
        scenarios: Vec<ScenarioRow>,
    ) -> Self {
        let mut questions_by_test: HashMap<String, Vec<QuestionRow>> = HashMap::new();
        for q in questions {
            questions_by_test
                .entry(q.test_id.clone())
                .or_default()
                .push(q);
        }

        let mut answers_by_question: HashMap<(String, String), Vec<AnswerRow>> = HashMap::new();
        for a in answers {
            answers_by_question
                .entry((a.test_id.clone(), a.question_id.clone()))
                .or_default()
                .push(a);
        }

        let mut scenarios_by_question: HashMap<(String, String), Vec<ScenarioRow>> =
            HashMap::new();
        for s in scenarios {
            scenarios_by_question
                .entry((s.test_id.clone(), s.question_id.clone()))
                .or_default()
                .push(s);
        }

        Self {
            tests,
            questions_by_test,
            answers_by_question,
            scenarios_by_question,
        }
    }

    pub fn tests(&self) -> &[TestRow] {
        &self.tests
    }

    pub fn questions_for(&self, test_id: &str) -> &[QuestionRow] {
        self.questions_by_test
            .get(test_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn answers_for(&self, test_id: &str, question_id: &str) -> &[AnswerRow] {
        self.answers_by_question
            .get(&(test_id.to_string(), question_id.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn scenarios_for(&self, test_id: &str, question_id: &str) -> &[ScenarioRow] {
        self.scenarios_by_question
            .get(&(test_id.to_string(), question_id.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// Loads one export. The header is validated against the required
// column set before any row is deserialized, so a schema drift in the
// upstream exporter is reported once, up front, and never as a per-row
// failure halfway through.
fn load_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>, ConvertError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| ConvertError::UnreadableSource {
        path: display.clone(),
        source,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let headers = reader
        .headers()
        .map_err(|source| ConvertError::MalformedRow {
            path: display.clone(),
            source,
        })?
        .clone();
    debug!("{display}: columns {:?}", headers);

    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ConvertError::MissingColumn {
                path: display,
                column: (*column).to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.map_err(|source| ConvertError::MalformedRow {
            path: display.clone(),
            source,
        })?);
    }
    Ok(rows)
}
