use crate::error::ConvertError;
use crate::models::{
    zero_pad, AnswerNode, AnswerRow, QuestionKind, QuestionNode, QuestionRow, QuizDoc,
    ScenarioRow, TestRow,
};
use crate::sanitize::{
    clean_text, fill_blank_run, mask_braces, replace_cloze_spans, standardize_reference,
};
use crate::settings::QuizSettings;
use crate::tables::SourceTables;

const ID_WIDTH: usize = 4;

// Public delivery host for scenario images. Asset-storage paths from
// the export are rewritten onto this prefix.
const MEDIA_BASE: &str = "https://media.learningacademy.com/Courses/Course_";

const DRAG_INSTRUCTIONS: &str = concat!(
    "<p><strong>Drag and drop is disabled.</strong></p>",
    "<p>Type exactly one of the lines below into each blank in the code sample.</p>",
    "<p>Be sure to match spacing, punctuation, and case.</p>",
    "<p>Possible entries: "
);

const SHORT_ANSWER_INSTRUCTIONS: &str = concat!(
    "<p><strong>Instructions</strong>: Complete the following statement by filling in the ",
    "blanks with the correct words or phrases. Please pay close attention to ",
    "capitalization&mdash;responses may be case-sensitive.</p>"
);

// One document per Test row, in source order. Any error aborts the
// whole batch; documents already returned are complete and valid.
pub fn convert_all(tables: &SourceTables) -> Result<Vec<QuizDoc>, ConvertError> {
    tables
        .tests()
        .iter()
        .map(|test| build_quiz(test, tables))
        .collect()
}

pub fn build_quiz(test: &TestRow, tables: &SourceTables) -> Result<QuizDoc, ConvertError> {
    let course_id = zero_pad(&test.course_id, ID_WIDTH);
    let test_id = zero_pad(&test.test_id, ID_WIDTH);
    let title = format!("{} {}-Q{}", test.test_name, course_id, test_id);

    let mut questions = Vec::new();
    for row in tables.questions_for(&test.test_id) {
        // The export carries placeholder rows with no type at all;
        // those are skipped. A non-empty unknown type is still fatal.
        if row.question_type.is_empty() || row.question_type == "NULL" {
            continue;
        }
        let kind = QuestionKind::from_str(&row.question_type).ok_or_else(|| {
            ConvertError::UnknownKind {
                test_id: test.test_id.clone(),
                question_id: row.question_id.clone(),
                raw: row.question_type.clone(),
            }
        })?;

        let answers = tables.answers_for(&test.test_id, &row.question_id);
        let scenarios = tables.scenarios_for(&test.test_id, &row.question_id);
        questions.push(build_question(
            test, row, kind, answers, scenarios, &course_id, &test_id,
        )?);
    }

    Ok(QuizDoc {
        course_id,
        test_id,
        title,
        settings: QuizSettings::from_test(test),
        questions,
    })
}

fn build_question(
    test: &TestRow,
    row: &QuestionRow,
    kind: QuestionKind,
    answers: &[AnswerRow],
    scenarios: &[ScenarioRow],
    course_id: &str,
    test_id: &str,
) -> Result<QuestionNode, ConvertError> {
    let (question_text, answer_nodes) = build_answers(test, row, kind, answers, scenarios)?;

    Ok(QuestionNode {
        kind,
        title: format!(
            "{} ({course_id}-Q{test_id}-{})",
            row.question_name, row.question_id
        ),
        question_text,
        category: standardize_reference(&row.question_reference),
        correct_msg: soft_message(&row.question_explanation),
        incorrect_msg: soft_message(&row.incorrect_explanation),
        answers: answer_nodes,
    })
}

// Absent or literal-"NULL" explanation text is an empty message, not an
// error.
fn soft_message(raw: &str) -> String {
    if raw.is_empty() || raw == "NULL" {
        String::new()
    } else {
        clean_text(raw)
    }
}

// The answer-shape dispatcher: a closed match over the eight kinds.
// Returns the (possibly rewritten) question text together with the
// kind-shaped answer list.
fn build_answers(
    test: &TestRow,
    row: &QuestionRow,
    kind: QuestionKind,
    answers: &[AnswerRow],
    scenarios: &[ScenarioRow],
) -> Result<(String, Vec<AnswerNode>), ConvertError> {
    let arity_error = |expected: &'static str| ConvertError::AnswerArity {
        test_id: test.test_id.clone(),
        question_id: row.question_id.clone(),
        kind: kind.as_str(),
        expected,
        found: answers.len(),
    };

    match kind {
        QuestionKind::MultipleSelection | QuestionKind::MultipleChoice => {
            if answers.len() < 2 {
                return Err(arity_error("two or more answers"));
            }
            let nodes = answers
                .iter()
                .map(|a| AnswerNode::plain(clean_text(&a.answer_description), a.is_correct()))
                .collect();
            Ok((row.question_text.clone(), nodes))
        }

        QuestionKind::TrueFalse => {
            // The export stores only the correct value as a 0/1 flag;
            // both options are synthesized here.
            let flag = answers.first().ok_or_else(|| arity_error("one answer"))?;
            let truth = flag.answer_description.trim() == "1";
            let nodes = vec![
                AnswerNode::plain("True", truth),
                AnswerNode::plain("False", !truth),
            ];
            Ok((row.question_text.clone(), nodes))
        }

        QuestionKind::DragMatch => {
            if answers.len() < 4 {
                return Err(arity_error("four or more answers (two pairs)"));
            }
            if answers.len() % 2 != 0 {
                return Err(arity_error("an even number of answers"));
            }
            // Pairing is positional: row i is the criterion, row i+1
            // its match.
            let nodes = answers
                .chunks_exact(2)
                .map(|pair| {
                    AnswerNode::pair(
                        clean_text(&pair[0].answer_description),
                        clean_text(&pair[1].answer_description),
                    )
                })
                .collect();
            Ok((row.question_text.clone(), nodes))
        }

        QuestionKind::SortAnswers => {
            if answers.len() < 3 {
                return Err(arity_error("three or more answers"));
            }
            let mut ordered: Vec<(i64, &AnswerRow)> = Vec::with_capacity(answers.len());
            for a in answers {
                let order = a.answer_order.trim().parse::<i64>().map_err(|_| {
                    ConvertError::BadAnswerOrder {
                        test_id: test.test_id.clone(),
                        question_id: row.question_id.clone(),
                        raw: a.answer_order.clone(),
                    }
                })?;
                ordered.push((order, a));
            }
            ordered.sort_by_key(|(order, _)| *order);

            // The row flagged "Correct" carries the full ordering as
            // redundant text; it is the canonical answer key, not an
            // option, and is dropped.
            let nodes = ordered
                .into_iter()
                .filter(|(_, a)| !a.is_correct())
                .map(|(_, a)| AnswerNode::plain(clean_text(&a.answer_description), false))
                .collect();
            Ok((row.question_text.clone(), nodes))
        }

        QuestionKind::DragToParagraph => {
            let mut question_text = String::from(DRAG_INSTRUCTIONS);
            for (i, a) in answers.iter().enumerate() {
                question_text.push_str(&format!(
                    "<code style=\"background-color: #f0f0f0;\">{}</code>",
                    a.answer_description
                ));
                if i != answers.len() - 1 {
                    question_text.push_str(", ");
                }
            }
            question_text.push_str("</p>");

            let body = replace_cloze_spans(&mask_braces(&row.question_text));
            Ok((question_text, vec![AnswerNode::html(clean_text(&body))]))
        }

        QuestionKind::MultipleChoiceWithImage => {
            if answers.len() < 2 {
                return Err(arity_error("two or more answers"));
            }
            if scenarios.len() > 1 {
                return Err(ConvertError::DuplicateScenario {
                    test_id: test.test_id.clone(),
                    question_id: row.question_id.clone(),
                });
            }
            let question_text = match scenarios.first() {
                Some(scenario) => format!(
                    "<p><img src=\"{MEDIA_BASE}{}{}\"></p>{}",
                    test.course_id,
                    delivery_path(&scenario.scenario_path),
                    row.question_text
                ),
                None => row.question_text.clone(),
            };
            let nodes = answers
                .iter()
                .map(|a| AnswerNode::plain(clean_text(&a.answer_description), a.is_correct()))
                .collect();
            Ok((question_text, nodes))
        }

        QuestionKind::ShortAnswer => {
            if answers.len() != 1 {
                return Err(arity_error("exactly one answer"));
            }
            let placeholder = format!("{{{}}}", answers[0].answer_description);
            let body = fill_blank_run(&mask_braces(&row.question_text), &placeholder);
            Ok((
                SHORT_ANSWER_INSTRUCTIONS.to_string(),
                vec![AnswerNode::html(clean_text(&body))],
            ))
        }
    }
}

// Asset-storage paths use "/Question_<id>/scenario.png"; the public
// delivery convention lowercases the question segment and doubles the
// image extension.
fn delivery_path(storage_path: &str) -> String {
    storage_path
        .replace("/Question_", "/question_")
        .replace("/scenario.png", "/Scenario.png.png")
}
