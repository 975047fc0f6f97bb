use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ConvertError;
use crate::models::{AnswerNode, QuestionNode, QuizDoc};
use crate::settings::QuizSettings;

type XmlWriter = Writer<Vec<u8>>;

// Render one quiz document and write it to
// {output_dir}/{courseId}-Q{testId}.xml. Rendering happens fully in
// memory first so a failure never leaves a truncated file behind.
pub fn write_document(doc: &QuizDoc, output_dir: &Path) -> Result<PathBuf, ConvertError> {
    let rendered = render(doc)?;
    let path = output_dir.join(doc.file_name());
    fs::write(&path, rendered).map_err(|source| ConvertError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

pub fn render(doc: &QuizDoc) -> Result<Vec<u8>, ConvertError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    w.write_event(Event::Start(BytesStart::new("wpProQuiz")))?;

    let mut header = BytesStart::new("header");
    header.push_attribute(("version", "0.29"));
    header.push_attribute(("exportVersion", "1"));
    header.push_attribute(("ld_version", "4.20.2.1"));
    header.push_attribute(("LEARNDASH_SETTINGS_DB_VERSION", "2.5"));
    w.write_event(Event::Empty(header))?;

    w.write_event(Event::Start(BytesStart::new("data")))?;
    w.write_event(Event::Start(BytesStart::new("quiz")))?;

    cdata_element(&mut w, "title", &[("titleHidden", "true")], &doc.title)?;
    cdata_element(&mut w, "text", &[], "AAZZAAZZ")?;

    w.write_event(Event::Start(with_attrs("resultText", &[("gradeEnabled", "true")])))?;
    cdata_element(&mut w, "text", &[("prozent", "0")], "")?;
    w.write_event(Event::End(BytesEnd::new("resultText")))?;

    write_settings(&mut w, &doc.settings)?;

    w.write_event(Event::Start(BytesStart::new("questions")))?;
    for question in &doc.questions {
        write_question(&mut w, question)?;
    }
    w.write_event(Event::End(BytesEnd::new("questions")))?;

    write_post_blocks(&mut w, doc)?;

    w.write_event(Event::End(BytesEnd::new("quiz")))?;
    w.write_event(Event::End(BytesEnd::new("data")))?;
    w.write_event(Event::End(BytesEnd::new("wpProQuiz")))?;

    Ok(w.into_inner())
}

// The fixed presentation defaults plus the four test-derived values.
// Element order matches what the importer's own exporter produces and
// is treated as part of the contract.
fn write_settings(w: &mut XmlWriter, settings: &QuizSettings) -> Result<(), ConvertError> {
    text_element(w, "prerequisite", &[], "false")?;
    text_element(w, "startOnlyRegisteredUser", &[], "false")?;
    text_element(
        w,
        "quizRunOnce",
        &[
            ("time", settings.repeats.as_str()),
            ("type", "0"),
            ("cookie", "true"),
        ],
        "false",
    )?;
    text_element(w, "forcingQuestionSolve", &[], "false")?;
    text_element(w, "timeLimit", &[], "0")?;
    text_element(w, "autostart", &[], "false")?;
    text_element(w, "quizModus", &[("questionsPerPage", "0")], "0")?;
    text_element(w, "showReviewQuestion", &[], "false")?;
    text_element(w, "quizSummaryHide", &[], "false")?;
    text_element(w, "skipQuestionDisabled", &[], "true")?;
    text_element(w, "sortCategories", &[], "false")?;
    text_element(w, "questionRandom", &[], "false")?;
    text_element(w, "showMaxQuestion", &[("showMaxQuestionValue", "0")], "false")?;
    text_element(w, "showPoints", &[], "false")?;
    text_element(w, "showCategory", &[], "false")?;
    text_element(w, "hideQuestionPositionOverview", &[], "true")?;
    text_element(w, "hideQuestionNumbering", &[], "true")?;
    text_element(w, "numberedAnswer", &[], "false")?;
    text_element(w, "answerRandom", &[], "true")?;
    text_element(w, "btnRestartQuizHidden", &[], "false")?;
    text_element(w, "showAverageResult", &[], "true")?;
    text_element(w, "showCategoryScore", &[], "true")?;
    text_element(w, "hideResultPoints", &[], "true")?;
    text_element(w, "hideResultCorrectQuestion", &[], "false")?;
    text_element(w, "hideResultQuizTime", &[], "false")?;
    text_element(
        w,
        "hideAnswerMessageBox",
        &[],
        if settings.show_answer_message_box {
            "false"
        } else {
            "true"
        },
    )?;
    text_element(w, "disabledAnswerMark", &[], "true")?;
    text_element(w, "btnViewQuestionHidden", &[], "false")?;

    let mut forms = BytesStart::new("forms");
    forms.push_attribute(("activated", "false"));
    forms.push_attribute(("position", "0"));
    w.write_event(Event::Empty(forms))?;

    w.write_event(Event::Start(with_attrs("toplist", &[("activated", "false")])))?;
    text_element(w, "toplistDataAddPermissions", &[], "1")?;
    text_element(w, "toplistDataAddMultiple", &[], "false")?;
    text_element(w, "toplistDataAddBlock", &[], "0")?;
    text_element(w, "toplistDataAddAutomatic", &[], "false")?;
    text_element(w, "toplistDataShowLimit", &[], "0")?;
    text_element(w, "toplistDataSort", &[], "1")?;
    text_element(w, "toplistDataShowIn", &[], "0")?;
    text_element(w, "toplistDataCaptcha", &[], "false")?;
    w.write_event(Event::End(BytesEnd::new("toplist")))?;

    let mut statistic = BytesStart::new("statistic");
    statistic.push_attribute(("activated", "true"));
    statistic.push_attribute(("ipLock", "1440"));
    w.write_event(Event::Empty(statistic))?;

    text_element(w, "emailNotification", &[], "0")?;
    text_element(w, "userEmailNotification", &[], "false")?;
    Ok(())
}

fn write_question(w: &mut XmlWriter, question: &QuestionNode) -> Result<(), ConvertError> {
    w.write_event(Event::Start(with_attrs(
        "question",
        &[("answerType", question.kind.answer_type())],
    )))?;

    // The importer ignores this element; it records the upstream type
    // for later auditing.
    text_element(w, "skillifyQuestionType", &[], question.kind.as_str())?;
    cdata_element(w, "title", &[], &question.title)?;
    cdata_element(w, "questionText", &[], &question.question_text)?;
    text_element(w, "category", &[], &question.category)?;
    text_element(w, "points", &[], "1")?;
    text_element(w, "answerPointsActivated", &[], "false")?;
    text_element(w, "showPointsInBox", &[], "false")?;
    text_element(w, "answerPointsDiffModusActivated", &[], "false")?;
    text_element(w, "disableCorrect", &[], "false")?;
    text_element(w, "correctSameText", &[], "false")?;
    cdata_element(w, "correctMsg", &[], &question.correct_msg)?;
    cdata_element(w, "incorrectMsg", &[], &question.incorrect_msg)?;
    cdata_element(w, "tipMsg", &[("enabled", "false")], "")?;

    w.write_event(Event::Start(BytesStart::new("answers")))?;
    for answer in &question.answers {
        write_answer(w, answer)?;
    }
    w.write_event(Event::End(BytesEnd::new("answers")))?;

    w.write_event(Event::End(BytesEnd::new("question")))?;
    Ok(())
}

fn write_answer(w: &mut XmlWriter, answer: &AnswerNode) -> Result<(), ConvertError> {
    let mut elt = BytesStart::new("answer");
    elt.push_attribute(("points", "0"));
    elt.push_attribute(("correct", if answer.correct { "true" } else { "false" }));
    if let Some(progression) = answer.grading_progression {
        elt.push_attribute(("gradingProgression", progression));
    }
    if let Some(graded) = answer.graded_type {
        elt.push_attribute(("gradedType", graded));
    }
    w.write_event(Event::Start(elt))?;

    cdata_element(
        w,
        "answerText",
        &[("html", if answer.answer_html { "true" } else { "false" })],
        &answer.answer_text,
    )?;
    // The consumer's field name, misspelling included.
    cdata_element(w, "stortText", &[("html", "true")], &answer.sort_text)?;

    w.write_event(Event::End(BytesEnd::new("answer")))?;
    Ok(())
}

fn write_post_blocks(w: &mut XmlWriter, doc: &QuizDoc) -> Result<(), ConvertError> {
    w.write_event(Event::Start(BytesStart::new("post")))?;
    cdata_element(w, "post_title", &[], &doc.title)?;
    cdata_element(w, "post_content", &[], "")?;
    w.write_event(Event::End(BytesEnd::new("post")))?;

    write_post_meta(w, "_viewProfileStatistics", "1")?;
    write_post_meta(w, "_timeLimitCookie", "0")?;
    write_post_meta(w, "_sfwd-quiz", &doc.settings.meta_blob_json()?)?;
    Ok(())
}

fn write_post_meta(w: &mut XmlWriter, key: &str, value: &str) -> Result<(), ConvertError> {
    w.write_event(Event::Start(BytesStart::new("post_meta")))?;
    cdata_element(w, "meta_key", &[], key)?;
    cdata_element(w, "meta_value", &[], value)?;
    w.write_event(Event::End(BytesEnd::new("post_meta")))?;
    Ok(())
}

fn with_attrs(name: &'static str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
    let mut elt = BytesStart::new(name);
    for attr in attrs {
        elt.push_attribute(*attr);
    }
    elt
}

fn text_element(
    w: &mut XmlWriter,
    name: &'static str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<(), ConvertError> {
    w.write_event(Event::Start(with_attrs(name, attrs)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn cdata_element(
    w: &mut XmlWriter,
    name: &'static str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<(), ConvertError> {
    w.write_event(Event::Start(with_attrs(name, attrs)))?;
    w.write_event(Event::CData(BytesCData::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerNode, QuestionKind};

    fn sample_doc() -> QuizDoc {
        QuizDoc {
            course_id: "0012".into(),
            test_id: "0077".into(),
            title: "Sample 0012-Q0077".into(),
            settings: QuizSettings {
                resume: "TRUE".into(),
                repeats: "3".into(),
                feedback_each: false,
                show_answer_message_box: true,
            },
            questions: vec![QuestionNode {
                kind: QuestionKind::TrueFalse,
                title: "Q1 (0012-Q0077-5)".into(),
                question_text: "<p>Is it on?</p>".into(),
                category: "Domain 1".into(),
                correct_msg: "<p>Yes.</p>".into(),
                incorrect_msg: "".into(),
                answers: vec![
                    AnswerNode::plain("True", true),
                    AnswerNode::plain("False", false),
                ],
            }],
        }
    }

    fn rendered() -> String {
        String::from_utf8(render(&sample_doc()).unwrap()).unwrap()
    }

    fn assert_ordered(haystack: &str, needles: &[&str]) {
        let mut last = 0;
        for needle in needles {
            let at = haystack[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("'{needle}' missing or out of order"));
            last += at + needle.len();
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn declaration_and_header_attributes() {
            let out = rendered();
            assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
            assert!(out.contains(
                "<header version=\"0.29\" exportVersion=\"1\" ld_version=\"4.20.2.1\" \
                 LEARNDASH_SETTINGS_DB_VERSION=\"2.5\"/>"
            ));
        }

        #[test]
        fn title_is_cdata_with_hidden_flag() {
            assert!(rendered().contains(
                "<title titleHidden=\"true\"><![CDATA[Sample 0012-Q0077]]></title>"
            ));
        }

        #[test]
        fn required_text_marker_present() {
            assert!(rendered().contains("<text><![CDATA[AAZZAAZZ]]></text>"));
        }

        #[test]
        fn result_text_nests_graded_message() {
            assert_ordered(
                &rendered(),
                &[
                    "<resultText gradeEnabled=\"true\">",
                    "<text prozent=\"0\"><![CDATA[]]></text>",
                    "</resultText>",
                ],
            );
        }

        #[test]
        fn top_level_section_order() {
            assert_ordered(
                &rendered(),
                &[
                    "<wpProQuiz>",
                    "<header ",
                    "<data>",
                    "<quiz>",
                    "<title ",
                    "<questions>",
                    "<post>",
                    "<post_meta>",
                    "</quiz>",
                    "</data>",
                    "</wpProQuiz>",
                ],
            );
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn repeats_flow_into_run_once_attributes() {
            assert!(rendered().contains(
                "<quizRunOnce time=\"3\" type=\"0\" cookie=\"true\">false</quizRunOnce>"
            ));
        }

        #[test]
        fn study_guide_keeps_answer_message_box_visible() {
            let out = rendered();
            assert!(out.contains("<hideAnswerMessageBox>false</hideAnswerMessageBox>"));

            let mut doc = sample_doc();
            doc.settings.show_answer_message_box = false;
            let out = String::from_utf8(render(&doc).unwrap()).unwrap();
            assert!(out.contains("<hideAnswerMessageBox>true</hideAnswerMessageBox>"));
        }

        #[test]
        fn fixed_defaults_are_emitted() {
            let out = rendered();
            assert!(out.contains("<answerRandom>true</answerRandom>"));
            assert!(out.contains("<skipQuestionDisabled>true</skipQuestionDisabled>"));
            assert!(out.contains("<forms activated=\"false\" position=\"0\"/>"));
            assert!(out.contains("<statistic activated=\"true\" ipLock=\"1440\"/>"));
            assert_ordered(
                &out,
                &[
                    "<toplist activated=\"false\">",
                    "<toplistDataAddPermissions>1</toplistDataAddPermissions>",
                    "<toplistDataCaptcha>false</toplistDataCaptcha>",
                    "</toplist>",
                ],
            );
        }
    }

    mod question_tests {
        use super::*;

        #[test]
        fn answer_type_attribute_follows_kind() {
            assert!(rendered().contains("<question answerType=\"single\">"));
        }

        #[test]
        fn upstream_type_is_recorded() {
            assert!(rendered().contains(
                "<skillifyQuestionType>True / False</skillifyQuestionType>"
            ));
        }

        #[test]
        fn free_text_fields_use_cdata() {
            let out = rendered();
            assert!(out.contains("<title><![CDATA[Q1 (0012-Q0077-5)]]></title>"));
            assert!(out.contains("<questionText><![CDATA[<p>Is it on?</p>]]></questionText>"));
            assert!(out.contains("<correctMsg><![CDATA[<p>Yes.</p>]]></correctMsg>"));
            assert!(out.contains("<incorrectMsg><![CDATA[]]></incorrectMsg>"));
            assert!(out.contains("<tipMsg enabled=\"false\"><![CDATA[]]></tipMsg>"));
        }

        #[test]
        fn fixed_question_flags() {
            let out = rendered();
            assert_ordered(
                &out,
                &[
                    "<points>1</points>",
                    "<answerPointsActivated>false</answerPointsActivated>",
                    "<showPointsInBox>false</showPointsInBox>",
                    "<answerPointsDiffModusActivated>false</answerPointsDiffModusActivated>",
                    "<disableCorrect>false</disableCorrect>",
                    "<correctSameText>false</correctSameText>",
                ],
            );
        }

        #[test]
        fn answers_carry_points_and_correct_attributes() {
            assert_ordered(
                &rendered(),
                &[
                    "<answer points=\"0\" correct=\"true\">",
                    "<answerText html=\"false\"><![CDATA[True]]></answerText>",
                    "<stortText html=\"true\"><![CDATA[]]></stortText>",
                    "<answer points=\"0\" correct=\"false\">",
                    "<answerText html=\"false\"><![CDATA[False]]></answerText>",
                ],
            );
        }

        #[test]
        fn html_answers_set_the_html_flag() {
            let mut doc = sample_doc();
            doc.questions[0].answers = vec![AnswerNode::html("<p>x {fn} y</p>")];
            let out = String::from_utf8(render(&doc).unwrap()).unwrap();
            assert!(out.contains(
                "<answerText html=\"true\"><![CDATA[<p>x {fn} y</p>]]></answerText>"
            ));
        }

        #[test]
        fn matrix_pairs_fill_sort_text() {
            let mut doc = sample_doc();
            doc.questions[0].answers = vec![AnswerNode::pair("TCP", "Transport")];
            let out = String::from_utf8(render(&doc).unwrap()).unwrap();
            assert_ordered(
                &out,
                &[
                    "<answerText html=\"false\"><![CDATA[TCP]]></answerText>",
                    "<stortText html=\"true\"><![CDATA[Transport]]></stortText>",
                ],
            );
        }
    }

    mod post_tests {
        use super::*;

        #[test]
        fn post_block_repeats_the_title() {
            assert_ordered(
                &rendered(),
                &[
                    "<post>",
                    "<post_title><![CDATA[Sample 0012-Q0077]]></post_title>",
                    "<post_content><![CDATA[]]></post_content>",
                    "</post>",
                ],
            );
        }

        #[test]
        fn meta_blocks_in_contract_order() {
            assert_ordered(
                &rendered(),
                &[
                    "<meta_key><![CDATA[_viewProfileStatistics]]></meta_key>",
                    "<meta_value><![CDATA[1]]></meta_value>",
                    "<meta_key><![CDATA[_timeLimitCookie]]></meta_key>",
                    "<meta_value><![CDATA[0]]></meta_value>",
                    "<meta_key><![CDATA[_sfwd-quiz]]></meta_key>",
                ],
            );
        }

        #[test]
        fn settings_blob_lands_in_final_meta_value() {
            let out = rendered();
            let blob_at = out.find("<![CDATA[{\"sfwd-quiz_titleHidden\":\"true\"").unwrap();
            assert!(out[blob_at..].contains("\"sfwd-quiz_quiz_resume\":\"TRUE\""));
            assert!(out[blob_at..].contains("\"sfwd-quiz_repeats\":\"3\""));
            assert!(out[blob_at..].contains("\"sfwd-quiz_timeLimitCookie\":\"\"}"));
        }
    }

    mod file_tests {
        use super::*;
        use std::fs;

        fn scratch_dir(tag: &str) -> PathBuf {
            let dir = std::env::temp_dir().join(format!(
                "quizport-xml-{tag}-{}",
                std::process::id()
            ));
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        #[test]
        fn file_name_follows_padded_ids() {
            let dir = scratch_dir("name");
            let path = write_document(&sample_doc(), &dir).unwrap();
            assert_eq!(path.file_name().unwrap(), "0012-Q0077.xml");
            let contents = fs::read_to_string(&path).unwrap();
            assert!(contents.contains("<wpProQuiz>"));
            fs::remove_dir_all(&dir).unwrap();
        }

        #[test]
        fn missing_output_directory_is_reported() {
            let dir = scratch_dir("missing").join("no-such-subdir");
            let err = write_document(&sample_doc(), &dir).unwrap_err();
            match err {
                ConvertError::WriteFailed { path, .. } => {
                    assert!(path.ends_with("0012-Q0077.xml"));
                }
                other => panic!("expected WriteFailed, got {other}"),
            }
        }
    }
}
