use serde_json::{json, Map, Value};

use crate::models::{parse_flag, TestRow};

// Per-test presentation settings. Everything else in the settings
// section is a fixed default; these four are the only values the Tests
// export actually controls. The resume flag and retake count are copied
// verbatim, matching what the consumer stores.
#[derive(Debug, Clone, Default)]
pub struct QuizSettings {
    pub resume: String,
    pub repeats: String,
    pub feedback_each: bool,
    pub show_answer_message_box: bool,
}

impl QuizSettings {
    pub fn from_test(row: &TestRow) -> Self {
        Self {
            resume: row.save_and_resume.clone(),
            repeats: row.resumes.clone(),
            feedback_each: parse_flag(&row.show_feedback),
            show_answer_message_box: parse_flag(&row.show_study_guide),
        }
    }

    // The flattened settings blob the consumer validates independently
    // of the structured tree fields. Key set, value types and insertion
    // order are all part of the external contract; several keys overlap
    // the structured fields on purpose and must not be deduplicated.
    pub fn meta_blob(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("sfwd-quiz_titleHidden".into(), json!("true"));
        m.insert("sfwd-quiz_resultText".into(), json!(""));
        m.insert("sfwd-quiz_quiz_pro".into(), json!(""));
        m.insert("sfwd-quiz_course".into(), json!(""));
        m.insert("sfwd-quiz_lesson".into(), json!(""));
        m.insert("sfwd-quiz_lesson_schedule".into(), json!(""));
        m.insert("sfwd-quiz_visible_after".into(), json!(""));
        m.insert("sfwd-quiz_visible_after_specific_date".into(), json!(""));
        m.insert("sfwd-quiz_external".into(), json!(""));
        m.insert("sfwd-quiz_external_type".into(), json!(""));
        m.insert("sfwd-quiz_external_require_attendance".into(), json!(""));
        m.insert("sfwd-quiz_prerequisite".into(), json!(""));
        m.insert("sfwd-quiz_prerequisiteList".into(), json!(""));
        m.insert("sfwd-quiz_startOnlyRegisteredUser".into(), json!(false));
        m.insert("sfwd-quiz_passingpercentage".into(), json!("80"));
        m.insert("sfwd-quiz_certificate".into(), json!(""));
        m.insert("sfwd-quiz_threshold".into(), json!("80"));
        m.insert("sfwd-quiz_quiz_resume".into(), json!(self.resume));
        m.insert("sfwd-quiz_quiz_resume_cookie_send_timer".into(), json!(20));
        m.insert("sfwd-quiz_retry_restrictions".into(), json!(""));
        m.insert("sfwd-quiz_quizRunOnce".into(), json!(false));
        m.insert("sfwd-quiz_repeats".into(), json!(self.repeats));
        m.insert("sfwd-quiz_quizRunOnceType".into(), json!(""));
        m.insert("sfwd-quiz_quizRunOnceCookie".into(), json!(true));
        m.insert("sfwd-quiz_forcingQuestionSolve".into(), json!(false));
        m.insert("sfwd-quiz_quiz_time_limit_enabled".into(), json!(""));
        m.insert("sfwd-quiz_timeLimit".into(), json!(0));
        m.insert("sfwd-quiz_quiz_materials_enabled".into(), json!(""));
        m.insert("sfwd-quiz_quiz_materials".into(), json!(""));
        m.insert("sfwd-quiz_autostart".into(), json!(false));
        m.insert("sfwd-quiz_quizModus".into(), json!(0));
        m.insert(
            "sfwd-quiz_quizModus_single_feedback".into(),
            json!(if self.feedback_each { "each" } else { "" }),
        );
        m.insert("sfwd-quiz_quizModus_single_back_button".into(), json!(""));
        m.insert(
            "sfwd-quiz_quizModus_multiple_questionsPerPage".into(),
            json!(0),
        );
        m.insert("sfwd-quiz_showReviewQuestion".into(), json!(false));
        m.insert("sfwd-quiz_quizSummaryHide".into(), json!(false));
        m.insert("sfwd-quiz_skipQuestionDisabled".into(), json!(true));
        m.insert("sfwd-quiz_custom_sorting".into(), json!(""));
        m.insert("sfwd-quiz_sortCategories".into(), json!(false));
        m.insert("sfwd-quiz_questionRandom".into(), json!(false));
        m.insert("sfwd-quiz_showMaxQuestion".into(), json!(""));
        m.insert("sfwd-quiz_showMaxQuestionValue".into(), json!(0));
        m.insert("sfwd-quiz_custom_question_elements".into(), json!(""));
        m.insert("sfwd-quiz_showPoints".into(), json!(false));
        m.insert("sfwd-quiz_showCategory".into(), json!(false));
        m.insert("sfwd-quiz_hideQuestionPositionOverview".into(), json!(true));
        m.insert("sfwd-quiz_hideQuestionNumbering".into(), json!(true));
        m.insert("sfwd-quiz_numberedAnswer".into(), json!(false));
        m.insert("sfwd-quiz_answerRandom".into(), json!(true));
        m.insert("sfwd-quiz_btnRestartQuizHidden".into(), json!(false));
        m.insert("sfwd-quiz_custom_result_data_display".into(), json!("on"));
        m.insert("sfwd-quiz_showAverageResult".into(), json!("on"));
        m.insert("sfwd-quiz_showCategoryScore".into(), json!("on"));
        m.insert("sfwd-quiz_hideResultPoints".into(), json!(true));
        m.insert("sfwd-quiz_hideResultCorrectQuestion".into(), json!(false));
        m.insert("sfwd-quiz_hideResultQuizTime".into(), json!(false));
        m.insert("sfwd-quiz_custom_answer_feedback".into(), json!("on"));
        m.insert(
            "sfwd-quiz_hideAnswerMessageBox".into(),
            json!(!self.show_answer_message_box),
        );
        m.insert("sfwd-quiz_disabledAnswerMark".into(), json!(true));
        m.insert("sfwd-quiz_btnViewQuestionHidden".into(), json!(false));
        m.insert("sfwd-quiz_formActivated".into(), json!(false));
        m.insert("sfwd-quiz_formShowPosition".into(), json!("0"));
        m.insert("sfwd-quiz_custom_fields_forms".into(), json!(""));
        m.insert("sfwd-quiz_toplistActivated".into(), json!(false));
        m.insert("sfwd-quiz_toplistDataAddPermissions".into(), json!(1));
        m.insert("sfwd-quiz_toplistDataAddMultiple".into(), json!(false));
        m.insert("sfwd-quiz_toplistDataAddBlock".into(), json!(0));
        m.insert("sfwd-quiz_toplistDataAddAutomatic".into(), json!(false));
        m.insert("sfwd-quiz_toplistDataShowLimit".into(), json!(0));
        m.insert("sfwd-quiz_toplistDataSort".into(), json!("1"));
        m.insert("sfwd-quiz_toplistDataShowIn_enabled".into(), json!(""));
        m.insert("sfwd-quiz_toplistDataShowIn".into(), json!(0));
        m.insert("sfwd-quiz_toplistDataCaptcha".into(), json!(false));
        m.insert("sfwd-quiz_statisticsOn".into(), json!(true));
        m.insert("sfwd-quiz_statisticsIpLock_enabled".into(), json!("on"));
        m.insert("sfwd-quiz_statisticsIpLock".into(), json!(1440));
        m.insert("sfwd-quiz_email_enabled".into(), json!(""));
        m.insert("sfwd-quiz_email_enabled_admin".into(), json!(""));
        m.insert("sfwd-quiz_emailNotification".into(), json!("0"));
        m.insert("sfwd-quiz_userEmailNotification".into(), json!(0));
        m.insert("sfwd-quiz_templates_enabled".into(), json!(""));
        m.insert("sfwd-quiz_advanced_settings".into(), json!("on"));
        m.insert("sfwd-quiz_timeLimitCookie_enabled".into(), json!("on"));
        m.insert("sfwd-quiz_associated_settings_enabled".into(), json!(""));
        m.insert("sfwd-quiz_course_short_description".into(), json!(""));
        m.insert("sfwd-quiz_viewProfileStatistics".into(), json!(true));
        m.insert("sfwd-quiz_timeLimitCookie".into(), json!(""));
        m
    }

    pub fn meta_blob_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Value::Object(self.meta_blob()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_row(
        save_and_resume: &str,
        resumes: &str,
        show_feedback: &str,
        show_study_guide: &str,
    ) -> TestRow {
        TestRow {
            test_id: "77".into(),
            course_id: "12".into(),
            test_name: "Sample".into(),
            save_and_resume: save_and_resume.into(),
            resumes: resumes.into(),
            show_feedback: show_feedback.into(),
            show_study_guide: show_study_guide.into(),
        }
    }

    #[test]
    fn resume_fields_are_copied_verbatim() {
        let settings = QuizSettings::from_test(&test_row("TRUE", "3", "FALSE", "FALSE"));
        assert_eq!(settings.resume, "TRUE");
        assert_eq!(settings.repeats, "3");

        let blob = settings.meta_blob();
        assert_eq!(blob["sfwd-quiz_quiz_resume"], json!("TRUE"));
        assert_eq!(blob["sfwd-quiz_repeats"], json!("3"));
    }

    #[test]
    fn show_feedback_selects_each_mode() {
        let on = QuizSettings::from_test(&test_row("FALSE", "0", "TRUE", "FALSE"));
        assert_eq!(on.meta_blob()["sfwd-quiz_quizModus_single_feedback"], json!("each"));

        let off = QuizSettings::from_test(&test_row("FALSE", "0", "FALSE", "FALSE"));
        assert_eq!(off.meta_blob()["sfwd-quiz_quizModus_single_feedback"], json!(""));
    }

    #[test]
    fn flag_parsing_is_uniform_across_spellings() {
        for truthy in ["TRUE", "true", "1"] {
            let s = QuizSettings::from_test(&test_row("FALSE", "0", truthy, truthy));
            assert!(s.feedback_each, "ShowFeedback '{truthy}'");
            assert!(s.show_answer_message_box, "ShowStudyGuide '{truthy}'");
        }
    }

    #[test]
    fn study_guide_controls_answer_message_box() {
        let shown = QuizSettings::from_test(&test_row("FALSE", "0", "FALSE", "TRUE"));
        assert_eq!(
            shown.meta_blob()["sfwd-quiz_hideAnswerMessageBox"],
            json!(false)
        );

        let hidden = QuizSettings::from_test(&test_row("FALSE", "0", "FALSE", "FALSE"));
        assert_eq!(
            hidden.meta_blob()["sfwd-quiz_hideAnswerMessageBox"],
            json!(true)
        );
    }

    #[test]
    fn blob_carries_fixed_defaults() {
        let blob = QuizSettings::default().meta_blob();
        assert_eq!(blob["sfwd-quiz_passingpercentage"], json!("80"));
        assert_eq!(blob["sfwd-quiz_statisticsIpLock"], json!(1440));
        assert_eq!(blob["sfwd-quiz_answerRandom"], json!(true));
        assert_eq!(blob["sfwd-quiz_titleHidden"], json!("true"));
        assert_eq!(blob["sfwd-quiz_viewProfileStatistics"], json!(true));
    }

    #[test]
    fn blob_key_order_is_stable() {
        let blob = QuizSettings::default().meta_blob();
        let keys: Vec<&String> = blob.keys().collect();
        assert_eq!(keys.first().map(|k| k.as_str()), Some("sfwd-quiz_titleHidden"));
        assert_eq!(keys.last().map(|k| k.as_str()), Some("sfwd-quiz_timeLimitCookie"));
        // The blob and the structured tree intentionally overlap.
        assert!(blob.contains_key("sfwd-quiz_quizRunOnce"));
        assert!(blob.contains_key("sfwd-quiz_timeLimit"));
    }

    #[test]
    fn blob_serializes_to_flat_json() {
        let json_text = QuizSettings::default().meta_blob_json().unwrap();
        assert!(json_text.starts_with("{\"sfwd-quiz_titleHidden\":\"true\""));
        assert!(json_text.contains("\"sfwd-quiz_quiz_resume_cookie_send_timer\":20"));
    }
}
