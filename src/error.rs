use thiserror::Error;

// Fatal errors abort the whole run: a malformed export means partial
// output would be misleading. Soft defaults (blank/NULL explanation
// fields) are handled inline and never reach this enum.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read {path}: {source}")]
    UnreadableSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path}: {source}")]
    MalformedRow {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("test {test_id}, question {question_id}: unknown question type '{raw}'")]
    UnknownKind {
        test_id: String,
        question_id: String,
        raw: String,
    },

    #[error("test {test_id}, question {question_id} ({kind}): expected {expected}; {found} found")]
    AnswerArity {
        test_id: String,
        question_id: String,
        kind: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("test {test_id}, question {question_id}: more than one scenario linked to a single question")]
    DuplicateScenario { test_id: String, question_id: String },

    #[error("test {test_id}, question {question_id}: answer order '{raw}' is not a number")]
    BadAnswerOrder {
        test_id: String,
        question_id: String,
        raw: String,
    },

    #[error("cannot write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings blob serialization failed: {0}")]
    BlobEncoding(#[from] serde_json::Error),

    #[error("xml serialization failed: {0}")]
    XmlEncoding(#[from] quick_xml::Error),
}
