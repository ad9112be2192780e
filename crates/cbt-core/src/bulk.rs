//! Bulk question import and question validation.
//!
//! The import format is a JSON array of objects with `section`, `year`,
//! `subject`, `type`, `question`, `options` (four strings), `correctAnswer`
//! (0-3), and `track` for senior years. Parsing is all-or-nothing: a single
//! bad entry rejects the whole batch.

use serde::Deserialize;

use crate::catalog::{classification_problems, is_senior};
use crate::error::CbtError;
use crate::model::{Classification, NewQuestion, OPTION_COUNT};

/// Example import file.
pub const TEMPLATE: &str = r#"[
  {
    "section": "college",
    "year": 11,
    "track": "Science",
    "subject": "Physics",
    "type": "exam",
    "question": "What is the SI unit of force?",
    "options": ["Joule", "Newton", "Watt", "Pascal"],
    "correctAnswer": 1
  },
  {
    "section": "elementary",
    "year": 3,
    "subject": "Mathematics",
    "type": "test",
    "question": "What is 7 x 8?",
    "options": ["54", "56", "58", "64"],
    "correctAnswer": 1
  }
]
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportEntry {
    section: String,
    year: u8,
    subject: String,
    #[serde(rename = "type")]
    exam_type: String,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default)]
    track: Option<String>,
}

impl ImportEntry {
    fn into_question(self) -> Result<NewQuestion, String> {
        let section = self.section.parse()?;
        let exam_type = self.exam_type.parse()?;
        let track = match self.track.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) => Some(t.parse()?),
        };
        Ok(NewQuestion {
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer,
            classification: Classification {
                section,
                year: self.year,
                subject: self.subject,
                exam_type,
                track,
            },
        })
    }
}

/// Field problems with a question. Empty when the question can be stored.
pub fn question_problems(q: &NewQuestion) -> Vec<String> {
    let mut problems = Vec::new();
    if q.question.trim().is_empty() {
        problems.push("question text is required".to_string());
    }
    if q.options.len() != OPTION_COUNT {
        problems.push(format!(
            "expected {OPTION_COUNT} options, found {}",
            q.options.len()
        ));
    }
    if q.options.iter().any(|o| o.trim().is_empty()) {
        problems.push("options must not be blank".to_string());
    }
    if q.correct_answer >= OPTION_COUNT {
        problems.push(format!(
            "correct answer {} is outside 0-{}",
            q.correct_answer,
            OPTION_COUNT - 1
        ));
    }
    problems.extend(classification_problems(&q.classification));
    problems
}

/// Reject a question with missing or inconsistent fields.
pub fn validate_question(q: &NewQuestion) -> Result<(), CbtError> {
    let problems = question_problems(q);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CbtError::Validation(problems))
    }
}

/// Trim text fields and drop a track on non-senior years.
pub fn normalize_question(mut q: NewQuestion) -> NewQuestion {
    q.question = q.question.trim().to_string();
    q.options = q.options.iter().map(|o| o.trim().to_string()).collect();
    q.classification.subject = q.classification.subject.trim().to_string();
    if !is_senior(q.classification.year) {
        q.classification.track = None;
    }
    q
}

/// Parse and validate bulk import text.
pub fn parse_bulk_import(text: &str) -> Result<Vec<NewQuestion>, CbtError> {
    let malformed = |reason: String| CbtError::MalformedBulkImport { reason };

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(malformed("expected a JSON array of questions".to_string()));
    };
    if entries.is_empty() {
        return Err(malformed("the array contains no questions".to_string()));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let entry: ImportEntry = serde_json::from_value(entry)
                .map_err(|e| malformed(format!("entry {i}: {e}")))?;
            let question = entry
                .into_question()
                .map(normalize_question)
                .map_err(|e| malformed(format!("entry {i}: {e}")))?;
            let problems = question_problems(&question);
            if !problems.is_empty() {
                return Err(malformed(format!("entry {i}: {}", problems.join("; "))));
            }
            Ok(question)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamType, Section, Track};

    #[test]
    fn template_parses() {
        let questions = parse_bulk_import(TEMPLATE).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].classification.track, Some(Track::Science));
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(questions[1].classification.section, Section::Elementary);
        assert_eq!(questions[1].classification.exam_type, ExamType::Test);
    }

    #[test]
    fn object_instead_of_array_is_malformed() {
        let err = parse_bulk_import("{not an array}").unwrap_err();
        assert!(matches!(err, CbtError::MalformedBulkImport { .. }));

        let err = parse_bulk_import(r#"{"question": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn empty_array_is_malformed() {
        assert!(matches!(
            parse_bulk_import("[]"),
            Err(CbtError::MalformedBulkImport { .. })
        ));
    }

    #[test]
    fn one_bad_entry_rejects_all() {
        let text = r#"[
            {"section":"college","year":8,"subject":"French","type":"test",
             "question":"Bonjour?","options":["a","b","c","d"],"correctAnswer":0},
            {"section":"college","year":8,"subject":"French","type":"test",
             "question":"Merci?","options":["a","b","c"],"correctAnswer":5}
        ]"#;
        let err = parse_bulk_import(text).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("entry 1"), "{msg}");
        assert!(msg.contains("expected 4 options"), "{msg}");
    }

    #[test]
    fn senior_entry_requires_track() {
        let text = r#"[{"section":"college","year":12,"subject":"Economics","type":"exam",
            "question":"Define GDP","options":["a","b","c","d"],"correctAnswer":2,"track":""}]"#;
        let err = parse_bulk_import(text).unwrap_err();
        assert!(err.to_string().contains("track is required"));
    }

    #[test]
    fn junior_track_is_dropped() {
        let text = r#"[{"section":"college","year":7,"subject":"Yoruba","type":"practice",
            "question":" Ekaro? ","options":["a","b","c","d"],"correctAnswer":3,"track":"Arts"}]"#;
        let questions = parse_bulk_import(text).unwrap();
        assert_eq!(questions[0].classification.track, None);
        assert_eq!(questions[0].question, "Ekaro?");
    }

    #[test]
    fn unknown_type_is_reported() {
        let text = r#"[{"section":"college","year":7,"subject":"Yoruba","type":"quiz",
            "question":"?","options":["a","b","c","d"],"correctAnswer":0}]"#;
        let err = parse_bulk_import(text).unwrap_err();
        assert!(err.to_string().contains("unknown exam type"));
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let q = NewQuestion {
            question: "  ".into(),
            options: vec!["a".into(), "".into(), "c".into(), "d".into()],
            correct_answer: 0,
            classification: Classification::new(Section::Elementary, 2, "", ExamType::Test),
        };
        match validate_question(&q) {
            Err(CbtError::Validation(problems)) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
