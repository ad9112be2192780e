//! JSON shapes used by the REST API and their conversion into core types.
//!
//! The server keys documents by `_id` (students by `studentId`), stamps
//! `createdAt`, uses `type` for a question's exam type but `examType` on
//! results, and stores an absent track as an empty string.
//!
//! Documents may carry both the server key and its normalized twin (`_id`
//! and `id`, `createdAt` and `ts`). Each name is read as its own optional
//! field and the server key wins.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use cbt_core::model::{
    AnswerDetail, Classification, ExamResult, ExamType, NewQuestion, Question, Role, Section,
    Student, StudentRef, Track,
};
use cbt_core::StoreError;

/// Treat `null` and blank strings as absent; parse anything else.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn track_text(track: Option<Track>) -> String {
    track.map(|t| t.to_string()).unwrap_or_default()
}

// -- questions ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireQuestion {
    #[serde(rename = "_id", default)]
    server_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    section: Section,
    year: u8,
    subject: String,
    #[serde(rename = "type")]
    exam_type: ExamType,
    #[serde(default, deserialize_with = "blank_as_none")]
    track: Option<Track>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireQuestion> for Question {
    type Error = StoreError;

    fn try_from(w: WireQuestion) -> Result<Self, StoreError> {
        let id = w
            .server_id
            .or(w.id)
            .ok_or_else(|| StoreError::Decode("question without `_id` or `id`".into()))?;
        Ok(Question {
            id,
            question: w.question,
            options: w.options,
            correct_answer: w.correct_answer,
            classification: Classification {
                section: w.section,
                year: w.year,
                subject: w.subject,
                exam_type: w.exam_type,
                track: w.track,
            },
            created_at: w.created_at,
        })
    }
}

/// Convert a batch, dropping questions without an id, without exactly four
/// options, or with an out-of-range correct index.
pub(crate) fn into_questions(wire: Vec<WireQuestion>) -> Vec<Question> {
    wire.into_iter()
        .filter_map(|w| match Question::try_from(w) {
            Ok(q) if q.is_well_formed() => Some(q),
            Ok(q) => {
                tracing::warn!(id = %q.id, "skipping ill-formed question");
                None
            }
            Err(e) => {
                tracing::warn!("skipping question: {e}");
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireBulkResponse {
    pub questions: Vec<WireQuestion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionBody<'a> {
    question: &'a str,
    options: &'a [String],
    correct_answer: usize,
    section: Section,
    year: u8,
    subject: &'a str,
    #[serde(rename = "type")]
    exam_type: ExamType,
    track: String,
}

impl<'a> From<&'a NewQuestion> for QuestionBody<'a> {
    fn from(q: &'a NewQuestion) -> Self {
        let c = &q.classification;
        QuestionBody {
            question: &q.question,
            options: &q.options,
            correct_answer: q.correct_answer,
            section: c.section,
            year: c.year,
            subject: &c.subject,
            exam_type: c.exam_type,
            track: track_text(c.track),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteManyBody<'a> {
    pub ids: &'a [String],
}

// -- results -----------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDetail {
    question: String,
    #[serde(default)]
    user_answer: Option<usize>,
    correct_answer: usize,
    #[serde(default)]
    options: Vec<String>,
    is_correct: bool,
}

impl From<&AnswerDetail> for WireDetail {
    fn from(d: &AnswerDetail) -> Self {
        WireDetail {
            question: d.question.clone(),
            user_answer: d.user_answer,
            correct_answer: d.correct_answer,
            options: d.options.clone(),
            is_correct: d.is_correct,
        }
    }
}

impl From<WireDetail> for AnswerDetail {
    fn from(w: WireDetail) -> Self {
        AnswerDetail {
            question: w.question,
            user_answer: w.user_answer,
            correct_answer: w.correct_answer,
            options: w.options,
            is_correct: w.is_correct,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultBody<'a> {
    student: &'a StudentRef,
    section: Section,
    year: u8,
    track: String,
    subject: &'a str,
    exam_type: ExamType,
    score: u8,
    correct: usize,
    total: usize,
    details: Vec<WireDetail>,
    ts: DateTime<Utc>,
}

impl<'a> From<&'a ExamResult> for ResultBody<'a> {
    fn from(r: &'a ExamResult) -> Self {
        let c = &r.classification;
        ResultBody {
            student: &r.student,
            section: c.section,
            year: c.year,
            track: track_text(c.track),
            subject: &c.subject,
            exam_type: c.exam_type,
            score: r.score,
            correct: r.correct,
            total: r.total,
            details: r.details.iter().map(WireDetail::from).collect(),
            ts: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireResult {
    #[serde(rename = "_id", default)]
    server_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    student: StudentRef,
    section: Section,
    year: u8,
    #[serde(default, deserialize_with = "blank_as_none")]
    track: Option<Track>,
    subject: String,
    exam_type: ExamType,
    score: u8,
    correct: usize,
    total: usize,
    #[serde(default)]
    details: Vec<WireDetail>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ts: Option<DateTime<Utc>>,
}

impl From<WireResult> for ExamResult {
    fn from(w: WireResult) -> Self {
        ExamResult {
            id: w.server_id.or(w.id),
            student: w.student,
            classification: Classification {
                section: w.section,
                year: w.year,
                subject: w.subject,
                exam_type: w.exam_type,
                track: w.track,
            },
            score: w.score,
            correct: w.correct,
            total: w.total,
            details: w.details.into_iter().map(AnswerDetail::from).collect(),
            created_at: w.created_at.or(w.ts).unwrap_or_else(Utc::now),
        }
    }
}

// -- students ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStudent {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    role: Role,
    #[serde(default, deserialize_with = "blank_as_none")]
    section: Option<Section>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireStudent> for Student {
    type Error = StoreError;

    fn try_from(w: WireStudent) -> Result<Self, StoreError> {
        let id = w
            .student_id
            .or(w.id)
            .ok_or_else(|| StoreError::Decode("student without `studentId` or `id`".into()))?;
        Ok(Student {
            id,
            name: w.name,
            role: w.role,
            section: w.section,
            created_at: w.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentBody<'a> {
    student_id: &'a str,
    name: &'a str,
    role: Role,
    section: Option<Section>,
}

impl<'a> From<&'a Student> for StudentBody<'a> {
    fn from(s: &'a Student) -> Self {
        StudentBody {
            student_id: &s.id,
            name: &s.name,
            role: s.role,
            section: s.section,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_ids_and_blank_track() {
        let w: WireQuestion = serde_json::from_value(json!({
            "_id": "65a1", "question": "2+2?", "options": ["3","4","5","6"],
            "correctAnswer": 1, "section": "elementary", "year": 2,
            "subject": "Mathematics", "type": "test", "track": "",
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        let q = Question::try_from(w).unwrap();
        assert_eq!(q.id, "65a1");
        assert_eq!(q.classification.track, None);
        assert!(q.created_at.is_some());
    }

    #[test]
    fn ill_formed_questions_are_dropped() {
        let wire: Vec<WireQuestion> = serde_json::from_value(json!([
            {"_id": "a", "question": "ok", "options": ["1","2","3","4"], "correctAnswer": 3,
             "section": "college", "year": 8, "subject": "French", "type": "exam"},
            {"_id": "b", "question": "bad", "options": ["1","2"], "correctAnswer": 3,
             "section": "college", "year": 8, "subject": "French", "type": "exam"}
        ]))
        .unwrap();
        let qs = into_questions(wire);
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].id, "a");
    }

    #[test]
    fn result_body_uses_server_field_names() {
        let result = ExamResult {
            id: None,
            student: StudentRef {
                id: "s1".into(),
                name: "Ada".into(),
            },
            classification: Classification::new(Section::College, 8, "French", ExamType::Test),
            score: 50,
            correct: 1,
            total: 2,
            details: vec![AnswerDetail {
                question: "Bonjour?".into(),
                user_answer: None,
                correct_answer: 0,
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                is_correct: false,
            }],
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(ResultBody::from(&result)).unwrap();
        assert_eq!(body["examType"], "test");
        assert_eq!(body["track"], "");
        assert_eq!(body["student"]["id"], "s1");
        assert!(body["details"][0]["userAnswer"].is_null());
        assert_eq!(body["details"][0]["isCorrect"], false);
        assert!(body.get("ts").is_some());
    }

    #[test]
    fn student_id_normalized() {
        let w: WireStudent = serde_json::from_value(json!({
            "studentId": "STU-7", "name": "Kemi", "role": "student", "section": null
        }))
        .unwrap();
        let s = Student::try_from(w).unwrap();
        assert_eq!(s.id, "STU-7");
        assert_eq!(s.section, None);
    }

    fn stored_result() -> serde_json::Value {
        json!({
            "student": {"id": "s1", "name": "Ada"}, "section": "college", "year": 8,
            "track": "", "subject": "French", "examType": "test", "score": 75,
            "correct": 15, "total": 20, "details": []
        })
    }

    #[test]
    fn result_with_both_timestamps_prefers_created_at() {
        let mut doc = stored_result();
        doc["_id"] = json!("r-db");
        doc["id"] = json!("r-local");
        doc["ts"] = json!("2024-03-01T09:00:00Z");
        doc["createdAt"] = json!("2024-03-01T09:00:05Z");

        let w: WireResult = serde_json::from_value(doc).unwrap();
        let r = ExamResult::from(w);
        assert_eq!(r.id.as_deref(), Some("r-db"));
        assert_eq!(r.created_at.to_rfc3339(), "2024-03-01T09:00:05+00:00");
    }

    #[test]
    fn result_falls_back_to_ts_and_id() {
        let mut doc = stored_result();
        doc["id"] = json!("r-7");
        doc["ts"] = json!("2024-03-01T09:00:00Z");

        let r = ExamResult::from(serde_json::from_value::<WireResult>(doc).unwrap());
        assert_eq!(r.id.as_deref(), Some("r-7"));
        assert_eq!(r.created_at.to_rfc3339(), "2024-03-01T09:00:00+00:00");
    }

    #[test]
    fn documents_with_both_id_keys_decode() {
        let q: WireQuestion = serde_json::from_value(json!({
            "_id": "65a1", "id": "65a1", "question": "2+2?", "options": ["3","4","5","6"],
            "correctAnswer": 1, "section": "elementary", "year": 2,
            "subject": "Mathematics", "type": "test"
        }))
        .unwrap();
        assert_eq!(Question::try_from(q).unwrap().id, "65a1");

        let s: WireStudent = serde_json::from_value(json!({
            "_id": "65b2", "id": "STU-7", "studentId": "STU-7", "name": "Kemi"
        }))
        .unwrap();
        assert_eq!(Student::try_from(s).unwrap().id, "STU-7");
    }

    #[test]
    fn student_without_any_id_is_a_decode_error() {
        let w: WireStudent = serde_json::from_value(json!({"name": "Kemi"})).unwrap();
        assert!(matches!(Student::try_from(w), Err(StoreError::Decode(_))));
    }

    #[test]
    fn questions_without_id_or_four_options_are_dropped() {
        let wire: Vec<WireQuestion> = serde_json::from_value(json!([
            {"question": "no id", "options": ["1","2","3","4"], "correctAnswer": 0,
             "section": "college", "year": 8, "subject": "French", "type": "exam"},
            {"_id": "two", "question": "yes/no", "options": ["yes","no"], "correctAnswer": 0,
             "section": "college", "year": 8, "subject": "French", "type": "exam"}
        ]))
        .unwrap();
        assert!(into_questions(wire).is_empty());
    }
}
