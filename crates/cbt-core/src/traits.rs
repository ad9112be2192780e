//! The external store seam.
//!
//! Implemented over HTTP and in memory by the `cbt-store` crate. Every
//! operation is one asynchronous round trip that may fail; callers never
//! assume success.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Classification, ExamResult, HealthStatus, NewQuestion, Question, Student};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for questions, results, and students.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Probe the backend.
    async fn health(&self) -> StoreResult<HealthStatus>;

    // -- questions ----------------------------------------------------------

    async fn fetch_questions(&self) -> StoreResult<Vec<Question>>;

    /// Questions matching section, year, subject, and type, plus the track
    /// when one is given.
    async fn fetch_filtered_questions(&self, filter: &Classification) -> StoreResult<Vec<Question>>;

    async fn add_question(&self, question: &NewQuestion) -> StoreResult<Question>;

    /// Insert many questions in one request.
    async fn add_questions(&self, questions: &[NewQuestion]) -> StoreResult<Vec<Question>>;

    async fn update_question(&self, id: &str, question: &NewQuestion) -> StoreResult<Question>;

    async fn delete_question(&self, id: &str) -> StoreResult<()>;

    async fn delete_questions(&self, ids: &[String]) -> StoreResult<()>;

    // -- results ------------------------------------------------------------

    async fn fetch_results(&self) -> StoreResult<Vec<ExamResult>>;

    async fn fetch_student_results(&self, student_id: &str) -> StoreResult<Vec<ExamResult>>;

    /// Server-computed statistics, passed through untouched.
    async fn result_stats(&self) -> StoreResult<serde_json::Value>;

    /// Persist a result; the returned copy carries the store's id.
    async fn save_result(&self, result: &ExamResult) -> StoreResult<ExamResult>;

    async fn delete_result(&self, id: &str) -> StoreResult<()>;

    async fn clear_results(&self) -> StoreResult<()>;

    // -- students -----------------------------------------------------------

    async fn fetch_students(&self) -> StoreResult<Vec<Student>>;

    async fn fetch_student(&self, id: &str) -> StoreResult<Student>;

    /// Register the student if new, update otherwise.
    async fn upsert_student(&self, student: &Student) -> StoreResult<Student>;

    async fn update_student(&self, id: &str, student: &Student) -> StoreResult<Student>;

    async fn delete_student(&self, id: &str) -> StoreResult<()>;
}
