//! In-process store for tests and offline demos.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use cbt_core::model::{Classification, ExamResult, HealthStatus, NewQuestion, Question, Student};
use cbt_core::statistics::summarize;
use cbt_core::traits::{ResultStore, StoreResult};
use cbt_core::StoreError;

#[derive(Default)]
struct State {
    questions: Vec<Question>,
    results: Vec<ExamResult>,
    students: Vec<Student>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// A store that keeps everything in memory.
///
/// Can be switched offline to simulate an unreachable server; every call
/// is counted either way.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    fail_saves: AtomicBool,
    call_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the bank with the given questions.
    pub fn with_questions(questions: Vec<Question>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.questions = questions;
        }
        store
    }

    /// Make every call fail as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make only `save_result` fail as unreachable.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }

    /// Number of trait calls made so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn enter(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unreachable("memory store is offline".into()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unreachable("memory store state poisoned".into()))
    }

    fn stored_question(state: &mut State, q: &NewQuestion, id: Option<String>) -> Question {
        Question {
            id: id.unwrap_or_else(|| state.next_id("q")),
            question: q.question.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            classification: q.classification.clone(),
            created_at: Some(Utc::now()),
        }
    }
}

fn matches_filter(q: &Question, filter: &Classification) -> bool {
    let c = &q.classification;
    c.section == filter.section
        && c.year == filter.year
        && c.subject == filter.subject
        && c.exam_type == filter.exam_type
        && filter.track.map_or(true, |t| c.track == Some(t))
}

#[async_trait]
impl ResultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health(&self) -> StoreResult<HealthStatus> {
        Ok(match self.enter() {
            Ok(_) => HealthStatus {
                connected: true,
                message: Some("in-memory".into()),
            },
            Err(e) => HealthStatus {
                connected: false,
                message: Some(e.to_string()),
            },
        })
    }

    async fn fetch_questions(&self) -> StoreResult<Vec<Question>> {
        Ok(self.enter()?.questions.clone())
    }

    async fn fetch_filtered_questions(&self, filter: &Classification) -> StoreResult<Vec<Question>> {
        let state = self.enter()?;
        Ok(state
            .questions
            .iter()
            .filter(|q| matches_filter(q, filter))
            .cloned()
            .collect())
    }

    async fn add_question(&self, question: &NewQuestion) -> StoreResult<Question> {
        let mut state = self.enter()?;
        let stored = Self::stored_question(&mut state, question, None);
        state.questions.insert(0, stored.clone());
        Ok(stored)
    }

    async fn add_questions(&self, questions: &[NewQuestion]) -> StoreResult<Vec<Question>> {
        let mut state = self.enter()?;
        let stored: Vec<Question> = questions
            .iter()
            .map(|q| Self::stored_question(&mut state, q, None))
            .collect();
        let mut bank = stored.clone();
        bank.append(&mut state.questions);
        state.questions = bank;
        Ok(stored)
    }

    async fn update_question(&self, id: &str, question: &NewQuestion) -> StoreResult<Question> {
        let mut state = self.enter()?;
        let pos = state
            .questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("question {id}")))?;
        let updated = Self::stored_question(&mut state, question, Some(id.to_string()));
        state.questions[pos] = updated.clone();
        Ok(updated)
    }

    async fn delete_question(&self, id: &str) -> StoreResult<()> {
        let mut state = self.enter()?;
        let before = state.questions.len();
        state.questions.retain(|q| q.id != id);
        if state.questions.len() == before {
            return Err(StoreError::NotFound(format!("question {id}")));
        }
        Ok(())
    }

    async fn delete_questions(&self, ids: &[String]) -> StoreResult<()> {
        self.enter()?.questions.retain(|q| !ids.contains(&q.id));
        Ok(())
    }

    async fn fetch_results(&self) -> StoreResult<Vec<ExamResult>> {
        Ok(self.enter()?.results.clone())
    }

    async fn fetch_student_results(&self, student_id: &str) -> StoreResult<Vec<ExamResult>> {
        let state = self.enter()?;
        Ok(state
            .results
            .iter()
            .filter(|r| r.student.id == student_id)
            .cloned()
            .collect())
    }

    async fn result_stats(&self) -> StoreResult<serde_json::Value> {
        let state = self.enter()?;
        serde_json::to_value(summarize(&state.results)).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn save_result(&self, result: &ExamResult) -> StoreResult<ExamResult> {
        let mut state = self.enter()?;
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(StoreError::Unreachable("save rejected while offline".into()));
        }
        let mut saved = result.clone();
        saved.id = Some(state.next_id("r"));
        state.results.insert(0, saved.clone());
        Ok(saved)
    }

    async fn delete_result(&self, id: &str) -> StoreResult<()> {
        let mut state = self.enter()?;
        let before = state.results.len();
        state.results.retain(|r| r.id.as_deref() != Some(id));
        if state.results.len() == before {
            return Err(StoreError::NotFound(format!("result {id}")));
        }
        Ok(())
    }

    async fn clear_results(&self) -> StoreResult<()> {
        self.enter()?.results.clear();
        Ok(())
    }

    async fn fetch_students(&self) -> StoreResult<Vec<Student>> {
        Ok(self.enter()?.students.clone())
    }

    async fn fetch_student(&self, id: &str) -> StoreResult<Student> {
        self.enter()?
            .students
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("student {id}")))
    }

    async fn upsert_student(&self, student: &Student) -> StoreResult<Student> {
        let mut state = self.enter()?;
        if let Some(existing) = state.students.iter_mut().find(|s| s.id == student.id) {
            existing.name = student.name.clone();
            existing.role = student.role;
            existing.section = student.section;
            return Ok(existing.clone());
        }
        let mut stored = student.clone();
        stored.created_at = Some(Utc::now());
        state.students.push(stored.clone());
        Ok(stored)
    }

    async fn update_student(&self, id: &str, student: &Student) -> StoreResult<Student> {
        let mut state = self.enter()?;
        let existing = state
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("student {id}")))?;
        existing.name = student.name.clone();
        existing.role = student.role;
        existing.section = student.section;
        Ok(existing.clone())
    }

    async fn delete_student(&self, id: &str) -> StoreResult<()> {
        let mut state = self.enter()?;
        let before = state.students.len();
        state.students.retain(|s| s.id != id);
        if state.students.len() == before {
            return Err(StoreError::NotFound(format!("student {id}")));
        }
        Ok(())
    }
}
