//! In-progress exam attempt: answers, flags, and the navigation pointer.
//!
//! All mutations are synchronous and total. Indices outside the question
//! list are ignored (answers, flags) or clamped (navigation), so the answer
//! map never holds more than one entry per question.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Classification, Question, Student};

/// How a question appears in the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Current,
    Answered,
    Flagged,
    Unanswered,
}

/// One exam/test/practice attempt.
#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    student: Student,
    classification: Classification,
    questions: Vec<Question>,
    answers: BTreeMap<usize, usize>,
    flagged: BTreeSet<usize>,
    current: usize,
    started_at: DateTime<Utc>,
}

impl ExamSession {
    pub fn new(student: Student, classification: Classification, questions: Vec<Question>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student,
            classification,
            questions,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            current: 0,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student(&self) -> &Student {
        &self.student
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record or overwrite the chosen option for a question. Unknown
    /// question or option indices are ignored.
    pub fn answer(&mut self, index: usize, option: usize) {
        let in_range = self
            .questions
            .get(index)
            .is_some_and(|q| option < q.options.len());
        if in_range {
            self.answers.insert(index, option);
        }
    }

    /// The option chosen for a question, if any.
    pub fn answer_for(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    pub fn toggle_flag(&mut self, index: usize) {
        if index >= self.questions.len() {
            return;
        }
        if !self.flagged.remove(&index) {
            self.flagged.insert(index);
        }
    }

    pub fn is_flagged(&self, index: usize) -> bool {
        self.flagged.contains(&index)
    }

    pub fn flagged(&self) -> impl Iterator<Item = usize> + '_ {
        self.flagged.iter().copied()
    }

    /// Move to any question; out-of-range indices clamp to the last one.
    pub fn seek(&mut self, index: usize) {
        self.current = index.min(self.questions.len().saturating_sub(1));
    }

    pub fn next(&mut self) {
        self.seek(self.current + 1);
    }

    pub fn previous(&mut self) {
        self.seek(self.current.saturating_sub(1));
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Number of answered questions.
    pub fn progress(&self) -> usize {
        self.answers.len()
    }

    pub fn unanswered(&self) -> usize {
        self.total() - self.progress()
    }

    /// Fraction answered, 0.0 to 1.0. An empty session counts as complete.
    pub fn percent_complete(&self) -> f64 {
        if self.questions.is_empty() {
            return 1.0;
        }
        self.progress() as f64 / self.total() as f64
    }

    /// Navigator status; current wins over answered, answered over flagged.
    pub fn status(&self, index: usize) -> QuestionStatus {
        if index == self.current {
            QuestionStatus::Current
        } else if self.answers.contains_key(&index) {
            QuestionStatus::Answered
        } else if self.flagged.contains(&index) {
            QuestionStatus::Flagged
        } else {
            QuestionStatus::Unanswered
        }
    }

    pub(crate) fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ExamType, Section};

    pub(crate) fn question(i: usize, correct: usize) -> Question {
        Question {
            id: format!("q{i}"),
            question: format!("Question {i}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct,
            classification: Classification::new(Section::College, 8, "French", ExamType::Test),
            created_at: None,
        }
    }

    pub(crate) fn session(n: usize) -> ExamSession {
        let questions = (0..n).map(|i| question(i, i % 4)).collect();
        ExamSession::new(
            Student::new("s1", "Ada", Some(Section::College)),
            Classification::new(Section::College, 8, "French", ExamType::Test),
            questions,
        )
    }

    #[test]
    fn answers_overwrite_and_ignore_out_of_range() {
        let mut s = session(3);
        s.answer(0, 1);
        s.answer(0, 2);
        s.answer(7, 0);
        s.answer(1, 4);
        assert_eq!(s.answer_for(0), Some(2));
        assert_eq!(s.answer_for(1), None);
        assert_eq!(s.progress(), 1);
        assert_eq!(s.unanswered(), 2);
    }

    #[test]
    fn toggle_flag_twice_restores_state() {
        let mut s = session(5);
        s.toggle_flag(3);
        assert!(s.is_flagged(3));
        s.toggle_flag(3);
        assert!(!s.is_flagged(3));
        assert_eq!(s.flagged().count(), 0);
    }

    #[test]
    fn flag_independent_of_answer() {
        let mut s = session(2);
        s.answer(1, 0);
        s.toggle_flag(1);
        assert!(s.is_flagged(1));
        assert_eq!(s.answer_for(1), Some(0));
    }

    #[test]
    fn seek_clamps_and_navigates() {
        let mut s = session(4);
        s.seek(10);
        assert_eq!(s.current(), 3);
        assert!(s.is_last());
        s.next();
        assert_eq!(s.current(), 3);
        s.seek(1);
        s.previous();
        s.previous();
        assert_eq!(s.current(), 0);
        assert!(s.is_first());
    }

    #[test]
    fn empty_session_is_safe() {
        let mut s = session(0);
        s.seek(5);
        s.next();
        s.answer(0, 1);
        assert_eq!(s.current(), 0);
        assert!(s.current_question().is_none());
        assert_eq!(s.percent_complete(), 1.0);
    }

    #[test]
    fn navigator_status_priority() {
        let mut s = session(4);
        s.answer(1, 0);
        s.toggle_flag(1);
        s.toggle_flag(2);
        s.answer(0, 0);
        assert_eq!(s.status(0), QuestionStatus::Current);
        assert_eq!(s.status(1), QuestionStatus::Answered);
        assert_eq!(s.status(2), QuestionStatus::Flagged);
        assert_eq!(s.status(3), QuestionStatus::Unanswered);
        assert!((s.percent_complete() - 0.5).abs() < f64::EPSILON);
    }
}
