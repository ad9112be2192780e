//! Scoring: correctness per question, percentage, grade band.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AnswerDetail, ExamResult};
use crate::session::ExamSession;

/// Minimum score counted as a pass for messaging.
pub const PASS_MARK: u8 = 50;

/// Letter grade derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn from_score(score: u8) -> Grade {
        match score {
            70..=u8::MAX => Grade::A,
            60..=69 => Grade::B,
            50..=59 => Grade::C,
            40..=49 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// `round(100 * correct / total)` with halves rounded up; 0 when `total` is 0.
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((200 * correct + total) / (2 * total)) as u8
}

pub fn is_pass(score: u8) -> bool {
    score >= PASS_MARK
}

/// Short encouragement shown after submission.
pub fn outcome_message(score: u8) -> &'static str {
    if is_pass(score) {
        "Well done!"
    } else {
        "Keep studying, you'll improve!"
    }
}

/// Score a session into a result, preserving display order.
pub fn grade_session(session: &ExamSession, submitted_at: DateTime<Utc>) -> ExamResult {
    let answers = session.answers();
    let details: Vec<AnswerDetail> = session
        .questions()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(&i).copied();
            AnswerDetail {
                question: q.question.clone(),
                user_answer,
                correct_answer: q.correct_answer,
                options: q.options.clone(),
                is_correct: user_answer == Some(q.correct_answer),
            }
        })
        .collect();

    let correct = details.iter().filter(|d| d.is_correct).count();
    let total = details.len();

    ExamResult {
        id: None,
        student: session.student().reference(),
        classification: session.classification().clone(),
        score: score_percent(correct, total),
        correct,
        total,
        details,
        created_at: submitted_at,
    }
}

impl ExamResult {
    pub fn grade(&self) -> Grade {
        Grade::from_score(self.score)
    }

    pub fn passed(&self) -> bool {
        is_pass(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session;

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_score(100), Grade::A);
        assert_eq!(Grade::from_score(70), Grade::A);
        assert_eq!(Grade::from_score(69), Grade::B);
        assert_eq!(Grade::from_score(60), Grade::B);
        assert_eq!(Grade::from_score(50), Grade::C);
        assert_eq!(Grade::from_score(40), Grade::D);
        assert_eq!(Grade::from_score(39), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn score_rounding() {
        assert_eq!(score_percent(0, 0), 0);
        assert_eq!(score_percent(4, 10), 40);
        assert_eq!(score_percent(15, 20), 75);
        assert_eq!(score_percent(1, 3), 33);
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(40, 40), 100);
    }

    #[test]
    fn score_matches_float_rounding_for_all_small_sessions() {
        for total in 1..=40usize {
            for correct in 0..=total {
                let expected = (100.0 * correct as f64 / total as f64).round() as u8;
                assert_eq!(score_percent(correct, total), expected, "{correct}/{total}");
            }
        }
    }

    #[test]
    fn test_with_fifteen_of_twenty_is_an_a() {
        let mut s = session(20);
        for i in 0..20 {
            let correct = s.questions()[i].correct_answer;
            let chosen = if i < 15 { correct } else { (correct + 1) % 4 };
            s.answer(i, chosen);
        }
        let result = grade_session(&s, Utc::now());
        assert_eq!(result.correct, 15);
        assert_eq!(result.total, 20);
        assert_eq!(result.score, 75);
        assert_eq!(result.grade(), Grade::A);
        assert!(result.passed());
    }

    #[test]
    fn four_of_ten_is_a_d() {
        let mut s = session(10);
        for i in 0..4 {
            let correct = s.questions()[i].correct_answer;
            s.answer(i, correct);
        }
        let result = grade_session(&s, Utc::now());
        assert_eq!(result.score, 40);
        assert_eq!(result.grade(), Grade::D);
        assert_eq!(outcome_message(result.score), "Keep studying, you'll improve!");
    }

    #[test]
    fn details_preserve_order_and_unanswered() {
        let mut s = session(3);
        s.answer(2, s.questions()[2].correct_answer);
        let result = grade_session(&s, Utc::now());
        assert_eq!(result.details.len(), 3);
        assert_eq!(result.details[0].question, "Question 0");
        assert_eq!(result.details[0].user_answer, None);
        assert!(!result.details[0].is_correct);
        assert!(result.details[2].is_correct);
        assert_eq!(result.correct, 1);
        assert_eq!(result.student.id, "s1");
    }

    #[test]
    fn empty_session_scores_zero() {
        let s = session(0);
        let result = grade_session(&s, Utc::now());
        assert_eq!(result.score, 0);
        assert_eq!(result.total, 0);
        assert_eq!(result.grade(), Grade::F);
    }
}
