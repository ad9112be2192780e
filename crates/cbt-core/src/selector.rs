//! Question selection for a new session.
//!
//! Fetches the matching questions, shuffles them with a caller-supplied
//! random source, and takes as many as the session type needs. Practice
//! sessions fall back to generated questions so they can always start.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::is_senior;
use crate::error::CbtError;
use crate::model::{Classification, ExamType, Question};
use crate::traits::ResultStore;

/// Question/options template; `{}` stands for the subject.
struct Template {
    question: &'static str,
    options: [&'static str; 4],
}

const PRACTICE_TEMPLATES: [Template; 10] = [
    Template {
        question: "What is the fundamental concept of {}?",
        options: ["Foundation principles", "Advanced theory", "Applied methods", "Historical context"],
    },
    Template {
        question: "Which of these is most associated with {}?",
        options: ["Core methodology", "External factors", "Unrelated field", "Random topic"],
    },
    Template {
        question: "In {}, what comes first in the learning sequence?",
        options: ["Basics and fundamentals", "Complex theories", "Practical exams", "Research papers"],
    },
    Template {
        question: "The best approach to studying {} is:",
        options: ["Consistent practice", "Last-minute cramming", "Guessing", "Skipping classes"],
    },
    Template {
        question: "{} is important because:",
        options: ["It builds critical thinking", "It is mandatory", "Teachers say so", "No particular reason"],
    },
    Template {
        question: "A key skill developed in {} is:",
        options: ["Analytical thinking", "Memorization only", "Speed reading", "Handwriting"],
    },
    Template {
        question: "Which method works best for {} revision?",
        options: ["Practice questions", "Reading once", "Not studying", "Watching TV"],
    },
    Template {
        question: "The goal of learning {} is to:",
        options: ["Understand concepts deeply", "Pass exams only", "Please parents", "Fill time"],
    },
    Template {
        question: "{} connects to real life through:",
        options: ["Daily applications", "No connection", "Only in textbooks", "Only in labs"],
    },
    Template {
        question: "What should you do if stuck on a {} problem?",
        options: ["Break it into steps", "Give up", "Skip it forever", "Complain"],
    },
];

/// Every generated question has its answer in the first slot.
pub const PRACTICE_CORRECT_ANSWER: usize = 0;

/// The store query for a session: the track only narrows senior years.
pub fn store_filter(criteria: &Classification) -> Classification {
    let mut filter = criteria.clone();
    if !is_senior(filter.year) {
        filter.track = None;
    }
    filter
}

/// Generate `count` placeholder questions for a subject, cycling through the
/// template bank.
pub fn practice_questions(criteria: &Classification, count: usize) -> Vec<Question> {
    (0..count)
        .map(|i| {
            let template = &PRACTICE_TEMPLATES[i % PRACTICE_TEMPLATES.len()];
            Question {
                id: format!("practice-{i}"),
                question: template.question.replace("{}", &criteria.subject),
                options: template.options.iter().map(|o| o.to_string()).collect(),
                correct_answer: PRACTICE_CORRECT_ANSWER,
                classification: criteria.clone(),
                created_at: None,
            }
        })
        .collect()
}

/// Turn the store's matches into the session's question list.
///
/// Non-practice sessions with no matches fail; with fewer matches than
/// needed they proceed shorter. Practice sessions short of matches use
/// generated questions instead.
pub fn choose_questions<R: Rng + ?Sized>(
    mut matches: Vec<Question>,
    criteria: &Classification,
    rng: &mut R,
) -> Result<Vec<Question>, CbtError> {
    let need = criteria.exam_type.question_count();

    if matches.is_empty() && criteria.exam_type != ExamType::Practice {
        return Err(CbtError::NoQuestionsAvailable {
            subject: criteria.subject.clone(),
            exam_type: criteria.exam_type,
        });
    }

    if matches.len() < need && criteria.exam_type == ExamType::Practice {
        tracing::debug!(
            subject = %criteria.subject,
            available = matches.len(),
            "generating practice questions"
        );
        return Ok(practice_questions(criteria, need));
    }

    matches.shuffle(rng);
    matches.truncate(need);
    Ok(matches)
}

/// Fetch and choose the questions for a new session.
pub async fn select_questions<R: Rng + ?Sized>(
    store: &dyn ResultStore,
    criteria: &Classification,
    rng: &mut R,
) -> Result<Vec<Question>, CbtError> {
    let matches = store.fetch_filtered_questions(&store_filter(criteria)).await?;
    tracing::debug!(
        subject = %criteria.subject,
        exam_type = %criteria.exam_type,
        matches = matches.len(),
        "fetched questions"
    );
    choose_questions(matches, criteria, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Section, Track};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn criteria(exam_type: ExamType) -> Classification {
        Classification::new(Section::College, 11, "Physics", exam_type).with_track(Track::Science)
    }

    fn bank(n: usize, exam_type: ExamType) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{i}"),
                question: format!("Question {i}"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: 1,
                classification: criteria(exam_type),
                created_at: None,
            })
            .collect()
    }

    #[test]
    fn empty_exam_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = choose_questions(vec![], &criteria(ExamType::Exam), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CbtError::NoQuestionsAvailable { ref subject, exam_type: ExamType::Exam } if subject == "Physics"
        ));
    }

    #[test]
    fn empty_practice_generates_full_set() {
        let mut rng = StdRng::seed_from_u64(1);
        let qs = choose_questions(vec![], &criteria(ExamType::Practice), &mut rng).unwrap();
        assert_eq!(qs.len(), 10);
        assert!(qs.iter().all(|q| q.correct_answer == PRACTICE_CORRECT_ANSWER));
        assert_eq!(qs[0].question, "What is the fundamental concept of Physics?");
        assert_eq!(qs[9].question, "What should you do if stuck on a Physics problem?");
    }

    #[test]
    fn short_practice_bank_is_replaced() {
        let mut rng = StdRng::seed_from_u64(1);
        let qs = choose_questions(bank(4, ExamType::Practice), &criteria(ExamType::Practice), &mut rng)
            .unwrap();
        assert_eq!(qs.len(), 10);
        assert!(qs.iter().all(|q| q.id.starts_with("practice-")));
    }

    #[test]
    fn generated_practice_cycles_templates() {
        let qs = practice_questions(&criteria(ExamType::Practice), 12);
        assert_eq!(qs.len(), 12);
        assert_eq!(qs[10].question, qs[0].question);
        assert_ne!(qs[10].id, qs[0].id);
    }

    #[test]
    fn large_bank_is_truncated_to_need() {
        let mut rng = StdRng::seed_from_u64(7);
        let qs = choose_questions(bank(50, ExamType::Test), &criteria(ExamType::Test), &mut rng)
            .unwrap();
        assert_eq!(qs.len(), 20);
        let mut ids: Vec<_> = qs.iter().map(|q| q.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn short_exam_bank_proceeds_shorter() {
        let mut rng = StdRng::seed_from_u64(7);
        let qs = choose_questions(bank(5, ExamType::Exam), &criteria(ExamType::Exam), &mut rng)
            .unwrap();
        assert_eq!(qs.len(), 5);
    }

    #[test]
    fn same_seed_same_order() {
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            choose_questions(bank(30, ExamType::Test), &criteria(ExamType::Test), &mut rng)
                .unwrap()
                .into_iter()
                .map(|q| q.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn track_only_filters_senior_years() {
        let junior = Classification::new(Section::College, 8, "French", ExamType::Test)
            .with_track(Track::Arts);
        assert_eq!(store_filter(&junior).track, None);
        assert_eq!(store_filter(&criteria(ExamType::Exam)).track, Some(Track::Science));
    }
}
