//! Core data model types for cbt.
//!
//! Questions, students, and results as the exam flow sees them. The HTTP
//! wire shapes are normalized into these types by the store client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Top-level school division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Elementary,
    College,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Elementary => write!(f, "elementary"),
            Section::College => write!(f, "college"),
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elementary" => Ok(Section::Elementary),
            "college" => Ok(Section::College),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Kind of session. Determines question count and time allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Test,
    Exam,
    Practice,
}

impl ExamType {
    /// How many questions a session of this type holds.
    pub fn question_count(self) -> usize {
        match self {
            ExamType::Test => 20,
            ExamType::Exam => 40,
            ExamType::Practice => 10,
        }
    }

    /// Time allowance in minutes.
    pub fn duration_minutes(self) -> u64 {
        match self {
            ExamType::Exam => 60,
            ExamType::Test => 30,
            ExamType::Practice => 15,
        }
    }

    /// Practice results are never persisted.
    pub fn is_persisted(self) -> bool {
        self != ExamType::Practice
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamType::Test => write!(f, "test"),
            ExamType::Exam => write!(f, "exam"),
            ExamType::Practice => write!(f, "practice"),
        }
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(ExamType::Test),
            "exam" => Ok(ExamType::Exam),
            "practice" => Ok(ExamType::Practice),
            other => Err(format!("unknown exam type: {other}")),
        }
    }
}

/// Senior-college specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    Science,
    Commercial,
    Arts,
}

impl Track {
    pub const ALL: [Track; 3] = [Track::Science, Track::Commercial, Track::Arts];
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Science => write!(f, "Science"),
            Track::Commercial => write!(f, "Commercial"),
            Track::Arts => write!(f, "Arts"),
        }
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "science" => Ok(Track::Science),
            "commercial" => Ok(Track::Commercial),
            "arts" => Ok(Track::Arts),
            other => Err(format!("unknown track: {other}")),
        }
    }
}

/// The tags that place a question (or a result) in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub section: Section,
    /// School year, 1 through 12.
    pub year: u8,
    pub subject: String,
    pub exam_type: ExamType,
    /// Only meaningful for senior-tier years.
    #[serde(default)]
    pub track: Option<Track>,
}

impl Classification {
    pub fn new(section: Section, year: u8, subject: impl Into<String>, exam_type: ExamType) -> Self {
        Self {
            section,
            year,
            subject: subject.into(),
            exam_type,
            track: None,
        }
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.track = Some(track);
        self
    }
}

/// A stored multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Whether the question has exactly [`OPTION_COUNT`] options and the
    /// correct-option index falls inside them.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTION_COUNT && self.correct_answer < self.options.len()
    }
}

/// A question as submitted by an admin, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(flatten)]
    pub classification: Classification,
}

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A registered student (or the admin pseudo-user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub section: Option<Section>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>, section: Option<Section>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: Role::Student,
            section,
            created_at: None,
        }
    }

    pub fn reference(&self) -> StudentRef {
        StudentRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// The student a result belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: String,
    pub name: String,
}

/// Per-question outcome inside a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question: String,
    /// The chosen option, absent when the question was skipped.
    pub user_answer: Option<usize>,
    pub correct_answer: usize,
    pub options: Vec<String>,
    pub is_correct: bool,
}

/// The scored outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    /// Assigned by the store once persisted.
    #[serde(default)]
    pub id: Option<String>,
    pub student: StudentRef,
    #[serde(flatten)]
    pub classification: Classification,
    /// Percentage, 0 to 100.
    pub score: u8,
    pub correct: usize,
    pub total: usize,
    pub details: Vec<AnswerDetail>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a store health probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub connected: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_type_counts_and_durations() {
        assert_eq!(ExamType::Test.question_count(), 20);
        assert_eq!(ExamType::Exam.question_count(), 40);
        assert_eq!(ExamType::Practice.question_count(), 10);
        assert_eq!(ExamType::Exam.duration_minutes(), 60);
        assert_eq!(ExamType::Test.duration_minutes(), 30);
        assert_eq!(ExamType::Practice.duration_minutes(), 15);
        assert!(!ExamType::Practice.is_persisted());
        assert!(ExamType::Exam.is_persisted());
    }

    #[test]
    fn enums_display_and_parse() {
        assert_eq!(Section::College.to_string(), "college");
        assert_eq!("Elementary".parse::<Section>().unwrap(), Section::Elementary);
        assert_eq!("EXAM".parse::<ExamType>().unwrap(), ExamType::Exam);
        assert_eq!("arts".parse::<Track>().unwrap(), Track::Arts);
        assert_eq!(Track::Commercial.to_string(), "Commercial");
        assert!("university".parse::<Section>().is_err());
        assert!("quiz".parse::<ExamType>().is_err());
    }

    #[test]
    fn question_flattens_classification() {
        let q = Question {
            id: "q1".into(),
            question: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer: 1,
            classification: Classification::new(Section::College, 11, "Physics", ExamType::Exam)
                .with_track(Track::Science),
            created_at: None,
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["subject"], "Physics");
        assert_eq!(json["track"], "Science");
        assert_eq!(json["exam_type"], "exam");
        assert!(q.is_well_formed());
    }

    #[test]
    fn out_of_bounds_answer_is_not_well_formed() {
        let q = Question {
            id: "q2".into(),
            question: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: 2,
            classification: Classification::new(Section::Elementary, 3, "Phonics", ExamType::Test),
            created_at: None,
        };
        assert!(!q.is_well_formed());
    }

    #[test]
    fn short_option_list_is_not_well_formed() {
        let q = Question {
            id: "q3".into(),
            question: "Yes or no?".into(),
            options: vec!["yes".into(), "no".into()],
            correct_answer: 0,
            classification: Classification::new(Section::Elementary, 3, "Phonics", ExamType::Test),
            created_at: None,
        };
        assert!(!q.is_well_formed());
    }
}
