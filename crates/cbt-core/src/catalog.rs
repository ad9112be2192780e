//! School structure: year tiers and the subjects offered in each.

use crate::model::{Classification, Section, Track};

/// Grouping of school years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Years 1-6.
    Elementary,
    /// Years 7-9.
    JuniorCollege,
    /// Years 10-12. Subjects depend on the track.
    SeniorCollege,
}

impl Tier {
    /// The tier a year belongs to, or `None` outside 1-12.
    pub fn of_year(year: u8) -> Option<Tier> {
        match year {
            1..=6 => Some(Tier::Elementary),
            7..=9 => Some(Tier::JuniorCollege),
            10..=12 => Some(Tier::SeniorCollege),
            _ => None,
        }
    }

    pub fn section(self) -> Section {
        match self {
            Tier::Elementary => Section::Elementary,
            Tier::JuniorCollege | Tier::SeniorCollege => Section::College,
        }
    }
}

/// Whether a year is in the senior tier, where questions carry a track.
pub fn is_senior(year: u8) -> bool {
    Tier::of_year(year) == Some(Tier::SeniorCollege)
}

const ELEMENTARY_CORE: [&str; 6] = [
    "English Language",
    "Mathematics",
    "Basic Science",
    "Social Studies",
    "Verbal Reasoning",
    "Quantitative Reasoning",
];

const JUNIOR_SUBJECTS: [&str; 13] = [
    "Mathematics",
    "English",
    "Basic Science",
    "Basic Technology",
    "Social Studies",
    "Civic Education",
    "French",
    "Computer Studies",
    "Agricultural Science",
    "Home Economics",
    "CRS",
    "Business Studies",
    "Yoruba",
];

const SCIENCE_SUBJECTS: [&str; 10] = [
    "Mathematics",
    "English",
    "Physics",
    "Chemistry",
    "Biology",
    "Further Mathematics",
    "Computer Studies",
    "Civic Education",
    "Geography",
    "Agricultural Science",
];

const COMMERCIAL_SUBJECTS: [&str; 8] = [
    "Mathematics",
    "English",
    "Commerce",
    "Economics",
    "Accounting",
    "Civic Education",
    "Marketing",
    "Government",
];

const ARTS_SUBJECTS: [&str; 9] = [
    "Mathematics",
    "English",
    "Literature in English",
    "Government",
    "Yoruba",
    "CRS",
    "Civic Education",
    "Marketing",
    "Economics",
];

fn elementary_subjects(year: u8) -> Vec<&'static str> {
    let extras: &[&str] = match year {
        1 | 2 => &["Handwriting", "Phonics", "French", "Basic Technology", "History"],
        3 => &["Computer Studies", "French", "Basic Technology", "History"],
        4 => &[
            "Computer Studies",
            "French",
            "Civic Education",
            "Basic Technology",
            "History",
        ],
        5 | 6 => &[
            "Computer Studies",
            "French",
            "Civic Education",
            "Agricultural Science",
            "Basic Technology",
            "History",
        ],
        _ => return Vec::new(),
    };
    ELEMENTARY_CORE.iter().chain(extras).copied().collect()
}

/// Subjects a senior track studies.
pub fn track_subjects(track: Track) -> &'static [&'static str] {
    match track {
        Track::Science => &SCIENCE_SUBJECTS,
        Track::Commercial => &COMMERCIAL_SUBJECTS,
        Track::Arts => &ARTS_SUBJECTS,
    }
}

/// Subjects a student can sit for. Senior years without a track offer none.
pub fn subjects_for(section: Section, year: u8, track: Option<Track>) -> Vec<&'static str> {
    match (section, Tier::of_year(year)) {
        (Section::Elementary, Some(Tier::Elementary)) => elementary_subjects(year),
        (Section::College, Some(Tier::JuniorCollege)) => JUNIOR_SUBJECTS.to_vec(),
        (Section::College, Some(Tier::SeniorCollege)) => {
            track.map(|t| track_subjects(t).to_vec()).unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

/// Subjects offered for results filtering. Senior years list every track's
/// subjects once, in first-seen order.
pub fn filter_subjects(section: Section, year: u8) -> Vec<&'static str> {
    if section == Section::College && is_senior(year) {
        let mut all: Vec<&'static str> = Vec::new();
        for track in Track::ALL {
            for subject in track_subjects(track) {
                if !all.contains(subject) {
                    all.push(subject);
                }
            }
        }
        return all;
    }
    subjects_for(section, year, None)
}

/// Structural problems with a classification. Empty when valid.
pub fn classification_problems(c: &Classification) -> Vec<String> {
    let mut problems = Vec::new();
    if c.subject.trim().is_empty() {
        problems.push("subject is required".to_string());
    }
    match Tier::of_year(c.year) {
        None => problems.push(format!("year {} is outside 1-12", c.year)),
        Some(tier) if tier.section() != c.section => {
            problems.push(format!("year {} is not in the {} section", c.year, c.section));
        }
        Some(Tier::SeniorCollege) if c.track.is_none() => {
            problems.push(format!("track is required for year {}", c.year));
        }
        _ => {}
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamType;

    #[test]
    fn tiers_by_year() {
        assert_eq!(Tier::of_year(1), Some(Tier::Elementary));
        assert_eq!(Tier::of_year(9), Some(Tier::JuniorCollege));
        assert_eq!(Tier::of_year(12), Some(Tier::SeniorCollege));
        assert_eq!(Tier::of_year(0), None);
        assert_eq!(Tier::of_year(13), None);
        assert!(is_senior(10));
        assert!(!is_senior(9));
    }

    #[test]
    fn elementary_subjects_vary_by_year() {
        let y1 = subjects_for(Section::Elementary, 1, None);
        assert!(y1.contains(&"Phonics"));
        assert!(!y1.contains(&"Computer Studies"));

        let y6 = subjects_for(Section::Elementary, 6, None);
        assert!(y6.contains(&"Agricultural Science"));
        assert!(y6.contains(&"History"));
    }

    #[test]
    fn senior_subjects_need_a_track() {
        assert!(subjects_for(Section::College, 11, None).is_empty());
        let science = subjects_for(Section::College, 11, Some(Track::Science));
        assert!(science.contains(&"Physics"));
        assert!(!science.contains(&"Accounting"));
    }

    #[test]
    fn mismatched_section_offers_nothing() {
        assert!(subjects_for(Section::Elementary, 8, None).is_empty());
        assert!(subjects_for(Section::College, 3, None).is_empty());
    }

    #[test]
    fn filter_subjects_union_is_deduplicated() {
        let all = filter_subjects(Section::College, 12);
        let maths = all.iter().filter(|s| **s == "Mathematics").count();
        assert_eq!(maths, 1);
        assert!(all.contains(&"Physics"));
        assert!(all.contains(&"Accounting"));
        assert!(all.contains(&"Literature in English"));
    }

    #[test]
    fn classification_checks() {
        let ok = Classification::new(Section::College, 8, "French", ExamType::Test);
        assert!(classification_problems(&ok).is_empty());

        let no_track = Classification::new(Section::College, 10, "Physics", ExamType::Exam);
        assert_eq!(classification_problems(&no_track).len(), 1);

        let wrong_section = Classification::new(Section::Elementary, 10, "", ExamType::Exam);
        assert_eq!(classification_problems(&wrong_section).len(), 2);
    }
}
