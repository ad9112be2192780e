//! Result filtering and summary statistics for the admin view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{ExamResult, Section};
use crate::scorer::Grade;

/// Criteria for narrowing the results list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub section: Option<Section>,
    pub year: Option<u8>,
    pub subject: Option<String>,
}

impl ResultFilter {
    pub fn matches(&self, result: &ExamResult) -> bool {
        let c = &result.classification;
        self.section.map_or(true, |s| c.section == s)
            && self.year.map_or(true, |y| c.year == y)
            && self.subject.as_ref().map_or(true, |s| &c.subject == s)
    }
}

pub fn filter_results<'a>(results: &'a [ExamResult], filter: &ResultFilter) -> Vec<&'a ExamResult> {
    results.iter().filter(|r| filter.matches(r)).collect()
}

/// Average and count for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub count: usize,
    pub average_score: f64,
}

/// Aggregate view over a set of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub count: usize,
    pub average_score: f64,
    /// Fraction of results at or above the pass mark.
    pub pass_rate: f64,
    pub grades: BTreeMap<Grade, usize>,
    pub per_subject: BTreeMap<String, SubjectStats>,
}

pub fn summarize<'a, I>(results: I) -> ResultSummary
where
    I: IntoIterator<Item = &'a ExamResult>,
{
    let mut count = 0usize;
    let mut score_sum = 0u64;
    let mut passed = 0usize;
    let mut grades: BTreeMap<Grade, usize> = Grade::ALL.iter().map(|g| (*g, 0)).collect();
    let mut subjects: BTreeMap<String, (usize, u64)> = BTreeMap::new();

    for r in results {
        count += 1;
        score_sum += u64::from(r.score);
        if r.passed() {
            passed += 1;
        }
        *grades.entry(r.grade()).or_default() += 1;
        let entry = subjects.entry(r.classification.subject.clone()).or_default();
        entry.0 += 1;
        entry.1 += u64::from(r.score);
    }

    let ratio = |num: f64, den: usize| if den == 0 { 0.0 } else { num / den as f64 };

    ResultSummary {
        count,
        average_score: ratio(score_sum as f64, count),
        pass_rate: ratio(passed as f64, count),
        grades,
        per_subject: subjects
            .into_iter()
            .map(|(subject, (n, sum))| {
                (
                    subject,
                    SubjectStats {
                        count: n,
                        average_score: ratio(sum as f64, n),
                    },
                )
            })
            .collect(),
    }
}
