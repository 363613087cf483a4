//! # Cross-fragment aggregation
//!
//! Merge step of the scatter-gather queries. Fragments report raw partial
//! rows (sums and counts, never averages or local maxima) and the functions
//! here combine them into a global answer. Merging the partials of one
//! fragment gives the same result as merging any split of the same rows, which
//! is what makes the output independent of the fragment count.

use crate::model::{DepartmentPartial, StudentCourseCount};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel rendered when a query has no rows.
pub const NULL_SENTINEL: &str = "NULL";

/// Global score totals for one department.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepartmentTotals {
    pub score_sum: i64,
    pub grade_count: u64,
}

impl DepartmentTotals {
    pub fn average(&self) -> f64 {
        if self.grade_count == 0 {
            return 0.0;
        }
        self.score_sum as f64 / self.grade_count as f64
    }

    /// The average in tenths, rounded half away from zero on the exact
    /// quotient, so `82.25` becomes `823`.
    fn average_tenths(&self) -> i128 {
        if self.grade_count == 0 {
            return 0;
        }
        let numerator = i128::from(self.score_sum) * 10;
        let count = i128::from(self.grade_count);
        let magnitude = (2 * numerator.abs() + count) / (2 * count);
        if numerator < 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Average score per department, ordered by department name.
///
/// Renders as `dept:avg` entries joined by `;`, averages with one decimal,
/// ties rounded half up. No departments renders as an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepartmentAverages {
    totals: BTreeMap<String, DepartmentTotals>,
}

impl DepartmentAverages {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn average(&self, department: &str) -> Option<f64> {
        self.totals.get(department).map(DepartmentTotals::average)
    }
}

impl fmt::Display for DepartmentAverages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (department, totals)) in self.totals.iter().enumerate() {
            if idx > 0 {
                f.write_str(";")?;
            }
            let tenths = totals.average_tenths();
            let sign = if tenths < 0 { "-" } else { "" };
            let tenths = tenths.unsigned_abs();
            write!(f, "{department}:{sign}{}.{}", tenths / 10, tenths % 10)?;
        }
        Ok(())
    }
}

/// Sum partial sums and counts per department across fragments.
pub fn merge_department_partials<I>(partials: I) -> DepartmentAverages
where
    I: IntoIterator<Item = Vec<DepartmentPartial>>,
{
    let mut totals: BTreeMap<String, DepartmentTotals> = BTreeMap::new();
    for fragment in partials {
        for partial in fragment {
            let entry = totals.entry(partial.department).or_default();
            entry.score_sum += partial.score_sum;
            entry.grade_count += partial.grade_count;
        }
    }
    totals.retain(|_, totals| totals.grade_count > 0);
    DepartmentAverages { totals }
}

/// Students holding the global maximum number of courses, ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MostCourses {
    pub course_count: u64,
    pub students: Vec<String>,
}

impl MostCourses {
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

impl fmt::Display for MostCourses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.students.is_empty() {
            return f.write_str(NULL_SENTINEL);
        }
        f.write_str(&self.students.join(","))
    }
}

/// Find the global maximum over every fragment's per-student counts, then
/// collect every student at that maximum regardless of fragment.
pub fn merge_course_counts(partials: &[Vec<StudentCourseCount>]) -> MostCourses {
    let global_max = partials
        .iter()
        .flat_map(|fragment| fragment.iter())
        .map(|count| count.course_count)
        .max()
        .unwrap_or(0);
    if global_max == 0 {
        return MostCourses::default();
    }

    let mut students: Vec<String> = partials
        .iter()
        .flat_map(|fragment| fragment.iter())
        .filter(|count| count.course_count == global_max)
        .map(|count| count.student_id.clone())
        .collect();
    students.sort();
    students.dedup();
    MostCourses {
        course_count: global_max,
        students,
    }
}
