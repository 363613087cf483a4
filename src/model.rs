//! # Model
//!
//! Row types shared by every fragment backend, plus the partial rows that
//! fragments report back during a scatter-gather aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A student row. `student_id` is the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub age: i32,
    pub email: String,
}

impl Student {
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        age: i32,
        email: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            age,
            email: email.into(),
        }
    }

    pub fn profile(&self) -> StudentProfile {
        StudentProfile {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// A course row. Replicated on every fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    #[serde(alias = "id")]
    pub course_id: String,
    pub department: String,
}

impl Course {
    pub fn new(course_id: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            department: department.into(),
        }
    }
}

/// A grade row, co-located with its student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub student_id: String,
    pub course_id: String,
    pub score: i32,
}

impl Grade {
    pub fn new(student_id: impl Into<String>, course_id: impl Into<String>, score: i32) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
            score,
        }
    }
}

/// Result of a profile lookup. Renders as `name,email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub name: String,
    pub email: String,
}

impl fmt::Display for StudentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.name, self.email)
    }
}

/// Per-department score sum and grade count reported by one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentPartial {
    pub department: String,
    pub score_sum: i64,
    pub grade_count: u64,
}

/// Number of courses a student holds grades for on one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentCourseCount {
    pub student_id: String,
    pub course_count: u64,
}

/// Row counts of a single fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FragmentStats {
    pub students: usize,
    pub courses: usize,
    pub grades: usize,
}
