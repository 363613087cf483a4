use crate::error::{FragmentError, Result};
use crate::model::{
    Course, DepartmentPartial, FragmentStats, Grade, Student, StudentCourseCount, StudentProfile,
};
use crate::store::FragmentStore;
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// In-process fragment backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryFragmentStore {
    students: HashMap<String, Student>,
    courses: HashMap<String, Course>,
    /// Keyed by (student_id, course_id).
    grades: BTreeMap<(String, String), i32>,
}

impl MemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn grade_key(student_id: &str, course_id: &str) -> (String, String) {
        (student_id.to_string(), course_id.to_string())
    }
}

impl FragmentStore for MemoryFragmentStore {
    fn insert_student(&mut self, student: &Student) -> Result<()> {
        if self.students.contains_key(&student.student_id) {
            return Err(FragmentError::DuplicateKey {
                relation: "student",
                key: student.student_id.clone(),
            });
        }
        self.students
            .insert(student.student_id.clone(), student.clone());
        Ok(())
    }

    fn insert_course(&mut self, course: &Course) -> Result<()> {
        self.courses
            .entry(course.course_id.clone())
            .or_insert_with(|| course.clone());
        Ok(())
    }

    fn insert_grade(&mut self, grade: &Grade) -> Result<bool> {
        let key = Self::grade_key(&grade.student_id, &grade.course_id);
        if self.grades.contains_key(&key) {
            return Ok(false);
        }
        self.grades.insert(key, grade.score);
        Ok(true)
    }

    fn update_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<bool> {
        match self.grades.get_mut(&Self::grade_key(student_id, course_id)) {
            Some(stored) => {
                *stored = score;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_grade(&mut self, student_id: &str, course_id: &str) -> Result<bool> {
        Ok(self
            .grades
            .remove(&Self::grade_key(student_id, course_id))
            .is_some())
    }

    fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        Ok(self.students.get(student_id).map(Student::profile))
    }

    fn department_partials(&self) -> Result<Vec<DepartmentPartial>> {
        let mut totals: BTreeMap<&str, (i64, u64)> = BTreeMap::new();
        for ((_, course_id), score) in &self.grades {
            let Some(course) = self.courses.get(course_id) else {
                continue;
            };
            let entry = totals.entry(course.department.as_str()).or_default();
            entry.0 += i64::from(*score);
            entry.1 += 1;
        }
        Ok(totals
            .into_iter()
            .map(|(department, (score_sum, grade_count))| DepartmentPartial {
                department: department.to_string(),
                score_sum,
                grade_count,
            })
            .collect())
    }

    fn course_counts(&self) -> Result<Vec<StudentCourseCount>> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for (student_id, _) in self.grades.keys() {
            *counts.entry(student_id.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(student_id, course_count)| StudentCourseCount {
                student_id: student_id.to_string(),
                course_count,
            })
            .collect())
    }

    fn clear(&mut self) -> Result<()> {
        self.students.clear();
        self.courses.clear();
        self.grades.clear();
        Ok(())
    }

    fn stats(&self) -> Result<FragmentStats> {
        Ok(FragmentStats {
            students: self.students.len(),
            courses: self.courses.len(),
            grades: self.grades.len(),
        })
    }
}
