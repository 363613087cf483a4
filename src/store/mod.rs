//! # Store Module
//!
//! The relational surface every fragment exposes. A fragment holds a disjoint
//! slice of Student/Grade rows and a full copy of the Course catalog.

mod memory;
mod persistent;

pub use memory::MemoryFragmentStore;
pub use persistent::PersistentFragmentStore;

use crate::error::Result;
use crate::model::{
    Course, DepartmentPartial, FragmentStats, Grade, Student, StudentCourseCount, StudentProfile,
};

/// One independently addressable fragment backend.
///
/// Writes take `&mut self`; reads take `&self` so the client can query all
/// fragments in parallel during a scatter.
pub trait FragmentStore: Send + Sync {
    /// Insert a student. Fails with `DuplicateKey` if the id is taken.
    fn insert_student(&mut self, student: &Student) -> Result<()>;

    /// Insert a course if absent.
    fn insert_course(&mut self, course: &Course) -> Result<()>;

    /// Insert a grade if `(student_id, course_id)` is absent. Returns whether
    /// a row was written.
    fn insert_grade(&mut self, grade: &Grade) -> Result<bool>;

    /// Returns whether a row matched.
    fn update_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<bool>;

    /// Returns whether a row was removed.
    fn delete_grade(&mut self, student_id: &str, course_id: &str) -> Result<bool>;

    fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>>;

    /// Score sum and grade count per department, joining grades against the
    /// local course catalog. Grades for unknown courses are not counted.
    fn department_partials(&self) -> Result<Vec<DepartmentPartial>>;

    /// Number of graded courses per student.
    fn course_counts(&self) -> Result<Vec<StudentCourseCount>>;

    /// Truncate all three relations.
    fn clear(&mut self) -> Result<()>;

    fn stats(&self) -> Result<FragmentStats>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
