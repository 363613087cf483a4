//! # Fragment Client
//!
//! One logical data-access API over N fragments. Student and grade operations
//! go to `fragment_of(student_id)`; course writes and resets go to every
//! fragment; the two aggregate queries scatter to all fragments in parallel
//! and merge once every fragment has answered.

use crate::aggregate::{
    merge_course_counts, merge_department_partials, DepartmentAverages, MostCourses,
};
use crate::error::{FragmentError, Result};
use crate::model::{Course, FragmentStats, Grade, Student, StudentProfile};
use crate::provision::{open_fragments, FragmentBackend};
use crate::router::Router;
use crate::store::FragmentStore;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

pub struct FragmentClient {
    fragments: Vec<Box<dyn FragmentStore>>,
    router: Router,
}

impl std::fmt::Debug for FragmentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentClient")
            .field("fragment_count", &self.fragments.len())
            .finish()
    }
}

impl FragmentClient {
    /// Open one connection per fragment. Fails if any fragment is unreachable.
    pub fn connect(backend: &FragmentBackend, fragment_count: usize) -> Result<Self> {
        let fragments = open_fragments(backend, fragment_count.max(1))?;
        Ok(Self::from_stores(fragments))
    }

    /// Build a client over already-open fragments. Fragment `i` of the vector
    /// owns the keys that route to `i`.
    ///
    /// # Panics
    ///
    /// Panics if `fragments` is empty.
    pub fn from_stores(fragments: Vec<Box<dyn FragmentStore>>) -> Self {
        assert!(!fragments.is_empty(), "a client needs at least one fragment");
        let router = Router::new(fragments.len());
        Self { fragments, router }
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    // The router is built from `fragments.len()`, so its output always indexes.
    fn owner_mut(&mut self, key: &str) -> (usize, &mut dyn FragmentStore) {
        let fragment = self.router.fragment_of(key);
        debug_assert!(fragment < self.fragments.len());
        (fragment, self.fragments[fragment].as_mut())
    }

    fn owner(&self, key: &str) -> (usize, &dyn FragmentStore) {
        let fragment = self.router.fragment_of(key);
        debug_assert!(fragment < self.fragments.len());
        (fragment, self.fragments[fragment].as_ref())
    }

    pub fn insert_student(&mut self, id: &str, name: &str, age: i32, email: &str) -> Result<()> {
        let (fragment, store) = self.owner_mut(id);
        store.insert_student(&Student::new(id, name, age, email))?;
        debug!(student = id, fragment, "inserted student");
        Ok(())
    }

    /// Replicate a course to every fragment.
    pub fn insert_course(&mut self, course_id: &str, department: &str) -> Result<()> {
        let course = Course::new(course_id, department);
        for (fragment, store) in self.fragments.iter_mut().enumerate() {
            store
                .insert_course(&course)
                .map_err(|source| FragmentError::Scatter {
                    fragment,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    /// Idempotent: an existing `(student_id, course_id)` pair is left as is.
    pub fn insert_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<()> {
        let (fragment, store) = self.owner_mut(student_id);
        let written = store.insert_grade(&Grade::new(student_id, course_id, score))?;
        debug!(student = student_id, course = course_id, fragment, written, "insert grade");
        Ok(())
    }

    pub fn update_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<()> {
        let (fragment, store) = self.owner_mut(student_id);
        let matched = store.update_grade(student_id, course_id, score)?;
        debug!(student = student_id, course = course_id, fragment, matched, "update grade");
        Ok(())
    }

    pub fn delete_student_from_course(&mut self, student_id: &str, course_id: &str) -> Result<()> {
        let (fragment, store) = self.owner_mut(student_id);
        let removed = store.delete_grade(student_id, course_id)?;
        debug!(student = student_id, course = course_id, fragment, removed, "delete grade");
        Ok(())
    }

    /// Only the owning fragment is consulted; a miss there is a miss everywhere.
    pub fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let (_, store) = self.owner(student_id);
        store.student_profile(student_id)
    }

    /// Clear every relation on every fragment.
    #[instrument(skip(self), fields(fragments = self.fragments.len()))]
    pub fn reset_database(&mut self) -> Result<()> {
        for (fragment, store) in self.fragments.iter_mut().enumerate() {
            store.clear().map_err(|source| FragmentError::Scatter {
                fragment,
                source: Box::new(source),
            })?;
        }
        info!("all fragments reset");
        Ok(())
    }

    pub fn avg_score_by_dept(&self) -> Result<DepartmentAverages> {
        let partials = self.scatter(|store| store.department_partials())?;
        Ok(merge_department_partials(partials))
    }

    pub fn students_with_most_courses(&self) -> Result<MostCourses> {
        let partials = self.scatter(|store| store.course_counts())?;
        Ok(merge_course_counts(&partials))
    }

    pub fn fragment_stats(&self) -> Result<Vec<FragmentStats>> {
        self.scatter(|store| store.stats())
    }

    /// Flush and release every fragment.
    pub fn close(self) -> Result<()> {
        for (fragment, store) in self.fragments.iter().enumerate() {
            store.flush().map_err(|source| FragmentError::Scatter {
                fragment,
                source: Box::new(source),
            })?;
        }
        debug!(fragments = self.fragments.len(), "closed fragment connections");
        Ok(())
    }

    /// Run `query` on every fragment in parallel. All results are gathered
    /// before any is inspected; the lowest failing fragment fails the call.
    fn scatter<T, F>(&self, query: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&dyn FragmentStore) -> Result<T> + Sync,
    {
        let results: Vec<Result<T>> = self
            .fragments
            .par_iter()
            .map(|store| query(store.as_ref()))
            .collect();

        results
            .into_iter()
            .enumerate()
            .map(|(fragment, result)| {
                result.map_err(|source| FragmentError::Scatter {
                    fragment,
                    source: Box::new(source),
                })
            })
            .collect()
    }
}
