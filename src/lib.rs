//! # Gradeshard
//!
//! Partitions a student/course/grade dataset across N fragments and exposes a
//! single client API over them. Student and grade rows are routed by a
//! deterministic hash of `student_id`; the course catalog is replicated on
//! every fragment. Cross-fragment queries scatter to all fragments and merge
//! partial sums and counts, so their answers do not depend on N.
//!
//! The [`harness`] replays a workload against one fragment and against N
//! fragments and compares the outputs line by line.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod model;
pub mod provision;
pub mod router;
pub mod store;
pub mod workload;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export main types for convenience
pub use aggregate::{DepartmentAverages, MostCourses};
pub use client::FragmentClient;
pub use config::HarnessConfig;
pub use error::FragmentError;
pub use harness::{compare_outputs, run_comparison, run_workload, AccuracyReport, RunSpec};
pub use model::{Course, Grade, Student, StudentProfile};
pub use provision::FragmentBackend;
pub use router::{fragment_of, Router};
pub use store::{FragmentStore, MemoryFragmentStore, PersistentFragmentStore};
pub use workload::{Command, Workload};
