use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gradeshard::error::{FragmentError, Result};
use gradeshard::model::{
    Course, DepartmentPartial, FragmentStats, Grade, Student, StudentCourseCount, StudentProfile,
};
use gradeshard::workload::{replay, Workload};
use gradeshard::{FragmentClient, FragmentStore, MemoryFragmentStore};

/// Memory fragment whose aggregate queries fail while `down` is set.
struct FlakyStore {
    inner: MemoryFragmentStore,
    down: Arc<AtomicBool>,
}

impl FlakyStore {
    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(FragmentError::Storage(anyhow::anyhow!("fragment offline")));
        }
        Ok(())
    }
}

impl FragmentStore for FlakyStore {
    fn insert_student(&mut self, student: &Student) -> Result<()> {
        self.inner.insert_student(student)
    }

    fn insert_course(&mut self, course: &Course) -> Result<()> {
        self.inner.insert_course(course)
    }

    fn insert_grade(&mut self, grade: &Grade) -> Result<bool> {
        self.inner.insert_grade(grade)
    }

    fn update_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<bool> {
        self.inner.update_grade(student_id, course_id, score)
    }

    fn delete_grade(&mut self, student_id: &str, course_id: &str) -> Result<bool> {
        self.inner.delete_grade(student_id, course_id)
    }

    fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        self.inner.student_profile(student_id)
    }

    fn department_partials(&self) -> Result<Vec<DepartmentPartial>> {
        self.check()?;
        self.inner.department_partials()
    }

    fn course_counts(&self) -> Result<Vec<StudentCourseCount>> {
        self.check()?;
        self.inner.course_counts()
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear()
    }

    fn stats(&self) -> Result<FragmentStats> {
        self.inner.stats()
    }
}

/// Three fragments; fragment 1 can be taken offline.
fn client_with_flaky_fragment() -> (FragmentClient, Arc<AtomicBool>) {
    let down = Arc::new(AtomicBool::new(false));
    let fragments: Vec<Box<dyn FragmentStore>> = (0..3)
        .map(|index| {
            let flag = if index == 1 {
                Arc::clone(&down)
            } else {
                Arc::new(AtomicBool::new(false))
            };
            Box::new(FlakyStore {
                inner: MemoryFragmentStore::new(),
                down: flag,
            }) as Box<dyn FragmentStore>
        })
        .collect();
    let mut client = FragmentClient::from_stores(fragments);
    client.insert_course("C1", "CS").unwrap();
    (client, down)
}

#[test]
fn failed_fragment_is_named_in_scatter_error() {
    let (client, down) = client_with_flaky_fragment();
    down.store(true, Ordering::SeqCst);

    let err = client.avg_score_by_dept().unwrap_err();
    assert!(matches!(err, FragmentError::Scatter { fragment: 1, .. }), "{err}");

    let err = client.students_with_most_courses().unwrap_err();
    assert!(matches!(err, FragmentError::Scatter { fragment: 1, .. }), "{err}");

    down.store(false, Ordering::SeqCst);
    assert!(client.avg_score_by_dept().unwrap().is_empty());
}

#[test]
fn replay_emits_error_line_and_continues() {
    let (mut client, down) = client_with_flaky_fragment();
    let setup = Workload::parse(
        "\
INSERT_STUDENT,S1,Alice,20,a@x.com
INSERT_STUDENT,S2,Bob,21,b@x.com
INSERT_STUDENT,S3,Cara,22,c@x.com
INSERT_GRADE,S1,C1,80
INSERT_GRADE,S2,C1,90
INSERT_GRADE,S3,C1,100
",
    );
    let mut out = Vec::new();
    replay(&mut client, &setup.commands, &mut out).unwrap();
    assert!(out.is_empty());

    down.store(true, Ordering::SeqCst);
    let reads = Workload::parse("READ_SCORE\nREAD_ALL\nREAD_PROFILE,S2\n");
    let stats = replay(&mut client, &reads.commands, &mut out).unwrap();
    assert_eq!(stats.reads, 3);
    assert_eq!(stats.failures, 2);

    down.store(false, Ordering::SeqCst);
    let stats = replay(&mut client, &Workload::parse("READ_SCORE\n").commands, &mut out).unwrap();
    assert_eq!(stats.failures, 0);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "ERROR\nERROR\nBob,b@x.com\nCS:90.0\n");
}
