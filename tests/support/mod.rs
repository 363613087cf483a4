use gradeshard::harness::RunSpec;
use gradeshard::{Course, FragmentBackend, Workload};
use std::path::Path;

#[allow(dead_code)]
pub fn catalog() -> Vec<Course> {
    vec![
        Course::new("C1", "CS"),
        Course::new("C2", "CS"),
        Course::new("C3", "MATH"),
        Course::new("C4", "PHYS"),
    ]
}

#[allow(dead_code)]
pub fn memory_spec(fragment_count: usize) -> RunSpec {
    RunSpec {
        backend: FragmentBackend::Memory,
        fragment_count,
        courses: catalog(),
    }
}

#[allow(dead_code)]
pub fn rocksdb_spec(data_dir: &Path, fragment_count: usize) -> RunSpec {
    RunSpec {
        backend: FragmentBackend::rocksdb(data_dir),
        fragment_count,
        courses: catalog(),
    }
}

/// A small registrar workload touching every command.
#[allow(dead_code)]
pub fn registrar_workload() -> Workload {
    let mut text = String::new();
    for idx in 0..30 {
        text.push_str(&format!(
            "INSERT_STUDENT,S{idx:03},Student{idx},{},s{idx}@uni.edu\n",
            18 + idx % 10
        ));
    }
    text.push_str("READ_SCORE\nREAD_ALL\n");
    for idx in 0..30 {
        for course in 1..=(1 + idx % 4) {
            text.push_str(&format!(
                "INSERT_GRADE,S{idx:03},C{course},{}\n",
                (idx * 7 + course * 13) % 101
            ));
        }
        if idx % 5 == 0 {
            text.push_str("READ_SCORE\nREAD_ALL\n");
        }
    }
    for idx in (0..30).step_by(3) {
        text.push_str(&format!("UPDATE_GRADE,S{idx:03},C1,100\n"));
        text.push_str(&format!("DELETE_STUDENT_COURSE,S{idx:03},C2\n"));
        text.push_str(&format!("READ_PROFILE,S{idx:03}\n"));
    }
    text.push_str("INSERT_GRADE,S003,C1,0\n");
    text.push_str("READ_PROFILE,S999\nREAD_SCORE\nREAD_ALL\n");
    Workload::parse(&text)
}
