use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::workload::{Command, Workload};

const DEPARTMENTS: [&str; 4] = ["ART", "CS", "MATH", "PHYS"];

#[derive(Debug, Clone, Copy)]
pub struct WorkloadShape {
    pub students: usize,
    pub courses: usize,
    pub operations: usize,
    /// Probability that an operation is a read.
    pub read_probability: f64,
}

impl Default for WorkloadShape {
    fn default() -> Self {
        Self {
            students: 60,
            courses: 12,
            operations: 600,
            read_probability: 0.15,
        }
    }
}

pub fn course_id(idx: usize) -> String {
    format!("C{idx:03}")
}

pub fn student_id(idx: usize) -> String {
    format!("S{idx:04}")
}

/// Seeded random workload. Starts by broadcasting the course catalog, then
/// mixes inserts (including duplicates), updates and deletes (including of
/// missing rows) with the three read kinds.
pub fn generate_workload(seed: u64, shape: WorkloadShape) -> Workload {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut commands = Vec::with_capacity(shape.courses + shape.operations);

    for idx in 0..shape.courses {
        commands.push(Command::InsertCourse {
            course_id: course_id(idx),
            department: DEPARTMENTS[idx % DEPARTMENTS.len()].to_string(),
        });
    }

    let students = shape.students.max(1);
    // One extra course id that is never in the catalog.
    let courses = shape.courses + 1;
    for _ in 0..shape.operations {
        let student = student_id(rng.random_range(0..students));
        let course = course_id(rng.random_range(0..courses));
        if rng.random_bool(shape.read_probability) {
            let command = match rng.random_range(0..3) {
                0 => Command::ReadProfile {
                    // Roughly one in ten lookups misses.
                    student_id: student_id(rng.random_range(0..students + students / 10 + 1)),
                },
                1 => Command::ReadScore,
                _ => Command::ReadAll,
            };
            commands.push(command);
            continue;
        }
        let command = match rng.random_range(0..10) {
            0..=2 => {
                let age = rng.random_range(17..40);
                Command::InsertStudent {
                    email: format!("{}@example.edu", student.to_lowercase()),
                    name: format!("Name{}", &student[1..]),
                    id: student,
                    age,
                }
            }
            3..=6 => Command::InsertGrade {
                student_id: student,
                course_id: course,
                score: rng.random_range(0..=100),
            },
            7..=8 => Command::UpdateGrade {
                student_id: student,
                course_id: course,
                score: rng.random_range(0..=100),
            },
            _ => Command::DeleteStudentCourse {
                student_id: student,
                course_id: course,
            },
        };
        commands.push(command);
    }
    commands.push(Command::ReadScore);
    commands.push(Command::ReadAll);

    Workload {
        commands,
        rejected: 0,
    }
}

/// Render a workload back into the line format.
pub fn render_workload(workload: &Workload) -> String {
    let mut text = String::new();
    for command in &workload.commands {
        let line = match command {
            Command::InsertStudent {
                id,
                name,
                age,
                email,
            } => format!("INSERT_STUDENT,{id},{name},{age},{email}"),
            Command::InsertCourse {
                course_id,
                department,
            } => format!("INSERT_COURSE,{course_id},{department}"),
            Command::InsertGrade {
                student_id,
                course_id,
                score,
            } => format!("INSERT_GRADE,{student_id},{course_id},{score}"),
            Command::UpdateGrade {
                student_id,
                course_id,
                score,
            } => format!("UPDATE_GRADE,{student_id},{course_id},{score}"),
            Command::DeleteStudentCourse {
                student_id,
                course_id,
            } => format!("DELETE_STUDENT_COURSE,{student_id},{course_id}"),
            Command::ReadProfile { student_id } => format!("READ_PROFILE,{student_id}"),
            Command::ReadScore => "READ_SCORE".to_string(),
            Command::ReadAll => "READ_ALL".to_string(),
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}
