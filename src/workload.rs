//! # Workload
//!
//! Line-oriented, comma-separated commands and their replay through a
//! [`FragmentClient`]. Every READ command produces exactly one output line.
//! Storage failures never stop a replay: writes that fail are logged and
//! skipped, reads that fail emit `ERROR`.

use crate::aggregate::NULL_SENTINEL;
use crate::client::FragmentClient;
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, instrument, warn};

/// Output line for a READ whose query failed.
pub const ERROR_SENTINEL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InsertStudent {
        id: String,
        name: String,
        age: i32,
        email: String,
    },
    InsertCourse {
        course_id: String,
        department: String,
    },
    InsertGrade {
        student_id: String,
        course_id: String,
        score: i32,
    },
    UpdateGrade {
        student_id: String,
        course_id: String,
        score: i32,
    },
    DeleteStudentCourse {
        student_id: String,
        course_id: String,
    },
    ReadProfile {
        student_id: String,
    },
    ReadScore,
    ReadAll,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError {
    #[error("{command}: expected {expected} fields, found {found}")]
    MissingFields {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{command}: invalid integer {value:?} for {field}")]
    InvalidInteger {
        command: &'static str,
        field: &'static str,
        value: String,
    },
}

impl Command {
    /// Parse one line. Blank lines and unknown command names yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, WorkloadError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let name = fields[0];
        let command = match name {
            "INSERT_STUDENT" => {
                let f = require(&fields, "INSERT_STUDENT", 5)?;
                Command::InsertStudent {
                    id: f[1].to_string(),
                    name: f[2].to_string(),
                    age: integer("INSERT_STUDENT", "age", f[3])?,
                    email: f[4].to_string(),
                }
            }
            "INSERT_COURSE" => {
                let f = require(&fields, "INSERT_COURSE", 3)?;
                Command::InsertCourse {
                    course_id: f[1].to_string(),
                    department: f[2].to_string(),
                }
            }
            "INSERT_GRADE" => {
                let f = require(&fields, "INSERT_GRADE", 4)?;
                Command::InsertGrade {
                    student_id: f[1].to_string(),
                    course_id: f[2].to_string(),
                    score: integer("INSERT_GRADE", "score", f[3])?,
                }
            }
            "UPDATE_GRADE" => {
                let f = require(&fields, "UPDATE_GRADE", 4)?;
                Command::UpdateGrade {
                    student_id: f[1].to_string(),
                    course_id: f[2].to_string(),
                    score: integer("UPDATE_GRADE", "score", f[3])?,
                }
            }
            "DELETE_STUDENT_COURSE" => {
                let f = require(&fields, "DELETE_STUDENT_COURSE", 3)?;
                Command::DeleteStudentCourse {
                    student_id: f[1].to_string(),
                    course_id: f[2].to_string(),
                }
            }
            "READ_PROFILE" => {
                let f = require(&fields, "READ_PROFILE", 2)?;
                Command::ReadProfile {
                    student_id: f[1].to_string(),
                }
            }
            "READ_SCORE" => Command::ReadScore,
            "READ_ALL" => Command::ReadAll,
            other => {
                debug!(command = other, "ignoring unrecognized command");
                return Ok(None);
            }
        };
        Ok(Some(command))
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Command::ReadProfile { .. } | Command::ReadScore | Command::ReadAll
        )
    }
}

fn require<'a, 'b>(
    fields: &'a [&'b str],
    command: &'static str,
    expected: usize,
) -> Result<&'a [&'b str], WorkloadError> {
    if fields.len() < expected {
        return Err(WorkloadError::MissingFields {
            command,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn integer(command: &'static str, field: &'static str, value: &str) -> Result<i32, WorkloadError> {
    value.parse().map_err(|_| WorkloadError::InvalidInteger {
        command,
        field,
        value: value.to_string(),
    })
}

/// A parsed workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    pub commands: Vec<Command>,
    /// Recognized commands that could not be parsed.
    pub rejected: usize,
}

impl Workload {
    pub fn parse(text: &str) -> Self {
        let mut workload = Workload::default();
        for (line_no, line) in text.lines().enumerate() {
            match Command::parse(line) {
                Ok(Some(command)) => workload.commands.push(command),
                Ok(None) => {}
                Err(err) => {
                    warn!(line = line_no + 1, error = %err, "skipping malformed command");
                    workload.rejected += 1;
                }
            }
        }
        workload
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workload {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn read_count(&self) -> usize {
        self.commands.iter().filter(|command| command.is_read()).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReplayStats {
    pub commands: usize,
    pub reads: usize,
    pub failures: usize,
}

/// Execute one command. READs return their output line.
pub fn execute(client: &mut FragmentClient, command: &Command) -> (Option<String>, bool) {
    let outcome = match command {
        Command::InsertStudent {
            id,
            name,
            age,
            email,
        } => client.insert_student(id, name, *age, email).map(|_| None),
        Command::InsertCourse {
            course_id,
            department,
        } => client.insert_course(course_id, department).map(|_| None),
        Command::InsertGrade {
            student_id,
            course_id,
            score,
        } => client.insert_grade(student_id, course_id, *score).map(|_| None),
        Command::UpdateGrade {
            student_id,
            course_id,
            score,
        } => client.update_grade(student_id, course_id, *score).map(|_| None),
        Command::DeleteStudentCourse {
            student_id,
            course_id,
        } => client
            .delete_student_from_course(student_id, course_id)
            .map(|_| None),
        Command::ReadProfile { student_id } => client.student_profile(student_id).map(|profile| {
            Some(
                profile
                    .map(|profile| profile.to_string())
                    .unwrap_or_else(|| NULL_SENTINEL.to_string()),
            )
        }),
        Command::ReadScore => client
            .avg_score_by_dept()
            .map(|averages| Some(averages.to_string())),
        Command::ReadAll => client
            .students_with_most_courses()
            .map(|most| Some(most.to_string())),
    };

    match outcome {
        Ok(line) => (line, false),
        Err(err) if command.is_read() => {
            error!(?command, error = %err, "read failed");
            (Some(ERROR_SENTINEL.to_string()), true)
        }
        Err(err) => {
            warn!(?command, error = %err, "write skipped");
            (None, true)
        }
    }
}

/// Replay `commands` in order, writing one line per READ to `out`.
#[instrument(skip_all, fields(fragments = client.fragment_count(), commands = commands.len()))]
pub fn replay<W: Write>(
    client: &mut FragmentClient,
    commands: &[Command],
    out: &mut W,
) -> std::io::Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    for command in commands {
        let (line, failed) = execute(client, command);
        stats.commands += 1;
        if failed {
            stats.failures += 1;
        }
        if let Some(line) = line {
            stats.reads += 1;
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    debug!(?stats, "replay finished");
    Ok(stats)
}
