//! # Workload Harness
//!
//! Replays one workload against a single fragment (the baseline) and against
//! N fragments, then compares the two output streams line by line. Any
//! routing or merge bug shows up as an accuracy below 100%.

use crate::client::FragmentClient;
use crate::config::HarnessConfig;
use crate::error::FragmentError;
use crate::model::{Course, FragmentStats};
use crate::provision::FragmentBackend;
use crate::workload::{replay, ReplayStats, Workload};
use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

pub const BASELINE_OUTPUT: &str = "expected_output.txt";
pub const DISTRIBUTED_OUTPUT: &str = "actual_output.txt";

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub backend: FragmentBackend,
    pub fragment_count: usize,
    /// Catalog seeded on every fragment after the reset.
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub fragment_count: usize,
    pub lines: Vec<String>,
    pub stats: ReplayStats,
    pub fragments: Vec<FragmentStats>,
    pub elapsed: Duration,
}

/// Connect, reset, seed the catalog, replay, close.
///
/// Connectivity and reset failures abort the run. Failures of individual
/// commands do not.
#[instrument(skip_all, fields(fragments = spec.fragment_count))]
pub fn run_workload(spec: &RunSpec, workload: &Workload) -> Result<RunOutput, FragmentError> {
    let started = Instant::now();
    let mut client = FragmentClient::connect(&spec.backend, spec.fragment_count)?;
    client.reset_database()?;
    for course in &spec.courses {
        client.insert_course(&course.course_id, &course.department)?;
    }

    let mut buffer = Vec::new();
    let stats = replay(&mut client, &workload.commands, &mut buffer)
        .map_err(|err| FragmentError::Storage(err.into()))?;
    let fragments = client.fragment_stats()?;
    client.close()?;
    let elapsed = started.elapsed();

    let lines = String::from_utf8_lossy(&buffer)
        .lines()
        .map(str::to_string)
        .collect();
    info!(
        commands = stats.commands,
        reads = stats.reads,
        failures = stats.failures,
        elapsed_ms = elapsed.as_millis() as u64,
        "workload run complete"
    );
    Ok(RunOutput {
        fragment_count: fragments.len(),
        lines,
        stats,
        fragments,
        elapsed,
    })
}

/// Line-by-line agreement between two output streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccuracyReport {
    /// Lines in the expected (baseline) stream.
    pub total: usize,
    pub matching: usize,
}

impl AccuracyReport {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matching as f64 / self.total as f64 * 100.0
    }

    pub fn is_exact(&self) -> bool {
        self.total == self.matching
    }
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Lines : {}", self.total)?;
        writeln!(f, "Matching    : {}", self.matching)?;
        write!(f, "Accuracy    : {:.2}%", self.percentage())
    }
}

/// Compare trimmed lines at equal positions.
pub fn compare_outputs<E, A>(expected: &[E], actual: &[A]) -> AccuracyReport
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    let matching = expected
        .iter()
        .zip(actual.iter())
        .filter(|(expected, actual)| expected.as_ref().trim() == actual.as_ref().trim())
        .count();
    AccuracyReport {
        total: expected.len(),
        matching,
    }
}

/// Compare two output files.
pub fn compare_files(
    expected: impl AsRef<Path>,
    actual: impl AsRef<Path>,
) -> anyhow::Result<AccuracyReport> {
    let expected = read_lines(expected.as_ref())?;
    let actual = read_lines(actual.as_ref())?;
    Ok(compare_outputs(&expected, &actual))
}

fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read output {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

fn write_lines(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    use std::io::Write;
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create output {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub baseline: RunOutput,
    pub distributed: RunOutput,
    pub accuracy: AccuracyReport,
    pub baseline_path: PathBuf,
    pub distributed_path: PathBuf,
}

/// Run the baseline (one fragment) then the distributed run, write both
/// streams to the output directory and compare them.
pub fn run_comparison(
    config: &HarnessConfig,
    workload: &Workload,
) -> anyhow::Result<ComparisonReport> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output dir {}", config.output_dir.display())
    })?;

    info!("=== BASELINE RUN (1 FRAGMENT) ===");
    let baseline = run_workload(&config.run_spec(1), workload).context("baseline run failed")?;
    let baseline_path = config.output_dir.join(BASELINE_OUTPUT);
    write_lines(&baseline_path, &baseline.lines)?;

    info!(fragments = config.fragments, "=== DISTRIBUTED RUN ===");
    let distributed = run_workload(&config.run_spec(config.fragments), workload)
        .context("distributed run failed")?;
    let distributed_path = config.output_dir.join(DISTRIBUTED_OUTPUT);
    write_lines(&distributed_path, &distributed.lines)?;

    let accuracy = compare_files(&baseline_path, &distributed_path)?;
    info!(
        total = accuracy.total,
        matching = accuracy.matching,
        accuracy = accuracy.percentage(),
        "comparison complete"
    );
    Ok(ComparisonReport {
        baseline,
        distributed,
        accuracy,
        baseline_path,
        distributed_path,
    })
}
