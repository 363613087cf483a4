use gradeshard::config::HarnessConfig;
use gradeshard::harness::{compare_outputs, run_comparison, run_workload, RunSpec};
use gradeshard::{Course, FragmentBackend, Workload};
use tempfile::tempdir;

mod support;

use support::{memory_spec, registrar_workload, rocksdb_spec};

fn scenario_spec(fragment_count: usize) -> RunSpec {
    RunSpec {
        backend: FragmentBackend::Memory,
        fragment_count,
        courses: vec![Course::new("C1", "CS")],
    }
}

#[test]
fn two_students_one_course_average_under_one_and_three_fragments() -> anyhow::Result<()> {
    let workload = Workload::parse(
        "\
INSERT_STUDENT,S1,Alice,20,a@x.com
INSERT_STUDENT,S2,Bob,21,b@x.com
INSERT_GRADE,S1,C1,90
INSERT_GRADE,S2,C1,100
READ_SCORE
",
    );
    for fragments in [1, 3] {
        let run = run_workload(&scenario_spec(fragments), &workload)?;
        assert_eq!(run.lines, vec!["CS:95.0".to_string()], "{fragments} fragments");
    }
    Ok(())
}

#[test]
fn deleting_missing_pair_changes_nothing() -> anyhow::Result<()> {
    let base = "\
INSERT_STUDENT,S1,Alice,20,a@x.com
INSERT_GRADE,S1,C1,90
READ_SCORE
READ_ALL
";
    let with_delete = format!("{base}DELETE_STUDENT_COURSE,S1,C9\nDELETE_STUDENT_COURSE,S7,C1\n{base}");
    let plain = format!("{base}{base}");

    let expected = run_workload(&scenario_spec(3), &Workload::parse(&plain))?;
    let actual = run_workload(&scenario_spec(3), &Workload::parse(&with_delete))?;
    assert_eq!(expected.lines, actual.lines);
    assert_eq!(actual.stats.failures, 1, "only the repeated student insert fails");
    Ok(())
}

#[test]
fn unknown_profile_reads_null() -> anyhow::Result<()> {
    let workload = Workload::parse("INSERT_STUDENT,S1,Alice,20,a@x.com\nREAD_PROFILE,S2\nREAD_PROFILE,S1\n");
    for fragments in [1, 4] {
        let run = run_workload(&scenario_spec(fragments), &workload)?;
        assert_eq!(run.lines, vec!["NULL".to_string(), "Alice,a@x.com".to_string()]);
    }
    Ok(())
}

#[test]
fn registrar_workload_matches_baseline_in_memory() -> anyhow::Result<()> {
    let workload = registrar_workload();
    let baseline = run_workload(&memory_spec(1), &workload)?;
    assert_eq!(baseline.lines.len(), workload.read_count());
    assert_eq!(baseline.lines.last().map(String::as_str), Some("S007,S011,S019,S023"));

    for fragments in 2..=6 {
        let distributed = run_workload(&memory_spec(fragments), &workload)?;
        let report = compare_outputs(&baseline.lines, &distributed.lines);
        assert!(report.is_exact(), "{fragments} fragments:\n{report}");
        let students: usize = distributed.fragments.iter().map(|s| s.students).sum();
        assert_eq!(students, 30);
        assert!(distributed.fragments.iter().all(|s| s.courses == 4));
    }
    Ok(())
}

#[test]
fn registrar_workload_matches_baseline_on_rocksdb() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let workload = registrar_workload();
    let baseline = run_workload(&rocksdb_spec(dir.path(), 1), &workload)?;
    let distributed = run_workload(&rocksdb_spec(dir.path(), 3), &workload)?;
    let report = compare_outputs(&baseline.lines, &distributed.lines);
    assert!(report.is_exact(), "{report}");

    let in_memory = run_workload(&memory_spec(3), &workload)?;
    assert_eq!(in_memory.lines, distributed.lines);
    Ok(())
}

#[test]
fn comparison_writes_both_streams() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let config = HarnessConfig {
        fragments: 3,
        output_dir: dir.path().join("output"),
        courses: support::catalog(),
        ..HarnessConfig::default()
    };
    let workload = registrar_workload();
    let report = run_comparison(&config, &workload)?;

    assert_eq!(report.accuracy.total, workload.read_count());
    assert!(report.accuracy.is_exact());
    assert!(report.accuracy.to_string().contains("Accuracy    : 100.00%"));
    let expected = std::fs::read_to_string(&report.baseline_path)?;
    let actual = std::fs::read_to_string(&report.distributed_path)?;
    assert_eq!(expected, actual);
    assert_eq!(report.distributed.fragment_count, 3);
    Ok(())
}
