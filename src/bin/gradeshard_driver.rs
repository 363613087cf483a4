use std::path::PathBuf;

use gradeshard::config::{ConfigOverrides, HarnessConfig, ENV_CONFIG_PATH};
use gradeshard::harness::run_comparison;
use gradeshard::provision::{FragmentBackend, FragmentSetGuard};
use gradeshard::workload::Workload;
use tracing_subscriber::EnvFilter;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"gradeshard_driver - replay a workload on 1 and N fragments and compare

USAGE:
    gradeshard_driver [OPTIONS]

OPTIONS:
    -c, --config <FILE>       Path to config file (TOML)
    -w, --workload <FILE>     Workload file [default: workload.txt]
    -n, --fragments <N>       Fragment count of the distributed run [default: 3]
    -o, --output-dir <DIR>    Output directory [default: output]
        --data-dir <DIR>      Store fragments in RocksDB under DIR
        --report-json <FILE>  Also write the full report as JSON
    -h, --help                Print help

ENVIRONMENT:
    GRADESHARD_CONFIG         Path to config file
    GRADESHARD_FRAGMENTS      Fragment count
    GRADESHARD_WORKLOAD       Workload file
    RUST_LOG                  Log filter [default: info]
"#
    );
}

fn main() -> anyhow::Result<()> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut overrides = ConfigOverrides::default();
    if let Some(fragments) = parse_arg("--fragments").or_else(|| parse_arg("-n")) {
        overrides.fragments = Some(fragments.parse()?);
    }
    if let Some(workload) = parse_arg("--workload").or_else(|| parse_arg("-w")) {
        overrides.workload = Some(workload.into());
    }
    if let Some(output_dir) = parse_arg("--output-dir").or_else(|| parse_arg("-o")) {
        overrides.output_dir = Some(output_dir.into());
    }
    if let Some(data_dir) = parse_arg("--data-dir") {
        overrides.backend = Some(FragmentBackend::rocksdb(data_dir));
    }

    // Load config: CLI > Env > File > Defaults
    let config_path = parse_arg("--config")
        .or_else(|| parse_arg("-c"))
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok());
    let config = HarnessConfig::load(config_path.as_deref(), overrides)?;

    let workload = Workload::from_path(&config.workload)?;
    tracing::info!(
        path = %config.workload.display(),
        commands = workload.commands.len(),
        rejected = workload.rejected,
        "loaded workload"
    );

    println!("Dropping old fragments...");
    let report = {
        let _fragments = FragmentSetGuard::fresh(config.backend.clone(), config.fragments)?;
        let report = run_comparison(&config, &workload);
        println!("Cleaning up fragments");
        report?
    };

    println!("\n========== PERFORMANCE SUMMARY ==========");
    println!(
        "Baseline Execution Time    : {} ms",
        report.baseline.elapsed.as_millis()
    );
    println!(
        "Distributed Execution Time : {} ms",
        report.distributed.elapsed.as_millis()
    );
    for (fragment, stats) in report.distributed.fragments.iter().enumerate() {
        println!(
            "  fragment{fragment}: {} students, {} grades, {} courses",
            stats.students, stats.grades, stats.courses
        );
    }

    println!("\n--- FINAL METRICS ---");
    println!("{}", report.accuracy);
    println!("---------------------");

    if let Some(path) = parse_arg("--report-json") {
        let path = PathBuf::from(path);
        std::fs::write(&path, serde_json::to_vec_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
