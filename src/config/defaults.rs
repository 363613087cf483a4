//! Default constants for gradeshard configuration.

// =============================================================================
// Sharding Defaults
// =============================================================================

/// Fragment count of the distributed run. The baseline always uses one.
pub const DEFAULT_FRAGMENTS: usize = 3;

// =============================================================================
// File Layout Defaults
// =============================================================================

/// Workload replayed by both runs
pub const DEFAULT_WORKLOAD_PATH: &str = "workload.txt";

/// Directory receiving the baseline and distributed output streams
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Data directory used when the RocksDB backend is selected without one
pub const DEFAULT_DATA_DIR: &str = "fragments";

// =============================================================================
// Environment
// =============================================================================

/// Prefix of environment overrides, e.g. `GRADESHARD_FRAGMENTS=4`
pub const ENV_PREFIX: &str = "GRADESHARD_";

/// Environment variable naming the config file
pub const ENV_CONFIG_PATH: &str = "GRADESHARD_CONFIG";
