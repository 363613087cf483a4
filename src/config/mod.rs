//! Configuration for the comparison driver.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (gradeshard.toml)
//! ```toml
//! fragments = 3
//! workload = "workload.txt"
//! output_dir = "output"
//!
//! [backend]
//! kind = "rocksdb"
//! data_dir = "/var/lib/gradeshard"
//!
//! [[courses]]
//! id = "C1"
//! department = "CS"
//! ```

mod defaults;

pub use defaults::*;

use crate::harness::RunSpec;
use crate::model::Course;
use crate::provision::FragmentBackend;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration of a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Fragment count of the distributed run
    pub fragments: usize,
    /// Workload file
    pub workload: PathBuf,
    /// Output directory for both result streams
    pub output_dir: PathBuf,
    /// Fragment storage
    pub backend: FragmentBackend,
    /// Course catalog replicated on every fragment before replay
    pub courses: Vec<Course>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fragments: DEFAULT_FRAGMENTS,
            workload: PathBuf::from(DEFAULT_WORKLOAD_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            backend: FragmentBackend::Memory,
            courses: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    pub fn load(
        config_path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(HarnessConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]));

        figment = figment.merge(Serialized::defaults(overrides));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fragments == 0 {
            return Err(ConfigError {
                message: "fragments must be at least 1".to_string(),
            });
        }
        if let Some(course) = self
            .courses
            .iter()
            .find(|course| course.course_id.is_empty())
        {
            return Err(ConfigError {
                message: format!("course in department {:?} has an empty id", course.department),
            });
        }
        Ok(())
    }

    pub fn run_spec(&self, fragment_count: usize) -> RunSpec {
        RunSpec {
            backend: self.backend.clone(),
            fragment_count,
            courses: self.courses.clone(),
        }
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<FragmentBackend>,
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}
