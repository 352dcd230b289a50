//! Regression configuration loaded from TOML.
//!
//! Every field is optional; command-line flags override whatever the file
//! sets.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ChipregError, Result};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CHIPREG_CONFIG";

/// How many jobs may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ParallelismRepr", into = "ParallelismRepr")]
pub enum Parallelism {
    /// Available CPU parallelism, capped.
    #[default]
    Auto,
    Fixed(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ParallelismRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<ParallelismRepr> for Parallelism {
    type Error = String;

    fn try_from(repr: ParallelismRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ParallelismRepr::Count(n) => Parallelism::from_count(n),
            ParallelismRepr::Keyword(s) => s.parse().map_err(|e: ChipregError| e.to_string()),
        }
    }
}

impl From<Parallelism> for ParallelismRepr {
    fn from(p: Parallelism) -> Self {
        match p {
            Parallelism::Auto => ParallelismRepr::Keyword("auto".to_string()),
            Parallelism::Fixed(n) => ParallelismRepr::Count(n),
        }
    }
}

impl Parallelism {
    fn from_count(n: usize) -> std::result::Result<Self, String> {
        if n == 0 {
            Err("parallelism must be at least 1".to_string())
        } else {
            Ok(Parallelism::Fixed(n))
        }
    }

    /// Concrete job slot count. `Auto` uses the host's available
    /// parallelism, at most `cap`.
    pub fn resolve(&self, cap: usize) -> usize {
        match self {
            Parallelism::Fixed(n) => (*n).max(1),
            Parallelism::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(cap.max(1)),
        }
    }
}

impl FromStr for Parallelism {
    type Err = ChipregError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Parallelism::Auto);
        }
        let n: usize = s
            .parse()
            .map_err(|_| ChipregError::Config(format!("invalid parallelism {s:?}, expected N or auto")))?;
        Parallelism::from_count(n).map_err(ChipregError::Config)
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parallelism::Auto => f.write_str("auto"),
            Parallelism::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Settings for one regression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    /// Analysis tool executable.
    pub binary_path: PathBuf,
    /// Optional script passed to the executable before the workarea.
    pub tool_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub catalog_delimiter: char,
    pub output_dir: PathBuf,
    pub parallel: Parallelism,
    pub auto_parallel_cap: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("unit_status"),
            tool_path: None,
            catalog_path: None,
            catalog_delimiter: ',',
            output_dir: PathBuf::from("regression"),
            parallel: Parallelism::Auto,
            auto_parallel_cap: 16,
            timeout_secs: 1800,
            max_retries: 2,
            retry_delay_secs: 5,
        }
    }
}

impl RegressionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ChipregError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ChipregError::Config(msg) => ChipregError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Explicit path first, then `CHIPREG_CONFIG`, then defaults.
    pub fn resolve(cli_config: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config {
            Self::load_from_file(path)
        } else if let Ok(env_config) = std::env::var(CONFIG_ENV) {
            Self::load_from_file(env_config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ChipregError::Config("timeout_secs must be positive".to_string()));
        }
        if self.auto_parallel_cap == 0 {
            return Err(ChipregError::Config(
                "auto_parallel_cap must be positive".to_string(),
            ));
        }
        if self.catalog_delimiter == '\n' || self.catalog_delimiter == ';' {
            return Err(ChipregError::Config(format!(
                "catalog_delimiter {:?} is reserved",
                self.catalog_delimiter
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn job_slots(&self) -> usize {
        self.parallel.resolve(self.auto_parallel_cap)
    }
}
