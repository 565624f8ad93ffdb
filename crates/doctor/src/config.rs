//! Configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::analysis::{Thresholds, THRESHOLD_BLUNDER, THRESHOLD_INACCURACY, THRESHOLD_MISTAKE};
use crate::error::ConfigError;
use crate::evaluator::SearchBudget;
use crate::stockfish::EngineOptions;

pub const DEFAULT_DEPTH: u32 = 18;
pub const DEFAULT_TIME_MS: u64 = 500;
pub const DEFAULT_DEEP_DEPTH: u32 = 22;
pub const DEFAULT_DEEP_TIME_MS: u64 = 1000;
/// Candidate moves reported by the deep re-check
pub const DEFAULT_DEEP_MULTIPV: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_THREADS: u32 = 1;
pub const DEFAULT_HASH_MB: u32 = 128;

/// Principal variation plies shown for a recommendation
pub const LINE_MOVES: usize = 4;

/// Well-known install locations, tried after `PATH`
const ENGINE_LOCATIONS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/opt/local/bin/stockfish",
    "/usr/games/stockfish",
    "C:/Program Files/Stockfish/stockfish.exe",
    "C:/Program Files (x86)/Stockfish/stockfish.exe",
];

/// Search budgets and tier boundaries for one analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Budget for the before/after evaluations
    pub standard: SearchBudget,
    /// Budget for the best-move re-check on non-good moves
    pub deep: SearchBudget,
    pub thresholds: Thresholds,
    pub line_moves: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            standard: SearchBudget::new(
                Some(DEFAULT_DEPTH),
                Some(Duration::from_millis(DEFAULT_TIME_MS)),
            ),
            deep: SearchBudget::new(
                Some(DEFAULT_DEEP_DEPTH),
                Some(Duration::from_millis(DEFAULT_DEEP_TIME_MS)),
            )
            .with_multipv(DEFAULT_DEEP_MULTIPV),
            thresholds: Thresholds::default(),
            line_moves: LINE_MOVES,
        }
    }
}

impl AnalysisConfig {
    /// Load from `ANALYSIS_DEPTH`, `ANALYSIS_TIME_MS`, `DEEP_DEPTH`,
    /// `DEEP_TIME_MS`, `DEEP_MULTIPV` and the `*_THRESHOLD` variables.
    /// A zero limit means unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            standard: budget_from_env("ANALYSIS_DEPTH", DEFAULT_DEPTH, "ANALYSIS_TIME_MS", DEFAULT_TIME_MS),
            deep: budget_from_env("DEEP_DEPTH", DEFAULT_DEEP_DEPTH, "DEEP_TIME_MS", DEFAULT_DEEP_TIME_MS)
                .with_multipv(env_or("DEEP_MULTIPV", DEFAULT_DEEP_MULTIPV)),
            thresholds: Thresholds {
                blunder: env_or("BLUNDER_THRESHOLD", THRESHOLD_BLUNDER),
                mistake: env_or("MISTAKE_THRESHOLD", THRESHOLD_MISTAKE),
                inaccuracy: env_or("INACCURACY_THRESHOLD", THRESHOLD_INACCURACY),
            },
            line_moves: LINE_MOVES,
        };
        config.validate()?;
        Ok(config)
    }

    /// Override depths (CLI flags).
    pub fn with_depths(mut self, depth: Option<u32>, deep_depth: Option<u32>) -> Self {
        if let Some(depth) = depth {
            self.standard.depth = Some(depth);
        }
        if let Some(depth) = deep_depth {
            self.deep.depth = Some(depth);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.standard.is_bounded() {
            return Err(ConfigError::Invalid(
                "standard search needs a depth or a movetime".into(),
            ));
        }
        if !self.deep.is_bounded() {
            return Err(ConfigError::Invalid(
                "deep search needs a depth or a movetime".into(),
            ));
        }
        if !self.thresholds.is_ordered() {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy blunder < mistake < inaccuracy <= 0, got {} / {} / {}",
                self.thresholds.blunder, self.thresholds.mistake, self.thresholds.inaccuracy
            )));
        }
        Ok(())
    }
}

/// Engine process settings before the executable is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Explicit path; `None` means auto-detect
    pub path: Option<PathBuf>,
    pub threads: u32,
    pub hash_mb: u32,
    pub timeout: Duration,
    pub pool_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            path: None,
            threads: DEFAULT_THREADS,
            hash_mb: DEFAULT_HASH_MB,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pool_size: num_cpus::get(),
        }
    }
}

impl EngineSettings {
    /// Load from `STOCKFISH_PATH`, `ENGINE_THREADS`, `ENGINE_HASH_MB`,
    /// `ENGINE_TIMEOUT_SECS` and `ENGINE_POOL_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            path: env::var("STOCKFISH_PATH").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
            threads: env_or("ENGINE_THREADS", defaults.threads),
            hash_mb: env_or("ENGINE_HASH_MB", defaults.hash_mb),
            timeout: Duration::from_secs(env_or("ENGINE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            pool_size: env_or("ENGINE_POOL_SIZE", defaults.pool_size),
        };
        if settings.timeout.is_zero() {
            return Err(ConfigError::Invalid("ENGINE_TIMEOUT_SECS must be positive".into()));
        }
        if settings.threads == 0 || settings.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "ENGINE_THREADS and ENGINE_POOL_SIZE must be positive".into(),
            ));
        }
        Ok(settings)
    }

    /// Resolve the executable and build process options.
    pub fn resolve(&self) -> Result<EngineOptions, ConfigError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => locate_engine().ok_or(ConfigError::EngineNotFound)?,
        };
        info!(path = %path.display(), "Using Stockfish");
        Ok(EngineOptions {
            path,
            threads: self.threads,
            hash_mb: self.hash_mb,
            timeout: self.timeout,
        })
    }
}

/// Look for `stockfish` on `PATH`, then in common install locations.
pub fn locate_engine() -> Option<PathBuf> {
    let names: &[&str] = if cfg!(windows) {
        &["stockfish.exe", "stockfish"]
    } else {
        &["stockfish"]
    };

    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            for name in names {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    let home = env::var_os("HOME").map(PathBuf::from);
    let home_candidates = home
        .iter()
        .flat_map(|h| [h.join("stockfish"), h.join(".local/bin/stockfish")]);
    let beside_exe = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("stockfish")));

    ENGINE_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .chain(home_candidates)
        .chain(beside_exe)
        .find(|p| p.is_file())
}

fn budget_from_env(depth_key: &str, depth: u32, time_key: &str, time_ms: u64) -> SearchBudget {
    let depth = env_or(depth_key, depth);
    let time_ms = env_or(time_key, time_ms);
    SearchBudget::new(
        (depth > 0).then_some(depth),
        (time_ms > 0).then(|| Duration::from_millis(time_ms)),
    )
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
