//! Persistent configuration for the chalkboard console.
//!
//! Config file lives at `~/.config/chalkboard/config.toml`. Every key is
//! optional; command-line flags win over the file, the file over defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chalkboard::config::{DEFAULT_BUDGET, DEFAULT_IDLE_THRESHOLD, DEFAULT_MAX_CYCLES, DEFAULT_SUMMARY_LEN};
use chalkboard::generate::{DEFAULT_API_URL, DEFAULT_MODEL};
use chalkboard::retry::RetryPolicy;
use chalkboard::{Budgets, RunConfig};

/// Default pause between cycles.
pub const DEFAULT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub api_url: Option<String>,
    pub max_cycles: Option<u32>,
    pub idle_threshold: Option<u32>,
    /// Budget applied to every role unless a per-role value is set.
    pub budget: Option<u32>,
    pub design_budget: Option<u32>,
    pub frontend_budget: Option<u32>,
    pub backend_budget: Option<u32>,
    pub interval_ms: Option<u64>,
    pub summary_len: Option<usize>,
    /// Retries after the first failed attempt.
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
}

pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chalkboard")
        .join("config.toml")
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config file")
    }

    /// Load an explicitly requested file. Missing or malformed files are errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Load the default file if it exists. Problems are logged and ignored.
    pub fn load_default() -> Self {
        let path = default_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring config file: {e:#}");
                Self::default()
            }
        }
    }
}

/// Command-line overrides, mirrored from the CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub api_url: Option<String>,
    pub max_cycles: Option<u32>,
    pub idle_threshold: Option<u32>,
    pub budget: Option<u32>,
    pub design_budget: Option<u32>,
    pub frontend_budget: Option<u32>,
    pub backend_budget: Option<u32>,
    pub interval_ms: Option<u64>,
    pub summary_len: Option<usize>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Effective settings after merging.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub model: String,
    pub max_tokens: u32,
    pub api_url: String,
    pub interval: Duration,
    pub run: RunConfig,
}

impl Resolved {
    /// Merge: CLI overrides > config file > defaults.
    pub fn merge(cli: &Overrides, file: &FileConfig) -> Self {
        let model = cli
            .model
            .clone()
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = cli
            .api_url
            .clone()
            .or_else(|| file.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let max_tokens = cli.max_tokens.or(file.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS);

        // Per role: CLI role flag > CLI --budget > file role key > file budget.
        let role_budget = |cli_role: Option<u32>, file_role: Option<u32>| {
            cli_role
                .or(cli.budget)
                .or(file_role)
                .or(file.budget)
                .unwrap_or(DEFAULT_BUDGET)
        };
        let budgets = Budgets {
            design: role_budget(cli.design_budget, file.design_budget),
            frontend: role_budget(cli.frontend_budget, file.frontend_budget),
            backend: role_budget(cli.backend_budget, file.backend_budget),
        };

        let retry = match cli.retries.or(file.retries) {
            Some(retries) => RetryPolicy {
                max_attempts: retries.saturating_add(1),
                ..RetryPolicy::default()
            },
            None => RetryPolicy::default(),
        };

        let run = RunConfig {
            max_global_cycles: cli.max_cycles.or(file.max_cycles).unwrap_or(DEFAULT_MAX_CYCLES),
            idle_threshold: cli
                .idle_threshold
                .or(file.idle_threshold)
                .unwrap_or(DEFAULT_IDLE_THRESHOLD),
            budgets,
            summary_max_len: cli.summary_len.or(file.summary_len).unwrap_or(DEFAULT_SUMMARY_LEN),
            retry,
            act_timeout: cli.timeout_secs.or(file.timeout_secs).map(Duration::from_secs),
        };

        let interval = Duration::from_millis(
            cli.interval_ms.or(file.interval_ms).unwrap_or(DEFAULT_INTERVAL_MS),
        );

        Self {
            model,
            max_tokens,
            api_url,
            interval,
            run,
        }
    }
}
