//! Run configuration for the coordinator.

use std::time::Duration;

use crate::error::RunError;
use crate::message::Role;
use crate::retry::RetryPolicy;

pub const DEFAULT_MAX_CYCLES: u32 = 20;
pub const DEFAULT_IDLE_THRESHOLD: u32 = 3;
pub const DEFAULT_BUDGET: u32 = 3;
pub const DEFAULT_SUMMARY_LEN: usize = 80;

/// Iteration budget per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub design: u32,
    pub frontend: u32,
    pub backend: u32,
}

impl Budgets {
    pub fn uniform(budget: u32) -> Self {
        Self {
            design: budget,
            frontend: budget,
            backend: budget,
        }
    }

    pub fn for_role(&self, role: Role) -> u32 {
        match role {
            Role::Design => self.design,
            Role::Frontend => self.frontend,
            Role::Backend => self.backend,
        }
    }
}

impl Default for Budgets {
    fn default() -> Self {
        Self::uniform(DEFAULT_BUDGET)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Hard cap on cycles per run.
    pub max_global_cycles: u32,
    /// Consecutive idle cycles that end a run early.
    pub idle_threshold: u32,
    pub budgets: Budgets,
    /// Maximum length of an agent's last-output summary, in characters.
    pub summary_max_len: usize,
    pub retry: RetryPolicy,
    /// Upper bound on a single generation attempt.
    pub act_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_global_cycles: DEFAULT_MAX_CYCLES,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            budgets: Budgets::default(),
            summary_max_len: DEFAULT_SUMMARY_LEN,
            retry: RetryPolicy::default(),
            act_timeout: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_global_cycles == 0 {
            return Err(RunError::InvalidConfig("max_global_cycles must be at least 1".into()));
        }
        if self.idle_threshold == 0 {
            return Err(RunError::InvalidConfig("idle_threshold must be at least 1".into()));
        }
        for role in Role::ORDER {
            if self.budgets.for_role(role) == 0 {
                return Err(RunError::InvalidConfig(format!(
                    "iteration budget for {role} must be at least 1"
                )));
            }
        }
        if self.summary_max_len < 4 {
            return Err(RunError::InvalidConfig("summary_max_len must be at least 4".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(RunError::InvalidConfig("retry.max_attempts must be at least 1".into()));
        }
        if self.act_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RunError::InvalidConfig("act_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_global_cycles, 20);
        assert_eq!(config.idle_threshold, 3);
        assert_eq!(config.budgets, Budgets::uniform(3));
    }

    #[test]
    fn zero_values_rejected() {
        let mut config = RunConfig::default();
        config.budgets.backend = 0;
        assert!(matches!(config.validate(), Err(RunError::InvalidConfig(m)) if m.contains("backend")));

        let config = RunConfig {
            idle_threshold: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            max_global_cycles: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
