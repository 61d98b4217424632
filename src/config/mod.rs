//! Configuration management for antnet.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pheromone table configuration.
    #[serde(default)]
    pub pheromone: PheromoneConfig,

    /// Heuristic estimation configuration.
    #[serde(default)]
    pub heuristic: HeuristicConfig,

    /// Next-hop selection configuration.
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Periodic update configuration.
    #[serde(default)]
    pub update: UpdateConfig,
}

impl EngineConfig {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pheromone;
        if !(p.evaporation_rate > 0.0 && p.evaporation_rate < 1.0) {
            return Err(Error::InvalidConfig(
                "evaporation_rate must be in (0, 1)".into(),
            ));
        }
        if p.max_level <= 0.0 {
            return Err(Error::InvalidConfig("max_level must be positive".into()));
        }
        if p.prune_threshold < 0.0 || p.prune_threshold >= p.max_level {
            return Err(Error::InvalidConfig(
                "prune_threshold must be in [0, max_level)".into(),
            ));
        }
        if self.selector.alpha < 0.0 || self.selector.beta < 0.0 {
            return Err(Error::InvalidConfig(
                "selection exponents must be non-negative".into(),
            ));
        }
        if self.heuristic.cost_epsilon <= 0.0 {
            return Err(Error::InvalidConfig(
                "cost_epsilon must be positive".into(),
            ));
        }
        if self.update.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "update interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Pheromone table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PheromoneConfig {
    /// Fraction of each level lost per update tick.
    #[serde(default = "default_evaporation_rate")]
    pub evaporation_rate: f64,

    /// Upper bound on any pheromone level.
    #[serde(default = "default_max_level")]
    pub max_level: f64,

    /// Entries below this level are deleted during evaporation.
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f64,

    /// Scale for delivery-feedback reinforcement deltas.
    #[serde(default = "default_reward_scale")]
    pub reward_scale: f64,

    /// Delta applied on forwarding-failure feedback.
    #[serde(default = "default_failure_penalty")]
    pub failure_penalty: f64,
}

fn default_evaporation_rate() -> f64 {
    0.1
}
fn default_max_level() -> f64 {
    10.0
}
fn default_prune_threshold() -> f64 {
    0.01
}
fn default_reward_scale() -> f64 {
    1.0
}
fn default_failure_penalty() -> f64 {
    1.0
}

impl Default for PheromoneConfig {
    fn default() -> Self {
        Self {
            evaporation_rate: default_evaporation_rate(),
            max_level: default_max_level(),
            prune_threshold: default_prune_threshold(),
            reward_scale: default_reward_scale(),
            failure_penalty: default_failure_penalty(),
        }
    }
}

/// Heuristic estimation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Additive smoothing applied to link cost before inversion, so a
    /// zero-cost link still yields a finite score.
    #[serde(default = "default_cost_epsilon")]
    pub cost_epsilon: f64,
}

fn default_cost_epsilon() -> f64 {
    0.001
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            cost_epsilon: default_cost_epsilon(),
        }
    }
}

/// How the selector picks among weighted candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Sample from the normalized weight distribution.
    #[default]
    Stochastic,
    /// Always pick the arg-max weight, ties broken by lowest neighbor id.
    Deterministic,
}

/// Next-hop selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Selection mode.
    #[serde(default)]
    pub mode: SelectionMode,

    /// Pheromone exponent.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Heuristic exponent.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// RNG seed for reproducible stochastic selection.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_alpha() -> f64 {
    1.0
}
fn default_beta() -> f64 {
    2.0
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            alpha: default_alpha(),
            beta: default_beta(),
            seed: None,
        }
    }
}

/// Periodic update configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Interval between evaporation/recomputation ticks.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}
