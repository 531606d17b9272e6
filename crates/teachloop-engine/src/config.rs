//! Engine configuration.
//!
//! The retry limit, adaptive thresholds, and collaborator timeouts are
//! policy defaults inferred from product material, not fixed contracts, so
//! every one of them is configurable here and nowhere else.

use std::path::Path;

use serde::{Deserialize, Serialize};
use teachloop_evaluator::EvaluatorConfig;

use crate::error::{Result, TeachError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "teachloop.json";

/// Default number of incorrect attempts allowed per checkpoint.
const fn default_retry_limit() -> u32 {
    2
}

/// Default wrong-answer count that switches a session to simplified content.
const fn default_wrong_answer_threshold() -> u32 {
    2
}

/// Default maximum depth of the back-navigation stack.
const fn default_nav_stack_depth() -> usize {
    32
}

/// Default timeout for a content-generator call, in seconds.
const fn default_elaboration_timeout() -> u64 {
    10
}

/// Main configuration for the teaching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Incorrect attempts allowed per checkpoint before the engine moves on.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Wrong answers within one module at which the next module's content
    /// switches to the simplified variant.
    #[serde(default = "default_wrong_answer_threshold")]
    pub wrong_answer_threshold: u32,

    /// Maximum number of prior positions kept for back-navigation.
    #[serde(default = "default_nav_stack_depth")]
    pub nav_stack_depth: usize,

    /// Bound on a single content-generator call, in seconds.
    #[serde(default = "default_elaboration_timeout")]
    pub elaboration_timeout_secs: u64,

    /// Checkpoint evaluator tuning.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            wrong_answer_threshold: default_wrong_answer_threshold(),
            nav_stack_depth: default_nav_stack_depth(),
            elaboration_timeout_secs: default_elaboration_timeout(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `teachloop.json` in the current directory. If found, loads
    /// and validates the configuration. If not found, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TeachError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `teachloop.json` exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TeachError::ConfigParseError` if the file exists but
    /// contains invalid JSON, and `TeachError::ConfigValidationError` if
    /// the values are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TeachError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TeachError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TeachError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.retry_limit == 0 {
            return Err(TeachError::config_validation(
                "retryLimit must be greater than 0",
                "Set retryLimit to at least 1 in your teachloop.json",
            ));
        }

        if self.wrong_answer_threshold == 0 {
            return Err(TeachError::config_validation(
                "wrongAnswerThreshold must be greater than 0",
                "Set wrongAnswerThreshold to at least 1 in your teachloop.json",
            ));
        }

        if self.nav_stack_depth == 0 {
            return Err(TeachError::config_validation(
                "navStackDepth must be greater than 0",
                "Set navStackDepth to at least 1 in your teachloop.json",
            ));
        }

        if self.elaboration_timeout_secs == 0 {
            return Err(TeachError::config_validation(
                "elaborationTimeoutSecs must be greater than 0",
                "Set elaborationTimeoutSecs to at least 1 second in your teachloop.json",
            ));
        }

        if !(0.0..=1.0).contains(&self.evaluator.pass_threshold)
            || self.evaluator.pass_threshold == 0.0
        {
            return Err(TeachError::config_validation(
                "evaluator.passThreshold must be in (0, 1]",
                "Set evaluator.passThreshold between 0 and 1 in your teachloop.json",
            ));
        }

        if !(0.0..=1.0).contains(&self.evaluator.partial_threshold)
            || self.evaluator.partial_threshold > self.evaluator.pass_threshold
        {
            return Err(TeachError::config_validation(
                "evaluator.partialThreshold must be in [0, 1] and not exceed passThreshold",
                "Set evaluator.partialThreshold below evaluator.passThreshold in your teachloop.json",
            ));
        }

        if self.evaluator.judge_timeout_secs == 0 {
            return Err(TeachError::config_validation(
                "evaluator.judgeTimeoutSecs must be greater than 0",
                "Set evaluator.judgeTimeoutSecs to at least 1 second in your teachloop.json",
            ));
        }

        Ok(())
    }
}
