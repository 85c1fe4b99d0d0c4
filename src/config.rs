use std::path::PathBuf;

use clap::Args;

use crate::error::StorageError;
use crate::metadata::{PKG_NAME, STORE_KEY};
use crate::scoring::CompletionPolicy;
use crate::types::{DEFAULT_BASE_TARGET, DEFAULT_TOTAL_DAYS};

/// Rules the goal engine applies on every mutation.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Complete the active goal automatically once its completion reaches 100%
    #[arg(long, env = "YOH_AUTO_COMPLETE", default_value_t = false)]
    pub auto_complete: bool,

    /// How daily progress is aggregated into goal completion
    #[arg(long, env = "YOH_COMPLETION_POLICY", value_enum, default_value_t = CompletionPolicy::Average)]
    pub completion_policy: CompletionPolicy,

    /// Duration used when a goal is created without one
    #[arg(long, env = "YOH_DEFAULT_TOTAL_DAYS", default_value_t = DEFAULT_TOTAL_DAYS)]
    pub default_total_days: u32,

    /// Nominal daily target used by the quick settle entry
    #[arg(long, env = "YOH_DEFAULT_BASE_TARGET", default_value_t = DEFAULT_BASE_TARGET)]
    pub default_base_target: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_complete: false,
            completion_policy: CompletionPolicy::Average,
            default_total_days: DEFAULT_TOTAL_DAYS,
            default_base_target: DEFAULT_BASE_TARGET,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_total_days == 0 {
            return Err("YOH_DEFAULT_TOTAL_DAYS must be at least 1".to_string());
        }
        if !self.default_base_target.is_finite() || self.default_base_target <= 0.0 {
            return Err(format!(
                "YOH_DEFAULT_BASE_TARGET must be a positive number, got {}",
                self.default_base_target
            ));
        }
        Ok(())
    }
}

/// Where the store file lives.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Directory holding the persisted store
    #[arg(long, env = "YOH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl StorageArgs {
    pub fn store_path(&self) -> Result<PathBuf, StorageError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(dir.join(format!("{STORE_KEY}.json")))
    }
}

fn default_data_dir() -> Result<PathBuf, StorageError> {
    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(PKG_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(format!(".{PKG_NAME}")))
        .ok_or(StorageError::NoDataDir)
}
