use crate::common::{
    DEFAULT_EXIFTOOL_PROGRAM, DEFAULT_SETTLE_DELAY, DEFAULT_STORAGE_PATH, DEFAULT_TOOL_TIMEOUT,
};
use anyhow::{Context, Result};
use dotenv::dotenv;
use log::info;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

pub const ENV_PREFIX: &str = "EXIF_NODE_";

/// Runtime settings of the node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// Working directory for staged files
    pub storage_path: PathBuf,
    /// exiftool executable, looked up in PATH unless absolute
    pub exiftool_path: PathBuf,
    /// Pause after each single-tag write before the next one starts
    pub settle_delay_ms: u64,
    /// Upper bound for one exiftool invocation
    pub tool_timeout_secs: u64,
    /// Record failed items and keep going instead of aborting the batch
    pub continue_on_fail: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            exiftool_path: PathBuf::from(DEFAULT_EXIFTOOL_PROGRAM),
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
            continue_on_fail: false,
        }
    }
}

impl NodeConfig {
    /// Read `.env` if present, then `EXIF_NODE_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut config = envy::prefixed(ENV_PREFIX)
            .from_env::<NodeConfig>()
            .context("failed to read EXIF_NODE_* environment variables")?;
        config.storage_path = config.storage_path.clean();
        info!("Using storage path {:?}", config.storage_path);
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
