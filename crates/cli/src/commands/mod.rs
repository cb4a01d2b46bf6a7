//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::AppConfig;
use handtrail_cli::error::PipelineError;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load and validate a config file
fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(PipelineError::config_not_found(path).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
