use std::path::PathBuf;

use anyhow::Result;

use super::super::args::CommonArgs;
use crate::config::{Config, load_config};
use crate::extract::ExtractorConfig;
use crate::scanner::{ScanOutcome, scan_classes};

/// Load the config from the working directory and apply CLI overrides.
pub fn resolved_config(common: &CommonArgs) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd)?.config;

    if !common.messages.is_empty() {
        config.messages = common
            .messages
            .iter()
            .map(|p| p.display().to_string())
            .collect();
    }
    if !common.classes.is_empty() {
        config.classes = common
            .classes
            .iter()
            .map(|p| p.display().to_string())
            .collect();
    }
    if let Some(prefix) = &common.key_prefix {
        config.key_prefix = prefix.clone();
    }
    if common.strict {
        config.fail_on_unused_keys = true;
    }
    if common.lenient {
        config.fail_on_unused_keys = false;
    }

    Ok(config)
}

/// Run the class scan described by the config.
pub fn scan(config: &Config) -> Result<ScanOutcome> {
    let ignores = config.ignore_patterns()?;
    let roots: Vec<PathBuf> = config.classes.iter().map(PathBuf::from).collect();
    let extractor = ExtractorConfig::new(
        config.key_prefix.clone(),
        &config.call_owners,
        &config.call_methods,
    );
    Ok(scan_classes(&roots, &ignores, &extractor))
}
