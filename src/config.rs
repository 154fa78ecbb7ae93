use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Ok, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".keylintrc.json";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// YAML message files, checked in order; files that do not exist are
    /// skipped as long as at least one loads.
    #[serde(default = "default_messages")]
    pub messages: Vec<String>,
    /// Roots to scan for compiled `.class` files.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default = "default_fail_on_unused_keys")]
    pub fail_on_unused_keys: bool,
    /// Keys reported as used even when never extracted from code.
    #[serde(default = "default_always_used_keys")]
    pub always_used_keys: Vec<String>,
    /// Extra call-site owners (dotted or slashed class names).
    #[serde(default)]
    pub call_owners: Vec<String>,
    /// Method names matched on the extra owners.
    #[serde(default = "default_call_methods")]
    pub call_methods: Vec<String>,
    #[serde(default)]
    pub key_prefix: String,
}

fn default_messages() -> Vec<String> {
    vec![
        "src/main/resources/messages.yml".to_string(),
        "messages.yml".to_string(),
    ]
}

fn default_classes() -> Vec<String> {
    vec!["build/classes".to_string(), "target/classes".to_string()]
}

fn default_fail_on_unused_keys() -> bool {
    true
}

fn default_always_used_keys() -> Vec<String> {
    vec!["prefix".to_string()]
}

fn default_call_methods() -> Vec<String> {
    vec!["getMessage".to_string(), "getRaw".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            messages: default_messages(),
            classes: default_classes(),
            ignores: Vec::new(),
            fail_on_unused_keys: default_fail_on_unused_keys(),
            always_used_keys: default_always_used_keys(),
            call_owners: Vec::new(),
            call_methods: default_call_methods(),
            key_prefix: String::new(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error if any glob pattern in `ignores` is invalid.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }
        Ok(())
    }

    pub fn ignore_patterns(&self) -> Result<Vec<Pattern>> {
        self.ignores
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'ignores': \"{}\"", pattern)
                })
            })
            .collect()
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}
