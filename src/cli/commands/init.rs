use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;

use super::{CommandResult, CommandSummary, InitSummary};
use crate::config::{CONFIG_FILE_NAME, default_config_json};

pub fn init() -> Result<CommandResult> {
    init_in(&std::env::current_dir()?)
}

/// Write the default config into `dir`. Refuses to overwrite an existing
/// file.
fn init_in(dir: &Path) -> Result<CommandResult> {
    let config_path: PathBuf = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!("{} already exists", CONFIG_FILE_NAME);
    }

    fs::write(config_path, default_config_json()?)?;
    Ok(CommandResult {
        summary: CommandSummary::Init(InitSummary { created: true }),
        issues: Vec::new(),
        classes_scanned: 0,
        message_files_loaded: 0,
        failed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_init_writes_parseable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = init_in(dir.path()).unwrap();
        assert!(matches!(
            result.summary,
            CommandSummary::Init(InitSummary { created: true })
        ));
        assert!(!result.failed);

        let content = fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        let config: Config = serde_json::from_str(&content).unwrap();
        assert!(config.fail_on_unused_keys);
        assert_eq!(config.call_methods, vec!["getMessage", "getRaw"]);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let err = init_in(dir.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
