use std::fs;

use taskpad::config::{Config, CONFIG_FILE};
use taskpad::{Filter, SortBy, SortOrder, UndoPolicy};

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path());

    assert_eq!(config, Config::default());
    assert_eq!(config.storage.key, "todo-app-tasks");
    assert_eq!(config.undo.policy, UndoPolicy::Clear);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[storage]
dir = "/tmp/taskpad-data"
key = "work-tasks"

[view]
filter = "pending"
sort_by = "status"
sort_order = "desc"

[undo]
policy = "chain"
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path());
    assert_eq!(
        config.storage.resolved_dir(),
        std::path::PathBuf::from("/tmp/taskpad-data")
    );
    assert_eq!(config.storage.key, "work-tasks");
    assert_eq!(config.view.filter, Filter::Pending);
    assert_eq!(config.view.sort_by, SortBy::Status);
    assert_eq!(config.view.sort_order, SortOrder::Desc);
    assert_eq!(config.undo.policy, UndoPolicy::Chain);
    Ok(())
}

#[test]
fn invalid_config_is_rejected_by_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);

    fs::write(&path, "[view]\nfilter = \"someday\"\n")?;
    assert!(Config::load(&path).is_err());

    fs::write(&path, "[storage]\nkey = \"../escape\"\n")?;
    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    // Directory loading falls back to defaults instead.
    assert_eq!(Config::load_from_dir(dir.path()), Config::default());
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);

    let mut config = Config::default();
    config.view.sort_order = SortOrder::Desc;
    config.undo.policy = UndoPolicy::Chain;
    config.save(&path)?;

    assert_eq!(Config::load(&path)?, config);
    Ok(())
}
