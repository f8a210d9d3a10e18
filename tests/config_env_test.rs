use std::env;
use std::path::PathBuf;

use tempfile::TempDir;
use treewatch::{EventKinds, Settings};

// Single test: environment variables are process-wide and tests run in parallel.
#[test]
fn test_env_overrides_file_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
version = 1

[watch]
root = "/from/file"
recursive = true
events = ["create", "delete", "modify"]

[logging]
default = "info"
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("TREEWATCH_WATCH__RECURSIVE", "false");
        env::set_var("TREEWATCH_FILTER__IGNORE_HIDDEN", "false");
        env::set_var("TREEWATCH_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load_from(&config_path);

    unsafe {
        env::remove_var("TREEWATCH_WATCH__RECURSIVE");
        env::remove_var("TREEWATCH_FILTER__IGNORE_HIDDEN");
        env::remove_var("TREEWATCH_LOGGING__DEFAULT");
    }

    let settings = settings.unwrap();
    assert!(!settings.watch.recursive, "env should override the file");
    assert!(!settings.filter.ignore_hidden, "env should override the default");
    assert_eq!(settings.logging.default, "debug");

    // Values only present in the file survive
    assert_eq!(settings.watch.root, Some(PathBuf::from("/from/file")));
    assert_eq!(settings.event_kinds(), EventKinds::all());
}
