//! Environment-variable layering for `PieConfig::load`.
//!
//! Every test here touches the process environment, so they run serially.

use pie_cli::config::{ConfigOverrides, PieConfig, CONFIG_FILE};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

struct EnvGuard(&'static str);

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        env::set_var(key, value);
        Self(key)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        env::remove_var(self.0);
    }
}

fn workspace(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILE), config).unwrap();
    temp
}

#[test]
#[serial]
fn test_env_port_overrides_file() {
    let temp = workspace(r#"{ "port": 4321 }"#);
    let _port = EnvGuard::set("PIE_PORT", "4555");

    let config = PieConfig::load(&ConfigOverrides {
        dir: Some(temp.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 4555);
}

#[test]
#[serial]
fn test_cli_port_overrides_env() {
    let temp = workspace(r#"{ "port": 4321 }"#);
    let _port = EnvGuard::set("PIE_PORT", "4555");

    let config = PieConfig::load(&ConfigOverrides {
        dir: Some(temp.path().to_path_buf()),
        port: Some(5050),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 5050);
}

#[test]
#[serial]
fn test_invalid_env_port_is_a_config_error() {
    let temp = workspace("{}");
    let _port = EnvGuard::set("PIE_PORT", "ninety");

    let err = PieConfig::load(&ConfigOverrides {
        dir: Some(temp.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap_err();

    assert!(err.to_string().contains("configuration"));
}

#[test]
#[serial]
fn test_file_values_survive_without_env() {
    let temp = workspace(r#"{ "port": 4321, "pies": [{ "name": "a", "path": "pies/a" }] }"#);

    let config = PieConfig::load(&ConfigOverrides {
        dir: Some(temp.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 4321);
    assert_eq!(config.pies.len(), 1);
    assert!(config.validate_for_build().is_ok());
}
