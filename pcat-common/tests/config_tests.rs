//! Tests for config file resolution and access token priority
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate PCAT_CONFIG or PCAT_ACCESS_TOKEN are marked with #[serial].

use pcat_common::config::{
    resolve_access_token, ConfigResolver, TomlConfig, ACCESS_TOKEN_ENV_VAR, CONFIG_ENV_VAR,
};
use pcat_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.server_url, "http://localhost:5000");
    assert!(config.access_token.is_none());
}

#[test]
fn test_unreadable_path_falls_back_to_defaults() {
    // A directory exists but cannot be read as a file
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(dir.path()).unwrap();
    assert_eq!(config.server_url, "http://localhost:5000");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.ingest.snapshot_capacity, 256);
}

#[test]
fn test_unparseable_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bad.toml", "server_url = [");
    assert!(matches!(TomlConfig::load(&path), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "server_url = \"http://cli\"");
    let from_env = write_config(&dir, "env.toml", "server_url = \"http://env\"");
    env::set_var(CONFIG_ENV_VAR, &from_env);

    let resolver = ConfigResolver::new("pcat");
    assert_eq!(resolver.resolve(Some(&cli)), Some(cli.clone()));
    let config = resolver.load(Some(&cli)).unwrap();
    assert_eq!(config.server_url, "http://cli");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let dir = TempDir::new().unwrap();
    let from_env = write_config(&dir, "env.toml", "server_url = \"http://env\"");
    env::set_var(CONFIG_ENV_VAR, &from_env);

    let config = ConfigResolver::new("pcat").load(None).unwrap();
    assert_eq!(config.server_url, "http://env");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_token_priority_cli_env_toml() {
    let toml = TomlConfig::from_toml_str("access_token = \"from-toml\"").unwrap();

    env::set_var(ACCESS_TOKEN_ENV_VAR, "from-env");
    assert_eq!(
        resolve_access_token(Some("from-cli"), &toml).as_deref(),
        Some("from-cli")
    );
    assert_eq!(resolve_access_token(None, &toml).as_deref(), Some("from-env"));

    env::remove_var(ACCESS_TOKEN_ENV_VAR);
    assert_eq!(resolve_access_token(None, &toml).as_deref(), Some("from-toml"));
}

#[test]
#[serial]
fn test_blank_tokens_are_ignored() {
    env::set_var(ACCESS_TOKEN_ENV_VAR, "   ");
    let toml = TomlConfig::default();

    assert_eq!(resolve_access_token(Some(""), &toml), None);

    env::remove_var(ACCESS_TOKEN_ENV_VAR);
}
