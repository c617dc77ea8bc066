//! Configuration resolution priority
//!
//! These tests mutate process environment variables, so they run serially.

use dayside_common::config::{
    resolve, ConfigOverrides, ENV_STORE_KEY, ENV_STORE_URL, ENV_TASK_API_URL,
};
use dayside_common::Error;
use serial_test::serial;

fn clear_env() {
    std::env::remove_var(ENV_STORE_URL);
    std::env::remove_var(ENV_STORE_KEY);
    std::env::remove_var(ENV_TASK_API_URL);
}

#[test]
#[serial]
fn explicit_override_wins_over_environment() {
    clear_env();
    std::env::set_var(ENV_STORE_URL, "https://env.example.com");
    std::env::set_var(ENV_STORE_KEY, "env-key");

    let overrides = ConfigOverrides {
        store_url: Some("https://explicit.example.com".to_string()),
        ..Default::default()
    };
    let config = resolve(&overrides).unwrap();

    assert_eq!(config.store_url, "https://explicit.example.com");
    assert_eq!(config.store_key, "env-key");
    clear_env();
}

#[test]
#[serial]
fn environment_supplies_missing_settings() {
    clear_env();
    std::env::set_var(ENV_STORE_URL, "https://env.example.com");
    std::env::set_var(ENV_STORE_KEY, "env-key");
    std::env::set_var(ENV_TASK_API_URL, "https://tasks.example.com");

    let config = resolve(&ConfigOverrides::default()).unwrap();

    assert_eq!(config.store_url, "https://env.example.com");
    assert_eq!(config.task_api_url.as_deref(), Some("https://tasks.example.com"));
    clear_env();
}

#[test]
#[serial]
fn empty_environment_value_is_ignored() {
    clear_env();
    std::env::set_var(ENV_STORE_URL, "");
    std::env::set_var(ENV_STORE_KEY, "env-key");

    let overrides = ConfigOverrides {
        store_url: Some("https://explicit.example.com".to_string()),
        ..Default::default()
    };
    let config = resolve(&overrides).unwrap();
    assert_eq!(config.store_url, "https://explicit.example.com");

    // With no override either, the empty variable does not count as set.
    let err = resolve(&ConfigOverrides {
        store_key: Some("k".to_string()),
        ..Default::default()
    });
    assert!(matches!(err, Err(Error::Config(_))));
    clear_env();
}

#[test]
#[serial]
fn missing_required_setting_is_a_config_error() {
    clear_env();
    let err = resolve(&ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    // Task API URL is optional: resolution succeeds without it.
    let config = resolve(&ConfigOverrides {
        store_url: Some("https://explicit.example.com".to_string()),
        store_key: Some("k".to_string()),
        task_api_url: None,
    })
    .unwrap();
    assert!(config.task_api_url.is_none());
}
