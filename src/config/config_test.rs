use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_bot_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("BOT__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = BotConfig::default();

    assert_eq!(config.etcd.endpoints, vec!["http://localhost:2379".to_string()]);
    assert_eq!(config.watch.metadata_dir, "/etcdbot_meta/");
    assert_eq!(config.watch.lock_ttl_in_secs, 60);
    assert_eq!(config.watch.retry_delay_in_ms, 10_000);
    assert!(!config.slack.dry_run);
    assert!(!config.hook.enabled);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_bot_env_vars();
    with_vars(
        vec![
            ("BOT__WATCH__METADATA_DIR", Some("/custom_meta")),
            ("BOT__SLACK__DRY_RUN", Some("true")),
            (
                "BOT__ETCD__ENDPOINTS",
                Some("http://10.0.0.1:2379,http://10.0.0.2:2379"),
            ),
        ],
        || {
            let config = BotConfig::new().unwrap();

            assert_eq!(config.watch.metadata_dir, "/custom_meta");
            assert!(config.slack.dry_run);
            assert_eq!(
                config.etcd.endpoints,
                vec![
                    "http://10.0.0.1:2379".to_string(),
                    "http://10.0.0.2:2379".to_string()
                ]
            );
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_bot_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");

    std::fs::write(
        &config_path,
        r#"
        [watch]
        watch_base = "/public"
        lock_ttl_in_secs = 30

        [slack]
        incoming_webhook_urls = ["https://hooks.example.com/a"]

        [hook]
        enabled = true
        port = 9000
        trigger_word = "bot"
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = BotConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should load");

        assert_eq!(config.watch.watch_base, "/public");
        assert_eq!(config.watch.lock_ttl_in_secs, 30);
        assert_eq!(config.watch.metadata_dir, "/etcdbot_meta/");
        assert_eq!(config.slack.incoming_webhook_urls.len(), 1);
        assert!(config.hook.enabled);
        assert_eq!(config.hook.port, 9000);
        assert_eq!(config.hook.trigger_word, "bot");
        assert!(config.validate().is_ok());
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_bot_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("bot.toml");
    std::fs::write(
        &config_path,
        r#"
        [watch]
        retry_delay_in_ms = 500
        instance_id = "from-file"
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("BOT__WATCH__INSTANCE_ID", Some("from-env")),
        ],
        || {
            let config = BotConfig::new().unwrap();

            assert_eq!(config.watch.retry_delay_in_ms, 500);
            assert_eq!(config.watch.instance_id, "from-env");
        },
    );
}

#[test]
fn validation_should_reject_empty_endpoints() {
    let mut config = BotConfig::default();
    config.etcd.endpoints.clear();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_endpoint_without_scheme() {
    let mut config = BotConfig::default();
    config.etcd.endpoints = vec!["localhost:2379".to_string()];

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_invalid_metadata_dir() {
    let mut config = BotConfig::default();
    config.watch.metadata_dir = "meta data".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_lock_ttl() {
    let mut config = BotConfig::default();
    config.watch.lock_ttl_in_secs = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_retry_delay() {
    let mut config = BotConfig::default();
    config.watch.retry_delay_in_ms = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_require_trigger_word_when_hook_enabled() {
    let mut config = BotConfig::default();
    config.hook.enabled = true;
    config.hook.trigger_word = "  ".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn instance_id_should_be_generated_when_unset() {
    let config = WatchConfig::default();
    let a = config.resolve_instance_id();
    let b = config.resolve_instance_id();

    assert!(a.starts_with("watchbot-"));
    assert_ne!(a, b);

    let fixed = WatchConfig {
        instance_id: "node-1".to_string(),
        ..Default::default()
    };
    assert_eq!(fixed.resolve_instance_id(), "node-1");
}
