use super::settings::Settings;
use super::{PartialSettings, load_config};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 1883);
    assert_eq!(settings.broker.max_connections, 1000);
    assert_eq!(settings.broker.read_timeout_secs, 300);
    assert!(!settings.broker.allow_duplicate_subscriptions);
    assert!(!settings.broker.close_on_malformed);
    assert_eq!(settings.broker.max_packet_size, 268_435_460);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn test_empty_partial_keeps_defaults() {
    let partial = PartialSettings {
        server: None,
        broker: None,
        log: None,
    };
    assert_eq!(partial.merge(Settings::default()), Settings::default());
}

/// Runs `f` with a fresh temporary directory as the current directory.
fn in_temp_dir(f: impl FnOnce(&TempDir)) {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");
    f(&tmp);
    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
#[serial]
fn test_load_config_without_sources_uses_defaults() {
    in_temp_dir(|_| {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg, Settings::default());
    });
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    in_temp_dir(|_| {
        fs::create_dir_all("config").expect("create config dir");
        let toml = r#"
            [server]
            port = 9000

            [broker]
            max_connections = 10
            allow_duplicate_subscriptions = true
        "#;
        fs::write("config/default.toml", toml).expect("write config file");

        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.broker.max_connections, 10);
        assert!(cfg.broker.allow_duplicate_subscriptions);
        assert_eq!(cfg.broker.read_timeout_secs, 300);
        assert_eq!(cfg.log.level, "info");
    });
}

#[test]
#[serial]
fn test_load_config_from_environment() {
    in_temp_dir(|_| {
        temp_env::with_vars(
            [
                ("POPMQ_SERVER__HOST", Some("127.0.0.1")),
                ("POPMQ_SERVER__PORT", Some("1884")),
                ("POPMQ_BROKER__READ_TIMEOUT_SECS", Some("0")),
                ("POPMQ_BROKER__CLOSE_ON_MALFORMED", Some("true")),
                ("POPMQ_BROKER__MAX_PACKET_SIZE", Some("65536")),
                ("POPMQ_LOG__LEVEL", Some("debug")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.server.host, "127.0.0.1");
                assert_eq!(cfg.server.port, 1884);
                assert_eq!(cfg.broker.read_timeout_secs, 0);
                assert!(cfg.broker.close_on_malformed);
                assert_eq!(cfg.broker.max_packet_size, 65536);
                assert_eq!(cfg.broker.max_connections, 1000);
                assert_eq!(cfg.log.level, "debug");
            },
        );
    });
}
