//! Integration tests for settle-config

use settle_config::*;
use std::io::Write;
use temp_env::with_vars;

#[test]
fn test_default_settings_validation() {
    let config = SettleConfig::default();
    assert!(config.validate_all().is_ok());
    assert_eq!(config.limits.max_aliases, 50);
    assert_eq!(config.limits.code_point_limit(), 3 * 1024 * 1024);
    assert_eq!(config.merge.strategy, "default");
}

#[test]
fn test_loader_from_env() {
    let vars = vec![
        ("SETTLE_YAML_MAX_ALIASES", Some("10")),
        ("SETTLE_YAML_CODE_POINT_LIMIT", Some("1")),
        ("SETTLE_MERGE_STRATEGY", Some(" errorOnConflict ")),
        ("SETTLE_CONFIG", Some("/etc/settle/a.yaml, /etc/settle/conf.d")),
        ("SETTLE_LOG_LEVEL", Some("debug")),
        ("SECRETS", Some("/var/secrets")),
    ];

    with_vars(vars, || {
        let config = SettingsLoader::new().from_env().unwrap();

        assert_eq!(config.limits.max_aliases, 10);
        assert_eq!(config.limits.code_point_limit(), 1024 * 1024);
        assert_eq!(config.merge.strategy, "errorOnConflict");
        assert_eq!(
            config.sources.paths,
            vec!["/etc/settle/a.yaml".to_string(), "/etc/settle/conf.d".to_string()]
        );
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.secrets.directory, std::path::PathBuf::from("/var/secrets"));
    });
}

#[test]
fn test_invalid_limit_keeps_default() {
    with_vars(vec![("SETTLE_YAML_MAX_ALIASES", Some("lots"))], || {
        let config = SettingsLoader::new().from_env().unwrap();
        assert_eq!(config.limits.max_aliases, 50);
    });
}

#[test]
fn test_blank_merge_strategy_ignored() {
    with_vars(vec![("SETTLE_MERGE_STRATEGY", Some("   "))], || {
        let config = SettingsLoader::new().from_env().unwrap();
        assert_eq!(config.merge.strategy, "default");
    });
}

#[test]
fn test_invalid_log_level_is_an_error() {
    with_vars(vec![("SETTLE_LOG_LEVEL", Some("loud"))], || {
        let result = SettingsLoader::new().from_env();
        assert!(matches!(result, Err(SettingsError::EnvError(_))));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("CASC_MERGE_STRATEGY", Some("custom"))], || {
        let config = SettingsLoader::with_prefix("CASC").from_env().unwrap();
        assert_eq!(config.merge.strategy, "custom");
    });
}

#[test]
fn test_settings_file() {
    let yaml = r#"
limits:
  max_aliases: 5
  code_point_limit_mib: 2
merge:
  strategy: errorOnConflict
policy:
  unknown: warn
  restricted: beta
secrets:
  directory: /opt/secrets
  environment: false
logging:
  level: warn
  format: json
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(
        vec![
            ("SETTLE_MERGE_STRATEGY", None::<&str>),
            ("SECRETS", None),
            ("SETTLE_CONFIG", None),
            ("SETTLE_LOG_LEVEL", None),
            ("SETTLE_LOG_FORMAT", None),
            ("SETTLE_YAML_MAX_ALIASES", None),
            ("SETTLE_YAML_CODE_POINT_LIMIT", None),
        ],
        || {
            let config = SettingsLoader::new().from_file(file.path()).unwrap();
            assert_eq!(config.limits.max_aliases, 5);
            assert_eq!(config.merge.strategy, "errorOnConflict");
            assert_eq!(config.policy.unknown, Unknown::Warn);
            assert_eq!(config.policy.restricted, Restriction::Beta);
            assert_eq!(config.policy.deprecated, Deprecation::Reject);
            assert!(!config.secrets.environment);
            assert_eq!(config.logging.format, LogFormat::Json);
        },
    );
}

#[test]
fn test_sample_round_trips() {
    let sample = SettleConfig::generate_sample();
    let parsed: SettleConfig = serde_yaml::from_str(&sample).unwrap();
    assert_eq!(parsed, SettleConfig::default());
}

#[test]
fn test_partial_secrets_section_keeps_defaults() {
    let config: SettleConfig = serde_yaml::from_str("secrets:\n  directory: /opt/secrets\n").unwrap();
    assert!(config.secrets.environment);
    assert_eq!(config.secrets.directory, std::path::PathBuf::from("/opt/secrets"));
}
