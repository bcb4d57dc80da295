// Config loading and validation tests

use guardian::config::AppConfig;

const VALID_CONFIG: &str = r#"
[database]
path = "data/guardian.db"
retention_days = 14
cleanup_interval_secs = 600

[monitoring]
sample_interval_ms = 500
stats_log_interval_secs = 30
top_processes = 5

[history]
display_window = 24
stats_window = 60

[anomaly]
min_samples = 30
z_threshold = 3.0
flat_epsilon = 0.01

[alerts]
cooldown_secs = 60
log_capacity = 5

[thresholds]
cpu = { warning = 60, critical = 85 }
ram = { warning = 70, critical = 85 }
disk = { warning = 70, critical = 90 }
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.database.path, "data/guardian.db");
    assert_eq!(config.database.retention_days, 14);
    assert_eq!(config.monitoring.sample_interval_ms, 500);
    assert_eq!(config.monitoring.top_processes, 5);
    assert_eq!(config.thresholds.cpu.warning, 60.0);
    assert_eq!(config.thresholds.disk.critical, 90.0);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.history.display_window, 24);
    assert_eq!(config.history.stats_window, 60);
    assert_eq!(config.anomaly.min_samples, 30);
    assert_eq!(config.anomaly.z_threshold, 3.0);
    assert_eq!(config.alerts.cooldown_secs, 60);
    assert_eq!(config.alerts.log_capacity, 5);
    assert_eq!(config.monitoring.recent_row_limit, 3600);
    assert_eq!(config.monitoring.baseline_min_samples, 10);
    assert!(config.database.vacuum_schedule.is_none());
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[alerts]\ncooldown_secs = 5\n").unwrap();
    assert_eq!(config.alerts.cooldown_secs, 5);
    assert_eq!(config.alerts.log_capacity, 5);
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/guardian.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_sample_interval_zero() {
    let bad = VALID_CONFIG.replace("sample_interval_ms = 500", "sample_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sample_interval_ms"));
}

#[test]
fn test_config_validation_rejects_zero_display_window() {
    let bad = VALID_CONFIG.replace("display_window = 24", "display_window = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("display_window"));
}

#[test]
fn test_config_validation_rejects_stats_window_shorter_than_display() {
    let bad = VALID_CONFIG.replace("stats_window = 60", "stats_window = 12");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stats_window"));
}

#[test]
fn test_config_validation_rejects_min_samples_above_window() {
    let bad = VALID_CONFIG.replace("min_samples = 30", "min_samples = 61");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("min_samples"));
}

#[test]
fn test_config_validation_rejects_non_positive_z_threshold() {
    let bad = VALID_CONFIG.replace("z_threshold = 3.0", "z_threshold = 0.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("z_threshold"));
}

#[test]
fn test_partial_threshold_table_keeps_kind_defaults() {
    let config = AppConfig::load_from_str(
        r#"
[thresholds.cpu]
warning = 50

[thresholds.disk]
critical = 95
"#,
    )
    .expect("partial thresholds");
    assert_eq!(config.thresholds.cpu.warning, 50.0);
    assert_eq!(config.thresholds.cpu.critical, 85.0);
    assert_eq!(config.thresholds.ram.warning, 70.0);
    assert_eq!(config.thresholds.disk.warning, 70.0);
    assert_eq!(config.thresholds.disk.critical, 95.0);
}

#[test]
fn test_config_validation_rejects_inverted_band() {
    let bad = VALID_CONFIG.replace(
        "ram = { warning = 70, critical = 85 }",
        "ram = { warning = 90, critical = 85 }",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("thresholds.ram"));
}

#[test]
fn test_config_validation_rejects_band_above_100() {
    let bad = VALID_CONFIG.replace(
        "disk = { warning = 70, critical = 90 }",
        "disk = { warning = 70, critical = 120 }",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("thresholds.disk"));
}

#[test]
fn test_config_validation_rejects_zero_log_capacity() {
    let bad = VALID_CONFIG.replace("log_capacity = 5", "log_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("log_capacity"));
}

#[test]
fn test_config_accepts_valid_vacuum_schedule() {
    let s = VALID_CONFIG.replace(
        "cleanup_interval_secs = 600",
        "cleanup_interval_secs = 600\nvacuum_schedule = \"0 0 3 * * *\"",
    );
    let config = AppConfig::load_from_str(&s).unwrap();
    assert_eq!(config.database.vacuum_schedule.as_deref(), Some("0 0 3 * * *"));
}

#[test]
fn test_config_validation_rejects_bad_vacuum_schedule() {
    let bad = VALID_CONFIG.replace(
        "cleanup_interval_secs = 600",
        "cleanup_interval_secs = 600\nvacuum_schedule = \"not a cron\"",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("vacuum_schedule"));
}

#[test]
fn test_invalid_toml_is_error() {
    assert!(AppConfig::load_from_str("[database\npath = 1").is_err());
}
