use hp_config::{AppConfig, ConfigError};

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::remove_var("HP_MODBUS_HOST");
    }
    let err = AppConfig::from_env().expect_err("missing host");
    assert!(matches!(err, ConfigError::Missing(key) if key == "HP_MODBUS_HOST"));

    unsafe {
        std::env::set_var("HP_MODBUS_HOST", "192.168.1.50");
    }
    let config = AppConfig::from_env().expect("defaults");
    assert_eq!(config.http_addr, "127.0.0.1:8080");
    assert_eq!(config.modbus_port, 502);
    assert_eq!(config.modbus_unit_id, 1);
    assert_eq!(config.poll_interval_seconds, 10);
    assert_eq!(config.retry_max_attempts, 3);
    assert_eq!(config.retry_backoff_ms, vec![2000, 4000, 6000]);
    assert_eq!(config.reconnect_threshold, 5);
    assert_eq!(config.setpoint_profile, "generic");
    assert_eq!(config.heat_default_temperature, 40.0);
    assert!(!config.device_init);
    assert_eq!(config.stale_after_seconds, 30);

    unsafe {
        std::env::set_var("HP_HTTP_ADDR", "0.0.0.0:8081");
        std::env::set_var("HP_MODBUS_UNIT_ID", "7");
        std::env::set_var("HP_RETRY_BACKOFF_MS", "250, 500");
        std::env::set_var("HP_SETPOINT_PROFILE", "Manual_Heating");
        std::env::set_var("HP_DEVICE_INIT", "on");
    }
    let config = AppConfig::from_env().expect("overrides");
    assert_eq!(config.http_addr, "0.0.0.0:8081");
    assert_eq!(config.modbus_unit_id, 7);
    assert_eq!(config.retry_backoff_ms, vec![250, 500]);
    assert_eq!(config.setpoint_profile, "manual_heating");
    assert!(config.device_init);
}
