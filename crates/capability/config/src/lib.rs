//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub http_addr: String,
    pub modbus_host: String,
    pub modbus_port: u16,
    pub modbus_unit_id: u8,
    pub poll_interval_seconds: u64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub inter_request_delay_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_backoff_ms: Vec<u64>,
    pub reconnect_threshold: u32,
    pub reconnect_delay_ms: u64,
    /// `generic` 或 `manual_heating`
    pub setpoint_profile: String,
    pub heat_default_temperature: f64,
    pub device_init: bool,
    pub device_init_energy_state: u16,
    pub stale_after_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let modbus_host = read_optional("HP_MODBUS_HOST")
            .ok_or_else(|| ConfigError::Missing("HP_MODBUS_HOST".to_string()))?;
        let http_addr = env::var("HP_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let modbus_port = read_u16_with_default("HP_MODBUS_PORT", 502)?;
        let modbus_unit_id = read_u8_with_default("HP_MODBUS_UNIT_ID", 1)?;
        let poll_interval_seconds = read_u64_with_default("HP_POLL_INTERVAL_SECONDS", 10)?;
        let request_timeout_ms = read_u64_with_default("HP_REQUEST_TIMEOUT_MS", 5000)?;
        let connect_timeout_ms = read_u64_with_default("HP_CONNECT_TIMEOUT_MS", 5000)?;
        let inter_request_delay_ms = read_u64_with_default("HP_INTER_REQUEST_DELAY_MS", 200)?;
        let retry_max_attempts = read_u32_with_default("HP_RETRY_MAX_ATTEMPTS", 3)?;
        if retry_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "HP_RETRY_MAX_ATTEMPTS".to_string(),
                "0".to_string(),
            ));
        }
        let retry_backoff_ms = read_u64_list_with_default("HP_RETRY_BACKOFF_MS", &[2000, 4000, 6000])?;
        let reconnect_threshold = read_u32_with_default("HP_RECONNECT_THRESHOLD", 5)?;
        let reconnect_delay_ms = read_u64_with_default("HP_RECONNECT_DELAY_MS", 2000)?;
        let setpoint_profile = read_profile("HP_SETPOINT_PROFILE")?;
        let heat_default_temperature = read_f64_with_default("HP_HEAT_DEFAULT_TEMPERATURE", 40.0)?;
        let device_init = read_bool_with_default("HP_DEVICE_INIT", false)?;
        let device_init_energy_state = read_u16_with_default("HP_DEVICE_INIT_ENERGY_STATE", 5)?;
        let stale_after_seconds = read_u64_with_default("HP_STALE_AFTER_SECONDS", 30)?;

        Ok(Self {
            http_addr,
            modbus_host,
            modbus_port,
            modbus_unit_id,
            poll_interval_seconds,
            request_timeout_ms,
            connect_timeout_ms,
            inter_request_delay_ms,
            retry_max_attempts,
            retry_backoff_ms,
            reconnect_threshold,
            reconnect_delay_ms,
            setpoint_profile,
            heat_default_temperature,
            device_init,
            device_init_energy_state,
            stale_after_seconds,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_f64_with_default(key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

/// 逗号分隔的毫秒列表，例如 `2000,4000,6000` 或 `250,500`。
fn read_u64_list_with_default(key: &str, default: &[u64]) -> Result<Vec<u64>, ConfigError> {
    let value = match read_optional(key) {
        Some(value) => value,
        None => return Ok(default.to_vec()),
    };
    value
        .split(',')
        .map(|item| item.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_profile(key: &str) -> Result<String, ConfigError> {
    let value = match read_optional(key) {
        Some(value) => value.to_ascii_lowercase(),
        None => return Ok("generic".to_string()),
    };
    match value.as_str() {
        "generic" | "manual_heating" => Ok(value),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}
