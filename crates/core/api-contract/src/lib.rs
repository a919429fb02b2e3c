//! 稳定的 DTO 与 API 响应契约。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 热泵当前状态（最近一次快照叠加写入回显）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub is_on: bool,
    /// `cool` / `heat` / `auto`，未知编码为 `unrecognized(<code>)`
    pub lg_mode: String,
    pub lg_mode_code: u16,
    pub target_temperature: f64,
    /// 设定温度在当前模式下是否生效（自动模式下为 false）
    pub target_temperature_active: bool,
    pub auto_mode_offset: i32,
    pub operating_cycle: String,
    pub control_method: String,
    pub water_pump_running: bool,
    pub compressor_running: bool,
    pub has_error: bool,
    pub error_code: u16,
    pub flow_temp: f64,
    pub return_temp: f64,
    pub temperature_delta: f64,
    pub outdoor_temp: f64,
    pub flow_rate: f64,
    pub water_pressure: f64,
    pub energy_state: u16,
    pub sequence: u64,
    pub captured_at_ms: i64,
}

/// 连接与保活健康度。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub healthy: bool,
    pub connection_state: String,
    pub consecutive_failure_count: u32,
    pub last_success_at_ms: Option<i64>,
    /// 最近一次成功快照的年龄；尚无快照时为 None
    pub snapshot_age_ms: Option<u64>,
    pub stale_after_ms: u64,
    pub polling: bool,
    pub reconnects: u64,
}

/// 原始寄存器转储（地址 → 值）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawRegistersDto {
    pub captured_at_ms: i64,
    pub sequence: u64,
    pub coils: BTreeMap<u16, bool>,
    pub discrete_inputs: BTreeMap<u16, bool>,
    pub input_registers: BTreeMap<u16, u16>,
    pub holding_registers: BTreeMap<u16, u16>,
}

/// 引擎计数器快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub transactions_ok: u64,
    pub attempt_failures: u64,
    pub retries_exhausted: u64,
    pub poll_cycles_ok: u64,
    pub poll_cycles_failed: u64,
    pub reconnects: u64,
    pub writes_ok: u64,
    pub writes_failed: u64,
    pub validation_rejected: u64,
    pub transaction_latency_ms_total: u64,
    pub transaction_latency_ms_count: u64,
}

/// 电源开关请求体。
#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub on: bool,
}

/// 设定温度请求体（°C）。
#[derive(Debug, Deserialize)]
pub struct SetpointRequest {
    pub celsius: f64,
}

/// 运行模式请求体。
#[derive(Debug, Deserialize)]
pub struct LgModeRequest {
    pub mode: String,
}

/// 自动模式偏移请求体（K）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoModeOffsetRequest {
    #[serde(alias = "offset_k")]
    pub offset_k: i32,
}

/// 控制写入结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlAckDto {
    pub action: String,
    pub value: serde_json::Value,
    /// 写入值当前是否被设备采用
    pub active: bool,
}
