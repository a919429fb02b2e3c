//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, modbus_error, status_unavailable, control_error
//! - DTO 转换：status_to_dto, raw_to_dto, metrics_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码一一对应。

use api_contract::{ApiResponse, MetricsSnapshotDto, RawRegistersDto, StatusDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DecodedStatus, ModeSetting};
use hp_control::ControlError;
use hp_storage::StatusSnapshot;
use hp_telemetry::MetricsSnapshot;

/// 参数校验失败（400）
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 与设备通信失败（502）
pub fn modbus_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiResponse::<()>::error("MODBUS.UNAVAILABLE", message.into())),
    )
        .into_response()
}

/// 尚未完成任何成功轮询（503）
pub fn status_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error(
            "STATUS.UNAVAILABLE",
            "no status snapshot yet",
        )),
    )
        .into_response()
}

pub fn control_error(err: ControlError) -> Response {
    match err {
        ControlError::Validation(message) => bad_request_error(message),
        ControlError::Modbus(err) => modbus_error(err.to_string()),
    }
}

fn mode_label(setting: &ModeSetting) -> String {
    match setting.mode() {
        Some(mode) => mode.as_str().to_string(),
        None => format!("unrecognized({})", setting.code()),
    }
}

/// DecodedStatus（已叠加写入回显）转 StatusDto，序号与采集时间取自原始快照。
pub fn status_to_dto(status: &DecodedStatus, snapshot: &StatusSnapshot) -> StatusDto {
    StatusDto {
        is_on: status.is_on,
        lg_mode: mode_label(&status.lg_mode),
        lg_mode_code: status.lg_mode.code(),
        target_temperature: status.target_temperature,
        target_temperature_active: status.lg_mode.target_temperature_is_live(),
        auto_mode_offset: status.auto_mode_offset,
        operating_cycle: status.operating_cycle.label(),
        control_method: status.control_method.label(),
        water_pump_running: status.water_pump_running,
        compressor_running: status.compressor_running,
        has_error: status.has_error,
        error_code: status.error_code,
        flow_temp: status.flow_temp,
        return_temp: status.return_temp,
        temperature_delta: status.temperature_delta(),
        outdoor_temp: status.outdoor_temp,
        flow_rate: status.flow_rate,
        water_pressure: status.water_pressure,
        energy_state: status.energy_state,
        sequence: snapshot.sequence,
        captured_at_ms: snapshot.raw.captured_at_ms,
    }
}

pub fn raw_to_dto(snapshot: &StatusSnapshot) -> RawRegistersDto {
    RawRegistersDto {
        captured_at_ms: snapshot.raw.captured_at_ms,
        sequence: snapshot.sequence,
        coils: snapshot.raw.coils.clone(),
        discrete_inputs: snapshot.raw.discrete_inputs.clone(),
        input_registers: snapshot.raw.input_registers.clone(),
        holding_registers: snapshot.raw.holding_registers.clone(),
    }
}

pub fn metrics_to_dto(snapshot: MetricsSnapshot) -> MetricsSnapshotDto {
    MetricsSnapshotDto {
        transactions_ok: snapshot.transactions_ok,
        attempt_failures: snapshot.attempt_failures,
        retries_exhausted: snapshot.retries_exhausted,
        poll_cycles_ok: snapshot.poll_cycles_ok,
        poll_cycles_failed: snapshot.poll_cycles_failed,
        reconnects: snapshot.reconnects,
        writes_ok: snapshot.writes_ok,
        writes_failed: snapshot.writes_failed,
        validation_rejected: snapshot.validation_rejected,
        transaction_latency_ms_total: snapshot.transaction_latency_ms_total,
        transaction_latency_ms_count: snapshot.transaction_latency_ms_count,
    }
}
