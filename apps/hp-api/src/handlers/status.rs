//! 状态查询 handlers
//!
//! - GET /status
//! - GET /health
//! - GET /registers/raw
//!
//! 只读取 `StatusStore` 中的快照，不触发任何 Modbus 事务。

use crate::AppState;
use crate::utils::response::{raw_to_dto, status_to_dto, status_unavailable};
use api_contract::{ApiError, ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// 当前状态（最近快照叠加写入回显）
pub async fn get_status(State(state): State<AppState>) -> Response {
    let (Some(snapshot), Some(status)) = (state.store.snapshot(), state.store.get_latest()) else {
        return status_unavailable();
    };
    (
        StatusCode::OK,
        Json(ApiResponse::success(status_to_dto(&status, &snapshot))),
    )
        .into_response()
}

/// 保活健康度：快照缺失或超过 stale_after 时返回 503
pub async fn get_health(State(state): State<AppState>) -> Response {
    let connection = state.poller.connection_status();
    let age = state.store.age();
    let healthy = !state.store.is_stale(state.stale_after);
    let dto = HealthDto {
        healthy,
        connection_state: connection.state.as_str().to_string(),
        consecutive_failure_count: connection.consecutive_failure_count,
        last_success_at_ms: connection.last_success_at_ms,
        snapshot_age_ms: age.map(|age| age.as_millis() as u64),
        stale_after_ms: state.stale_after.as_millis() as u64,
        polling: state.poller.is_running(),
        reconnects: state.poller.reconnect_count(),
    };
    if healthy {
        return (StatusCode::OK, Json(ApiResponse::success(dto))).into_response();
    }
    let body = ApiResponse {
        success: false,
        data: Some(dto),
        error: Some(ApiError {
            code: "STATUS.STALE".to_string(),
            message: "status snapshot missing or stale".to_string(),
        }),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

/// 最近一次轮询读到的原始寄存器
pub async fn get_raw_registers(State(state): State<AppState>) -> Response {
    match state.store.snapshot() {
        Some(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::success(raw_to_dto(&snapshot))),
        )
            .into_response(),
        None => status_unavailable(),
    }
}
