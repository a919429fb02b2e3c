//! 控制写入 handlers
//!
//! - POST /power
//! - POST /setpoint
//! - POST /lg-mode
//! - POST /auto-mode-offset
//!
//! 写入经 `ModeController` 走同一条总线互斥与重试路径；
//! 校验失败 400，设备不可达 502。

use crate::AppState;
use crate::utils::response::control_error;
use crate::utils::validation::parse_lg_mode;
use api_contract::{
    ApiResponse, AutoModeOffsetRequest, ControlAckDto, LgModeRequest, PowerRequest,
    SetpointRequest,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::LgMode;
use hp_control::SetpointOutcome;
use serde_json::json;

fn ack(action: &str, value: serde_json::Value, active: bool) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success(ControlAckDto {
            action: action.to_string(),
            value,
            active,
        })),
    )
        .into_response()
}

pub async fn set_power(State(state): State<AppState>, Json(req): Json<PowerRequest>) -> Response {
    match state.controller.set_power(req.on).await {
        Ok(()) => ack("power", json!(req.on), true),
        Err(err) => control_error(err),
    }
}

pub async fn set_setpoint(
    State(state): State<AppState>,
    Json(req): Json<SetpointRequest>,
) -> Response {
    match state.controller.set_target_temperature(req.celsius).await {
        Ok(outcome) => ack(
            "setpoint",
            json!(req.celsius),
            outcome == SetpointOutcome::Applied,
        ),
        Err(err) => control_error(err),
    }
}

pub async fn set_lg_mode(State(state): State<AppState>, Json(req): Json<LgModeRequest>) -> Response {
    let mode = match parse_lg_mode(&req.mode) {
        Ok(mode) => mode,
        Err(response) => return response,
    };
    match state.controller.set_lg_mode(mode).await {
        Ok(()) => ack("lg_mode", json!(mode.as_str()), true),
        Err(err) => control_error(err),
    }
}

/// 偏移只在自动模式下生效，其余模式照常写入但标记为未生效
pub async fn set_auto_mode_offset(
    State(state): State<AppState>,
    Json(req): Json<AutoModeOffsetRequest>,
) -> Response {
    match state.controller.set_auto_mode_offset(req.offset_k).await {
        Ok(()) => {
            let active = state
                .store
                .get_latest()
                .is_some_and(|status| status.lg_mode.mode() == Some(LgMode::Auto));
            ack("auto_mode_offset", json!(req.offset_k), active)
        }
        Err(err) => control_error(err),
    }
}
