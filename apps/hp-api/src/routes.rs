//! 路由定义
//!
//! - 状态查询：GET /status, /health, /registers/raw, /metrics
//! - 控制写入：POST /power, /setpoint, /lg-mode, /auto-mode-offset

use crate::AppState;
use crate::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/health", get(get_health))
        .route("/registers/raw", get(get_raw_registers))
        .route("/metrics", get(get_metrics))
        .route("/power", post(set_power))
        .route("/setpoint", post(set_setpoint))
        .route("/lg-mode", post(set_lg_mode))
        .route("/auto-mode-offset", post(set_auto_mode_offset))
}
