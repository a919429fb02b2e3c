//! 热泵控制服务的 HTTP 边界层。
//!
//! 只做参数解析与错误映射，所有状态读取与写入都委托给
//! `StatusStore` / `ModeController` / `PollingLoop`。

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use std::time::Duration;

use axum::Router;
use hp_control::ModeController;
use hp_pipeline::PollingLoop;
use hp_storage::StatusStore;
use tower_http::trace::TraceLayer;

/// 各 handler 共享的运行时句柄。
#[derive(Clone)]
pub struct AppState {
    pub poller: PollingLoop,
    pub store: StatusStore,
    pub controller: ModeController,
    /// 快照年龄超过该值时 /health 返回 503
    pub stale_after: Duration,
}

/// 组装完整的应用路由（含请求上下文与 trace 中间件）。
pub fn build_app(state: AppState) -> Router {
    routes::create_api_router()
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_context))
        .layer(TraceLayer::new_for_http())
}
