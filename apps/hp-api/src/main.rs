//! 热泵控制服务入口：装配 Modbus 会话、轮询循环、控制器与 HTTP 边界层。

use std::sync::Arc;
use std::time::Duration;

use hp_api::{AppState, build_app};
use hp_config::AppConfig;
use hp_control::{ControlConfig, DeviceInit, ModeController, SetpointProfile};
use hp_pipeline::{PollerConfig, PollingLoop};
use hp_protocol::{
    ConnectionManager, ConnectionSettings, ModbusClient, ModbusTcpConfig, RetryExecutor,
    RetryPolicy, TcpConnector,
};
use hp_storage::status_channel;
use hp_telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let connector = TcpConnector::new(ModbusTcpConfig {
        host: config.modbus_host.clone(),
        port: config.modbus_port,
        unit_id: config.modbus_unit_id,
        connect_timeout_ms: config.connect_timeout_ms,
    });
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(connector),
        ConnectionSettings {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        },
    ));
    let retry = RetryExecutor::new(RetryPolicy {
        max_attempts: config.retry_max_attempts,
        backoff: config
            .retry_backoff_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect(),
    });
    let client = ModbusClient::new(connection, retry);

    let (writer, store) = status_channel();
    let poller = PollingLoop::new(
        client.clone(),
        PollerConfig {
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            reconnect_threshold: config.reconnect_threshold,
        },
        writer,
    )?;

    let profile = SetpointProfile::parse(&config.setpoint_profile).unwrap_or_default();
    let controller = ModeController::new(
        client,
        store.clone(),
        ControlConfig {
            profile,
            heat_default_temperature: config.heat_default_temperature,
            device_init: config.device_init.then_some(DeviceInit {
                energy_state: config.device_init_energy_state,
            }),
        },
    )?;

    poller.start();

    let state = AppState {
        poller: poller.clone(),
        store,
        controller,
        stale_after: Duration::from_secs(config.stale_after_seconds),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        target: "hp.api",
        http_addr = %config.http_addr,
        modbus_host = %config.modbus_host,
        modbus_port = config.modbus_port,
        unit_id = config.modbus_unit_id,
        "heat pump service listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP 已停止接收请求；等待当前轮询周期结束并关闭连接
    poller.shutdown().await;
    info!(target: "hp.api", "shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "hp.api", error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!(target: "hp.api", "shutdown signal received");
}
