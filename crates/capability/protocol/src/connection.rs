//! 网关会话管理
//!
//! `ConnectionManager` 持有唯一的 Modbus 会话。所有事务经过同一把异步互斥锁，
//! 轮询与写入不会在帧级别交错；相邻事务之间强制最小间隔，避免与共享 RS-485
//! 总线上的其他设备冲突。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use domain::{ConnectionState, now_epoch_ms};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{info, warn};

use crate::error::ProtocolError;
use crate::transport::{ModbusTransport, Request, Response, TransportConnector};

/// 会话参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// 单个事务超时
    pub request_timeout: Duration,
    /// 相邻事务最小间隔
    pub inter_request_delay: Duration,
    /// reconnect 中断开与重连之间的等待
    pub reconnect_delay: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            inter_request_delay: Duration::from_millis(200),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

struct Session {
    transport: Option<Box<dyn ModbusTransport>>,
    last_request_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct Health {
    state: ConnectionState,
    last_success_at: Option<Instant>,
    last_success_ms: Option<i64>,
}

/// 单会话连接管理器。
pub struct ConnectionManager {
    connector: Arc<dyn TransportConnector>,
    settings: ConnectionSettings,
    session: Mutex<Session>,
    health: RwLock<Health>,
    reconnects: AtomicU64,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn TransportConnector>, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
            session: Mutex::new(Session {
                transport: None,
                last_request_at: None,
            }),
            health: RwLock::new(Health {
                state: ConnectionState::Disconnected,
                last_success_at: None,
                last_success_ms: None,
            }),
            reconnects: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// 建立会话；已连接时直接返回。
    pub async fn connect(&self) -> Result<(), ProtocolError> {
        let mut session = self.session.lock().await;
        if session.transport.is_some() {
            return Ok(());
        }
        self.open(&mut session).await
    }

    /// 关闭会话；未连接时无操作。
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        self.close(&mut session).await;
    }

    /// 断开后等待固定延迟再重新连接。
    pub async fn reconnect(&self) -> Result<(), ProtocolError> {
        let count = self.reconnects.fetch_add(1, Ordering::Relaxed) + 1;
        hp_telemetry::record_reconnect();
        info!(
            target: "hp.protocol",
            endpoint = %self.connector.endpoint(),
            reconnect = count,
            delay_ms = self.settings.reconnect_delay.as_millis() as u64,
            "reconnecting to modbus gateway"
        );

        self.disconnect().await;
        sleep(self.settings.reconnect_delay).await;
        self.connect().await
    }

    /// 是否持有已建立的会话（纯查询）。
    pub fn is_connected(&self) -> bool {
        self.health().state == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.health().state
    }

    /// 最近一次成功事务的单调时钟时间。
    pub fn last_success_at(&self) -> Option<Instant> {
        self.health().last_success_at
    }

    /// 最近一次成功事务的 Unix 毫秒时间。
    pub fn last_success_ms(&self) -> Option<i64> {
        self.health().last_success_ms
    }

    /// `reconnect()` 被调用的累计次数。
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// 执行单个事务（单次尝试，不含重试）。
    ///
    /// 持锁期间依次完成：事务间隔等待、按需建连、带超时的收发。
    /// 超时或断线后丢弃会话，下一次事务重新建连。
    pub async fn call(&self, request: &Request) -> Result<Response, ProtocolError> {
        let mut session = self.session.lock().await;

        if let Some(last) = session.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < self.settings.inter_request_delay {
                sleep(self.settings.inter_request_delay - elapsed).await;
            }
        }

        if session.transport.is_none() {
            self.open(&mut session).await?;
        }
        let Some(transport) = session.transport.as_mut() else {
            return Err(ProtocolError::NotConnected);
        };

        let started = Instant::now();
        let result = match timeout(self.settings.request_timeout, transport.call(request)).await {
            Ok(result) => result.and_then(|response| response.conform(request)),
            Err(_) => Err(ProtocolError::Timeout(format!(
                "{} exceeded {}ms",
                request.name(),
                self.settings.request_timeout.as_millis()
            ))),
        };
        let finished = Instant::now();
        session.last_request_at = Some(finished);

        match &result {
            Ok(_) => {
                hp_telemetry::record_transaction_ok(
                    finished.duration_since(started).as_millis() as u64,
                );
                self.update_health(|health| {
                    health.last_success_at = Some(finished);
                    health.last_success_ms = Some(now_epoch_ms());
                });
            }
            Err(err) if err.invalidates_session() => {
                warn!(
                    target: "hp.protocol",
                    request = request.name(),
                    error = %err,
                    "dropping modbus session"
                );
                session.transport = None;
                self.set_state(ConnectionState::Disconnected);
            }
            Err(_) => {}
        }

        result
    }

    async fn open(&self, session: &mut Session) -> Result<(), ProtocolError> {
        self.set_state(ConnectionState::Connecting);
        match self.connector.connect().await {
            Ok(transport) => {
                session.transport = Some(transport);
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(err) => {
                warn!(
                    target: "hp.protocol",
                    endpoint = %self.connector.endpoint(),
                    error = %err,
                    "failed to connect to modbus gateway"
                );
                self.set_state(ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    async fn close(&self, session: &mut Session) {
        if let Some(mut transport) = session.transport.take() {
            if let Err(err) = transport.close().await {
                warn!(
                    target: "hp.protocol",
                    error = %err,
                    "failed to close modbus session"
                );
            }
            info!(
                target: "hp.protocol",
                endpoint = %self.connector.endpoint(),
                "disconnected from modbus gateway"
            );
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn health(&self) -> Health {
        *self.health.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_health(&self, update: impl FnOnce(&mut Health)) {
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut health);
    }

    fn set_state(&self, state: ConnectionState) {
        self.update_health(|health| health.state = state);
    }
}
