//! # Modbus 会话能力模块
//!
//! 通过 RTU↔TCP 网关访问单个热泵从站：
//! - **transport**：单事务请求/应答与会话接口（真实 TCP 与内存模拟两种实现）
//! - **connection**：唯一会话、总线互斥、事务间隔与超时
//! - **retry**：有界重试、退避与错误分类
//!
//! ## 调用链
//!
//! ```text
//! PollingLoop / ModeController
//!       │
//!       ▼
//! ModbusClient ── RetryExecutor（每次尝试记录日志）
//!       │
//!       ▼
//! ConnectionManager（互斥锁 + 事务间隔 + 超时）
//!       │
//!       ▼
//! ModbusTransport（tokio-modbus / MockDevice）
//! ```

mod client;
mod connection;
mod error;
pub mod mock;
mod modbus_tcp;
mod retry;
mod transport;

pub use client::ModbusClient;
pub use connection::{ConnectionManager, ConnectionSettings};
pub use error::{ErrorKind, ProtocolError};
pub use modbus_tcp::{ModbusTcpConfig, TcpConnector, TokioModbusTransport};
pub use retry::{
    AttemptObserver, AttemptOutcome, AttemptRecord, Executed, RetryExecutor, RetryPolicy,
};
pub use transport::{ModbusTransport, Request, Response, TransportConnector};
