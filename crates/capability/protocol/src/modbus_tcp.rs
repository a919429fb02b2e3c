//! Modbus TCP 传输实现（经 RTU↔TCP 网关访问单个从站）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let config = ModbusTcpConfig::from_json(r#"{"host": "192.168.1.50", "unit_id": 1}"#)?;
//! let connector = TcpConnector::new(config);
//! let mut transport = connector.connect().await?;
//! let response = transport.call(&Request::ReadCoils { addr: 0, count: 1 }).await?;
//! ```

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::lookup_host;
use tokio::time::timeout;
use tokio_modbus::client::{Client, Context, Reader, Writer, tcp};
use tokio_modbus::{ExceptionCode, Slave};
use tracing::{debug, info};

use crate::error::ProtocolError;
use crate::transport::{ModbusTransport, Request, Response, TransportConnector};

/// Modbus TCP 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModbusTcpConfig {
    /// 网关主机地址
    pub host: String,
    /// 网关端口（默认 502）
    #[serde(default = "default_modbus_port")]
    pub port: u16,
    /// 从站单元号
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_modbus_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_connect_timeout() -> u64 {
    5000
}

impl ModbusTcpConfig {
    /// 从 JSON 配置字符串解析
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::Validation(e.to_string()))
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 基于 tokio-modbus 的连接工厂。
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: ModbusTcpConfig,
}

impl TcpConnector {
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportConnector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn ModbusTransport>, ProtocolError> {
        let endpoint = self.config.endpoint();
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let slave = Slave(self.config.unit_id);

        let ctx = timeout(connect_timeout, async {
            let addr = lookup_host(endpoint.as_str())
                .await?
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved"))?;
            tcp::connect_slave(addr, slave).await
        })
        .await
        .map_err(|_| {
            ProtocolError::Connection(format!(
                "connect to {endpoint} timed out after {}ms",
                self.config.connect_timeout_ms
            ))
        })?
        .map_err(|e| ProtocolError::Connection(format!("connect to {endpoint}: {e}")))?;

        info!(
            target: "hp.protocol",
            endpoint = %endpoint,
            unit_id = self.config.unit_id,
            "connected to modbus gateway"
        );

        Ok(Box::new(TokioModbusTransport { ctx }))
    }

    fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

/// tokio-modbus 客户端会话。
pub struct TokioModbusTransport {
    ctx: Context,
}

#[async_trait]
impl ModbusTransport for TokioModbusTransport {
    async fn call(&mut self, request: &Request) -> Result<Response, ProtocolError> {
        let response = match *request {
            Request::ReadCoils { addr, count } => Response::Bits(
                self.ctx
                    .read_coils(addr, count)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?,
            ),
            Request::ReadDiscreteInputs { addr, count } => Response::Bits(
                self.ctx
                    .read_discrete_inputs(addr, count)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?,
            ),
            Request::ReadInputRegisters { addr, count } => Response::Words(
                self.ctx
                    .read_input_registers(addr, count)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?,
            ),
            Request::ReadHoldingRegisters { addr, count } => Response::Words(
                self.ctx
                    .read_holding_registers(addr, count)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?,
            ),
            Request::WriteSingleCoil { addr, value } => {
                self.ctx
                    .write_single_coil(addr, value)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?;
                Response::Ack
            }
            Request::WriteSingleRegister { addr, value } => {
                self.ctx
                    .write_single_register(addr, value)
                    .await
                    .map_err(map_modbus_error)?
                    .map_err(map_exception)?;
                Response::Ack
            }
        };

        debug!(
            target: "hp.protocol",
            request = request.name(),
            response = ?response,
            "modbus transaction completed"
        );

        Ok(response)
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.ctx
            .disconnect()
            .await
            .map(|_| ())
            .map_err(|e| ProtocolError::ConnectionLost(e.to_string()))
    }
}

/// 头部不匹配（单元号/事务号）说明应答来自总线上的其他设备。
fn map_modbus_error(err: tokio_modbus::Error) -> ProtocolError {
    match err {
        tokio_modbus::Error::Transport(io_err) => map_io_error(io_err),
        tokio_modbus::Error::Protocol(protocol_err) => {
            ProtocolError::ForeignResponse(protocol_err.to_string())
        }
    }
}

fn map_io_error(err: io::Error) -> ProtocolError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            ProtocolError::Timeout(err.to_string())
        }
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            ProtocolError::MalformedFrame(err.to_string())
        }
        // EOF、复位、断管等都按会话断开处理
        _ => ProtocolError::ConnectionLost(err.to_string()),
    }
}

fn map_exception(code: ExceptionCode) -> ProtocolError {
    ProtocolError::Exception(format!("{code:?}"))
}
