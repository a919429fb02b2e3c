//! 传输层抽象：单个 Modbus 事务的请求、应答与会话接口。

use async_trait::async_trait;
use domain::Region;

use crate::error::ProtocolError;

/// 一次 Modbus 事务请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ReadCoils { addr: u16, count: u16 },
    ReadDiscreteInputs { addr: u16, count: u16 },
    ReadInputRegisters { addr: u16, count: u16 },
    ReadHoldingRegisters { addr: u16, count: u16 },
    WriteSingleCoil { addr: u16, value: bool },
    WriteSingleRegister { addr: u16, value: u16 },
}

impl Request {
    /// 按分区构造读取请求。
    pub fn read(region: Region, addr: u16, count: u16) -> Self {
        match region {
            Region::Coil => Request::ReadCoils { addr, count },
            Region::DiscreteInput => Request::ReadDiscreteInputs { addr, count },
            Region::InputRegister => Request::ReadInputRegisters { addr, count },
            Region::HoldingRegister => Request::ReadHoldingRegisters { addr, count },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::ReadCoils { .. } => "read_coils",
            Request::ReadDiscreteInputs { .. } => "read_discrete_inputs",
            Request::ReadInputRegisters { .. } => "read_input_registers",
            Request::ReadHoldingRegisters { .. } => "read_holding_registers",
            Request::WriteSingleCoil { .. } => "write_single_coil",
            Request::WriteSingleRegister { .. } => "write_single_register",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Request::WriteSingleCoil { .. } | Request::WriteSingleRegister { .. }
        )
    }
}

/// 事务应答。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Bits(Vec<bool>),
    Words(Vec<u16>),
    Ack,
}

impl Response {
    /// 校验应答与请求匹配；位值多于请求数时截断（线圈按字节补齐）。
    pub fn conform(self, request: &Request) -> Result<Response, ProtocolError> {
        match (request, self) {
            (
                Request::ReadCoils { count, .. } | Request::ReadDiscreteInputs { count, .. },
                Response::Bits(mut bits),
            ) => {
                let count = usize::from(*count);
                if bits.len() < count {
                    return Err(short_frame(request, count, bits.len()));
                }
                bits.truncate(count);
                Ok(Response::Bits(bits))
            }
            (
                Request::ReadInputRegisters { count, .. }
                | Request::ReadHoldingRegisters { count, .. },
                Response::Words(words),
            ) => {
                let count = usize::from(*count);
                if words.len() != count {
                    return Err(short_frame(request, count, words.len()));
                }
                Ok(Response::Words(words))
            }
            (Request::WriteSingleCoil { .. } | Request::WriteSingleRegister { .. }, Response::Ack) => {
                Ok(Response::Ack)
            }
            (request, other) => Err(ProtocolError::MalformedFrame(format!(
                "{} answered with {other:?}",
                request.name()
            ))),
        }
    }

    pub fn into_bits(self) -> Result<Vec<bool>, ProtocolError> {
        match self {
            Response::Bits(bits) => Ok(bits),
            other => Err(ProtocolError::MalformedFrame(format!(
                "expected bits, got {other:?}"
            ))),
        }
    }

    pub fn into_words(self) -> Result<Vec<u16>, ProtocolError> {
        match self {
            Response::Words(words) => Ok(words),
            other => Err(ProtocolError::MalformedFrame(format!(
                "expected registers, got {other:?}"
            ))),
        }
    }
}

fn short_frame(request: &Request, expected: usize, got: usize) -> ProtocolError {
    ProtocolError::MalformedFrame(format!(
        "{} expected {expected} values, got {got}",
        request.name()
    ))
}

/// 已建立的会话，一次只处理一个事务。
#[async_trait]
pub trait ModbusTransport: Send {
    async fn call(&mut self, request: &Request) -> Result<Response, ProtocolError>;

    async fn close(&mut self) -> Result<(), ProtocolError>;
}

/// 会话工厂。
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ModbusTransport>, ProtocolError>;

    /// 日志中使用的对端描述。
    fn endpoint(&self) -> String;
}
