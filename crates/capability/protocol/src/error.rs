//! 协议错误类型定义

/// 错误分类，决定重试与重连行为。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 超时、帧损坏、其他设备的应答：可重试
    Transient,
    /// 设备返回的 Modbus 异常码：可重试，耗尽后上报
    DeviceException,
    /// 会话断开：可重试，需要重建连接
    ConnectionLost,
    /// 调用方参数错误：不重试，不接触硬件
    Fatal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::DeviceException => "device_exception",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::Fatal => "fatal",
        }
    }
}

/// 协议通信错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// 单次事务超时
    #[error("timeout: {0}")]
    Timeout(String),

    /// 帧过短或内容不可解析
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// 共享总线上其他设备的应答（单元号或事务号不匹配），视为无应答
    #[error("foreign response: {0}")]
    ForeignResponse(String),

    /// 设备返回异常码
    #[error("modbus exception: {0}")]
    Exception(String),

    /// 会话在事务过程中断开
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// 当前没有可用会话
    #[error("not connected")]
    NotConnected,

    /// 建立连接失败（超时、拒绝、地址无效）
    #[error("connection error: {0}")]
    Connection(String),

    /// 参数校验失败
    #[error("validation error: {0}")]
    Validation(String),

    /// 重试耗尽
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: Box<ProtocolError>,
    },
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Timeout(_)
            | ProtocolError::MalformedFrame(_)
            | ProtocolError::ForeignResponse(_) => ErrorKind::Transient,
            ProtocolError::Exception(_) => ErrorKind::DeviceException,
            ProtocolError::ConnectionLost(_)
            | ProtocolError::NotConnected
            | ProtocolError::Connection(_) => ErrorKind::ConnectionLost,
            ProtocolError::Validation(_) => ErrorKind::Fatal,
            ProtocolError::Exhausted { last, .. } => last.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProtocolError::Validation(_) | ProtocolError::Exhausted { .. }
        )
    }

    /// 会话的帧同步已不可信，应丢弃当前连接。
    ///
    /// 其他设备的应答与超时同样视为无应答：自身的迟到应答可能仍留在流中。
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            ProtocolError::Timeout(_)
                | ProtocolError::ForeignResponse(_)
                | ProtocolError::ConnectionLost(_)
        )
    }
}
