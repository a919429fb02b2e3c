use std::sync::Arc;

use domain::Region;

use crate::connection::ConnectionManager;
use crate::error::ProtocolError;
use crate::retry::{Executed, RetryExecutor};
use crate::transport::{Request, Response};

/// 带重试的 Modbus 客户端，轮询与写入共用同一个会话。
#[derive(Clone)]
pub struct ModbusClient {
    connection: Arc<ConnectionManager>,
    retry: RetryExecutor,
}

impl ModbusClient {
    pub fn new(connection: Arc<ConnectionManager>, retry: RetryExecutor) -> Self {
        Self { connection, retry }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub async fn transact(&self, request: Request) -> Result<Executed<Response>, ProtocolError> {
        let connection = self.connection.as_ref();
        let request = &request;
        self.retry
            .execute(request.name(), move || connection.call(request))
            .await
    }

    pub async fn read_bits(
        &self,
        region: Region,
        addr: u16,
        count: u16,
    ) -> Result<Executed<Vec<bool>>, ProtocolError> {
        let executed = self.transact(Request::read(region, addr, count)).await?;
        Ok(Executed {
            value: executed.value.into_bits()?,
            attempts: executed.attempts,
        })
    }

    pub async fn read_words(
        &self,
        region: Region,
        addr: u16,
        count: u16,
    ) -> Result<Executed<Vec<u16>>, ProtocolError> {
        let executed = self.transact(Request::read(region, addr, count)).await?;
        Ok(Executed {
            value: executed.value.into_words()?,
            attempts: executed.attempts,
        })
    }

    pub async fn write_coil(&self, addr: u16, value: bool) -> Result<Executed<()>, ProtocolError> {
        let executed = self
            .transact(Request::WriteSingleCoil { addr, value })
            .await?;
        Ok(Executed {
            value: (),
            attempts: executed.attempts,
        })
    }

    pub async fn write_register(
        &self,
        addr: u16,
        value: u16,
    ) -> Result<Executed<()>, ProtocolError> {
        let executed = self
            .transact(Request::WriteSingleRegister { addr, value })
            .await?;
        Ok(Executed {
            value: (),
            attempts: executed.attempts,
        })
    }
}
