//! 内存模拟设备，仅用于本地测试和联调占位。
//!
//! `MockDevice` 持有寄存器镜像并实现 `TransportConnector`，
//! 每次 `connect` 返回共享同一镜像的会话。事务日志按 Begin/End 成对记录，
//! 便于断言事务之间没有交叠。

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::registers::{
    COIL_POWER, HOLDING_CONTROL_METHOD, HOLDING_OP_MODE, HOLDING_TARGET_TEMP, INPUT_FLOW_RATE,
    INPUT_FLOW_TEMP, INPUT_OUTDOOR_TEMP, INPUT_RETURN_TEMP, INPUT_WATER_PRESSURE,
};

use crate::error::ProtocolError;
use crate::transport::{ModbusTransport, Request, Response, TransportConnector};

/// 事务日志条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Begin(Request),
    End(Request),
}

#[derive(Debug, Default)]
struct MockState {
    coils: BTreeMap<u16, bool>,
    discrete_inputs: BTreeMap<u16, bool>,
    input_registers: BTreeMap<u16, u16>,
    holding_registers: BTreeMap<u16, u16>,
    scripted_failures: VecDeque<ProtocolError>,
    fail_always: Option<ProtocolError>,
    connect_failures: VecDeque<ProtocolError>,
    latency: Duration,
    log: Vec<MockEvent>,
    writes: Vec<Request>,
    calls: u32,
    connects: u32,
    closes: u32,
}

/// 模拟设备（可克隆，克隆共享同一状态）。
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// 典型的待机热泵：电源关，制热模式，设定 40.0°C。
    pub fn heat_pump() -> Self {
        let device = Self::new();
        device.set_coil(COIL_POWER, false);
        device.set_holding(HOLDING_OP_MODE, 4);
        device.set_holding(HOLDING_CONTROL_METHOD, 0);
        device.set_holding(HOLDING_TARGET_TEMP, 400);
        device.set_input(INPUT_RETURN_TEMP, 350);
        device.set_input(INPUT_FLOW_TEMP, 385);
        device.set_input(INPUT_FLOW_RATE, 120);
        device.set_input(INPUT_OUTDOOR_TEMP, 75);
        device.set_input(INPUT_WATER_PRESSURE, 18);
        device
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_coil(&self, addr: u16, value: bool) {
        self.state().coils.insert(addr, value);
    }

    pub fn set_discrete(&self, addr: u16, value: bool) {
        self.state().discrete_inputs.insert(addr, value);
    }

    pub fn set_input(&self, addr: u16, value: u16) {
        self.state().input_registers.insert(addr, value);
    }

    pub fn set_holding(&self, addr: u16, value: u16) {
        self.state().holding_registers.insert(addr, value);
    }

    pub fn coil(&self, addr: u16) -> bool {
        self.state().coils.get(&addr).copied().unwrap_or(false)
    }

    pub fn holding(&self, addr: u16) -> u16 {
        self.state().holding_registers.get(&addr).copied().unwrap_or(0)
    }

    /// 下一次事务返回指定错误。
    pub fn fail_next(&self, err: ProtocolError) {
        self.state().scripted_failures.push_back(err);
    }

    pub fn fail_next_n(&self, n: usize, err: ProtocolError) {
        let mut state = self.state();
        for _ in 0..n {
            state.scripted_failures.push_back(err.clone());
        }
    }

    /// 所有事务持续失败，传入 `None` 恢复。
    pub fn fail_always(&self, err: Option<ProtocolError>) {
        self.state().fail_always = err;
    }

    pub fn fail_next_connect(&self, err: ProtocolError) {
        self.state().connect_failures.push_back(err);
    }

    /// 每个事务在 Begin 与 End 之间的耗时。
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    pub fn transaction_log(&self) -> Vec<MockEvent> {
        self.state().log.clone()
    }

    pub fn writes(&self) -> Vec<Request> {
        self.state().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    pub fn call_count(&self) -> u32 {
        self.state().calls
    }

    pub fn connect_count(&self) -> u32 {
        self.state().connects
    }

    pub fn close_count(&self) -> u32 {
        self.state().closes
    }

    fn begin(&self, request: &Request) -> Duration {
        let mut state = self.state();
        state.calls += 1;
        state.log.push(MockEvent::Begin(*request));
        state.latency
    }

    fn finish(&self, request: &Request) -> Result<Response, ProtocolError> {
        let mut state = self.state();
        state.log.push(MockEvent::End(*request));

        if let Some(err) = state.scripted_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = state.fail_always.clone() {
            return Err(err);
        }

        let response = match *request {
            Request::ReadCoils { addr, count } => Response::Bits(read_bits(&state.coils, addr, count)),
            Request::ReadDiscreteInputs { addr, count } => {
                Response::Bits(read_bits(&state.discrete_inputs, addr, count))
            }
            Request::ReadInputRegisters { addr, count } => {
                Response::Words(read_words(&state.input_registers, addr, count))
            }
            Request::ReadHoldingRegisters { addr, count } => {
                Response::Words(read_words(&state.holding_registers, addr, count))
            }
            Request::WriteSingleCoil { addr, value } => {
                state.coils.insert(addr, value);
                state.writes.push(*request);
                Response::Ack
            }
            Request::WriteSingleRegister { addr, value } => {
                state.holding_registers.insert(addr, value);
                state.writes.push(*request);
                Response::Ack
            }
        };
        Ok(response)
    }
}

fn read_bits(map: &BTreeMap<u16, bool>, addr: u16, count: u16) -> Vec<bool> {
    (0..count)
        .map(|i| map.get(&addr.wrapping_add(i)).copied().unwrap_or(false))
        .collect()
}

fn read_words(map: &BTreeMap<u16, u16>, addr: u16, count: u16) -> Vec<u16> {
    (0..count)
        .map(|i| map.get(&addr.wrapping_add(i)).copied().unwrap_or(0))
        .collect()
}

#[async_trait]
impl TransportConnector for MockDevice {
    async fn connect(&self) -> Result<Box<dyn ModbusTransport>, ProtocolError> {
        let mut state = self.state();
        if let Some(err) = state.connect_failures.pop_front() {
            return Err(err);
        }
        state.connects += 1;
        Ok(Box::new(MockTransport {
            device: self.clone(),
        }))
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

/// 模拟会话。
pub struct MockTransport {
    device: MockDevice,
}

#[async_trait]
impl ModbusTransport for MockTransport {
    async fn call(&mut self, request: &Request) -> Result<Response, ProtocolError> {
        let latency = self.device.begin(request);
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }
        self.device.finish(request)
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.device.state().closes += 1;
        Ok(())
    }
}
