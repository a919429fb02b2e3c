use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::registers::Region;

/// 单次轮询周期读取到的原始寄存器值。
///
/// 位区（线圈、离散输入）按地址存 bool，字区（输入、保持寄存器）按地址存 u16。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSample {
    pub coils: BTreeMap<u16, bool>,
    pub discrete_inputs: BTreeMap<u16, bool>,
    pub input_registers: BTreeMap<u16, u16>,
    pub holding_registers: BTreeMap<u16, u16>,
    pub captured_at_ms: i64,
}

impl RawSample {
    pub fn new(captured_at_ms: i64) -> Self {
        Self {
            captured_at_ms,
            ..Self::default()
        }
    }

    /// 写入一段连续的位值；字区调用时忽略。
    pub fn insert_bits(&mut self, region: Region, start: u16, values: &[bool]) {
        let target = match region {
            Region::Coil => &mut self.coils,
            Region::DiscreteInput => &mut self.discrete_inputs,
            _ => return,
        };
        for (offset, value) in values.iter().enumerate() {
            target.insert(start.wrapping_add(offset as u16), *value);
        }
    }

    /// 写入一段连续的寄存器值；位区调用时忽略。
    pub fn insert_words(&mut self, region: Region, start: u16, values: &[u16]) {
        let target = match region {
            Region::InputRegister => &mut self.input_registers,
            Region::HoldingRegister => &mut self.holding_registers,
            _ => return,
        };
        for (offset, value) in values.iter().enumerate() {
            target.insert(start.wrapping_add(offset as u16), *value);
        }
    }

    pub fn bit(&self, region: Region, address: u16) -> Option<bool> {
        match region {
            Region::Coil => self.coils.get(&address).copied(),
            Region::DiscreteInput => self.discrete_inputs.get(&address).copied(),
            _ => None,
        }
    }

    pub fn word(&self, region: Region, address: u16) -> Option<u16> {
        match region {
            Region::InputRegister => self.input_registers.get(&address).copied(),
            Region::HoldingRegister => self.holding_registers.get(&address).copied(),
            _ => None,
        }
    }
}

/// 当前 Unix 毫秒时间戳。
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
