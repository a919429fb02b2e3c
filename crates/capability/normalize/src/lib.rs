//! 寄存器编解码：原始 16 位值 ⇄ 领域值。
//!
//! 编解码函数对任意 16 位输入都是全函数，不会 panic。

use domain::registers::{
    self, COIL_POWER, DISCRETE_COMPRESSOR, DISCRETE_ERROR, DISCRETE_WATER_PUMP,
    HOLDING_AUTO_OFFSET, HOLDING_CONTROL_METHOD, HOLDING_ENERGY_STATE, HOLDING_OP_MODE,
    HOLDING_TARGET_TEMP, INPUT_ERROR_CODE, INPUT_FLOW_RATE, INPUT_FLOW_TEMP,
    INPUT_OPERATING_CYCLE, INPUT_OUTDOOR_TEMP, INPUT_RETURN_TEMP, INPUT_WATER_PRESSURE,
};
use domain::{
    ControlMethod, DecodedStatus, ModeSetting, OperatingCycle, RawSample, Region, RegisterDef,
};

/// 解码错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("missing {region} register {address}")]
    MissingRegister { region: &'static str, address: u16 },
}

/// 无符号寄存器按比例缩放，`scale=10` 对应 ×0.1 的寄存器。
pub fn decode_unsigned(raw: u16, scale: f64) -> f64 {
    raw as f64 / scale
}

/// 16 位补码解码。
pub fn decode_signed16(raw: u16) -> i32 {
    raw as i16 as i32
}

/// 16 位补码编码，超出范围的值按低 16 位截断。
pub fn encode_signed16(value: i32) -> u16 {
    (value & 0xFFFF) as u16
}

/// 摄氏度编码为 ×0.1 的寄存器值，负温度按补码表示。
pub fn encode_temperature(celsius: f64) -> u16 {
    encode_signed16((celsius * 10.0).round() as i32)
}

/// 按寄存器定义的比例与符号解码。
pub fn decode_scaled(def: &RegisterDef, raw: u16) -> f64 {
    if def.signed {
        decode_signed16(raw) as f64 / def.scale
    } else {
        decode_unsigned(raw, def.scale)
    }
}

/// 将一次完整采样解码为设备状态。
pub fn decode_status(sample: &RawSample) -> Result<DecodedStatus, NormalizeError> {
    let target_temperature = scaled(sample, Region::HoldingRegister, HOLDING_TARGET_TEMP)?;
    let auto_mode_offset = decode_signed16(word(sample, Region::HoldingRegister, HOLDING_AUTO_OFFSET)?);
    let op_mode = word(sample, Region::HoldingRegister, HOLDING_OP_MODE)?;

    Ok(DecodedStatus {
        is_on: bit(sample, Region::Coil, COIL_POWER)?,
        lg_mode: ModeSetting::resolve(op_mode, target_temperature, auto_mode_offset),
        operating_cycle: OperatingCycle::from_code(word(
            sample,
            Region::InputRegister,
            INPUT_OPERATING_CYCLE,
        )?),
        control_method: ControlMethod::from_code(word(
            sample,
            Region::HoldingRegister,
            HOLDING_CONTROL_METHOD,
        )?),
        water_pump_running: bit(sample, Region::DiscreteInput, DISCRETE_WATER_PUMP)?,
        compressor_running: bit(sample, Region::DiscreteInput, DISCRETE_COMPRESSOR)?,
        has_error: bit(sample, Region::DiscreteInput, DISCRETE_ERROR)?,
        error_code: word(sample, Region::InputRegister, INPUT_ERROR_CODE)?,
        flow_temp: scaled(sample, Region::InputRegister, INPUT_FLOW_TEMP)?,
        return_temp: scaled(sample, Region::InputRegister, INPUT_RETURN_TEMP)?,
        outdoor_temp: scaled(sample, Region::InputRegister, INPUT_OUTDOOR_TEMP)?,
        flow_rate: scaled(sample, Region::InputRegister, INPUT_FLOW_RATE)?,
        water_pressure: scaled(sample, Region::InputRegister, INPUT_WATER_PRESSURE)?,
        target_temperature,
        auto_mode_offset,
        energy_state: word(sample, Region::HoldingRegister, HOLDING_ENERGY_STATE)?,
    })
}

fn missing(region: Region, address: u16) -> NormalizeError {
    NormalizeError::MissingRegister {
        region: region.as_str(),
        address,
    }
}

fn bit(sample: &RawSample, region: Region, address: u16) -> Result<bool, NormalizeError> {
    sample
        .bit(region, address)
        .ok_or_else(|| missing(region, address))
}

fn word(sample: &RawSample, region: Region, address: u16) -> Result<u16, NormalizeError> {
    sample
        .word(region, address)
        .ok_or_else(|| missing(region, address))
}

fn scaled(sample: &RawSample, region: Region, address: u16) -> Result<f64, NormalizeError> {
    let raw = word(sample, region, address)?;
    let def = registers::register(region, address).ok_or_else(|| missing(region, address))?;
    Ok(decode_scaled(def, raw))
}
