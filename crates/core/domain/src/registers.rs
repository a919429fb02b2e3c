/// Modbus 四个可寻址分区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl Region {
    /// 轮询周期内的固定读取顺序。
    pub const POLL_ORDER: [Region; 4] = [
        Region::Coil,
        Region::DiscreteInput,
        Region::InputRegister,
        Region::HoldingRegister,
    ];

    pub fn is_bit(self) -> bool {
        matches!(self, Region::Coil | Region::DiscreteInput)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Region::Coil | Region::HoldingRegister)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Coil => "coil",
            Region::DiscreteInput => "discrete_input",
            Region::InputRegister => "input_register",
            Region::HoldingRegister => "holding_register",
        }
    }
}

/// 单个寄存器定义。
///
/// `scale` 为除数（×0.1 的寄存器取 10），位区与枚举寄存器取 1。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterDef {
    pub region: Region,
    pub address: u16,
    pub name: &'static str,
    pub scale: f64,
    pub signed: bool,
}

impl RegisterDef {
    const fn new(region: Region, address: u16, name: &'static str, scale: f64, signed: bool) -> Self {
        Self {
            region,
            address,
            name,
            scale,
            signed,
        }
    }
}

pub const COIL_POWER: u16 = 0;

pub const DISCRETE_WATER_PUMP: u16 = 1;
pub const DISCRETE_COMPRESSOR: u16 = 3;
pub const DISCRETE_ERROR: u16 = 13;

pub const INPUT_ERROR_CODE: u16 = 0;
pub const INPUT_OPERATING_CYCLE: u16 = 1;
pub const INPUT_RETURN_TEMP: u16 = 2;
pub const INPUT_FLOW_TEMP: u16 = 3;
pub const INPUT_FLOW_RATE: u16 = 8;
pub const INPUT_OUTDOOR_TEMP: u16 = 12;
pub const INPUT_WATER_PRESSURE: u16 = 13;

pub const HOLDING_OP_MODE: u16 = 0;
pub const HOLDING_CONTROL_METHOD: u16 = 1;
pub const HOLDING_TARGET_TEMP: u16 = 2;
pub const HOLDING_AUTO_OFFSET: u16 = 4;
pub const HOLDING_ENERGY_STATE: u16 = 9;

/// 静态寄存器表（与设备位级一致，不可修改）。
pub static REGISTER_MAP: &[RegisterDef] = &[
    RegisterDef::new(Region::Coil, COIL_POWER, "power", 1.0, false),
    RegisterDef::new(Region::DiscreteInput, DISCRETE_WATER_PUMP, "water_pump", 1.0, false),
    RegisterDef::new(Region::DiscreteInput, DISCRETE_COMPRESSOR, "compressor", 1.0, false),
    RegisterDef::new(Region::DiscreteInput, DISCRETE_ERROR, "error_flag", 1.0, false),
    RegisterDef::new(Region::InputRegister, INPUT_ERROR_CODE, "error_code", 1.0, false),
    RegisterDef::new(Region::InputRegister, INPUT_OPERATING_CYCLE, "operating_cycle", 1.0, false),
    RegisterDef::new(Region::InputRegister, INPUT_RETURN_TEMP, "return_temp", 10.0, true),
    RegisterDef::new(Region::InputRegister, INPUT_FLOW_TEMP, "flow_temp", 10.0, true),
    RegisterDef::new(Region::InputRegister, INPUT_FLOW_RATE, "flow_rate", 10.0, false),
    RegisterDef::new(Region::InputRegister, INPUT_OUTDOOR_TEMP, "outdoor_temp", 10.0, true),
    RegisterDef::new(Region::InputRegister, INPUT_WATER_PRESSURE, "water_pressure", 10.0, false),
    RegisterDef::new(Region::HoldingRegister, HOLDING_OP_MODE, "op_mode", 1.0, false),
    RegisterDef::new(Region::HoldingRegister, HOLDING_CONTROL_METHOD, "control_method", 1.0, false),
    RegisterDef::new(Region::HoldingRegister, HOLDING_TARGET_TEMP, "target_temperature", 10.0, true),
    RegisterDef::new(Region::HoldingRegister, HOLDING_AUTO_OFFSET, "auto_mode_offset", 1.0, true),
    RegisterDef::new(Region::HoldingRegister, HOLDING_ENERGY_STATE, "energy_state", 1.0, false),
];

/// 按分区与地址查找寄存器定义。
pub fn register(region: Region, address: u16) -> Option<&'static RegisterDef> {
    REGISTER_MAP
        .iter()
        .find(|def| def.region == region && def.address == address)
}

/// 一次连续读取的地址范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBlock {
    pub region: Region,
    pub start: u16,
    pub count: u16,
}

/// 由寄存器表推导每个分区的最小覆盖读取块，按 `Region::POLL_ORDER` 排列。
pub fn poll_blocks() -> Vec<ReadBlock> {
    Region::POLL_ORDER
        .iter()
        .filter_map(|region| {
            let addresses = REGISTER_MAP
                .iter()
                .filter(|def| def.region == *region)
                .map(|def| def.address);
            let (min, max) = addresses.fold(None, |acc: Option<(u16, u16)>, addr| match acc {
                None => Some((addr, addr)),
                Some((lo, hi)) => Some((lo.min(addr), hi.max(addr))),
            })?;
            Some(ReadBlock {
                region: *region,
                start: min,
                count: max - min + 1,
            })
        })
        .collect()
}
