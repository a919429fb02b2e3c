use std::fmt;

/// 可设置的运行模式（保持寄存器 0）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LgMode {
    Cool,
    Auto,
    Heat,
}

impl LgMode {
    pub fn code(self) -> u16 {
        match self {
            LgMode::Cool => 0,
            LgMode::Auto => 3,
            LgMode::Heat => 4,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(LgMode::Cool),
            3 => Some(LgMode::Auto),
            4 => Some(LgMode::Heat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LgMode::Cool => "cool",
            LgMode::Auto => "auto",
            LgMode::Heat => "heat",
        }
    }

    /// 解析外部输入的模式名（大小写不敏感）。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cool" => Some(LgMode::Cool),
            "auto" => Some(LgMode::Auto),
            "heat" => Some(LgMode::Heat),
            _ => None,
        }
    }
}

/// 当前模式以及该模式下真正生效的写入目标。
///
/// Cool/Heat 下出水温度设定值生效；Auto 下只有偏移量生效，
/// 设定温度寄存器仍可写但设备不采用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeSetting {
    Cool { target_temperature: f64 },
    Heat { target_temperature: f64 },
    Auto { offset_k: i32 },
    Unrecognized(u16),
}

impl ModeSetting {
    pub fn resolve(code: u16, target_temperature: f64, offset_k: i32) -> Self {
        match LgMode::from_code(code) {
            Some(LgMode::Cool) => ModeSetting::Cool { target_temperature },
            Some(LgMode::Heat) => ModeSetting::Heat { target_temperature },
            Some(LgMode::Auto) => ModeSetting::Auto { offset_k },
            None => ModeSetting::Unrecognized(code),
        }
    }

    pub fn mode(&self) -> Option<LgMode> {
        match self {
            ModeSetting::Cool { .. } => Some(LgMode::Cool),
            ModeSetting::Heat { .. } => Some(LgMode::Heat),
            ModeSetting::Auto { .. } => Some(LgMode::Auto),
            ModeSetting::Unrecognized(_) => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            ModeSetting::Unrecognized(code) => *code,
            other => other.mode().map(LgMode::code).unwrap_or_default(),
        }
    }

    /// 设定温度在当前模式下是否有物理效果。
    pub fn target_temperature_is_live(&self) -> bool {
        matches!(self, ModeSetting::Cool { .. } | ModeSetting::Heat { .. })
    }
}

/// 室外机运行周期（输入寄存器 1）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingCycle {
    Standby,
    Cooling,
    Heating,
    Defrost,
    Unrecognized(u16),
}

impl OperatingCycle {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => OperatingCycle::Standby,
            1 => OperatingCycle::Cooling,
            2 => OperatingCycle::Heating,
            3 => OperatingCycle::Defrost,
            other => OperatingCycle::Unrecognized(other),
        }
    }

    pub fn label(&self) -> String {
        match self {
            OperatingCycle::Standby => "standby".to_string(),
            OperatingCycle::Cooling => "cooling".to_string(),
            OperatingCycle::Heating => "heating".to_string(),
            OperatingCycle::Defrost => "defrost".to_string(),
            OperatingCycle::Unrecognized(code) => format!("unrecognized({code})"),
        }
    }
}

/// 温度控制基准（保持寄存器 1）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMethod {
    WaterOutlet,
    WaterInlet,
    RoomAir,
    Unrecognized(u16),
}

impl ControlMethod {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ControlMethod::WaterOutlet,
            1 => ControlMethod::WaterInlet,
            2 => ControlMethod::RoomAir,
            other => ControlMethod::Unrecognized(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            ControlMethod::WaterOutlet => 0,
            ControlMethod::WaterInlet => 1,
            ControlMethod::RoomAir => 2,
            ControlMethod::Unrecognized(code) => *code,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ControlMethod::WaterOutlet => "water_outlet".to_string(),
            ControlMethod::WaterInlet => "water_inlet".to_string(),
            ControlMethod::RoomAir => "room_air".to_string(),
            ControlMethod::Unrecognized(code) => format!("unrecognized({code})"),
        }
    }
}

/// 解码后的设备状态，不可变，最新值覆盖旧值。
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStatus {
    pub is_on: bool,
    pub lg_mode: ModeSetting,
    pub operating_cycle: OperatingCycle,
    pub control_method: ControlMethod,
    pub water_pump_running: bool,
    pub compressor_running: bool,
    pub has_error: bool,
    pub error_code: u16,
    pub flow_temp: f64,
    pub return_temp: f64,
    pub outdoor_temp: f64,
    pub flow_rate: f64,
    pub water_pressure: f64,
    pub target_temperature: f64,
    pub auto_mode_offset: i32,
    pub energy_state: u16,
}

impl DecodedStatus {
    /// 供回水温差。
    pub fn temperature_delta(&self) -> f64 {
        self.flow_temp - self.return_temp
    }

    pub fn with_power(mut self, on: bool) -> Self {
        self.is_on = on;
        self
    }

    pub fn with_lg_mode(mut self, mode: LgMode) -> Self {
        self.lg_mode = ModeSetting::resolve(mode.code(), self.target_temperature, self.auto_mode_offset);
        self
    }

    pub fn with_target_temperature(mut self, celsius: f64) -> Self {
        self.target_temperature = celsius;
        self.lg_mode = ModeSetting::resolve(self.lg_mode.code(), celsius, self.auto_mode_offset);
        self
    }

    pub fn with_auto_mode_offset(mut self, offset_k: i32) -> Self {
        self.auto_mode_offset = offset_k;
        self.lg_mode = ModeSetting::resolve(self.lg_mode.code(), self.target_temperature, offset_k);
        self
    }
}

impl fmt::Display for DecodedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let power = if self.is_on { "ON" } else { "OFF" };
        let mode = match self.lg_mode {
            ModeSetting::Auto { offset_k } if offset_k != 0 => format!("auto {offset_k:+}K"),
            ModeSetting::Unrecognized(code) => format!("M{code}"),
            other => other.mode().map(LgMode::as_str).unwrap_or_default().to_string(),
        };
        write!(
            f,
            "[{power:3}] {:8}({mode}) | target {:4.1}°C | flow {:5.1}°C | return {:5.1}°C | delta {:+5.1}°C | rate {:4.1}L | outdoor {:5.1}°C | error {}",
            self.operating_cycle.label(),
            self.target_temperature,
            self.flow_temp,
            self.return_temp,
            self.temperature_delta(),
            self.flow_rate,
            self.outdoor_temp,
            self.error_code,
        )
    }
}
