//! 写入控制：电源、设定温度、运行模式与自动模式偏移。
//!
//! 所有写入经过 `ModbusClient`（重试 + 总线互斥），成功后登记写入回显；
//! 下一个轮询周期会重新读取硬件状态，即使应答在线路上丢失也能自行纠正。

use domain::registers::{
    COIL_POWER, HOLDING_AUTO_OFFSET, HOLDING_CONTROL_METHOD, HOLDING_ENERGY_STATE,
    HOLDING_OP_MODE, HOLDING_TARGET_TEMP,
};
use domain::{ControlMethod, LgMode, ModeSetting};
use hp_normalize::{encode_signed16, encode_temperature};
use hp_protocol::{ModbusClient, ProtocolError};
use hp_storage::{StatusStore, WriteEcho};
use hp_telemetry::{record_validation_rejected, record_write};
use tracing::{info, warn};

/// 自动模式偏移允许范围（K）。
pub const AUTO_OFFSET_RANGE: (i32, i32) = (-5, 5);

/// 控制链路错误。
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("modbus error: {0}")]
    Modbus(#[from] ProtocolError),
}

/// 设定温度允许范围，按安装类型区分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetpointProfile {
    /// 20–60°C
    #[default]
    Generic,
    /// 33–50°C，手动供暖安装
    ManualHeating,
}

impl SetpointProfile {
    pub fn range(self) -> (f64, f64) {
        match self {
            SetpointProfile::Generic => (20.0, 60.0),
            SetpointProfile::ManualHeating => (33.0, 50.0),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(SetpointProfile::Generic),
            "manual_heating" | "manual-heating" => Some(SetpointProfile::ManualHeating),
            _ => None,
        }
    }

    pub fn contains(self, celsius: f64) -> bool {
        let (min, max) = self.range();
        celsius.is_finite() && celsius >= min && celsius <= max
    }
}

/// 开机前的设备初始化写入序列：控制方式 → 运行模式 → 能量状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInit {
    pub energy_state: u16,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self { energy_state: 5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlConfig {
    pub profile: SetpointProfile,
    /// 切换到制热模式时立即写入的出水温度
    pub heat_default_temperature: f64,
    /// `None` 表示关闭初始化序列
    pub device_init: Option<DeviceInit>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            profile: SetpointProfile::Generic,
            heat_default_temperature: 40.0,
            device_init: None,
        }
    }
}

/// 设定温度写入结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointOutcome {
    /// 当前模式使用该设定值
    Applied,
    /// 已写入寄存器，但自动模式下设备不采用
    Inactive,
}

/// 模式控制器。
#[derive(Clone)]
pub struct ModeController {
    client: ModbusClient,
    store: StatusStore,
    echo: WriteEcho,
    config: ControlConfig,
}

impl ModeController {
    pub fn new(
        client: ModbusClient,
        store: StatusStore,
        config: ControlConfig,
    ) -> Result<Self, ControlError> {
        if !config.profile.contains(config.heat_default_temperature) {
            let (min, max) = config.profile.range();
            return Err(ControlError::Validation(format!(
                "heat default temperature {:.1}°C outside {min:.0}–{max:.0}°C",
                config.heat_default_temperature
            )));
        }
        let echo = store.echo();
        Ok(Self {
            client,
            store,
            echo,
            config,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub async fn set_power(&self, on: bool) -> Result<(), ControlError> {
        if on {
            if let Some(init) = self.config.device_init {
                self.run_device_init(init).await?;
            }
        }

        let executed = self.tracked(self.client.write_coil(COIL_POWER, on).await)?;
        self.echo.record_power(on);
        info!(
            target: "hp.control",
            power = on,
            attempts = executed.attempts,
            "power_written"
        );
        Ok(())
    }

    /// 校验并写入设定温度；超出范围时不接触硬件。
    pub async fn set_target_temperature(&self, celsius: f64) -> Result<SetpointOutcome, ControlError> {
        if !self.config.profile.contains(celsius) {
            let (min, max) = self.config.profile.range();
            return Err(self.rejected(format!(
                "target temperature {celsius}°C outside {min:.0}–{max:.0}°C"
            )));
        }

        let raw = encode_temperature(celsius);
        let executed = self.tracked(self.client.write_register(HOLDING_TARGET_TEMP, raw).await)?;
        self.echo.record_target_temperature(celsius);

        let outcome = match self.store.get_latest().map(|status| status.lg_mode) {
            Some(ModeSetting::Auto { .. }) => SetpointOutcome::Inactive,
            _ => SetpointOutcome::Applied,
        };
        if outcome == SetpointOutcome::Inactive {
            warn!(
                target: "hp.control",
                target_temperature = celsius,
                "target temperature written in auto mode; device uses auto_mode_offset instead"
            );
        }
        info!(
            target: "hp.control",
            target_temperature = celsius,
            raw,
            attempts = executed.attempts,
            outcome = ?outcome,
            "target_temperature_written"
        );
        Ok(outcome)
    }

    /// 写入运行模式；切换到制热时紧接着写入默认出水温度。
    pub async fn set_lg_mode(&self, mode: LgMode) -> Result<(), ControlError> {
        let executed = self.tracked(self.client.write_register(HOLDING_OP_MODE, mode.code()).await)?;
        self.echo.record_lg_mode(mode);
        info!(
            target: "hp.control",
            lg_mode = mode.as_str(),
            attempts = executed.attempts,
            "lg_mode_written"
        );

        if mode == LgMode::Heat {
            let celsius = self.config.heat_default_temperature;
            let executed = self.tracked(
                self.client
                    .write_register(HOLDING_TARGET_TEMP, encode_temperature(celsius))
                    .await,
            )?;
            self.echo.record_target_temperature(celsius);
            info!(
                target: "hp.control",
                target_temperature = celsius,
                attempts = executed.attempts,
                "heat_default_temperature_written"
            );
        }
        Ok(())
    }

    /// 校验并写入自动模式偏移（补码编码）。
    pub async fn set_auto_mode_offset(&self, offset_k: i32) -> Result<(), ControlError> {
        let (min, max) = AUTO_OFFSET_RANGE;
        if !(min..=max).contains(&offset_k) {
            return Err(self.rejected(format!("auto mode offset {offset_k}K outside {min}..={max}K")));
        }

        let raw = encode_signed16(offset_k);
        let executed = self.tracked(self.client.write_register(HOLDING_AUTO_OFFSET, raw).await)?;
        self.echo.record_auto_mode_offset(offset_k);
        info!(
            target: "hp.control",
            auto_mode_offset = offset_k,
            raw,
            attempts = executed.attempts,
            "auto_mode_offset_written"
        );
        Ok(())
    }

    async fn run_device_init(&self, init: DeviceInit) -> Result<(), ControlError> {
        let sequence = [
            (HOLDING_CONTROL_METHOD, ControlMethod::WaterOutlet.code()),
            (HOLDING_OP_MODE, LgMode::Heat.code()),
            (HOLDING_ENERGY_STATE, init.energy_state),
        ];
        for (addr, value) in sequence {
            self.tracked(self.client.write_register(addr, value).await)?;
        }
        self.echo.record_lg_mode(LgMode::Heat);
        info!(
            target: "hp.control",
            energy_state = init.energy_state,
            "device_init_written"
        );
        Ok(())
    }

    fn tracked<T>(&self, result: Result<T, ProtocolError>) -> Result<T, ControlError> {
        record_write(result.is_ok());
        result.map_err(|err| {
            warn!(target: "hp.control", error = %err, "write failed");
            ControlError::Modbus(err)
        })
    }

    fn rejected(&self, message: String) -> ControlError {
        record_validation_rejected();
        warn!(target: "hp.control", reason = %message, "write rejected");
        ControlError::Validation(message)
    }
}
