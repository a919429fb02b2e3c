//! 写入回显
//!
//! 控制写入成功后立即登记写入值，读取方在下一次轮询快照之前即可看到。
//! 快照发布时清除在该周期开始之前登记的回显，之后登记的保留。

use std::sync::{Arc, PoisonError, RwLock};

use domain::{DecodedStatus, LgMode};
use tokio::time::Instant;

use crate::status::Shared;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Echo {
    pub is_on: Option<(bool, Instant)>,
    pub lg_mode: Option<(LgMode, Instant)>,
    pub target_temperature: Option<(f64, Instant)>,
    pub auto_mode_offset: Option<(i32, Instant)>,
}

impl Echo {
    /// 叠加到快照上：先模式，后设定值，保证标签变体携带最新的生效目标。
    pub fn apply(&self, status: DecodedStatus) -> DecodedStatus {
        let mut status = status;
        if let Some((on, _)) = self.is_on {
            status = status.with_power(on);
        }
        if let Some((mode, _)) = self.lg_mode {
            status = status.with_lg_mode(mode);
        }
        if let Some((celsius, _)) = self.target_temperature {
            status = status.with_target_temperature(celsius);
        }
        if let Some((offset_k, _)) = self.auto_mode_offset {
            status = status.with_auto_mode_offset(offset_k);
        }
        status
    }

    /// 丢弃在 `cycle_started_at` 之前登记的回显。
    pub fn expire(&mut self, cycle_started_at: Instant) {
        fn expire_slot<T>(slot: &mut Option<(T, Instant)>, cycle_started_at: Instant) {
            if matches!(slot, Some((_, at)) if *at <= cycle_started_at) {
                *slot = None;
            }
        }
        expire_slot(&mut self.is_on, cycle_started_at);
        expire_slot(&mut self.lg_mode, cycle_started_at);
        expire_slot(&mut self.target_temperature, cycle_started_at);
        expire_slot(&mut self.auto_mode_offset, cycle_started_at);
    }
}

/// 写入回显句柄（可克隆）。
#[derive(Clone)]
pub struct WriteEcho {
    shared: Arc<RwLock<Shared>>,
}

impl WriteEcho {
    pub(crate) fn new(shared: Arc<RwLock<Shared>>) -> Self {
        Self { shared }
    }

    pub fn record_power(&self, on: bool) {
        self.update(|echo| echo.is_on = Some((on, Instant::now())));
    }

    pub fn record_lg_mode(&self, mode: LgMode) {
        self.update(|echo| echo.lg_mode = Some((mode, Instant::now())));
    }

    pub fn record_target_temperature(&self, celsius: f64) {
        self.update(|echo| echo.target_temperature = Some((celsius, Instant::now())));
    }

    pub fn record_auto_mode_offset(&self, offset_k: i32) {
        self.update(|echo| echo.auto_mode_offset = Some((offset_k, Instant::now())));
    }

    fn update(&self, f: impl FnOnce(&mut Echo)) {
        let mut shared = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut shared.echo);
    }
}
