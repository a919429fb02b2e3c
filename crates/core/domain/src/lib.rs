//! 热泵控制引擎的核心领域模型。
//!
//! - `registers`: 静态寄存器表与分区
//! - `data`: 单次轮询的原始采样
//! - `status`: 解码后的设备状态（模式为带标签的变体）
//! - `connection`: 会话状态与连续失败计数

use std::time::Duration;

pub mod connection;
pub mod data;
pub mod registers;
pub mod status;

pub use connection::{ConnectionState, ConnectionStatus};
pub use data::{RawSample, now_epoch_ms};
pub use registers::{REGISTER_MAP, ReadBlock, Region, RegisterDef, poll_blocks};
pub use status::{ControlMethod, DecodedStatus, LgMode, ModeSetting, OperatingCycle};

/// 设备保活时限：超过该时长没有成功事务，热泵会自行退出外部控制模式。
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// 轮询间隔上限，为保活时限保留一半余量。
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// 默认轮询间隔。
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
