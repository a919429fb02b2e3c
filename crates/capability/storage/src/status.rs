//! 最新状态快照

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use domain::{DecodedStatus, RawSample};
use tokio::time::Instant;

use crate::echo::{Echo, WriteEcho};

/// 一个完整轮询周期的结果，发布后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub status: DecodedStatus,
    pub raw: RawSample,
    pub captured_at: Instant,
    pub sequence: u64,
}

#[derive(Default)]
pub(crate) struct Shared {
    pub snapshot: Option<Arc<StatusSnapshot>>,
    pub echo: Echo,
}

/// 创建唯一写入端与只读端。
pub fn status_channel() -> (StatusWriter, StatusStore) {
    let shared = Arc::new(RwLock::new(Shared::default()));
    (
        StatusWriter {
            shared: shared.clone(),
            sequence: 0,
        },
        StatusStore { shared },
    )
}

/// 快照写入端（不可克隆）。
pub struct StatusWriter {
    shared: Arc<RwLock<Shared>>,
    sequence: u64,
}

impl StatusWriter {
    /// 整体替换快照，并清除该周期开始前登记的写入回显。返回快照序号。
    pub fn publish(&mut self, status: DecodedStatus, raw: RawSample, cycle_started_at: Instant) -> u64 {
        self.sequence += 1;
        let snapshot = Arc::new(StatusSnapshot {
            status,
            raw,
            captured_at: Instant::now(),
            sequence: self.sequence,
        });

        let mut shared = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        shared.snapshot = Some(snapshot);
        shared.echo.expire(cycle_started_at);
        self.sequence
    }

    pub fn reader(&self) -> StatusStore {
        StatusStore {
            shared: self.shared.clone(),
        }
    }
}

/// 快照只读端。
#[derive(Clone)]
pub struct StatusStore {
    shared: Arc<RwLock<Shared>>,
}

impl StatusStore {
    /// 最新状态（叠加写入回显）；首次轮询完成前为 `None`。
    pub fn get_latest(&self) -> Option<DecodedStatus> {
        let (snapshot, echo) = self.load();
        snapshot.map(|snapshot| echo.apply(snapshot.status.clone()))
    }

    /// 轮询得到的原始快照，不含写入回显。
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.load().0
    }

    /// 距离最近一次成功快照的时长。
    pub fn age(&self) -> Option<Duration> {
        self.snapshot().map(|snapshot| snapshot.captured_at.elapsed())
    }

    /// 没有快照或快照超过阈值即视为过期。
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.age().is_none_or(|age| age > threshold)
    }

    pub fn echo(&self) -> WriteEcho {
        WriteEcho::new(self.shared.clone())
    }

    fn load(&self) -> (Option<Arc<StatusSnapshot>>, Echo) {
        let shared = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        (shared.snapshot.clone(), shared.echo)
    }
}
