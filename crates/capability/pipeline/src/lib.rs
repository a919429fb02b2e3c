//! 轮询循环：唯一的长期后台任务。
//!
//! 每个周期按固定顺序读取线圈 → 离散输入 → 输入寄存器 → 保持寄存器，
//! 解码后整体发布到 `StatusStore`。连续失败达到阈值时重建会话。
//! 轮询本身同时承担保活：设备在约 60 秒内没有成功事务就会退出外部控制模式。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use domain::{
    ConnectionStatus, DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL, RawSample, now_epoch_ms,
    poll_blocks,
};
use hp_normalize::{NormalizeError, decode_status};
use hp_protocol::{ModbusClient, ProtocolError};
use hp_storage::{StatusStore, StatusWriter};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

/// 轮询错误。
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("invalid poller config: {0}")]
    InvalidConfig(String),
    #[error("modbus error: {0}")]
    Modbus(#[from] ProtocolError),
    #[error("decode error: {0}")]
    Decode(#[from] NormalizeError),
}

/// 轮询参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    /// 连续失败多少个周期后重建会话
    pub reconnect_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_threshold: 5,
        }
    }
}

impl PollerConfig {
    fn validated(self) -> Result<Self, PollerError> {
        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(PollerError::InvalidConfig(format!(
                "poll_interval {}s exceeds keepalive bound {}s",
                self.poll_interval.as_secs(),
                MAX_POLL_INTERVAL.as_secs()
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(PollerError::InvalidConfig("poll_interval must be > 0".to_string()));
        }
        if self.reconnect_threshold == 0 {
            return Err(PollerError::InvalidConfig(
                "reconnect_threshold must be > 0".to_string(),
            ));
        }
        Ok(self)
    }
}

struct PollerInner {
    client: ModbusClient,
    config: PollerConfig,
    writer: Mutex<StatusWriter>,
    store: StatusStore,
    consecutive_failures: AtomicU32,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

/// 轮询循环句柄（可克隆，共享同一个后台任务）。
#[derive(Clone)]
pub struct PollingLoop {
    inner: Arc<PollerInner>,
}

impl PollingLoop {
    pub fn new(
        client: ModbusClient,
        config: PollerConfig,
        writer: StatusWriter,
    ) -> Result<Self, PollerError> {
        let config = config.validated()?;
        let store = writer.reader();
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(PollerInner {
                client,
                config,
                writer: Mutex::new(writer),
                store,
                consecutive_failures: AtomicU32::new(0),
                task: std::sync::Mutex::new(None),
                shutdown,
            }),
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> StatusStore {
        self.inner.store.clone()
    }

    /// 启动后台任务；已在运行时返回 `false`。
    pub fn start(&self) -> bool {
        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        self.inner.shutdown.send_replace(false);

        let poller = self.clone();
        *task = Some(tokio::spawn(async move { poller.run().await }));
        info!(
            target: "hp.poller",
            poll_interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            reconnect_threshold = self.inner.config.reconnect_threshold,
            "polling loop started"
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 通知停止并等待当前周期结束、连接关闭。
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "hp.poller", error = %err, "polling task ended abnormally");
            }
        }
    }

    /// 执行一个完整轮询周期并发布快照，返回快照序号。
    ///
    /// 失败时累加连续失败计数，达到阈值的整数倍时调用 `reconnect()`；
    /// 上一次成功的快照保持不变。
    pub async fn run_cycle(&self) -> Result<u64, PollerError> {
        let started = Instant::now();
        match self.collect().await {
            Ok((status, raw)) => {
                self.inner.consecutive_failures.store(0, Ordering::Relaxed);
                let summary = status.to_string();
                let sequence = self.inner.writer.lock().await.publish(status, raw, started);
                hp_telemetry::record_poll_cycle_ok();
                info!(
                    target: "hp.poller",
                    cycle = sequence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "{summary}"
                );
                Ok(sequence)
            }
            Err(err) => {
                let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let threshold = self.inner.config.reconnect_threshold;
                hp_telemetry::record_poll_cycle_failed();
                warn!(
                    target: "hp.poller",
                    consecutive_failures = failures,
                    threshold,
                    error = %err,
                    "poll cycle failed"
                );
                if failures % threshold == 0 {
                    if let Err(reconnect_err) = self.inner.client.connection().reconnect().await {
                        warn!(
                            target: "hp.poller",
                            error = %reconnect_err,
                            "reconnect failed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    pub fn consecutive_failure_count(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.inner.client.connection().reconnect_count()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let connection = self.inner.client.connection();
        ConnectionStatus {
            state: connection.state(),
            consecutive_failure_count: self.consecutive_failure_count(),
            last_success_at_ms: connection.last_success_ms(),
        }
    }

    /// 距离最近一次成功周期的时长。
    pub fn freshness(&self) -> Option<Duration> {
        self.inner.store.age()
    }

    async fn collect(&self) -> Result<(domain::DecodedStatus, RawSample), PollerError> {
        let client = &self.inner.client;
        let mut raw = RawSample::new(now_epoch_ms());
        for block in poll_blocks() {
            if block.region.is_bit() {
                let bits = client.read_bits(block.region, block.start, block.count).await?;
                raw.insert_bits(block.region, block.start, &bits.value);
            } else {
                let words = client.read_words(block.region, block.start, block.count).await?;
                raw.insert_words(block.region, block.start, &words.value);
            }
        }
        let status = decode_status(&raw)?;
        Ok((status, raw))
    }

    async fn run(&self) {
        let mut shutdown = self.inner.shutdown.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            // 错误已在 run_cycle 内记录，循环继续
            let _ = self.run_cycle().await;

            tokio::select! {
                _ = sleep(self.inner.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.inner.client.connection().disconnect().await;
        info!(target: "hp.poller", "polling loop stopped");
    }
}
