//! 追踪、请求 ID 生成与引擎计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub transactions_ok: u64,
    pub attempt_failures: u64,
    pub retries_exhausted: u64,
    pub poll_cycles_ok: u64,
    pub poll_cycles_failed: u64,
    pub reconnects: u64,
    pub writes_ok: u64,
    pub writes_failed: u64,
    pub validation_rejected: u64,
    pub transaction_latency_ms_total: u64,
    pub transaction_latency_ms_count: u64,
}

/// 引擎计数器。
pub struct TelemetryMetrics {
    transactions_ok: AtomicU64,
    attempt_failures: AtomicU64,
    retries_exhausted: AtomicU64,
    poll_cycles_ok: AtomicU64,
    poll_cycles_failed: AtomicU64,
    reconnects: AtomicU64,
    writes_ok: AtomicU64,
    writes_failed: AtomicU64,
    validation_rejected: AtomicU64,
    transaction_latency_ms_total: AtomicU64,
    transaction_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            transactions_ok: AtomicU64::new(0),
            attempt_failures: AtomicU64::new(0),
            retries_exhausted: AtomicU64::new(0),
            poll_cycles_ok: AtomicU64::new(0),
            poll_cycles_failed: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            writes_ok: AtomicU64::new(0),
            writes_failed: AtomicU64::new(0),
            validation_rejected: AtomicU64::new(0),
            transaction_latency_ms_total: AtomicU64::new(0),
            transaction_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transactions_ok: self.transactions_ok.load(Ordering::Relaxed),
            attempt_failures: self.attempt_failures.load(Ordering::Relaxed),
            retries_exhausted: self.retries_exhausted.load(Ordering::Relaxed),
            poll_cycles_ok: self.poll_cycles_ok.load(Ordering::Relaxed),
            poll_cycles_failed: self.poll_cycles_failed.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            writes_ok: self.writes_ok.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            validation_rejected: self.validation_rejected.load(Ordering::Relaxed),
            transaction_latency_ms_total: self.transaction_latency_ms_total.load(Ordering::Relaxed),
            transaction_latency_ms_count: self.transaction_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录一次成功事务及其耗时。
pub fn record_transaction_ok(latency_ms: u64) {
    let metrics = metrics();
    metrics.transactions_ok.fetch_add(1, Ordering::Relaxed);
    metrics
        .transaction_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .transaction_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录单次失败尝试。
pub fn record_attempt_failure() {
    metrics().attempt_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录重试耗尽次数。
pub fn record_retries_exhausted() {
    metrics().retries_exhausted.fetch_add(1, Ordering::Relaxed);
}

pub fn record_poll_cycle_ok() {
    metrics().poll_cycles_ok.fetch_add(1, Ordering::Relaxed);
}

pub fn record_poll_cycle_failed() {
    metrics().poll_cycles_failed.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reconnect() {
    metrics().reconnects.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入结果。
pub fn record_write(success: bool) {
    if success {
        metrics().writes_ok.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics().writes_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// 记录参数校验拒绝次数。
pub fn record_validation_rejected() {
    metrics().validation_rejected.fetch_add(1, Ordering::Relaxed);
}
