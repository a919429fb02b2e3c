//! 事务重试
//!
//! 每个事务最多尝试 `max_attempts` 次，第 n 次失败后等待
//! `backoff[min(n-1, len-1)]` 再重试。参数错误（Fatal）立即返回。
//! 每次尝试都会输出一条结构化日志，并回调可选的 `AttemptObserver`，
//! 用于事后分析总线冲突。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{ErrorKind, ProtocolError};

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6),
            ],
        }
    }
}

impl RetryPolicy {
    /// 第 `failed_attempt` 次失败之后的等待时间。
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        if self.backoff.is_empty() {
            return Duration::ZERO;
        }
        let index = (failed_attempt.saturating_sub(1) as usize).min(self.backoff.len() - 1);
        self.backoff[index]
    }
}

/// 单次尝试的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// 失败，随后会重试
    Retrying,
    /// 失败，不再重试
    GaveUp,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Retrying => "retrying",
            AttemptOutcome::GaveUp => "gave_up",
        }
    }
}

/// 单次尝试记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub operation: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: AttemptOutcome,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

/// 尝试观察者。
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, record: &AttemptRecord);
}

/// 成功结果及实际尝试次数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed<T> {
    pub value: T,
    pub attempts: u32,
}

/// 重试执行器
#[derive(Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行 `op`，按策略重试瞬时错误。
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
    ) -> Result<Executed<T>, ProtocolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProtocolError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => {
                    self.observe(operation, attempt, max_attempts, AttemptOutcome::Success, None);
                    return Ok(Executed {
                        value,
                        attempts: attempt,
                    });
                }
                Err(err) => err,
            };

            hp_telemetry::record_attempt_failure();

            if !err.is_retryable() {
                self.observe(operation, attempt, max_attempts, AttemptOutcome::GaveUp, Some(&err));
                return Err(err);
            }

            if attempt >= max_attempts {
                self.observe(operation, attempt, max_attempts, AttemptOutcome::GaveUp, Some(&err));
                hp_telemetry::record_retries_exhausted();
                return Err(ProtocolError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            self.observe(operation, attempt, max_attempts, AttemptOutcome::Retrying, Some(&err));
            sleep(self.policy.delay_after(attempt)).await;
        }
    }

    fn observe(
        &self,
        operation: &str,
        attempt: u32,
        max_attempts: u32,
        outcome: AttemptOutcome,
        error: Option<&ProtocolError>,
    ) {
        let error_kind = error.map(ProtocolError::kind);
        match error {
            None => info!(
                target: "hp.retry",
                operation,
                attempt,
                max_attempts,
                outcome = outcome.as_str(),
                "modbus attempt"
            ),
            Some(err) => warn!(
                target: "hp.retry",
                operation,
                attempt,
                max_attempts,
                outcome = outcome.as_str(),
                error_kind = error_kind.map(ErrorKind::as_str).unwrap_or_default(),
                error = %err,
                "modbus attempt"
            ),
        }

        if let Some(observer) = &self.observer {
            observer.on_attempt(&AttemptRecord {
                operation: operation.to_string(),
                attempt,
                max_attempts,
                outcome,
                error_kind,
                error: error.map(ToString::to_string),
            });
        }
    }
}
