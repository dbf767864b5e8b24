//! 固定间隔轮询
//!
//! 所有等待（设备出现、挂载、对等探测、仲裁、卷可见、服务健康）共用一个抽象：
//! 按固定间隔调用检查函数，直到就绪、检查函数返回致命错误，或超过墙钟上限。
//! 超时在同一次调用内不可恢复，由调用方转成各自的错误类型。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// 轮询策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 两次检查之间的间隔
    pub interval: Duration,
    /// 墙钟上限
    pub ceiling: Duration,
}

impl RetryPolicy {
    pub fn new(interval: Duration, ceiling: Duration) -> Self {
        Self { interval, ceiling }
    }

    /// 设备 / 挂载类操作：1s 间隔，5 分钟上限
    pub fn device() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5 * 60))
    }

    /// 集群类操作：1s 间隔，15 分钟上限
    pub fn cluster() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(15 * 60))
    }
}

/// 单次检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// 条件已满足
    Ready(T),
    /// 暂未满足（瞬时状态），附带原因用于日志
    NotReady(String),
}

/// 等待的最终结果
#[derive(Debug)]
pub enum WaitOutcome<T, E> {
    Ready(T),
    Timeout { elapsed: Duration, attempts: u32 },
    Fatal(E),
}

impl<T, E> WaitOutcome<T, E> {
    /// 转换为 Result，超时由调用方映射为自己的错误
    pub fn into_result(self, on_timeout: impl FnOnce(Duration) -> E) -> Result<T, E> {
        match self {
            WaitOutcome::Ready(value) => Ok(value),
            WaitOutcome::Timeout { elapsed, .. } => Err(on_timeout(elapsed)),
            WaitOutcome::Fatal(e) => Err(e),
        }
    }
}

/// 按策略轮询直到就绪
///
/// # Arguments
/// * `operation` - 操作名称，仅用于日志
/// * `policy` - 间隔与上限
/// * `check` - 检查函数；返回 `Err` 视为致命错误，立即停止
pub async fn wait_for<T, E, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut check: F,
) -> WaitOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
    E: Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match check().await {
            Ok(Probe::Ready(value)) => {
                if attempts > 1 {
                    info!("{} 就绪 (第 {} 次检查, 耗时 {:?})", operation, attempts, start.elapsed());
                }
                return WaitOutcome::Ready(value);
            }
            Ok(Probe::NotReady(reason)) => {
                debug!("{} 未就绪 (第 {} 次): {}", operation, attempts, reason);
            }
            Err(e) => {
                warn!("{} 检查失败，停止等待: {}", operation, e);
                return WaitOutcome::Fatal(e);
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.ceiling {
            warn!(
                "{} 超时: 已等待 {:?} (上限 {:?}), 共检查 {} 次",
                operation, elapsed, policy.ceiling, attempts
            );
            return WaitOutcome::Timeout { elapsed, attempts };
        }

        sleep(policy.interval).await;
    }
}
