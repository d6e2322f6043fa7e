//! 协作式取消令牌
//!
//! 读取线程和扫描线程都在循环中轮询令牌。子令牌在自身或任一祖先被取消时
//! 视为已取消，因此断开连接会同时停止读取线程和正在进行的扫描。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

/// 取消令牌（可克隆，克隆共享同一个取消标志）
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 派生子令牌：取消子令牌不影响父令牌
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// 请求取消
    ///
    /// 使用 Release 确保取消之前的写入对轮询线程可见。
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
            || self.inner.parent.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// 分片睡眠 `duration`，每个 `slice` 检查一次取消
    ///
    /// `duration` 超出 `Instant` 可表示范围时一直睡眠到被取消。
    ///
    /// # 返回
    ///
    /// 若睡眠期间（或开始前）被取消返回 true
    pub fn sleep(&self, duration: Duration, slice: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let slice = slice.max(Duration::from_millis(1));
        loop {
            if self.is_cancelled() {
                return true;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    (deadline - now).min(slice)
                },
                None => slice,
            };
            spin_sleep::sleep(wait);
        }
    }
}
