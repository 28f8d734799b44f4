//! 自旋锁实现
//!
//! 基于原子操作实现自旋锁机制，通过 `lock_api::RawMutex` 接入
//! `lock_api` 的 RAII 保护器框架。

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

/// 自旋锁底层实现，提供互斥访问临界区的能力。
///
/// 不可重入：持有锁时再次获取同一把锁将导致死锁。
/// 持有锁期间应避免长时间运行的操作。
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
}

impl RawSpinLock {
    /// 创建一个新的 RawSpinLock 实例。
    pub const fn new() -> Self {
        RawSpinLock {
            lock: AtomicBool::new(false),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    const INIT: RawSpinLock = RawSpinLock::new();

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lock_api::RawMutex as _;

    #[test]
    fn test_lock_unlock_cycle() {
        let raw = RawSpinLock::new();
        assert!(!raw.is_locked());
        raw.lock();
        assert!(raw.is_locked());
        // Safety: 当前上下文持有锁
        unsafe { raw.unlock() };
        assert!(!raw.is_locked());
    }

    #[test]
    fn test_try_lock_contention() {
        let raw = RawSpinLock::new();
        assert!(raw.try_lock());
        assert!(!raw.try_lock());
        // Safety: 当前上下文持有锁
        unsafe { raw.unlock() };
        assert!(raw.try_lock());
        unsafe { raw.unlock() };
    }
}
