//! Mock 运行时操作
//!
//! [`MockVfsOps`] 为文件系统测试提供确定性的时钟、可控的未决信号
//! 与调度让出计数。时基是进程级的，每次取值前进 1ns，跨线程保持
//! 严格递增；时钟回退通过按线程隔离的偏移模拟，信号与让出计数
//! 同样按线程隔离，并行运行的测试互不干扰。

use std::cell::Cell;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use uapi::time::TimeSpec;
use vfs::VfsOps;

/// Mock 页大小（字节）
pub const PAGE_SIZE: usize = 4096;

// 进程级时基，每次取值前进 1ns
static CLOCK_NANOS: AtomicI64 = AtomicI64::new(1_000_000_000);

thread_local! {
    // 本线程观察时钟时对全局时基附加的偏移，用于模拟时钟回退
    static CLOCK_SKEW: Cell<i64> = const { Cell::new(0) };
    static SIGNAL_PENDING: Cell<bool> = const { Cell::new(false) };
    static YIELD_COUNT: Cell<usize> = const { Cell::new(0) };
}

/// Mock VFS 运行时操作实现
pub struct MockVfsOps;

impl VfsOps for MockVfsOps {
    fn timespec_now(&self) -> TimeSpec {
        let base = CLOCK_NANOS.fetch_add(1, Ordering::AcqRel) + 1;
        let skew = CLOCK_SKEW.with(|s| s.get());
        TimeSpec::from_nanos(base + skew)
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    fn signal_pending(&self) -> bool {
        SIGNAL_PENDING.with(|s| s.get())
    }

    fn yield_now(&self) {
        YIELD_COUNT.with(|y| y.set(y.get() + 1));
    }
}

static MOCK_VFS_OPS: MockVfsOps = MockVfsOps;
// 0 = uninit, 1 = initializing, 2 = ready
static INIT_STATE: AtomicUsize = AtomicUsize::new(0);

/// 一次性注册 Mock 运行时操作
///
/// 可从任意测试调用任意多次，注册只发生一次。
pub fn init() {
    match INIT_STATE.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: 注册仅由赢得 CAS 的线程执行一次
            unsafe { vfs::register_vfs_ops(&MOCK_VFS_OPS) };
            INIT_STATE.store(2, Ordering::Release);
        }
        Err(_) => {
            while INIT_STATE.load(Ordering::Acquire) != 2 {
                std::hint::spin_loop();
            }
        }
    }
}

/// 设置当前线程的未决信号状态
pub fn set_signal_pending(pending: bool) {
    SIGNAL_PENDING.with(|s| s.set(pending));
}

/// 将当前线程观察到的时钟前移（或以负值回退）指定纳秒数
///
/// 只影响调用线程，其他线程看到的时钟不变。
pub fn advance_clock(nanos: i64) {
    CLOCK_SKEW.with(|s| s.set(s.get() + nanos));
}

/// 当前线程的调度让出次数
pub fn yield_count() -> usize {
    YIELD_COUNT.with(|y| y.get())
}

/// 清零当前线程的调度让出计数
pub fn reset_yield_count() {
    YIELD_COUNT.with(|y| y.set(0));
}
