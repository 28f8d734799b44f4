//! VFS 运行时操作 trait 定义和注册
//!
//! 此模块定义了 VFS 层及具体文件系统需要的外部运行时依赖接口，
//! 通过 trait 抽象实现与宿主环境的解耦。宿主（内核或测试环境）
//! 需要实现此 trait 并在启动时注册。

use core::sync::atomic::{AtomicUsize, Ordering};
use uapi::time::TimeSpec;

/// VFS 运行时操作
///
/// 此 trait 抽象了文件系统代码需要的运行时操作：时钟、页大小、
/// 未决信号探测与调度让出。
pub trait VfsOps: Send + Sync {
    /// 获取当前时间
    fn timespec_now(&self) -> TimeSpec;

    /// 获取页大小（I/O 路径按页分块）
    fn page_size(&self) -> usize;

    /// 探测当前执行流是否有未决的取消信号
    fn signal_pending(&self) -> bool;

    /// 让出调度器（长传输的协作点）
    fn yield_now(&self);
}

// ========== VfsOps 注册 ==========

static VFS_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static VFS_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册 VFS 操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_vfs_ops(ops: &'static dyn VfsOps) {
    let ptr = ops as *const dyn VfsOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn VfsOps, (usize, usize)>(ptr) };
    VFS_OPS_DATA.store(data, Ordering::Release);
    VFS_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的 VFS 操作实现
///
/// # Panics
/// 如果尚未调用 [`register_vfs_ops`] 注册实现，则 panic
#[inline]
pub fn vfs_ops() -> &'static dyn VfsOps {
    let data = VFS_OPS_DATA.load(Ordering::Acquire);
    let vtable = VFS_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("vfs: VfsOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn VfsOps>((data, vtable)) }
}
