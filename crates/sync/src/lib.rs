//! 同步原语
//!
//! 向工作区其它模块提供基本的互斥原语。锁的语义由 `lock_api`
//! 的类型骨架提供，底层的自旋获取逻辑见 [`RawSpinLock`]。

#![no_std]

#[cfg(test)]
extern crate std;

mod raw_spin_lock;
mod spin_lock;

pub use raw_spin_lock::RawSpinLock;
pub use spin_lock::{SpinLock, SpinLockGuard};
