//! # bhfs - 丢弃存储伪文件系统
//!
//! 一个无后备设备的伪文件系统：普通文件表现为**丢弃存储**。
//! 写入更新文件尺寸与时间戳，但不保留任何字节；读取按已记录的
//! 尺寸合成零字节数据。目录树、链接计数与元数据语义完整，
//! 数据本身永不落地。
//!
//! 通过 [`start`]/[`stop`] 在 [`vfs::FsRegistry`] 上注册/注销
//! `"bhfs"` 类型后即可挂载；挂载不需要设备名，挂载选项被忽略。

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod bhfs;
mod file;
mod inode;

pub use bhfs::{BHFS_MAGIC, BhFs, BhfsType, start, stop};
pub use file::BhfsFile;
pub use inode::BhfsInode;
