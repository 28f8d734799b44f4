//! 与 POSIX 兼容的共用定义和声明
//!
//! 包含常量、类型声明与 I/O 向量游标，供 vfs 与具体文件系统共用。

#![no_std]
#![allow(dead_code)]
// uapi 中包含大量与 Linux 兼容的常量定义；逐项补 `///` 噪声较大。
#![allow(missing_docs)]

extern crate alloc;

pub mod fcntl;
pub mod fs;
pub mod iovec;
pub mod time;
