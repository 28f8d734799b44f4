//! 文件抽象层 - VFS 会话层接口
//!
//! 该模块定义了统一的文件操作接口 [`File`] trait。
//!
//! 与 [`crate::Inode`] 的区别：
//!
//! - `File` 是"有状态"的（维护当前 offset），实现 `read/write/lseek` 语义。
//! - `Inode` 是"无状态存储接口"，提供底层随机访问与元数据操作。

use alloc::sync::Arc;
use uapi::fcntl::{OpenFlags, SeekWhence};

use crate::{FsError, Inode, InodeMetadata};

/// 文件操作的统一接口
///
/// 打开的文件以 `Arc<dyn File>` 形式被会话层持有。
pub trait File: Send + Sync {
    /// 检查文件是否可读
    fn readable(&self) -> bool;

    /// 检查文件是否可写
    fn writable(&self) -> bool;

    /// 从文件当前偏移读取数据
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// 向文件当前偏移写入数据
    fn write(&self, buf: &[u8]) -> Result<usize, FsError>;

    /// 获取文件元数据
    fn metadata(&self) -> Result<InodeMetadata, FsError>;

    /// 设置文件偏移量
    fn lseek(&self, _offset: i64, _whence: SeekWhence) -> Result<u64, FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取当前偏移量
    fn offset(&self) -> u64 {
        0
    }

    /// 获取打开标志
    fn flags(&self) -> OpenFlags {
        OpenFlags::empty()
    }

    /// 将文件数据与元数据落盘
    fn fsync(&self) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 从指定位置读取数据（不改变当前偏移，用于 pread）
    fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 向指定位置写入数据（不改变当前偏移，用于 pwrite）
    fn write_at(&self, _offset: u64, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取 Inode
    fn inode(&self) -> Result<Arc<dyn Inode>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 获取 Any trait 引用，用于安全的类型转换
    fn as_any(&self) -> &dyn core::any::Any;
}
