//! 虚拟文件系统层
//!
//! 此 crate 提供 POSIX 兼容的虚拟文件系统抽象，包括：
//!
//! - [`File`] trait - 文件操作接口
//! - [`Inode`] trait - 索引节点接口
//! - [`FileSystem`] / [`FileSystemType`] trait - 文件系统接口与类型
//! - [`FsRegistry`] - 文件系统类型注册表
//! - [`generic_write_checks`] - 通用写入前检查
//! - [`VfsOps`] - 运行时操作注册

#![no_std]

extern crate alloc;

mod error;
mod file;
mod file_system;
mod inode;
pub mod ops;
mod registry;
mod write_checks;

// Re-export error
pub use error::FsError;

// Re-export file
pub use file::File;

// Re-export inode
pub use inode::{DirEntry, FileMode, Inode, InodeMetadata, InodeType};

// Re-export file_system
pub use file_system::{FileSystem, StatFs};

// Re-export registry
pub use registry::{FileSystemType, FsRegistry, MountFlags};

// Re-export ops
pub use ops::{VfsOps, register_vfs_ops, vfs_ops};

// Re-export write_checks
pub use write_checks::generic_write_checks;

// Re-export uapi types for convenience
pub use uapi::fcntl::{OpenFlags, SeekWhence};
pub use uapi::iovec::{IovIter, IovIterMut};
pub use uapi::time::TimeSpec;
