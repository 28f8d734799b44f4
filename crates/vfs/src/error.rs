//! VFS 错误类型
//!
//! 定义了与 POSIX 兼容的文件系统错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    /// 文件不存在 (-ENOENT)
    NotFound,
    /// 文件已存在 (-EEXIST)
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,
    /// 文件名过长 (-ENAMETOOLONG)
    NameTooLong,

    // 权限相关
    /// 权限被拒绝 (-EACCES)
    PermissionDenied,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,

    // I/O 相关
    /// 操作被信号打断，可重新发起 (-EINTR)
    ///
    /// 读取路径在分块之间观察到未决信号时返回；已产生的字节保留。
    Interrupted,
    /// 目标缓冲区无法继续接收数据 (-EFAULT)
    BadAddress,
    /// 文件过大 (-EFBIG)
    FileTooLarge,
    /// I/O 错误 (-EIO)
    IoError,

    // 文件系统相关
    /// 元数据池耗尽 (-ENOSPC)
    NoSpace,
    /// 内存不足 (-ENOMEM)
    OutOfMemory,
    /// 只读文件系统 (-EROFS)
    ReadOnlyFs,
    /// 文件系统类型/设备不存在 (-ENODEV)
    NoDevice,

    // 其他
    /// 操作不支持 (-ENOTSUP)
    NotSupported,
    /// 硬链接过多 (-EMLINK)
    TooManyLinks,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            FsError::NotFound => -2,
            FsError::Interrupted => -4,
            FsError::IoError => -5,
            FsError::OutOfMemory => -12,
            FsError::PermissionDenied => -13,
            FsError::BadAddress => -14,
            FsError::AlreadyExists => -17,
            FsError::NoDevice => -19,
            FsError::NotDirectory => -20,
            FsError::IsDirectory => -21,
            FsError::InvalidArgument => -22,
            FsError::FileTooLarge => -27,
            FsError::NoSpace => -28,
            FsError::ReadOnlyFs => -30,
            FsError::TooManyLinks => -31,
            FsError::NameTooLong => -36,
            FsError::DirectoryNotEmpty => -39,
            FsError::NotSupported => -95,
        }
    }
}
