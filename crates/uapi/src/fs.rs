//! 文件系统通用常量

/// 大文件支持下的最大文件尺寸（字节）
pub const MAX_LFS_FILESIZE: u64 = i64::MAX as u64;

/// 单个文件名的最大长度
pub const NAME_MAX: usize = 255;
