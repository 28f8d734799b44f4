//! 文件打开标志与 lseek 定义

bitflags::bitflags! {
    /// 文件打开标志（与 Linux `fcntl.h` 兼容）
    ///
    /// `O_RDONLY` 为 0，无法作为独立位表示；通过 [`OpenFlags::readable`]
    /// 判断可读性。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// 只写
        const O_WRONLY    = 0o1;
        /// 读写
        const O_RDWR      = 0o2;
        /// 不存在时创建
        const O_CREAT     = 0o100;
        /// 与 O_CREAT 连用，已存在则失败
        const O_EXCL      = 0o200;
        /// 打开时截断为 0
        const O_TRUNC     = 0o1000;
        /// 追加写：每次写入前偏移移到文件末尾
        const O_APPEND    = 0o2000;
        /// 非阻塞
        const O_NONBLOCK  = 0o4000;
        /// 必须是目录
        const O_DIRECTORY = 0o200000;
        /// exec 时关闭
        const O_CLOEXEC   = 0o2000000;
    }
}

impl OpenFlags {
    /// 检查是否可读
    pub fn readable(&self) -> bool {
        !self.contains(OpenFlags::O_WRONLY)
    }

    /// 检查是否可写
    pub fn writable(&self) -> bool {
        self.intersects(OpenFlags::O_WRONLY | OpenFlags::O_RDWR)
    }

    /// 检查是否为追加写模式
    pub fn append(&self) -> bool {
        self.contains(OpenFlags::O_APPEND)
    }
}

/// lseek 的起点（与 POSIX `SEEK_*` 对应）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// 从文件开头
    Set = 0,
    /// 从当前偏移
    Cur = 1,
    /// 从文件末尾
    End = 2,
}
