//! 时间相关定义

/// 纳秒精度时间戳（与 POSIX `struct timespec` 对应）
///
/// 派生的 `Ord` 按 (sec, nsec) 字典序比较；`nsec` 始终保持在
/// `[0, NSEC_PER_SEC)` 区间内时该顺序即为时间先后顺序。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpec {
    /// 秒
    pub sec: i64,
    /// 纳秒，规范化到 `[0, NSEC_PER_SEC)`
    pub nsec: i64,
}

/// 每秒纳秒数
pub const NSEC_PER_SEC: i64 = 1_000_000_000;

impl TimeSpec {
    /// 零时刻
    pub const ZERO: TimeSpec = TimeSpec { sec: 0, nsec: 0 };

    /// 创建新的时间戳
    pub const fn new(sec: i64, nsec: i64) -> Self {
        TimeSpec { sec, nsec }
    }

    /// 由总纳秒数构造（自动规范化）
    pub const fn from_nanos(nanos: i64) -> Self {
        TimeSpec {
            sec: nanos / NSEC_PER_SEC,
            nsec: nanos % NSEC_PER_SEC,
        }
    }

    /// 转换为总纳秒数
    pub const fn as_nanos(&self) -> i64 {
        self.sec * NSEC_PER_SEC + self.nsec
    }
}
