//! 通用写入前检查
//!
//! 在任何数据被消费之前，对写入请求做标准的偏移/尺寸检查：
//! 解析追加写模式的实际起点，按最大文件尺寸拒绝或截短请求。
//! 所有文件系统的写路径共用此检查，保证统一的 POSIX 语义。

use uapi::fcntl::OpenFlags;

use crate::FsError;

/// 写入前检查
///
/// - `O_APPEND` 模式下写入起点被重新解析为当前文件尺寸 `size`；
/// - 起点已达 `max_bytes` 时返回 `FileTooLarge`；
/// - 跨越 `max_bytes` 的请求被截短；
/// - 零长请求直接通过（返回长度 0）。
///
/// 返回实际生效的 `(起点偏移, 接受长度)`。
pub fn generic_write_checks(
    flags: OpenFlags,
    pos: u64,
    count: usize,
    size: u64,
    max_bytes: u64,
) -> Result<(u64, usize), FsError> {
    let pos = if flags.append() { size } else { pos };

    if count == 0 {
        return Ok((pos, 0));
    }

    if pos >= max_bytes {
        return Err(FsError::FileTooLarge);
    }

    let limit = max_bytes - pos;
    let count = if (count as u64) > limit {
        limit as usize
    } else {
        count
    };

    Ok((pos, count))
}
