//! I/O 向量游标
//!
//! 对一组不连续缓冲区提供顺序访问能力，支持截断、推进与清零填充，
//! 并对部分传输做精确计数。读写路径以游标为单位消费缓冲区，
//! 调用方据此在多次部分传输之间正确续传。

use alloc::vec;
use alloc::vec::Vec;

/// 只读 I/O 向量游标（写入路径的数据来源）
pub struct IovIter<'a> {
    segs: Vec<&'a [u8]>,
    seg_idx: usize,
    seg_off: usize,
    remaining: usize,
}

impl<'a> IovIter<'a> {
    /// 由一组缓冲区段构造
    pub fn new(segs: Vec<&'a [u8]>) -> Self {
        let remaining = segs.iter().map(|s| s.len()).sum();
        IovIter {
            segs,
            seg_idx: 0,
            seg_off: 0,
            remaining,
        }
    }

    /// 由单个缓冲区构造
    pub fn from_buf(buf: &'a [u8]) -> Self {
        Self::new(vec![buf])
    }

    /// 剩余字节数
    pub fn count(&self) -> usize {
        self.remaining
    }

    /// 将剩余字节数截断到不超过 `max`
    pub fn truncate(&mut self, max: usize) {
        self.remaining = self.remaining.min(max);
    }

    /// 向前推进 `len` 字节（最多推进到剩余末尾），返回实际推进量
    pub fn advance(&mut self, len: usize) -> usize {
        let want = len.min(self.remaining);
        let mut done = 0;
        while done < want {
            let Some(seg) = self.segs.get(self.seg_idx) else {
                break;
            };
            if self.seg_off >= seg.len() {
                self.seg_idx += 1;
                self.seg_off = 0;
                continue;
            }
            let step = (seg.len() - self.seg_off).min(want - done);
            self.seg_off += step;
            done += step;
        }
        self.remaining -= done;
        done
    }
}

/// 可写 I/O 向量游标（读取路径的数据去向）
pub struct IovIterMut<'a> {
    segs: Vec<&'a mut [u8]>,
    seg_idx: usize,
    seg_off: usize,
    remaining: usize,
}

impl<'a> IovIterMut<'a> {
    /// 由一组缓冲区段构造
    pub fn new(segs: Vec<&'a mut [u8]>) -> Self {
        let remaining = segs.iter().map(|s| s.len()).sum();
        IovIterMut {
            segs,
            seg_idx: 0,
            seg_off: 0,
            remaining,
        }
    }

    /// 由单个缓冲区构造
    pub fn from_buf(buf: &'a mut [u8]) -> Self {
        Self::new(vec![buf])
    }

    /// 剩余字节数
    pub fn count(&self) -> usize {
        self.remaining
    }

    /// 将剩余字节数截断到不超过 `max`
    pub fn truncate(&mut self, max: usize) {
        self.remaining = self.remaining.min(max);
    }

    /// 向目标填充 `len` 字节的零并推进游标，返回实际填充量
    ///
    /// 返回 0 且仍有剩余字节时，表示目标缓冲区无法继续接收数据。
    pub fn zero(&mut self, len: usize) -> usize {
        let want = len.min(self.remaining);
        let mut done = 0;
        while done < want {
            let Some(seg) = self.segs.get_mut(self.seg_idx) else {
                break;
            };
            if self.seg_off >= seg.len() {
                self.seg_idx += 1;
                self.seg_off = 0;
                continue;
            }
            let step = (seg.len() - self.seg_off).min(want - done);
            seg[self.seg_off..self.seg_off + step].fill(0);
            self.seg_off += step;
            done += step;
        }
        self.remaining -= done;
        done
    }
}
