//! Bhfs 打开文件句柄
//!
//! [`BhfsFile`] 把打开标志与一个受锁保护的偏移绑定到 inode 上。
//! 顺序读写推进偏移；被中断的读同样提交已产生的进度，调用方可在
//! 原地重试。定位读写绕过偏移，直接落到 inode 引擎。

use alloc::sync::Arc;
use core::any::Any;

use sync::SpinLock;
use vfs::{File, FsError, InodeMetadata, InodeType, IovIter, IovIterMut, OpenFlags, SeekWhence};

use crate::inode::BhfsInode;

/// Bhfs 文件句柄
pub struct BhfsFile {
    inode: Arc<BhfsInode>,
    flags: OpenFlags,
    /// 顺序读写的当前偏移
    offset: SpinLock<u64>,
}

impl BhfsFile {
    /// 以给定标志打开一个 inode
    ///
    /// 目录不支持按字节的文件句柄语义，拒绝打开。
    pub fn new(inode: Arc<BhfsInode>, flags: OpenFlags) -> Result<Arc<Self>, FsError> {
        if inode.inode_type() == InodeType::Directory {
            return Err(FsError::IsDirectory);
        }
        Ok(Arc::new(BhfsFile {
            inode,
            flags,
            offset: SpinLock::new(0),
        }))
    }
}

impl File for BhfsFile {
    fn readable(&self) -> bool {
        self.flags.readable()
    }

    fn writable(&self) -> bool {
        self.flags.writable()
    }

    /// 从当前偏移顺序读取
    ///
    /// 偏移按实际产生的字节数推进，即使随后报告中断或坏地址。
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.readable() {
            return Err(FsError::PermissionDenied);
        }

        let mut offset = self.offset.lock();
        let mut iter = IovIterMut::from_buf(buf);
        let (n, abort) = self.inode.read_iter(*offset, &mut iter);
        *offset += n as u64;

        match abort {
            Some(err) => Err(err),
            None => Ok(n),
        }
    }

    /// 向当前偏移顺序写入
    fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable() {
            return Err(FsError::PermissionDenied);
        }

        let mut offset = self.offset.lock();
        let mut iter = IovIter::from_buf(buf);
        let (new_pos, count) = self.inode.write_iter(self.flags, *offset, &mut iter)?;
        *offset = new_pos;

        Ok(count)
    }

    fn metadata(&self) -> Result<InodeMetadata, FsError> {
        vfs::Inode::metadata(&*self.inode)
    }

    fn lseek(&self, offset: i64, whence: SeekWhence) -> Result<u64, FsError> {
        let mut cur = self.offset.lock();
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => *cur as i64,
            SeekWhence::End => self.inode.size_read() as i64,
        };
        let new_pos = base.checked_add(offset).ok_or(FsError::InvalidArgument)?;
        if new_pos < 0 {
            return Err(FsError::InvalidArgument);
        }

        // 允许越过文件末尾：后续写入把文件撑大
        *cur = new_pos as u64;
        Ok(*cur)
    }

    fn offset(&self) -> u64 {
        *self.offset.lock()
    }

    fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// 没有后备存储，没有可冲刷的数据
    fn fsync(&self) -> Result<(), FsError> {
        vfs::Inode::sync(&*self.inode)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.readable() {
            return Err(FsError::PermissionDenied);
        }
        vfs::Inode::read_at(&*self.inode, offset, buf)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable() {
            return Err(FsError::PermissionDenied);
        }
        let mut iter = IovIter::from_buf(buf);
        let (_new_pos, count) = self.inode.write_iter(self.flags, offset, &mut iter)?;
        Ok(count)
    }

    fn inode(&self) -> Result<Arc<dyn vfs::Inode>, FsError> {
        Ok(self.inode.clone() as Arc<dyn vfs::Inode>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
