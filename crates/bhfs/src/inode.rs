//! Bhfs Inode 实现
//!
//! [`BhfsInode`] 承担三个角色：inode 工厂（分配与按类型初始化）、
//! 目录变更器（create/mkdir/link/unlink/rmdir/rename）以及 I/O 模拟
//! 引擎（零填充读取与只记尺寸的丢弃写入）。文件数据从不保留，
//! 尺寸字段是唯一的权威。
//!
//! 锁序：目录项表锁（children）先于元数据锁（meta）。读路径不取
//! 排他锁，只依赖尺寸字段的原子读取；写路径全程持有元数据锁，
//! 同一 inode 上的写因此互相串行。

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sync::SpinLock;
use uapi::fs::NAME_MAX;
use vfs::{
    DirEntry, FileMode, FsError, Inode, InodeMetadata, InodeType, IovIter, IovIterMut, OpenFlags,
    TimeSpec, generic_write_checks, vfs_ops,
};

/// 每挂载实例共享的限额与计数
pub(crate) struct BhfsShared {
    /// 单个文件的最大尺寸（字节）
    pub(crate) max_bytes: u64,
    /// 块大小（字节），取平台页大小
    pub(crate) block_size: usize,
    counters: SpinLock<BhfsCounters>,
}

struct BhfsCounters {
    next_ino: u64,
    live_inodes: usize,
    max_inodes: usize,
}

impl BhfsShared {
    pub(crate) fn new(max_bytes: u64, block_size: usize, max_inodes: usize) -> Self {
        BhfsShared {
            max_bytes,
            block_size,
            counters: SpinLock::new(BhfsCounters {
                next_ino: 1,
                live_inodes: 0,
                max_inodes,
            }),
        }
    }

    /// 分配下一个 inode 编号
    ///
    /// 编号池耗尽（`max_inodes` 上限，0 表示无限制）是元数据操作
    /// 报告"空间不足"的唯一来源。
    fn alloc_ino(&self) -> Result<u64, FsError> {
        let mut counters = self.counters.lock();
        if counters.max_inodes != 0 && counters.live_inodes >= counters.max_inodes {
            return Err(FsError::NoSpace);
        }
        counters.live_inodes += 1;
        let ino = counters.next_ino;
        counters.next_ino += 1;
        Ok(ino)
    }

    pub(crate) fn release_inode(&self) {
        let mut counters = self.counters.lock();
        counters.live_inodes = counters.live_inodes.saturating_sub(1);
    }

    pub(crate) fn live_inodes(&self) -> usize {
        self.counters.lock().live_inodes
    }
}

/// Inode 元数据（尺寸单独存放，见 [`BhfsInode::size`]）
struct Meta {
    inode_no: u64,
    inode_type: InodeType,
    mode: FileMode,
    uid: u32,
    gid: u32,
    atime: TimeSpec,
    mtime: TimeSpec,
    ctime: TimeSpec,
    nlinks: usize,
    rdev: u64,
}

/// Bhfs Inode
pub struct BhfsInode {
    /// 元数据；写路径全程持有此锁
    meta: SpinLock<Meta>,

    /// 逻辑数据终点偏移。读路径无锁地原子读取该字段，与并发写
    /// 之间是弱一致的：读者观察到的是调用期间某一时刻有效的值。
    size: AtomicU64,

    /// 尺寸变化后待元数据回写的标记
    dirty: AtomicBool,

    /// 子节点（仅对目录有效）；表中的 Arc 即钉住目录项的额外引用
    children: SpinLock<BTreeMap<String, Arc<BhfsInode>>>,

    /// 父目录（弱引用，避免循环引用）
    parent: SpinLock<Weak<BhfsInode>>,

    /// 指向自身的弱引用
    self_ref: SpinLock<Weak<BhfsInode>>,

    /// 挂载实例共享状态
    shared: Arc<BhfsShared>,
}

fn check_name(name: &str) -> Result<(), FsError> {
    if name.len() > NAME_MAX {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

impl BhfsInode {
    /// 分配并按类型初始化一个新 inode
    ///
    /// 类型由 `mode` 的类型位决定；所有者继承自 `parent`（根目录
    /// 取 0/0）；三个时间戳初始化为当前时钟。字符/块设备是保留的
    /// 占位变体，目录变更操作不会创建它们。
    ///
    /// # Panics
    /// `mode` 携带无法识别的类型位属于调用方契约违例，直接 panic。
    pub(crate) fn new(
        shared: &Arc<BhfsShared>,
        parent: Option<&Arc<BhfsInode>>,
        mode: FileMode,
        rdev: u64,
    ) -> Result<Arc<Self>, FsError> {
        let inode_no = shared.alloc_ino()?;
        let now = vfs_ops().timespec_now();

        let type_bits = mode & FileMode::S_IFMT;
        let inode_type = if type_bits == FileMode::S_IFREG {
            InodeType::File
        } else if type_bits == FileMode::S_IFDIR {
            InodeType::Directory
        } else if type_bits == FileMode::S_IFCHR {
            InodeType::CharDevice
        } else if type_bits == FileMode::S_IFBLK {
            InodeType::BlockDevice
        } else {
            panic!("bhfs: unrecognized inode mode {:#o}", mode.bits());
        };

        let (uid, gid) = match parent {
            Some(dir) => {
                let meta = dir.meta.lock();
                (meta.uid, meta.gid)
            }
            None => (0, 0),
        };

        let inode = Arc::new(BhfsInode {
            meta: SpinLock::new(Meta {
                inode_no,
                inode_type,
                mode,
                uid,
                gid,
                atime: now,
                mtime: now,
                ctime: now,
                nlinks: 1,
                rdev,
            }),
            size: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            children: SpinLock::new(BTreeMap::new()),
            parent: SpinLock::new(parent.map_or_else(Weak::new, Arc::downgrade)),
            self_ref: SpinLock::new(Weak::new()),
            shared: shared.clone(),
        });

        if inode_type == InodeType::Directory {
            // 目录自带 "." 自引用：链接数从 1 提升到 2。
            // 根目录不再接受父目录的递增。
            inode.meta.lock().nlinks += 1;
        }

        *inode.self_ref.lock() = Arc::downgrade(&inode);

        Ok(inode)
    }

    /// 创建根目录 inode
    pub(crate) fn new_root(shared: &Arc<BhfsShared>) -> Result<Arc<Self>, FsError> {
        Self::new(
            shared,
            None,
            FileMode::S_IFDIR | FileMode::from_bits_truncate(0o755),
            0,
        )
    }

    /// 无锁读取当前尺寸
    pub(crate) fn size_read(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub(crate) fn inode_type(&self) -> InodeType {
        self.meta.lock().inode_type
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn ino(&self) -> u64 {
        self.meta.lock().inode_no
    }

    fn is_dir(&self) -> bool {
        self.meta.lock().inode_type == InodeType::Directory
    }

    fn check_dir(&self) -> Result<(), FsError> {
        if self.is_dir() {
            Ok(())
        } else {
            Err(FsError::NotDirectory)
        }
    }

    fn touch_atime(&self) {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        if now > meta.atime {
            meta.atime = now;
        }
    }

    fn touch_mtime(&self) {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        if now > meta.mtime {
            meta.mtime = now;
            meta.ctime = now;
        }
    }

    fn touch_ctime(&self) {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        if now > meta.ctime {
            meta.ctime = now;
        }
    }

    /// 写路径的修改时间更新
    ///
    /// 检查已通过后、尺寸变更前调用；失败时写入中止，尺寸保持不变。
    /// 时钟回退会破坏时间戳单调不变量，按元数据更新失败处理。
    fn update_mtime_locked(meta: &mut Meta) -> Result<(), FsError> {
        let now = vfs_ops().timespec_now();
        if now < meta.mtime {
            return Err(FsError::IoError);
        }
        meta.mtime = now;
        meta.ctime = now;
        Ok(())
    }

    /// 判断 `node` 是否位于本 inode 通向根的父链上（含本 inode 自身）
    ///
    /// 父链逐级短暂加锁，调用方可持有目录项表锁。
    fn has_ancestor(&self, node: &Arc<BhfsInode>) -> bool {
        if core::ptr::eq(self, Arc::as_ptr(node)) {
            return true;
        }
        let mut cur = self.parent.lock().upgrade();
        while let Some(dir) = cur {
            if Arc::ptr_eq(&dir, node) {
                return true;
            }
            cur = dir.parent.lock().upgrade();
        }
        false
    }

    /// 撤销一条目录项对 inode 的链接贡献
    ///
    /// 目录整体失效（2 条内部链接一并消失），文件减一；链接数归零
    /// 时向共享计数器归还配额。inode 本体随最后一个 Arc 释放。
    fn drop_links(&self) {
        let released = {
            let mut meta = self.meta.lock();
            if meta.inode_type == InodeType::Directory {
                meta.nlinks = 0;
            } else {
                meta.nlinks = meta.nlinks.saturating_sub(1);
            }
            meta.nlinks == 0
        };
        if released {
            self.shared.release_inode();
        }
    }

    /// 释放本目录之下可达的全部 inode（卸载路径）
    ///
    /// 逐条目走链接撤销路径：硬链接使多条目录项共享同一个 inode，
    /// 配额只在链接数归零的那一次归还。
    pub(crate) fn release_all(&self) {
        let children: Vec<Arc<BhfsInode>> = {
            let mut children = self.children.lock();
            let taken = children.values().cloned().collect();
            children.clear();
            taken
        };
        for child in children {
            if child.is_dir() {
                child.release_all();
            }
            child.drop_links();
        }
    }

    // ========== I/O 模拟引擎 ==========

    /// 零填充读取引擎
    ///
    /// 将 `[pos, size)` 范围内的请求以页为单位填充为零。每块之后
    /// 探测一次未决信号（中止并保留已产生的字节）并让出调度器。
    /// 返回 `(已产生字节数, 中止原因)`；两者可同时非空：部分进展
    /// 永远被保留，访问时间戳也随之刷新。
    pub(crate) fn read_iter(&self, pos: u64, iter: &mut IovIterMut<'_>) -> (usize, Option<FsError>) {
        if iter.count() == 0 {
            return (0, None);
        }
        if self.is_dir() {
            return (0, Some(FsError::IsDirectory));
        }

        let size = self.size.load(Ordering::Acquire);
        if size <= pos {
            return (0, None);
        }

        let cap = (size - pos).min(iter.count() as u64) as usize;
        iter.truncate(cap);

        let chunk_max = vfs_ops().page_size();
        let mut read_cnt = 0usize;
        let mut abort = None;

        while iter.count() > 0 {
            let chunk = iter.count().min(chunk_max);
            let n = iter.zero(chunk);
            if n == 0 && iter.count() > 0 {
                abort = Some(FsError::BadAddress);
                break;
            }
            read_cnt += n;

            if iter.count() == 0 {
                break;
            }
            if vfs_ops().signal_pending() {
                abort = Some(FsError::Interrupted);
                break;
            }
            vfs_ops().yield_now();
        }

        if read_cnt > 0 {
            self.touch_atime();
        }
        (read_cnt, abort)
    }

    /// 丢弃写入引擎
    ///
    /// 全程持有元数据锁：同一 inode 上的写互相串行，所有退出路径
    /// 经由 RAII 释放锁。通过通用写入前检查后更新修改时间（失败则
    /// 中止且尺寸不变），随后仅推进尺寸与来源游标；载荷本身被丢弃。
    /// 返回 `(新偏移, 接受长度)`。
    pub(crate) fn write_iter(
        &self,
        flags: OpenFlags,
        pos: u64,
        iter: &mut IovIter<'_>,
    ) -> Result<(u64, usize), FsError> {
        let mut meta = self.meta.lock();
        if meta.inode_type == InodeType::Directory {
            return Err(FsError::IsDirectory);
        }

        let size = self.size.load(Ordering::Acquire);
        let (pos, count) =
            generic_write_checks(flags, pos, iter.count(), size, self.shared.max_bytes)?;
        if count == 0 {
            return Ok((pos, 0));
        }

        Self::update_mtime_locked(&mut meta)?;

        let new_pos = pos + count as u64;
        if size < new_pos && meta.inode_type != InodeType::BlockDevice {
            self.size.store(new_pos, Ordering::Release);
            self.dirty.store(true, Ordering::Release);
        }

        // 载荷被丢弃：仅推进来源游标，调用方据此在部分写之间续传
        iter.advance(count);
        Ok((new_pos, count))
    }
}

impl Inode for BhfsInode {
    fn metadata(&self) -> Result<InodeMetadata, FsError> {
        let meta = self.meta.lock();
        let size = self.size.load(Ordering::Acquire);
        Ok(InodeMetadata {
            inode_no: meta.inode_no,
            inode_type: meta.inode_type,
            mode: meta.mode,
            uid: meta.uid,
            gid: meta.gid,
            size,
            atime: meta.atime,
            mtime: meta.mtime,
            ctime: meta.ctime,
            nlinks: meta.nlinks,
            blocks: (size + 511) / 512,
            rdev: meta.rdev,
        })
    }

    /// 无状态定点读取
    ///
    /// 已产生部分字节时返回短计数；仅在毫无进展时才报告中止原因。
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut iter = IovIterMut::from_buf(buf);
        let (n, abort) = self.read_iter(offset, &mut iter);
        if n > 0 {
            Ok(n)
        } else if let Some(err) = abort {
            Err(err)
        } else {
            Ok(0)
        }
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize, FsError> {
        let mut iter = IovIter::from_buf(buf);
        let (_new_pos, count) = self.write_iter(OpenFlags::empty(), offset, &mut iter)?;
        Ok(count)
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn Inode>, FsError> {
        self.check_dir()?;

        if name == "." {
            if let Some(this) = self.self_ref.lock().upgrade() {
                return Ok(this as Arc<dyn Inode>);
            }
            return Err(FsError::IoError);
        }
        if name == ".." {
            if let Some(parent) = self.parent.lock().upgrade() {
                return Ok(parent as Arc<dyn Inode>);
            }
            // 根目录的 ".." 指向自身
            if let Some(this) = self.self_ref.lock().upgrade() {
                return Ok(this as Arc<dyn Inode>);
            }
            return Err(FsError::IoError);
        }

        self.children
            .lock()
            .get(name)
            .cloned()
            .map(|inode| inode as Arc<dyn Inode>)
            .ok_or(FsError::NotFound)
    }

    fn create(&self, name: &str, mode: FileMode) -> Result<Arc<dyn Inode>, FsError> {
        self.check_dir()?;
        check_name(name)?;

        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }

        let this = self.self_ref.lock().upgrade();
        let mode = (mode & !FileMode::S_IFMT) | FileMode::S_IFREG;
        let new_inode = BhfsInode::new(&self.shared, this.as_ref(), mode, 0)?;

        children.insert(String::from(name), new_inode.clone());
        drop(children);

        self.touch_mtime();

        Ok(new_inode as Arc<dyn Inode>)
    }

    fn mkdir(&self, name: &str, mode: FileMode) -> Result<Arc<dyn Inode>, FsError> {
        self.check_dir()?;
        check_name(name)?;

        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }

        let this = self.self_ref.lock().upgrade();
        let mode = (mode & !FileMode::S_IFMT) | FileMode::S_IFDIR;
        let new_inode = BhfsInode::new(&self.shared, this.as_ref(), mode, 0)?;

        children.insert(String::from(name), new_inode.clone());

        // 新子目录的 ".." 贡献一条指向父目录的链接。在目录项表仍然
        // 锁定时一并更新，并发 lookup 不会观察到两者分离的中间态。
        {
            let now = vfs_ops().timespec_now();
            let mut meta = self.meta.lock();
            meta.nlinks += 1;
            if now > meta.mtime {
                meta.mtime = now;
                meta.ctime = now;
            }
        }
        drop(children);

        Ok(new_inode as Arc<dyn Inode>)
    }

    fn link(&self, name: &str, target: &Arc<dyn Inode>) -> Result<(), FsError> {
        self.check_dir()?;
        check_name(name)?;

        let target = target
            .clone()
            .downcast_arc::<BhfsInode>()
            .map_err(|_| FsError::InvalidArgument)?;
        if target.is_dir() {
            return Err(FsError::PermissionDenied);
        }

        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        children.insert(String::from(name), target.clone());
        drop(children);

        {
            let now = vfs_ops().timespec_now();
            let mut meta = target.meta.lock();
            meta.nlinks += 1;
            if now > meta.ctime {
                meta.ctime = now;
            }
        }
        self.touch_mtime();

        Ok(())
    }

    fn unlink(&self, name: &str) -> Result<(), FsError> {
        self.check_dir()?;

        let mut children = self.children.lock();
        let child = children.get(name).cloned().ok_or(FsError::NotFound)?;
        if child.is_dir() {
            return Err(FsError::IsDirectory);
        }

        children.remove(name);
        drop(children);

        child.drop_links();
        child.touch_ctime();
        self.touch_mtime();

        Ok(())
    }

    fn rmdir(&self, name: &str) -> Result<(), FsError> {
        self.check_dir()?;

        let mut children = self.children.lock();
        let child = children.get(name).cloned().ok_or(FsError::NotFound)?;
        if !child.is_dir() {
            return Err(FsError::NotDirectory);
        }
        if !child.children.lock().is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }

        children.remove(name);

        // 子目录消失带走其 ".." 链接；与目录项移除一并生效
        {
            let now = vfs_ops().timespec_now();
            let mut meta = self.meta.lock();
            meta.nlinks = meta.nlinks.saturating_sub(1);
            if now > meta.mtime {
                meta.mtime = now;
                meta.ctime = now;
            }
        }
        drop(children);

        child.drop_links();

        Ok(())
    }

    fn rename(
        &self,
        old_name: &str,
        new_parent: Arc<dyn Inode>,
        new_name: &str,
    ) -> Result<(), FsError> {
        self.check_dir()?;
        check_name(new_name)?;

        let new_parent = new_parent
            .downcast_arc::<BhfsInode>()
            .map_err(|_| FsError::InvalidArgument)?;
        new_parent.check_dir()?;

        if core::ptr::eq(Arc::as_ptr(&new_parent), self) {
            return self.rename_within(old_name, new_name);
        }
        self.rename_across(old_name, &new_parent, new_name)
    }

    fn readdir(&self) -> Result<Vec<DirEntry>, FsError> {
        let inode_no = {
            let meta = self.meta.lock();
            if meta.inode_type != InodeType::Directory {
                return Err(FsError::NotDirectory);
            }
            meta.inode_no
        };

        let parent_inode_no = self
            .parent
            .lock()
            .upgrade()
            .map_or(inode_no, |parent| parent.ino());

        let children = self.children.lock();
        let mut entries = Vec::with_capacity(children.len() + 2);

        entries.push(DirEntry {
            name: String::from("."),
            inode_no,
            inode_type: InodeType::Directory,
        });
        entries.push(DirEntry {
            name: String::from(".."),
            inode_no: parent_inode_no,
            inode_type: InodeType::Directory,
        });

        for (name, child) in children.iter() {
            let child_meta = child.meta.lock();
            entries.push(DirEntry {
                name: String::clone(name),
                inode_no: child_meta.inode_no,
                inode_type: child_meta.inode_type,
            });
        }

        Ok(entries)
    }

    fn truncate(&self, new_size: u64) -> Result<(), FsError> {
        let mut meta = self.meta.lock();
        if meta.inode_type != InodeType::File {
            return Err(FsError::IsDirectory);
        }
        if new_size > self.shared.max_bytes {
            return Err(FsError::FileTooLarge);
        }

        // 不存在需要释放的数据页，截断就是一次尺寸赋值
        self.size.store(new_size, Ordering::Release);
        self.dirty.store(true, Ordering::Release);

        let now = vfs_ops().timespec_now();
        if now > meta.mtime {
            meta.mtime = now;
            meta.ctime = now;
        }
        Ok(())
    }

    fn sync(&self) -> Result<(), FsError> {
        // 无后备存储：清除回写标记即完成
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    fn set_times(&self, atime: Option<TimeSpec>, mtime: Option<TimeSpec>) -> Result<(), FsError> {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        if let Some(atime) = atime {
            meta.atime = atime;
        }
        if let Some(mtime) = mtime {
            meta.mtime = mtime;
        }
        if now > meta.ctime {
            meta.ctime = now;
        }
        Ok(())
    }

    fn chmod(&self, mode: FileMode) -> Result<(), FsError> {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        meta.mode = (meta.mode & FileMode::S_IFMT) | (mode & !FileMode::S_IFMT);
        if now > meta.ctime {
            meta.ctime = now;
        }
        Ok(())
    }

    fn chown(&self, uid: u32, gid: u32) -> Result<(), FsError> {
        let now = vfs_ops().timespec_now();
        let mut meta = self.meta.lock();
        meta.uid = uid;
        meta.gid = gid;
        if now > meta.ctime {
            meta.ctime = now;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

impl BhfsInode {
    fn rename_within(&self, old_name: &str, new_name: &str) -> Result<(), FsError> {
        let mut children = self.children.lock();
        let child = children.get(old_name).cloned().ok_or(FsError::NotFound)?;
        if old_name == new_name {
            return Ok(());
        }

        if let Some(existing) = children.get(new_name).cloned() {
            check_replace(&child, &existing)?;
            children.remove(new_name);
            if existing.is_dir() {
                self.meta.lock().nlinks -= 1;
            }
            existing.drop_links();
        }

        children.remove(old_name);
        children.insert(String::from(new_name), child.clone());
        drop(children);

        child.touch_ctime();
        self.touch_mtime();
        Ok(())
    }

    fn rename_across(
        &self,
        old_name: &str,
        new_parent: &Arc<BhfsInode>,
        new_name: &str,
    ) -> Result<(), FsError> {
        // 跨目录重命名按 inode 编号排序加锁，避免与反向操作互相死锁
        let (self_ino, dst_ino) = (self.ino(), new_parent.ino());
        let (mut src_children, mut dst_children) = if self_ino < dst_ino {
            let src = self.children.lock();
            let dst = new_parent.children.lock();
            (src, dst)
        } else {
            let dst = new_parent.children.lock();
            let src = self.children.lock();
            (src, dst)
        };

        let child = src_children
            .get(old_name)
            .cloned()
            .ok_or(FsError::NotFound)?;

        // 目录不能移动到它自身的子树之下，否则目录树成环且脱离根
        if child.is_dir() && new_parent.has_ancestor(&child) {
            return Err(FsError::InvalidArgument);
        }

        if let Some(existing) = dst_children.get(new_name).cloned() {
            check_replace(&child, &existing)?;
            dst_children.remove(new_name);
            if existing.is_dir() {
                new_parent.meta.lock().nlinks -= 1;
            }
            existing.drop_links();
        }

        src_children.remove(old_name);
        dst_children.insert(String::from(new_name), child.clone());
        *child.parent.lock() = Arc::downgrade(new_parent);

        if child.is_dir() {
            // 子目录的 ".." 链接贡献随迁移转移
            self.meta.lock().nlinks -= 1;
            new_parent.meta.lock().nlinks += 1;
        }

        drop(src_children);
        drop(dst_children);

        child.touch_ctime();
        self.touch_mtime();
        new_parent.touch_mtime();
        Ok(())
    }
}

/// 重命名覆盖既有目标时的类型与空目录检查
fn check_replace(child: &Arc<BhfsInode>, existing: &Arc<BhfsInode>) -> Result<(), FsError> {
    match (child.is_dir(), existing.is_dir()) {
        (true, true) => {
            if !existing.children.lock().is_empty() {
                return Err(FsError::DirectoryNotEmpty);
            }
            Ok(())
        }
        (false, true) => Err(FsError::IsDirectory),
        (true, false) => Err(FsError::NotDirectory),
        (false, false) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BhFs;
    use std::vec::Vec;
    use vfs::FileSystem;

    fn mount() -> Arc<BhFs> {
        test_support::init();
        BhFs::new(0).unwrap()
    }

    fn mode(bits: u32) -> FileMode {
        FileMode::from_bits_truncate(bits)
    }

    fn as_bhfs(inode: &Arc<dyn Inode>) -> &BhfsInode {
        inode.downcast_ref::<BhfsInode>().unwrap()
    }

    #[test]
    fn test_factory_regular_file_initial_state() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        let meta = file.metadata().unwrap();

        assert_eq!(meta.inode_type, InodeType::File);
        assert_eq!(meta.size, 0);
        assert_eq!(meta.nlinks, 1);
        assert!(meta.mode.contains(FileMode::S_IFREG));
        assert_eq!(meta.atime, meta.mtime);
        assert_eq!(meta.mtime, meta.ctime);
        assert!(meta.atime > TimeSpec::ZERO);
    }

    #[test]
    fn test_factory_assigns_increasing_inode_numbers() {
        let fs = mount();
        let root = fs.root_inode();
        let a = root.create("a", mode(0o644)).unwrap();
        let b = root.create("b", mode(0o644)).unwrap();
        let root_ino = root.metadata().unwrap().inode_no;
        let a_ino = a.metadata().unwrap().inode_no;
        let b_ino = b.metadata().unwrap().inode_no;
        assert!(root_ino < a_ino);
        assert!(a_ino < b_ino);
    }

    #[test]
    #[should_panic(expected = "unrecognized inode mode")]
    fn test_factory_panics_on_unknown_kind() {
        let fs = mount();
        let root = fs.root_inode();
        let root = as_bhfs(&root);
        let this = root.self_ref.lock().upgrade();
        // S_IFMT 类型位非法（0o010000 为 FIFO，不受支持）
        let bad = FileMode::from_bits_retain(0o010000 | 0o644);
        let _ = BhfsInode::new(&root.shared, this.as_ref(), bad, 0);
    }

    #[test]
    fn test_create_collision_leaves_parent_unchanged() {
        let fs = mount();
        let root = fs.root_inode();
        root.create("a", mode(0o644)).unwrap();
        let before = root.metadata().unwrap();

        assert_eq!(
            root.create("a", mode(0o600)).err(),
            Some(FsError::AlreadyExists)
        );

        let after = root.metadata().unwrap();
        assert_eq!(after.nlinks, before.nlinks);
        assert_eq!(root.readdir().unwrap().len(), 3); // ".", "..", "a"
    }

    #[test]
    fn test_mkdir_link_counts() {
        let fs = mount();
        let root = fs.root_inode();
        assert_eq!(root.metadata().unwrap().nlinks, 2);

        let dir = root.mkdir("d", mode(0o755)).unwrap();
        assert_eq!(dir.metadata().unwrap().nlinks, 2);
        assert_eq!(root.metadata().unwrap().nlinks, 3);

        // 嵌套一层
        let sub = dir.mkdir("sub", mode(0o755)).unwrap();
        assert_eq!(sub.metadata().unwrap().nlinks, 2);
        assert_eq!(dir.metadata().unwrap().nlinks, 3);
        assert_eq!(root.metadata().unwrap().nlinks, 3);
    }

    #[test]
    fn test_name_too_long_rejected() {
        let fs = mount();
        let root = fs.root_inode();
        let long: String = core::iter::repeat('x').take(NAME_MAX + 1).collect();
        assert_eq!(
            root.create(&long, mode(0o644)).err(),
            Some(FsError::NameTooLong)
        );
        assert_eq!(
            root.mkdir(&long, mode(0o755)).err(),
            Some(FsError::NameTooLong)
        );
    }

    #[test]
    fn test_inode_pool_exhaustion_reports_no_space() {
        test_support::init();
        // 根占用 1 个配额，剩下 1 个
        let fs = BhFs::new(2).unwrap();
        let root = fs.root_inode();
        root.create("a", mode(0o644)).unwrap();
        assert_eq!(
            root.create("b", mode(0o644)).err(),
            Some(FsError::NoSpace)
        );

        // 释放后配额可复用
        root.unlink("a").unwrap();
        root.create("b", mode(0o644)).unwrap();
    }

    #[test]
    fn test_unlink_semantics() {
        let fs = mount();
        let root = fs.root_inode();
        root.create("a", mode(0o644)).unwrap();
        let dir = root.mkdir("d", mode(0o755)).unwrap();
        let _ = dir;

        assert_eq!(root.unlink("d").unwrap_err(), FsError::IsDirectory);
        assert_eq!(root.unlink("missing").unwrap_err(), FsError::NotFound);

        root.unlink("a").unwrap();
        assert_eq!(root.lookup("a").err(), Some(FsError::NotFound));
    }

    #[test]
    fn test_rmdir_semantics() {
        let fs = mount();
        let root = fs.root_inode();
        let dir = root.mkdir("d", mode(0o755)).unwrap();
        dir.create("f", mode(0o644)).unwrap();
        root.create("plain", mode(0o644)).unwrap();

        assert_eq!(root.rmdir("d").unwrap_err(), FsError::DirectoryNotEmpty);
        assert_eq!(root.rmdir("plain").unwrap_err(), FsError::NotDirectory);

        dir.unlink("f").unwrap();
        root.rmdir("d").unwrap();
        assert_eq!(root.metadata().unwrap().nlinks, 2);
        assert_eq!(root.lookup("d").err(), Some(FsError::NotFound));
    }

    #[test]
    fn test_hard_link_accounting() {
        let fs = mount();
        let root = fs.root_inode();
        let a = root.create("a", mode(0o644)).unwrap();

        root.link("b", &a).unwrap();
        assert_eq!(a.metadata().unwrap().nlinks, 2);
        assert_eq!(
            root.lookup("b").unwrap().metadata().unwrap().inode_no,
            a.metadata().unwrap().inode_no
        );

        // 目录不允许硬链接
        let d = root.mkdir("d", mode(0o755)).unwrap();
        assert_eq!(
            root.link("d2", &d).unwrap_err(),
            FsError::PermissionDenied
        );

        // 删除其中一个名字后文件仍然可达
        root.unlink("a").unwrap();
        let b = root.lookup("b").unwrap();
        assert_eq!(b.metadata().unwrap().nlinks, 1);
    }

    #[test]
    fn test_rename_within_parent() {
        let fs = mount();
        let root = fs.root_inode();
        let a = root.create("a", mode(0o644)).unwrap();
        a.write_at(0, &[1u8; 7]).unwrap();

        root.rename("a", root.clone(), "b").unwrap();
        assert_eq!(root.lookup("a").err(), Some(FsError::NotFound));
        assert_eq!(root.lookup("b").unwrap().metadata().unwrap().size, 7);
    }

    #[test]
    fn test_rename_replaces_existing_file() {
        let fs = mount();
        let root = fs.root_inode();
        root.create("a", mode(0o644)).unwrap();
        root.create("b", mode(0o644)).unwrap();

        root.rename("a", root.clone(), "b").unwrap();
        assert_eq!(root.readdir().unwrap().len(), 3); // ".", "..", "b"
    }

    #[test]
    fn test_rename_directory_across_parents_moves_link() {
        let fs = mount();
        let root = fs.root_inode();
        let src = root.mkdir("src", mode(0o755)).unwrap();
        let dst = root.mkdir("dst", mode(0o755)).unwrap();
        src.mkdir("child", mode(0o755)).unwrap();

        assert_eq!(src.metadata().unwrap().nlinks, 3);
        assert_eq!(dst.metadata().unwrap().nlinks, 2);

        src.rename("child", dst.clone(), "child").unwrap();

        assert_eq!(src.metadata().unwrap().nlinks, 2);
        assert_eq!(dst.metadata().unwrap().nlinks, 3);
        // 迁移后 ".." 指向新父目录
        let child = dst.lookup("child").unwrap();
        let parent_ino = child.lookup("..").unwrap().metadata().unwrap().inode_no;
        assert_eq!(parent_ino, dst.metadata().unwrap().inode_no);
    }

    #[test]
    fn test_rename_into_own_subtree_rejected() {
        let fs = mount();
        let root = fs.root_inode();
        let a = root.mkdir("a", mode(0o755)).unwrap();
        let b = a.mkdir("b", mode(0o755)).unwrap();

        // 目录落入自身子树会使目录树成环
        assert_eq!(
            root.rename("a", b, "x").unwrap_err(),
            FsError::InvalidArgument
        );
        // 树保持原状
        assert!(root.lookup("a").is_ok());
        assert!(a.lookup("b").is_ok());
        assert_eq!(root.metadata().unwrap().nlinks, 3);
        assert_eq!(a.metadata().unwrap().nlinks, 3);

        // 以自身为目标父目录同样被拒绝
        let a_again = root.lookup("a").unwrap();
        assert_eq!(
            root.rename("a", a_again, "x").unwrap_err(),
            FsError::InvalidArgument
        );
    }

    #[test]
    fn test_rename_over_nonempty_directory_fails() {
        let fs = mount();
        let root = fs.root_inode();
        root.mkdir("a", mode(0o755)).unwrap();
        let b = root.mkdir("b", mode(0o755)).unwrap();
        b.create("f", mode(0o644)).unwrap();

        assert_eq!(
            root.rename("a", root.clone(), "b").unwrap_err(),
            FsError::DirectoryNotEmpty
        );
    }

    #[test]
    fn test_write_size_is_high_water_mark() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();

        assert_eq!(file.write_at(0, &[0xAAu8; 10]).unwrap(), 10);
        assert_eq!(file.metadata().unwrap().size, 10);

        // 文件中段的写不缩小尺寸
        assert_eq!(file.write_at(2, &[0xBBu8; 3]).unwrap(), 3);
        assert_eq!(file.metadata().unwrap().size, 10);

        assert_eq!(file.write_at(8, &[0xCCu8; 4]).unwrap(), 4);
        assert_eq!(file.metadata().unwrap().size, 12);
    }

    #[test]
    fn test_write_updates_mtime_monotonically() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();

        let t0 = file.metadata().unwrap().mtime;
        file.write_at(0, &[0u8; 1]).unwrap();
        let t1 = file.metadata().unwrap().mtime;
        file.write_at(0, &[0u8; 1]).unwrap();
        let t2 = file.metadata().unwrap().mtime;

        assert!(t0 < t1);
        assert!(t1 < t2);
    }

    #[test]
    fn test_clock_regression_aborts_write() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 10]).unwrap();

        // 时钟回退会破坏 mtime 单调性，写入必须在改动尺寸之前中止
        test_support::advance_clock(-1_000_000);
        assert_eq!(
            file.write_at(0, &[0u8; 100]).unwrap_err(),
            FsError::IoError
        );
        assert_eq!(file.metadata().unwrap().size, 10);

        test_support::advance_clock(2_000_000);
        assert_eq!(file.write_at(0, &[0u8; 100]).unwrap(), 100);
    }

    #[test]
    fn test_sparse_write_then_full_read() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();

        assert_eq!(file.write_at(100, &[0x55u8; 5]).unwrap(), 5);
        assert_eq!(file.metadata().unwrap().size, 105);

        let mut buf = [0xffu8; 105];
        assert_eq!(file.read_at(0, &mut buf).unwrap(), 105);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_returns_zeros_not_payload() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();

        file.write_at(0, b"definitely not zeros").unwrap();
        let mut buf = [0xffu8; 20];
        assert_eq!(file.read_at(0, &mut buf).unwrap(), 20);
        assert_eq!(buf, [0u8; 20]);
    }

    #[test]
    fn test_read_at_or_beyond_eof_returns_zero_bytes() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 10]).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(file.read_at(10, &mut buf).unwrap(), 0);
        assert_eq!(file.read_at(1000, &mut buf).unwrap(), 0);
        // 零长请求同样立即返回
        assert_eq!(file.read_at(0, &mut []).unwrap(), 0);
    }

    #[test]
    fn test_read_clamped_to_size() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 6]).unwrap();

        let mut buf = [0xffu8; 16];
        assert_eq!(file.read_at(2, &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[0u8; 4]);
        // 截断之外的缓冲区保持原样
        assert_eq!(buf[4], 0xff);
    }

    #[test]
    fn test_read_refreshes_atime() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 8]).unwrap();

        let before = file.metadata().unwrap().atime;
        let mut buf = [0u8; 8];
        file.read_at(0, &mut buf).unwrap();
        assert!(file.metadata().unwrap().atime > before);
    }

    #[test]
    fn test_io_on_directory_rejected() {
        let fs = mount();
        let root = fs.root_inode();
        let mut buf = [0u8; 4];
        assert_eq!(root.read_at(0, &mut buf).unwrap_err(), FsError::IsDirectory);
        assert_eq!(root.write_at(0, &buf).unwrap_err(), FsError::IsDirectory);
    }

    #[test]
    fn test_zero_length_write_is_noop() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        let before = file.metadata().unwrap();

        assert_eq!(file.write_at(50, &[]).unwrap(), 0);

        let after = file.metadata().unwrap();
        assert_eq!(after.size, 0);
        assert_eq!(after.mtime, before.mtime);
    }

    #[test]
    fn test_truncate_sets_size_both_ways() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 10]).unwrap();

        file.truncate(3).unwrap();
        assert_eq!(file.metadata().unwrap().size, 3);

        file.truncate(1024).unwrap();
        assert_eq!(file.metadata().unwrap().size, 1024);
        let mut buf = [0xffu8; 1024];
        assert_eq!(file.read_at(0, &mut buf).unwrap(), 1024);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_dirty_flag_lifecycle() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        let raw = as_bhfs(&file);

        assert!(!raw.is_dirty());
        file.write_at(0, &[0u8; 4]).unwrap();
        assert!(raw.is_dirty());
        file.sync().unwrap();
        assert!(!raw.is_dirty());
    }

    #[test]
    fn test_readdir_lists_dot_entries_and_children() {
        let fs = mount();
        let root = fs.root_inode();
        root.create("a", mode(0o644)).unwrap();
        root.mkdir("d", mode(0o755)).unwrap();

        let entries = root.readdir().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", "..", "a", "d"]);
        assert_eq!(entries[3].inode_type, InodeType::Directory);
    }

    #[test]
    fn test_chmod_chown_update_attributes() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();

        file.chmod(mode(0o600)).unwrap();
        let meta = file.metadata().unwrap();
        assert!(meta.mode.contains(FileMode::S_IFREG));
        assert!(meta.mode.contains(FileMode::S_IRUSR | FileMode::S_IWUSR));
        assert!(!meta.mode.contains(FileMode::S_IRGRP));

        file.chown(1000, 1000).unwrap();
        let meta = file.metadata().unwrap();
        assert_eq!((meta.uid, meta.gid), (1000, 1000));
    }

    #[test]
    fn test_owner_inherited_from_parent() {
        let fs = mount();
        let root = fs.root_inode();
        let dir = root.mkdir("d", mode(0o755)).unwrap();
        dir.chown(42, 43).unwrap();

        let file = dir.create("f", mode(0o644)).unwrap();
        let meta = file.metadata().unwrap();
        assert_eq!((meta.uid, meta.gid), (42, 43));
    }

    #[test]
    fn test_concurrent_writers_final_size() {
        let fs = mount();
        let root = fs.root_inode();
        let file = root.create("a", mode(0o644)).unwrap();
        let file = file.downcast_arc::<BhfsInode>().ok().unwrap();

        let lo = file.clone();
        let hi = file.clone();
        let t1 = std::thread::spawn(move || {
            for i in 0..200u64 {
                lo.write_at(i * 16, &[0u8; 16]).unwrap();
            }
        });
        let t2 = std::thread::spawn(move || {
            for i in 0..200u64 {
                hi.write_at(1_000 + i * 16, &[0u8; 16]).unwrap();
            }
        });
        t1.join().unwrap();
        t2.join().unwrap();

        // 两个写者的终点中较大者胜出
        assert_eq!(file.size_read(), 1_000 + 200 * 16);
    }
}
