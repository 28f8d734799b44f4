//! Bhfs 文件系统实例
//!
//! [`BhFs`] 是一次挂载的超级块：持有根目录、容量限额与共享计数。
//! 无后备设备，每次挂载都是一棵全新的空树，卸载后内容随之消失。

use alloc::sync::Arc;

use uapi::fs::{MAX_LFS_FILESIZE, NAME_MAX};
use vfs::{
    FileSystem, FileSystemType, FsError, FsRegistry, Inode, MountFlags, StatFs, vfs_ops,
};

use crate::inode::{BhfsInode, BhfsShared};

/// Bhfs 魔数（"bhfs" 的 ASCII 编码）
pub const BHFS_MAGIC: u64 = 0x6268_6673;

/// Bhfs 超级块
pub struct BhFs {
    root: Arc<BhfsInode>,
    shared: Arc<BhfsShared>,
    /// 时间戳粒度（纳秒）
    time_gran: u32,
}

impl BhFs {
    /// 构建一个新的挂载实例
    ///
    /// 块大小取平台页大小，单文件上限取系统所允许的最大文件尺寸。
    /// `max_inodes` 为 0 表示不限制 inode 总数。根目录分配失败说明
    /// 实例从未可用，按内存不足上报。
    pub fn new(max_inodes: usize) -> Result<Arc<Self>, FsError> {
        let block_size = vfs_ops().page_size();
        let shared = Arc::new(BhfsShared::new(MAX_LFS_FILESIZE, block_size, max_inodes));

        let root = BhfsInode::new_root(&shared).map_err(|_| FsError::OutOfMemory)?;

        log::info!(
            "bhfs: new instance, block_size={}, max_inodes={}",
            block_size,
            max_inodes
        );

        Ok(Arc::new(BhFs {
            root,
            shared,
            time_gran: 1,
        }))
    }

    /// 时间戳粒度（纳秒）
    pub fn time_granularity(&self) -> u32 {
        self.time_gran
    }

    /// 当前存活的 inode 数
    pub fn live_inodes(&self) -> usize {
        self.shared.live_inodes()
    }

    fn sync_tree(inode: &Arc<dyn Inode>) -> Result<(), FsError> {
        inode.sync()?;
        if let Ok(entries) = inode.readdir() {
            for entry in entries {
                if entry.name == "." || entry.name == ".." {
                    continue;
                }
                let child = inode.lookup(&entry.name)?;
                Self::sync_tree(&child)?;
            }
        }
        Ok(())
    }
}

impl FileSystem for BhFs {
    fn fs_type(&self) -> &'static str {
        "bhfs"
    }

    fn root_inode(&self) -> Arc<dyn Inode> {
        self.root.clone() as Arc<dyn Inode>
    }

    /// 遍历整棵树清除回写标记；没有实际的落盘动作
    fn sync(&self) -> Result<(), FsError> {
        Self::sync_tree(&self.root_inode())
    }

    /// 丢弃存储没有可计量的占用：块与 inode 的总量和余量都报告为 0
    fn statfs(&self) -> Result<StatFs, FsError> {
        Ok(StatFs {
            magic: BHFS_MAGIC,
            block_size: self.shared.block_size,
            total_blocks: 0,
            free_blocks: 0,
            available_blocks: 0,
            total_inodes: 0,
            free_inodes: 0,
            max_filename_len: NAME_MAX,
        })
    }

    /// 卸载即全量丢弃：拆开目录树并归还全部 inode 配额
    fn umount(&self) -> Result<(), FsError> {
        self.root.release_all();
        log::info!("bhfs: unmounted, all contents discarded");
        Ok(())
    }
}

/// Bhfs 文件系统类型（注册入口）
pub struct BhfsType;

impl FileSystemType for BhfsType {
    fn name(&self) -> &'static str {
        "bhfs"
    }

    /// 不依赖后备设备；挂载选项逐字接受但不改变行为
    fn mount(
        &self,
        _flags: MountFlags,
        device: Option<&str>,
        options: &str,
    ) -> Result<Arc<dyn FileSystem>, FsError> {
        if let Some(device) = device {
            log::debug!("bhfs: ignoring device {:?}", device);
        }
        if !options.is_empty() {
            log::debug!("bhfs: ignoring mount options {:?}", options);
        }
        Ok(BhFs::new(0)? as Arc<dyn FileSystem>)
    }
}

/// 向注册表登记 bhfs 文件系统类型
pub fn start(registry: &FsRegistry) -> Result<(), FsError> {
    registry.register(Arc::new(BhfsType))
}

/// 从注册表注销 bhfs 文件系统类型
///
/// 已挂载的实例不受影响，由各自的引用计数维持存活。
pub fn stop(registry: &FsRegistry) -> Result<(), FsError> {
    registry.unregister("bhfs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs::FileMode;

    fn mode(bits: u32) -> FileMode {
        FileMode::from_bits_truncate(bits)
    }

    #[test]
    fn test_mount_write_read_cycle() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();

        let file = root.create("a", mode(0o644)).unwrap();
        assert_eq!(file.write_at(0, &[0x42u8; 10]).unwrap(), 10);

        let mut buf = [0xffu8; 10];
        assert_eq!(file.read_at(0, &mut buf).unwrap(), 10);
        assert_eq!(buf, [0u8; 10]);
        assert_eq!(file.metadata().unwrap().size, 10);
    }

    #[test]
    fn test_nested_tree_and_stat() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();

        let dir = root.mkdir("d", mode(0o755)).unwrap();
        let file = dir.create("f", mode(0o644)).unwrap();

        let meta = file.metadata().unwrap();
        assert_eq!(meta.inode_type, vfs::InodeType::File);
        assert_eq!(meta.size, 0);
        assert_eq!(meta.nlinks, 1);

        let found = root.lookup("d").unwrap().lookup("f").unwrap();
        assert_eq!(found.metadata().unwrap().inode_no, meta.inode_no);
    }

    #[test]
    fn test_statfs_reports_magic_and_geometry() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let statfs = fs.statfs().unwrap();

        assert_eq!(statfs.magic, BHFS_MAGIC);
        assert_eq!(statfs.block_size, test_support::mock::PAGE_SIZE);
        assert_eq!(statfs.total_blocks, 0);
        assert_eq!(statfs.free_blocks, 0);
        assert_eq!(statfs.max_filename_len, NAME_MAX);
        // 时间戳以纳秒为粒度记录
        assert_eq!(fs.time_granularity(), 1);
    }

    #[test]
    fn test_registry_start_stop() {
        test_support::init();
        let registry = FsRegistry::new();

        start(&registry).unwrap();
        assert!(registry.contains("bhfs"));
        assert_eq!(
            start(&registry).unwrap_err(),
            FsError::AlreadyExists
        );

        let fs = registry
            .mount("bhfs", MountFlags::empty(), None, "")
            .unwrap();
        assert_eq!(fs.fs_type(), "bhfs");

        stop(&registry).unwrap();
        assert!(!registry.contains("bhfs"));
        assert_eq!(stop(&registry).unwrap_err(), FsError::NotFound);

        // 注销不影响已有挂载
        let root = fs.root_inode();
        root.create("still-works", mode(0o644)).unwrap();
    }

    #[test]
    fn test_mount_ignores_device_and_options() {
        test_support::init();
        let registry = FsRegistry::new();
        start(&registry).unwrap();

        let fs = registry
            .mount("bhfs", MountFlags::empty(), Some("/dev/null"), "size=1g")
            .unwrap();
        assert_eq!(fs.statfs().unwrap().magic, BHFS_MAGIC);
    }

    #[test]
    fn test_each_mount_is_independent() {
        test_support::init();
        let a = BhFs::new(0).unwrap();
        let b = BhFs::new(0).unwrap();

        a.root_inode().create("only-in-a", mode(0o644)).unwrap();
        assert_eq!(
            b.root_inode().lookup("only-in-a").err(),
            Some(FsError::NotFound)
        );
    }

    #[test]
    fn test_umount_releases_inode_quota() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();

        let dir = root.mkdir("d", mode(0o755)).unwrap();
        dir.create("f", mode(0o644)).unwrap();
        root.create("g", mode(0o644)).unwrap();
        assert_eq!(fs.live_inodes(), 4);

        fs.umount().unwrap();
        // 只剩根目录本身
        assert_eq!(fs.live_inodes(), 1);
        assert!(root.readdir().unwrap().len() == 2);
    }

    #[test]
    fn test_umount_releases_hard_linked_inode_once() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();

        let a = root.create("a", mode(0o644)).unwrap();
        root.link("b", &a).unwrap();
        // 两条目录项共享一个 inode
        assert_eq!(fs.live_inodes(), 2);

        fs.umount().unwrap();
        assert_eq!(fs.live_inodes(), 1);
    }

    #[test]
    fn test_fs_sync_clears_dirty_tree() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();
        let dir = root.mkdir("d", mode(0o755)).unwrap();
        let file = dir.create("f", mode(0o644)).unwrap();
        file.write_at(0, &[0u8; 4]).unwrap();

        fs.sync().unwrap();

        let raw = file.downcast_ref::<crate::inode::BhfsInode>().unwrap();
        assert!(!raw.is_dirty());
    }

    #[test]
    fn test_sparse_file_beyond_any_real_backing() {
        test_support::init();
        let fs = BhFs::new(0).unwrap();
        let root = fs.root_inode();
        let file = root.create("huge", mode(0o644)).unwrap();

        // 远超任何真实内存的稀疏写只改一个计数
        let offset = 1u64 << 40;
        assert_eq!(file.write_at(offset, &[0u8; 8]).unwrap(), 8);
        assert_eq!(file.metadata().unwrap().size, offset + 8);

        let mut buf = [0xffu8; 8];
        assert_eq!(file.read_at(offset, &mut buf).unwrap(), 8);
        assert_eq!(buf, [0u8; 8]);
    }
}
