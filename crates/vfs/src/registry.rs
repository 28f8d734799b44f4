//! 文件系统类型注册表
//!
//! 文件系统类型的注册/注销是一次性的初始化/清理对，生命周期与模块
//! 加载/卸载绑定。注册表被建模为显式对象（而非环境全局状态）：
//! 宿主创建 [`FsRegistry`]，各文件系统通过自身的 `start()`/`stop()`
//! 入口在其上注册或注销。

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use sync::SpinLock;

use crate::{FileSystem, FsError};

bitflags::bitflags! {
    /// 挂载标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MountFlags: u32 {
        /// 只读挂载
        const RDONLY  = 0x0001;
        /// 忽略 set-id 位
        const NOSUID  = 0x0002;
        /// 不解释设备文件
        const NODEV   = 0x0004;
        /// 禁止执行
        const NOEXEC  = 0x0008;
        /// 不更新访问时间
        const NOATIME = 0x0400;
    }
}

/// 文件系统类型
///
/// 向注册表描述一种可挂载的文件系统：固定的类型名，以及从挂载参数
/// 建立一个新文件系统实例的入口。
pub trait FileSystemType: Send + Sync {
    /// 文件系统类型名称
    fn name(&self) -> &'static str;

    /// 建立一个新的挂载实例，返回其文件系统对象
    ///
    /// `device` 与 `options` 的解释由具体类型决定；无后备设备的
    /// 文件系统忽略二者。
    fn mount(
        &self,
        flags: MountFlags,
        device: Option<&str>,
        options: &str,
    ) -> Result<Arc<dyn FileSystem>, FsError>;
}

/// 文件系统类型注册表
pub struct FsRegistry {
    types: SpinLock<BTreeMap<&'static str, Arc<dyn FileSystemType>>>,
}

impl FsRegistry {
    /// 创建空注册表
    pub const fn new() -> Self {
        FsRegistry {
            types: SpinLock::new(BTreeMap::new()),
        }
    }

    /// 注册文件系统类型
    ///
    /// 同名类型已注册时返回 `AlreadyExists`。
    pub fn register(&self, fs_type: Arc<dyn FileSystemType>) -> Result<(), FsError> {
        let name = fs_type.name();
        let mut types = self.types.lock();
        if types.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        types.insert(name, fs_type);
        log::info!("vfs: registered filesystem type {name}");
        Ok(())
    }

    /// 注销文件系统类型
    ///
    /// 未注册时返回 `NotFound`。
    pub fn unregister(&self, name: &str) -> Result<(), FsError> {
        let mut types = self.types.lock();
        if types.remove(name).is_none() {
            return Err(FsError::NotFound);
        }
        log::info!("vfs: unregistered filesystem type {name}");
        Ok(())
    }

    /// 检查类型是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.types.lock().contains_key(name)
    }

    /// 按类型名挂载文件系统
    ///
    /// 类型未注册时返回 `NoDevice`。
    pub fn mount(
        &self,
        name: &str,
        flags: MountFlags,
        device: Option<&str>,
        options: &str,
    ) -> Result<Arc<dyn FileSystem>, FsError> {
        let fs_type = self
            .types
            .lock()
            .get(name)
            .cloned()
            .ok_or(FsError::NoDevice)?;
        log::debug!("vfs: mounting {name} (flags {flags:?})");
        fs_type.mount(flags, device, options)
    }
}

impl Default for FsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
