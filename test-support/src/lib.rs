//! 测试支持 crate
//!
//! 提供宿主机测试使用的 Mock 运行时操作实现。
//! 仅作为 dev-dependency 使用，不进入正式构建。

pub mod mock;

pub use mock::{advance_clock, init, reset_yield_count, set_signal_pending, yield_count, MockVfsOps};
