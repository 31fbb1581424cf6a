//! 硬件页表接口
//!
//! 本 crate 不关心页表格式、级数和 TLB 刷新，这些都由架构实现负责。
//! 上层只通过 [`PageTable`] 安装/移除用户页映射，并查询硬件维护的
//! accessed / dirty 位。
//!
//! 所有方法都取 `&self`：页表实现自带内部锁，因为淘汰可能在任意进程的
//! 上下文中修改另一个地址空间的页表。

use crate::address::{Kva, Vaddr, Vpn};
use crate::error::VmResult;
use bitflags::bitflags;

bitflags! {
    /// 与架构无关的页表项标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u8 {
        /// 可写
        const WRITABLE = 1 << 0;
        /// 用户态可访问
        const USER = 1 << 1;
        /// 自上次清除后被访问过
        const ACCESSED = 1 << 2;
        /// 自上次清除后被写过
        const DIRTY = 1 << 3;
    }
}

/// 单个用户地址空间的硬件页表
pub trait PageTable: Send + Sync {
    /// 把 `vpn` 映射到 `kva` 所指的页帧
    ///
    /// 实现负责把内核地址换算成物理地址。
    /// 页表页分配失败时返回 [`crate::VmError::MapFailed`]。
    fn map(&self, vpn: Vpn, kva: Kva, flags: PteFlags) -> VmResult<()>;

    /// 移除 `vpn` 的映射并刷新对应 TLB 条目；未映射时什么也不做
    fn unmap(&self, vpn: Vpn);

    /// 查询 `vpn` 的页表项标志，未映射时返回 `None`
    fn flags(&self, vpn: Vpn) -> Option<PteFlags>;

    /// 覆盖 `vpn` 的页表项标志；未映射时什么也不做
    fn update_flags(&self, vpn: Vpn, flags: PteFlags);

    /// 地址是否属于内核地址空间
    fn is_kernel_address(&self, va: Vaddr) -> bool;

    /// `vpn` 是否已映射
    fn is_mapped(&self, vpn: Vpn) -> bool {
        self.flags(vpn).is_some()
    }

    /// dirty 位
    fn is_dirty(&self, vpn: Vpn) -> bool {
        self.flags(vpn)
            .is_some_and(|flags| flags.contains(PteFlags::DIRTY))
    }

    /// 设置或清除 dirty 位
    fn set_dirty(&self, vpn: Vpn, dirty: bool) {
        if let Some(mut flags) = self.flags(vpn) {
            flags.set(PteFlags::DIRTY, dirty);
            self.update_flags(vpn, flags);
        }
    }

    /// accessed 位
    fn is_accessed(&self, vpn: Vpn) -> bool {
        self.flags(vpn)
            .is_some_and(|flags| flags.contains(PteFlags::ACCESSED))
    }

    /// 设置或清除 accessed 位
    fn set_accessed(&self, vpn: Vpn, accessed: bool) {
        if let Some(mut flags) = self.flags(vpn) {
            flags.set(PteFlags::ACCESSED, accessed);
            self.update_flags(vpn, flags);
        }
    }
}
