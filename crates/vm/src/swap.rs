//! 交换区管理
//!
//! 交换设备被划分为若干页大小的槽位。[`SwapTable`] 用位图记录槽位占用，
//! 匿名页被淘汰时写入一个空闲槽位，换入后立即释放该槽位。

use crate::bitmap::Bitmap;
use crate::config::PAGE_SIZE;
use crate::error::{VmError, VmResult};
use alloc::sync::Arc;

/// 交换设备
///
/// 实现通常基于块设备，一个槽位对应若干连续扇区。
pub trait SwapDevice: Send + Sync {
    /// 设备上的槽位总数
    fn slot_count(&self) -> usize;

    /// 读取整个槽位
    fn read_slot(&self, slot: usize, buf: &mut [u8; PAGE_SIZE]) -> VmResult<()>;

    /// 写入整个槽位
    fn write_slot(&self, slot: usize, buf: &[u8; PAGE_SIZE]) -> VmResult<()>;
}

/// 交换槽位编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SwapSlot(usize);

impl SwapSlot {
    /// 槽位下标
    pub fn index(self) -> usize {
        self.0
    }
}

/// 交换槽位表
pub struct SwapTable {
    device: Arc<dyn SwapDevice>,
    slots: Bitmap,
}

impl SwapTable {
    /// 在设备上创建空的槽位表
    pub fn new(device: Arc<dyn SwapDevice>) -> Self {
        let slots = Bitmap::new(device.slot_count());
        Self { device, slots }
    }

    /// 把一页内容写入新分配的槽位
    ///
    /// 没有空闲槽位时返回 [`VmError::SwapFull`]；写失败时槽位被归还。
    pub fn swap_out(&mut self, page: &[u8; PAGE_SIZE]) -> VmResult<SwapSlot> {
        let idx = self.slots.alloc().ok_or(VmError::SwapFull)?;
        if let Err(e) = self.device.write_slot(idx, page) {
            self.slots.free(idx);
            return Err(e);
        }
        Ok(SwapSlot(idx))
    }

    /// 读回槽位内容并释放槽位
    pub fn swap_in(&mut self, slot: SwapSlot, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        self.read(slot, page)?;
        self.free(slot);
        Ok(())
    }

    /// 只读取槽位内容，不释放
    pub fn read(&self, slot: SwapSlot, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        debug_assert!(!self.slots.is_free(slot.0), "swap: read of free slot");
        self.device.read_slot(slot.0, page)
    }

    /// 释放槽位
    pub fn free(&mut self, slot: SwapSlot) {
        self.slots.free(slot.0);
    }

    /// 已占用的槽位数
    pub fn used_slots(&self) -> usize {
        self.slots.allocated()
    }

    /// 槽位总数
    pub fn total_slots(&self) -> usize {
        self.slots.total()
    }
}
