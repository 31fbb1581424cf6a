//! 匿名页
//!
//! 首次换入时清零；被淘汰时写入交换槽位，换入后释放槽位。

use crate::config::PAGE_SIZE;
use crate::error::VmResult;
use crate::frame::FrameAllocator;
use crate::swap::{SwapSlot, SwapTable};

/// 匿名页的后备状态
#[derive(Debug, Default, Clone)]
pub struct AnonPage {
    slot: Option<SwapSlot>,
}

impl AnonPage {
    /// 从未被换出的匿名页
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// 内容所在的交换槽位
    pub fn swap_slot(&self) -> Option<SwapSlot> {
        self.slot
    }

    pub(crate) fn swap_in(
        &mut self,
        page: &mut [u8; PAGE_SIZE],
        frames: &FrameAllocator,
    ) -> VmResult<()> {
        match self.slot {
            Some(slot) => {
                frames.swap_in(slot, page)?;
                self.slot = None;
            }
            None => page.fill(0),
        }
        Ok(())
    }

    /// 在帧表锁内调用，直接使用交换槽位表
    pub(crate) fn swap_out(&mut self, page: &[u8; PAGE_SIZE], swap: &mut SwapTable) -> VmResult<()> {
        debug_assert!(self.slot.is_none(), "anon: page already in swap");
        self.slot = Some(swap.swap_out(page)?);
        Ok(())
    }

    pub(crate) fn destroy(&mut self, frames: &FrameAllocator) {
        if let Some(slot) = self.slot.take() {
            frames.free_swap(slot);
        }
    }
}
