//! 帧分配器模块
//!
//! 管理所有用户页帧：从物理页池分配，页池耗尽时按淘汰策略回收。
//!
//! ## 帧表
//!
//! 每个用户页帧在帧表中有一个 [`FrameSlot`]，记录它当前属于哪个页
//! （弱引用 + 所在地址空间的页表）。帧表、页池、交换槽位表与淘汰策略
//! 由同一把 [`SpinLock`] 保护。
//!
//! ## 钉住（pin）
//!
//! [`FrameAllocator::acquire`] 返回的帧处于钉住状态：页内容尚未填充完毕，
//! 淘汰器不会选中它。填充完成后由调用方 [`FrameAllocator::unpin`]。
//!
//! ## 加锁顺序
//!
//! 页锁 → 帧表锁。淘汰时已持有帧表锁，对受害页只能 `try_lock`，
//! 失败则跳过该页，因此不会与正在处理缺页的线程形成环路。
//!
//! 淘汰时的后备存储 I/O（文件页写回、匿名页写入交换区）在帧表锁内、
//! 关中断状态下完成。内核提供的 [`crate::MmFile`] 与 [`SwapDevice`]
//! 实现不能睡眠，也不能回头调用本分配器。
//!
//! ## 帧标识
//!
//! [`FrameId`] 带有代数（generation），帧每次易主都会递增代数，
//! 已被淘汰的页手中残留的旧标识因此不会误操作新主人的帧。

mod evict;
mod pool;

pub use evict::{ClockPolicy, EvictionPolicy};
pub use pool::{BitmapPagePool, PhysPagePool};

use crate::address::{Kva, Vpn};
use crate::config::PAGE_SIZE;
use crate::error::VmResult;
use crate::mmu::PageTable;
use crate::page::Page;
use crate::swap::{SwapDevice, SwapSlot, SwapTable};
use alloc::{
    boxed::Box,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::hint;
use sync::SpinLock;

/// 分配帧时最多尝试淘汰的轮数
///
/// 每轮之间会释放帧表锁，让持有受害页锁的线程有机会前进。
const ACQUIRE_RETRIES: usize = 64;

// ============================================================================
// 帧标识
// ============================================================================

/// 帧表中某个帧的一次“租期”
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId {
    index: usize,
    generation: usize,
}

/// 已分配给某页的帧：标识加上内核地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef {
    id: FrameId,
    kva: Kva,
}

impl FrameRef {
    /// 帧标识
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// 帧的内核虚拟地址
    pub fn kva(&self) -> Kva {
        self.kva
    }
}

// ============================================================================
// 帧表
// ============================================================================

/// 帧的当前主人
pub(crate) struct FrameOwner {
    page: Weak<SpinLock<Page>>,
    page_table: Arc<dyn PageTable>,
    vpn: Vpn,
}

impl FrameOwner {
    pub(crate) fn new(page: Weak<SpinLock<Page>>, page_table: Arc<dyn PageTable>, vpn: Vpn) -> Self {
        Self {
            page,
            page_table,
            vpn,
        }
    }
}

/// 帧表中的一项
pub struct FrameSlot {
    kva: Option<Kva>,
    generation: usize,
    owner: Option<FrameOwner>,
    pinned: bool,
}

impl FrameSlot {
    /// 是否持有页帧
    pub fn is_in_use(&self) -> bool {
        self.kva.is_some()
    }

    /// 是否被钉住
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// 是否可以被淘汰：在用、未钉住且有主人
    pub fn is_evictable(&self) -> bool {
        self.is_in_use() && !self.pinned && self.owner.is_some()
    }

    /// 读取并清除主人页表中的 accessed 位
    pub fn take_accessed(&self) -> bool {
        match &self.owner {
            Some(owner) => {
                let accessed = owner.page_table.is_accessed(owner.vpn);
                if accessed {
                    owner.page_table.set_accessed(owner.vpn, false);
                }
                accessed
            }
            None => false,
        }
    }
}

struct FrameTable {
    slots: Vec<FrameSlot>,
    free_slots: Vec<usize>,
    pool: Box<dyn PhysPagePool>,
    swap: SwapTable,
    policy: Box<dyn EvictionPolicy>,
    evictions: usize,
}

/// 帧分配器的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// 页池容量
    pub capacity: usize,
    /// 已分配给用户页的帧数
    pub in_use: usize,
    /// 页池中的空闲页数
    pub free_pages: usize,
    /// 处于钉住状态的帧数
    pub pinned: usize,
    /// 累计淘汰次数
    pub evictions: usize,
    /// 已占用的交换槽位数
    pub swap_used: usize,
    /// 交换槽位总数
    pub swap_total: usize,
}

impl FrameTable {
    /// 为新取得的页帧准备一个空闲表项
    fn new_slot(&mut self) -> usize {
        match self.free_slots.pop() {
            Some(index) => index,
            None => {
                self.slots.push(FrameSlot {
                    kva: None,
                    generation: 0,
                    owner: None,
                    pinned: false,
                });
                self.slots.len() - 1
            }
        }
    }

    /// 把帧交给新主人并钉住
    fn assign(&mut self, index: usize, kva: Kva, owner: FrameOwner) -> FrameRef {
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.kva = Some(kva);
        slot.owner = Some(owner);
        slot.pinned = true;
        FrameRef {
            id: FrameId {
                index,
                generation: slot.generation,
            },
            kva,
        }
    }

    fn slot_mut(&mut self, id: FrameId) -> Option<&mut FrameSlot> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.is_in_use() && slot.generation == id.generation)
    }

    /// 尝试淘汰一个帧，返回被腾空的帧下标
    ///
    /// 受害页正被别人持有时跳过，所有候选都不可用时返回 `Ok(None)`。
    fn evict_one(&mut self) -> VmResult<Option<usize>> {
        for _ in 0..self.slots.len().max(1) {
            let Some(index) = self.policy.select_victim(&self.slots) else {
                return Ok(None);
            };
            if self.evict(index)? {
                self.evictions += 1;
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn evict(&mut self, index: usize) -> VmResult<bool> {
        let FrameTable { slots, swap, .. } = self;
        let slot = &mut slots[index];
        let (Some(kva), Some(owner)) = (slot.kva, slot.owner.as_ref()) else {
            return Ok(false);
        };
        let Some(page_cell) = owner.page.upgrade() else {
            // 页已经不存在，帧只是还没被归还
            log::warn!("vm: reclaiming orphan frame {:#x}", kva.0);
            owner.page_table.unmap(owner.vpn);
            slot.owner = None;
            return Ok(true);
        };
        let Some(mut page) = page_cell.try_lock() else {
            return Ok(false);
        };
        page.swap_out(&*owner.page_table, swap)?;
        log::debug!("vm: evicted page {:#x} from frame {:#x}", page.va().0, kva.0);
        slot.owner = None;
        Ok(true)
    }
}

// ============================================================================
// 帧分配器
// ============================================================================

/// 用户页帧分配器，系统内唯一，由所有地址空间共享
pub struct FrameAllocator {
    inner: SpinLock<FrameTable>,
}

impl FrameAllocator {
    /// 创建使用时钟算法淘汰的分配器
    pub fn new(pool: Box<dyn PhysPagePool>, swap: Arc<dyn SwapDevice>) -> Self {
        Self::with_policy(pool, swap, Box::new(ClockPolicy::new()))
    }

    /// 创建使用指定淘汰策略的分配器
    pub fn with_policy(
        pool: Box<dyn PhysPagePool>,
        swap: Arc<dyn SwapDevice>,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            inner: SpinLock::new(FrameTable {
                slots: Vec::new(),
                free_slots: Vec::new(),
                pool,
                swap: SwapTable::new(swap),
                policy,
                evictions: 0,
            }),
        }
    }

    /// 为 `owner` 分配一个钉住的帧，必要时淘汰其他页
    ///
    /// # Panics
    /// 页池耗尽且没有任何可淘汰的帧，或交换区已满时 panic
    pub(crate) fn acquire(&self, owner: FrameOwner) -> FrameRef {
        for _ in 0..ACQUIRE_RETRIES {
            let mut table = self.inner.lock();
            if let Some(kva) = table.pool.get_page() {
                let index = table.new_slot();
                return table.assign(index, kva, owner);
            }
            match table.evict_one() {
                Ok(Some(index)) => {
                    if let Some(kva) = table.slots[index].kva {
                        return table.assign(index, kva, owner);
                    }
                }
                Ok(None) => {
                    drop(table);
                    hint::spin_loop();
                }
                Err(e) => panic!("vm: eviction failed: {:?}", e),
            }
        }
        log::error!("vm: no free frame and no evictable frame");
        panic!("vm: out of frames");
    }

    /// 归还帧；`frame` 已过期时忽略
    pub(crate) fn release(&self, frame: FrameRef) {
        let mut table = self.inner.lock();
        let Some(slot) = table.slot_mut(frame.id) else {
            log::warn!("vm: release of stale frame {:?}", frame.id);
            return;
        };
        slot.kva = None;
        slot.owner = None;
        slot.pinned = false;
        table.pool.free_page(frame.kva);
        table.free_slots.push(frame.id.index);
    }

    /// 解除钉住，帧此后可以被淘汰
    pub(crate) fn unpin(&self, frame: FrameRef) {
        if let Some(slot) = self.inner.lock().slot_mut(frame.id) {
            slot.pinned = false;
        }
    }

    /// 从交换槽位换入并释放槽位
    pub(crate) fn swap_in(&self, slot: SwapSlot, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        self.inner.lock().swap.swap_in(slot, page)
    }

    /// 读取交换槽位，不释放
    pub(crate) fn read_swap(&self, slot: SwapSlot, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        self.inner.lock().swap.read(slot, page)
    }

    /// 释放交换槽位
    pub(crate) fn free_swap(&self, slot: SwapSlot) {
        self.inner.lock().swap.free(slot);
    }

    /// 当前统计信息
    pub fn stats(&self) -> FrameStats {
        let table = self.inner.lock();
        FrameStats {
            capacity: table.pool.capacity(),
            in_use: table.slots.iter().filter(|s| s.is_in_use()).count(),
            free_pages: table.pool.free_pages(),
            pinned: table.slots.iter().filter(|s| s.is_pinned()).count(),
            evictions: table.evictions,
            swap_used: table.swap.used_slots(),
            swap_total: table.swap.total_slots(),
        }
    }
}
