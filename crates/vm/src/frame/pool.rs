//! 物理页池
//!
//! [`FrameAllocator`](super::FrameAllocator) 从页池取得空闲页帧，
//! 只有页池耗尽时才会触发淘汰。

use crate::address::Kva;
use crate::bitmap::Bitmap;
use crate::config::PAGE_SIZE;

/// 用户页帧的来源
///
/// 方法在帧表锁内调用，实现不能再去获取帧表锁。
pub trait PhysPagePool: Send {
    /// 取出一个空闲页帧，内容清零；耗尽时返回 `None`
    fn get_page(&mut self) -> Option<Kva>;

    /// 归还页帧
    fn free_page(&mut self, kva: Kva);

    /// 页池容量（页数）
    fn capacity(&self) -> usize;

    /// 当前空闲页数
    fn free_pages(&self) -> usize;
}

/// 管理一段连续内核内存的位图页池
pub struct BitmapPagePool {
    base: Kva,
    pages: Bitmap,
}

impl BitmapPagePool {
    /// 以 `base` 起始、共 `count` 页的内存创建页池
    ///
    /// # Safety
    /// `[base, base + count * PAGE_SIZE)` 必须是有效、页对齐且只归本页池使用的内存
    pub unsafe fn new(base: Kva, count: usize) -> Self {
        debug_assert!(base.0 % PAGE_SIZE == 0, "pool: base not page aligned");
        Self {
            base,
            pages: Bitmap::new(count),
        }
    }
}

impl PhysPagePool for BitmapPagePool {
    fn get_page(&mut self) -> Option<Kva> {
        let idx = self.pages.alloc()?;
        let kva = Kva(self.base.0 + idx * PAGE_SIZE);
        // SAFETY: kva 位于本页池管理的内存中，且刚被分配出去
        unsafe { kva.as_page_mut() }.fill(0);
        Some(kva)
    }

    fn free_page(&mut self, kva: Kva) {
        debug_assert!(kva.0 >= self.base.0, "pool: page out of range");
        self.pages.free((kva.0 - self.base.0) / PAGE_SIZE);
    }

    fn capacity(&self) -> usize {
        self.pages.total()
    }

    fn free_pages(&self) -> usize {
        self.pages.total() - self.pages.allocated()
    }
}
