//! 架构相关操作的 Mock 实现

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mock 架构操作
///
/// 中断开关只是一个全局标志，同时统计关中断与恢复中断的次数，
/// 便于测试断言锁确实经过了中断保护路径。
pub struct MockArchOps {
    pub interrupt_state: AtomicBool,
    disables: AtomicUsize,
    restores: AtomicUsize,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
            disables: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
        }
    }

    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.disables.fetch_add(1, Ordering::Relaxed);
        if self.interrupt_state.swap(false, Ordering::SeqCst) {
            self.sstatus_sie()
        } else {
            0
        }
    }

    pub unsafe fn restore_interrupts(&self, flags: usize) {
        self.restores.fetch_add(1, Ordering::Relaxed);
        self.interrupt_state
            .store(flags & self.sstatus_sie() != 0, Ordering::SeqCst);
    }

    pub fn sstatus_sie(&self) -> usize {
        0x2 // SIE bit
    }

    /// 累计关中断次数
    pub fn disable_count(&self) -> usize {
        self.disables.load(Ordering::Relaxed)
    }

    /// 累计恢复中断次数
    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::Relaxed)
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
