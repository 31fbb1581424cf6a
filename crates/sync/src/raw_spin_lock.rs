//! 关中断自旋锁
//!
//! 基于原子操作实现，作为 [`lock_api::RawMutex`] 供 [`crate::SpinLock`] 使用。

use crate::arch_ops;
use core::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use lock_api::{GuardNoSend, RawMutex};

/// 底层自旋锁。
///
/// 加锁时先关闭本地中断并记录之前的中断状态，解锁时恢复。
/// 不可重入 (即不能在持锁时再次加同一把锁)。
///
/// 注意：关中断只能阻止**本地 CPU** 的“任务 vs 本地中断”并发，
/// 多核之间的互斥由锁标志本身保证。
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
    /// 加锁前的中断状态，只有持锁者会读写
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一个新的 RawSpinLock 实例。
    pub const fn new() -> Self {
        RawSpinLock {
            lock: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: lock/try_lock 成功后 lock 标志为 true，直到 unlock 才清除，
// 因此同一时刻最多只有一个持有者。
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    // 中断状态属于当前 CPU，守卫不能跨线程传递
    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        // SAFETY: 与 unlock 中的 restore_interrupts 成对出现
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };

        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }

        self.saved_flags.store(flags, Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        // SAFETY: 失败时立即恢复，成功时由 unlock 恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };

        if self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.saved_flags.store(flags, Ordering::Relaxed);
            true
        } else {
            unsafe { arch_ops().restore_interrupts(flags) };
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.lock.store(false, Ordering::Release);
        // SAFETY: flags 是本次加锁时保存的中断状态
        unsafe { arch_ops().restore_interrupts(flags) };
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}
