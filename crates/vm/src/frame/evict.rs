//! 淘汰策略

use super::FrameSlot;

/// 淘汰策略
///
/// 在帧表锁内被调用。策略只负责挑选，被选中的页可能正被他人持有，
/// 此时分配器会再次询问策略。
pub trait EvictionPolicy: Send {
    /// 从帧表中挑选一个受害帧的下标；没有可淘汰的帧时返回 `None`
    fn select_victim(&mut self, frames: &[FrameSlot]) -> Option<usize>;
}

/// 时钟（第二次机会）算法
///
/// 指针循环扫描帧表：accessed 位为 1 的帧清零后跳过，
/// 遇到 accessed 位为 0 的帧即选中，指针停在它的下一个位置。
#[derive(Debug, Default)]
pub struct ClockPolicy {
    hand: usize,
}

impl ClockPolicy {
    /// 指针从帧表开头出发
    pub const fn new() -> Self {
        Self { hand: 0 }
    }
}

impl EvictionPolicy for ClockPolicy {
    fn select_victim(&mut self, frames: &[FrameSlot]) -> Option<usize> {
        let len = frames.len();
        if len == 0 {
            return None;
        }
        // 两圈足够：第一圈清掉所有 accessed 位
        for _ in 0..2 * len {
            let index = self.hand % len;
            self.hand = (index + 1) % len;
            let frame = &frames[index];
            if !frame.is_evictable() || frame.take_accessed() {
                continue;
            }
            return Some(index);
        }
        None
    }
}
