//! 位图分配器
//!
//! 每个 bit 表示一个资源（0=空闲，1=已分配），物理页池和交换槽位表都基于它。
//! 分配时从 `last_alloc_hint` 开始循环查找，利用局部性跳过已满的 u64。

use alloc::{vec, vec::Vec};

/// 定长位图
#[derive(Debug)]
pub(crate) struct Bitmap {
    words: Vec<u64>,
    total: usize,
    allocated: usize,
    last_alloc_hint: usize,
}

impl Bitmap {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            words: vec![0u64; total.div_ceil(64)],
            total,
            allocated: 0,
            last_alloc_hint: 0,
        }
    }

    #[inline]
    pub(crate) fn is_free(&self, idx: usize) -> bool {
        (self.words[idx / 64] & (1u64 << (idx % 64))) == 0
    }

    /// 分配一个空闲位，返回其下标
    pub(crate) fn alloc(&mut self) -> Option<usize> {
        let len = self.words.len();
        for offset in 0..len {
            let word_idx = (self.last_alloc_hint + offset) % len;
            let word = self.words[word_idx];
            if word == u64::MAX {
                continue;
            }
            let idx = word_idx * 64 + (!word).trailing_zeros() as usize;
            // 最后一个 u64 的尾部超出范围
            if idx >= self.total {
                continue;
            }
            self.words[word_idx] |= 1u64 << (idx % 64);
            self.allocated += 1;
            self.last_alloc_hint = word_idx;
            return Some(idx);
        }
        None
    }

    /// 释放一个位
    pub(crate) fn free(&mut self, idx: usize) {
        debug_assert!(idx < self.total, "bitmap: index out of range");
        debug_assert!(!self.is_free(idx), "bitmap: double free detected");
        self.words[idx / 64] &= !(1u64 << (idx % 64));
        self.allocated -= 1;
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn allocated(&self) -> usize {
        self.allocated
    }
}
