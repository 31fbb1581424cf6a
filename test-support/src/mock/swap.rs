//! 交换设备的 Mock 实现

use alloc::{vec, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use super::MOCK_PAGE_SIZE;

/// 内存中的交换盘，每个槽位正好一页
pub struct MockSwapDisk {
    data: Mutex<Vec<u8>>,
    slots: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockSwapDisk {
    pub fn new(slots: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; slots * MOCK_PAGE_SIZE]),
            slots,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn read_slot(&self, slot: usize, buf: &mut [u8]) -> bool {
        if slot >= self.slots || buf.len() != MOCK_PAGE_SIZE {
            return false;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        let start = slot * MOCK_PAGE_SIZE;
        buf.copy_from_slice(&self.data.lock()[start..start + MOCK_PAGE_SIZE]);
        true
    }

    pub fn write_slot(&self, slot: usize, buf: &[u8]) -> bool {
        if slot >= self.slots || buf.len() != MOCK_PAGE_SIZE {
            return false;
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        let start = slot * MOCK_PAGE_SIZE;
        self.data.lock()[start..start + MOCK_PAGE_SIZE].copy_from_slice(buf);
        true
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}
