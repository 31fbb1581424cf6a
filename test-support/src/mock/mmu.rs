//! 页表的 Mock 实现
//!
//! 用一个 `BTreeMap<vpn, MockPte>` 模拟硬件页表，并提供
//! “用户态访问” 辅助函数：通过映射找到页帧后读写内存，
//! 同时像硬件一样置位 accessed / dirty。

use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use super::MOCK_PAGE_SIZE;

pub const MOCK_PTE_WRITABLE: u8 = 1 << 0;
pub const MOCK_PTE_USER: u8 = 1 << 1;
pub const MOCK_PTE_ACCESSED: u8 = 1 << 2;
pub const MOCK_PTE_DIRTY: u8 = 1 << 3;

/// 一个页表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPte {
    pub kva: usize,
    pub flags: u8,
}

/// Mock 页表
pub struct MockPageTable {
    entries: Mutex<BTreeMap<usize, MockPte>>,
    /// 内核地址空间起点，不小于它的地址视为内核地址
    kernel_base: usize,
    /// 页表最多容纳的映射数，用于模拟页表页耗尽
    capacity: Option<usize>,
    map_calls: AtomicUsize,
}

impl MockPageTable {
    pub const KERNEL_BASE: usize = 0x8000_0000;

    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            kernel_base: Self::KERNEL_BASE,
            capacity: None,
            map_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    pub fn is_kernel_address(&self, addr: usize) -> bool {
        addr >= self.kernel_base
    }

    /// 安装映射；已存在或容量耗尽时返回 false
    pub fn insert(&self, vpn: usize, kva: usize, flags: u8) -> bool {
        self.map_calls.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock();
        if entries.contains_key(&vpn) {
            return false;
        }
        if self.capacity.is_some_and(|cap| entries.len() >= cap) {
            return false;
        }
        entries.insert(vpn, MockPte { kva, flags });
        true
    }

    pub fn remove(&self, vpn: usize) -> Option<MockPte> {
        self.entries.lock().remove(&vpn)
    }

    pub fn get(&self, vpn: usize) -> Option<MockPte> {
        self.entries.lock().get(&vpn).copied()
    }

    pub fn set_flags(&self, vpn: usize, flags: u8) {
        if let Some(pte) = self.entries.lock().get_mut(&vpn) {
            pte.flags = flags;
        }
    }

    pub fn mapped_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn map_calls(&self) -> usize {
        self.map_calls.load(Ordering::Relaxed)
    }

    /// 以用户身份写内存；遇到未映射或只读页时在该处停止并返回 false
    pub fn user_write(&self, va: usize, bytes: &[u8]) -> bool {
        let mut done = 0;
        while done < bytes.len() {
            let addr = va + done;
            let offset = addr % MOCK_PAGE_SIZE;
            let chunk = (MOCK_PAGE_SIZE - offset).min(bytes.len() - done);
            let mut entries = self.entries.lock();
            let Some(pte) = entries.get_mut(&(addr / MOCK_PAGE_SIZE)) else {
                return false;
            };
            if pte.flags & MOCK_PTE_WRITABLE == 0 {
                return false;
            }
            pte.flags |= MOCK_PTE_ACCESSED | MOCK_PTE_DIRTY;
            let dst = (pte.kva + offset) as *mut u8;
            unsafe { core::ptr::copy_nonoverlapping(bytes[done..].as_ptr(), dst, chunk) };
            done += chunk;
        }
        true
    }

    /// 以用户身份读内存；遇到未映射页时返回 false
    pub fn user_read(&self, va: usize, buf: &mut [u8]) -> bool {
        let mut done = 0;
        while done < buf.len() {
            let addr = va + done;
            let offset = addr % MOCK_PAGE_SIZE;
            let chunk = (MOCK_PAGE_SIZE - offset).min(buf.len() - done);
            let mut entries = self.entries.lock();
            let Some(pte) = entries.get_mut(&(addr / MOCK_PAGE_SIZE)) else {
                return false;
            };
            pte.flags |= MOCK_PTE_ACCESSED;
            let src = (pte.kva + offset) as *const u8;
            unsafe { core::ptr::copy_nonoverlapping(src, buf[done..].as_mut_ptr(), chunk) };
            done += chunk;
        }
        true
    }
}

impl Default for MockPageTable {
    fn default() -> Self {
        Self::new()
    }
}
