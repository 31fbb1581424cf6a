//! 虚拟内存配置与物理内存的 Mock 实现
//!
//! 注意：这里不直接依赖 `vm` crate（避免循环依赖）。
//! `vm` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `VmConfig`）。

use alloc::alloc::{Layout, alloc_zeroed, dealloc};

use super::MOCK_PAGE_SIZE;

/// Mock 的虚拟内存配置
pub struct MockVmConfig;

impl MockVmConfig {
    pub const fn new() -> Self {
        Self
    }

    pub fn user_stack_top(&self) -> usize {
        0x4748_0000
    }

    pub fn max_stack_size(&self) -> usize {
        1024 * 1024
    }

    pub fn stack_slack(&self) -> usize {
        32
    }
}

/// 全局 Mock 实例
pub static MOCK_VM_CONFIG: MockVmConfig = MockVmConfig::new();

/// 宿主机堆上的一段页对齐内存，充当物理页池
///
/// 页帧的“内核虚拟地址”就是这段内存里的真实地址，
/// 因此被测代码可以直接读写页内容。
pub struct MockPhysMemory {
    base: usize,
    pages: usize,
}

impl MockPhysMemory {
    pub fn new(pages: usize) -> Self {
        assert!(pages > 0);
        let base = unsafe { alloc_zeroed(Self::layout(pages)) };
        assert!(!base.is_null(), "mock: host allocation failed");
        Self {
            base: base as usize,
            pages,
        }
    }

    fn layout(pages: usize) -> Layout {
        Layout::from_size_align(pages * MOCK_PAGE_SIZE, MOCK_PAGE_SIZE)
            .expect("mock: bad layout")
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base + self.pages * MOCK_PAGE_SIZE
    }
}

impl Drop for MockPhysMemory {
    fn drop(&mut self) {
        unsafe { dealloc(self.base as *mut u8, Self::layout(self.pages)) };
    }
}
