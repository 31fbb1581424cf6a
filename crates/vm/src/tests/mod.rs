// Unit tests for vm.
//
// The host mocks from `test-support` stand in for the MMU, files, the swap disk and
// physical memory. This module implements the crate's traits for them and provides a
// small harness that wires a frame allocator over a page-aligned host buffer.

use crate::{
    AddressSpace, BitmapPagePool, FrameAllocator, Kva, MmFile, PAGE_SIZE, PageFault, PageTable,
    PteFlags, SwapDevice, Vaddr, VmConfig, VmError, VmResult, Vpn, register_config,
};
use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
use test_support::mock::{
    arch::MOCK_ARCH_OPS,
    fs::{MockFile, MockInode},
    mm::{MOCK_VM_CONFIG, MockPhysMemory, MockVmConfig},
    mmu::MockPageTable,
    swap::MockSwapDisk,
};

mod fork;
mod pool;
mod spt;

// ============================================================================
// Mock 适配
// ============================================================================

impl VmConfig for MockVmConfig {
    fn user_stack_top(&self) -> usize {
        MockVmConfig::user_stack_top(self)
    }

    fn max_stack_size(&self) -> usize {
        MockVmConfig::max_stack_size(self)
    }

    fn stack_slack(&self) -> usize {
        MockVmConfig::stack_slack(self)
    }
}

impl PageTable for MockPageTable {
    fn map(&self, vpn: Vpn, kva: Kva, flags: PteFlags) -> VmResult<()> {
        if self.insert(vpn.0, kva.0, flags.bits()) {
            Ok(())
        } else {
            Err(VmError::MapFailed)
        }
    }

    fn unmap(&self, vpn: Vpn) {
        self.remove(vpn.0);
    }

    fn flags(&self, vpn: Vpn) -> Option<PteFlags> {
        self.get(vpn.0)
            .map(|pte| PteFlags::from_bits_truncate(pte.flags))
    }

    fn update_flags(&self, vpn: Vpn, flags: PteFlags) {
        self.set_flags(vpn.0, flags.bits());
    }

    fn is_kernel_address(&self, va: Vaddr) -> bool {
        MockPageTable::is_kernel_address(self, va.0)
    }
}

impl MmFile for MockFile {
    fn reopen(&self) -> Result<Arc<dyn MmFile>, isize> {
        Ok(Arc::new(MockFile::reopen(self)))
    }

    fn len(&self) -> usize {
        MockFile::len(self)
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize> {
        MockFile::read_at(self, offset, buf)
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize> {
        MockFile::write_at(self, offset, buf)
    }
}

impl SwapDevice for MockSwapDisk {
    fn slot_count(&self) -> usize {
        MockSwapDisk::slot_count(self)
    }

    fn read_slot(&self, slot: usize, buf: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        if MockSwapDisk::read_slot(self, slot, buf) {
            Ok(())
        } else {
            Err(VmError::Io)
        }
    }

    fn write_slot(&self, slot: usize, buf: &[u8; PAGE_SIZE]) -> VmResult<()> {
        if MockSwapDisk::write_slot(self, slot, buf) {
            Ok(())
        } else {
            Err(VmError::Io)
        }
    }
}

/// `sync::ArchOps` 与 `MockArchOps` 都来自外部 crate，需要一层本地包装
struct HostArchOps;

impl sync::ArchOps for HostArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { MOCK_ARCH_OPS.read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { MOCK_ARCH_OPS.restore_interrupts(flags) }
    }
}

static HOST_ARCH_OPS: HostArchOps = HostArchOps;

fn setup() {
    unsafe {
        sync::register_arch_ops(&HOST_ARCH_OPS);
        register_config(&MOCK_VM_CONFIG);
    }
}

// ============================================================================
// 测试夹具
// ============================================================================

/// 一个帧分配器加一张页表；字段顺序保证宿主内存最后释放
struct Harness {
    frames: Arc<FrameAllocator>,
    swap: Arc<MockSwapDisk>,
    pt: Arc<MockPageTable>,
    _memory: MockPhysMemory,
}

impl Harness {
    fn new(frames: usize, swap_slots: usize) -> Self {
        setup();
        let memory = MockPhysMemory::new(frames);
        let pool = unsafe { BitmapPagePool::new(Kva(memory.base()), memory.pages()) };
        let swap = Arc::new(MockSwapDisk::new(swap_slots));
        let allocator = FrameAllocator::new(Box::new(pool), swap.clone());
        Self {
            frames: Arc::new(allocator),
            swap,
            pt: Arc::new(MockPageTable::new()),
            _memory: memory,
        }
    }

    /// 使用夹具页表的地址空间
    fn space(&self) -> AddressSpace {
        AddressSpace::new(self.pt.clone(), Arc::clone(&self.frames))
    }

    /// 使用另一张页表、共享帧分配器的地址空间
    fn space_with(&self, pt: &Arc<MockPageTable>) -> AddressSpace {
        AddressSpace::new(pt.clone(), Arc::clone(&self.frames))
    }
}

fn stack_top() -> usize {
    MOCK_VM_CONFIG.user_stack_top()
}

fn user_fault(addr: usize, write: bool) -> PageFault {
    PageFault {
        addr: Vaddr(addr),
        user: true,
        write,
        not_present: true,
        stack_pointer: Vaddr(stack_top()),
    }
}

fn open_file(data: &[u8]) -> (Arc<MockInode>, Arc<dyn MmFile>) {
    let inode = MockInode::new(data);
    let file: Arc<dyn MmFile> = Arc::new(MockFile::open(&inode));
    (inode, file)
}

/// 以用户身份写入；页不在内存时先处理缺页，和硬件重试指令一样
fn user_write(space: &mut AddressSpace, pt: &MockPageTable, va: usize, bytes: &[u8]) {
    for _ in 0..8 {
        if pt.user_write(va, bytes) {
            return;
        }
        space
            .handle_page_fault(&user_fault(va, true))
            .expect("write fault not resolved");
    }
    panic!("user write to {:#x} kept faulting", va);
}

/// 以用户身份读取整页
fn user_read_page(space: &mut AddressSpace, pt: &MockPageTable, va: usize) -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    for _ in 0..8 {
        if pt.user_read(va, &mut buf) {
            return buf;
        }
        space
            .handle_page_fault(&user_fault(va, false))
            .expect("read fault not resolved");
    }
    panic!("user read of {:#x} kept faulting", va);
}

fn pattern(seed: u8) -> Vec<u8> {
    (0..PAGE_SIZE)
        .map(|i| seed.wrapping_add((i % 251) as u8))
        .collect()
}
