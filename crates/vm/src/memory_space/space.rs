//! 用户地址空间

use super::SupplementalPageTable;
use crate::address::Vaddr;
use crate::config::{PAGE_SIZE, vm_config};
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::frame::FrameAllocator;
use crate::mmu::PageTable;
use crate::page::{FileChunk, Initializer, PageKind};
use alloc::sync::Arc;

/// 一个用户进程的地址空间
///
/// 持有补充页表和用户栈的低水位线（栈当前最低页的起始地址）。
pub struct AddressSpace {
    spt: SupplementalPageTable,
    stack_bottom: Vaddr,
}

impl AddressSpace {
    /// 创建空地址空间，栈尚未建立
    pub fn new(page_table: Arc<dyn PageTable>, frames: Arc<FrameAllocator>) -> Self {
        Self {
            spt: SupplementalPageTable::new(page_table, frames),
            stack_bottom: Vaddr(vm_config().user_stack_top()),
        }
    }

    /// 补充页表
    pub fn spt(&self) -> &SupplementalPageTable {
        &self.spt
    }

    /// 补充页表的可变引用
    pub fn spt_mut(&mut self) -> &mut SupplementalPageTable {
        &mut self.spt
    }

    /// 硬件页表
    pub fn page_table(&self) -> &Arc<dyn PageTable> {
        self.spt.page_table()
    }

    /// 栈的最低页起始地址
    pub fn stack_bottom(&self) -> Vaddr {
        self.stack_bottom
    }

    pub(crate) fn set_stack_bottom(&mut self, bottom: Vaddr) {
        self.stack_bottom = bottom;
    }

    /// 登记一个未初始化页，见 [`SupplementalPageTable::allocate_lazy_page`]
    pub fn allocate_lazy_page(
        &mut self,
        kind: PageKind,
        va: Vaddr,
        writable: bool,
        init: Initializer,
    ) -> VmResult<()> {
        self.spt.allocate_lazy_page(kind, va, writable, init)
    }

    /// 立即把包含 `va` 的页装入内存
    pub fn claim_page(&self, va: Vaddr) -> VmResult<()> {
        self.spt.claim_page(va)
    }

    /// 建立初始用户栈：登记并装入栈顶下方的一页
    ///
    /// 返回初始栈指针（栈顶）。
    pub fn setup_stack(&mut self) -> VmResult<Vaddr> {
        let top = Vaddr(vm_config().user_stack_top());
        let bottom = top - PAGE_SIZE;
        self.spt
            .allocate_lazy_page(PageKind::Anon, bottom, true, Initializer::Zero)?;
        self.spt.claim_page(bottom)?;
        self.stack_bottom = bottom;
        Ok(top)
    }

    /// 延迟加载程序段
    ///
    /// 从 `upage` 开始逐页登记：每页读取至多 `PAGE_SIZE` 字节文件内容，
    /// 其余补零，共覆盖 `read_bytes + zero_bytes` 字节。页在首次访问时才读文件，
    /// 之后作为匿名页。
    pub fn map_segment(
        &mut self,
        file: &Arc<dyn MmFile>,
        offset: usize,
        upage: Vaddr,
        read_bytes: usize,
        zero_bytes: usize,
        writable: bool,
    ) -> VmResult<()> {
        if !upage.is_page_aligned()
            || offset % PAGE_SIZE != 0
            || (read_bytes + zero_bytes) % PAGE_SIZE != 0
        {
            return Err(VmError::InvalidArgument);
        }

        let mut va = upage;
        let mut offset = offset;
        let mut remaining = read_bytes;
        let pages = (read_bytes + zero_bytes) / PAGE_SIZE;
        for _ in 0..pages {
            let page_read = remaining.min(PAGE_SIZE);
            let chunk = FileChunk::new(Arc::clone(file), offset, page_read);
            self.spt
                .allocate_lazy_page(PageKind::Anon, va, writable, Initializer::Segment(chunk))?;
            remaining -= page_read;
            offset += page_read;
            va = va + PAGE_SIZE;
        }
        Ok(())
    }

    /// 复制地址空间（fork）
    ///
    /// 子地址空间使用 `page_table`，与父进程共享帧分配器。
    pub fn fork(&self, page_table: Arc<dyn PageTable>) -> VmResult<AddressSpace> {
        let mut child = AddressSpace {
            spt: SupplementalPageTable::new(page_table, Arc::clone(self.spt.frames())),
            stack_bottom: self.stack_bottom,
        };
        child.spt.copy_from(&self.spt)?;
        Ok(child)
    }
}
