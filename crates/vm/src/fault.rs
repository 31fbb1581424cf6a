//! 缺页处理
//!
//! 按以下顺序判定一次缺页：
//!
//! 1. 空地址，或用户态访问内核地址：非法访问
//! 2. 页存在（保护错误）：写只读页
//! 3. 补充页表中有该页：写只读页视为保护错误，否则装入该页
//! 4. 地址紧贴栈指针且在栈上限内：栈向下增长一页
//! 5. 其余情况：未映射
//!
//! 返回错误时由调用方终止进程。

use crate::address::Vaddr;
use crate::config::{PAGE_SIZE, vm_config};
use crate::error::{VmError, VmResult};
use crate::memory_space::AddressSpace;
use crate::page::{Initializer, PageKind};

/// 一次缺页的现场
#[derive(Debug, Clone, Copy)]
pub struct PageFault {
    /// 触发缺页的地址
    pub addr: Vaddr,
    /// 是否发生在用户态
    pub user: bool,
    /// 是否为写访问
    pub write: bool,
    /// 页是否不存在（否则为保护错误）
    pub not_present: bool,
    /// 用户栈指针；内核态缺页时为进入内核前保存的用户栈指针
    pub stack_pointer: Vaddr,
}

/// 缺页被如何解决
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultResolution {
    /// 装入了已登记的页
    DemandFill,
    /// 栈增长了一页
    StackGrowth,
}

impl AddressSpace {
    /// 处理缺页
    pub fn handle_page_fault(&mut self, fault: &PageFault) -> VmResult<FaultResolution> {
        let addr = fault.addr;
        if addr.is_null() || (fault.user && self.page_table().is_kernel_address(addr)) {
            log::warn!("vm: invalid access to {:#x}", addr.0);
            return Err(VmError::InvalidAddress);
        }
        if !fault.not_present {
            log::warn!("vm: write to read-only page {:#x}", addr.0);
            return Err(VmError::WriteProtect);
        }

        if let Some(page) = self.spt().find(addr) {
            if fault.write && !page.lock().is_writable() {
                log::warn!("vm: write to read-only page {:#x}", addr.0);
                return Err(VmError::WriteProtect);
            }
            self.spt().claim(&page)?;
            log::trace!("vm: demand fill at {:#x}", addr.0);
            return Ok(FaultResolution::DemandFill);
        }

        if self.is_stack_access(fault) {
            self.grow_stack(addr)?;
            return Ok(FaultResolution::StackGrowth);
        }

        log::debug!("vm: unmapped access to {:#x}", addr.0);
        Err(VmError::Unmapped)
    }

    /// 地址是否落在栈指针附近、当前栈底之下
    fn is_stack_access(&self, fault: &PageFault) -> bool {
        let slack = vm_config().stack_slack();
        let floor = fault.stack_pointer.0.saturating_sub(slack);
        fault.addr.0 >= floor && fault.addr < self.stack_bottom()
    }

    /// 在栈底下方登记并装入一页
    fn grow_stack(&mut self, addr: Vaddr) -> VmResult<()> {
        let config = vm_config();
        let top = config.user_stack_top();
        let limit = top.saturating_sub(config.max_stack_size());
        let new_bottom = self.stack_bottom() - PAGE_SIZE;
        if addr.0 < limit || new_bottom.0 < limit {
            log::warn!("vm: stack overflow at {:#x}", addr.0);
            return Err(VmError::StackOverflow);
        }

        self.allocate_lazy_page(PageKind::Anon, new_bottom, true, Initializer::Zero)?;
        self.claim_page(new_bottom)?;
        self.set_stack_bottom(new_bottom);
        log::debug!("vm: stack grown to {:#x}", new_bottom.0);
        Ok(())
    }
}
