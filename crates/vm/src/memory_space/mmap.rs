//! 文件映射的建立与拆除

use super::{AddressSpace, MmapFile};
use crate::address::Vaddr;
use crate::config::PAGE_SIZE;
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::page::{FilePage, Initializer, PageKind};
use alloc::sync::Arc;

impl AddressSpace {
    /// 把 `file` 从 `offset` 开始的内容映射到 `addr`
    ///
    /// 只登记页，不做任何 I/O。映射持有重新打开的文件句柄。
    /// 超出文件末尾的部分补零。与已有页冲突时，本次登记的页全部撤销。
    pub fn mmap(
        &mut self,
        addr: Vaddr,
        length: usize,
        writable: bool,
        file: &Arc<dyn MmFile>,
        offset: usize,
    ) -> VmResult<Vaddr> {
        if addr.is_null() || !addr.is_page_aligned() || offset % PAGE_SIZE != 0 || length == 0 {
            return Err(VmError::InvalidArgument);
        }
        let end = addr.checked_add(length).ok_or(VmError::InvalidArgument)?;
        let pt = self.page_table();
        if pt.is_kernel_address(addr) || pt.is_kernel_address(end - 1) {
            return Err(VmError::InvalidArgument);
        }
        if file.is_empty() {
            return Err(VmError::InvalidArgument);
        }

        let file_len = file.len();
        let file = file.reopen().map_err(|errno| {
            log::warn!("vm: mmap reopen failed: {}", errno);
            VmError::Io
        })?;
        let mapping = Arc::new(MmapFile {
            file,
            base: addr,
            offset,
            len: length,
            writable,
        });

        let mut remaining = file_len.saturating_sub(offset).min(length);
        for (i, vpn) in mapping.vpn_range().iter().enumerate() {
            let read_bytes = remaining.min(PAGE_SIZE);
            let page = FilePage::new(Arc::clone(&mapping), offset + i * PAGE_SIZE, read_bytes);
            let result = self.allocate_lazy_page(
                PageKind::File,
                vpn.start_addr(),
                writable,
                Initializer::MmapChunk(page),
            );
            if let Err(e) = result {
                for registered in mapping.vpn_range().iter().take(i) {
                    self.spt_mut().remove(registered.start_addr());
                }
                return Err(e);
            }
            remaining -= read_bytes;
        }

        log::debug!("vm: mmap {:#x}..{:#x} offset {:#x}", addr.0, end.0, offset);
        Ok(addr)
    }

    /// 拆除包含 `addr` 的文件映射
    ///
    /// 映射的每一页：被写过则写回文件，然后移除映射并销毁页。
    pub fn munmap(&mut self, addr: Vaddr) -> VmResult<()> {
        let page = self.spt().find(addr).ok_or(VmError::NotMapped)?;
        let mapping = page
            .lock()
            .mapping()
            .cloned()
            .ok_or(VmError::NotMapped)?;

        for vpn in mapping.vpn_range().iter() {
            let va = vpn.start_addr();
            let belongs = match self.spt().find(va) {
                Some(page) => page
                    .lock()
                    .mapping()
                    .is_some_and(|m| Arc::ptr_eq(m, &mapping)),
                None => false,
            };
            if belongs {
                self.spt_mut().remove(va);
            }
        }
        log::debug!("vm: munmap {:#x}", mapping.base.0);
        Ok(())
    }
}
