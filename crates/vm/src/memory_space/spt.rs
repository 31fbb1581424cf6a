//! 补充页表
//!
//! 硬件页表只记录驻留页；补充页表记录地址空间中登记过的每一页，
//! 包括尚未访问、已被换出的页。缺页时据此找到页并把它装入内存。

use crate::address::{Kva, Vaddr, Vpn};
use crate::error::{VmError, VmResult};
use crate::frame::{FrameAllocator, FrameOwner};
use crate::mmu::{PageTable, PteFlags};
use crate::page::{Backend, Initializer, Page, PageKind, PageRef};
use alloc::{collections::BTreeMap, sync::Arc};
use sync::SpinLock;

/// 补充页表，以页码为键
pub struct SupplementalPageTable {
    pages: BTreeMap<Vpn, PageRef>,
    page_table: Arc<dyn PageTable>,
    frames: Arc<FrameAllocator>,
}

impl SupplementalPageTable {
    /// 创建空表
    pub fn new(page_table: Arc<dyn PageTable>, frames: Arc<FrameAllocator>) -> Self {
        Self {
            pages: BTreeMap::new(),
            page_table,
            frames,
        }
    }

    /// 对应的硬件页表
    pub fn page_table(&self) -> &Arc<dyn PageTable> {
        &self.page_table
    }

    /// 共享的帧分配器
    pub fn frames(&self) -> &Arc<FrameAllocator> {
        &self.frames
    }

    /// 登记的页数
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// 是否没有登记任何页
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 查找包含 `va` 的页
    pub fn find(&self, va: Vaddr) -> Option<PageRef> {
        self.pages.get(&va.floor()).cloned()
    }

    /// 登记一页；地址已被占用时返回 false，表保持不变
    pub fn insert(&mut self, page: Page) -> bool {
        self.insert_ref(page).is_some()
    }

    fn insert_ref(&mut self, page: Page) -> Option<PageRef> {
        match self.pages.entry(page.vpn()) {
            alloc::collections::btree_map::Entry::Occupied(_) => None,
            alloc::collections::btree_map::Entry::Vacant(entry) => {
                Some(Arc::clone(entry.insert(Arc::new(SpinLock::new(page)))))
            }
        }
    }

    /// 销毁包含 `va` 的页并从表中移除
    ///
    /// 驻留的文件页若被写过会先写回。返回是否存在这样的页。
    pub fn remove(&mut self, va: Vaddr) -> bool {
        match self.pages.remove(&va.floor()) {
            Some(page) => {
                self.destroy_page(&page);
                true
            }
            None => false,
        }
    }

    /// 登记一个未初始化页
    pub fn allocate_lazy_page(
        &mut self,
        kind: PageKind,
        va: Vaddr,
        writable: bool,
        init: Initializer,
    ) -> VmResult<()> {
        let page = Page::new_uninit(va, writable, kind, init)?;
        if self.insert(page) {
            Ok(())
        } else {
            Err(VmError::AlreadyMapped)
        }
    }

    /// 把包含 `va` 的页装入内存
    pub fn claim_page(&self, va: Vaddr) -> VmResult<()> {
        let page = self.find(va).ok_or(VmError::Unmapped)?;
        self.claim(&page)
    }

    /// 为页分配帧、安装映射并换入内容；已驻留时什么也不做
    pub fn claim(&self, page: &PageRef) -> VmResult<()> {
        self.claim_with(page, |page, kva| page.swap_in(kva, &self.frames))
    }

    /// 装页的公共流程，`fill` 负责填充帧内容
    ///
    /// 帧在填充期间保持钉住；任何一步失败都会撤销映射并归还帧。
    fn claim_with<F>(&self, page_ref: &PageRef, fill: F) -> VmResult<()>
    where
        F: FnOnce(&mut Page, Kva) -> VmResult<()>,
    {
        let mut page = page_ref.lock();
        if page.is_resident() {
            return Ok(());
        }
        let vpn = page.vpn();
        let owner = FrameOwner::new(
            Arc::downgrade(page_ref),
            Arc::clone(&self.page_table),
            vpn,
        );
        let frame = self.frames.acquire(owner);
        page.set_frame(Some(frame));

        let mut flags = PteFlags::USER;
        if page.is_writable() {
            flags |= PteFlags::WRITABLE;
        }
        if let Err(e) = self.page_table.map(vpn, frame.kva(), flags) {
            log::warn!("vm: failed to map page {:#x}", page.va().0);
            page.set_frame(None);
            self.frames.release(frame);
            return Err(e);
        }

        if let Err(e) = fill(&mut *page, frame.kva()) {
            self.page_table.unmap(vpn);
            page.set_frame(None);
            self.frames.release(frame);
            return Err(e);
        }

        self.frames.unpin(frame);
        log::trace!("vm: page {:#x} resident at {:#x}", page.va().0, frame.kva().0);
        Ok(())
    }

    /// 把 `src` 的所有页复制进本表（fork）
    ///
    /// 驻留页立即复制内容到新帧，源文件页的 dirty 位一并继承；
    /// 已换出的匿名页从交换槽位读出，源槽位保持不变；其余页只复制描述。
    /// 出错时立即返回，已复制的部分不回滚，由调用方丢弃整个表。
    pub fn copy_from(&mut self, src: &SupplementalPageTable) -> VmResult<()> {
        for src_ref in src.pages.values() {
            let src_page = src_ref.lock();
            let child_ref = self
                .insert_ref(src_page.duplicate())
                .ok_or(VmError::AlreadyMapped)?;

            if let Some(src_frame) = src_page.frame() {
                // SAFETY: 持有源页锁，源帧不会被淘汰或释放
                let src_bytes = unsafe { src_frame.kva().as_page() };
                let dirty = matches!(src_page.backend(), Backend::File(_))
                    && src.page_table.is_dirty(src_page.vpn());
                self.claim_with(&child_ref, |page, kva| {
                    // SAFETY: 新帧被钉住且只属于子页
                    unsafe { kva.as_page_mut() }.copy_from_slice(src_bytes);
                    // 源页尚未写回文件的修改，子页同样负责写回
                    if dirty {
                        self.page_table.set_dirty(page.vpn(), true);
                    }
                    Ok(())
                })?;
            } else if let Some(slot) = src_page.swap_slot() {
                self.claim_with(&child_ref, |_, kva| {
                    // SAFETY: 同上
                    self.frames.read_swap(slot, unsafe { kva.as_page_mut() })
                })?;
            }
        }
        Ok(())
    }

    /// 销毁所有页
    pub fn destroy_all(&mut self) {
        let pages = core::mem::take(&mut self.pages);
        for page in pages.values() {
            self.destroy_page(page);
        }
    }

    fn destroy_page(&self, page_ref: &PageRef) {
        let mut page = page_ref.lock();
        if let Some(frame) = page.frame() {
            if let Err(e) = page.write_back(&*self.page_table) {
                log::error!("vm: page {:#x} lost on write back: {:?}", page.va().0, e);
            }
            self.page_table.unmap(page.vpn());
            page.set_frame(None);
            self.frames.release(frame);
        }
        page.destroy(&self.frames);
    }
}

impl Drop for SupplementalPageTable {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
