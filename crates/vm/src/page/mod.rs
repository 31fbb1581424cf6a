//! 页描述符
//!
//! 每个用户虚拟页对应一个 [`Page`]，记录它的后备存储（[`Backend`]）
//! 以及当前占用的页帧。
//!
//! # 后备存储
//!
//! - [`UninitPage`]：尚未被访问，保存延迟初始化器
//! - [`AnonPage`]：匿名内存，淘汰时写入交换区
//! - [`FilePage`]：文件映射，淘汰时写回文件
//!
//! 未初始化页在首次换入时恰好转换一次，变为匿名页或文件页。
//!
//! # 不变式
//!
//! 页驻留 ⇔ `frame` 为 `Some` ⇔ 页表中存在该页的映射。

mod anon;
mod file;
mod uninit;

pub use anon::AnonPage;
pub use file::{FileChunk, FilePage};
pub use uninit::{Initializer, UninitPage};

use crate::address::{Kva, Vaddr, Vpn};
use crate::error::VmResult;
use crate::frame::{FrameAllocator, FrameRef};
use crate::memory_space::MmapFile;
use crate::mmu::PageTable;
use crate::swap::{SwapSlot, SwapTable};
use alloc::sync::Arc;
use sync::SpinLock;

/// 页的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// 未初始化
    Uninit,
    /// 匿名页
    Anon,
    /// 文件页
    File,
}

/// 页的后备存储
#[derive(Debug)]
pub enum Backend {
    /// 未初始化
    Uninit(UninitPage),
    /// 匿名页
    Anon(AnonPage),
    /// 文件页
    File(FilePage),
}

impl Backend {
    /// 当前种类
    pub fn kind(&self) -> PageKind {
        match self {
            Backend::Uninit(_) => PageKind::Uninit,
            Backend::Anon(_) => PageKind::Anon,
            Backend::File(_) => PageKind::File,
        }
    }

    /// 为子进程复制后备状态
    ///
    /// 匿名页的交换槽位不共享，内容由调用方另行复制。
    fn duplicate(&self) -> Backend {
        match self {
            Backend::Uninit(uninit) => Backend::Uninit(uninit.clone()),
            Backend::Anon(_) => Backend::Anon(AnonPage::new()),
            Backend::File(file) => Backend::File(file.clone()),
        }
    }
}

/// 被共享的页：补充页表与帧表（弱引用）都指向它
pub type PageRef = Arc<SpinLock<Page>>;

/// 一个用户虚拟页
#[derive(Debug)]
pub struct Page {
    va: Vaddr,
    writable: bool,
    backend: Backend,
    frame: Option<FrameRef>,
}

impl Page {
    /// 创建未初始化页
    ///
    /// `va` 会向下对齐到页边界。
    pub fn new_uninit(
        va: Vaddr,
        writable: bool,
        target: PageKind,
        init: Initializer,
    ) -> VmResult<Self> {
        Ok(Self {
            va: va.floor().start_addr(),
            writable,
            backend: Backend::Uninit(UninitPage::new(target, init)?),
            frame: None,
        })
    }

    /// 页起始地址
    pub fn va(&self) -> Vaddr {
        self.va
    }

    /// 页码
    pub fn vpn(&self) -> Vpn {
        self.va.floor()
    }

    /// 是否可写
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// 占用的帧
    pub fn frame(&self) -> Option<FrameRef> {
        self.frame
    }

    /// 是否驻留在内存中
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    /// 后备存储
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// 页的种类；未初始化页报告它将来的种类
    pub fn kind(&self) -> PageKind {
        match &self.backend {
            Backend::Uninit(uninit) => uninit.target(),
            other => other.kind(),
        }
    }

    /// 所属的文件映射
    pub fn mapping(&self) -> Option<&Arc<MmapFile>> {
        match &self.backend {
            Backend::Uninit(uninit) => match uninit.initializer() {
                Initializer::MmapChunk(file) => Some(file.mapping()),
                _ => None,
            },
            Backend::File(file) => Some(file.mapping()),
            Backend::Anon(_) => None,
        }
    }

    /// 页内容对应的文件片段
    pub fn file_chunk(&self) -> Option<&FileChunk> {
        match &self.backend {
            Backend::Uninit(uninit) => match uninit.initializer() {
                Initializer::Segment(chunk) => Some(chunk),
                Initializer::MmapChunk(file) => Some(file.chunk()),
                Initializer::Zero => None,
            },
            Backend::File(file) => Some(file.chunk()),
            Backend::Anon(_) => None,
        }
    }

    /// 匿名页被换出时所在的交换槽位
    pub fn swap_slot(&self) -> Option<SwapSlot> {
        match &self.backend {
            Backend::Anon(anon) => anon.swap_slot(),
            _ => None,
        }
    }

    pub(crate) fn set_frame(&mut self, frame: Option<FrameRef>) {
        self.frame = frame;
    }

    /// 复制出不驻留的同名页
    pub(crate) fn duplicate(&self) -> Page {
        Page {
            va: self.va,
            writable: self.writable,
            backend: self.backend.duplicate(),
            frame: None,
        }
    }

    /// 把页内容装入 `kva` 所指的帧
    ///
    /// 未初始化页在此转换为目标种类；失败时保持原状。
    pub(crate) fn swap_in(&mut self, kva: Kva, frames: &FrameAllocator) -> VmResult<()> {
        // SAFETY: 帧刚被分配给本页且仍处于钉住状态，调用者持有页锁
        let page = unsafe { kva.as_page_mut() };
        match &mut self.backend {
            Backend::Uninit(uninit) => {
                self.backend = uninit.initialize(page)?;
                Ok(())
            }
            Backend::Anon(anon) => anon.swap_in(page, frames),
            Backend::File(file) => file.swap_in(page),
        }
    }

    /// 把驻留页的内容写到后备存储，移除映射并与帧脱离
    ///
    /// 在帧表锁内调用。
    pub(crate) fn swap_out(&mut self, pt: &dyn PageTable, swap: &mut SwapTable) -> VmResult<()> {
        let Some(frame) = self.frame else {
            return Ok(());
        };
        let vpn = self.vpn();
        let dirty = pt.is_dirty(vpn);
        pt.set_dirty(vpn, false);
        pt.unmap(vpn);
        // SAFETY: 映射已移除，用户无法再修改帧内容
        let page = unsafe { frame.kva().as_page() };
        match &mut self.backend {
            Backend::Uninit(_) => {}
            Backend::Anon(anon) => anon.swap_out(page, swap)?,
            Backend::File(file) => file.swap_out(page, dirty)?,
        }
        self.frame = None;
        Ok(())
    }

    /// 驻留的文件页若被写过，写回文件并清除 dirty 位
    pub(crate) fn write_back(&self, pt: &dyn PageTable) -> VmResult<()> {
        let (Some(frame), Backend::File(file)) = (self.frame, &self.backend) else {
            return Ok(());
        };
        let vpn = self.vpn();
        if !pt.is_dirty(vpn) {
            return Ok(());
        }
        // SAFETY: 页驻留且调用者持有页锁
        let page = unsafe { frame.kva().as_page() };
        file.swap_out(page, true)?;
        pt.set_dirty(vpn, false);
        Ok(())
    }

    /// 释放后备存储持有的资源（交换槽位）
    ///
    /// 帧与映射由调用方处理；文件句柄随页一起被 drop。
    pub(crate) fn destroy(&mut self, frames: &FrameAllocator) {
        if let Backend::Anon(anon) = &mut self.backend {
            anon.destroy(frames);
        }
    }
}
