//! 未初始化页
//!
//! 登记时不分配帧也不做 I/O，只记录首次缺页时如何填充页内容，
//! 以及填充后页变成哪一种。

use super::{AnonPage, Backend, FileChunk, FilePage, PageKind};
use crate::config::PAGE_SIZE;
use crate::error::{VmError, VmResult};

/// 延迟初始化器
#[derive(Debug, Clone)]
pub enum Initializer {
    /// 全零页
    Zero,
    /// 程序段：从可执行文件读取，之后作为匿名页
    Segment(FileChunk),
    /// 文件映射的一页，之后作为文件页
    MmapChunk(FilePage),
}

/// 未初始化页的后备状态
#[derive(Debug, Clone)]
pub struct UninitPage {
    target: PageKind,
    init: Initializer,
}

impl UninitPage {
    /// 检查目标种类与初始化器是否匹配
    ///
    /// 文件页必须且只能由 [`Initializer::MmapChunk`] 初始化。
    pub(crate) fn new(target: PageKind, init: Initializer) -> VmResult<Self> {
        let valid = match (&target, &init) {
            (PageKind::Uninit, _) => false,
            (PageKind::File, Initializer::MmapChunk(_)) => true,
            (PageKind::File, _) | (_, Initializer::MmapChunk(_)) => false,
            (PageKind::Anon, _) => true,
        };
        if !valid {
            return Err(VmError::InvalidArgument);
        }
        Ok(Self { target, init })
    }

    /// 初始化后的页种类
    pub fn target(&self) -> PageKind {
        self.target
    }

    /// 初始化器
    pub fn initializer(&self) -> &Initializer {
        &self.init
    }

    /// 填充页内容，返回页之后使用的后备状态
    pub(crate) fn initialize(&self, page: &mut [u8; PAGE_SIZE]) -> VmResult<Backend> {
        match &self.init {
            Initializer::Zero => {
                page.fill(0);
                Ok(Backend::Anon(AnonPage::new()))
            }
            Initializer::Segment(chunk) => {
                chunk.load(page)?;
                Ok(Backend::Anon(AnonPage::new()))
            }
            Initializer::MmapChunk(file_page) => {
                file_page.swap_in(page)?;
                Ok(Backend::File(file_page.clone()))
            }
        }
    }
}
