//! mmap 文件映射信息

use crate::address::{Vaddr, VpnRange};
use crate::file::MmFile;
use alloc::sync::Arc;

/// 文件映射信息
///
/// 一次 `mmap` 调用创建一个，映射中的每一页共享它。
pub struct MmapFile {
    /// 映射专用的文件句柄（mmap 时重新打开），最后一页销毁时关闭
    pub file: Arc<dyn MmFile>,
    /// 映射起始地址
    pub base: Vaddr,
    /// 文件偏移量（字节）
    pub offset: usize,
    /// 映射长度（字节）
    pub len: usize,
    /// 是否可写
    pub writable: bool,
}

impl MmapFile {
    /// 映射覆盖的页
    pub fn vpn_range(&self) -> VpnRange {
        VpnRange {
            start: self.base.floor(),
            end: (self.base + self.len).ceil(),
        }
    }
}

// 手动实现 Debug，因为 dyn MmFile 没有实现 Debug
impl core::fmt::Debug for MmapFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmapFile")
            .field("file", &"<dyn MmFile>")
            .field("base", &self.base)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("writable", &self.writable)
            .finish()
    }
}
