//! 文件页
//!
//! 内容来自文件的一段：先读 `read_bytes` 字节，剩余 `zero_bytes` 字节补零。
//! 被淘汰或解除映射时，若页被写过则把 `read_bytes` 写回文件原处。

use crate::config::PAGE_SIZE;
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::memory_space::MmapFile;
use alloc::sync::Arc;

/// 文件中一页大小的片段
#[derive(Clone)]
pub struct FileChunk {
    /// 文件句柄
    pub file: Arc<dyn MmFile>,
    /// 片段在文件中的偏移（字节）
    pub offset: usize,
    /// 从文件读取的字节数
    pub read_bytes: usize,
    /// 读取之后补零的字节数
    pub zero_bytes: usize,
}

impl FileChunk {
    /// 创建片段，`zero_bytes` 取页内剩余部分
    pub fn new(file: Arc<dyn MmFile>, offset: usize, read_bytes: usize) -> Self {
        debug_assert!(read_bytes <= PAGE_SIZE);
        Self {
            file,
            offset,
            read_bytes,
            zero_bytes: PAGE_SIZE - read_bytes,
        }
    }

    /// 把片段读入整页
    pub(crate) fn load(&self, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        let (data, rest) = page.split_at_mut(self.read_bytes);
        if !data.is_empty() {
            match self.file.read_at(self.offset, data) {
                Ok(n) if n == self.read_bytes => {}
                Ok(n) => {
                    log::warn!(
                        "vm: short read at offset {:#x}: {} of {} bytes",
                        self.offset,
                        n,
                        self.read_bytes
                    );
                    return Err(VmError::ShortRead);
                }
                Err(errno) => {
                    log::warn!("vm: read at offset {:#x} failed: {}", self.offset, errno);
                    return Err(VmError::Io);
                }
            }
        }
        rest.fill(0);
        Ok(())
    }

    /// 把页的前 `read_bytes` 字节写回文件
    pub(crate) fn write_back(&self, page: &[u8; PAGE_SIZE]) -> VmResult<()> {
        if self.read_bytes == 0 {
            return Ok(());
        }
        match self.file.write_at(self.offset, &page[..self.read_bytes]) {
            Ok(n) if n == self.read_bytes => Ok(()),
            Ok(n) => {
                log::warn!(
                    "vm: partial write back at offset {:#x}: {} of {} bytes",
                    self.offset,
                    n,
                    self.read_bytes
                );
                Err(VmError::Io)
            }
            Err(errno) => {
                log::error!("vm: write back at offset {:#x} failed: {}", self.offset, errno);
                Err(VmError::Io)
            }
        }
    }
}

// 手动实现 Debug，因为 dyn MmFile 没有实现 Debug
impl core::fmt::Debug for FileChunk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileChunk")
            .field("file", &"<dyn MmFile>")
            .field("offset", &self.offset)
            .field("read_bytes", &self.read_bytes)
            .field("zero_bytes", &self.zero_bytes)
            .finish()
    }
}

/// 属于某个文件映射的页
#[derive(Debug, Clone)]
pub struct FilePage {
    mapping: Arc<MmapFile>,
    chunk: FileChunk,
}

impl FilePage {
    /// 映射中从 `offset` 开始、读取 `read_bytes` 字节的一页
    pub(crate) fn new(mapping: Arc<MmapFile>, offset: usize, read_bytes: usize) -> Self {
        let chunk = FileChunk::new(Arc::clone(&mapping.file), offset, read_bytes);
        Self { mapping, chunk }
    }

    /// 所属的文件映射
    pub fn mapping(&self) -> &Arc<MmapFile> {
        &self.mapping
    }

    /// 页对应的文件片段
    pub fn chunk(&self) -> &FileChunk {
        &self.chunk
    }

    pub(crate) fn swap_in(&self, page: &mut [u8; PAGE_SIZE]) -> VmResult<()> {
        self.chunk.load(page)
    }

    pub(crate) fn swap_out(&self, page: &[u8; PAGE_SIZE], dirty: bool) -> VmResult<()> {
        if dirty {
            self.chunk.write_back(page)
        } else {
            Ok(())
        }
    }
}
