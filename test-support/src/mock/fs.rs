//! 文件相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `vm` crate（避免循环依赖）。
//! `vm` crate 在 `cfg(test)` 下为 [`MockFile`] 实现 `MmFile`。

use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

/// 内存中的文件内容，多个打开句柄共享同一个 inode
pub struct MockInode {
    data: Mutex<Vec<u8>>,
    /// 每次 write_at 的 (offset, len)
    writes: Mutex<Vec<(usize, usize)>>,
    open_handles: AtomicUsize,
    fail_reads: AtomicBool,
}

impl MockInode {
    pub fn new(data: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data.to_vec()),
            writes: Mutex::new(Vec::new()),
            open_handles: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
        })
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn writes(&self) -> Vec<(usize, usize)> {
        self.writes.lock().clone()
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// 之后的读操作都返回错误
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

/// 一个打开的文件句柄，drop 时关闭
pub struct MockFile {
    inode: Arc<MockInode>,
}

impl MockFile {
    pub fn open(inode: &Arc<MockInode>) -> Self {
        inode.open_handles.fetch_add(1, Ordering::SeqCst);
        Self {
            inode: Arc::clone(inode),
        }
    }

    /// 在同一个 inode 上打开独立的新句柄
    pub fn reopen(&self) -> Self {
        Self::open(&self.inode)
    }

    pub fn inode(&self) -> &Arc<MockInode> {
        &self.inode
    }

    pub fn len(&self) -> usize {
        self.inode.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize> {
        if self.inode.fail_reads.load(Ordering::SeqCst) {
            return Err(-5); // EIO
        }
        let data = self.inode.data.lock();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    /// 写入不会扩展文件，超出文件末尾的部分被截断
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize> {
        let mut data = self.inode.data.lock();
        self.inode.writes.lock().push((offset, buf.len()));
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        data[offset..offset + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        self.inode.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
