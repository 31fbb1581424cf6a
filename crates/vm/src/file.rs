//! 文件对象抽象
//!
//! 定义了 `vm` crate 所需的最小文件接口，用于按需加载程序段和文件映射。
//! 具体实现由文件系统提供。

use alloc::sync::Arc;

/// 可被映射的文件
///
/// 错误值是负的 errno，与系统调用约定一致。
pub trait MmFile: Send + Sync {
    /// 打开同一文件的一个独立句柄
    ///
    /// 文件映射持有自己的句柄，用户关闭原描述符后映射仍然有效。
    fn reopen(&self) -> Result<Arc<dyn MmFile>, isize>;

    /// 文件长度（字节）
    fn len(&self) -> usize;

    /// 文件是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从 `offset` 开始读取，返回实际读取的字节数
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize>;

    /// 从 `offset` 开始写入，返回实际写入的字节数
    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize>;
}
