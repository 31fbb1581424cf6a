//! 内存空间模块
//!
//! 本模块定义了用户地址空间（[`AddressSpace`]）及其补充页表
//! （[`SupplementalPageTable`]），以及文件映射的建立与拆除。

mod mmap;
mod mmap_file;
mod space;
mod spt;

pub use mmap_file::MmapFile;
pub use space::*;
pub use spt::SupplementalPageTable;
