//! 虚拟内存模块
//!
//! 为用户进程提供按需分页：页在首次访问时才分配帧并装入内容，
//! 物理内存不足时把页淘汰到交换区或写回文件。
//!
//! # 模块组成
//!
//! - [`address`]：地址与页码类型
//! - [`page`]：页描述符与三种后备存储（未初始化、匿名、文件）
//! - [`frame`]：帧分配器、物理页池与淘汰策略
//! - [`swap`]：交换槽位管理
//! - [`memory_space`]：补充页表、地址空间、文件映射
//! - [`fault`]：缺页处理与栈增长
//!
//! # 外部依赖
//!
//! 硬件页表（[`PageTable`]）、文件（[`MmFile`]）、交换设备（[`SwapDevice`]）
//! 与物理页池（[`PhysPagePool`]）均以 trait 形式由内核提供；
//! 配置通过 [`register_config`] 注册。

#![no_std]

extern crate alloc;

pub mod address;
mod bitmap;
mod config;
mod error;
pub mod fault;
mod file;
pub mod frame;
pub mod memory_space;
mod mmu;
pub mod page;
pub mod swap;

pub use address::{Kva, Vaddr, Vpn, VpnRange};
pub use config::{PAGE_SIZE, VmConfig, register_config, vm_config};
pub use error::{ErrorClass, VmError, VmResult, errno};
pub use fault::{FaultResolution, PageFault};
pub use file::MmFile;
pub use frame::{
    BitmapPagePool, ClockPolicy, EvictionPolicy, FrameAllocator, FrameStats, PhysPagePool,
};
pub use memory_space::{AddressSpace, MmapFile, SupplementalPageTable};
pub use mmu::{PageTable, PteFlags};
pub use page::{Initializer, Page, PageKind, PageRef};
pub use swap::{SwapDevice, SwapSlot};

#[cfg(test)]
mod tests;
