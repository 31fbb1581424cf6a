//! 测试支持 crate
//!
//! 提供宿主机上运行单元测试所需的 Mock 实现

#![no_std]

extern crate alloc;

pub mod mock;
