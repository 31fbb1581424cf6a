//! Mock 实现模块
//!
//! 提供各种架构和子系统的 Mock 实现，用于测试

pub mod arch;
pub mod fs;
pub mod mm;
pub mod mmu;
pub mod swap;

/// Mock 环境统一使用的页大小
pub const MOCK_PAGE_SIZE: usize = 4096;
