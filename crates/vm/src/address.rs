//! 地址模块
//!
//! 提供虚拟内存管理用到的三种地址抽象：
//!
//! - [`Vaddr`] - 用户虚拟地址
//! - [`Vpn`] - 虚拟页码（Virtual Page Number）
//! - [`Kva`] - 页帧在内核地址空间中的地址，内核通过它直接读写页内容
//!
//! 以及连续页码区间 [`VpnRange`]。

use crate::config::PAGE_SIZE;
use core::ops::{Add, Sub};

/// [Vaddr] (Virtual Address)
/// ---------------------
/// 用户虚拟地址。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Vaddr(pub usize);

/// [Vpn] (Virtual Page Number)
/// ---------------------
/// 虚拟页码，等于页起始地址除以 [`PAGE_SIZE`]。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Vpn(pub usize);

/// [Kva] (Kernel Virtual Address)
/// ---------------------
/// 页帧的内核虚拟地址，总是页对齐。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Kva(pub usize);

impl Vaddr {
    /// 是否为空指针
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// 页内偏移
    pub const fn page_offset(self) -> usize {
        self.0 % PAGE_SIZE
    }

    /// 是否页对齐
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    /// 所在页的页码（向下取整）
    pub const fn floor(self) -> Vpn {
        Vpn(self.0 / PAGE_SIZE)
    }

    /// 向上对齐到页边界后的页码
    pub const fn ceil(self) -> Vpn {
        Vpn(self.0.div_ceil(PAGE_SIZE))
    }

    /// 带溢出检查的加法
    pub fn checked_add(self, len: usize) -> Option<Vaddr> {
        self.0.checked_add(len).map(Vaddr)
    }
}

impl Add<usize> for Vaddr {
    type Output = Vaddr;

    fn add(self, rhs: usize) -> Vaddr {
        Vaddr(self.0 + rhs)
    }
}

impl Sub<usize> for Vaddr {
    type Output = Vaddr;

    fn sub(self, rhs: usize) -> Vaddr {
        Vaddr(self.0 - rhs)
    }
}

impl Vpn {
    /// 页的起始地址
    pub const fn start_addr(self) -> Vaddr {
        Vaddr(self.0 * PAGE_SIZE)
    }
}

impl Add<usize> for Vpn {
    type Output = Vpn;

    fn add(self, rhs: usize) -> Vpn {
        Vpn(self.0 + rhs)
    }
}

impl Kva {
    /// 以只读方式访问整页内容
    ///
    /// # Safety
    /// 调用者必须保证 `self` 指向一个有效页帧，且期间没有其他写者
    pub unsafe fn as_page<'a>(self) -> &'a [u8; PAGE_SIZE] {
        unsafe { &*(self.0 as *const [u8; PAGE_SIZE]) }
    }

    /// 以可写方式访问整页内容
    ///
    /// # Safety
    /// 调用者必须保证 `self` 指向一个有效页帧，且期间独占访问
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_page_mut<'a>(self) -> &'a mut [u8; PAGE_SIZE] {
        unsafe { &mut *(self.0 as *mut [u8; PAGE_SIZE]) }
    }
}

/// 虚拟页码区间 `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VpnRange {
    /// 起始页码 (包含)
    pub start: Vpn,
    /// 结束页码 (不包含)
    pub end: Vpn,
}

impl VpnRange {
    /// 从起始页码和页数创建区间
    pub fn from_start_len(start: Vpn, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// 区间包含的页数
    pub fn len(&self) -> usize {
        self.end.0.saturating_sub(self.start.0)
    }

    /// 区间是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否包含给定页码
    pub fn contains(&self, vpn: Vpn) -> bool {
        self.start <= vpn && vpn < self.end
    }

    /// 依次遍历区间内的页码
    pub fn iter(&self) -> impl Iterator<Item = Vpn> + use<> {
        (self.start.0..self.end.0).map(Vpn)
    }
}
