//! 虚拟内存配置 trait 定义和注册

use core::sync::atomic::{AtomicUsize, Ordering};

/// 页大小。页帧、交换槽位和文件分块都以此为单位。
pub const PAGE_SIZE: usize = 4096;

/// 虚拟内存配置常量
///
/// 此 trait 提供用户地址空间布局相关的配置。
/// 内核需要实现此 trait 并通过 [`register_config`] 注册。
pub trait VmConfig: Send + Sync {
    /// 用户栈顶地址（不包含），必须页对齐
    fn user_stack_top(&self) -> usize;

    /// 用户栈最大字节数
    fn max_stack_size(&self) -> usize;

    /// 栈增长判定时允许访问低于栈指针的字节数
    ///
    /// 用于覆盖 `push` 之类先访问、后移动栈指针的指令。
    fn stack_slack(&self) -> usize;
}

static CONFIG_DATA: AtomicUsize = AtomicUsize::new(0);
static CONFIG_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册配置实现
///
/// # Safety
/// 必须在单线程环境下调用，且应在创建任何地址空间之前调用
pub unsafe fn register_config(config: &'static dyn VmConfig) {
    let ptr = config as *const dyn VmConfig;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn VmConfig, (usize, usize)>(ptr) };
    CONFIG_DATA.store(data, Ordering::Release);
    CONFIG_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的配置实现
///
/// # Panics
/// 如果尚未调用 [`register_config`] 注册实现，则 panic
#[inline]
pub fn vm_config() -> &'static dyn VmConfig {
    let data = CONFIG_DATA.load(Ordering::Acquire);
    let vtable = CONFIG_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("vm: VmConfig not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn VmConfig>((data, vtable)) }
}
