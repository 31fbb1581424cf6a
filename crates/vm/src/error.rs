//! 虚拟内存错误类型
//!
//! 所有可能失败的操作都返回 [`VmResult`]。错误按 [`ErrorClass`] 分为几类，
//! 调用方据此决定是终止进程、向用户返回错误码，还是视为内核故障。

/// 系统调用错误码
pub mod errno {
    /// I/O 错误
    pub const EIO: isize = 5;
    /// 内存不足
    pub const ENOMEM: isize = 12;
    /// 地址错误
    pub const EFAULT: isize = 14;
    /// 已存在
    pub const EEXIST: isize = 17;
    /// 参数非法
    pub const EINVAL: isize = 22;
}

/// 虚拟内存错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    // 缺页相关
    /// 空地址或内核地址 (-EFAULT)
    InvalidAddress,
    /// 写只读页 (-EFAULT)
    WriteProtect,
    /// 地址既不在补充页表中，也不满足栈增长条件 (-EFAULT)
    Unmapped,
    /// 栈增长超过上限 (-EFAULT)
    StackOverflow,

    // 映射相关
    /// 目标页已被登记 (-EEXIST)
    AlreadyMapped,
    /// 地址上没有可解除的映射 (-EINVAL)
    NotMapped,
    /// 参数非法，例如未对齐或长度为零 (-EINVAL)
    InvalidArgument,
    /// 硬件页表无法安装映射，通常是页表页耗尽 (-ENOMEM)
    MapFailed,

    // 后备存储相关
    /// 文件实际读到的字节数少于要求 (-EIO)
    ShortRead,
    /// 文件或交换设备 I/O 失败 (-EIO)
    Io,
    /// 交换设备没有空闲槽位 (-ENOMEM)
    SwapFull,
}

/// 错误的处理类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 进程访问了不该访问的地址，应终止进程
    FatalFault,
    /// 内存或交换空间耗尽
    ResourceExhaustion,
    /// 页表、文件或交换设备操作失败，缺页处理因此失败
    BackendFailure,
    /// 与已有映射冲突
    DuplicateMapping,
    /// 调用方传入了非法请求，返回错误码即可
    InvalidRequest,
}

impl VmError {
    /// 错误所属的类别
    pub fn class(&self) -> ErrorClass {
        match self {
            VmError::InvalidAddress
            | VmError::WriteProtect
            | VmError::Unmapped
            | VmError::StackOverflow => ErrorClass::FatalFault,
            VmError::SwapFull => ErrorClass::ResourceExhaustion,
            VmError::MapFailed | VmError::ShortRead | VmError::Io => ErrorClass::BackendFailure,
            VmError::AlreadyMapped => ErrorClass::DuplicateMapping,
            VmError::NotMapped | VmError::InvalidArgument => ErrorClass::InvalidRequest,
        }
    }

    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            VmError::ShortRead | VmError::Io => -errno::EIO,
            VmError::MapFailed | VmError::SwapFull => -errno::ENOMEM,
            VmError::InvalidAddress
            | VmError::WriteProtect
            | VmError::Unmapped
            | VmError::StackOverflow => -errno::EFAULT,
            VmError::AlreadyMapped => -errno::EEXIST,
            VmError::NotMapped | VmError::InvalidArgument => -errno::EINVAL,
        }
    }
}

/// 虚拟内存操作的结果类型
pub type VmResult<T> = Result<T, VmError>;
