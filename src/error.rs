//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `BitmapError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 同步前置条件违规（容量、输入格式）在调用点立即返回；
//! 渲染表面往返中的失败通过同一个 `Result` 通道返回，不存在“回调永不触发”的静默路径。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 保留 `From<BitmapError> for String`，兼容仍使用字符串错误的宿主调用点。

/// 位图处理统一错误类型。
///
/// 所有公开操作均返回 `Result<T, BitmapError>`，确保宿主收到一致的错误格式。
#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    /// 源数据流超过 32 位有符号长度上限（同步前置条件，现有状态保持不变）
    #[error("容量错误：{0}")]
    Capacity(String),

    /// 输入格式错误（编解码字节未对齐、Data URL 缺少标记、Base64 非法等）
    #[error("输入格式错误：{0}")]
    MalformedInput(String),

    /// 解码错误（像素数据长度异常、离线光栅化解码失败等）
    #[error("解码错误：{0}")]
    Decode(String),

    /// 外部渲染表面返回的失败
    #[error("渲染表面错误：{0}")]
    Surface(String),

    /// 采集结果过期（完成时已有更新的采集请求，结果被丢弃）
    #[error("过期结果：{0}")]
    Stale(String),

    /// 资源限制（像素上限、锁中毒等）
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 读取源数据流时的 I/O 错误
    #[error("数据流读取错误：{0}")]
    Io(#[from] std::io::Error),
}

impl From<BitmapError> for String {
    /// 兼容部分仍使用字符串错误的调用点。
    fn from(error: BitmapError) -> Self {
        error.to_string()
    }
}
