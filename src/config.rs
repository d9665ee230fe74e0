//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `BitmapConfig`，保证运行时行为可观测、可调整、可测试。
//! 配置只在请求开始时做一次快照，单次采集链路内参数保持一致。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置：数据流上限沿用 32 位有符号整数上限。
//! - `component_prefix` 承载宿主框架的相对地址解析约定（`/{组件};component/{路径}`）。
//! - 像素上限用于在解码前快速拒绝恶意尺寸。

/// 源数据流长度的硬上限（32 位有符号整数最大值，2,147,483,647 字节）。
pub const MAX_STREAM_BYTES: u64 = i32::MAX as u64;

/// 位图处理配置。
///
/// 字段覆盖了数据流接入、解码限制与相对地址解析三类策略。
#[derive(Debug, Clone)]
pub struct BitmapConfig {
    /// 接入源数据流时允许的最大体积（字节），不可超过 [`MAX_STREAM_BYTES`]。
    pub max_stream_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 是否对接入的数据流做文件签名（magic bytes）校验。
    pub validate_signature: bool,
    /// 相对地址解析使用的组件前缀。
    ///
    /// 为 `Some` 时，相对地址会被解析为 `/{前缀};component/{地址}`。
    pub component_prefix: Option<String>,
}

impl Default for BitmapConfig {
    fn default() -> Self {
        Self {
            max_stream_bytes: MAX_STREAM_BYTES,
            max_decoded_pixels: 40_000_000,
            validate_signature: true,
            component_prefix: None,
        }
    }
}

impl BitmapConfig {
    /// 返回实际生效的数据流上限。
    ///
    /// 配置值即使被调大，也不会越过 32 位有符号长度的硬上限。
    pub(crate) fn effective_stream_limit(&self) -> u64 {
        self.max_stream_bytes.min(MAX_STREAM_BYTES)
    }
}
