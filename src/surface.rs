//! # 渲染表面接口模块
//!
//! ## 设计思路
//!
//! 原始设计通过自由形式的“执行脚本”通道与宿主画布环境交互。
//! 这里收敛为一个窄接口：`rasterize` 与 `rebuild_raster` 两个带类型签名的能力，
//! 由宿主注入实现。注入式设计让采集链路可以在测试中用假实现完全驱动。
//!
//! ## 实现思路
//!
//! - 每次跨表面调用返回一个恰好完成一次的 Future，成功与失败走同一通道。
//! - RGBA 字节序（每像素 `R,G,B,A`）由实现方保证。
//! - 可视元素用不透明句柄表示，由宿主负责映射到真实的界面节点。

use std::future::Future;

use bytes::Bytes;

use crate::error::BitmapError;
use crate::source::RasterFrame;

/// 宿主界面树中一个可视元素的不透明句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// 光栅化请求的来源描述。
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// 网络地址或框架内组件地址。
    Url(String),
    /// 已编码的 Data URL。
    DataUrl(String),
    /// 屏幕上某个可视元素的快照请求。
    Visual(VisualHandle),
}

/// 外部渲染表面能力。
///
/// 由宿主框架实现：浏览器宿主映射到画布 API，
/// 无浏览器环境可使用 [`crate::offline::OfflineSurface`]。
pub trait RenderSurface: Send + Sync {
    /// 将来源描述光栅化为一帧 `RasterFrame`。
    ///
    /// 实现必须保持每像素 `R,G,B,A` 的字节顺序。
    fn rasterize(
        &self,
        descriptor: SourceDescriptor,
    ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send;

    /// 用原始 RGBA 字节重建光栅并重新导出宽高与 Data URL。
    ///
    /// 支撑 `invalidate` 的完整往返：本地像素编辑后刷新编码表示。
    fn rebuild_raster(
        &self,
        width: u32,
        height: u32,
        rgba: Bytes,
    ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send;
}
