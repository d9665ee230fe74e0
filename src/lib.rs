//! # 位图采集与像素编解码核心 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                宿主 UI 框架（浏览器画布环境）              │
//! │                                                          │
//! │  rasterize(来源) ── rebuild_raster(宽, 高, RGBA 字节)     │
//! │       │        （RenderSurface 能力，由宿主注入实现）     │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Future<Result<RasterFrame, BitmapError>>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            本库 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ───── BitmapError (统一错误类型)                │
//! │  │                                                       │
//! │  ├─ bitmap ──── BitmapSource 采集编排 + 过期结果裁决       │
//! │  │                                                       │
//! │  ├─ writeable ─ WriteableBitmap 快照·合成·invalidate      │
//! │  │                                                       │
//! │  ├─ codec ───── RGBA 字节 ↔ 打包 i32 像素                 │
//! │  ├─ source ──── PixelBuffer / RasterFrame 中间模型        │
//! │  ├─ surface ─── RenderSurface trait + 来源描述            │
//! │  ├─ offline ─── 基于 image crate 的无浏览器表面           │
//! │  └─ config ──── 容量与解码限制、相对地址前缀              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `BitmapError`，所有公开操作的返回类型 |
//! | [`codec`] | 画布 RGBA 字节与打包 i32 像素的确定性双向转换 |
//! | [`source`] | `PixelBuffer`（长度不变式）与 `RasterFrame` 中间模型 |
//! | [`surface`] | 渲染表面能力接口与来源描述（地址 / Data URL / 可视元素） |
//! | [`offline`] | 离线渲染表面：PNG 解码/编码，测试与无浏览器宿主共用 |
//! | [`bitmap`] | `BitmapSource`：数据流/Data URL 接入、图片加载、信号通知 |
//! | [`writeable`] | `WriteableBitmap`：可视元素快照、偏移合成、invalidate 往返 |
//! | [`config`] | 数据流容量上限、像素上限、签名校验、组件前缀 |

pub mod bitmap;
pub mod codec;
pub mod config;
pub mod error;
pub mod offline;
pub mod source;
pub mod surface;
pub mod writeable;
