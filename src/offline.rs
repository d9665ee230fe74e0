//! # 离线渲染表面模块
//!
//! ## 设计思路
//!
//! 浏览器宿主通过画布 API 实现 [`RenderSurface`]；没有浏览器环境时
//! （单元测试、服务器端预渲染、命令行工具），采集链路同样需要可运行的表面。
//! `OfflineSurface` 用 `image` crate 完成 PNG 解码/编码，行为与画布实现对齐：
//! 输入 Data URL，输出宽高、重新编码的 Data URL 与 RGBA 字节。
//!
//! ## 实现思路
//!
//! - Data URL 解析沿用 `data:image/...;base64,` 标记定位，Base64 非法立即失败。
//! - 重新导出的 Data URL 统一编码为 PNG（与画布 `toDataURL()` 的默认格式一致）。
//! - 网络地址与可视元素快照属于宿主能力，离线表面显式拒绝。

use std::future::Future;
use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgba};

use crate::error::BitmapError;
use crate::source::RasterFrame;
use crate::surface::{RenderSurface, SourceDescriptor};

/// 基于 `image` crate 的离线渲染表面。
#[derive(Debug, Default)]
pub struct OfflineSurface;

impl OfflineSurface {
    /// 创建离线表面。
    pub fn new() -> Self {
        Self
    }

    /// 解析 Data URL 中的 Base64 载荷。
    fn parse_data_url(data_url: &str) -> Result<Vec<u8>, BitmapError> {
        let normalized = data_url.trim();

        if !normalized.starts_with("data:image/") {
            return Err(BitmapError::MalformedInput(
                "Data URL 必须以 data:image/ 开头".to_string(),
            ));
        }

        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| BitmapError::MalformedInput("Data URL 缺少 base64 标记".to_string()))?;
        let base64_data = &normalized[base64_start + 8..];

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| BitmapError::MalformedInput(format!("Base64 解码失败：{}", e)))
    }

    /// 将 RGBA 缓冲编码为 PNG Data URL。
    fn encode_png_data_url(width: u32, height: u32, rgba: &[u8]) -> Result<String, BitmapError> {
        let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba.to_vec())
            .ok_or_else(|| BitmapError::Decode("RGBA 缓冲长度与尺寸不一致".to_string()))?;

        let mut cursor = Cursor::new(Vec::new());
        buffer
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| BitmapError::Decode(format!("PNG 编码失败：{}", e)))?;

        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(cursor.into_inner())
        ))
    }

    /// 解码任意受支持格式的图片字节，产出统一的光栅帧。
    fn decode_to_frame(bytes: &[u8]) -> Result<RasterFrame, BitmapError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| BitmapError::Decode(format!("图片解码失败：{}", e)))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let raw = rgba.into_raw();
        let data_url = Self::encode_png_data_url(width, height, &raw)?;

        log::debug!("🖼️ 离线光栅化完成 - {}x{} ({} bytes)", width, height, raw.len());

        Ok(RasterFrame {
            width,
            height,
            data_url,
            rgba: Bytes::from(raw),
        })
    }
}

impl RenderSurface for OfflineSurface {
    fn rasterize(
        &self,
        descriptor: SourceDescriptor,
    ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
        async move {
            match descriptor {
                SourceDescriptor::DataUrl(data_url) => {
                    let bytes = Self::parse_data_url(&data_url)?;
                    Self::decode_to_frame(&bytes)
                }
                SourceDescriptor::Url(url) => Err(BitmapError::Surface(format!(
                    "离线渲染表面不支持网络地址光栅化：{}",
                    url
                ))),
                SourceDescriptor::Visual(handle) => Err(BitmapError::Surface(format!(
                    "离线渲染表面不支持可视元素快照：{:?}",
                    handle
                ))),
            }
        }
    }

    fn rebuild_raster(
        &self,
        width: u32,
        height: u32,
        rgba: Bytes,
    ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
        async move {
            let expected = (width as usize)
                .checked_mul(height as usize)
                .and_then(|pixels| pixels.checked_mul(4))
                .ok_or_else(|| BitmapError::ResourceLimit("光栅尺寸导致内存溢出风险".to_string()))?;

            if rgba.len() != expected {
                return Err(BitmapError::Decode(format!(
                    "重建光栅的字节长度异常：{}（期望 {}）",
                    rgba.len(),
                    expected
                )));
            }

            let data_url = Self::encode_png_data_url(width, height, &rgba)?;

            Ok(RasterFrame {
                width,
                height,
                data_url,
                rgba,
            })
        }
    }
}
