//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“采集链路中间结果”解耦：
//! - `RasterFrame` 表示渲染表面回传的一帧光栅（宽高 + Data URL + RGBA 字节）
//! - `PixelBuffer` 表示解码后的打包像素缓冲，持有 `pixels.len() == width * height` 不变式
//!
//! `PixelBuffer` 由所属位图对象独占持有，每次解码完成时整体替换；
//! 唯一的增量修改路径是合成操作（见 `writeable` 模块）。

use bytes::Bytes;

use crate::codec;
use crate::error::BitmapError;

/// 渲染表面回传的一帧光栅。
///
/// `rgba` 为画布字节序（每像素 `R,G,B,A`），长度必须等于 `width * height * 4`。
#[derive(Debug, Clone)]
pub struct RasterFrame {
    /// 光栅宽度（像素）。
    pub width: u32,
    /// 光栅高度（像素）。
    pub height: u32,
    /// 重新导出的 Data URL（自描述编码图像）。
    pub data_url: String,
    /// 原始 RGBA 字节。
    pub rgba: Bytes,
}

/// 打包像素缓冲。
///
/// 每个元素为一个 32 位有符号整数，按 `[B,G,R,A]` 大端打包一个像素的四个通道。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// 图像宽度（像素）。
    pub width: u32,
    /// 图像高度（像素）。
    pub height: u32,
    /// 打包像素数组（`width * height` 个元素）。
    pub pixels: Vec<i32>,
}

impl PixelBuffer {
    /// 创建空缓冲（零像素）。
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// 创建指定尺寸的全零缓冲。
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// 从渲染表面回传的光栅帧解码出像素缓冲。
    ///
    /// 在解码前校验字节长度与尺寸一致，长度异常立即失败。
    pub(crate) fn from_frame(frame: &RasterFrame) -> Result<Self, BitmapError> {
        let expected = (frame.width as usize)
            .checked_mul(frame.height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| BitmapError::ResourceLimit("光栅尺寸导致内存溢出风险".to_string()))?;

        if frame.rgba.len() != expected {
            return Err(BitmapError::Decode(format!(
                "光栅像素数据长度异常：{} 字节（期望 {} x {} x 4 = {}）",
                frame.rgba.len(),
                frame.width,
                frame.height,
                expected
            )));
        }

        Ok(Self {
            width: frame.width,
            height: frame.height,
            pixels: codec::decode_rgba(&frame.rgba)?,
        })
    }

    /// 将像素缓冲编码回画布字节序的 RGBA 字节。
    pub fn to_rgba(&self) -> Vec<u8> {
        codec::encode_rgba(&self.pixels)
    }

    /// 像素数量（`width * height`）。
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
