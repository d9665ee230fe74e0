//! # 可写位图模块
//!
//! ## 设计思路
//!
//! `WriteableBitmap` 在位图来源之上增加三类能力：
//! 1. 可视元素快照（把屏幕上的一棵界面子树光栅化为像素缓冲）
//! 2. 带偏移的局部合成（越界静默裁剪，子系统内唯一的增量修改）
//! 3. 本地像素编辑 + `invalidate` 完整往返刷新 Data URL
//!
//! ## 实现思路
//!
//! - 组合一个 `BitmapSource`，采集与提交逻辑完全复用（包括过期结果裁决）。
//! - `invalidate` 为幂等操作：两次调用之间没有像素编辑时，
//!   重建结果解码等价（Data URL 字符串允许逐字节不同）。

use std::sync::Arc;

use bytes::Bytes;

use crate::bitmap::{BitmapSource, SourceChangedListener};
use crate::config::BitmapConfig;
use crate::error::BitmapError;
use crate::source::PixelBuffer;
use crate::surface::{RenderSurface, SourceDescriptor, VisualHandle};

/// 可写位图。
///
/// 像素数组可被宿主直接编辑，编辑后通过 [`WriteableBitmap::invalidate`]
/// 刷新编码表示。
pub struct WriteableBitmap<S: RenderSurface> {
    inner: BitmapSource<S>,
}

impl<S: RenderSurface> WriteableBitmap<S> {
    /// 创建指定尺寸的可写位图，像素全零。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use bitmap_imaging::offline::OfflineSurface;
    /// use bitmap_imaging::writeable::WriteableBitmap;
    ///
    /// let bitmap = WriteableBitmap::new(Arc::new(OfflineSurface::new()), 16, 16)?;
    /// # Ok::<(), bitmap_imaging::error::BitmapError>(())
    /// ```
    pub fn new(surface: Arc<S>, width: u32, height: u32) -> Result<Self, BitmapError> {
        Ok(Self {
            inner: BitmapSource::with_blank(surface, BitmapConfig::default(), width, height)?,
        })
    }

    /// 使用自定义配置创建可写位图。
    pub fn with_config(
        surface: Arc<S>,
        config: BitmapConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, BitmapError> {
        Ok(Self {
            inner: BitmapSource::with_blank(surface, config, width, height)?,
        })
    }

    /// 从已有位图来源深拷贝可见状态（宽高、像素、Data URL）。
    pub fn from_source(source: &BitmapSource<S>) -> Result<Self, BitmapError> {
        let bitmap = Self {
            inner: BitmapSource::with_config(
                Arc::clone(source.surface()),
                source.config_snapshot()?,
            )?,
        };
        bitmap.inner.copy_visible_state_from(source)?;
        Ok(bitmap)
    }

    /// 通过可视元素快照构造可写位图。
    pub async fn from_visual(surface: Arc<S>, visual: VisualHandle) -> Result<Self, BitmapError> {
        let bitmap = Self::new(surface, 0, 0)?;
        bitmap.render_visual(visual).await?;
        Ok(bitmap)
    }

    /// 快照一个可视元素并整体替换当前状态。
    ///
    /// 与图片加载共用解码、替换与通知链路。
    pub async fn render_visual(&self, visual: VisualHandle) -> Result<(), BitmapError> {
        let config = self.inner.config_snapshot()?;

        log::info!("📸 开始可视元素快照 - {:?}", visual);

        let ticket = self.inner.begin_acquisition();
        let frame = self
            .inner
            .surface()
            .rasterize(SourceDescriptor::Visual(visual))
            .await?;

        self.inner.apply_frame(ticket, frame, &config)
    }

    /// 将一个可视元素渲染进临时缓冲，再按偏移合成到当前像素数组。
    ///
    /// 目标越界的像素静默丢弃，不报错、不越界写。
    pub async fn composite(
        &self,
        visual: VisualHandle,
        offset_x: u32,
        offset_y: u32,
    ) -> Result<(), BitmapError> {
        let frame = self
            .inner
            .surface()
            .rasterize(SourceDescriptor::Visual(visual))
            .await?;

        // 临时缓冲只做一次性合成，不经过提交链路
        let scratch = PixelBuffer::from_frame(&frame)?;

        self.inner.composite_pixels(&scratch, offset_x, offset_y)
    }

    /// 将当前像素编码回字节，请求渲染表面重建光栅并回灌解码结果。
    ///
    /// 用于本地像素编辑后刷新 Data URL。两次调用之间没有编辑时结果解码等价。
    pub async fn invalidate(&self) -> Result<(), BitmapError> {
        let config = self.inner.config_snapshot()?;
        let buffer = self.inner.pixel_buffer()?;

        log::info!("🔄 开始重建光栅 - {}x{}", buffer.width, buffer.height);

        let ticket = self.inner.begin_acquisition();
        let frame = self
            .inner
            .surface()
            .rebuild_raster(buffer.width, buffer.height, Bytes::from(buffer.to_rgba()))
            .await?;

        self.inner.apply_frame(ticket, frame, &config)
    }

    /// 在写锁内编辑像素数组。
    ///
    /// 编辑不会触发“来源已变更”信号；刷新编码表示需调用 [`WriteableBitmap::invalidate`]。
    pub fn edit_pixels(&self, edit: impl FnOnce(&mut [i32])) -> Result<(), BitmapError> {
        self.inner.edit_pixels_locked(edit)
    }

    /// 打包像素缓冲快照。
    pub fn pixel_buffer(&self) -> Result<PixelBuffer, BitmapError> {
        self.inner.pixel_buffer()
    }

    /// 图像宽度（像素）。
    pub fn pixel_width(&self) -> Result<u32, BitmapError> {
        self.inner.pixel_width()
    }

    /// 图像高度（像素）。
    pub fn pixel_height(&self) -> Result<u32, BitmapError> {
        self.inner.pixel_height()
    }

    /// 当前 Data URL。
    pub fn data_url(&self) -> Result<Option<String>, BitmapError> {
        self.inner.data_url()
    }

    /// 订阅“来源已变更”信号。
    pub fn subscribe_source_changed(
        &self,
        listener: SourceChangedListener,
    ) -> Result<(), BitmapError> {
        self.inner.subscribe_source_changed(listener)
    }

    /// 访问底层位图来源（数据流接入、图片加载等通用操作）。
    pub fn as_source(&self) -> &BitmapSource<S> {
        &self.inner
    }
}
