//! # 位图来源核心模块
//!
//! ## 设计思路
//!
//! `BitmapSource` 负责把三类来源（数据流 / Data URL / 渲染表面光栅化）
//! 归一化为 `PixelBuffer + Data URL` 对，并在每次采集完成后通知订阅者。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 领取采集序号（ticket）
//! 3. 跨渲染表面取回光栅帧
//! 4. 同步解码并整体替换状态
//! 5. 触发“来源已变更”信号
//!
//! ## 实现思路
//!
//! - 状态通过 `RwLock<BitmapState>` 持有，替换在写锁内一次完成，
//!   外部只能观察到“尚未就绪”或“已完整更新”，不存在半填充状态。
//! - 并发采集用单调递增的序号裁决：提交时序号不是最新则整体丢弃（过期结果），
//!   取代原始设计中无保护的“后写覆盖”竞态。
//! - 数据流接入先取长度做容量前置检查，再整体复制，调用方可立即释放原始流。

use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use crate::config::BitmapConfig;
use crate::error::BitmapError;
use crate::source::{PixelBuffer, RasterFrame};
use crate::surface::{RenderSurface, SourceDescriptor};

/// “来源已变更”订阅回调。
pub type SourceChangedListener = Box<dyn Fn() + Send + Sync>;

/// 位图内部状态。
///
/// 像素缓冲与 Data URL 仅在采集完成瞬间保证同步。
struct BitmapState {
    buffer: PixelBuffer,
    data_url: Option<String>,
    stream: Option<Bytes>,
    stream_base64: Option<String>,
}

impl BitmapState {
    fn empty() -> Self {
        Self {
            buffer: PixelBuffer::empty(),
            data_url: None,
            stream: None,
            stream_base64: None,
        }
    }
}

/// 位图来源。
///
/// 渲染表面以泛型能力注入，浏览器宿主与离线宿主共用同一条采集链路。
pub struct BitmapSource<S: RenderSurface> {
    surface: Arc<S>,
    config: Arc<RwLock<BitmapConfig>>,
    state: RwLock<BitmapState>,
    generation: AtomicU64,
    listeners: Mutex<Vec<SourceChangedListener>>,
}

impl<S: RenderSurface> BitmapSource<S> {
    /// 使用默认配置创建位图来源。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use bitmap_imaging::bitmap::BitmapSource;
    /// use bitmap_imaging::offline::OfflineSurface;
    ///
    /// let bitmap = BitmapSource::new(Arc::new(OfflineSurface::new()))?;
    /// # Ok::<(), bitmap_imaging::error::BitmapError>(())
    /// ```
    pub fn new(surface: Arc<S>) -> Result<Self, BitmapError> {
        Self::with_config(surface, BitmapConfig::default())
    }

    /// 使用自定义配置创建位图来源。
    pub fn with_config(surface: Arc<S>, config: BitmapConfig) -> Result<Self, BitmapError> {
        Ok(Self {
            surface,
            config: Arc::new(RwLock::new(config)),
            state: RwLock::new(BitmapState::empty()),
            generation: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// 创建持有指定尺寸全零像素缓冲的位图来源。
    pub(crate) fn with_blank(
        surface: Arc<S>,
        config: BitmapConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, BitmapError> {
        let source = Self::with_config(surface, config)?;
        {
            let mut state = source.state_write()?;
            state.buffer = PixelBuffer::blank(width, height);
        }
        Ok(source)
    }

    pub(crate) fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次采集链路使用一致参数。
    pub(crate) fn config_snapshot(&self) -> Result<BitmapConfig, BitmapError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| BitmapError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    fn state_read(&self) -> Result<std::sync::RwLockReadGuard<'_, BitmapState>, BitmapError> {
        self.state
            .read()
            .map_err(|_| BitmapError::ResourceLimit("状态读取锁已中毒".to_string()))
    }

    fn state_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BitmapState>, BitmapError> {
        self.state
            .write()
            .map_err(|_| BitmapError::ResourceLimit("状态写入锁已中毒".to_string()))
    }

    /// 图像宽度（像素）。
    pub fn pixel_width(&self) -> Result<u32, BitmapError> {
        Ok(self.state_read()?.buffer.width)
    }

    /// 图像高度（像素）。
    pub fn pixel_height(&self) -> Result<u32, BitmapError> {
        Ok(self.state_read()?.buffer.height)
    }

    /// 打包像素缓冲快照。
    pub fn pixel_buffer(&self) -> Result<PixelBuffer, BitmapError> {
        Ok(self.state_read()?.buffer.clone())
    }

    /// 当前 Data URL（未设置时为 `None`）。
    pub fn data_url(&self) -> Result<Option<String>, BitmapError> {
        Ok(self.state_read()?.data_url.clone())
    }

    /// 订阅“来源已变更”信号。
    ///
    /// 信号在状态整体替换之后触发，回调中读取到的永远是完整状态。
    pub fn subscribe_source_changed(&self, listener: SourceChangedListener) -> Result<(), BitmapError> {
        let mut listeners = self
            .listeners
            .lock()
            .map_err(|_| BitmapError::ResourceLimit("订阅列表锁已中毒".to_string()))?;
        listeners.push(listener);
        Ok(())
    }

    fn notify_source_changed(&self) -> Result<(), BitmapError> {
        let listeners = self
            .listeners
            .lock()
            .map_err(|_| BitmapError::ResourceLimit("订阅列表锁已中毒".to_string()))?;

        for listener in listeners.iter() {
            listener();
        }

        Ok(())
    }

    /// 接入源数据流。
    ///
    /// 同步完成整体复制，不触发解码；解码推迟到 Base64 访问或显式加载。
    /// 前置条件：流长度不超过配置上限（默认 2,147,483,647 字节），
    /// 违规时返回容量错误且现有状态保持不变。
    pub fn set_source_stream<R: Read + Seek>(&self, stream: R) -> Result<(), BitmapError> {
        let config = self.config_snapshot()?;
        let bytes = Self::read_stream_bytes(stream, &config)?;

        log::info!("📦 已复制源数据流 - {} bytes", bytes.len());

        let mut state = self.state_write()?;
        state.stream = Some(Bytes::from(bytes));
        state.stream_base64 = None; // 旧缓存随新来源失效

        Ok(())
    }

    /// 接入已编码的 Data URL，不触发解码。
    pub fn set_source_data_url(&self, data_url: impl Into<String>) -> Result<(), BitmapError> {
        let mut state = self.state_write()?;
        state.data_url = Some(data_url.into());
        Ok(())
    }

    /// 将已接入的数据流编码为 Base64。
    ///
    /// 结果缓存至下一次 `set_source_stream`。
    pub fn stream_as_base64(&self) -> Result<String, BitmapError> {
        let mut state = self.state_write()?;

        if let Some(cached) = &state.stream_base64 {
            return Ok(cached.clone());
        }

        let stream = state
            .stream
            .as_ref()
            .ok_or_else(|| BitmapError::MalformedInput("尚未接入源数据流".to_string()))?;

        let encoded = general_purpose::STANDARD.encode(stream);
        state.stream_base64 = Some(encoded.clone());

        Ok(encoded)
    }

    /// 加载图片：解析地址 → 渲染表面光栅化 → 解码替换 → 通知。
    ///
    /// 相对地址按宿主约定解析为 `/{组件前缀};component/{地址}`。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use bitmap_imaging::bitmap::BitmapSource;
    /// use bitmap_imaging::offline::OfflineSurface;
    ///
    /// # async fn demo() -> Result<(), bitmap_imaging::error::BitmapError> {
    /// let bitmap = BitmapSource::new(Arc::new(OfflineSurface::new()))?;
    /// bitmap.load_image("data:image/png;base64,...").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_image(&self, uri: &str) -> Result<(), BitmapError> {
        let config = self.config_snapshot()?;
        let url = Self::resolve_uri(uri, config.component_prefix.as_deref());

        log::info!("🌐 开始加载图片 - {}", Self::describe_uri(&url));

        let ticket = self.begin_acquisition();
        let descriptor = if url.starts_with("data:") {
            SourceDescriptor::DataUrl(url)
        } else {
            SourceDescriptor::Url(url)
        };

        let frame = self.surface.rasterize(descriptor).await?;
        self.apply_frame(ticket, frame, &config)
    }

    /// 读取一个数据流并以 Data URL 方式走完整加载链路。
    ///
    /// 不存储该数据流本身（与 `set_source_stream` 的延迟语义不同）。
    pub async fn load_from_stream<R: Read + Seek>(&self, stream: R) -> Result<(), BitmapError> {
        let config = self.config_snapshot()?;
        let bytes = Self::read_stream_bytes(stream, &config)?;

        let data_url = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&bytes)
        );

        self.load_image(&data_url).await
    }

    /// 领取采集序号。
    ///
    /// 每个跨表面请求在发起时领取，提交时与最新序号比对。
    pub(crate) fn begin_acquisition(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 提交一帧光栅：解码、整体替换状态、触发信号。
    ///
    /// 序号不是最新时整体丢弃，状态保持不变。
    pub(crate) fn apply_frame(
        &self,
        ticket: u64,
        frame: RasterFrame,
        config: &BitmapConfig,
    ) -> Result<(), BitmapError> {
        Self::validate_pixel_limits(config, frame.width, frame.height)?;
        let buffer = PixelBuffer::from_frame(&frame)?;

        {
            let mut state = self.state_write()?;

            let latest = self.generation.load(Ordering::SeqCst);
            if ticket != latest {
                log::warn!("⚠️ 丢弃过期的采集结果 - ticket={} latest={}", ticket, latest);
                return Err(BitmapError::Stale(format!(
                    "采集结果已过期（ticket={}，latest={}）",
                    ticket, latest
                )));
            }

            state.buffer = buffer;
            state.data_url = Some(frame.data_url);
        }

        self.notify_source_changed()?;

        log::info!(
            "✅ 像素缓冲已更新 - {}x{} ({} 像素)",
            frame.width,
            frame.height,
            frame.width as u64 * frame.height as u64
        );

        Ok(())
    }

    /// 将外部像素缓冲按偏移合成进当前缓冲。
    ///
    /// 越界目标位置静默裁剪，属于预期行为而非错误。
    /// 这是子系统内唯一的增量修改路径。
    pub(crate) fn composite_pixels(
        &self,
        source: &PixelBuffer,
        offset_x: u32,
        offset_y: u32,
    ) -> Result<(), BitmapError> {
        {
            let mut state = self.state_write()?;
            let target_width = state.buffer.width as usize;
            let target_height = state.buffer.height as usize;
            let source_width = source.width as usize;

            for (i, &pixel) in source.pixels.iter().enumerate() {
                let row = offset_y as usize + i / source_width.max(1);
                let col = offset_x as usize + i % source_width.max(1);

                if row >= target_height || col >= target_width {
                    continue;
                }

                state.buffer.pixels[row * target_width + col] = pixel;
            }
        }

        log::debug!(
            "🧩 合成完成 - 源 {}x{} → 偏移 ({}, {})",
            source.width,
            source.height,
            offset_x,
            offset_y
        );

        self.notify_source_changed()
    }

    /// 在写锁内编辑像素数组（本地编辑，不触发信号）。
    ///
    /// 编辑后的 Data URL 需要通过 `invalidate` 刷新。
    pub(crate) fn edit_pixels_locked(
        &self,
        edit: impl FnOnce(&mut [i32]),
    ) -> Result<(), BitmapError> {
        let mut state = self.state_write()?;
        edit(&mut state.buffer.pixels);
        Ok(())
    }

    /// 整体复制另一个位图来源的可见状态。
    pub(crate) fn copy_visible_state_from(&self, other: &Self) -> Result<(), BitmapError> {
        let (buffer, data_url) = {
            let state = other.state_read()?;
            (state.buffer.clone(), state.data_url.clone())
        };

        let mut state = self.state_write()?;
        state.buffer = buffer;
        state.data_url = data_url;

        Ok(())
    }

    /// 读取流字节：先做容量前置检查，再整体复制。
    fn read_stream_bytes<R: Read + Seek>(
        mut stream: R,
        config: &BitmapConfig,
    ) -> Result<Vec<u8>, BitmapError> {
        let limit = config.effective_stream_limit();
        let len = stream.seek(SeekFrom::End(0))?;

        if len > limit {
            return Err(BitmapError::Capacity(format!(
                "源数据流过大：{} 字节（上限：{} 字节）",
                len, limit
            )));
        }

        stream.seek(SeekFrom::Start(0))?;

        let mut bytes = Vec::with_capacity(len as usize);
        stream.take(len).read_to_end(&mut bytes)?;

        if config.validate_signature {
            Self::validate_image_signature(&bytes)?;
        }

        Ok(bytes)
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), BitmapError> {
        if bytes.is_empty() {
            return Err(BitmapError::MalformedInput("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| BitmapError::MalformedInput("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(BitmapError::MalformedInput(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        config: &BitmapConfig,
        width: u32,
        height: u32,
    ) -> Result<(), BitmapError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| BitmapError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(BitmapError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    /// 解析相对地址。
    ///
    /// 绝对地址（带协议、Data URL、根路径）原样透传。
    fn resolve_uri(uri: &str, component_prefix: Option<&str>) -> String {
        let is_absolute =
            uri.contains("://") || uri.starts_with("data:") || uri.starts_with('/');

        if is_absolute {
            return uri.to_string();
        }

        match component_prefix {
            Some(prefix) => format!("/{};component/{}", prefix, uri),
            None => uri.to_string(),
        }
    }

    /// 日志用地址描述：Data URL 只保留前缀与长度。
    fn describe_uri(uri: &str) -> String {
        if let Some(marker) = uri.find(";base64,") {
            return format!("{};base64,<{} chars>", &uri[..marker], uri.len() - marker - 8);
        }

        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::io::{self, Cursor};
    use std::sync::atomic::AtomicBool;
    use tokio::sync::oneshot;

    /// 为每个登记地址返回一帧可人为控制完成时机的假表面。
    struct GatedSurface {
        gates: Mutex<HashMap<String, oneshot::Receiver<RasterFrame>>>,
    }

    impl GatedSurface {
        fn new() -> Self {
            Self {
                gates: Mutex::new(HashMap::new()),
            }
        }

        fn gate(&self, key: &str) -> oneshot::Sender<RasterFrame> {
            let (tx, rx) = oneshot::channel();
            self.gates
                .lock()
                .expect("gate lock poisoned")
                .insert(key.to_string(), rx);
            tx
        }
    }

    impl RenderSurface for GatedSurface {
        fn rasterize(
            &self,
            descriptor: SourceDescriptor,
        ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
            let key = match &descriptor {
                SourceDescriptor::Url(url) => url.clone(),
                SourceDescriptor::DataUrl(url) => url.clone(),
                SourceDescriptor::Visual(handle) => format!("visual:{}", handle.0),
            };
            let gate = self.gates.lock().expect("gate lock poisoned").remove(&key);

            async move {
                let gate = gate
                    .ok_or_else(|| BitmapError::Surface(format!("未登记的光栅化请求：{}", key)))?;
                gate.await
                    .map_err(|_| BitmapError::Surface("光栅化请求被丢弃".to_string()))
            }
        }

        fn rebuild_raster(
            &self,
            _width: u32,
            _height: u32,
            _rgba: Bytes,
        ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
            async move { Err(BitmapError::Surface("测试表面不支持重建光栅".to_string())) }
        }
    }

    /// 对任意请求立即返回同一帧的假表面。
    struct CannedSurface {
        frame: RasterFrame,
    }

    impl RenderSurface for CannedSurface {
        fn rasterize(
            &self,
            _descriptor: SourceDescriptor,
        ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
            let frame = self.frame.clone();
            async move { Ok(frame) }
        }

        fn rebuild_raster(
            &self,
            _width: u32,
            _height: u32,
            _rgba: Bytes,
        ) -> impl Future<Output = Result<RasterFrame, BitmapError>> + Send {
            let frame = self.frame.clone();
            async move { Ok(frame) }
        }
    }

    /// 只声明长度、不产出数据的假数据流，用于容量前置检查测试。
    struct HugeStream {
        len: u64,
    }

    impl Read for HugeStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Seek for HugeStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::End(0) => Ok(self.len),
                SeekFrom::Start(p) => Ok(p),
                _ => Ok(0),
            }
        }
    }

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> RasterFrame {
        let mut bytes = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            bytes.extend_from_slice(&rgba);
        }

        RasterFrame {
            width,
            height,
            data_url: format!("data:image/png;base64,frame-{}x{}", width, height),
            rgba: Bytes::from(bytes),
        }
    }

    fn relaxed_config() -> BitmapConfig {
        let mut config = BitmapConfig::default();
        config.validate_signature = false;
        config
    }

    const PNG_SIGNATURE: [u8; 12] = [137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

    #[test]
    fn new_bitmap_starts_with_empty_buffer() {
        let bitmap = BitmapSource::new(Arc::new(CannedSurface {
            frame: solid_frame(1, 1, [0, 0, 0, 0]),
        }))
        .expect("bitmap init failed");

        assert_eq!(bitmap.pixel_width().expect("read width failed"), 0);
        assert_eq!(bitmap.pixel_height().expect("read height failed"), 0);
        assert!(bitmap.pixel_buffer().expect("read buffer failed").is_empty());
        assert!(bitmap.data_url().expect("read data url failed").is_none());
    }

    #[test]
    fn oversized_stream_fails_capacity_check_and_keeps_state() {
        let bitmap = BitmapSource::with_config(
            Arc::new(CannedSurface {
                frame: solid_frame(1, 1, [0, 0, 0, 0]),
            }),
            relaxed_config(),
        )
        .expect("bitmap init failed");

        bitmap
            .set_source_data_url("data:image/png;base64,before")
            .expect("set data url failed");

        let result = bitmap.set_source_stream(HugeStream {
            len: i32::MAX as u64 + 1,
        });

        assert!(matches!(result, Err(BitmapError::Capacity(_))));
        assert_eq!(
            bitmap.data_url().expect("read data url failed").as_deref(),
            Some("data:image/png;base64,before")
        );
        assert!(matches!(
            bitmap.stream_as_base64(),
            Err(BitmapError::MalformedInput(_))
        ));
    }

    #[test]
    fn stream_as_base64_caches_until_next_stream() {
        let bitmap = BitmapSource::with_config(
            Arc::new(CannedSurface {
                frame: solid_frame(1, 1, [0, 0, 0, 0]),
            }),
            relaxed_config(),
        )
        .expect("bitmap init failed");

        bitmap
            .set_source_stream(Cursor::new(vec![1_u8, 2, 3]))
            .expect("set stream failed");

        let first = bitmap.stream_as_base64().expect("encode failed");
        let second = bitmap.stream_as_base64().expect("encode failed");
        assert_eq!(first, "AQID");
        assert_eq!(first, second);

        bitmap
            .set_source_stream(Cursor::new(vec![4_u8, 5, 6]))
            .expect("set stream failed");
        let third = bitmap.stream_as_base64().expect("encode failed");
        assert_eq!(third, "BAUG");
    }

    #[test]
    fn stream_signature_validation_rejects_non_image_payload() {
        let bitmap = BitmapSource::new(Arc::new(CannedSurface {
            frame: solid_frame(1, 1, [0, 0, 0, 0]),
        }))
        .expect("bitmap init failed");

        let result = bitmap.set_source_stream(Cursor::new(b"<html>not an image</html>".to_vec()));
        assert!(matches!(result, Err(BitmapError::MalformedInput(_))));

        bitmap
            .set_source_stream(Cursor::new(PNG_SIGNATURE.to_vec()))
            .expect("png-signed stream should be accepted");
    }

    #[test]
    fn resolve_uri_applies_component_prefix_to_relative_paths() {
        assert_eq!(
            BitmapSource::<CannedSurface>::resolve_uri("assets/logo.png", Some("app")),
            "/app;component/assets/logo.png"
        );
        assert_eq!(
            BitmapSource::<CannedSurface>::resolve_uri("https://example.com/a.png", Some("app")),
            "https://example.com/a.png"
        );
        assert_eq!(
            BitmapSource::<CannedSurface>::resolve_uri("data:image/png;base64,AA==", Some("app")),
            "data:image/png;base64,AA=="
        );
        assert_eq!(
            BitmapSource::<CannedSurface>::resolve_uri("/already/rooted.png", Some("app")),
            "/already/rooted.png"
        );
        assert_eq!(
            BitmapSource::<CannedSurface>::resolve_uri("assets/logo.png", None),
            "assets/logo.png"
        );
    }

    #[tokio::test]
    async fn load_image_replaces_state_and_notifies() {
        let frame = solid_frame(2, 3, [255, 0, 0, 255]);
        let bitmap = BitmapSource::new(Arc::new(CannedSurface {
            frame: frame.clone(),
        }))
        .expect("bitmap init failed");

        let notified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&notified);
        bitmap
            .subscribe_source_changed(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
            }))
            .expect("subscribe failed");

        bitmap
            .load_image("https://example.com/red.png")
            .await
            .expect("load image failed");

        let buffer = bitmap.pixel_buffer().expect("read buffer failed");
        assert_eq!(buffer.width, 2);
        assert_eq!(buffer.height, 3);
        assert_eq!(buffer.pixels.len(), 6);
        assert!(buffer.pixels.iter().all(|&p| p == 0x0000_FFFF));
        assert_eq!(
            bitmap.data_url().expect("read data url failed").as_deref(),
            Some(frame.data_url.as_str())
        );
        assert!(notified.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn load_from_stream_runs_full_acquisition() {
        let frame = solid_frame(1, 1, [0, 255, 0, 255]);
        let bitmap = BitmapSource::with_config(
            Arc::new(CannedSurface {
                frame: frame.clone(),
            }),
            relaxed_config(),
        )
        .expect("bitmap init failed");

        bitmap
            .load_from_stream(Cursor::new(vec![9_u8, 8, 7]))
            .await
            .expect("load from stream failed");

        let buffer = bitmap.pixel_buffer().expect("read buffer failed");
        assert_eq!((buffer.width, buffer.height), (1, 1));
        assert_eq!(buffer.pixels.len(), 1);
    }

    #[tokio::test]
    async fn rejected_pixel_limit_keeps_state_untouched() {
        let mut config = relaxed_config();
        config.max_decoded_pixels = 4;

        let bitmap = BitmapSource::with_config(
            Arc::new(CannedSurface {
                frame: solid_frame(3, 3, [1, 2, 3, 4]),
            }),
            config,
        )
        .expect("bitmap init failed");

        let result = bitmap.load_image("https://example.com/too-big.png").await;

        assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
        assert!(bitmap.pixel_buffer().expect("read buffer failed").is_empty());
    }

    #[tokio::test]
    async fn stale_acquisition_is_discarded_and_latest_wins() {
        let surface = Arc::new(GatedSurface::new());
        let gate_a = surface.gate("https://example.com/a.png");
        let gate_b = surface.gate("https://example.com/b.png");

        let bitmap = BitmapSource::new(Arc::clone(&surface)).expect("bitmap init failed");

        let load_a = bitmap.load_image("https://example.com/a.png");
        let load_b = bitmap.load_image("https://example.com/b.png");

        let release = async move {
            // 先让 B 完成，再让 A 完成：A 的结果必须作为过期数据被丢弃
            gate_b
                .send(solid_frame(2, 2, [0, 255, 0, 255]))
                .expect("release gate b failed");
            tokio::task::yield_now().await;
            gate_a
                .send(solid_frame(1, 1, [255, 0, 0, 255]))
                .expect("release gate a failed");
        };

        let (result_a, result_b, _) = tokio::join!(load_a, load_b, release);

        assert!(matches!(result_a, Err(BitmapError::Stale(_))));
        result_b.expect("latest acquisition should apply");

        let buffer = bitmap.pixel_buffer().expect("read buffer failed");
        assert_eq!((buffer.width, buffer.height), (2, 2));
        assert!(buffer.pixels.iter().all(|&p| p == 0x00FF_00FF_u32 as i32));
    }

    #[tokio::test]
    async fn surface_failure_propagates_and_keeps_state() {
        let surface = Arc::new(GatedSurface::new());
        let gate = surface.gate("https://example.com/dropped.png");

        let bitmap = BitmapSource::new(Arc::clone(&surface)).expect("bitmap init failed");

        drop(gate); // 模拟外部环境丢弃请求

        let result = bitmap.load_image("https://example.com/dropped.png").await;

        assert!(matches!(result, Err(BitmapError::Surface(_))));
        assert!(bitmap.pixel_buffer().expect("read buffer failed").is_empty());
    }
}
