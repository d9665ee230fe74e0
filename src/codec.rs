//! # 像素编解码模块
//!
//! ## 设计思路
//!
//! 画布光栅源输出的字节序为每像素 `R,G,B,A` 四字节；框架内部的打包表示为
//! 每像素一个 32 位有符号整数。两者之间的转换必须确定、无损、双向对称：
//! 编码与解码只要有一处通道顺序不一致，颜色就会被静默破坏且不会触发任何错误。
//!
//! ## 实现思路
//!
//! - 打包规则：字节组 `(R,G,B,A)` 重排为 `[B,G,R,A]` 后按大端解释为 i32。
//!   该顺序是既定的存储/传输格式，下游消费方按位依赖，不随平台字节序变化。
//! - 解码对未对齐输入（长度非 4 的倍数）立即返回 `MalformedInput`，
//!   不产出未定义内容。
//! - `decode(encode(p)) == p` 对所有 `p` 成立，由单元测试与属性测试共同约束。

use crate::error::BitmapError;

/// 将 RGBA 字节缓冲解码为打包像素数组。
///
/// 每 4 个字节产出一个打包整数，顺序与字节组顺序一致，
/// 输出长度为 `bytes.len() / 4`。
///
/// # 示例
/// ```rust
/// use bitmap_imaging::codec::decode_rgba;
///
/// let pixels = decode_rgba(&[255, 0, 0, 255])?;
/// assert_eq!(pixels, vec![0x0000_FFFF]);
/// # Ok::<(), bitmap_imaging::error::BitmapError>(())
/// ```
pub fn decode_rgba(bytes: &[u8]) -> Result<Vec<i32>, BitmapError> {
    if bytes.len() % 4 != 0 {
        return Err(BitmapError::MalformedInput(format!(
            "RGBA 字节缓冲长度必须是 4 的倍数（实际：{}）",
            bytes.len()
        )));
    }

    let mut pixels = Vec::with_capacity(bytes.len() / 4);
    for group in bytes.chunks_exact(4) {
        // [R,G,B,A] -> [B,G,R,A]，按大端解释
        pixels.push(i32::from_be_bytes([group[2], group[1], group[0], group[3]]));
    }

    Ok(pixels)
}

/// 将打包像素数组编码回 RGBA 字节缓冲。
///
/// 严格为 [`decode_rgba`] 的逆操作，输出长度为 `pixels.len() * 4`。
pub fn encode_rgba(pixels: &[i32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixels.len() * 4);
    for &pixel in pixels {
        // 大端字节即 [B,G,R,A]，重排还原为 [R,G,B,A]
        let b = pixel.to_be_bytes();
        bytes.extend_from_slice(&[b[2], b[1], b[0], b[3]]);
    }

    bytes
}
