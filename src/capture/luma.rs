//! Conversion of raw camera bytes into an 8-bit luminance plane

use std::borrow::Cow;

use jpeg_decoder::{Decoder, PixelFormat as JpegPixelFormat};

use super::frame::PixelFormat;
use crate::decode::DecodeError;

/// Grayscale plane, one byte per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaPlane<'a> {
    pub width: u32,
    pub height: u32,
    pub data: Cow<'a, [u8]>,
}

/// Expects tightly packed rows, see [`Frame::packed_data`](super::Frame::packed_data)
pub fn to_luminance(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<LumaPlane<'_>, DecodeError> {
    let pixels = width as usize * height as usize;
    if let Some(expected) = format.expected_len(width, height) {
        if data.len() < expected {
            return Err(DecodeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
    }

    let luma: Cow<'_, [u8]> = match format {
        PixelFormat::Mjpeg => return decode_jpeg(data),
        PixelFormat::Gray8 => Cow::Borrowed(&data[..pixels]),
        // Planar luma comes first, chroma is ignored
        PixelFormat::Nv12 | PixelFormat::Nv21 => Cow::Borrowed(&data[..pixels]),
        PixelFormat::Rgb24 => Cow::Owned(weighted(data, 3, pixels, [0, 1, 2])),
        PixelFormat::Bgr24 => Cow::Owned(weighted(data, 3, pixels, [2, 1, 0])),
        PixelFormat::Rgba32 => Cow::Owned(weighted(data, 4, pixels, [0, 1, 2])),
        PixelFormat::Yuyv4 => Cow::Owned(data.iter().step_by(2).take(pixels).copied().collect()),
    };

    Ok(LumaPlane {
        width,
        height,
        data: luma,
    })
}

/// `(R + 2G + B) / 4`, the usual fast approximation for barcode scanning
fn weighted(data: &[u8], bpp: usize, pixels: usize, [r, g, b]: [usize; 3]) -> Vec<u8> {
    data.chunks_exact(bpp)
        .take(pixels)
        .map(|px| ((px[r] as u32 + 2 * px[g] as u32 + px[b] as u32) >> 2) as u8)
        .collect()
}

fn decode_jpeg(data: &[u8]) -> Result<LumaPlane<'static>, DecodeError> {
    let mut decoder = Decoder::new(data);
    let pixels = decoder
        .decode()
        .map_err(|e| DecodeError::Jpeg(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| DecodeError::Jpeg("missing image info".into()))?;
    let count = info.width as usize * info.height as usize;

    let luma = match info.pixel_format {
        JpegPixelFormat::L8 => pixels,
        JpegPixelFormat::RGB24 => weighted(&pixels, 3, count, [0, 1, 2]),
        other => {
            return Err(DecodeError::Jpeg(format!(
                "unsupported jpeg pixel format {other:?}"
            )))
        }
    };

    Ok(LumaPlane {
        width: info.width as u32,
        height: info.height as u32,
        data: Cow::Owned(luma),
    })
}
