//! Deterministic test-pattern camera

use bytes::{BufMut, BytesMut};
use tracing::debug;

use super::frame::{Frame, FrameMetadata, FrameProjection, Orientation, PixelFormat};
use super::source::FrameSource;
use crate::math::Mat4;
use crate::CaptureConfig;

/// Marker written at the start of a frame that carries a banner payload
pub const BANNER_MAGIC: &[u8; 4] = b"ARGS";

/// Generates a moving gradient, optionally stamping a text banner into the
/// luminance of the first pixels of every `every`-th frame.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    format: PixelFormat,
    orientation: Orientation,
    sequence: u64,
    banner: Option<(String, u64)>,
}

impl SyntheticCamera {
    pub fn new(config: &CaptureConfig) -> Self {
        debug!(
            "Synthetic camera {}x{} {:?}",
            config.width, config.height, config.format
        );
        Self {
            width: config.width,
            height: config.height,
            format: config.format,
            orientation: config.orientation,
            sequence: 0,
            banner: None,
        }
    }

    pub fn with_banner(mut self, text: impl Into<String>, every: u64) -> Self {
        self.banner = Some((text.into(), every.max(1)));
        self
    }

    /// Produce the next frame
    pub fn capture(&mut self) -> Frame {
        self.sequence += 1;

        // Compressed formats have no fixed size; fall back to a gray plane
        let format = match self.format {
            PixelFormat::Mjpeg => PixelFormat::Gray8,
            other => other,
        };
        let (row, rows) = format.row_layout(self.width, self.height).unwrap_or((0, 0));
        let len = row * rows;
        let shift = self.sequence as usize;
        let width = self.width.max(1) as usize;

        let mut data = BytesMut::with_capacity(len);
        for i in 0..len {
            data.put_u8(((i % width + shift) & 0xff) as u8);
        }

        if let Some((text, every)) = &self.banner {
            if self.sequence % every == 0 {
                stamp_banner(&mut data, format, text);
            }
        }

        let rotation = Mat4::rotation_z_quarters(self.orientation.quarter_turns());
        Frame::new(
            data.freeze(),
            FrameMetadata {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
                stride: row as u32,
                format,
                orientation: self.orientation,
            },
            FrameProjection {
                camera: Mat4::IDENTITY,
                image: rotation,
                rotation,
            },
        )
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Option<Frame> {
        Some(self.capture())
    }
}

/// Write `MAGIC | len (u16 BE) | text`, one byte per pixel, into the channels
/// that make up the pixel's luminance.
fn stamp_banner(data: &mut [u8], format: PixelFormat, text: &str) {
    let (stride, channels) = match format {
        PixelFormat::Gray8 | PixelFormat::Nv12 | PixelFormat::Nv21 | PixelFormat::Mjpeg => (1, 1),
        PixelFormat::Rgb24 | PixelFormat::Bgr24 => (3, 3),
        PixelFormat::Rgba32 => (4, 3),
        PixelFormat::Yuyv4 => (2, 1),
    };

    let payload = text.as_bytes();
    let Ok(len) = u16::try_from(payload.len()) else {
        return;
    };
    let banner: Vec<u8> = BANNER_MAGIC
        .iter()
        .chain(&len.to_be_bytes())
        .chain(payload)
        .copied()
        .collect();
    if banner.len() * stride > data.len() {
        return;
    }

    for (pixel, value) in data.chunks_exact_mut(stride).zip(&banner) {
        pixel[..channels].fill(*value);
    }
}

/// Read back a banner stamped by [`SyntheticCamera`] from a luminance plane
pub fn read_banner(luma: &[u8]) -> Option<&str> {
    let rest = luma.strip_prefix(BANNER_MAGIC.as_slice())?;
    let len = u16::from_be_bytes([*rest.first()?, *rest.get(1)?]) as usize;
    let payload = rest.get(2..2 + len)?;
    std::str::from_utf8(payload).ok()
}
