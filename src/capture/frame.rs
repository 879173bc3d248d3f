use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::decode::DecodeError;
use crate::math::Mat4;

/// One captured camera image plus its projection data, valid for one tick
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel bytes as delivered by the camera session
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Projection transforms computed by the camera session
    pub projection: FrameProjection,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(data: Bytes, meta: FrameMetadata, projection: FrameProjection) -> Self {
        Self {
            data,
            meta: Arc::new(meta),
            projection,
            timestamp: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// Pixel bytes with any row padding removed.
    ///
    /// Borrows when the rows are already tightly packed (or the format is
    /// compressed); copies row by row otherwise.
    pub fn packed_data(&self) -> Result<Cow<'_, [u8]>, DecodeError> {
        let meta = &self.meta;
        let Some((row, rows)) = meta.format.row_layout(meta.width, meta.height) else {
            return Ok(Cow::Borrowed(&self.data[..]));
        };
        let stride = meta.stride as usize;
        if stride == 0 || stride == row || rows == 0 {
            return Ok(Cow::Borrowed(&self.data[..]));
        }
        if stride < row {
            return Err(DecodeError::Stride { stride, row });
        }

        let needed = stride * (rows - 1) + row;
        if self.data.len() < needed {
            return Err(DecodeError::BufferSize {
                expected: needed,
                actual: self.data.len(),
            });
        }

        let mut packed = Vec::with_capacity(row * rows);
        for line in self.data.chunks(stride).take(rows) {
            packed.extend_from_slice(&line[..row]);
        }
        Ok(Cow::Owned(packed))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("meta", &self.meta)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per row, padding included. Zero means tightly packed.
    pub stride: u32,
    pub format: PixelFormat,
    pub orientation: Orientation,
}

/// Projection data for a frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameProjection {
    /// Camera projection for the current viewport aspect and screen rotation
    pub camera: Mat4,
    /// Image projection, fed to the material's `_TextureRotation` uniform
    pub image: Mat4,
    /// Global image rotation
    pub rotation: Mat4,
}

impl FrameProjection {
    /// Projection applied to the rendering camera: `camera * rotation⁻¹`
    pub fn camera_matrix(&self) -> Mat4 {
        self.camera * self.rotation.inverse_rotation()
    }
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray8,
    Rgb24,
    Bgr24,
    Rgba32,
    Yuyv4,
    Nv12,
    Nv21,
    Mjpeg,
}

impl PixelFormat {
    /// Expected buffer length for an unpadded image, `None` for compressed formats
    pub fn expected_len(self, width: u32, height: u32) -> Option<usize> {
        self.row_layout(width, height).map(|(row, rows)| row * rows)
    }

    /// Unpadded bytes per row and row count. Semi-planar formats stack the
    /// half-height chroma rows under the luma rows with the same stride.
    pub fn row_layout(self, width: u32, height: u32) -> Option<(usize, usize)> {
        let (width, height) = (width as usize, height as usize);
        match self {
            PixelFormat::Gray8 => Some((width, height)),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some((width * 3, height)),
            PixelFormat::Rgba32 => Some((width * 4, height)),
            PixelFormat::Yuyv4 => Some((width * 2, height)),
            PixelFormat::Nv12 | PixelFormat::Nv21 => Some((width, height + height / 2)),
            PixelFormat::Mjpeg => None,
        }
    }
}

/// Sensor orientation relative to the screen, in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn quarter_turns(self) -> u8 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 1,
            Orientation::Deg180 => 2,
            Orientation::Deg270 => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_len_per_format() {
        assert_eq!(PixelFormat::Gray8.expected_len(4, 2), Some(8));
        assert_eq!(PixelFormat::Rgb24.expected_len(4, 2), Some(24));
        assert_eq!(PixelFormat::Rgba32.expected_len(4, 2), Some(32));
        assert_eq!(PixelFormat::Yuyv4.expected_len(4, 2), Some(16));
        assert_eq!(PixelFormat::Nv12.expected_len(4, 2), Some(12));
        assert_eq!(PixelFormat::Mjpeg.expected_len(4, 2), None);
    }

    fn frame(data: &[u8], width: u32, height: u32, stride: u32, format: PixelFormat) -> Frame {
        Frame::new(
            Bytes::copy_from_slice(data),
            FrameMetadata {
                sequence: 1,
                width,
                height,
                stride,
                format,
                orientation: Orientation::Deg0,
            },
            FrameProjection::default(),
        )
    }

    #[test]
    fn packed_rows_are_borrowed() {
        let data = [1u8, 2, 3, 4, 5, 6];
        for stride in [0, 3] {
            let frame = frame(&data, 3, 2, stride, PixelFormat::Gray8);
            let packed = frame.packed_data().unwrap();
            assert!(matches!(packed, Cow::Borrowed(_)));
            assert_eq!(&*packed, &data);
        }
    }

    #[test]
    fn row_padding_is_stripped() {
        // 2x2 RGB rows padded to 8 bytes, last row unpadded
        let data = [
            1u8, 1, 1, 2, 2, 2, 0xee, 0xee, //
            3, 3, 3, 4, 4, 4,
        ];
        let frame = frame(&data, 2, 2, 8, PixelFormat::Rgb24);
        let packed = frame.packed_data().unwrap();
        assert_eq!(&*packed, &[1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn semi_planar_chroma_rows_share_the_stride() {
        // 2x2 NV12: two luma rows and one chroma row, each padded to 4 bytes
        let data = [10u8, 11, 0, 0, 12, 13, 0, 0, 128, 128, 0, 0];
        let frame = frame(&data, 2, 2, 4, PixelFormat::Nv12);
        assert_eq!(&*frame.packed_data().unwrap(), &[10, 11, 12, 13, 128, 128]);
    }

    #[test]
    fn bad_strides_are_rejected() {
        let short_stride = frame(&[0u8; 12], 2, 2, 4, PixelFormat::Rgb24);
        assert_eq!(
            short_stride.packed_data().unwrap_err(),
            DecodeError::Stride { stride: 4, row: 6 }
        );

        let truncated = frame(&[0u8; 10], 2, 2, 8, PixelFormat::Rgb24);
        assert_eq!(
            truncated.packed_data().unwrap_err(),
            DecodeError::BufferSize {
                expected: 14,
                actual: 10
            }
        );
    }

    #[test]
    fn camera_matrix_undoes_rotation() {
        let rotation = Mat4::rotation_z_quarters(Orientation::Deg90.quarter_turns());
        let projection = FrameProjection {
            camera: rotation,
            image: Mat4::IDENTITY,
            rotation,
        };
        assert_eq!(projection.camera_matrix(), Mat4::IDENTITY);
    }
}
