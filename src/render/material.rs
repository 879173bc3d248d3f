use crate::capture::{FrameMetadata, Orientation, PixelFormat};

use super::backend::MaterialHandle;

/// Uniform receiving the frame's image projection
pub const TEXTURE_ROTATION: &str = "_TextureRotation";

/// What a camera material depends on. Frames with equal keys share a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub format: PixelFormat,
    pub orientation: Orientation,
}

impl MaterialKey {
    pub fn for_frame(meta: &FrameMetadata) -> Self {
        Self {
            format: meta.format,
            orientation: meta.orientation,
        }
    }
}

/// Material currently owned by the render state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    pub handle: MaterialHandle,
    pub key: MaterialKey,
}
