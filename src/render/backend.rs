//! Graphics backend capability
//!
//! Texture allocation, material creation and command-list submission are
//! owned by the host engine. [`RenderState`](super::RenderState) drives them
//! through this trait and never touches GPU objects directly.

use thiserror::Error;

use super::commands::{CommandList, CommandListId};
use super::material::MaterialKey;
use crate::math::Mat4;

/// Off-screen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("texture {width}x{height}: {reason}")]
    Texture {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("material {key:?}: {reason}")]
    Material { key: MaterialKey, reason: String },
}

pub trait GraphicsBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle, BackendError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Create the camera material for a pixel format and orientation
    fn create_material(&mut self, key: MaterialKey) -> Result<MaterialHandle, BackendError>;

    fn release_material(&mut self, material: MaterialHandle);

    /// Set a named matrix uniform on a material
    fn set_matrix(&mut self, material: MaterialHandle, name: &str, value: &Mat4);

    fn set_camera_projection(&mut self, projection: &Mat4);

    /// Attach a command list to the camera for automatic execution each frame
    fn attach(&mut self, list: &CommandList);

    fn detach(&mut self, list: CommandListId);

    /// Detach every list attached to the camera
    fn detach_all(&mut self);
}
