pub mod backend;
pub mod commands;
pub mod headless;
pub mod material;
pub mod state;

use serde::{Deserialize, Serialize};

pub use backend::{BackendError, GraphicsBackend, MaterialHandle, TextureHandle};
pub use commands::{Blit, BlitSource, CommandList, CommandListId, RenderTarget};
pub use headless::{BackendOp, HeadlessBackend};
pub use material::{Material, MaterialKey, TEXTURE_ROTATION};
pub use state::{Phase, RenderState};

/// Who executes the draw-command list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Attached to the camera and executed automatically
    #[default]
    Normal,
    /// Detached; an external renderer (eyewear, secondary display) drives it
    External,
}

/// Which part of the viewport the off-screen target mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayTarget {
    #[default]
    Normal,
    Left,
    Right,
}

/// Screen size and the camera's normalized viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub screen_width: u32,
    pub screen_height: u32,
    pub rect_width: f32,
    pub rect_height: f32,
}

impl Viewport {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            screen_width,
            screen_height,
            rect_width: 1.0,
            rect_height: 1.0,
        }
    }

    /// Required off-screen target size: `screen * rect`, halved horizontally
    /// for a single eyewear eye. Never zero.
    pub fn target_size(&self, display: DisplayTarget) -> (u32, u32) {
        let eye = match display {
            DisplayTarget::Normal => 1.0,
            DisplayTarget::Left | DisplayTarget::Right => 0.5,
        };
        let width = (self.screen_width as f32 * self.rect_width * eye) as u32;
        let height = (self.screen_height as f32 * self.rect_height) as u32;
        (width.max(1), height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_size_follows_rect_and_eye() {
        let viewport = Viewport {
            screen_width: 1920,
            screen_height: 1080,
            rect_width: 0.5,
            rect_height: 1.0,
        };
        assert_eq!(viewport.target_size(DisplayTarget::Normal), (960, 1080));
        assert_eq!(viewport.target_size(DisplayTarget::Left), (480, 1080));
        assert_eq!(viewport.target_size(DisplayTarget::Right), (480, 1080));
    }

    #[test]
    fn degenerate_viewport_is_clamped() {
        let viewport = Viewport {
            screen_width: 0,
            screen_height: 10,
            rect_width: 1.0,
            rect_height: 0.0,
        };
        assert_eq!(viewport.target_size(DisplayTarget::Normal), (1, 1));
    }
}
