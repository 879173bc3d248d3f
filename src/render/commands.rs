//! Draw-command lists
//!
//! A list is built once and never patched. Any change of material or target
//! texture produces a brand new list with a fresh id.

use super::backend::{MaterialHandle, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandListId(pub u64);

/// Built-in or allocated render destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The camera's primary display target
    CameraTarget,
    Texture(TextureHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitSource {
    /// Raw camera image, sampled through the material
    CameraInput,
    Target(RenderTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blit {
    pub source: BlitSource,
    pub dest: RenderTarget,
    pub material: Option<MaterialHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList {
    id: CommandListId,
    blits: Vec<Blit>,
}

impl CommandList {
    /// Camera input through `material` to the display target, then copied
    /// into the off-screen `target` when one is configured.
    pub fn build(
        id: CommandListId,
        material: MaterialHandle,
        target: Option<TextureHandle>,
    ) -> Self {
        let mut blits = vec![Blit {
            source: BlitSource::CameraInput,
            dest: RenderTarget::CameraTarget,
            material: Some(material),
        }];

        if let Some(texture) = target {
            blits.push(Blit {
                source: BlitSource::Target(RenderTarget::CameraTarget),
                dest: RenderTarget::Texture(texture),
                material: None,
            });
        }

        Self { id, blits }
    }

    pub fn id(&self) -> CommandListId {
        self.id
    }

    pub fn blits(&self) -> &[Blit] {
        &self.blits
    }

    /// Same blit sequence, regardless of list identity
    pub fn same_targets(&self, other: &CommandList) -> bool {
        self.blits == other.blits
    }
}
