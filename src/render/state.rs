//! Render-resource state machine
//!
//! Owns the camera material, the optional off-screen target texture and the
//! draw-command list built from them. Whenever the material or the texture
//! changes the list is thrown away and rebuilt:
//! detach old, drop old, build new, attach new. New GPU resources are
//! allocated before anything is torn down, so a failed allocation leaves the
//! previous configuration attached and rendering.

use tracing::{debug, info, instrument, warn};

use super::backend::{GraphicsBackend, TextureHandle};
use super::commands::{CommandList, CommandListId};
use super::material::{Material, MaterialKey, TEXTURE_ROTATION};
use super::{DisplayTarget, RenderMode, Viewport};
use crate::capture::FrameProjection;
use crate::error::{Error, Result};
use crate::RenderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No material yet, nothing to draw
    Uninitialized,
    /// Material and command list in place
    Ready,
    Disposed,
}

pub struct RenderState<B: GraphicsBackend> {
    backend: B,
    phase: Phase,
    mode: RenderMode,
    display_target: DisplayTarget,
    offscreen: bool,
    material: Option<Material>,
    target: Option<TextureHandle>,
    commands: Option<CommandList>,
    attached: bool,
    next_list_id: u64,
}

impl<B: GraphicsBackend> RenderState<B> {
    pub fn new(backend: B, config: &RenderConfig) -> Self {
        Self {
            backend,
            phase: Phase::Uninitialized,
            mode: config.mode,
            display_target: config.display_target,
            offscreen: config.offscreen_target,
            material: None,
            target: None,
            commands: None,
            attached: false,
            next_list_id: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn display_target(&self) -> DisplayTarget {
        self.display_target
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// Current off-screen target. Pure read, never allocates.
    pub fn target_texture(&self) -> Option<TextureHandle> {
        self.target
    }

    pub fn command_list(&self) -> Option<&CommandList> {
        self.commands.as_ref()
    }

    /// Whether the current list is attached to the camera
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Adopt the material for `key` if it differs from the current one.
    ///
    /// Returns whether a rebuild happened.
    #[instrument(skip(self))]
    pub fn on_frame_material_changed(&mut self, key: MaterialKey) -> Result<bool> {
        self.ensure_live()?;
        if self.material.is_some_and(|m| m.key == key) {
            return Ok(false);
        }

        let handle = self.backend.create_material(key).map_err(|e| {
            warn!("Keeping previous material: {}", e);
            Error::from(e)
        })?;

        let previous = self.material.replace(Material { handle, key });
        self.rebuild();
        if let Some(previous) = previous {
            self.backend.release_material(previous.handle);
        }

        self.phase = Phase::Ready;
        debug!("Material switched to {:?}", key);
        Ok(true)
    }

    /// Make sure the off-screen target matches the current viewport.
    ///
    /// The size is recomputed on every call; a mismatch reallocates the texture
    /// and rebuilds the command list.
    pub fn ensure_target_texture(&mut self, viewport: &Viewport) -> Result<Option<TextureHandle>> {
        let (width, height) = viewport.target_size(self.display_target);
        self.on_viewport_resized(width, height)
    }

    /// Resize the off-screen target to exactly `width` x `height`.
    ///
    /// A no-op when the existing texture already has that size.
    #[instrument(skip(self))]
    pub fn on_viewport_resized(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Option<TextureHandle>> {
        self.ensure_live()?;
        if !self.offscreen {
            return Ok(None);
        }
        if let Some(current) = self.target {
            if current.width == width && current.height == height {
                return Ok(Some(current));
            }
        }

        let texture = self.backend.create_texture(width, height).map_err(|e| {
            warn!("Keeping previous target texture: {}", e);
            Error::from(e)
        })?;

        let previous = self.target.replace(texture);
        if self.material.is_some() {
            self.rebuild();
        }
        if let Some(previous) = previous {
            self.backend.destroy_texture(previous);
        }

        debug!("Target texture now {}x{}", width, height);
        Ok(Some(texture))
    }

    /// Switch between camera-driven and externally driven execution.
    ///
    /// Lists are only detached, never deleted, so switching back re-attaches
    /// the same list.
    #[instrument(skip(self))]
    pub fn set_render_mode(&mut self, mode: RenderMode) -> Result<()> {
        self.ensure_live()?;
        if mode == self.mode {
            return Ok(());
        }

        match mode {
            RenderMode::External => {
                self.backend.detach_all();
                self.attached = false;
            }
            RenderMode::Normal => {
                if let Some(list) = &self.commands {
                    self.backend.attach(list);
                    self.attached = true;
                }
            }
        }

        self.mode = mode;
        info!("Render mode set to {:?}", mode);
        Ok(())
    }

    /// Select the display the off-screen target mirrors. Takes effect on the
    /// next [`ensure_target_texture`](Self::ensure_target_texture).
    pub fn set_display_target(&mut self, target: DisplayTarget) -> Result<bool> {
        self.ensure_live()?;
        if target == self.display_target {
            return Ok(false);
        }
        self.display_target = target;
        Ok(true)
    }

    /// Push the frame's projection to the camera and the material
    pub fn update_projection(&mut self, projection: &FrameProjection) -> Result<()> {
        self.ensure_live()?;
        self.backend.set_camera_projection(&projection.camera_matrix());
        if let Some(material) = self.material {
            self.backend
                .set_matrix(material.handle, TEXTURE_ROTATION, &projection.image);
        }
        Ok(())
    }

    /// Release the command list, material and target texture.
    ///
    /// Terminal; later mutators return [`Error::Disposed`].
    #[instrument(skip(self))]
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            warn!("Render state disposed twice");
            return;
        }

        self.detach_current();
        self.commands = None;
        if let Some(material) = self.material.take() {
            self.backend.release_material(material.handle);
        }
        if let Some(texture) = self.target.take() {
            self.backend.destroy_texture(texture);
        }

        self.phase = Phase::Disposed;
        info!("Render state disposed");
    }

    fn ensure_live(&self) -> Result<()> {
        match self.phase {
            Phase::Disposed => Err(Error::Disposed),
            _ => Ok(()),
        }
    }

    fn detach_current(&mut self) {
        if let (true, Some(list)) = (self.attached, &self.commands) {
            self.backend.detach(list.id());
        }
        self.attached = false;
    }

    /// Replace the command list. Requires a material.
    fn rebuild(&mut self) {
        let Some(material) = self.material else {
            return;
        };

        self.detach_current();
        self.commands = None;

        self.next_list_id += 1;
        let list = CommandList::build(
            CommandListId(self.next_list_id),
            material.handle,
            self.target,
        );
        if self.mode == RenderMode::Normal {
            self.backend.attach(&list);
            self.attached = true;
        }

        debug!(
            "Command list {} rebuilt with {} blits",
            self.next_list_id,
            list.blits().len()
        );
        metrics::counter!("argus_render_rebuilds").increment(1);
        self.commands = Some(list);
    }
}

impl<B: GraphicsBackend> Drop for RenderState<B> {
    fn drop(&mut self) {
        if self.phase != Phase::Disposed {
            self.dispose();
        }
    }
}
