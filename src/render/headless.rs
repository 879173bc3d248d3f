//! In-memory graphics backend
//!
//! Keeps track of live resources and attached lists and records every call,
//! which is all the render state machine needs to be driven without a GPU.

use std::collections::HashMap;

use tracing::trace;

use super::backend::{BackendError, GraphicsBackend, MaterialHandle, TextureHandle};
use super::commands::{CommandList, CommandListId};
use super::material::MaterialKey;
use crate::math::Mat4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    CreateTexture { width: u32, height: u32 },
    DestroyTexture(TextureHandle),
    CreateMaterial(MaterialKey),
    ReleaseMaterial(MaterialHandle),
    Attach(CommandListId),
    Detach(CommandListId),
    DetachAll,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    textures: HashMap<u64, TextureHandle>,
    materials: HashMap<MaterialHandle, MaterialKey>,
    uniforms: HashMap<(MaterialHandle, String), Mat4>,
    camera_projection: Option<Mat4>,
    attached: Vec<CommandList>,
    log: Vec<BackendOp>,
    fail_texture: bool,
    fail_material: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next texture allocation fail
    pub fn fail_next_texture(&mut self) {
        self.fail_texture = true;
    }

    /// Make the next material creation fail
    pub fn fail_next_material(&mut self) {
        self.fail_material = true;
    }

    pub fn live_textures(&self) -> Vec<TextureHandle> {
        let mut textures: Vec<_> = self.textures.values().copied().collect();
        textures.sort_by_key(|t| t.id);
        textures
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn attached(&self) -> &[CommandList] {
        &self.attached
    }

    pub fn uniform(&self, material: MaterialHandle, name: &str) -> Option<Mat4> {
        self.uniforms.get(&(material, name.to_owned())).copied()
    }

    pub fn camera_projection(&self) -> Option<Mat4> {
        self.camera_projection
    }

    pub fn log(&self) -> &[BackendOp] {
        &self.log
    }

    pub fn count(&self, pred: impl Fn(&BackendOp) -> bool) -> usize {
        self.log.iter().filter(|op| pred(op)).count()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle, BackendError> {
        if std::mem::take(&mut self.fail_texture) || width == 0 || height == 0 {
            return Err(BackendError::Texture {
                width,
                height,
                reason: "allocation refused".into(),
            });
        }

        let texture = TextureHandle {
            id: self.next_id(),
            width,
            height,
        };
        self.textures.insert(texture.id, texture);
        self.log.push(BackendOp::CreateTexture { width, height });
        trace!("Created texture {:?}", texture);
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.id);
        self.log.push(BackendOp::DestroyTexture(texture));
    }

    fn create_material(&mut self, key: MaterialKey) -> Result<MaterialHandle, BackendError> {
        if std::mem::take(&mut self.fail_material) {
            return Err(BackendError::Material {
                key,
                reason: "shader unavailable".into(),
            });
        }

        let handle = MaterialHandle(self.next_id());
        self.materials.insert(handle, key);
        self.log.push(BackendOp::CreateMaterial(key));
        Ok(handle)
    }

    fn release_material(&mut self, material: MaterialHandle) {
        self.materials.remove(&material);
        self.uniforms.retain(|(owner, _), _| *owner != material);
        self.log.push(BackendOp::ReleaseMaterial(material));
    }

    fn set_matrix(&mut self, material: MaterialHandle, name: &str, value: &Mat4) {
        if self.materials.contains_key(&material) {
            self.uniforms.insert((material, name.to_owned()), *value);
        }
    }

    fn set_camera_projection(&mut self, projection: &Mat4) {
        self.camera_projection = Some(*projection);
    }

    fn attach(&mut self, list: &CommandList) {
        self.attached.push(list.clone());
        self.log.push(BackendOp::Attach(list.id()));
    }

    fn detach(&mut self, list: CommandListId) {
        self.attached.retain(|l| l.id() != list);
        self.log.push(BackendOp::Detach(list));
    }

    fn detach_all(&mut self) {
        self.attached.clear();
        self.log.push(BackendOp::DetachAll);
    }
}
