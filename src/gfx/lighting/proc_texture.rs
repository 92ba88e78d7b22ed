//! Parameters of the procedural checkerboard applied by `fragmentShader_PhongTextured`.

use wgpu::Device;

use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

/// Name of the procedural texture uniform block.
pub const TEXTURE_BLOCK: &str = "phTexture";

/// GPU layout of `PhTexture` in the bundled shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProcTextureUniform {
    /// Nonzero applies the texture
    pub apply_texture: u32,
    pub texture_time: f32,
    pub scale: [f32; 2],
}

type ProcTextureUbo = UniformBuffer<ProcTextureUniform>;

/// Animated checkerboard modulating the lit color.
///
/// Time runs over `[0, 1)` and wraps; the shader pattern repeats with the
/// same period.
pub struct ProcTexture {
    pub apply: bool,
    /// Checker squares per unit of s and t
    pub scale: [f32; 2],
    time: f32,

    texture_ubo: Option<ProcTextureUbo>,
    bindings: Option<(BindGroupLayoutWithDesc, wgpu::BindGroup)>,
}

impl Default for ProcTexture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcTexture {
    pub fn new() -> Self {
        Self {
            apply: true,
            scale: [8.0, 4.0],
            time: 0.0,
            texture_ubo: None,
            bindings: None,
        }
    }

    pub fn with_scale(mut self, s: f32, t: f32) -> Self {
        self.scale = [s, t];
        self
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advances the animation, wrapping back into `[0, 1)`.
    pub fn advance(&mut self, delta: f32) {
        self.time = (self.time + delta).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        if self.time >= 1.0 {
            self.time = 0.0;
        }
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }

    pub fn uniform(&self) -> ProcTextureUniform {
        ProcTextureUniform {
            apply_texture: if self.apply { 0xFFFF_FFFF } else { 0 },
            texture_time: self.time,
            scale: self.scale,
        }
    }

    /// Creates the GPU buffer on first call and uploads the current values.
    pub fn update_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        let uniform = self.uniform();
        let ubo = self
            .texture_ubo
            .get_or_insert_with(|| ProcTextureUbo::new(device));
        if self.bindings.is_none() {
            let layout = BindGroupLayoutBuilder::new()
                .next_binding_fragment(binding_types::uniform())
                .create(device, "Procedural Texture Bind Group Layout");
            let bind_group = BindGroupBuilder::new(&layout)
                .resource(ubo.binding_resource())
                .create(device, "Procedural Texture Bind Group");
            self.bindings = Some((layout, bind_group));
        }
        ubo.update_content(queue, uniform);
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bindings.as_ref().map(|(_, group)| group)
    }

    pub fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.bindings.as_ref().map(|(layout, _)| &layout.layout)
    }
}
