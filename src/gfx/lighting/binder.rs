use std::num::NonZeroU64;

use log::debug;
use wgpu::{Device, Queue};

use super::{
    GlobalLighting, LayoutError, LayoutRegistry, Light, Registration, StagedWrite,
    UniformLayout, UniformReflection, UploadError,
};
use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
};

/// Binding slots and labels for the shared lighting buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    pub global_binding: u32,
    pub light_binding: u32,
    pub visibility: wgpu::ShaderStages,
    pub label: String,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            global_binding: 0,
            light_binding: 1,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            label: "Phong Lighting".to_string(),
        }
    }
}

impl LightingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(mut self, global: u32, light: u32) -> Self {
        self.global_binding = global;
        self.light_binding = light;
        self
    }

    pub fn with_visibility(mut self, visibility: wgpu::ShaderStages) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// GPU objects created once the layout is known.
struct LightingResources {
    buffer: wgpu::Buffer,
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl LightingResources {
    fn new(device: &Device, layout: &UniformLayout, config: &LightingConfig) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Buffer", config.label)),
            size: layout.total_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = BindGroupLayoutBuilder::new()
            .binding(
                config.global_binding,
                config.visibility,
                binding_types::uniform_sized(layout.global_block_size()),
            )
            .binding(
                config.light_binding,
                config.visibility,
                binding_types::uniform_sized(layout.light_block_size()),
            )
            .create(device, &format!("{} Bind Group Layout", config.label));

        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(layout.global_block_size()),
            }))
            .resource(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: layout.light_block_offset(),
                size: NonZeroU64::new(layout.light_block_size()),
            }))
            .create(device, &format!("{} Bind Group", config.label));

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }
}

/// Owns the shared lighting buffer and keeps it in the registered layout.
///
/// ```no_run
/// # fn demo(device: &wgpu::Device, queue: &wgpu::Queue, program: &edu_phong::shader::ShaderProgram)
/// # -> anyhow::Result<()> {
/// use edu_phong::gfx::lighting::{GlobalLighting, Light, LightingConfig, PhongLighting};
///
/// let mut lighting = PhongLighting::new(LightingConfig::default());
/// lighting.register_program(device, program)?;
/// lighting.upload_global(queue, &GlobalLighting::default())?;
/// lighting.upload_light(queue, &Light::point(cgmath::Vector3::new(0.0, 5.0, 5.0)), 0)?;
/// # Ok(())
/// # }
/// ```
pub struct PhongLighting {
    config: LightingConfig,
    registry: LayoutRegistry,
    resources: Option<LightingResources>,
}

impl PhongLighting {
    pub fn new(config: LightingConfig) -> Self {
        Self {
            config,
            registry: LayoutRegistry::new(),
            resources: None,
        }
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Registers a program before its first use.
    ///
    /// The first successful call discovers the layout and allocates the
    /// buffer; later calls only check the program against that layout.
    pub fn register_program<R: UniformReflection + ?Sized>(
        &mut self,
        device: &Device,
        program: &R,
    ) -> Result<(), LayoutError> {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        if self.registry.register(program, alignment)? == Registration::Discovered {
            if let Some(layout) = self.registry.layout() {
                self.resources = Some(LightingResources::new(device, layout, &self.config));
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> Option<&UniformLayout> {
        self.registry.layout()
    }

    pub fn is_registered(&self) -> bool {
        self.resources.is_some()
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.resources.as_ref().map(|r| &r.buffer)
    }

    pub fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.resources.as_ref().map(|r| &r.bind_group_layout.layout)
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.resources.as_ref().map(|r| &r.bind_group)
    }

    fn submit(&self, queue: &Queue, write: StagedWrite) -> Result<(), UploadError> {
        let resources = self.resources.as_ref().ok_or(UploadError::NotRegistered)?;
        queue.write_buffer(&resources.buffer, write.offset, &write.bytes);
        Ok(())
    }

    pub fn upload_global(&self, queue: &Queue, global: &GlobalLighting) -> Result<(), UploadError> {
        let layout = self.layout().ok_or(UploadError::NotRegistered)?;
        let write = layout.stage_global(global);
        debug!("Uploading global lighting ({} lights)", global.num_lights);
        self.submit(queue, write)
    }

    pub fn upload_light(&self, queue: &Queue, light: &Light, index: usize) -> Result<(), UploadError> {
        let layout = self.layout().ok_or(UploadError::NotRegistered)?;
        let write = layout.stage_light(light, index)?;
        debug!("Uploading light {} at offset {}", index, write.offset);
        self.submit(queue, write)
    }

    /// Uploads `global` only if it passes validation. Returns whether it was sent.
    pub fn upload_global_if_valid(
        &self,
        queue: &Queue,
        global: &GlobalLighting,
    ) -> Result<bool, UploadError> {
        let layout = self.layout().ok_or(UploadError::NotRegistered)?;
        match layout.stage_global_if_valid(global) {
            Some(write) => self.submit(queue, write).map(|()| true),
            None => Ok(false),
        }
    }

    /// Uploads `light` only if it passes validation. Returns whether it was sent.
    pub fn upload_light_if_valid(
        &self,
        queue: &Queue,
        light: &Light,
        index: usize,
    ) -> Result<bool, UploadError> {
        let layout = self.layout().ok_or(UploadError::NotRegistered)?;
        match layout.stage_light_if_valid(light, index)? {
            Some(write) => self.submit(queue, write).map(|()| true),
            None => Ok(false),
        }
    }
}
