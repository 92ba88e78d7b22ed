//! Phong material properties and their GPU uniform.

use cgmath::Vector3;
use wgpu::Device;

use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

/// GPU layout of `PhMaterial` in the bundled shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub emissive_color: [f32; 3],
    pub specular_exponent: f32,
    pub ambient_color: [f32; 3],
    /// 1.0 or 0.0
    pub use_fresnel: f32,
    pub diffuse_color: [f32; 3],
    _padding0: f32,
    pub specular_color: [f32; 3],
    _padding1: f32,
}

type MaterialUbo = UniformBuffer<MaterialUniform>;

/// Bind group layout and bind group for one material buffer.
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl MaterialBindings {
    pub fn new(device: &Device, ubo: &MaterialUbo) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Phong Material Bind Group Layout");
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Phong Material Bind Group");
        Self {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Surface response to Phong lighting.
pub struct Material {
    pub name: String,
    pub emissive_color: Vector3<f32>,
    pub ambient_color: Vector3<f32>,
    pub diffuse_color: Vector3<f32>,
    pub specular_color: Vector3<f32>,
    pub specular_exponent: f32,
    /// Scale specular highlights with Schlick's Fresnel approximation
    pub use_fresnel: bool,

    material_ubo: Option<MaterialUbo>,
    material_bindings: Option<MaterialBindings>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("Default")
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            emissive_color: Vector3::new(0.0, 0.0, 0.0),
            ambient_color: Vector3::new(0.2, 0.2, 0.2),
            diffuse_color: Vector3::new(0.8, 0.8, 0.8),
            specular_color: Vector3::new(0.5, 0.5, 0.5),
            specular_exponent: 20.0,
            use_fresnel: false,
            material_ubo: None,
            material_bindings: None,
        }
    }

    /// Sets ambient and diffuse to the same color.
    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.ambient_color = Vector3::new(r, g, b);
        self.diffuse_color = Vector3::new(r, g, b);
        self
    }

    pub fn with_emission(mut self, r: f32, g: f32, b: f32) -> Self {
        self.emissive_color = Vector3::new(r, g, b);
        self
    }

    pub fn with_specular(mut self, r: f32, g: f32, b: f32, exponent: f32) -> Self {
        self.specular_color = Vector3::new(r, g, b);
        self.specular_exponent = exponent.max(0.0);
        self
    }

    pub fn with_fresnel(mut self, enabled: bool) -> Self {
        self.use_fresnel = enabled;
        self
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            emissive_color: self.emissive_color.into(),
            specular_exponent: self.specular_exponent,
            ambient_color: self.ambient_color.into(),
            use_fresnel: if self.use_fresnel { 1.0 } else { 0.0 },
            diffuse_color: self.diffuse_color.into(),
            _padding0: 0.0,
            specular_color: self.specular_color.into(),
            _padding1: 0.0,
        }
    }

    /// Creates the GPU buffer on first call and uploads the current values.
    ///
    /// Must be called after material properties change to sync with GPU.
    pub fn update_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        let uniform = self.uniform();
        let ubo = self
            .material_ubo
            .get_or_insert_with(|| MaterialUbo::new_with_data(device, &uniform));
        if self.material_bindings.is_none() {
            self.material_bindings = Some(MaterialBindings::new(device, ubo));
        }
        ubo.update_content(queue, uniform);
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.material_bindings.as_ref().map(|b| b.bind_group())
    }

    pub fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.material_bindings.as_ref().map(|b| b.bind_group_layout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_64_bytes() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn test_uniform_packing() {
        let material = Material::new("Brass")
            .with_color(0.33, 0.22, 0.03)
            .with_specular(0.99, 0.94, 0.81, 28.0)
            .with_fresnel(true);
        let uniform = material.uniform();
        assert_eq!(uniform.ambient_color, [0.33, 0.22, 0.03]);
        assert_eq!(uniform.specular_exponent, 28.0);
        assert_eq!(uniform.use_fresnel, 1.0);

        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        assert_eq!(floats[3], 28.0);
        assert_eq!(&floats[12..15], &[0.99, 0.94, 0.81]);
    }

    #[test]
    fn test_material_has_no_gpu_resources_until_updated() {
        let material = Material::default().with_emission(1.0, 0.0, 0.0);
        assert!(material.bind_group().is_none());
        assert_eq!(material.uniform().emissive_color, [1.0, 0.0, 0.0]);
    }
}
