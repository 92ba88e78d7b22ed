//! Application-side lighting records.
//!
//! Plain values; packing them into the shader's layout is done by
//! [`UniformLayout`](super::UniformLayout).

use cgmath::{InnerSpace, Vector3};

use super::{ValidationError, MAX_LIGHTS};

/// One light of the `phLightArray` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub is_enabled: bool,
    pub is_attenuated: bool,
    pub is_spot_light: bool,
    pub is_directional: bool,
    /// Position, or the direction towards the light when directional
    pub pos_or_dir: Vector3<f32>,
    pub ambient_color: Vector3<f32>,
    pub diffuse_color: Vector3<f32>,
    pub specular_color: Vector3<f32>,
    /// Unit direction the spot light points in
    pub spot_direction: Vector3<f32>,
    pub spot_cos_cutoff: f32,
    pub spot_exponent: f32,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            is_enabled: false,
            is_attenuated: false,
            is_spot_light: false,
            is_directional: false,
            pos_or_dir: Vector3::new(0.0, 0.0, 1.0),
            ambient_color: Vector3::new(0.0, 0.0, 0.0),
            diffuse_color: Vector3::new(1.0, 1.0, 1.0),
            specular_color: Vector3::new(1.0, 1.0, 1.0),
            spot_direction: Vector3::new(0.0, 0.0, -1.0),
            spot_cos_cutoff: 0.95,
            spot_exponent: 1.0,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
        }
    }
}

impl Light {
    /// An enabled point light at `position`.
    pub fn point(position: Vector3<f32>) -> Self {
        Self {
            is_enabled: true,
            pos_or_dir: position,
            ..Default::default()
        }
    }

    /// An enabled directional light shining from `towards_light`.
    pub fn directional(towards_light: Vector3<f32>) -> Self {
        Self {
            is_enabled: true,
            is_directional: true,
            pos_or_dir: towards_light,
            ..Default::default()
        }
    }

    /// An enabled spot light; `direction` is normalized.
    pub fn spot(position: Vector3<f32>, direction: Vector3<f32>, cos_cutoff: f32) -> Self {
        Self {
            is_enabled: true,
            is_spot_light: true,
            pos_or_dir: position,
            spot_direction: direction.normalize(),
            spot_cos_cutoff: cos_cutoff,
            ..Default::default()
        }
    }

    pub fn with_colors(
        mut self,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
    ) -> Self {
        self.ambient_color = ambient;
        self.diffuse_color = diffuse;
        self.specular_color = specular;
        self
    }

    /// Enables distance attenuation with the given coefficients.
    pub fn with_attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.is_attenuated = true;
        self.constant_attenuation = constant;
        self.linear_attenuation = linear;
        self.quadratic_attenuation = quadratic;
        self
    }

    pub fn with_spot_exponent(mut self, exponent: f32) -> Self {
        self.spot_exponent = exponent;
        self
    }

    pub fn check_correctness(&self) -> Result<(), ValidationError> {
        if self.is_directional && self.pos_or_dir.magnitude2() < 1e-6 {
            return Err(ValidationError::DirectionalWithoutDirection);
        }
        if self.is_spot_light {
            if self.is_directional {
                return Err(ValidationError::SpotAndDirectional);
            }
            let squared_norm = self.spot_direction.magnitude2();
            if !(0.999..=1.001).contains(&squared_norm) {
                return Err(ValidationError::SpotDirectionNotUnit { squared_norm });
            }
        }
        Ok(())
    }
}

/// Contents of the `phGlobal` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalLighting {
    pub global_ambient_color: Vector3<f32>,
    pub num_lights: u32,
    /// Use the true eye direction instead of assuming a viewer at infinity
    pub local_viewer: bool,
    pub enable_emissive: bool,
    pub enable_diffuse: bool,
    pub enable_ambient: bool,
    pub enable_specular: bool,
    /// Blinn-Phong halfway vector instead of the reflection vector
    pub use_halfway_vector: bool,
}

impl Default for GlobalLighting {
    fn default() -> Self {
        Self {
            global_ambient_color: Vector3::new(0.2, 0.2, 0.2),
            num_lights: 1,
            local_viewer: true,
            enable_emissive: true,
            enable_diffuse: true,
            enable_ambient: true,
            enable_specular: true,
            use_halfway_vector: false,
        }
    }
}

impl GlobalLighting {
    pub fn with_num_lights(mut self, num_lights: u32) -> Self {
        self.num_lights = num_lights;
        self
    }

    pub fn with_ambient(mut self, color: Vector3<f32>) -> Self {
        self.global_ambient_color = color;
        self
    }

    pub fn with_halfway_vector(mut self, enabled: bool) -> Self {
        self.use_halfway_vector = enabled;
        self
    }

    pub fn check_correctness(&self) -> Result<(), ValidationError> {
        if self.num_lights as usize > MAX_LIGHTS {
            return Err(ValidationError::TooManyLights {
                count: self.num_lights,
                max: MAX_LIGHTS as u32,
            });
        }
        Ok(())
    }
}
