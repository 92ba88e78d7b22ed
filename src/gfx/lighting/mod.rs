//! # Phong Lighting
//!
//! Application-side light, global and material records, and the binder that
//! packs them into the uniform blocks declared by the Phong shaders.
//!
//! ## Uniform Blocks
//!
//! Every registered program must declare two uniform blocks with exactly the
//! same members in the same order:
//!
//! - `phGlobal`: global ambient color, light count and feature switches
//! - `phLightArray`: `Lights`, an array of [`MAX_LIGHTS`] light records
//!
//! Their layout is read from the first registered program through
//! [`UniformReflection`]; see [`layout`] for how records are packed.
//!
//! ## Errors
//!
//! [`LayoutError`] is fatal for the program being registered. [`ValidationError`]
//! is advisory: the data should be skipped for this frame.

pub mod binder;
pub mod error;
pub mod layout;
pub mod light;
pub mod material;
pub mod proc_texture;
pub mod reflection;

pub use binder::{LightingConfig, PhongLighting};
pub use error::{LayoutError, UploadError, ValidationError};
pub use layout::{
    FieldKind, FieldValue, GlobalField, LayoutRegistry, LightField, Registration, StagedWrite,
    UniformLayout,
};
pub use light::{GlobalLighting, Light};
pub use material::{Material, MaterialUniform};
pub use proc_texture::{ProcTexture, ProcTextureUniform, TEXTURE_BLOCK};
pub use reflection::{ReflectionTable, UniformReflection};

/// Length of the `Lights` array in `phLightArray`.
pub const MAX_LIGHTS: usize = 8;

/// Name of the global lighting uniform block.
pub const GLOBAL_BLOCK: &str = "phGlobal";

/// Name of the light array uniform block.
pub const LIGHT_BLOCK: &str = "phLightArray";
