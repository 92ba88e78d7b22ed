//! Edu Phong
//!
//! Phong lighting teaching aid built on wgpu: procedural sphere and cylinder
//! meshes, a shader block library, and a binder that packs lights into the
//! uniform layout the shaders declare.

pub mod gfx;
pub mod prelude;
pub mod shader;
pub mod wgpu_utils;
