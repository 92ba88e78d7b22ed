//! # Edu Phong Prelude
//!
//! ```rust
//! use edu_phong::prelude::*;
//!
//! let sphere = Sphere::new(16, 8);
//! assert_eq!(sphere.slices(), 16);
//! ```

// Geometry
pub use crate::gfx::geometry::{
    Cylinder, CylinderResolution, DrawMesh, GpuMesh, MeshBuffers, MeshGenerator, Sphere,
    SphereResolution, Tessellation, VertexLayout,
};
pub use crate::gfx::PhongVertex;

// Lighting
pub use crate::gfx::lighting::{
    GlobalLighting, Light, LightingConfig, Material, PhongLighting, ProcTexture,
    UniformReflection,
};

// Shaders
pub use crate::shader::{ShaderKind, ShaderLibrary, ShaderProgram};

// Common external types
pub use cgmath::{InnerSpace, Vector3};
