//! # Graphics Module
//!
//! - **Geometry** ([`geometry`]) - Sphere and cylinder tessellation, GPU meshes
//!   and partial views into their index buffers
//! - **Lighting** ([`lighting`]) - Lights, materials and the uniform layout binder
//!
//! Meshes use the interleaved [`PhongVertex`] layout by default.

pub mod geometry;
pub mod lighting;
pub mod vertex;

pub use vertex::PhongVertex;
