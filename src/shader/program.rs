use std::collections::HashSet;

use log::info;

use super::{ComposedShader, ShaderError, ShaderKind};
use crate::gfx::lighting::reflection::parse_member_path;
use crate::gfx::lighting::UniformReflection;

/// Stage shaders linked into one validated WGSL module.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    source: String,
    module: naga::Module,
    entry_points: Vec<(ShaderKind, String)>,
}

impl ShaderProgram {
    /// Links stage shaders into a program.
    ///
    /// Each stage may appear once. Code blocks shared by several shaders are
    /// included only once, at their first appearance.
    pub fn link(label: &str, shaders: &[ComposedShader]) -> Result<Self, ShaderError> {
        if shaders.is_empty() {
            return Err(ShaderError::EmptyProgram(label.to_string()));
        }

        let mut stages = Vec::new();
        for shader in shaders {
            if shader.stage.naga_stage().is_none() {
                return Err(ShaderError::UnsupportedStage(shader.stage));
            }
            if stages.contains(&shader.stage) {
                return Err(ShaderError::DuplicateStage {
                    program: label.to_string(),
                    stage: shader.stage,
                });
            }
            stages.push(shader.stage);
        }

        let mut included = HashSet::new();
        let mut source = String::new();
        for block in shaders.iter().flat_map(|shader| &shader.blocks) {
            if included.insert(block.name.as_str()) {
                source.push_str(&format!("// {} {}\n", block.kind, block.name));
                source.push_str(&block.source);
            }
        }

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| ShaderError::Parse {
            program: label.to_string(),
            message: e.emit_to_string(&source),
        })?;
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| ShaderError::Validation {
            program: label.to_string(),
            message: e.to_string(),
        })?;

        let mut entry_points = Vec::with_capacity(stages.len());
        for stage in stages {
            let entry = module
                .entry_points
                .iter()
                .find(|ep| Some(ep.stage) == stage.naga_stage())
                .ok_or_else(|| ShaderError::MissingEntryPoint {
                    program: label.to_string(),
                    stage,
                })?;
            entry_points.push((stage, entry.name.clone()));
        }

        info!(
            "Linked shader program '{}' ({} bytes of WGSL)",
            label,
            source.len()
        );
        Ok(Self {
            label: label.to_string(),
            source,
            module,
            entry_points,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The linked WGSL source.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    /// Entry point name for `stage`, if the program has that stage.
    pub fn entry_point(&self, stage: ShaderKind) -> Option<&str> {
        self.entry_points
            .iter()
            .find(|(kind, _)| *kind == stage)
            .map(|(_, name)| name.as_str())
    }

    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        })
    }

    fn uniform_block(&self, block: &str) -> Option<&naga::GlobalVariable> {
        self.module
            .global_variables
            .iter()
            .map(|(_, var)| var)
            .find(|var| {
                var.space == naga::AddressSpace::Uniform && var.name.as_deref() == Some(block)
            })
    }

    /// `(group, binding)` of a uniform block.
    pub fn uniform_binding(&self, block: &str) -> Option<(u32, u32)> {
        let binding = self.uniform_block(block)?.binding.as_ref()?;
        Some((binding.group, binding.binding))
    }
}

impl UniformReflection for ShaderProgram {
    fn block_size(&self, block: &str) -> Option<u64> {
        let var = self.uniform_block(block)?;
        Some(self.module.types[var.ty].inner.size(self.module.to_ctx()) as u64)
    }

    fn member_offset(&self, block: &str, path: &str) -> Option<u64> {
        let var = self.uniform_block(block)?;
        let mut ty = var.ty;
        let mut offset = 0u64;
        for segment in parse_member_path(path)? {
            let naga::TypeInner::Struct { members, .. } = &self.module.types[ty].inner else {
                return None;
            };
            let member = members
                .iter()
                .find(|m| m.name.as_deref() == Some(segment.name))?;
            offset += member.offset as u64;
            ty = member.ty;

            if let Some(index) = segment.index {
                let naga::TypeInner::Array { base, size, stride } = &self.module.types[ty].inner
                else {
                    return None;
                };
                if let naga::ArraySize::Constant(len) = size {
                    if index >= len.get() {
                        return None;
                    }
                }
                offset += index as u64 * *stride as u64;
                ty = *base;
            }
        }
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::lighting::{UniformLayout, GLOBAL_BLOCK, LIGHT_BLOCK, MAX_LIGHTS};
    use crate::gfx::lighting::{GlobalField, LightField, MaterialUniform};
    use crate::gfx::lighting::{LayoutRegistry, Registration};
    use crate::gfx::lighting::{ProcTextureUniform, TEXTURE_BLOCK};
    use crate::shader::ShaderLibrary;

    const PHONG_SOURCE: &str = include_str!("../../shaders/edu_phong.wgsl");

    fn library() -> ShaderLibrary {
        let mut library = ShaderLibrary::new();
        library.load_str(PHONG_SOURCE).unwrap();
        library
    }

    fn phong_program(library: &ShaderLibrary) -> ShaderProgram {
        let vertex = library
            .compose(&["vertexShader_PhongPhong", "phongDeclarations"])
            .unwrap();
        let fragment = library
            .compose(&["fragmentShader_PhongPhong", "phongDeclarations", "calcPhongLighting"])
            .unwrap();
        ShaderProgram::link("Phong Phong", &[vertex, fragment]).unwrap()
    }

    fn gouraud_program(library: &ShaderLibrary) -> ShaderProgram {
        let vertex = library
            .compose(&["vertexShader_PhongGouraud", "phongDeclarations", "calcPhongLighting"])
            .unwrap();
        let fragment = library.compose(&["fragmentShader_PhongGouraud"]).unwrap();
        ShaderProgram::link("Phong Gouraud", &[vertex, fragment]).unwrap()
    }

    fn textured_program(library: &ShaderLibrary) -> ShaderProgram {
        let vertex = library
            .compose(&["vertexShader_PhongPhong", "phongDeclarations"])
            .unwrap();
        let fragment = library
            .compose(&[
                "fragmentShader_PhongTextured",
                "phongDeclarations",
                "calcPhongLighting",
                "procTexture",
            ])
            .unwrap();
        ShaderProgram::link("Phong Textured", &[vertex, fragment]).unwrap()
    }

    #[test]
    fn test_link_bundled_programs() {
        let library = library();
        let phong = phong_program(&library);
        assert_eq!(phong.entry_point(ShaderKind::Vertex), Some("vs_phong_phong"));
        assert_eq!(phong.entry_point(ShaderKind::Fragment), Some("fs_phong_phong"));
        // Shared declarations are included once.
        assert_eq!(phong.source().matches("struct PhLight {").count(), 1);

        let gouraud = gouraud_program(&library);
        assert_eq!(gouraud.entry_point(ShaderKind::Vertex), Some("vs_phong_gouraud"));
        assert_eq!(gouraud.uniform_binding(GLOBAL_BLOCK), Some((0, 0)));
        assert_eq!(gouraud.uniform_binding(LIGHT_BLOCK), Some((0, 1)));
    }

    #[test]
    fn test_reflection_of_bundled_blocks() {
        let program = phong_program(&library());
        assert_eq!(program.block_size(GLOBAL_BLOCK), Some(48));
        assert_eq!(program.block_size(LIGHT_BLOCK), Some(112 * MAX_LIGHTS as u64));
        assert_eq!(program.member_offset(GLOBAL_BLOCK, "NumLights"), Some(12));
        assert_eq!(program.member_offset(LIGHT_BLOCK, "Lights[0].Position"), Some(16));
        assert_eq!(program.member_offset(LIGHT_BLOCK, "Lights[1].IsEnabled"), Some(112));
        assert_eq!(
            program.member_offset(LIGHT_BLOCK, "Lights[2].SpotCosCutoff"),
            Some(2 * 112 + 92)
        );
        assert_eq!(program.member_offset(LIGHT_BLOCK, "Lights[8].IsEnabled"), None);
        assert_eq!(program.member_offset(LIGHT_BLOCK, "Lights[0].Missing"), None);
        assert_eq!(program.block_size("phTransforms"), Some(128));
        assert_eq!(program.block_size("notABlock"), None);
    }

    #[test]
    fn test_layout_discovered_from_program() {
        let program = gouraud_program(&library());
        let layout = UniformLayout::discover(&program, 256).unwrap();
        assert_eq!(layout.light_stride(), 112);
        assert_eq!(layout.global_offset(GlobalField::UseHalfwayVector), 36);
        assert_eq!(layout.light_offset(LightField::QuadraticAttenuation), 108);
        assert_eq!(layout.light_block_offset(), 256);
    }

    #[test]
    fn test_link_rejects_bad_stage_sets() {
        let library = library();
        let vertex = library
            .compose(&["vertexShader_PhongPhong", "phongDeclarations"])
            .unwrap();
        assert!(matches!(
            ShaderProgram::link("twice", &[vertex.clone(), vertex]),
            Err(ShaderError::DuplicateStage { stage: ShaderKind::Vertex, .. })
        ));

        let mut library = ShaderLibrary::new();
        library
            .add_block(ShaderKind::Geometry, "gs", "fn g() {}\n")
            .unwrap();
        let geometry = library.compose(&["gs"]).unwrap();
        assert!(matches!(
            ShaderProgram::link("geometry", &[geometry]),
            Err(ShaderError::UnsupportedStage(ShaderKind::Geometry))
        ));
        assert!(matches!(
            ShaderProgram::link("empty", &[]),
            Err(ShaderError::EmptyProgram(_))
        ));
    }

    #[test]
    fn test_link_reports_parse_and_entry_point_errors() {
        let mut library = ShaderLibrary::new();
        library
            .add_block(ShaderKind::Vertex, "broken", "fn oops( {\n")
            .unwrap();
        library
            .add_block(ShaderKind::Fragment, "no_entry", "fn helper() -> f32 { return 1.0; }\n")
            .unwrap();

        let broken = library.compose(&["broken"]).unwrap();
        assert!(matches!(
            ShaderProgram::link("broken", &[broken]),
            Err(ShaderError::Parse { .. })
        ));

        let no_entry = library.compose(&["no_entry"]).unwrap();
        assert!(matches!(
            ShaderProgram::link("no entry", &[no_entry]),
            Err(ShaderError::MissingEntryPoint { stage: ShaderKind::Fragment, .. })
        ));
    }

    #[test]
    fn test_textured_program_links_and_reflects() {
        let program = textured_program(&library());
        assert_eq!(program.entry_point(ShaderKind::Vertex), Some("vs_phong_phong"));
        assert_eq!(program.entry_point(ShaderKind::Fragment), Some("fs_phong_textured"));
        assert_eq!(program.uniform_binding(TEXTURE_BLOCK), Some((3, 0)));

        let size = std::mem::size_of::<ProcTextureUniform>() as u64;
        assert_eq!(program.block_size(TEXTURE_BLOCK), Some(size));
        assert_eq!(program.member_offset(TEXTURE_BLOCK, "ApplyTexture"), Some(0));
        assert_eq!(program.member_offset(TEXTURE_BLOCK, "TextureTime"), Some(4));
        assert_eq!(program.member_offset(TEXTURE_BLOCK, "Scale"), Some(8));

        // The lighting blocks are unchanged, so the program registers like the others.
        let mut registry = LayoutRegistry::new();
        registry.register(&phong_program(&library()), 256).unwrap();
        assert_eq!(registry.register(&program, 256), Ok(Registration::Reused));
        assert_eq!(UniformLayout::discover(&program, 256).unwrap().light_stride(), 112);
        assert_eq!(
            program.block_size("phMaterial"),
            Some(std::mem::size_of::<MaterialUniform>() as u64)
        );

        // The untextured programs never declare the block.
        assert_eq!(phong_program(&library()).block_size(TEXTURE_BLOCK), None);
    }
}
