//! # Uniform Block Layout
//!
//! The byte layout of `phGlobal` and `phLightArray` is not hard-coded: it is
//! read from a linked program's reflection data once, then every record is
//! packed by writing each field at its discovered offset.
//!
//! Both blocks live in one buffer. The global block starts at 0 and the light
//! block at the global block size rounded up to the device's uniform offset
//! alignment:
//!
//! ```text
//! | phGlobal | pad | Lights[0] | Lights[1] | ... | Lights[MAX_LIGHTS - 1] |
//! 0                ^ light_block_offset
//! ```

use log::{error, info, warn};

use super::{
    GlobalLighting, LayoutError, Light, UniformReflection, UploadError, GLOBAL_BLOCK, LIGHT_BLOCK,
    MAX_LIGHTS,
};

/// 4-byte boolean sentinels, as the shaders read them.
const TRUE_BITS: u32 = 0xFFFF_FFFF;
const FALSE_BITS: u32 = 0;

/// Shader-side type of a block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Vec3,
    Float,
    Uint,
    /// Stored as a 4-byte all-ones or all-zeros word
    Bool,
}

impl FieldKind {
    /// Bytes written for the field.
    pub fn width(self) -> u64 {
        match self {
            FieldKind::Vec3 => 12,
            FieldKind::Float | FieldKind::Uint | FieldKind::Bool => 4,
        }
    }
}

/// A field value ready to be written into a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Vec3([f32; 3]),
    Float(f32),
    Uint(u32),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Vec3(_) => FieldKind::Vec3,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Uint(_) => FieldKind::Uint,
            FieldValue::Bool(_) => FieldKind::Bool,
        }
    }

    fn write(&self, buffer: &mut [u8], offset: u64) {
        let start = offset as usize;
        let end = start + self.kind().width() as usize;
        debug_assert!(end <= buffer.len(), "field write past end of staging buffer");
        let out = &mut buffer[start..end];
        match *self {
            FieldValue::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(&v)),
            FieldValue::Float(f) => out.copy_from_slice(&f.to_ne_bytes()),
            FieldValue::Uint(u) => out.copy_from_slice(&u.to_ne_bytes()),
            FieldValue::Bool(b) => {
                let bits = if b { TRUE_BITS } else { FALSE_BITS };
                out.copy_from_slice(&bits.to_ne_bytes())
            }
        }
    }
}

/// Members of `phGlobal`, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalField {
    GlobalAmbientColor,
    NumLights,
    LocalViewer,
    EnableEmissive,
    EnableDiffuse,
    EnableAmbient,
    EnableSpecular,
    UseHalfwayVector,
}

impl GlobalField {
    pub const ALL: [GlobalField; 8] = [
        GlobalField::GlobalAmbientColor,
        GlobalField::NumLights,
        GlobalField::LocalViewer,
        GlobalField::EnableEmissive,
        GlobalField::EnableDiffuse,
        GlobalField::EnableAmbient,
        GlobalField::EnableSpecular,
        GlobalField::UseHalfwayVector,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GlobalField::GlobalAmbientColor => "GlobalAmbientColor",
            GlobalField::NumLights => "NumLights",
            GlobalField::LocalViewer => "LocalViewer",
            GlobalField::EnableEmissive => "EnableEmissive",
            GlobalField::EnableDiffuse => "EnableDiffuse",
            GlobalField::EnableAmbient => "EnableAmbient",
            GlobalField::EnableSpecular => "EnableSpecular",
            GlobalField::UseHalfwayVector => "UseHalfwayVector",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            GlobalField::GlobalAmbientColor => FieldKind::Vec3,
            GlobalField::NumLights => FieldKind::Uint,
            _ => FieldKind::Bool,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Members of one `phLight`, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightField {
    IsEnabled,
    IsAttenuated,
    IsSpotLight,
    IsDirectional,
    Position,
    AmbientColor,
    DiffuseColor,
    SpecularColor,
    SpotDirection,
    SpotCosCutoff,
    SpotExponent,
    ConstantAttenuation,
    LinearAttenuation,
    QuadraticAttenuation,
}

impl LightField {
    pub const ALL: [LightField; 14] = [
        LightField::IsEnabled,
        LightField::IsAttenuated,
        LightField::IsSpotLight,
        LightField::IsDirectional,
        LightField::Position,
        LightField::AmbientColor,
        LightField::DiffuseColor,
        LightField::SpecularColor,
        LightField::SpotDirection,
        LightField::SpotCosCutoff,
        LightField::SpotExponent,
        LightField::ConstantAttenuation,
        LightField::LinearAttenuation,
        LightField::QuadraticAttenuation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LightField::IsEnabled => "IsEnabled",
            LightField::IsAttenuated => "IsAttenuated",
            LightField::IsSpotLight => "IsSpotLight",
            LightField::IsDirectional => "IsDirectional",
            LightField::Position => "Position",
            LightField::AmbientColor => "AmbientColor",
            LightField::DiffuseColor => "DiffuseColor",
            LightField::SpecularColor => "SpecularColor",
            LightField::SpotDirection => "SpotDirection",
            LightField::SpotCosCutoff => "SpotCosCutoff",
            LightField::SpotExponent => "SpotExponent",
            LightField::ConstantAttenuation => "ConstantAttenuation",
            LightField::LinearAttenuation => "LinearAttenuation",
            LightField::QuadraticAttenuation => "QuadraticAttenuation",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            LightField::IsEnabled
            | LightField::IsAttenuated
            | LightField::IsSpotLight
            | LightField::IsDirectional => FieldKind::Bool,
            LightField::Position
            | LightField::AmbientColor
            | LightField::DiffuseColor
            | LightField::SpecularColor
            | LightField::SpotDirection => FieldKind::Vec3,
            _ => FieldKind::Float,
        }
    }

    /// Member path of this field in light `index`.
    pub fn path(self, index: usize) -> String {
        format!("Lights[{}].{}", index, self.name())
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl GlobalLighting {
    pub fn value(&self, field: GlobalField) -> FieldValue {
        match field {
            GlobalField::GlobalAmbientColor => FieldValue::Vec3(self.global_ambient_color.into()),
            GlobalField::NumLights => FieldValue::Uint(self.num_lights),
            GlobalField::LocalViewer => FieldValue::Bool(self.local_viewer),
            GlobalField::EnableEmissive => FieldValue::Bool(self.enable_emissive),
            GlobalField::EnableDiffuse => FieldValue::Bool(self.enable_diffuse),
            GlobalField::EnableAmbient => FieldValue::Bool(self.enable_ambient),
            GlobalField::EnableSpecular => FieldValue::Bool(self.enable_specular),
            GlobalField::UseHalfwayVector => FieldValue::Bool(self.use_halfway_vector),
        }
    }
}

impl Light {
    pub fn value(&self, field: LightField) -> FieldValue {
        match field {
            LightField::IsEnabled => FieldValue::Bool(self.is_enabled),
            LightField::IsAttenuated => FieldValue::Bool(self.is_attenuated),
            LightField::IsSpotLight => FieldValue::Bool(self.is_spot_light),
            LightField::IsDirectional => FieldValue::Bool(self.is_directional),
            LightField::Position => FieldValue::Vec3(self.pos_or_dir.into()),
            LightField::AmbientColor => FieldValue::Vec3(self.ambient_color.into()),
            LightField::DiffuseColor => FieldValue::Vec3(self.diffuse_color.into()),
            LightField::SpecularColor => FieldValue::Vec3(self.specular_color.into()),
            LightField::SpotDirection => FieldValue::Vec3(self.spot_direction.into()),
            LightField::SpotCosCutoff => FieldValue::Float(self.spot_cos_cutoff),
            LightField::SpotExponent => FieldValue::Float(self.spot_exponent),
            LightField::ConstantAttenuation => FieldValue::Float(self.constant_attenuation),
            LightField::LinearAttenuation => FieldValue::Float(self.linear_attenuation),
            LightField::QuadraticAttenuation => FieldValue::Float(self.quadratic_attenuation),
        }
    }
}

/// Bytes to write into the shared buffer at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWrite {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Rounds `value` up to a multiple of `alignment`; zero alignment means none.
pub fn align_up(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

/// Discovered layout of both lighting blocks. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    global_offsets: [u64; 8],
    /// Relative to the first member of a light
    light_offsets: [u64; 14],
    light_first_offset: u64,
    global_block_size: u64,
    light_block_size: u64,
    light_stride: u64,
    light_block_offset: u64,
}

impl UniformLayout {
    /// Queries `reflection` for every member offset and derives the light
    /// stride from `Lights[1].IsEnabled - Lights[0].IsEnabled`.
    pub fn discover<R: UniformReflection + ?Sized>(
        reflection: &R,
        min_alignment: u64,
    ) -> Result<Self, LayoutError> {
        let global_block_size = reflection
            .block_size(GLOBAL_BLOCK)
            .ok_or(LayoutError::MissingBlock(GLOBAL_BLOCK))?;
        let light_block_size = reflection
            .block_size(LIGHT_BLOCK)
            .ok_or(LayoutError::MissingBlock(LIGHT_BLOCK))?;

        let offset_of = |block: &'static str, member: String| {
            reflection
                .member_offset(block, &member)
                .ok_or(LayoutError::MissingMember { block, member })
        };

        let mut global_offsets = [0; 8];
        for field in GlobalField::ALL {
            let offset = offset_of(GLOBAL_BLOCK, field.name().to_string())?;
            check_fits(field.name().to_string(), offset, field.kind(), global_block_size)?;
            global_offsets[field.index()] = offset;
        }

        let mut absolute = [0; 14];
        for field in LightField::ALL {
            absolute[field.index()] = offset_of(LIGHT_BLOCK, field.path(0))?;
        }
        let first = absolute[LightField::IsEnabled.index()];
        let second = offset_of(LIGHT_BLOCK, LightField::IsEnabled.path(1))?;

        let stride = second as i64 - first as i64;
        if stride <= 0 || (MAX_LIGHTS as i64) * stride != light_block_size as i64 {
            return Err(LayoutError::StrideMismatch {
                stride,
                max_lights: MAX_LIGHTS as u32,
                block_size: light_block_size,
            });
        }
        let light_stride = stride as u64;
        if first + light_stride * MAX_LIGHTS as u64 > light_block_size {
            return Err(LayoutError::FieldOutOfBounds {
                member: LightField::IsEnabled.path(MAX_LIGHTS - 1),
                offset: first + light_stride * (MAX_LIGHTS as u64 - 1),
                width: light_stride,
                limit: light_block_size,
            });
        }

        let mut light_offsets = [0; 14];
        for field in LightField::ALL {
            let offset = absolute[field.index()];
            let relative = offset.checked_sub(first).ok_or(LayoutError::FieldOutOfBounds {
                member: field.path(0),
                offset,
                width: field.kind().width(),
                limit: light_stride,
            })?;
            check_fits(field.path(0), relative, field.kind(), light_stride)?;
            light_offsets[field.index()] = relative;
        }

        Ok(Self {
            global_offsets,
            light_offsets,
            light_first_offset: first,
            global_block_size,
            light_block_size,
            light_stride,
            light_block_offset: align_up(global_block_size, min_alignment),
        })
    }

    pub fn global_offset(&self, field: GlobalField) -> u64 {
        self.global_offsets[field.index()]
    }

    /// Offset of `field` from the start of a light record.
    pub fn light_offset(&self, field: LightField) -> u64 {
        self.light_offsets[field.index()]
    }

    pub fn global_block_size(&self) -> u64 {
        self.global_block_size
    }

    pub fn light_block_size(&self) -> u64 {
        self.light_block_size
    }

    pub fn light_stride(&self) -> u64 {
        self.light_stride
    }

    /// Where the light block starts inside the shared buffer.
    pub fn light_block_offset(&self) -> u64 {
        self.light_block_offset
    }

    /// Bytes needed to hold both blocks.
    pub fn total_size(&self) -> u64 {
        self.light_block_offset + self.light_block_size
    }

    /// Packs the global record into a block-sized write at offset 0.
    pub fn stage_global(&self, global: &GlobalLighting) -> StagedWrite {
        let mut bytes = vec![0; self.global_block_size as usize];
        for field in GlobalField::ALL {
            global
                .value(field)
                .write(&mut bytes, self.global_offset(field));
        }
        StagedWrite { offset: 0, bytes }
    }

    /// Packs light `index` into a stride-sized write at its slot in the light block.
    pub fn stage_light(&self, light: &Light, index: usize) -> Result<StagedWrite, UploadError> {
        if index >= MAX_LIGHTS {
            return Err(UploadError::LightIndexOutOfRange {
                index,
                max: MAX_LIGHTS,
            });
        }
        let mut bytes = vec![0; self.light_stride as usize];
        for field in LightField::ALL {
            light.value(field).write(&mut bytes, self.light_offset(field));
        }
        Ok(StagedWrite {
            offset: self.light_block_offset
                + self.light_first_offset
                + index as u64 * self.light_stride,
            bytes,
        })
    }

    /// Like [`stage_global`](Self::stage_global), but yields no write when
    /// `global` fails validation.
    pub fn stage_global_if_valid(&self, global: &GlobalLighting) -> Option<StagedWrite> {
        if let Err(e) = global.check_correctness() {
            warn!("Skipping global lighting upload: {}", e);
            return None;
        }
        Some(self.stage_global(global))
    }

    /// Like [`stage_light`](Self::stage_light), but yields no write when
    /// `light` fails validation. A bad index is still an error.
    pub fn stage_light_if_valid(
        &self,
        light: &Light,
        index: usize,
    ) -> Result<Option<StagedWrite>, UploadError> {
        if index >= MAX_LIGHTS {
            return Err(UploadError::LightIndexOutOfRange {
                index,
                max: MAX_LIGHTS,
            });
        }
        if let Err(e) = light.check_correctness() {
            warn!("Skipping upload of light {}: {}", index, e);
            return Ok(None);
        }
        self.stage_light(light, index).map(Some)
    }
}

fn check_fits(member: String, offset: u64, kind: FieldKind, limit: u64) -> Result<(), LayoutError> {
    if offset + kind.width() > limit {
        return Err(LayoutError::FieldOutOfBounds {
            member,
            offset,
            width: kind.width(),
            limit,
        });
    }
    Ok(())
}

/// Outcome of [`LayoutRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First program: the layout was discovered from it
    Discovered,
    /// Later program: block sizes matched the existing layout
    Reused,
}

/// Holds the layout discovered from the first registered program.
///
/// Later programs are assumed to declare the blocks identically; only their
/// block sizes are compared.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layout: Option<UniformLayout>,
    programs: usize,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R: UniformReflection + ?Sized>(
        &mut self,
        reflection: &R,
        min_alignment: u64,
    ) -> Result<Registration, LayoutError> {
        let result = self.try_register(reflection, min_alignment);
        match &result {
            Ok(_) => self.programs += 1,
            Err(e) => error!("Shader program registration failed: {}", e),
        }
        result
    }

    fn try_register<R: UniformReflection + ?Sized>(
        &mut self,
        reflection: &R,
        min_alignment: u64,
    ) -> Result<Registration, LayoutError> {
        let global_size = reflection
            .block_size(GLOBAL_BLOCK)
            .ok_or(LayoutError::MissingBlock(GLOBAL_BLOCK))?;
        let light_size = reflection
            .block_size(LIGHT_BLOCK)
            .ok_or(LayoutError::MissingBlock(LIGHT_BLOCK))?;

        if let Some(layout) = &self.layout {
            if global_size != layout.global_block_size() {
                return Err(LayoutError::LayoutMismatch {
                    block: GLOBAL_BLOCK,
                    expected: layout.global_block_size(),
                    actual: global_size,
                });
            }
            if light_size != layout.light_block_size() {
                return Err(LayoutError::LayoutMismatch {
                    block: LIGHT_BLOCK,
                    expected: layout.light_block_size(),
                    actual: light_size,
                });
            }
            return Ok(Registration::Reused);
        }

        let layout = UniformLayout::discover(reflection, min_alignment)?;
        info!(
            "Discovered lighting layout: global block {} bytes, {} lights x {} bytes at offset {}",
            layout.global_block_size(),
            MAX_LIGHTS,
            layout.light_stride(),
            layout.light_block_offset()
        );
        self.layout = Some(layout);
        Ok(Registration::Discovered)
    }

    pub fn layout(&self) -> Option<&UniformLayout> {
        self.layout.as_ref()
    }

    pub fn is_discovered(&self) -> bool {
        self.layout.is_some()
    }

    /// Number of programs registered successfully.
    pub fn program_count(&self) -> usize {
        self.programs
    }
}
