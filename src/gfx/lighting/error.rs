use thiserror::Error;

/// Fatal problems found while registering a shader program.
///
/// A program that fails registration must not be used for rendering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("required uniform block '{0}' is missing from the program")]
    MissingBlock(&'static str),
    #[error("uniform block '{block}' has no member '{member}'")]
    MissingMember { block: &'static str, member: String },
    #[error(
        "light stride {stride} times {max_lights} lights does not match light block size {block_size}; \
         the shader's light struct likely differs from the expected layout"
    )]
    StrideMismatch {
        stride: i64,
        max_lights: u32,
        block_size: u64,
    },
    #[error("member '{member}' at offset {offset} with width {width} overruns {limit} bytes")]
    FieldOutOfBounds {
        member: String,
        offset: u64,
        width: u64,
        limit: u64,
    },
    #[error("block '{block}' is {actual} bytes but the registered layout expects {expected}")]
    LayoutMismatch {
        block: &'static str,
        expected: u64,
        actual: u64,
    },
}

/// Errors from uploading lighting records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("no shader program has been registered yet")]
    NotRegistered,
    #[error("light index {index} is outside 0..{max}")]
    LightIndexOutOfRange { index: usize, max: usize },
}

/// Advisory checks on light and global records.
///
/// Data failing these checks should not be sent to the shader this frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("directional light needs a direction in its position field")]
    DirectionalWithoutDirection,
    #[error("a spot light cannot also be directional")]
    SpotAndDirectional,
    #[error("spot direction must be unit length (squared norm {squared_norm})")]
    SpotDirectionNotUnit { squared_norm: f32 },
    #[error("{count} lights requested but at most {max} are supported")]
    TooManyLights { count: u32, max: u32 },
}
