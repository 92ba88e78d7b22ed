//! # Shader Source Library
//!
//! Shader source files hold any number of named blocks:
//!
//! ```text
//! #beginwgsl vertexshader vertexShader_PhongPhong
//! ...WGSL...
//! #endwgsl
//! ```
//!
//! `#beginglsl` / `#endglsl` are accepted as the same markers. Lines outside a
//! block are ignored, so files can carry free-form notes between blocks.
//!
//! A shader for one stage is composed from exactly one stage block plus any
//! number of `codeblock`s ([`ShaderLibrary::compose`]); stage shaders are then
//! linked into a validated [`ShaderProgram`] that exposes uniform block
//! reflection for the lighting binder.

pub mod library;
pub mod program;

pub use library::{ComposedShader, ShaderBlock, ShaderLibrary};
pub use program::ShaderProgram;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Kind of a source block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Geometry,
    /// A fragment of a larger shader; carries no entry point of its own
    CodeBlock,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [
        ShaderKind::Vertex,
        ShaderKind::Fragment,
        ShaderKind::Geometry,
        ShaderKind::CodeBlock,
    ];

    /// Name used in block headers.
    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertexshader",
            ShaderKind::Fragment => "fragmentshader",
            ShaderKind::Geometry => "geometryshader",
            ShaderKind::CodeBlock => "codeblock",
        }
    }

    /// Parses a header kind, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    pub fn is_stage(self) -> bool {
        self != ShaderKind::CodeBlock
    }

    /// Pipeline stage in naga terms; `None` for stages wgpu cannot run.
    pub fn naga_stage(self) -> Option<naga::ShaderStage> {
        match self {
            ShaderKind::Vertex => Some(naga::ShaderStage::Vertex),
            ShaderKind::Fragment => Some(naga::ShaderStage::Fragment),
            ShaderKind::Geometry | ShaderKind::CodeBlock => None,
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from loading, composing and linking shader sources.
///
/// Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: block begins while block '{open}' is still open")]
    NestedBegin { line: usize, open: String },
    #[error("line {line}: end marker without a matching begin")]
    UnexpectedEnd { line: usize },
    #[error("line {line}: end of file inside block '{open}'")]
    UnterminatedBlock { line: usize, open: String },
    #[error("line {line}: begin marker needs a kind and a name")]
    MalformedHeader { line: usize },
    #[error("line {line}: unknown shader kind '{kind}'")]
    UnknownKind { line: usize, kind: String },
    #[error("duplicate shader block name '{name}'{}", at_line(.line))]
    DuplicateName { name: String, line: Option<usize> },
    #[error("source contains no shader blocks")]
    NoBlocks,
    #[error("no shader block named '{0}'")]
    UnknownBlock(String),
    #[error("shader needs exactly one stage block, found {found:?}")]
    StageCount { found: Vec<String> },
    #[error("program '{program}' has more than one {stage}")]
    DuplicateStage { program: String, stage: ShaderKind },
    #[error("{0} is not supported by wgpu")]
    UnsupportedStage(ShaderKind),
    #[error("program '{0}' has no shaders")]
    EmptyProgram(String),
    #[error("program '{program}' has no {stage} entry point")]
    MissingEntryPoint { program: String, stage: ShaderKind },
    #[error("failed to parse program '{program}':\n{message}")]
    Parse { program: String, message: String },
    #[error("program '{program}' failed validation: {message}")]
    Validation { program: String, message: String },
}

fn at_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" on line {}", line),
        None => String::new(),
    }
}
