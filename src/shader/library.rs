use std::collections::HashMap;
use std::path::Path;

use log::{debug, error};

use super::{ShaderError, ShaderKind};

const BEGIN_MARKERS: [&str; 2] = ["#beginwgsl", "#beginglsl"];
const END_MARKERS: [&str; 2] = ["#endwgsl", "#endglsl"];

/// One named block of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlock {
    pub kind: ShaderKind,
    pub name: String,
    /// Block body, each line terminated by `\n`
    pub source: String,
}

/// A single-stage shader assembled from library blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedShader {
    pub stage: ShaderKind,
    /// Blocks in composition order, the stage block among them
    pub blocks: Vec<ShaderBlock>,
}

impl ComposedShader {
    /// Name of the block that gives this shader its stage.
    pub fn name(&self) -> &str {
        self.blocks
            .iter()
            .find(|block| block.kind.is_stage())
            .map_or("", |block| block.name.as_str())
    }

    /// All block bodies concatenated in order.
    pub fn source(&self) -> String {
        self.blocks.iter().map(|block| block.source.as_str()).collect()
    }
}

/// Named shader blocks loaded from one or more source files.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    blocks: Vec<ShaderBlock>,
    by_name: HashMap<String, usize>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every block in `path`. Returns the number of blocks added.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ShaderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&source).inspect_err(|e| {
            error!("Failed to load shader source {}: {}", path.display(), e);
        })
    }

    /// Parses `source` and adds its blocks. Nothing is added if any line is
    /// malformed or any name is already taken.
    pub fn load_str(&mut self, source: &str) -> Result<usize, ShaderError> {
        let parsed = parse_blocks(source)?;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (line, block) in &parsed {
            if self.by_name.contains_key(&block.name)
                || seen.insert(block.name.as_str(), *line).is_some()
            {
                return Err(ShaderError::DuplicateName {
                    name: block.name.clone(),
                    line: Some(*line),
                });
            }
        }
        let count = parsed.len();
        for (_, block) in parsed {
            self.insert(block);
        }
        debug!("Loaded {} shader blocks", count);
        Ok(count)
    }

    /// Adds a single block given directly as a string.
    pub fn add_block(
        &mut self,
        kind: ShaderKind,
        name: &str,
        source: &str,
    ) -> Result<(), ShaderError> {
        if self.by_name.contains_key(name) {
            return Err(ShaderError::DuplicateName {
                name: name.to_string(),
                line: None,
            });
        }
        self.insert(ShaderBlock {
            kind,
            name: name.to_string(),
            source: source.to_string(),
        });
        Ok(())
    }

    /// Adds the whole of `path` as a single block.
    pub fn add_block_file(
        &mut self,
        kind: ShaderKind,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), ShaderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_block(kind, name, &source).inspect_err(|e| {
            error!("Failed to add shader file {}: {}", path.display(), e);
        })
    }

    fn insert(&mut self, block: ShaderBlock) {
        self.by_name.insert(block.name.clone(), self.blocks.len());
        self.blocks.push(block);
    }

    pub fn get(&self, name: &str) -> Option<&ShaderBlock> {
        self.by_name.get(name).map(|&index| &self.blocks[index])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &ShaderBlock> {
        self.blocks.iter()
    }

    /// Builds a single-stage shader from the named blocks, in the given order.
    ///
    /// Exactly one of them must be a stage block; the rest are code blocks.
    pub fn compose(&self, names: &[&str]) -> Result<ComposedShader, ShaderError> {
        let blocks = names
            .iter()
            .map(|&name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| ShaderError::UnknownBlock(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stages: Vec<&ShaderBlock> = blocks.iter().filter(|b| b.kind.is_stage()).collect();
        let [stage_block] = stages.as_slice() else {
            return Err(ShaderError::StageCount {
                found: stages.iter().map(|b| b.name.clone()).collect(),
            });
        };
        let stage = stage_block.kind;
        Ok(ComposedShader { stage, blocks })
    }
}

fn starts_with_any(token: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| token.starts_with(marker))
}

/// Splits source text into blocks, each paired with the line of its header.
fn parse_blocks(source: &str) -> Result<Vec<(usize, ShaderBlock)>, ShaderError> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, ShaderBlock)> = None;

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut tokens = line.split_whitespace();
        let first = tokens.next().unwrap_or("");

        if starts_with_any(first, &BEGIN_MARKERS) {
            if let Some((_, block)) = &open {
                return Err(ShaderError::NestedBegin {
                    line: line_number,
                    open: block.name.clone(),
                });
            }
            let (Some(kind), Some(name)) = (tokens.next(), tokens.next()) else {
                return Err(ShaderError::MalformedHeader { line: line_number });
            };
            let kind = ShaderKind::from_name(kind).ok_or_else(|| ShaderError::UnknownKind {
                line: line_number,
                kind: kind.to_string(),
            })?;
            open = Some((
                line_number,
                ShaderBlock {
                    kind,
                    name: name.to_string(),
                    source: String::new(),
                },
            ));
        } else if starts_with_any(first, &END_MARKERS) {
            match open.take() {
                Some(block) => blocks.push(block),
                None => return Err(ShaderError::UnexpectedEnd { line: line_number }),
            }
        } else if let Some((_, block)) = &mut open {
            block.source.push_str(line);
            block.source.push('\n');
        }
    }

    if let Some((line, block)) = open {
        return Err(ShaderError::UnterminatedBlock {
            line,
            open: block.name,
        });
    }
    if blocks.is_empty() {
        return Err(ShaderError::NoBlocks);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
notes before the first block are ignored
#beginwgsl VertexShader vs_main
fn a() {}
#endwgsl
between blocks
#beginglsl codeblock helpers
fn b() {}

fn c() {}
#endglsl
";

    #[test]
    fn test_load_blocks() {
        let mut library = ShaderLibrary::new();
        assert_eq!(library.load_str(SAMPLE).unwrap(), 2);
        let vs = library.get("vs_main").unwrap();
        assert_eq!(vs.kind, ShaderKind::Vertex);
        assert_eq!(vs.source, "fn a() {}\n");
        let helpers = library.get("helpers").unwrap();
        assert_eq!(helpers.kind, ShaderKind::CodeBlock);
        assert_eq!(helpers.source, "fn b() {}\n\nfn c() {}\n");
    }

    #[test]
    fn test_syntax_errors_carry_line_numbers() {
        let nested = "#beginwgsl codeblock a\n#beginwgsl codeblock b\n#endwgsl\n";
        assert!(matches!(
            ShaderLibrary::new().load_str(nested),
            Err(ShaderError::NestedBegin { line: 2, .. })
        ));

        let stray_end = "x\n#endwgsl\n";
        assert!(matches!(
            ShaderLibrary::new().load_str(stray_end),
            Err(ShaderError::UnexpectedEnd { line: 2 })
        ));

        let unterminated = "\n#beginwgsl codeblock a\nfn a() {}\n";
        assert!(matches!(
            ShaderLibrary::new().load_str(unterminated),
            Err(ShaderError::UnterminatedBlock { line: 2, .. })
        ));

        let bad_kind = "#beginwgsl computeshader cs\n#endwgsl\n";
        assert!(matches!(
            ShaderLibrary::new().load_str(bad_kind),
            Err(ShaderError::UnknownKind { line: 1, .. })
        ));

        let no_name = "#beginwgsl codeblock\n#endwgsl\n";
        assert!(matches!(
            ShaderLibrary::new().load_str(no_name),
            Err(ShaderError::MalformedHeader { line: 1 })
        ));

        assert!(matches!(
            ShaderLibrary::new().load_str("fn main() {}\n"),
            Err(ShaderError::NoBlocks)
        ));
    }

    #[test]
    fn test_duplicate_names_rejected_atomically() {
        let mut library = ShaderLibrary::new();
        library.load_str(SAMPLE).unwrap();
        let clash = "#beginwgsl codeblock fresh\n#endwgsl\n#beginwgsl codeblock helpers\n#endwgsl\n";
        assert!(matches!(
            library.load_str(clash),
            Err(ShaderError::DuplicateName { line: Some(3), .. })
        ));
        assert!(library.get("fresh").is_none());
        assert_eq!(library.len(), 2);

        assert!(matches!(
            library.add_block(ShaderKind::CodeBlock, "vs_main", ""),
            Err(ShaderError::DuplicateName { line: None, .. })
        ));
    }

    #[test]
    fn test_compose() {
        let mut library = ShaderLibrary::new();
        library.load_str(SAMPLE).unwrap();
        library
            .add_block(ShaderKind::Fragment, "fs_main", "fn d() {}\n")
            .unwrap();

        let shader = library.compose(&["vs_main", "helpers"]).unwrap();
        assert_eq!(shader.stage, ShaderKind::Vertex);
        assert_eq!(shader.name(), "vs_main");
        assert_eq!(shader.source(), "fn a() {}\nfn b() {}\n\nfn c() {}\n");

        assert!(matches!(
            library.compose(&["helpers"]),
            Err(ShaderError::StageCount { found }) if found.is_empty()
        ));
        assert!(matches!(
            library.compose(&["vs_main", "fs_main"]),
            Err(ShaderError::StageCount { found }) if found.len() == 2
        ));
        assert!(matches!(
            library.compose(&["vs_main", "missing"]),
            Err(ShaderError::UnknownBlock(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_kind_names_case_insensitive() {
        assert_eq!(ShaderKind::from_name("FRAGMENTSHADER"), Some(ShaderKind::Fragment));
        assert_eq!(ShaderKind::from_name("CodeBlock"), Some(ShaderKind::CodeBlock));
        assert_eq!(ShaderKind::from_name("pixelshader"), None);
    }

    #[test]
    fn test_load_bundled_file() {
        let mut library = ShaderLibrary::new();
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/edu_phong.wgsl");
        assert_eq!(library.load_file(path).unwrap(), 8);
        assert_eq!(
            library.get("calcPhongLighting").map(|b| b.kind),
            Some(ShaderKind::CodeBlock)
        );

        assert!(matches!(
            library.load_file("does/not/exist.wgsl"),
            Err(ShaderError::Io { .. })
        ));
    }

    #[test]
    fn test_add_block_file_keeps_whole_file() {
        let mut library = ShaderLibrary::new();
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/edu_phong.wgsl");
        library
            .add_block_file(ShaderKind::CodeBlock, "everything", path)
            .unwrap();
        let block = library.get("everything").unwrap();
        assert_eq!(block.kind, ShaderKind::CodeBlock);
        assert_eq!(block.source, std::fs::read_to_string(path).unwrap());
        // Markers are not interpreted.
        assert!(block.source.contains("#beginwgsl codeblock procTexture"));
        assert_eq!(library.len(), 1);

        assert!(matches!(
            library.add_block_file(ShaderKind::CodeBlock, "everything", path),
            Err(ShaderError::DuplicateName { line: None, .. })
        ));
        assert!(matches!(
            library.add_block_file(ShaderKind::Fragment, "missing", "does/not/exist.wgsl"),
            Err(ShaderError::Io { .. })
        ));
        assert!(library.get("missing").is_none());
    }
}
