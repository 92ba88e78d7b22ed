use std::collections::HashMap;

/// Read access to the uniform blocks of a linked shader program.
///
/// Member paths name a field inside a block with `.`-separated segments, each
/// optionally indexed: `NumLights`, `Lights[1].IsEnabled`. Offsets are in
/// bytes from the start of the block.
pub trait UniformReflection {
    /// Size in bytes of the named block, or `None` if the program lacks it.
    fn block_size(&self, block: &str) -> Option<u64>;

    fn member_offset(&self, block: &str, path: &str) -> Option<u64>;

    fn has_block(&self, block: &str) -> bool {
        self.block_size(block).is_some()
    }
}

/// One segment of a member path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment<'a> {
    pub name: &'a str,
    pub index: Option<u32>,
}

/// Splits `Lights[1].IsEnabled` into its segments. Returns `None` for
/// malformed paths.
pub fn parse_member_path(path: &str) -> Option<Vec<PathSegment<'_>>> {
    path.split('.')
        .map(|segment| match segment.split_once('[') {
            None if !segment.is_empty() => Some(PathSegment {
                name: segment,
                index: None,
            }),
            None => None,
            Some((name, rest)) => {
                let index = rest.strip_suffix(']')?.parse().ok()?;
                (!name.is_empty()).then_some(PathSegment {
                    name,
                    index: Some(index),
                })
            }
        })
        .collect()
}

/// Hand-written reflection data, for programs whose layout is known up front.
#[derive(Debug, Clone, Default)]
pub struct ReflectionTable {
    blocks: HashMap<String, TableBlock>,
}

#[derive(Debug, Clone, Default)]
struct TableBlock {
    size: u64,
    members: HashMap<String, u64>,
}

impl ReflectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, block: &str, size: u64) -> Self {
        self.blocks.entry(block.to_string()).or_default().size = size;
        self
    }

    pub fn with_member(mut self, block: &str, path: &str, offset: u64) -> Self {
        self.blocks
            .entry(block.to_string())
            .or_default()
            .members
            .insert(path.to_string(), offset);
        self
    }
}

impl UniformReflection for ReflectionTable {
    fn block_size(&self, block: &str) -> Option<u64> {
        self.blocks.get(block).map(|b| b.size)
    }

    fn member_offset(&self, block: &str, path: &str) -> Option<u64> {
        self.blocks.get(block)?.members.get(path).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member_path() {
        assert_eq!(
            parse_member_path("Lights[1].IsEnabled"),
            Some(vec![
                PathSegment {
                    name: "Lights",
                    index: Some(1)
                },
                PathSegment {
                    name: "IsEnabled",
                    index: None
                },
            ])
        );
        assert_eq!(parse_member_path("NumLights").map(|p| p.len()), Some(1));
        assert_eq!(parse_member_path("Lights[x].IsEnabled"), None);
        assert_eq!(parse_member_path("Lights[1.IsEnabled"), None);
        assert_eq!(parse_member_path("Lights..IsEnabled"), None);
        assert_eq!(parse_member_path("[0]"), None);
    }

    #[test]
    fn test_table_lookup() {
        let table = ReflectionTable::new()
            .with_block("phGlobal", 48)
            .with_member("phGlobal", "NumLights", 12);
        assert!(table.has_block("phGlobal"));
        assert!(!table.has_block("phLightArray"));
        assert_eq!(table.member_offset("phGlobal", "NumLights"), Some(12));
        assert_eq!(table.member_offset("phGlobal", "LocalViewer"), None);
    }
}
