use docblocks::block::Block;
use tracing::debug;

use crate::error::AssemblyError;
use crate::version::to_raw_code;

/// Where a script body came from, for failure reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// A standalone block starting at this 1-based line.
    Block { line: usize },
    /// Every block tagged with this group name.
    Group { name: String },
}

impl std::fmt::Display for ScriptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptOrigin::Block { line } => write!(f, "block at line {}", line),
            ScriptOrigin::Group { name } => write!(f, "group \"{}\"", name),
        }
    }
}

/// A script body before the prologue and epilogue are added.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScript {
    pub origin: ScriptOrigin,
    pub body: String,
}

/// Join buffers keyed by group name, in first-seen order.
///
/// A buffer is created on first access and starts with a comment naming the
/// group, so appending is the same operation for the first and later blocks.
#[derive(Debug, Default)]
struct GroupBuffers {
    buffers: Vec<(String, String)>,
}

impl GroupBuffers {
    fn entry(&mut self, name: &str) -> &mut String {
        let idx = match self.buffers.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.buffers
                    .push((name.to_string(), format!("# group: {}", name)));
                self.buffers.len() - 1
            }
        };
        &mut self.buffers[idx].1
    }

    fn append(&mut self, name: &str, code: &str) {
        let buffer = self.entry(name);
        buffer.push('\n');
        buffer.push_str(code);
    }

    fn into_scripts(self) -> impl Iterator<Item = RawScript> {
        self.buffers.into_iter().map(|(name, body)| RawScript {
            origin: ScriptOrigin::Group { name },
            body,
        })
    }
}

/// Partition selected blocks into script bodies.
///
/// Each ungrouped block is its own script. Blocks sharing a `group`
/// attribute are concatenated in encounter order, however much prose or
/// other blocks sit between them. Ungrouped scripts come first.
pub fn group(blocks: &[&Block]) -> Result<Vec<RawScript>, AssemblyError> {
    let mut standalone = Vec::new();
    let mut groups = GroupBuffers::default();

    for block in blocks {
        let code = to_raw_code(block)?;
        match block.group() {
            Some(name) if name.trim().is_empty() => {
                return Err(AssemblyError::EmptyGroupName { line: block.line });
            }
            Some(name) => {
                debug!(line = block.line, group = name, "appending block to group");
                groups.append(name, &code);
            }
            None => standalone.push(RawScript {
                origin: ScriptOrigin::Block { line: block.line },
                body: code,
            }),
        }
    }

    standalone.extend(groups.into_scripts());
    Ok(standalone)
}
