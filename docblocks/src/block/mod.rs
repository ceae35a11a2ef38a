pub mod attributes;

use std::ops::Range;

pub use attributes::{AttributeEntry, Attributes, parse_attribute_list};

/// Attribute naming the join buffer a block's code is appended to.
pub const GROUP: &str = "group";
/// Flag marking examples that need an enterprise licence.
pub const ENTERPRISE: &str = "enterprise";
/// Flag marking examples that exercise the NetworkX integration.
pub const NETWORKX: &str = "networkx";
/// Minimum server version a block needs, e.g. `2.5`.
pub const MIN_SERVER_VERSION: &str = "min-server-version";
/// Role that opts a block out of testing.
pub const NO_TEST: &str = "no-test";

/// An annotated code block extracted from a documentation file.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Literal code, without the newline that precedes the closing delimiter.
    pub source: String,
    /// Declared language, e.g. `python`. `None` for indented Markdown code.
    pub language: Option<String>,
    /// Role labels such as `no-test`.
    pub roles: Vec<String>,
    pub attributes: Attributes,
    /// Byte span of the whole block (delimiters included) in the document.
    pub span: Range<usize>,
    /// 1-based line of the block's opening delimiter.
    pub line: usize,
}

impl Block {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains(key)
    }

    pub fn group(&self) -> Option<&str> {
        self.attribute(GROUP)
    }

    pub fn min_server_version(&self) -> Option<&str> {
        self.attribute(MIN_SERVER_VERSION)
    }

    /// Apply parsed attribute entries that follow the style/language positions.
    ///
    /// Bare words become flags; `role` entries accumulate.
    pub(crate) fn apply_entries(&mut self, entries: impl IntoIterator<Item = AttributeEntry>) {
        for entry in entries {
            match entry {
                AttributeEntry::Positional(flag) => self.attributes.insert(flag, ""),
                AttributeEntry::Named { key, value } => self.attributes.insert(key, value),
                AttributeEntry::Role(role) => {
                    if !self.has_role(&role) {
                        self.roles.push(role);
                    }
                }
            }
        }
    }
}
