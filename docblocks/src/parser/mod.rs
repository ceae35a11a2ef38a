mod asciidoc;
pub mod error;
mod markdown;

use std::path::Path;

pub use error::ParseError;

use crate::Document;

/// Markup dialect of a documentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// Fenced code blocks, attributes in the info string.
    Markdown,
    /// `[source,...]` attribute lines over `----` listing blocks.
    AsciiDoc,
}

impl Markup {
    /// Pick the dialect from a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Markup::Markdown),
            "adoc" | "asciidoc" | "asc" => Some(Markup::AsciiDoc),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Markup::from_extension)
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    markup: Markup,
}

impl Parser {
    pub fn new(source: String, file_id: usize, markup: Markup) -> Self {
        Parser {
            source,
            file_id,
            markup,
        }
    }

    /// Extract every code block in the source, in document order.
    pub fn parse(&self) -> Result<Document, Vec<ParseError>> {
        let blocks = match self.markup {
            Markup::Markdown => markdown::parse_blocks(&self.source, self.file_id)?,
            Markup::AsciiDoc => asciidoc::parse_blocks(&self.source, self.file_id)?,
        };
        tracing::debug!(blocks = blocks.len(), markup = ?self.markup, "parsed document");
        Ok(Document {
            blocks,
            source_id: self.file_id,
        })
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
pub fn line_of(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}
