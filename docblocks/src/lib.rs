pub mod block;
pub mod parser;

use crate::block::Block;

/// The annotated code blocks of one documentation file, in document order.
#[derive(Debug, Clone)]
pub struct Document {
    pub blocks: Vec<Block>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
