pub mod error;
pub mod executor;
pub mod group;
pub mod scope;
pub mod select;
pub mod version;
pub mod wrap;

pub use error::{AssemblyError, ExecutionError};
pub use executor::{ExecutionResult, Executor};
pub use group::{RawScript, ScriptOrigin, group};
pub use scope::{Scope, Selection};
pub use select::select;
pub use version::{MinServerVersion, to_raw_code};
pub use wrap::{AssembledScript, CLEANUP_FAILURE_MARKER, Wrapper, indent};

use docblocks::Document;

/// Turn one parsed document into complete, independently runnable scripts.
///
/// Ungrouped blocks come first, one script each, followed by one script per
/// group in the order the groups first appear.
pub fn assemble(
    document: &Document,
    selection: &Selection,
    wrapper: &Wrapper,
) -> Result<Vec<AssembledScript>, AssemblyError> {
    let selected = select(&document.blocks, selection);
    let raw = group(&selected)?;
    Ok(raw.iter().map(|script| wrapper.wrap(script)).collect())
}
