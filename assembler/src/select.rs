use docblocks::block::{Block, ENTERPRISE, NETWORKX, NO_TEST};
use tracing::trace;

use crate::scope::{Scope, Selection};

/// Keep the blocks that are testable under `selection`, in input order.
pub fn select<'a>(blocks: impl IntoIterator<Item = &'a Block>, selection: &Selection) -> Vec<&'a Block> {
    blocks
        .into_iter()
        .filter(|block| {
            let keep = is_testable(block, selection);
            trace!(line = block.line, keep, scope = %selection.scope, "block selection");
            keep
        })
        .collect()
}

fn is_testable(block: &Block, selection: &Selection) -> bool {
    let language_matches = block
        .language
        .as_deref()
        .is_some_and(|lang| lang.eq_ignore_ascii_case(&selection.language));
    if !language_matches || block.has_role(NO_TEST) {
        return false;
    }

    if selection.scope != Scope::Enterprise && block.has_attribute(ENTERPRISE) {
        return false;
    }

    let networkx = block.has_attribute(NETWORKX);
    if selection.scope == Scope::Networkx {
        networkx
    } else {
        !networkx
    }
}
