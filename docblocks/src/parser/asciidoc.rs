use crate::block::{AttributeEntry, Attributes, Block, parse_attribute_list};
use crate::parser::error::ParseError;

/// A source line with its byte offset in the document.
struct Line<'a> {
    start: usize,
    /// Line text without the line terminator.
    text: &'a str,
}

fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in source.split_inclusive('\n') {
        let text = raw.trim_end_matches('\n').trim_end_matches('\r');
        lines.push(Line { start, text });
        start += raw.len();
    }
    lines
}

fn is_listing_delimiter(text: &str) -> bool {
    text.len() >= 4 && text.bytes().all(|b| b == b'-')
}

/// `.Title` lines may sit between the attribute line and the delimiter.
fn is_block_title(text: &str) -> bool {
    text.starts_with('.') && !text.starts_with("..") && text.len() > 1
}

/// Extract `[source,<language>,...]` listing blocks from AsciiDoc source.
///
/// Listing blocks without a `source` attribute line carry no language and are
/// still returned so callers see every example in the file.
pub fn parse_blocks(source: &str, file_id: usize) -> Result<Vec<Block>, Vec<ParseError>> {
    let lines = split_lines(source);
    let mut blocks = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let trimmed = line.text.trim_end();

        let header = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|inner| inner.trim_start().starts_with("source"));

        let (entries, open_idx) = match header {
            Some(inner) => {
                let entries = match parse_attribute_list(inner) {
                    Ok(entries) => entries,
                    Err(message) => {
                        errors.push(ParseError::error(
                            message,
                            line.start..line.start + line.text.len(),
                            file_id,
                        ));
                        i += 1;
                        continue;
                    }
                };
                let mut j = i + 1;
                while j < lines.len() && is_block_title(lines[j].text.trim_end()) {
                    j += 1;
                }
                if j >= lines.len() || !is_listing_delimiter(lines[j].text.trim_end()) {
                    errors.push(
                        ParseError::error(
                            "source attribute line is not followed by a listing block",
                            line.start..line.start + line.text.len(),
                            file_id,
                        )
                        .with_note("expected a `----` delimiter on the next line"),
                    );
                    i += 1;
                    continue;
                }
                (entries, j)
            }
            None if is_listing_delimiter(trimmed) => (Vec::new(), i),
            None => {
                i += 1;
                continue;
            }
        };

        let delimiter = lines[open_idx].text.trim_end();
        let close_idx = (open_idx + 1..lines.len()).find(|&k| lines[k].text.trim_end() == delimiter);
        let Some(close_idx) = close_idx else {
            let open = &lines[open_idx];
            errors.push(ParseError::error(
                "unterminated listing block",
                open.start..source.len(),
                file_id,
            ));
            break;
        };

        let body: Vec<&str> = lines[open_idx + 1..close_idx].iter().map(|l| l.text).collect();
        let close = &lines[close_idx];

        let mut block = Block {
            source: body.join("\n"),
            language: None,
            roles: Vec::new(),
            attributes: Attributes::new(),
            span: line.start..close.start + close.text.len(),
            line: i + 1,
        };
        apply_source_entries(&mut block, entries);
        blocks.push(block);

        i = close_idx + 1;
    }

    if errors.is_empty() {
        Ok(blocks)
    } else {
        Err(errors)
    }
}

/// First positional is the `source` style, second the language; later bare
/// words are flags.
fn apply_source_entries(block: &mut Block, entries: Vec<AttributeEntry>) {
    let mut positional = 0;
    let mut rest = Vec::new();
    for entry in entries {
        match entry {
            AttributeEntry::Positional(word) if positional < 2 => {
                if positional == 1 {
                    block.language = Some(word);
                }
                positional += 1;
            }
            other => rest.push(other),
        }
    }
    block.apply_entries(rest);
}
