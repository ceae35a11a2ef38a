use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::block::{Attributes, Block, parse_attribute_list};
use crate::parser::error::ParseError;
use crate::parser::line_of;

/// Extract fenced and indented code blocks from Markdown source.
///
/// The fence info string is `<language> <attribute list>`, e.g.
/// ```` ```python group=setup min-server-version=2.5 ````.
pub fn parse_blocks(source: &str, file_id: usize) -> Result<Vec<Block>, Vec<ParseError>> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut blocks = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let (ref ev, ref range) = events[i];
        let Event::Start(Tag::CodeBlock(kind)) = ev else {
            i += 1;
            continue;
        };

        let span = range.clone();
        i += 1;
        let content = collect_text_until(&events, &mut i, |e| matches!(e, TagEnd::CodeBlock));

        let mut block = Block {
            source: strip_final_newline(content),
            language: None,
            roles: Vec::new(),
            attributes: Attributes::new(),
            line: line_of(source, span.start),
            span: span.clone(),
        };

        if let CodeBlockKind::Fenced(info) = kind {
            let info = info.trim();
            let (language, rest) = match info.find(|c: char| c.is_whitespace() || c == '{' || c == ',') {
                Some(pos) => (&info[..pos], &info[pos..]),
                None => (info, ""),
            };
            if !language.is_empty() {
                block.language = Some(language.to_string());
            }
            match parse_attribute_list(rest) {
                Ok(entries) => block.apply_entries(entries),
                Err(message) => {
                    errors.push(
                        ParseError::error(message, span, file_id)
                            .with_note(format!("in fence info string `{}`", info)),
                    );
                    continue;
                }
            }
        }

        blocks.push(block);
    }

    if errors.is_empty() {
        Ok(blocks)
    } else {
        Err(errors)
    }
}

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}

fn strip_final_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Block> {
        parse_blocks(source, 0).expect("parse failed")
    }

    #[test]
    fn fenced_block_with_attributes() {
        let blocks = parse(
            "# Title\n\nSome prose.\n\n```python group=setup min-server-version=2.5\nx = 1\n```\n",
        );
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.language.as_deref(), Some("python"));
        assert_eq!(block.source, "x = 1");
        assert_eq!(block.group(), Some("setup"));
        assert_eq!(block.min_server_version(), Some("2.5"));
        assert_eq!(block.line, 5);
    }

    #[test]
    fn braces_roles_and_flags() {
        let blocks = parse("```python {.no-test enterprise}\nprint(1)\n```\n");
        assert!(blocks[0].has_role("no-test"));
        assert!(blocks[0].has_attribute("enterprise"));
        assert!(!blocks[0].has_attribute("networkx"));
    }

    #[test]
    fn blocks_keep_document_order() {
        let blocks = parse("```python\na\n```\n\ntext\n\n```bash\nb\n```\n\n    indented\n");
        let sources: Vec<&str> = blocks.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "indented"]);
        assert_eq!(blocks[2].language, None);
    }

    #[test]
    fn multi_line_body_is_kept_verbatim() {
        let blocks = parse("```python\nfor i in range(2):\n    print(i)\n\nprint('done')\n```\n");
        assert_eq!(blocks[0].source, "for i in range(2):\n    print(i)\n\nprint('done')");
    }

    #[test]
    fn bad_info_string_is_reported() {
        let errors = parse_blocks("```python group=\"open\nx\n```\n", 3).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_id, 3);
        assert!(errors[0].message.contains("unterminated"));
    }
}
