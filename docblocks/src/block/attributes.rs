/// Key/value metadata attached to a code block.
///
/// Insertion order is kept so diagnostics and dry-run output list attributes
/// the way they were written. Bare flags such as `enterprise` are stored with
/// an empty value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    /// Set `key` to `value`, replacing an earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One item of an attribute list such as `python, role=no-test, group="a"`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeEntry {
    /// A bare word: the block style, the language, or a flag.
    Positional(String),
    /// `key=value`.
    Named { key: String, value: String },
    /// A role from `role=a.b` or the `.a.b` shorthand.
    Role(String),
}

/// Split an attribute list into entries.
///
/// Entries are separated by commas and/or whitespace. Values may be quoted
/// with `"` or `'` to include separators. A surrounding `{ ... }` is ignored
/// so Markdown info strings like `python {group=a}` read the same as AsciiDoc
/// `[source,python,group=a]`.
pub fn parse_attribute_list(text: &str) -> Result<Vec<AttributeEntry>, String> {
    let mut entries = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|&c| is_separator(c)) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if is_separator(c) || c == '=' {
                break;
            }
            key.push(c);
            chars.next();
        }

        if chars.peek() == Some(&'=') {
            chars.next();
            let value = read_value(&mut chars)?;
            if key.is_empty() {
                return Err(format!("attribute value \"{}\" has no name", value));
            }
            if key == "role" {
                entries.extend(split_roles(&value));
            } else {
                entries.push(AttributeEntry::Named { key, value });
            }
        } else if let Some(roles) = key.strip_prefix('.') {
            entries.extend(split_roles(roles));
        } else {
            entries.push(AttributeEntry::Positional(key));
        }
    }

    Ok(entries)
}

fn read_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, String> {
    let mut value = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some(c) if c == quote => break,
                    Some(c) => value.push(c),
                    None => return Err(format!("unterminated {} in attribute value", quote)),
                }
            }
        }
        _ => {
            while let Some(&c) = chars.peek() {
                if is_separator(c) {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
    }
    Ok(value)
}

fn split_roles(text: &str) -> impl Iterator<Item = AttributeEntry> + '_ {
    text.split(['.', ' '])
        .filter(|r| !r.is_empty())
        .map(|r| AttributeEntry::Role(r.to_string()))
}

fn is_separator(c: char) -> bool {
    c == ',' || c == '{' || c == '}' || c.is_whitespace()
}
