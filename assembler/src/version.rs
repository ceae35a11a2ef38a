use std::fmt;

use docblocks::block::Block;

use crate::error::AssemblyError;
use crate::wrap::indent;

/// A `min-server-version` attribute, normalized to three components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl MinServerVersion {
    /// Parse `MAJOR`, `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        if parts.next().is_some() {
            return None;
        }
        Some(MinServerVersion {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for MinServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The code a block contributes to a script.
///
/// Blocks with a `min-server-version` are nested under a run-time check so
/// they are skipped against older servers instead of failing.
pub fn to_raw_code(block: &Block) -> Result<String, AssemblyError> {
    let Some(declared) = block.min_server_version() else {
        return Ok(block.source.clone());
    };

    let version =
        MinServerVersion::parse(declared).ok_or_else(|| AssemblyError::InvalidMinServerVersion {
            line: block.line,
            value: declared.to_string(),
        })?;

    let mut guarded = format!(
        "if gds.server_version() >= ServerVersion({}, {}, {}):\n",
        version.major, version.minor, version.patch
    );
    let body = indent(&block.source);
    if body.trim().is_empty() {
        guarded.push_str("    pass");
    } else {
        guarded.push_str(body.trim_end_matches('\n'));
    }
    Ok(guarded)
}

#[cfg(test)]
mod tests {
    use docblocks::block::Attributes;

    use super::*;

    fn block(source: &str, min_version: Option<&str>) -> Block {
        let mut attributes = Attributes::new();
        if let Some(v) = min_version {
            attributes.insert("min-server-version", v);
        }
        Block {
            source: source.to_string(),
            language: Some("python".into()),
            roles: Vec::new(),
            attributes,
            span: 0..0,
            line: 12,
        }
    }

    #[test]
    fn parses_short_forms() {
        let v = MinServerVersion::parse("2").unwrap();
        assert_eq!(v.to_string(), "2.0.0");
        let v = MinServerVersion::parse("2.5").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (2, 5, 0));
        assert!(MinServerVersion::parse("2.5.1").unwrap() > v);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "two", "2.x", "2.5.0.1", "2..1", "-1"] {
            assert_eq!(MinServerVersion::parse(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn unguarded_block_is_unchanged() {
        assert_eq!(to_raw_code(&block("x = 1\ny = 2", None)).unwrap(), "x = 1\ny = 2");
    }

    #[test]
    fn guard_indents_every_line() {
        let raw = to_raw_code(&block("for i in range(3):\n    print(i)\n\nx = 1", Some("2.0"))).unwrap();
        assert_eq!(
            raw,
            "if gds.server_version() >= ServerVersion(2, 0, 0):\n    for i in range(3):\n        print(i)\n\n    x = 1"
        );
    }

    #[test]
    fn empty_guarded_body_stays_valid() {
        let raw = to_raw_code(&block("", Some("2.4"))).unwrap();
        assert!(raw.ends_with(":\n    pass"));
    }

    #[test]
    fn invalid_version_names_the_line() {
        let err = to_raw_code(&block("x", Some("latest"))).unwrap_err();
        assert!(err.to_string().contains("line 12"));
        assert!(err.to_string().contains("latest"));
    }
}
