use std::fmt;
use std::str::FromStr;

/// Which attribute-gated examples a run includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Everything except enterprise and NetworkX examples.
    Community,
    /// Community examples plus those flagged `enterprise`.
    Enterprise,
    /// Only examples flagged `networkx`.
    Networkx,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Community, Scope::Enterprise, Scope::Networkx];

    pub fn name(self) -> &'static str {
        match self {
            Scope::Community => "community",
            Scope::Enterprise => "enterprise",
            Scope::Networkx => "networkx",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" => Ok(Scope::Community),
            "enterprise" => Ok(Scope::Enterprise),
            "networkx" | "nx" => Ok(Scope::Networkx),
            other => Err(format!(
                "unknown scope '{}' (expected community, enterprise or networkx)",
                other
            )),
        }
    }
}

/// Options that decide which blocks are testable, passed explicitly to
/// every selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub scope: Scope,
    /// Language tag of the target interpreter, compared case-insensitively.
    pub language: String,
}

impl Selection {
    pub fn new(scope: Scope) -> Self {
        Selection {
            scope,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

pub const DEFAULT_LANGUAGE: &str = "python";
