use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "docs-test.toml";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Documentation root used when no path is given on the command line.
    pub root: PathBuf,

    /// File extensions (without the dot) that are scanned for examples.
    pub extensions: Vec<String>,

    /// Language tag of the blocks to run.
    pub language: String,

    /// Per-script timeout in seconds. 0 waits forever.
    pub timeout_secs: u64,

    /// Replaces the built-in connection prologue.
    pub prologue_file: Option<PathBuf>,

    /// Replaces the built-in cleanup epilogue. Must open with `finally:`.
    pub epilogue_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("doc"),
            extensions: vec!["adoc".to_string(), "md".to_string()],
            language: assembler::scope::DEFAULT_LANGUAGE.to_string(),
            timeout_secs: 0,
            prologue_file: None,
            epilogue_file: None,
        }
    }
}

impl Config {
    /// Load `explicit`, or `docs-test.toml` if present, or the defaults.
    ///
    /// Relative file paths inside the config resolve against its directory.
    pub fn load(explicit: Option<&Path>) -> Result<Config, String> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read config '{}': {}", path.display(), e))?;
        let mut config = Config::parse(&content)
            .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?;

        let base = path.parent().unwrap_or(Path::new("."));
        for file in [&mut config.prologue_file, &mut config.epilogue_file]
            .into_iter()
            .flatten()
        {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}
