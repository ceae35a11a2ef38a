use std::fs;
use std::io;
use std::path::Path;

use crate::group::{RawScript, ScriptOrigin};

macro_rules! cleanup_failure_marker {
    () => {
        "DOCS-TEST-CLEANUP-FAILED"
    };
}

/// Written to stderr by the default epilogue when cleanup itself fails.
pub const CLEANUP_FAILURE_MARKER: &str = cleanup_failure_marker!();

/// Connection setup shared by every script. Connection details come from the
/// environment when the script runs, not when it is assembled.
pub const DEFAULT_PROLOGUE: &str = r#"import os
import sys

import neo4j.exceptions
from graphdatascience import GraphDataScience
from graphdatascience.server_version.server_version import ServerVersion

NEO4J_URI = os.environ.get("NEO4J_URI", "bolt://localhost:7687")
NEO4J_USER = os.environ.get("NEO4J_USER", os.environ.get("NEO4J_USERNAME", "neo4j"))
NEO4J_PASSWORD = os.environ.get("NEO4J_PASSWORD", "password")
NEO4J_DB = os.environ.get("NEO4J_DB", "neo4j")

gds = GraphDataScience(NEO4J_URI, auth=(NEO4J_USER, NEO4J_PASSWORD))
gds.set_database(NEO4J_DB)

"#;

/// Drops whatever the example left behind. Runs whether or not the body
/// raised; a failure here is flagged with `CLEANUP_FAILURE_MARKER`. A
/// `ClientError` from the data wipe (session or read-only targets) is printed
/// and ignored.
pub const DEFAULT_EPILOGUE: &str = concat!(
    r#"finally:
    try:
        for graph_name in gds.graph.list()["graphName"]:
            gds.graph.drop(graph_name, failIfMissing=False)

        if gds.server_version() >= ServerVersion(2, 5, 0):
            pipeline_names = gds.pipeline.list()["pipelineName"]
            model_names = gds.model.list()["modelName"]
        else:
            pipeline_names = gds.beta.pipeline.list()["pipelineName"]
            model_names = gds.beta.model.list()["modelInfo"].apply(lambda info: info["modelName"])

        for pipeline_name in pipeline_names:
            gds.pipeline.get(pipeline_name).drop(failIfMissing=False)

        for model_name in model_names:
            model = gds.model.get(model_name)
            if model.stored():
                if gds.server_version() >= ServerVersion(2, 5, 0):
                    gds.model.delete(model)
                else:
                    gds.alpha.model.delete(model)
            if model.exists():
                model.drop(failIfMissing=False)

        try:
            if gds.run_cypher("MATCH (n) RETURN count(n)").squeeze() > 0:
                gds.run_cypher("MATCH (n) DETACH DELETE n")
        except neo4j.exceptions.ClientError as e:
            print(e)
    except BaseException:
        print(""#,
    cleanup_failure_marker!(),
    r#"", file=sys.stderr)
        raise
    finally:
        gds.close()
"#
);

/// A script ready to hand to the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledScript {
    pub origin: ScriptOrigin,
    pub text: String,
}

/// Fixed text placed around every script body.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub prologue: String,
    /// Must open with the `finally:` clause that closes the guarded body.
    pub epilogue: String,
}

impl Default for Wrapper {
    fn default() -> Self {
        Wrapper {
            prologue: DEFAULT_PROLOGUE.to_string(),
            epilogue: DEFAULT_EPILOGUE.to_string(),
        }
    }
}

impl Wrapper {
    /// Replace the prologue and/or epilogue with file contents.
    pub fn from_files(prologue: Option<&Path>, epilogue: Option<&Path>) -> io::Result<Self> {
        let mut wrapper = Wrapper::default();
        if let Some(path) = prologue {
            wrapper.prologue = fs::read_to_string(path)?;
        }
        if let Some(path) = epilogue {
            wrapper.epilogue = fs::read_to_string(path)?;
        }
        Ok(wrapper)
    }

    /// Nest `raw` inside `try:` between the prologue and the epilogue.
    pub fn wrap(&self, raw: &RawScript) -> AssembledScript {
        let body = indent(&raw.body);

        let mut text = String::with_capacity(self.prologue.len() + body.len() + self.epilogue.len() + 16);
        text.push_str(&self.prologue);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str("try:\n");
        if body.trim().is_empty() {
            text.push_str("    pass\n");
        } else {
            text.push_str(&body);
        }
        text.push_str(&self.epilogue);

        AssembledScript {
            origin: raw.origin.clone(),
            text,
        }
    }
}

/// Indent every non-blank line by one level. Each line, blank ones included,
/// ends with `\n`; blank lines carry no trailing whitespace.
pub fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for line in text.lines() {
        if !line.trim().is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(body: &str) -> RawScript {
        RawScript {
            origin: ScriptOrigin::Block { line: 1 },
            body: body.to_string(),
        }
    }

    #[test]
    fn indent_skips_blank_lines() {
        assert_eq!(indent("a\n\n  b\n"), "    a\n\n      b\n");
        assert_eq!(indent(""), "");
    }

    #[test]
    fn default_wrapper_layout() {
        let script = Wrapper::default().wrap(&raw("print(1)"));
        let expected = format!("{}try:\n    print(1)\n{}", DEFAULT_PROLOGUE, DEFAULT_EPILOGUE);
        assert_eq!(script.text, expected);
    }

    #[test]
    fn epilogue_follows_any_body() {
        let wrapper = Wrapper::default();
        for body in ["raise RuntimeError('boom')", "def broken(:\n  ...", "", "\n\n"] {
            let script = wrapper.wrap(&raw(body));
            let (_, after_try) = script.text.split_once("try:\n").unwrap();
            assert!(after_try.ends_with(DEFAULT_EPILOGUE), "{body:?}");
        }
    }

    #[test]
    fn empty_body_becomes_pass() {
        let script = Wrapper::default().wrap(&raw("  \n"));
        assert!(script.text.contains("try:\n    pass\nfinally:"));
    }

    #[test]
    fn prologue_without_trailing_newline() {
        let wrapper = Wrapper {
            prologue: "setup()".into(),
            epilogue: "finally:\n    teardown()\n".into(),
        };
        let script = wrapper.wrap(&raw("x = 1"));
        assert_eq!(script.text, "setup()\ntry:\n    x = 1\nfinally:\n    teardown()\n");
    }

    #[test]
    fn epilogue_marker_matches_constant() {
        assert!(DEFAULT_EPILOGUE.contains(CLEANUP_FAILURE_MARKER));
        assert!(DEFAULT_EPILOGUE.starts_with("finally:\n"));
    }

    #[test]
    fn data_wipe_tolerates_client_errors() {
        let (before, wipe) = DEFAULT_EPILOGUE
            .split_once("MATCH (n) RETURN count(n)")
            .unwrap();
        assert!(before.contains("gds.graph.drop"));
        let (wipe, failure_handler) = wipe.split_once("except BaseException:").unwrap();
        assert!(wipe.contains("DETACH DELETE n"));
        assert!(wipe.contains("except neo4j.exceptions.ClientError as e:\n            print(e)"));
        assert!(failure_handler.contains(&format!("print(\"{}\", file=sys.stderr)", CLEANUP_FAILURE_MARKER)));
        assert!(DEFAULT_PROLOGUE.contains("import neo4j.exceptions\n"));
    }

    #[test]
    fn overrides_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let prologue = dir.path().join("prologue.py");
        std::fs::write(&prologue, "import custom\n").unwrap();

        let wrapper = Wrapper::from_files(Some(&prologue), None).unwrap();
        assert_eq!(wrapper.prologue, "import custom\n");
        assert_eq!(wrapper.epilogue, DEFAULT_EPILOGUE);

        assert!(Wrapper::from_files(Some(&dir.path().join("missing.py")), None).is_err());
    }
}
