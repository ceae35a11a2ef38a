use std::time::Duration;

use assembler::wrap::{DEFAULT_EPILOGUE, DEFAULT_PROLOGUE};
use assembler::{AssembledScript, Executor, Scope, ScriptOrigin, Selection, Wrapper, assemble};
use docblocks::parser::{Markup, Parser};

fn scripts(markup: Markup, source: &str, scope: Scope) -> Vec<AssembledScript> {
    let document = Parser::new(source.to_string(), 0, markup)
        .parse()
        .expect("parse failed");
    assemble(&document, &Selection::new(scope), &Wrapper::default()).expect("assembly failed")
}

/// The text between `try:` and the epilogue, de-indented one level.
fn guarded_body(script: &AssembledScript) -> String {
    let (_, after_try) = script.text.split_once("try:\n").expect("no try");
    let body = after_try.strip_suffix(DEFAULT_EPILOGUE).expect("no epilogue");
    body.lines()
        .map(|l| l.strip_prefix("    ").unwrap_or(l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn single_ungrouped_block() {
    let result = scripts(Markup::Markdown, "# Intro\n\n```python\nprint(1)\n```\n", Scope::Community);
    assert_eq!(result.len(), 1);
    assert_eq!(
        result[0].text,
        format!("{}try:\n    print(1)\n{}", DEFAULT_PROLOGUE, DEFAULT_EPILOGUE)
    );
    assert_eq!(result[0].origin, ScriptOrigin::Block { line: 3 });
}

#[test]
fn grouped_blocks_form_one_script() {
    let source = "\
[source,python,group=a]
----
x = 1
----

Some explanation in between.

[source,python,group=a]
----
print(x)
----
";
    let result = scripts(Markup::AsciiDoc, source, Scope::Community);
    assert_eq!(result.len(), 1);
    assert_eq!(guarded_body(&result[0]), "# group: a\nx = 1\nprint(x)");
}

#[test]
fn enterprise_blocks_follow_scope() {
    let source = "```python\nfree()\n```\n\n```python enterprise\npaid()\n```\n";

    let community = scripts(Markup::Markdown, source, Scope::Community);
    assert_eq!(community.len(), 1);
    assert!(!community[0].text.contains("paid()"));

    let enterprise = scripts(Markup::Markdown, source, Scope::Enterprise);
    assert_eq!(enterprise.len(), 2);
    assert!(enterprise[1].text.contains("    paid()\n"));
}

#[test]
fn networkx_scope_is_exclusive() {
    let source = "```python\nplain()\n```\n\n```python networkx\nimport networkx as nx\n```\n";
    let nx = scripts(Markup::Markdown, source, Scope::Networkx);
    assert_eq!(nx.len(), 1);
    assert!(nx[0].text.contains("import networkx as nx"));

    let community = scripts(Markup::Markdown, source, Scope::Community);
    assert_eq!(community.len(), 1);
    assert!(community[0].text.contains("plain()"));
}

#[test]
fn min_server_version_guards_the_block() {
    let source = "[source,python,min-server-version=\"2.0\"]\n----\nx = 1\nprint(x)\n----\n";
    let result = scripts(Markup::AsciiDoc, source, Scope::Community);
    assert_eq!(
        guarded_body(&result[0]),
        "if gds.server_version() >= ServerVersion(2, 0, 0):\n    x = 1\n    print(x)"
    );
}

#[test]
fn no_test_and_foreign_languages_produce_nothing() {
    let source = "```python .no-test\nprint(1)\n```\n\n```bash\necho hi\n```\n\n    indented()\n";
    assert!(scripts(Markup::Markdown, source, Scope::Community).is_empty());
}

#[test]
fn cardinality_matches_groups_and_singles() {
    let source = "\
```python group=setup
a = 1
```

```python
print('one')
```

```python group=other
b = 2
```

```python group=setup
print(a)
```

```python
print('two')
```
";
    let result = scripts(Markup::Markdown, source, Scope::Community);
    assert_eq!(result.len(), 2 + 2);
    let origins: Vec<String> = result.iter().map(|s| s.origin.to_string()).collect();
    assert_eq!(
        origins,
        vec![
            "block at line 5",
            "block at line 17",
            "group \"setup\"",
            "group \"other\""
        ]
    );
}

#[test]
fn invalid_min_server_version_fails_the_document() {
    let document = Parser::new(
        "```python min-server-version=next\nx\n```\n".to_string(),
        0,
        Markup::Markdown,
    )
    .parse()
    .unwrap();
    let err = assemble(&document, &Selection::new(Scope::Community), &Wrapper::default()).unwrap_err();
    assert!(err.to_string().contains("next"));
}

fn shell_script(text: &str) -> AssembledScript {
    AssembledScript {
        origin: ScriptOrigin::Block { line: 1 },
        text: text.to_string(),
    }
}

#[cfg(unix)]
#[test]
fn executor_captures_output_and_status() {
    let result = Executor::new("sh")
        .run(&shell_script("echo out; echo err >&2; exit 3"))
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.code, Some(3));
    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "err\n");
    assert!(!result.timed_out);
    assert!(!result.cleanup_failed);
}

#[cfg(unix)]
#[test]
fn executor_passes_script_as_dash_c_argument() {
    let ok = Executor::new("true").run(&shell_script("anything")).unwrap();
    assert!(ok.success);
    let failed = Executor::new("false").run(&shell_script("anything")).unwrap();
    assert!(!failed.success);
    assert_eq!(failed.code, Some(1));
}

#[cfg(unix)]
#[test]
fn executor_flags_cleanup_failures() {
    let result = Executor::new("sh")
        .run(&shell_script("echo DOCS-TEST-CLEANUP-FAILED >&2; exit 1"))
        .unwrap();
    assert!(result.cleanup_failed);
    assert!(!result.success);
}

#[cfg(unix)]
#[test]
fn executor_kills_on_timeout() {
    let result = Executor::new("sh")
        .with_timeout(Some(Duration::from_millis(200)))
        .run(&shell_script("exec sleep 5"))
        .unwrap();
    assert!(result.timed_out);
    assert!(!result.success);
}

#[cfg(unix)]
#[test]
fn executor_timeout_kills_subprocesses_holding_the_pipes() {
    let started = std::time::Instant::now();
    let result = Executor::new("sh")
        .with_timeout(Some(Duration::from_millis(200)))
        .run(&shell_script("sleep 5; true"))
        .unwrap();
    assert!(result.timed_out);
    assert!(!result.success);
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "run took {:?}",
        started.elapsed()
    );
}

#[test]
fn missing_interpreter_is_an_execution_error() {
    let err = Executor::new("definitely-not-an-interpreter-xyz")
        .run(&shell_script("print(1)"))
        .unwrap_err();
    assert!(err.to_string().contains("definitely-not-an-interpreter-xyz"));
}
