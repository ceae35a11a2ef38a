use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::Buffer;
use tracing::{debug, info};

use assembler::{AssembledScript, ExecutionResult, Executor, Scope, Selection, Wrapper};
use docblocks::parser::{Markup, ParseError, Parser};

/// Everything a run needs besides the documentation tree.
pub struct RunOptions {
    pub executor: Executor,
    pub wrapper: Wrapper,
    pub language: String,
    pub scopes: Vec<Scope>,
    pub include_enterprise: bool,
    pub extensions: Vec<String>,
    pub categories: Vec<String>,
    pub print_scripts: bool,
    pub no_color: bool,
}

pub enum TestOutcome {
    /// Every script exited zero.
    Pass,
    /// The file has no testable blocks under this scope.
    Empty,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub scripts: usize,
    pub outcome: TestOutcome,
}

/// Parse and assemble one file, then run each script in order.
///
/// A failing script does not stop the others; every failure is reported.
pub fn run_file(path: &Path, selection: &Selection, options: &RunOptions) -> TestResult {
    let scripts = match assemble_file(path, selection, &options.wrapper) {
        Ok(scripts) => scripts,
        Err(reason) => {
            return TestResult {
                path: path.to_path_buf(),
                scripts: 0,
                outcome: TestOutcome::Fail(reason),
            };
        }
    };

    if scripts.is_empty() {
        return TestResult {
            path: path.to_path_buf(),
            scripts: 0,
            outcome: TestOutcome::Empty,
        };
    }

    let mut failures = Vec::new();
    for script in &scripts {
        info!(path = %path.display(), origin = %script.origin, scope = %selection.scope, "running script");
        match options.executor.run(script) {
            Ok(result) if result.success => {}
            Ok(result) => failures.push(describe_failure(path, script, &result)),
            Err(e) => failures.push(format!(
                "{} in {}: could not run script: {}\n\n--- script ---\n{}",
                script.origin,
                path.display(),
                e,
                script.text
            )),
        }
    }

    TestResult {
        path: path.to_path_buf(),
        scripts: scripts.len(),
        outcome: if failures.is_empty() {
            TestOutcome::Pass
        } else {
            TestOutcome::Fail(failures.join("\n\n"))
        },
    }
}

/// Read, parse and assemble a file. Errors are rendered for display.
pub fn assemble_file(
    path: &Path,
    selection: &Selection,
    wrapper: &Wrapper,
) -> Result<Vec<AssembledScript>, String> {
    let source =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {}", e))?;
    let markup = Markup::from_path(path)
        .ok_or_else(|| format!("unsupported documentation format: {}", path.display()))?;

    let document = Parser::new(source.clone(), 0, markup)
        .parse()
        .map_err(|errors| render_parse_errors(path, source, &errors))?;

    assembler::assemble(&document, selection, wrapper)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

fn render_parse_errors(path: &Path, source: String, errors: &[ParseError]) -> String {
    let mut files = SimpleFiles::new();
    files.add(path.display().to_string(), source);

    let mut buffer = Buffer::no_color();
    let config = term::Config::default();
    for error in errors {
        let _ = term::emit_to_write_style(&mut buffer, &config, &files, &error.to_diagnostic());
    }
    String::from_utf8_lossy(buffer.as_slice()).trim_end().to_string()
}

/// Failure message: origin, file, status, the full script and its output.
fn describe_failure(path: &Path, script: &AssembledScript, result: &ExecutionResult) -> String {
    let status = if result.timed_out {
        "timed out".to_string()
    } else {
        match result.code {
            Some(code) => format!("exited with status {}", code),
            None => "was killed by a signal".to_string(),
        }
    };
    let cleanup = if result.cleanup_failed {
        " (cleanup epilogue failed; later examples may see leftover data)"
    } else {
        ""
    };

    format!(
        "{} in {} {}{}\n\n--- script ---\n{}\n--- stdout ---\n{}\n--- stderr ---\n{}",
        script.origin,
        path.display(),
        status,
        cleanup,
        script.text.trim_end(),
        result.stdout.trim_end(),
        result.stderr.trim_end()
    )
}

/// Discover documentation files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
pub fn discover_categorized(root: &Path, extensions: &[String]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if root.is_file() {
        categories.insert(String::new(), vec![root.to_path_buf()]);
        return categories;
    }
    collect_docs(root, root, extensions, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_docs(
    dir: &Path,
    root: &Path,
    extensions: &[String],
    out: &mut BTreeMap<String, Vec<PathBuf>>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_docs(&path, root, extensions, out);
        } else if has_extension(&path, extensions) {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// List available categories for the given documentation path.
pub fn list_categories(path: &Path, extensions: &[String]) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path, extensions);
    if categories.is_empty() {
        eprintln!("no documentation files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} files)", label, files.len());
    }
}

/// Keep only the requested categories (and their subcategories).
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn skip_label(no_color: bool) -> &'static str {
    if no_color { "SKIP" } else { "\x1b[33mSKIP\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Tally for one scope.
#[derive(Debug, Default, PartialEq)]
pub struct ScopeSummary {
    pub passed: usize,
    pub failed: usize,
    pub empty: usize,
    pub scripts: usize,
}

/// Run every file of `files` under one scope, printing a line per file.
/// Returns the tally and the failures.
pub fn run_scope(
    scope: Scope,
    files: &BTreeMap<&str, &Vec<PathBuf>>,
    root: &Path,
    options: &RunOptions,
) -> (ScopeSummary, Vec<TestResult>) {
    let selection = Selection::new(scope).with_language(options.language.clone());
    let mut summary = ScopeSummary::default();
    let mut failures = Vec::new();

    for (cat, paths) in files {
        let header = if cat.is_empty() { "(root)" } else { *cat };
        eprintln!("  {}", bold(header, options.no_color));

        for path in *paths {
            let result = run_file(path, &selection, options);
            let label = display_path(path, root);
            summary.scripts += result.scripts;
            match &result.outcome {
                TestOutcome::Pass => {
                    summary.passed += 1;
                    eprintln!(
                        "    {}  {} ({} scripts)",
                        pass_label(options.no_color),
                        label,
                        result.scripts
                    );
                }
                TestOutcome::Empty => {
                    summary.empty += 1;
                    debug!(path = %label, scope = %scope, "no testable blocks");
                }
                TestOutcome::Fail(_) => {
                    summary.failed += 1;
                    eprintln!("    {}  {}", fail_label(options.no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    (summary, failures)
}

/// Print assembled scripts instead of running them. Returns the number of
/// files that could not be assembled.
fn print_scripts(
    scope: Scope,
    files: &BTreeMap<&str, &Vec<PathBuf>>,
    root: &Path,
    options: &RunOptions,
) -> usize {
    let selection = Selection::new(scope).with_language(options.language.clone());
    let mut errors = 0;
    for path in files.values().flat_map(|paths| paths.iter()) {
        let label = display_path(path, root);
        match assemble_file(path, &selection, &options.wrapper) {
            Ok(scripts) => {
                for script in scripts {
                    println!("# ==== {} :: {} [{}]", label, script.origin, scope);
                    println!("{}", script.text);
                }
            }
            Err(reason) => {
                errors += 1;
                eprintln!("  {}  {}", fail_label(options.no_color), label);
                for line in reason.lines() {
                    eprintln!("    {}", line);
                }
            }
        }
    }
    errors
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Run every requested scope over the documentation under `path`.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, options: &RunOptions) -> i32 {
    let all_categories = discover_categorized(path, &options.extensions);
    if all_categories.is_empty() {
        eprintln!("no documentation files found in {}", path.display());
        return 1;
    }

    let run_categories = filter_categories(&all_categories, &options.categories);
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut total = ScopeSummary::default();
    let mut failures: Vec<(Scope, TestResult)> = Vec::new();
    let mut print_errors = 0;

    for &scope in &options.scopes {
        eprintln!();
        if scope == Scope::Enterprise && !options.include_enterprise {
            eprintln!(
                "{}  {} (pass --include-enterprise to run)",
                skip_label(options.no_color),
                bold(scope.name(), options.no_color)
            );
            continue;
        }
        eprintln!("{}", bold(&format!("scope: {}", scope), options.no_color));

        if options.print_scripts {
            print_errors += print_scripts(scope, &run_categories, path, options);
            continue;
        }

        let (summary, scope_failures) = run_scope(scope, &run_categories, path, options);
        eprintln!(
            "  {} files passed, {} failed, {} without examples ({} scripts)",
            summary.passed, summary.failed, summary.empty, summary.scripts
        );
        total.passed += summary.passed;
        total.failed += summary.failed;
        total.empty += summary.empty;
        total.scripts += summary.scripts;
        failures.extend(scope_failures.into_iter().map(|f| (scope, f)));
    }

    if options.print_scripts {
        return if print_errors == 0 { 0 } else { 1 };
    }

    // Print failure details
    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for (scope, f) in &failures {
            eprintln!();
            eprintln!("  --- {} [{}] ---", f.path.display(), scope);
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    // Summary
    eprintln!();
    if total.failed == 0 {
        if options.no_color {
            eprintln!("test result: ok. {} passed, 0 failed", total.passed);
        } else {
            eprintln!("test result: \x1b[32mok\x1b[0m. {} passed, 0 failed", total.passed);
        }
        0
    } else {
        let run = total.passed + total.failed;
        if options.no_color {
            eprintln!(
                "test result: FAILED. {} passed, {} failed (of {})",
                total.passed, total.failed, run
            );
        } else {
            eprintln!(
                "test result: \x1b[31mFAILED\x1b[0m. {} passed, {} failed (of {})",
                total.passed, total.failed, run
            );
        }
        1
    }
}
