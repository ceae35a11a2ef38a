mod config;
mod logging;
mod test_runner;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use assembler::{Executor, Scope, Wrapper};

use crate::config::Config;
use crate::test_runner::RunOptions;

#[derive(Parser)]
#[command(
    name = "docs-test",
    version,
    about = "Run the code examples embedded in documentation"
)]
struct Cli {
    /// Interpreter that runs each assembled script as `<INTERPRETER> -c <script>`
    #[arg(required_unless_present = "list_categories")]
    interpreter: Option<String>,

    /// Documentation directory or single file (default: `root` from the config)
    path: Option<PathBuf>,

    /// Also run the examples that need an enterprise licence
    #[arg(long)]
    include_enterprise: bool,

    /// Run only these scopes (community, enterprise, networkx). Repeatable.
    #[arg(long = "scope", value_name = "SCOPE")]
    scopes: Vec<Scope>,

    /// Run only files in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,

    /// Kill scripts running longer than this many seconds (0 = no limit)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Config file (default: ./docs-test.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the assembled scripts instead of running them
    #[arg(long)]
    print_scripts: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let path = cli.path.clone().unwrap_or_else(|| config.root.clone());

    if cli.list_categories {
        test_runner::list_categories(&path, &config.extensions);
        return;
    }

    let wrapper = match Wrapper::from_files(
        config.prologue_file.as_deref(),
        config.epilogue_file.as_deref(),
    ) {
        Ok(wrapper) => wrapper,
        Err(e) => {
            eprintln!("error: cannot read prologue/epilogue override: {}", e);
            process::exit(2);
        }
    };

    let Some(interpreter) = cli.interpreter else {
        eprintln!("error: an interpreter is required");
        process::exit(2);
    };

    let timeout_secs = cli.timeout.unwrap_or(config.timeout_secs);
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    let scopes = if cli.scopes.is_empty() {
        Scope::ALL.to_vec()
    } else {
        let mut scopes = Vec::new();
        for scope in cli.scopes {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    };

    tracing::debug!(
        interpreter = %interpreter,
        path = %path.display(),
        ?scopes,
        ?timeout,
        "starting documentation test run"
    );

    let options = RunOptions {
        executor: Executor::new(interpreter).with_timeout(timeout),
        wrapper,
        language: config.language,
        scopes,
        include_enterprise: cli.include_enterprise,
        extensions: config.extensions,
        categories: cli.category,
        print_scripts: cli.print_scripts,
        no_color: cli.no_color,
    };

    let exit_code = test_runner::run_tests(&path, &options);
    process::exit(exit_code);
}
