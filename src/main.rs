//! Refscope CLI binary
//!
//! Thin adapter over the library: canonicalize inputs, enumerate files,
//! run one search and print what it reports.

use refscope::cli::{self, Cli};
use refscope::{Analyzer, AnalyzerConfig, RefError, SearchRequest};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::parse_args();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    }

    match execute(&cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("refscope: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Run one search and render its matches.
fn execute(cli: &Cli) -> Result<String, RefError> {
    let file = cli::canonical(&cli.file)?;
    let search_root = cli::canonical(&cli.path)?;

    let gopath = std::env::var_os("GOPATH");
    let roots: Vec<_> = cli::search_roots(&cli.roots, gopath.as_deref())
        .into_iter()
        .map(|root| std::fs::canonicalize(&root).unwrap_or(root))
        .collect();
    log::debug!("import roots: {:?}", roots);

    let files = cli::go_files(&search_root, cli.recursive)?;
    log::debug!("{} files to search under {}", files.len(), search_root.display());

    let analyzer = Analyzer::new(AnalyzerConfig::with_roots(roots));
    let request = SearchRequest {
        file,
        offset: cli.offset,
        search_root,
    };
    let found = refscope::find_references(&analyzer, request, &files)?;

    let cwd = std::env::current_dir().ok();
    let records = cli::records(&found, cli.verbose, cwd.as_deref())?;
    cli::render(&records, cli.format)
}
