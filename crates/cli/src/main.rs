use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};

use cmdroute_cli::cli_args::Args;
use cmdroute_cli::commands::{self, CLI_NAME};
use cmdroute_cli::grants::GrantsProvider;
use cmdroute_core::cli::Cli;
use cmdroute_core::config;
use cmdroute_core::error::Result;
use cmdroute_core::help::StructuredRenderer;
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::Outcome;

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn execute(args: &Args) -> Result<Outcome> {
    let registry = Registry::global();
    commands::declare(registry)?;

    let grants_path = config::get_grants_path(args.grants_path.as_deref());
    debug!("Grants path: `{grants_path}`");
    let grants = config::load_grants(&grants_path)?;
    let provider = GrantsProvider::terminal(grants, Some(grants_path), args.yes);

    let mut cli = Cli::new(commands::cli_config())
        .with_registry(registry)
        .with_provider(provider);
    if args.structured_help {
        cli = cli.with_renderer(StructuredRenderer::stdout());
    }

    Ok(cli.run_or_exit(&args.routed_with_entry(CLI_NAME)))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.is_verbose());

    match execute(&args) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
