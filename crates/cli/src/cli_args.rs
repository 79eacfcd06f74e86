//! Command-line argument parsing for the `cmdr` binary.
//!
//! Only the binary's own flags are parsed with `clap`. Everything from the
//! first routed token on is handed to the router untouched, including
//! `--help` and `--version`, which the router answers itself.

use clap::Parser;
use cmdroute_core::argv;

/// Command-line arguments for `cmdr`.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use cmdroute_cli::cli_args::Args;
///
/// let args = Args::parse_from(["cmdr", "--yes", "greet", "Ferris"]);
/// assert!(args.yes);
/// assert_eq!(args.routed, vec!["greet", "Ferris"]);
/// ```
#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0, disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    /// Path to the grants file YAML listing pre-granted capabilities.
    ///
    /// If not provided, defaults to `~/.cmdroute/grants.yml`.
    #[arg(long, short = 'g')]
    pub grants_path: Option<String>,

    /// Grant every requested capability without prompting.
    #[arg(long, short = 'y', action)]
    pub yes: bool,

    /// Print help as YAML instead of text.
    #[arg(long, action)]
    pub structured_help: bool,

    /// The command path, options and arguments to route.
    ///
    /// # Examples
    /// ```bash
    /// cmdr fs --root ~/notes cat todo.md
    /// ```
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub routed: Vec<String>,
}

impl Args {
    /// Routed tokens prefixed with the CLI's entry token.
    #[must_use]
    pub fn routed_with_entry(&self, entry: &str) -> Vec<String> {
        std::iter::once(entry.to_string())
            .chain(self.routed.iter().cloned())
            .collect()
    }

    /// Whether the routed tokens ask for verbose output.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        argv::parse(&self.routed)
            .flags
            .get("verbose")
            .is_some_and(|value| value.is_truthy())
    }
}
