//! The command tree routed by `cmdr`.

use cmdroute_core::cli::CliConfig;
use cmdroute_core::error::Result;
use cmdroute_core::registry::Registry;
use cmdroute_core::value::Value;

pub mod calc;
pub mod env;
pub mod fs;
pub mod greet;

/// Entry token every routed command line starts with.
pub const CLI_NAME: &str = "cmdr";

/// Registers every command of the tree in `registry`.
///
/// # Errors
///
/// Returns the first declaration the registry rejects, or a bad argument
/// expression.
pub fn declare(registry: &Registry) -> Result<()> {
    greet::declare(registry)?;
    env::declare(registry)?;
    fs::declare(registry)?;
    calc::declare(registry)
}

/// The CLI description with its top-level commands.
#[must_use]
pub fn cli_config() -> CliConfig {
    CliConfig::new(CLI_NAME, "cmdroute demo")
        .description("Routes command lines through a small declared command tree.")
        .version(env!("CARGO_PKG_VERSION"))
        .command::<greet::Greet>()
        .command::<env::Env>()
        .command::<fs::Fs>()
        .command::<calc::Calc>()
}

/// Items of a list value, or the value itself as a single item.
fn strings(value: &Value) -> Vec<String> {
    match value.as_list() {
        Some(items) => items.iter().map(ToString::to_string).collect(),
        None => vec![value.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_declares_cleanly() {
        let registry = Registry::new();
        declare(&registry).unwrap();

        let config = cli_config();
        let names: Vec<String> = config
            .commands
            .iter()
            .map(|command| registry.name_of(command))
            .collect();
        assert_eq!(names, vec!["greet", "env", "fs", "calc"]);
    }

    #[test]
    fn test_strings_from_list_and_scalar() {
        let list = Value::List(vec![Value::from("HOME"), Value::from("PATH")]);
        assert_eq!(strings(&list), vec!["HOME", "PATH"]);
        assert_eq!(strings(&Value::from("HOME")), vec!["HOME"]);
    }
}
