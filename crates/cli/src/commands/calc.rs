//! `cmdr calc sum 1,2,3` and `cmdr calc sum-squares 1,2,3`.
//!
//! `calc` matches its subcommands exactly, so `sum` never collides with
//! `sum-squares`.

use regex::Regex;

use cmdroute_core::command_definitions::{
    ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor,
};
use cmdroute_core::error::Result;
use cmdroute_core::matcher::coerce_window;
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::RunContext;
use cmdroute_core::value::{Value, ValueType};

macro_rules! unit_command {
    ($($name:ident),*) => {
        $(
            pub struct $name;

            impl Command for $name {
                fn create(_context: &RunContext) -> Self {
                    $name
                }
            }
        )*
    };
}

unit_command!(Calc, Sum, SumSquares);

const NUMBER: &str = r"[-+]?(\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?";

/// A single comma separated list of numbers. Anything else leaves the
/// path unresolved.
fn numbers_argument() -> std::result::Result<ArgumentsDescriptor, regex::Error> {
    let list = Regex::new(&format!(r"^\s*{NUMBER}(\s*,\s*{NUMBER})*\s*$"))?;

    Ok(ArgumentsDescriptor::new().argument(
        ArgumentSpec::new("numbers", ValueType::Number)
            .required()
            .delimiter(",")
            .matching(list)
            .description("Comma separated numbers")
            .example("1,2,3"),
    ))
}

/// Numbers of the window, split and coerced by the overload.
fn numbers(overload: &ArgumentsDescriptor, window: &[String]) -> Vec<f64> {
    coerce_window(overload, window)
        .first()
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

fn print_number(n: f64) {
    println!("{}", Value::Number(n));
}

/// # Errors
///
/// Returns the first declaration the registry rejects.
pub fn declare(registry: &Registry) -> Result<()> {
    let overload = numbers_argument()?;

    registry.declare::<Calc>().command(
        CommandDescriptor::new("calc")
            .description("Small arithmetic helpers")
            .version("1.0.0")
            .subcommand::<Sum>()
            .subcommand::<SumSquares>()
            .disambiguous(),
    )?;

    let sum_overload = overload.clone();
    registry
        .declare::<Sum>()
        .command(CommandDescriptor::new("sum").description("Add numbers"))?
        .arguments(overload.clone(), move |_sum, _invocation, arguments| {
            print_number(numbers(&sum_overload, arguments).iter().sum());
            Ok(())
        })?;

    // Named from the type: `sum-squares`.
    registry
        .declare::<SumSquares>()
        .command(CommandDescriptor::new("").description("Add the squares of numbers"))?
        .arguments(overload.clone(), move |_sum_squares, invocation, arguments| {
            let values = numbers(&overload, arguments);
            invocation.log_verbose(&format!("Squaring {} number(s)", values.len()));
            print_number(values.iter().map(|n| n * n).sum());
            Ok(())
        })?;

    Ok(())
}
