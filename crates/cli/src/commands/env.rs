//! `cmdr env --vars A,B` prints environment variables. Each variable is a
//! capability of its own, requested once the list is known.

use std::fmt::Display;

use cmdroute_core::capability::Capability;
use cmdroute_core::command_definitions::{
    Command, CommandDescriptor, HandlerDescriptor, OptionSpec, Permission,
};
use cmdroute_core::error::{RegistrationError, Result};
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::RunContext;
use cmdroute_core::value::ValueType;

use super::strings;

pub struct Env {
    vars: Vec<String>,
}

impl Command for Env {
    fn create(_context: &RunContext) -> Self {
        Self { vars: Vec::new() }
    }
}

/// Values of `vars`, read through `read`. Unset variables are empty.
fn variable_values(
    vars: &[String],
    mut read: impl FnMut(&str) -> Result<Option<String>>,
) -> Result<Vec<String>> {
    vars.iter()
        .map(|name| read(name).map(Option::unwrap_or_default))
        .collect()
}

/// # Errors
///
/// Returns the first declaration the registry rejects.
pub fn declare(registry: &Registry) -> std::result::Result<(), RegistrationError> {
    registry
        .declare::<Env>()
        .command(
            CommandDescriptor::new("env")
                .description("Print environment variables")
                .example("cmdr env --vars HOME,SHELL")
                .permission(Permission::from_fn(|env: &Env| {
                    env.vars.iter().map(|name| Capability::env(name)).collect()
                })),
        )?
        .option(
            OptionSpec::new("vars", ValueType::String)
                .delimiter(",")
                .description("Comma separated variable names"),
            |env, value| env.vars = strings(&value),
        )?
        .handler(
            HandlerDescriptor::new().when(|env: &Env| !env.vars.is_empty()),
            |env, invocation| {
                let values = variable_values(&env.vars, |name| invocation.env_var(name))?;
                let items: Vec<(&str, &dyn Display)> = env
                    .vars
                    .iter()
                    .zip(&values)
                    .map(|(name, value)| (name.as_str(), value as &dyn Display))
                    .collect();

                invocation.log_labels(&items);
                Ok(())
            },
        )?;

    Ok(())
}
