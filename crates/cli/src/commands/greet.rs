//! `cmdr greet [name]`

use cmdroute_core::command_definitions::{
    ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor, OptionSpec,
};
use cmdroute_core::error::RegistrationError;
use cmdroute_core::matcher::coerce_window;
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::RunContext;
use cmdroute_core::value::ValueType;

const DEFAULT_GREETING: &str = "Hello";
const DEFAULT_NAME: &str = "world";

pub struct Greet {
    greeting: String,
    shout: bool,
}

impl Command for Greet {
    fn create(_context: &RunContext) -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            shout: false,
        }
    }
}

impl Greet {
    #[must_use]
    pub fn message(&self, name: &str) -> String {
        let message = format!("{}, {name}!", self.greeting);
        if self.shout {
            message.to_uppercase()
        } else {
            message
        }
    }
}

fn name_argument() -> ArgumentsDescriptor {
    ArgumentsDescriptor::new()
        .description("Greet someone by name")
        .argument(
            ArgumentSpec::new("name", ValueType::String)
                .default_value(DEFAULT_NAME)
                .description("Who to greet"),
        )
}

/// # Errors
///
/// Returns the first declaration the registry rejects.
pub fn declare(registry: &Registry) -> Result<(), RegistrationError> {
    registry
        .declare::<Greet>()
        .command(
            CommandDescriptor::new("greet")
                .description("Print a greeting")
                .example("cmdr greet Ferris --greeting Hi"),
        )?
        .option(
            OptionSpec::new("greeting", ValueType::String)
                .shorthand('g')
                .env("CMDR_GREETING")
                .description("Greeting to use"),
            |greet, value| greet.greeting = value.to_string(),
        )?
        .option(
            OptionSpec::new("shout", ValueType::Boolean)
                .shorthand('s')
                .description("Greet in capitals"),
            |greet, value| greet.shout = value.is_truthy(),
        )?
        .arguments(name_argument(), |greet, invocation, arguments| {
            let name = coerce_window(&name_argument(), arguments)
                .first()
                .map_or_else(|| DEFAULT_NAME.to_string(), ToString::to_string);
            invocation.log_verbose(&format!("Greeting `{name}`"));
            println!("{}", greet.message(&name));
            Ok(())
        })?;

    Ok(())
}
