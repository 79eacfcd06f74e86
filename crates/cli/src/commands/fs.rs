//! `cmdr fs [--root DIR] cat <path>` and `cmdr fs ls`.
//!
//! The root comes from `--root`, then `CMDR_ROOT`, then the working
//! directory.
//!
//! Reading below the root needs read access to it. The requirement is
//! declared on `fs` and travels down to both subcommands.

use std::fs::{read_dir, read_to_string};
use std::path::PathBuf;

use itertools::Itertools;

use cmdroute_core::capability::Capability;
use cmdroute_core::command_definitions::{
    ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor, HandlerDescriptor, OptionSpec,
    Permission,
};
use cmdroute_core::error::RegistrationError;
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::RunContext;
use cmdroute_core::value::ValueType;

const DEFAULT_ROOT: &str = ".";

/// `--root`, declared on `fs` and on each subcommand so every instance binds
/// it from the shared flags.
fn root_option() -> OptionSpec {
    OptionSpec::new("root", ValueType::String)
        .shorthand('r')
        .env("CMDR_ROOT")
        .description("Directory paths are relative to")
}

pub struct Fs {
    root: String,
}

impl Command for Fs {
    fn create(_context: &RunContext) -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
        }
    }
}

pub struct Cat {
    root: PathBuf,
    number: bool,
}

impl Command for Cat {
    fn create(_context: &RunContext) -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            number: false,
        }
    }
}

pub struct Ls {
    root: PathBuf,
}

impl Command for Ls {
    fn create(_context: &RunContext) -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
        }
    }
}

/// # Errors
///
/// Returns the first declaration the registry rejects.
pub fn declare(registry: &Registry) -> Result<(), RegistrationError> {
    registry
        .declare::<Fs>()
        .command(
            CommandDescriptor::new("fs")
                .description("Read files below a root directory")
                .subcommand::<Cat>()
                .subcommand::<Ls>()
                .permission(Permission::from_fn(|fs: &Fs| {
                    vec![Capability::read(&fs.root)]
                })),
        )?
        .option(root_option(), |fs, value| fs.root = value.to_string())?;

    registry
        .declare::<Cat>()
        .command(
            CommandDescriptor::new("cat")
                .description("Print a file")
                .example("cmdr fs --root ~/notes cat todo.md"),
        )?
        .option(root_option(), |cat, value| {
            cat.root = PathBuf::from(value.to_string());
        })?
        .option(
            OptionSpec::new("number", ValueType::Boolean)
                .shorthand('n')
                .description("Number output lines"),
            |cat, value| cat.number = value.is_truthy(),
        )?
        .arguments(
            ArgumentsDescriptor::new().argument(
                ArgumentSpec::new("path", ValueType::String)
                    .required()
                    .description("File path below the root"),
            ),
            |cat, invocation, arguments| {
                let path = cat.root.join(arguments.first().map_or("", String::as_str));
                invocation.log_verbose(&format!("Reading {}", path.display()));

                let Some(contents) =
                    invocation.debug_action(&format!("Would read {}", path.display()), || {
                        read_to_string(&path)
                    })
                else {
                    return Ok(());
                };
                let contents = contents?;
                for (i, line) in contents.lines().enumerate() {
                    if cat.number {
                        println!("{:>6}  {line}", i + 1);
                    } else {
                        println!("{line}");
                    }
                }
                Ok(())
            },
        )?;

    registry
        .declare::<Ls>()
        .command(CommandDescriptor::new("ls").description("List the root directory"))?
        .option(root_option(), |ls, value| ls.root = PathBuf::from(value.to_string()))?
        .handler(HandlerDescriptor::new(), |ls, invocation| {
            invocation.log_verbose(&format!("Listing {}", ls.root.display()));

            let names: Vec<String> = read_dir(&ls.root)?
                .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
                .collect::<Result<_, _>>()?;
            for name in names.into_iter().sorted() {
                println!("{name}");
            }
            Ok(())
        })?;

    Ok(())
}
