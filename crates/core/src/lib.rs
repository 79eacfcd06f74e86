//! cmdroute Core Library
//!
//! This crate routes command lines through a declared tree of commands. Each
//! command type registers a descriptor, options, positional argument
//! overloads and fallback handlers against a [`registry::Registry`]. At run
//! time the remaining path is resolved one command at a time to a subcommand,
//! an overload or a handler, options are bound from flags and environment
//! variables, and the capabilities a target needs are negotiated before it
//! runs.
//!
//! # Key Features
//!
//! - **Declarations**: Typed registration calls, validated for ambiguity as
//!   they are made
//! - **Resolution**: Overloads, then prefix or exact subcommand names, then
//!   predicate-guarded handlers
//! - **Options**: Long flag, shorthand, then environment variables
//! - **Permissions**: Static or instance-dependent capabilities with bounded
//!   retry
//! - **Help**: Structured help data with text and YAML renderers
//!
//! # Examples
//!
//! ```
//! use cmdroute_core::cli::{Cli, CliConfig};
//! use cmdroute_core::command_definitions::{
//!     ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor,
//! };
//! use cmdroute_core::help::MemoryRenderer;
//! use cmdroute_core::registry::Registry;
//! use cmdroute_core::runtime::{Outcome, RunContext};
//! use cmdroute_core::value::ValueType;
//!
//! struct Greet;
//!
//! impl Command for Greet {
//!     fn create(_context: &RunContext) -> Self {
//!         Greet
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry
//!     .declare::<Greet>()
//!     .command(CommandDescriptor::new("greet").description("Say hello"))?
//!     .arguments(
//!         ArgumentsDescriptor::new().argument(ArgumentSpec::new("name", ValueType::String)),
//!         |_greet, _invocation, arguments| {
//!             println!("Hello, {}!", arguments.first().map_or("world", String::as_str));
//!             Ok(())
//!         },
//!     )?;
//!
//! let outcome = Cli::new(CliConfig::new("hello", "Hello").command::<Greet>())
//!     .with_registry(&registry)
//!     .with_renderer(MemoryRenderer::new())
//!     .run(&["hello", "greet", "Ferris"])?;
//! assert_eq!(outcome, Outcome::Executed);
//! # Ok::<(), cmdroute_core::error::Error>(())
//! ```

pub mod argv;
pub mod binding;
pub mod capability;
pub mod cli;
pub mod command_definitions;
pub mod config;
pub mod error;
pub mod help;
pub mod matcher;
pub mod naming;
pub mod permissions;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod validation;
pub mod value;
