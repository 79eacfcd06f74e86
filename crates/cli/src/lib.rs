//! cmdroute CLI Library
//!
//! This crate provides `cmdr`, a small command tree routed by
//! `cmdroute-core`. It wires the router to the terminal: capabilities are
//! granted from a grants file or by prompting, and help is printed as text
//! or YAML.
//!
//! # Architecture
//!
//! - [`cli_args`]: The binary's own flags, separated from the routed tokens
//! - [`commands`]: The declared command tree and its CLI description
//! - [`grants`]: Capability provider backed by the grants file and a prompt
//!
//! # Examples
//!
//! ```bash
//! # Root help
//! cmdr --help
//!
//! # Greeting, overridable through CMDR_GREETING
//! cmdr greet Ferris --shout
//!
//! # Capabilities are asked for unless granted or `--yes` is given
//! cmdr fs --root ~/notes cat todo.md
//! cmdr --yes env --vars HOME,SHELL
//!
//! # `calc` matches subcommands exactly
//! cmdr calc sum 1,2,3
//! cmdr calc sum-squares 1,2,3
//!
//! # Help as YAML
//! cmdr --structured-help calc --help
//! ```

pub mod cli_args;
pub mod commands;
pub mod grants;
