//! Declaration-time checks that keep a command tree unambiguous.
//!
//! Every registration is validated before it is committed, so a tree that
//! could resolve one path to two targets is rejected before it can run.

use std::collections::HashSet;

use log::debug;

use crate::binding::builtin_options;
use crate::command_definitions::{ArgumentOverload, CommandType};
use crate::error::RegistrationError;
use crate::registry::CommandEntry;

/// Runs every check against `entry`.
///
/// `name_of` resolves a subcommand's public name against the registry state
/// being validated.
///
/// # Errors
///
/// Returns the first [`RegistrationError`] found.
pub fn validate(
    command: &str,
    entry: &CommandEntry,
    name_of: &dyn Fn(&CommandType) -> String,
) -> Result<(), RegistrationError> {
    detect_ambiguous_overloads(command, &entry.overloads)?;

    let subcommand_names: Vec<String> = entry.descriptor.subcommands.iter().map(name_of).collect();
    detect_shadowed_subcommands(command, &entry.overloads, &subcommand_names)?;
    detect_duplicate_subcommands(command, &subcommand_names)?;
    detect_duplicate_options(command, entry)?;

    debug!("Validated command tree for `{command}`");
    Ok(())
}

/// Two overloads of equal arity are ambiguous when every position carries
/// the same match expression, counting two wildcards as the same.
fn detect_ambiguous_overloads(
    command: &str,
    overloads: &[ArgumentOverload],
) -> Result<(), RegistrationError> {
    for (first, a) in overloads.iter().enumerate() {
        for (second, b) in overloads.iter().enumerate().skip(first + 1) {
            let a_args = &a.descriptor.arguments;
            let b_args = &b.descriptor.arguments;

            if a_args.len() != b_args.len() {
                continue;
            }

            let overlapping = a_args
                .iter()
                .zip(b_args)
                .all(|(a, b)| a.pattern_source() == b.pattern_source());

            if !overlapping {
                continue;
            }

            let detail = if a_args.is_empty() {
                "both overloads take no arguments.".to_string()
            } else {
                a_args
                    .iter()
                    .enumerate()
                    .map(|(position, argument)| match argument.pattern_source() {
                        "" => format!("duplicate arguments at position {position} with fallthrough expressions"),
                        source => format!(
                            "duplicate arguments at position {position} with overlapping expression \"/{source}/\""
                        ),
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            };

            return Err(RegistrationError::AmbiguousOverloads {
                command: command.to_string(),
                first,
                second,
                detail,
            });
        }
    }

    Ok(())
}

/// An overload whose first expression accepts a subcommand name would
/// swallow that subcommand, since overloads resolve first.
fn detect_shadowed_subcommands(
    command: &str,
    overloads: &[ArgumentOverload],
    subcommand_names: &[String],
) -> Result<(), RegistrationError> {
    for overload in overloads {
        let Some(pattern) = overload
            .descriptor
            .arguments
            .first()
            .and_then(|argument| argument.pattern.as_ref())
        else {
            continue;
        };

        if let Some(name) = subcommand_names
            .iter()
            .find(|name| !name.is_empty() && pattern.is_match(name))
        {
            return Err(RegistrationError::OverloadShadowsSubcommand {
                command: command.to_string(),
                subcommand: name.clone(),
                pattern: pattern.as_str().to_string(),
            });
        }
    }

    Ok(())
}

fn detect_duplicate_subcommands(
    command: &str,
    subcommand_names: &[String],
) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();

    for name in subcommand_names {
        if !seen.insert(name.as_str()) {
            return Err(RegistrationError::DuplicateSubcommand {
                command: command.to_string(),
                name: name.clone(),
            });
        }
    }

    Ok(())
}

/// Long names and shorthands must be unique, built-ins included.
fn detect_duplicate_options(command: &str, entry: &CommandEntry) -> Result<(), RegistrationError> {
    let mut names = HashSet::new();
    let mut shorthands = HashSet::new();

    for binding in builtin_options().iter().chain(&entry.options) {
        let name = binding.spec.long_name();
        if !names.insert(name.clone()) {
            return Err(RegistrationError::DuplicateOption {
                command: command.to_string(),
                name,
            });
        }

        if let Some(shorthand) = &binding.spec.shorthand {
            if !shorthands.insert(shorthand.clone()) {
                return Err(RegistrationError::DuplicateShorthand {
                    command: command.to_string(),
                    shorthand: shorthand.clone(),
                });
            }
        }
    }

    Ok(())
}
