//! Turns the remaining path of a command into the one thing to run next.

use std::any::Any;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use itertools::Itertools;
use log::debug;

use crate::command_definitions::CommandType;
use crate::matcher::matches;
use crate::registry::{CommandEntry, Registry};

/// Most suggestions attached to a miss.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Index into the command's argument overloads.
    Overload(usize),
    Subcommand(CommandType),
    /// Index into the command's handlers.
    Handler(usize),
    /// Several subcommands share the prefix `token` and no handler accepts.
    Ambiguous {
        token: String,
        candidates: Vec<String>,
    },
    Unresolved {
        token: Option<String>,
        suggestions: Vec<String>,
    },
}

/// Resolves `path`, the tokens after the command's own token.
///
/// Overloads are tried first in registration order, then subcommands by
/// name, then handlers against the live `instance`. A token naming several
/// subcommands selects none of them and falls through to the handlers; it is
/// reported as ambiguous only when no handler accepts.
#[must_use]
pub fn resolve(
    registry: &Registry,
    entry: &CommandEntry,
    path: &[String],
    instance: &dyn Any,
) -> Resolution {
    if let Some(index) = entry
        .overloads
        .iter()
        .position(|overload| matches(&overload.descriptor, path))
    {
        debug!("Path {path:?} matched argument overload {index}");
        return Resolution::Overload(index);
    }

    let token = path.first();
    let mut ambiguous: Option<Vec<String>> = None;

    if let Some(token) = token {
        let named: Vec<(CommandType, String)> = entry
            .descriptor
            .subcommands
            .iter()
            .map(|subcommand| (*subcommand, registry.name_of(subcommand)))
            .collect();

        let candidates: Vec<&(CommandType, String)> = named
            .iter()
            .filter(|(_, name)| name_matches(name, token, entry.descriptor.disambiguous))
            .collect();

        match candidates.as_slice() {
            [(subcommand, name)] => {
                debug!("Token `{token}` selected subcommand `{name}`");
                return Resolution::Subcommand(*subcommand);
            }
            [] => {}
            several => {
                debug!("Token `{token}` is a prefix of {} subcommands", several.len());
                ambiguous = Some(several.iter().map(|(_, name)| name.clone()).collect());
            }
        }
    }

    if let Some(index) = entry
        .handlers
        .iter()
        .position(|handler| handler.descriptor.accepts(instance))
    {
        debug!("Falling back to handler {index}");
        return Resolution::Handler(index);
    }

    if let (Some(token), Some(candidates)) = (token, ambiguous) {
        return Resolution::Ambiguous {
            token: token.clone(),
            candidates,
        };
    }

    let names: Vec<String> = entry
        .descriptor
        .subcommands
        .iter()
        .map(|subcommand| registry.name_of(subcommand))
        .collect();

    Resolution::Unresolved {
        token: token.cloned(),
        suggestions: token
            .map(|token| suggest(token, &names))
            .unwrap_or_default(),
    }
}

fn name_matches(name: &str, token: &str, exact: bool) -> bool {
    let name = name.to_lowercase();
    let token = token.to_lowercase();

    if exact {
        name == token
    } else {
        name.starts_with(&token)
    }
}

/// Names in `choices` closest to `token`, best first.
#[must_use]
pub fn suggest(token: &str, choices: &[String]) -> Vec<String> {
    let matcher = SkimMatcherV2::default();

    choices
        .iter()
        .filter_map(|choice| {
            matcher
                .fuzzy_match(choice, token)
                .map(|score| (score, choice))
        })
        .sorted_by(|(a, _), (b, _)| b.cmp(a))
        .take(MAX_SUGGESTIONS)
        .map(|(_, choice)| choice.clone())
        .collect()
}
