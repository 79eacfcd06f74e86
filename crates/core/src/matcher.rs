//! Positional argument matching for overloads.

use crate::command_definitions::{ArgumentSpec, ArgumentsDescriptor};
use crate::value::Value;

/// Whether `overload` accepts the positional `window`.
///
/// Positions are checked left to right against the token, or the declared
/// default when the token is missing. A required position without either
/// fails. A declared expression must accept the stringified value; without
/// one the position is a wildcard. Tokens past the declared positions are
/// not checked and reach the target as they are.
#[must_use]
pub fn matches(overload: &ArgumentsDescriptor, window: &[String]) -> bool {
    overload
        .arguments
        .iter()
        .enumerate()
        .all(|(position, argument)| position_matches(argument, window.get(position)))
}

fn position_matches(argument: &ArgumentSpec, token: Option<&String>) -> bool {
    let value = effective_value(argument, token);

    match (value, &argument.pattern) {
        (None, _) => !argument.required,
        (Some(value), Some(pattern)) => pattern.is_match(&value.to_string()),
        (Some(_), None) => true,
    }
}

fn effective_value(argument: &ArgumentSpec, token: Option<&String>) -> Option<Value> {
    token
        .map(|token| Value::from(token.as_str()))
        .or_else(|| argument.default.clone())
}

/// Typed values for a matched window: defaults filled in, delimited
/// arguments split, and every value coerced to its declared type. Positions
/// with neither a token nor a default are left out of the result.
#[must_use]
pub fn coerce_window(overload: &ArgumentsDescriptor, window: &[String]) -> Vec<Value> {
    overload
        .arguments
        .iter()
        .enumerate()
        .filter_map(|(position, argument)| {
            let value = effective_value(argument, window.get(position))?;
            Some(match &argument.delimiter {
                Some(delimiter) => value.split_and_coerce(delimiter, argument.value_type),
                None => value.coerce(argument.value_type),
            })
        })
        .collect()
}
