//! Splits raw arguments into path tokens, flags and positional tokens.
//!
//! Flags are collected into a flat [`Props`] map without knowing which
//! command will read them:
//!
//! - `--name=value` and `--name value` set `name`. The second form only takes
//!   the next token when it is not itself a flag.
//! - `--name` alone sets `true`, `--no-name` sets `false`.
//! - `-abc` sets `a`, `b` and `c`. The last one may take a value like a long
//!   flag. `-n=value` is accepted too.
//! - Values that look numeric become numbers, everything else stays a string.
//! - Everything after `--` is positional.
//!
//! The built-in flags never take a value, their single-character aliases are
//! stored under the long name, and they default to `false`.

use log::debug;

use crate::binding::Props;
use crate::value::{looks_numeric, parse_number, Value};

/// Built-in boolean flags and their aliases.
pub const BUILTIN_FLAGS: [(&str, char); 5] = [
    ("help", 'h'),
    ("debug", '!'),
    ("verbose", '*'),
    ("version", 'v'),
    ("example", '#'),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    pub path: Vec<String>,
    pub positional: Vec<String>,
    pub flags: Props,
}

#[must_use]
pub fn parse<S: AsRef<str>>(args: &[S]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut tokens = args.iter().map(AsRef::as_ref).peekable();

    while let Some(token) = tokens.next() {
        if token == "--" {
            parsed.positional.extend(tokens.by_ref().map(str::to_string));
            break;
        }

        if let Some(long) = token.strip_prefix("--") {
            if let Some((name, raw)) = long.split_once('=') {
                set(&mut parsed.flags, name, scalar(raw));
            } else if let Some(name) = long.strip_prefix("no-") {
                set(&mut parsed.flags, name, Value::Boolean(false));
            } else {
                let value = take_value(long, &mut tokens);
                set(&mut parsed.flags, long, value);
            }
            continue;
        }

        if let Some(short) = token.strip_prefix('-').filter(|short| !short.is_empty()) {
            if looks_numeric(token) {
                parsed.path.push(token.to_string());
                continue;
            }

            if let Some((name, raw)) = short.split_once('=') {
                set(&mut parsed.flags, name, scalar(raw));
                continue;
            }

            let letters: Vec<String> = short.chars().map(String::from).collect();
            if let Some((last, leading)) = letters.split_last() {
                for letter in leading {
                    set(&mut parsed.flags, letter, Value::Boolean(true));
                }
                let value = take_value(last, &mut tokens);
                set(&mut parsed.flags, last, value);
            }
            continue;
        }

        parsed.path.push(token.to_string());
    }

    for (name, _) in BUILTIN_FLAGS {
        parsed
            .flags
            .entry(name.to_string())
            .or_insert(Value::Boolean(false));
    }

    debug!(
        "Parsed path {:?}, {} flag(s), {} positional token(s)",
        parsed.path,
        parsed.flags.len(),
        parsed.positional.len()
    );
    parsed
}

fn builtin_name(flag: &str) -> Option<&'static str> {
    BUILTIN_FLAGS
        .iter()
        .find(|(name, alias)| *name == flag || flag.chars().eq(std::iter::once(*alias)))
        .map(|(name, _)| *name)
}

fn set(flags: &mut Props, name: &str, value: Value) {
    match builtin_name(name) {
        Some(builtin) => flags.insert(builtin.to_string(), Value::Boolean(value.is_truthy())),
        None => flags.insert(name.to_string(), value),
    };
}

fn take_value<'t, I>(name: &str, tokens: &mut std::iter::Peekable<I>) -> Value
where
    I: Iterator<Item = &'t str>,
{
    if builtin_name(name).is_some() {
        return Value::Boolean(true);
    }

    match tokens.next_if(|next| *next != "--" && (!next.starts_with('-') || looks_numeric(next))) {
        Some(next) => scalar(next),
        None => Value::Boolean(true),
    }
}

fn scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        raw if looks_numeric(raw) => Value::Number(parse_number(raw)),
        raw => Value::String(raw.to_string()),
    }
}
