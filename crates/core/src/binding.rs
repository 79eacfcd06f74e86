//! Option binding from flags and environment variables.
//!
//! For each option the first defined source wins: the long flag, then the
//! shorthand flag, then the declared environment variables in order. Options
//! without any source are skipped and reported, they never stop the binding.

use std::any::Any;
use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;

use crate::capability::Capability;
use crate::command_definitions::{OptionBinding, OptionSpec};
use crate::error::Result;
use crate::permissions::PermissionNegotiator;
use crate::runtime::BuiltinOptions;
use crate::value::Value;

/// Flat map of parsed flags, keyed by flag name without dashes.
pub type Props = IndexMap<String, Value>;

/// Where environment variables are read from.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

impl<S: std::hash::BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Result of binding every option of a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindReport {
    /// Long names of options no source provided a value for.
    pub missing: Vec<String>,
}

impl BindReport {
    /// True when every option received a value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// The five options every command understands.
#[must_use]
pub fn builtin_options() -> Vec<OptionBinding> {
    vec![
        OptionBinding::builtin("help", 'h', "Show this help menu.", |options, value| {
            options.help = value;
        }),
        OptionBinding::builtin(
            "debug",
            '!',
            "Display messages about side-effects of actions, but does not perform the actions.",
            |options, value| options.debug = value,
        ),
        OptionBinding::builtin(
            "verbose",
            '*',
            "Display verbose logging messages.",
            |options, value| options.verbose = value,
        ),
        OptionBinding::builtin(
            "version",
            'v',
            "Show the version of a CLI, command, or subcommand.",
            |options, value| options.version = value,
        ),
        OptionBinding::builtin(
            "example",
            '#',
            "List examples of a CLI, command, or subcommand.",
            |options, value| options.example = value,
        ),
    ]
}

pub struct OptionBinder<'a> {
    env: &'a dyn EnvSource,
    negotiator: &'a PermissionNegotiator<'a>,
}

impl<'a> OptionBinder<'a> {
    pub fn new(env: &'a dyn EnvSource, negotiator: &'a PermissionNegotiator<'a>) -> Self {
        Self { env, negotiator }
    }

    /// Binds every option in `bindings`, writing values into `instance` or
    /// `builtins`.
    ///
    /// # Errors
    ///
    /// Only a denied environment read fails the binding.
    pub fn bind(
        &self,
        bindings: &[OptionBinding],
        props: &Props,
        instance: &mut dyn Any,
        builtins: &mut BuiltinOptions,
    ) -> Result<BindReport> {
        let mut report = BindReport::default();

        for binding in bindings {
            let spec = &binding.spec;

            match self.raw_value(spec, props)? {
                Some(raw) => {
                    let value = convert(&raw, spec);
                    debug!("Bound option `--{}` to `{value}`", spec.long_name());
                    binding.apply(instance, builtins, value);
                }
                None => report.missing.push(spec.long_name()),
            }
        }

        Ok(report)
    }

    fn raw_value(&self, spec: &OptionSpec, props: &Props) -> Result<Option<Value>> {
        if let Some(value) = props.get(&spec.long_name()) {
            return Ok(Some(value.clone()));
        }

        if let Some(value) = spec.shorthand.as_ref().and_then(|shorthand| props.get(shorthand)) {
            return Ok(Some(value.clone()));
        }

        self.env_value(&spec.env)
    }

    /// First defined variable among `names`. Each read needs its own `env`
    /// capability.
    fn env_value(&self, names: &[String]) -> Result<Option<Value>> {
        for name in names {
            self.negotiator.check_capability(&Capability::env(name))?;

            if let Some(value) = self.env.var(name) {
                debug!("Read option value from environment variable `{name}`");
                return Ok(Some(Value::String(value)));
            }
        }

        Ok(None)
    }
}

fn convert(raw: &Value, spec: &OptionSpec) -> Value {
    match &spec.delimiter {
        Some(delimiter) => raw.split_and_coerce(delimiter, spec.value_type),
        None => raw.coerce(spec.value_type),
    }
}
