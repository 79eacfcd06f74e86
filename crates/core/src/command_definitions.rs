//! Declarative descriptors for commands, argument overloads, options and
//! handlers.
//!
//! Descriptors are plain data built with chained setters. Targets, setters
//! and predicates are typed closures at the declaration site and are stored
//! type-erased (over [`Any`]) so one registry can hold every command type.

use std::any::{Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;

use crate::capability::Capability;
use crate::error::TargetError;
use crate::naming::{resolve_name, short_type_name};
use crate::runtime::{BuiltinOptions, Invocation, RunContext};
use crate::value::{Value, ValueType};

/// Result returned by argument and handler targets.
pub type TargetResult = std::result::Result<(), TargetError>;

/// A command the router can instantiate and dispatch to.
pub trait Command: Any {
    /// Builds a fresh instance for one invocation. Options are bound after this.
    fn create(context: &RunContext) -> Self
    where
        Self: Sized;
}

/// Stable identity of a command type, used as the registry key.
#[derive(Clone, Copy)]
pub struct CommandType {
    id: TypeId,
    type_name: &'static str,
    create: fn(&RunContext) -> Box<dyn Any>,
}

impl CommandType {
    #[must_use]
    pub fn of<C: Command>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            type_name: short_type_name(std::any::type_name::<C>()),
            create: |context| -> Box<dyn Any> { Box::new(C::create(context)) },
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Name used when no descriptor overrides it.
    #[must_use]
    pub fn default_name(&self) -> String {
        resolve_name(self.type_name, None)
    }

    pub(crate) fn instantiate(&self, context: &RunContext) -> Box<dyn Any> {
        (self.create)(context)
    }
}

impl PartialEq for CommandType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandType {}

impl Hash for CommandType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for CommandType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "CommandType({})", self.type_name)
    }
}

pub type PermissionFn = Arc<dyn Fn(&dyn Any) -> Vec<Capability> + Send + Sync>;

/// A capability requirement, either fixed or computed from the command
/// instance that declared it once its options are bound.
#[derive(Clone)]
pub enum Permission {
    Static(Capability),
    Dynamic(PermissionFn),
}

impl Permission {
    pub fn from_fn<C, F>(f: F) -> Self
    where
        C: Command,
        F: Fn(&C) -> Vec<Capability> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(move |instance: &dyn Any| {
            instance.downcast_ref::<C>().map(&f).unwrap_or_default()
        }))
    }

    /// Concrete requirements for `instance`.
    ///
    /// A dynamic permission evaluated against an instance of another command
    /// type yields nothing.
    #[must_use]
    pub fn evaluate(&self, instance: &dyn Any) -> Vec<Capability> {
        match self {
            Self::Static(capability) => vec![capability.clone()],
            Self::Dynamic(f) => f(instance),
        }
    }

    /// Evaluates against the declaring instance and freezes the result, so
    /// the requirement can travel down to subcommands.
    #[must_use]
    pub fn settle(&self, instance: &dyn Any) -> Vec<Permission> {
        self.evaluate(instance)
            .into_iter()
            .map(Permission::Static)
            .collect()
    }
}

impl From<Capability> for Permission {
    fn from(value: Capability) -> Self {
        Self::Static(value)
    }
}

impl Debug for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(capability) => write!(formatter, "Static({capability})"),
            Self::Dynamic(_) => formatter.write_str("Dynamic(..)"),
        }
    }
}

/// Name, version and tree position of a command.
#[derive(Clone, Debug, Default)]
pub struct CommandDescriptor {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub example: Option<String>,
    pub subcommands: Vec<CommandType>,
    pub permissions: Vec<Permission>,
    /// Subcommands must be named exactly instead of by prefix.
    pub disambiguous: bool,
}

impl CommandDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    #[must_use]
    pub fn subcommand<C: Command>(mut self) -> Self {
        self.subcommands.push(CommandType::of::<C>());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    #[must_use]
    pub fn disambiguous(mut self) -> Self {
        self.disambiguous = true;
        self
    }

    /// Field-wise merge where fields set on `other` override `self`.
    #[must_use]
    pub fn merge(self, other: CommandDescriptor) -> Self {
        Self {
            name: if other.name.is_empty() {
                self.name
            } else {
                other.name
            },
            version: other.version.or(self.version),
            description: other.description.or(self.description),
            example: other.example.or(self.example),
            subcommands: if other.subcommands.is_empty() {
                self.subcommands
            } else {
                other.subcommands
            },
            permissions: if other.permissions.is_empty() {
                self.permissions
            } else {
                other.permissions
            },
            disambiguous: self.disambiguous || other.disambiguous,
        }
    }
}

/// One positional argument of an overload.
#[derive(Clone, Debug)]
pub struct ArgumentSpec {
    pub name: String,
    pub value_type: ValueType,
    /// Validator for the position. `None` makes the position a wildcard.
    pub pattern: Option<Regex>,
    pub delimiter: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub example: Option<String>,
}

impl ArgumentSpec {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            pattern: None,
            delimiter: None,
            required: false,
            default: None,
            description: None,
            example: None,
        }
    }

    #[must_use]
    pub fn matching(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Some(delimiter.to_string());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// Source of the match expression, empty for a wildcard position.
    #[must_use]
    pub fn pattern_source(&self) -> &str {
        self.pattern.as_ref().map_or("", Regex::as_str)
    }
}

/// The declared shape of one argument overload.
#[derive(Clone, Debug, Default)]
pub struct ArgumentsDescriptor {
    pub arguments: Vec<ArgumentSpec>,
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
}

impl ArgumentsDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

pub type ArgumentTarget =
    Arc<dyn Fn(&mut dyn Any, &Invocation<'_>, &[String]) -> TargetResult + Send + Sync>;

/// A registered argument overload: its shape plus the bound target.
#[derive(Clone)]
pub struct ArgumentOverload {
    pub descriptor: ArgumentsDescriptor,
    pub(crate) target: ArgumentTarget,
}

impl ArgumentOverload {
    pub fn new<C, F>(descriptor: ArgumentsDescriptor, target: F) -> Self
    where
        C: Command,
        F: Fn(&mut C, &Invocation<'_>, &[String]) -> TargetResult + Send + Sync + 'static,
    {
        let target: ArgumentTarget = Arc::new(
            move |instance: &mut dyn Any, invocation: &Invocation<'_>, arguments: &[String]| {
                match instance.downcast_mut::<C>() {
                    Some(command) => target(command, invocation, arguments),
                    None => Err(instance_mismatch::<C>()),
                }
            },
        );

        Self { descriptor, target }
    }
}

impl Debug for ArgumentOverload {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ArgumentOverload")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A long flag bound to a field of the command.
#[derive(Clone, Debug)]
pub struct OptionSpec {
    /// Field the value is written to, also the default source of `name`.
    pub target: String,
    pub name: Option<String>,
    pub shorthand: Option<String>,
    pub value_type: ValueType,
    pub delimiter: Option<String>,
    /// Environment variables consulted in order when no flag is given.
    pub env: Vec<String>,
    pub description: Option<String>,
}

impl OptionSpec {
    pub fn new(target: &str, value_type: ValueType) -> Self {
        Self {
            target: target.to_string(),
            name: None,
            shorthand: None,
            value_type,
            delimiter: None,
            env: Vec::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn shorthand(mut self, shorthand: char) -> Self {
        self.shorthand = Some(shorthand.to_string());
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Some(delimiter.to_string());
        self
    }

    #[must_use]
    pub fn env(mut self, variable: &str) -> Self {
        self.env.push(variable.to_string());
        self
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Long flag name, derived from the target field when unset.
    #[must_use]
    pub fn long_name(&self) -> String {
        resolve_name(&self.target, self.name.as_deref())
    }
}

pub type FieldSetter = Arc<dyn Fn(&mut dyn Any, Value) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum OptionSetter {
    Builtin(fn(&mut BuiltinOptions, bool)),
    Field(FieldSetter),
}

/// A registered option: its spec plus how the value is stored.
#[derive(Clone)]
pub struct OptionBinding {
    pub spec: OptionSpec,
    pub(crate) setter: OptionSetter,
}

impl OptionBinding {
    pub fn new<C, F>(spec: OptionSpec, setter: F) -> Self
    where
        C: Command,
        F: Fn(&mut C, Value) + Send + Sync + 'static,
    {
        let setter: FieldSetter = Arc::new(move |instance: &mut dyn Any, value: Value| {
            if let Some(command) = instance.downcast_mut::<C>() {
                setter(command, value);
            }
        });

        Self {
            spec,
            setter: OptionSetter::Field(setter),
        }
    }

    pub(crate) fn builtin(
        name: &str,
        shorthand: char,
        description: &str,
        setter: fn(&mut BuiltinOptions, bool),
    ) -> Self {
        Self {
            spec: OptionSpec::new(name, ValueType::Boolean)
                .shorthand(shorthand)
                .description(description),
            setter: OptionSetter::Builtin(setter),
        }
    }

    pub(crate) fn apply(
        &self,
        instance: &mut dyn Any,
        builtins: &mut BuiltinOptions,
        value: Value,
    ) {
        match &self.setter {
            OptionSetter::Builtin(set) => set(builtins, value.is_truthy()),
            OptionSetter::Field(set) => set(instance, value),
        }
    }
}

impl Debug for OptionBinding {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OptionBinding")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

pub type Predicate = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// When a fallback handler applies and what it needs.
#[derive(Clone, Default)]
pub struct HandlerDescriptor {
    pub when: Option<Predicate>,
    pub permissions: Vec<Permission>,
}

impl HandlerDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn when<C, F>(mut self, predicate: F) -> Self
    where
        C: Command,
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(move |instance: &dyn Any| {
            instance.downcast_ref::<C>().is_some_and(&predicate)
        }));
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Whether this handler accepts the live instance.
    #[must_use]
    pub fn accepts(&self, instance: &dyn Any) -> bool {
        self.when.as_ref().map_or(true, |when| when(instance))
    }
}

impl Debug for HandlerDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HandlerDescriptor")
            .field("conditional", &self.when.is_some())
            .field("permissions", &self.permissions)
            .finish()
    }
}

pub type HandlerTarget = Arc<dyn Fn(&mut dyn Any, &Invocation<'_>) -> TargetResult + Send + Sync>;

/// A registered fallback handler.
#[derive(Clone)]
pub struct Handler {
    pub descriptor: HandlerDescriptor,
    pub(crate) target: HandlerTarget,
}

impl Handler {
    pub fn new<C, F>(descriptor: HandlerDescriptor, target: F) -> Self
    where
        C: Command,
        F: Fn(&mut C, &Invocation<'_>) -> TargetResult + Send + Sync + 'static,
    {
        let target: HandlerTarget = Arc::new(
            move |instance: &mut dyn Any, invocation: &Invocation<'_>| match instance
                .downcast_mut::<C>()
            {
                Some(command) => target(command, invocation),
                None => Err(instance_mismatch::<C>()),
            },
        );

        Self { descriptor, target }
    }
}

impl Debug for Handler {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Handler")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

fn instance_mismatch<C: Command>() -> TargetError {
    format!(
        "target expected an instance of `{}`",
        std::any::type_name::<C>()
    )
    .into()
}
