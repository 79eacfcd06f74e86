//! Keyed store of everything declared about each command type.
//!
//! Registration is additive and validated before it is committed. The first
//! resolution freezes the registry, after which it is read-only.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::debug;

use crate::command_definitions::{
    ArgumentOverload, ArgumentsDescriptor, Command, CommandDescriptor, CommandType, Handler,
    HandlerDescriptor, OptionBinding, OptionSpec, TargetResult,
};
use crate::error::RegistrationError;
use crate::naming::resolve_name;
use crate::runtime::Invocation;
use crate::validation::validate;
use crate::value::Value;

/// Everything registered for one command type.
#[derive(Clone, Debug, Default)]
pub struct CommandEntry {
    pub descriptor: CommandDescriptor,
    pub options: Vec<OptionBinding>,
    pub overloads: Vec<ArgumentOverload>,
    pub handlers: Vec<Handler>,
}

/// One registration call. `Command` merges into the descriptor, the other
/// kinds append to their list.
#[derive(Debug)]
pub enum Registration {
    Command(CommandDescriptor),
    Option(OptionBinding),
    Arguments(ArgumentOverload),
    Handler(Handler),
}

#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<TypeId, Arc<CommandEntry>>>,
    frozen: AtomicBool,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Typed declaration helper for `C`.
    #[must_use]
    pub fn declare<C: Command>(&self) -> Declaration<'_, C> {
        Declaration {
            registry: self,
            command: PhantomData,
        }
    }

    /// Validates and commits one registration for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Frozen`] once resolution has started, or
    /// the validation failure the registration would introduce. A rejected
    /// registration leaves the registry unchanged.
    pub fn register(
        &self,
        command: CommandType,
        registration: Registration,
    ) -> Result<(), RegistrationError> {
        if self.is_frozen() {
            return Err(RegistrationError::Frozen {
                command: command.type_name().to_string(),
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = entries
            .get(&command.id())
            .map(|entry| CommandEntry::clone(entry))
            .unwrap_or_default();

        let renames_command = matches!(registration, Registration::Command(_));
        match registration {
            Registration::Command(descriptor) => {
                let mut merged = candidate.descriptor.merge(descriptor);
                merged.name = resolve_name(command.type_name(), Some(merged.name.as_str()));
                candidate.descriptor = merged;
            }
            Registration::Option(binding) => candidate.options.push(binding),
            Registration::Arguments(overload) => candidate.overloads.push(overload),
            Registration::Handler(handler) => candidate.handlers.push(handler),
        }

        let name_of = |subcommand: &CommandType| {
            if subcommand.id() == command.id() {
                return resolved_name(subcommand, Some(&candidate));
            }
            resolved_name(subcommand, entries.get(&subcommand.id()).map(Arc::as_ref))
        };

        let command_name = resolved_name(&command, Some(&candidate));
        validate(&command_name, &candidate, &name_of)?;

        if renames_command {
            // Parents see this command's name, so they need another look
            for parent in entries.values() {
                if parent
                    .descriptor
                    .subcommands
                    .iter()
                    .any(|subcommand| subcommand.id() == command.id())
                {
                    validate(&parent.descriptor.name, parent, &name_of)?;
                }
            }
        }

        debug!("Registered declaration for `{command_name}`");
        entries.insert(command.id(), Arc::new(candidate));
        Ok(())
    }

    /// Everything registered for `command`, or an empty entry.
    #[must_use]
    pub fn entry(&self, command: &CommandType) -> Arc<CommandEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command.id())
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn descriptor(&self, command: &CommandType) -> CommandDescriptor {
        self.entry(command).descriptor.clone()
    }

    #[must_use]
    pub fn options(&self, command: &CommandType) -> Vec<OptionBinding> {
        self.entry(command).options.clone()
    }

    #[must_use]
    pub fn overloads(&self, command: &CommandType) -> Vec<ArgumentOverload> {
        self.entry(command).overloads.clone()
    }

    #[must_use]
    pub fn handlers(&self, command: &CommandType) -> Vec<Handler> {
        self.entry(command).handlers.clone()
    }

    /// Public name of `command`: its declared name, or its kebab-cased type name.
    #[must_use]
    pub fn name_of(&self, command: &CommandType) -> String {
        resolved_name(command, Some(self.entry(command).as_ref()))
    }

    /// Marks the registry read-only. Called when the first resolution begins.
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            debug!("Command registry frozen");
        }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

fn resolved_name(command: &CommandType, entry: Option<&CommandEntry>) -> String {
    match entry {
        Some(entry) if !entry.descriptor.name.is_empty() => entry.descriptor.name.clone(),
        _ => command.default_name(),
    }
}

/// Chained, typed registration calls for one command type.
///
/// ```
/// use cmdroute_core::command_definitions::{Command, CommandDescriptor, HandlerDescriptor};
/// use cmdroute_core::registry::Registry;
/// use cmdroute_core::runtime::RunContext;
///
/// struct Status;
///
/// impl Command for Status {
///     fn create(_context: &RunContext) -> Self {
///         Status
///     }
/// }
///
/// let registry = Registry::new();
/// registry
///     .declare::<Status>()
///     .command(CommandDescriptor::new("status").description("Show status"))?
///     .handler(HandlerDescriptor::new(), |_status, _invocation| {
///         println!("all good");
///         Ok(())
///     })?;
/// # Ok::<(), cmdroute_core::error::RegistrationError>(())
/// ```
pub struct Declaration<'r, C> {
    registry: &'r Registry,
    command: PhantomData<fn() -> C>,
}

impl<C> Clone for Declaration<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Declaration<'_, C> {}

impl<C> fmt::Debug for Declaration<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("command", &std::any::type_name::<C>())
            .finish_non_exhaustive()
    }
}

impl<'r, C: Command> Declaration<'r, C> {
    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn command(self, descriptor: CommandDescriptor) -> Result<Self, RegistrationError> {
        self.register(Registration::Command(descriptor))
    }

    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn option<F>(self, spec: OptionSpec, setter: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut C, Value) + Send + Sync + 'static,
    {
        self.register(Registration::Option(OptionBinding::new(spec, setter)))
    }

    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn arguments<F>(
        self,
        descriptor: ArgumentsDescriptor,
        target: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut C, &Invocation<'_>, &[String]) -> TargetResult + Send + Sync + 'static,
    {
        self.register(Registration::Arguments(ArgumentOverload::new(
            descriptor, target,
        )))
    }

    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn handler<F>(self, descriptor: HandlerDescriptor, target: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut C, &Invocation<'_>) -> TargetResult + Send + Sync + 'static,
    {
        self.register(Registration::Handler(Handler::new(descriptor, target)))
    }

    fn register(self, registration: Registration) -> Result<Self, RegistrationError> {
        self.registry
            .register(CommandType::of::<C>(), registration)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;
    use crate::command_definitions::ArgumentSpec;
    use crate::runtime::RunContext;
    use crate::value::ValueType;

    struct Root;
    struct Build;
    struct Builder;

    macro_rules! plain_command {
        ($($name:ident),*) => {
            $(impl Command for $name {
                fn create(_context: &RunContext) -> Self {
                    $name
                }
            })*
        };
    }

    plain_command!(Root, Build, Builder);

    fn digits() -> ArgumentsDescriptor {
        ArgumentsDescriptor::new()
            .argument(ArgumentSpec::new("id", ValueType::Number).matching(Regex::new(r"^\d+$").unwrap()))
    }

    #[test]
    fn test_declaration_debug_names_command() {
        let registry = Registry::new();
        let declaration = registry.declare::<Build>();

        let shown = format!("{declaration:?}");
        assert!(shown.starts_with("Declaration"));
        assert!(shown.contains("Build"));
    }

    #[test]
    fn test_get_on_unregistered_type_is_empty() {
        let registry = Registry::new();
        let root = CommandType::of::<Root>();

        assert!(registry.descriptor(&root).name.is_empty());
        assert!(registry.options(&root).is_empty());
        assert!(registry.overloads(&root).is_empty());
        assert!(registry.handlers(&root).is_empty());
        assert_eq!(registry.name_of(&root), "root");
    }

    #[test]
    fn test_registrations_append_and_merge() {
        let registry = Registry::new();
        registry
            .declare::<Root>()
            .command(CommandDescriptor::new("tool").description("A tool"))
            .unwrap()
            .command(CommandDescriptor::new("").version("1.2.3"))
            .unwrap()
            .arguments(digits(), |_, _, _| Ok(()))
            .unwrap()
            .handler(HandlerDescriptor::new(), |_, _| Ok(()))
            .unwrap()
            .handler(HandlerDescriptor::new(), |_, _| Ok(()))
            .unwrap();

        let root = CommandType::of::<Root>();
        let descriptor = registry.descriptor(&root);
        assert_eq!(descriptor.name, "tool");
        assert_eq!(descriptor.description.as_deref(), Some("A tool"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
        assert_eq!(registry.overloads(&root).len(), 1);
        assert_eq!(registry.handlers(&root).len(), 2);
    }

    #[test]
    fn test_rejected_registration_is_not_committed() {
        let registry = Registry::new();
        let root = registry.declare::<Root>();
        root.arguments(digits(), |_, _, _| Ok(())).unwrap();

        let error = root.arguments(digits(), |_, _, _| Ok(())).unwrap_err();
        assert!(matches!(error, RegistrationError::AmbiguousOverloads { .. }));
        assert_eq!(registry.overloads(&CommandType::of::<Root>()).len(), 1);
    }

    #[test]
    fn test_renaming_a_subcommand_revalidates_its_parent() {
        let registry = Registry::new();
        registry
            .declare::<Root>()
            .command(
                CommandDescriptor::new("root")
                    .subcommand::<Build>()
                    .subcommand::<Builder>(),
            )
            .unwrap();
        registry
            .declare::<Build>()
            .command(CommandDescriptor::new("build"))
            .unwrap();

        let error = registry
            .declare::<Builder>()
            .command(CommandDescriptor::new("build"))
            .unwrap_err();
        assert_eq!(
            error,
            RegistrationError::DuplicateSubcommand {
                command: "root".to_string(),
                name: "build".to_string(),
            }
        );
    }

    #[test]
    fn test_overload_registered_after_subcommand_is_checked() {
        let registry = Registry::new();
        registry
            .declare::<Build>()
            .command(CommandDescriptor::new("build"))
            .unwrap();
        registry
            .declare::<Root>()
            .command(CommandDescriptor::new("root").subcommand::<Build>())
            .unwrap();

        let swallowing = ArgumentsDescriptor::new().argument(
            ArgumentSpec::new("name", ValueType::String).matching(Regex::new("^[a-z]+$").unwrap()),
        );
        let error = registry
            .declare::<Root>()
            .arguments(swallowing, |_, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(
            error,
            RegistrationError::OverloadShadowsSubcommand { .. }
        ));
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let registry = Registry::new();
        registry
            .declare::<Root>()
            .command(CommandDescriptor::new("root"))
            .unwrap();
        registry.freeze();

        let error = registry
            .declare::<Root>()
            .handler(HandlerDescriptor::new(), |_, _| Ok(()))
            .unwrap_err();
        assert_eq!(
            error,
            RegistrationError::Frozen {
                command: "Root".to_string()
            }
        );
        assert!(registry.handlers(&CommandType::of::<Root>()).is_empty());
    }
}
