//! Per-command execution: bind, shortcut, resolve, then descend or invoke.

use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use crossterm::style::Stylize;
use log::{debug, warn};

use crate::binding::{builtin_options, EnvSource, OptionBinder, Props};
use crate::capability::{Capability, CapabilityProvider};
use crate::cli::CliConfig;
use crate::command_definitions::{CommandType, Permission};
use crate::error::{Error, Result, USAGE_EXIT_CODE};
use crate::help::{HelpData, HelpKind, HelpRenderer};
use crate::permissions::PermissionNegotiator;
use crate::registry::{CommandEntry, Registry};
use crate::resolver::{resolve, Resolution};

/// State handed to a command for one step of the path.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cli: Arc<CliConfig>,
    /// Declared names from the CLI down to this command, space separated.
    pub resolved_path: String,
    /// Tokens as typed from the CLI down to this command.
    pub exec_path: String,
    /// This command's token followed by everything not yet consumed.
    pub rest_path: Vec<String>,
    pub props: Arc<Props>,
    /// Tokens after `--`.
    pub positional: Arc<Vec<String>>,
    /// Requirements collected from the CLI and every command on the way here,
    /// this command's own included.
    pub permissions: Vec<Permission>,
}

impl RunContext {
    /// Tokens after this command's own token.
    #[must_use]
    pub fn remaining_path(&self) -> &[String] {
        self.rest_path.get(1..).unwrap_or_default()
    }
}

/// Values of the five options every command understands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinOptions {
    pub help: bool,
    pub verbose: bool,
    pub debug: bool,
    pub version: bool,
    pub example: bool,
}

/// What a target receives besides its own instance.
pub struct Invocation<'a> {
    pub context: &'a RunContext,
    pub options: BuiltinOptions,
    /// False when some declared option had no value from any source.
    pub options_valid: bool,
    env: &'a dyn EnvSource,
    negotiator: &'a PermissionNegotiator<'a>,
}

impl Invocation<'_> {
    /// Reads `name` from the run's environment once `env` access to it is held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when access stays denied.
    pub fn env_var(&self, name: &str) -> Result<Option<String>> {
        self.negotiator.check_capability(&Capability::env(name))?;
        Ok(self.env.var(name))
    }

    /// Prints `message` only when `--verbose` is set.
    pub fn log_verbose(&self, message: &str) {
        if self.options.verbose {
            println!("{} {}", "[verbose]".dark_grey(), message.dark_grey());
        }
    }

    /// Runs `action`, or only describes it when `--debug` is set.
    pub fn debug_action<T>(&self, message: &str, action: impl FnOnce() -> T) -> Option<T> {
        if self.options.debug {
            println!("{} {}", "[debug]".yellow(), message.yellow());
            None
        } else {
            Some(action())
        }
    }

    /// Prints label/value pairs with the values aligned.
    pub fn log_labels(&self, items: &[(&str, &dyn Display)]) {
        for line in format_labels(items) {
            println!("{line}");
        }
    }
}

/// Aligns values two columns after the longest label.
#[must_use]
pub fn format_labels(items: &[(&str, &dyn Display)]) -> Vec<String> {
    let width = items.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    items
        .iter()
        .map(|(label, value)| format!("{label:<width$}  {value}", width = width))
        .collect()
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Executed,
    Help,
    Version,
    Examples,
    /// Nothing matched the path. Help was shown with the offending token.
    Unresolved,
    /// Several subcommands matched and no handler accepted. Help was shown.
    Ambiguous,
    /// The path did not reach a command at all.
    UsageError,
}

impl Outcome {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Executed | Self::Help | Self::Version | Self::Examples => 0,
            Self::Unresolved | Self::Ambiguous | Self::UsageError => USAGE_EXIT_CODE,
        }
    }
}

pub struct CommandRuntime<'s> {
    registry: &'s Registry,
    negotiator: PermissionNegotiator<'s>,
    env: &'s dyn EnvSource,
    renderer: &'s mut dyn HelpRenderer,
}

impl<'s> CommandRuntime<'s> {
    pub fn new(
        registry: &'s Registry,
        provider: &'s dyn CapabilityProvider,
        env: &'s dyn EnvSource,
        renderer: &'s mut dyn HelpRenderer,
    ) -> Self {
        Self {
            registry,
            negotiator: PermissionNegotiator::new(provider),
            env,
            renderer,
        }
    }

    /// Runs `command` for `context`, descending into subcommands until a
    /// target runs or the path misses.
    ///
    /// # Errors
    ///
    /// Permission denial and target failures end the run. Path misses do not,
    /// they are rendered and reported through the [`Outcome`].
    pub fn run(&mut self, command: CommandType, context: RunContext) -> Result<Outcome> {
        self.registry.freeze();

        let entry = self.registry.entry(&command);
        let mut instance = command.instantiate(&context);
        let mut builtins = BuiltinOptions::default();

        let bindings: Vec<_> = entry.options.iter().cloned().chain(builtin_options()).collect();
        let binder = OptionBinder::new(self.env, &self.negotiator);
        let report = binder.bind(&bindings, &context.props, &mut *instance, &mut builtins)?;
        if !report.is_valid() {
            warn!(
                "Options were invalid for `{}`: no value for {}",
                context.resolved_path,
                report.missing.join(", ")
            );
        }

        let remaining = context.remaining_path();

        if remaining.is_empty() {
            let shortcut = if builtins.help {
                Some((HelpKind::Usage, Outcome::Help))
            } else if builtins.version {
                Some((HelpKind::Version, Outcome::Version))
            } else if builtins.example {
                Some((HelpKind::Examples, Outcome::Examples))
            } else {
                None
            };

            if let Some((kind, outcome)) = shortcut {
                self.render(self.help(kind, &command, &context))?;
                return Ok(outcome);
            }
        }

        match resolve(self.registry, &entry, remaining, &*instance) {
            Resolution::Subcommand(child) => {
                let child_context = self.child_context(&child, &context, &*instance);
                debug!("Descending into `{}`", child_context.resolved_path);
                drop(instance);
                self.run(child, child_context)
            }
            Resolution::Overload(index) => {
                let overload = &entry.overloads[index];

                if builtins.help {
                    let help = self.help(HelpKind::Usage, &command, &context).only_overload(index);
                    self.render(help)?;
                    return Ok(Outcome::Help);
                }

                self.negotiator.check(&context.permissions, &*instance)?;
                self.negotiator.check(&overload.descriptor.permissions, &*instance)?;

                let invocation = invocation(
                    &context,
                    self.env,
                    &self.negotiator,
                    builtins,
                    report.is_valid(),
                );
                debug!("Invoking overload {index} of `{}`", context.resolved_path);
                (overload.target)(&mut *instance, &invocation, remaining)
                    .map_err(|source| Error::target(&context.resolved_path, source))?;
                Ok(Outcome::Executed)
            }
            Resolution::Handler(index) => {
                let handler = &entry.handlers[index];

                self.negotiator.check(&context.permissions, &*instance)?;
                self.negotiator.check(&handler.descriptor.permissions, &*instance)?;

                if builtins.help {
                    self.render(self.help(HelpKind::Usage, &command, &context))?;
                    return Ok(Outcome::Help);
                }

                let invocation = invocation(
                    &context,
                    self.env,
                    &self.negotiator,
                    builtins,
                    report.is_valid(),
                );
                debug!("Invoking handler {index} of `{}`", context.resolved_path);
                (handler.target)(&mut *instance, &invocation)
                    .map_err(|source| Error::target(&context.resolved_path, source))?;
                Ok(Outcome::Executed)
            }
            Resolution::Ambiguous { token, candidates } => {
                warn!("Token `{token}` matches several subcommands: {candidates:?}");
                let help = self
                    .help(HelpKind::Usage, &command, &context)
                    .message(format!(
                        "Multiple subcommands match \"{token}\": {}.",
                        candidates.join(", ")
                    ))
                    .suggestions(candidates);
                self.render(help)?;
                Ok(Outcome::Ambiguous)
            }
            Resolution::Unresolved { token, suggestions } => {
                let token = token.unwrap_or_default();
                warn!("Nothing in `{}` matches `{token}`", context.resolved_path);
                let help = self
                    .help(HelpKind::Usage, &command, &context)
                    .message(format!(
                        "No subcommand, argument overload, or handler matching \"{token}\" was found."
                    ))
                    .suggestions(suggestions);
                self.render(help)?;
                Ok(Outcome::Unresolved)
            }
        }
    }

    /// Context for `child`. Requirements gathered so far are settled against
    /// this command's instance, then the child's own are added.
    fn child_context(
        &self,
        child: &CommandType,
        context: &RunContext,
        instance: &dyn Any,
    ) -> RunContext {
        let child_entry: Arc<CommandEntry> = self.registry.entry(child);
        let token = context.remaining_path().first().cloned().unwrap_or_default();

        let permissions = context
            .permissions
            .iter()
            .flat_map(|permission| permission.settle(instance))
            .chain(child_entry.descriptor.permissions.iter().cloned())
            .collect();

        RunContext {
            cli: Arc::clone(&context.cli),
            resolved_path: format!("{} {}", context.resolved_path, self.registry.name_of(child)),
            exec_path: format!("{} {token}", context.exec_path),
            rest_path: context.remaining_path().to_vec(),
            props: Arc::clone(&context.props),
            positional: Arc::clone(&context.positional),
            permissions,
        }
    }

    fn help(&self, kind: HelpKind, command: &CommandType, context: &RunContext) -> HelpData {
        HelpData::for_command(kind, &context.cli, self.registry, command, &context.resolved_path)
    }

    fn render(&mut self, help: HelpData) -> Result<()> {
        self.renderer.render(&help)
    }
}

fn invocation<'a>(
    context: &'a RunContext,
    env: &'a dyn EnvSource,
    negotiator: &'a PermissionNegotiator<'a>,
    options: BuiltinOptions,
    options_valid: bool,
) -> Invocation<'a> {
    Invocation {
        context,
        options,
        options_valid,
        env,
        negotiator,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::capability::{Capability, GrantAll, MemoryProvider, PermissionState};
    use crate::command_definitions::{
        ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor, HandlerDescriptor,
        OptionSpec,
    };
    use crate::help::MemoryRenderer;
    use crate::value::{Value, ValueType};

    #[derive(Default)]
    struct Files {
        root: String,
    }

    struct CopyFile;

    impl Command for Files {
        fn create(_context: &RunContext) -> Self {
            Self::default()
        }
    }

    impl Command for CopyFile {
        fn create(_context: &RunContext) -> Self {
            Self
        }
    }

    fn context(registry: &Registry, path: &[&str], props: Props) -> RunContext {
        RunContext {
            cli: Arc::new(CliConfig::new("fs", "File tools").command::<Files>()),
            resolved_path: "fs files".to_string(),
            exec_path: "fs files".to_string(),
            rest_path: path.iter().map(ToString::to_string).collect(),
            props: Arc::new(props),
            positional: Arc::new(Vec::new()),
            permissions: registry.descriptor(&CommandType::of::<Files>()).permissions,
        }
    }

    fn registry(calls: &'static Mutex<Vec<String>>) -> Registry {
        let registry = Registry::new();
        registry
            .declare::<Files>()
            .command(
                CommandDescriptor::new("files")
                    .subcommand::<CopyFile>()
                    .permission(Permission::from_fn(|files: &Files| {
                        vec![Capability::read(&files.root)]
                    })),
            )
            .unwrap()
            .option(OptionSpec::new("root", ValueType::String), |files, value| {
                files.root = value.to_string();
            })
            .unwrap();
        registry
            .declare::<CopyFile>()
            .command(CommandDescriptor::new("copy"))
            .unwrap()
            .arguments(
                ArgumentsDescriptor::new()
                    .argument(ArgumentSpec::new("from", ValueType::String).required())
                    .argument(ArgumentSpec::new("to", ValueType::String).required()),
                move |_, invocation, arguments| {
                    calls.lock().unwrap().push(format!(
                        "{} {}",
                        invocation.context.resolved_path,
                        arguments.join(" ")
                    ));
                    Ok(())
                },
            )
            .unwrap();
        registry
    }

    struct Shell;

    impl Command for Shell {
        fn create(_context: &RunContext) -> Self {
            Self
        }
    }

    #[test]
    fn test_handler_reads_env_from_run_source() {
        static SEEN: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let registry = Registry::new();
        registry
            .declare::<Shell>()
            .command(CommandDescriptor::new("shell"))
            .unwrap()
            .handler(HandlerDescriptor::new(), |_, invocation| {
                let shell = invocation.env_var("SHELL")?.unwrap_or_default();
                SEEN.lock().unwrap().push(shell);
                Ok(())
            })
            .unwrap();
        let env = HashMap::from([("SHELL".to_string(), "/bin/zsh".to_string())]);
        let provider = MemoryProvider::new().grant(Capability::env("SHELL"));
        let mut renderer = MemoryRenderer::new();
        let context = RunContext {
            cli: Arc::new(CliConfig::new("sh", "Shell tools").command::<Shell>()),
            resolved_path: "sh shell".to_string(),
            exec_path: "sh shell".to_string(),
            rest_path: vec!["shell".to_string()],
            props: Arc::new(Props::new()),
            positional: Arc::new(Vec::new()),
            permissions: Vec::new(),
        };

        let mut runtime = CommandRuntime::new(&registry, &provider, &env, &mut renderer);
        let outcome = runtime.run(CommandType::of::<Shell>(), context).unwrap();

        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(*SEEN.lock().unwrap(), vec!["/bin/zsh"]);
        assert_eq!(provider.request_count(), 0);
    }

    #[test]
    fn test_format_labels_aligns_values() {
        let lines = format_labels(&[("Name", &"ship"), ("Version", &"1.0")]);
        assert_eq!(lines, vec!["Name     ship", "Version  1.0"]);
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Executed.exit_code(), 0);
        assert_eq!(Outcome::Unresolved.exit_code(), USAGE_EXIT_CODE);
    }

    #[test]
    fn test_descends_and_invokes_overload() {
        static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let registry = registry(&CALLS);
        let mut renderer = MemoryRenderer::new();
        let env = HashMap::new();
        let mut runtime = CommandRuntime::new(&registry, &GrantAll, &env, &mut renderer);

        let outcome = runtime
            .run(
                CommandType::of::<Files>(),
                context(&registry, &["files", "copy", "a.txt", "b.txt"], Props::new()),
            )
            .unwrap();

        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(*CALLS.lock().unwrap(), vec!["fs files copy a.txt b.txt"]);
        assert!(registry.is_frozen());
    }

    #[test]
    fn test_parent_dynamic_permission_is_checked_with_parent_instance() {
        static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let registry = registry(&CALLS);
        let mut renderer = MemoryRenderer::new();
        let env = HashMap::new();
        let provider = MemoryProvider::new()
            .grant(Capability::read("/srv"))
            .answering([PermissionState::Denied; 3]);

        let mut props = Props::new();
        props.insert("root".to_string(), Value::from("/etc"));
        let mut runtime = CommandRuntime::new(&registry, &provider, &env, &mut renderer);
        let error = runtime
            .run(
                CommandType::of::<Files>(),
                context(&registry, &["files", "copy", "a", "b"], props),
            )
            .unwrap_err();

        assert!(matches!(error, Error::PermissionDenied(capability) if capability == Capability::read("/etc")));
        assert!(CALLS.lock().unwrap().is_empty());
    }

    #[test]
    fn test_help_with_no_path_renders_instead_of_resolving() {
        static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let registry = registry(&CALLS);
        let mut renderer = MemoryRenderer::new();
        let env = HashMap::new();

        let mut props = Props::new();
        props.insert("help".to_string(), Value::from(true));
        let outcome = CommandRuntime::new(&registry, &GrantAll, &env, &mut renderer)
            .run(CommandType::of::<Files>(), context(&registry, &["files"], props))
            .unwrap();

        assert_eq!(outcome, Outcome::Help);
        let help = renderer.last().unwrap();
        assert_eq!(help.kind, HelpKind::Usage);
        assert_eq!(help.subcommands[0].name, "copy");
    }

    #[test]
    fn test_unresolved_path_renders_message() {
        static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let registry = registry(&CALLS);
        let mut renderer = MemoryRenderer::new();
        let env = HashMap::new();

        let outcome = CommandRuntime::new(&registry, &GrantAll, &env, &mut renderer)
            .run(CommandType::of::<Files>(), context(&registry, &["files", "cpy"], Props::new()))
            .unwrap();

        assert_eq!(outcome, Outcome::Unresolved);
        let help = renderer.last().unwrap();
        assert!(help.message.as_deref().unwrap().contains("\"cpy\""));
        assert_eq!(help.suggestions, vec!["copy"]);
    }

    #[test]
    fn test_handler_with_help_renders_instead_of_invoking() {
        static HITS: Mutex<usize> = Mutex::new(0);
        let registry = Registry::new();
        registry
            .declare::<Files>()
            .handler(HandlerDescriptor::new(), |_, _| {
                *HITS.lock().unwrap() += 1;
                Ok(())
            })
            .unwrap();
        let mut renderer = MemoryRenderer::new();
        let env = HashMap::new();

        let mut props = Props::new();
        props.insert("help".to_string(), Value::from(true));
        let outcome = CommandRuntime::new(&registry, &GrantAll, &env, &mut renderer)
            .run(
                CommandType::of::<Files>(),
                context(&registry, &["files", "extra"], props),
            )
            .unwrap();

        assert_eq!(outcome, Outcome::Help);
        assert_eq!(*HITS.lock().unwrap(), 0);
    }
}
