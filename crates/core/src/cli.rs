//! Root entry point: checks the CLI name, finds the top-level command and
//! hands over to a [`CommandRuntime`].

use std::sync::Arc;

use log::{debug, error, warn};

use crate::argv::{parse, ParsedArgs};
use crate::binding::{EnvSource, ProcessEnv, Props};
use crate::capability::{Capability, CapabilityProvider, GrantAll};
use crate::command_definitions::{Command, CommandType, Permission};
use crate::error::Result;
use crate::help::{HelpData, HelpKind, HelpRenderer, TextRenderer};
use crate::registry::Registry;
use crate::resolver::suggest;
use crate::runtime::{CommandRuntime, Outcome, RunContext};
use crate::value::Value;

/// Static description of a CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub title: String,
    /// Entry token the first path element has to match.
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub commands: Vec<CommandType>,
    /// Required by every command of the CLI.
    pub permissions: Vec<Capability>,
}

impl CliConfig {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn command<C: Command>(mut self) -> Self {
        self.commands.push(CommandType::of::<C>());
        self
    }

    #[must_use]
    pub fn permission(mut self, capability: Capability) -> Self {
        self.permissions.push(capability);
        self
    }
}

/// A runnable CLI: its config plus the collaborators used while routing.
///
/// Defaults are the global registry, a provider that grants everything, the
/// process environment and a text renderer on stdout.
pub struct Cli<'a> {
    config: Arc<CliConfig>,
    registry: &'a Registry,
    provider: Box<dyn CapabilityProvider + 'a>,
    env: Box<dyn EnvSource + 'a>,
    renderer: Box<dyn HelpRenderer + 'a>,
}

impl<'a> Cli<'a> {
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Registry::global(),
            provider: Box::new(GrantAll),
            env: Box::new(ProcessEnv),
            renderer: Box::new(TextRenderer::stdout()),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: &'a Registry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl CapabilityProvider + 'a) -> Self {
        self.provider = Box::new(provider);
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: impl EnvSource + 'a) -> Self {
        self.env = Box::new(env);
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl HelpRenderer + 'a) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Routes `args`, where the first path token names the CLI.
    ///
    /// # Errors
    ///
    /// Permission denial, failing targets and renderer output errors.
    /// Everything else is rendered and reported through the [`Outcome`].
    pub fn run<S: AsRef<str>>(&mut self, args: &[S]) -> Result<Outcome> {
        self.registry.freeze();

        let ParsedArgs {
            path,
            positional,
            flags,
        } = parse(args);
        let name = self.config.name.clone();

        let Some(entry) = path.first() else {
            return self.usage_error(format!(
                "Entry command matching CLI \"{name}\" was not provided."
            ));
        };

        if !name.contains(entry.as_str()) {
            return self.usage_error(format!(
                "Entry command \"{entry}\" doesn't match CLI \"{name}\"."
            ));
        }

        let Some(token) = path.get(1) else {
            return self.without_command(&flags);
        };

        let names: Vec<(CommandType, String)> = self
            .config
            .commands
            .iter()
            .map(|command| (*command, self.registry.name_of(command)))
            .collect();
        let lowered = token.to_lowercase();
        let matching: Vec<&(CommandType, String)> = names
            .iter()
            .filter(|(_, name)| name.to_lowercase().starts_with(&lowered))
            .collect();

        let (command, command_name) = match matching.as_slice() {
            [(command, command_name)] => (*command, command_name.clone()),
            [] => {
                let all: Vec<String> = names.iter().map(|(_, name)| name.clone()).collect();
                let help = HelpData::for_root(HelpKind::Usage, &self.config, self.registry)
                    .message(format!("No commands matching \"{token}\" found in CLI \"{name}\"."))
                    .suggestions(suggest(token, &all));
                warn!("No top-level command matches `{token}`");
                self.renderer.render(&help)?;
                return Ok(Outcome::UsageError);
            }
            several => {
                let candidates: Vec<String> =
                    several.iter().map(|(_, name)| name.clone()).collect();
                let help = HelpData::for_root(HelpKind::Usage, &self.config, self.registry)
                    .message(format!(
                        "Multiple commands match \"{token}\" in CLI \"{name}\": {}.",
                        candidates.join(", ")
                    ))
                    .suggestions(candidates);
                warn!("Several top-level commands match `{token}`");
                self.renderer.render(&help)?;
                return Ok(Outcome::Ambiguous);
            }
        };

        let permissions = self
            .config
            .permissions
            .iter()
            .cloned()
            .map(Permission::Static)
            .chain(self.registry.descriptor(&command).permissions)
            .collect();

        let context = RunContext {
            cli: Arc::clone(&self.config),
            resolved_path: format!("{name} {command_name}"),
            exec_path: format!("{entry} {token}"),
            rest_path: path[1..].to_vec(),
            props: Arc::new(flags),
            positional: Arc::new(positional),
            permissions,
        };
        debug!("Running top-level command `{}`", context.resolved_path);

        CommandRuntime::new(
            self.registry,
            &*self.provider,
            &*self.env,
            &mut *self.renderer,
        )
        .run(command, context)
    }

    /// Like [`Cli::run`], but exits the process on error with the error's
    /// status, 5 for a permission denial.
    pub fn run_or_exit<S: AsRef<str>>(&mut self, args: &[S]) -> Outcome {
        match failure_status(self.run(args)) {
            Ok(outcome) => outcome,
            Err(status) => std::process::exit(i32::from(status)),
        }
    }

    fn without_command(&mut self, flags: &Props) -> Result<Outcome> {
        let enabled = |name: &str| flags.get(name).is_some_and(Value::is_truthy);

        let shortcut = if enabled("help") {
            Some((HelpKind::Usage, Outcome::Help))
        } else if enabled("version") {
            Some((HelpKind::Version, Outcome::Version))
        } else if enabled("example") {
            Some((HelpKind::Examples, Outcome::Examples))
        } else {
            None
        };

        match shortcut {
            Some((kind, outcome)) => {
                let help = HelpData::for_root(kind, &self.config, self.registry);
                self.renderer.render(&help)?;
                Ok(outcome)
            }
            None => self.usage_error(format!(
                "No command for CLI \"{}\" was provided.",
                self.config.name
            )),
        }
    }

    fn usage_error(&mut self, message: String) -> Result<Outcome> {
        warn!("{message}");
        let help =
            HelpData::for_root(HelpKind::Usage, &self.config, self.registry).message(message);
        self.renderer.render(&help)?;
        Ok(Outcome::UsageError)
    }
}

/// Reports a failed run and returns the status to exit with.
fn failure_status(result: Result<Outcome>) -> std::result::Result<Outcome, u8> {
    result.map_err(|e| {
        error!("{e}");
        eprintln!("{e}");
        e.exit_code()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_definitions::{CommandDescriptor, HandlerDescriptor};
    use crate::help::MemoryRenderer;

    struct Status;
    struct Stop;

    impl Command for Status {
        fn create(_context: &RunContext) -> Self {
            Status
        }
    }

    impl Command for Stop {
        fn create(_context: &RunContext) -> Self {
            Stop
        }
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .declare::<Status>()
            .command(CommandDescriptor::new("status"))
            .unwrap()
            .handler(HandlerDescriptor::new(), |_, _| Ok(()))
            .unwrap();
        registry
            .declare::<Stop>()
            .command(CommandDescriptor::new("stop"))
            .unwrap();
        registry
    }

    fn config() -> CliConfig {
        CliConfig::new("svc", "Service control")
            .version("2.0.0")
            .command::<Status>()
            .command::<Stop>()
    }

    fn run(args: &[&str]) -> (Outcome, MemoryRenderer) {
        let registry = registry();
        let mut renderer = MemoryRenderer::new();
        let outcome = Cli::new(config())
            .with_registry(&registry)
            .with_renderer(&mut renderer)
            .run(args)
            .unwrap();
        (outcome, renderer)
    }

    #[test]
    fn test_missing_entry_is_usage_error() {
        let (outcome, renderer) = run(&[]);

        assert_eq!(outcome, Outcome::UsageError);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(
            renderer.last().unwrap().message.as_deref(),
            Some("Entry command matching CLI \"svc\" was not provided.")
        );
    }

    #[test]
    fn test_wrong_entry_is_usage_error() {
        let (outcome, renderer) = run(&["other", "status"]);

        assert_eq!(outcome, Outcome::UsageError);
        assert!(renderer.last().unwrap().message.as_deref().unwrap().contains("doesn't match"));
    }

    #[test]
    fn test_missing_command_is_usage_error() {
        let (outcome, _) = run(&["svc"]);
        assert_eq!(outcome, Outcome::UsageError);
    }

    #[test]
    fn test_help_without_command_renders_root_help() {
        let (outcome, renderer) = run(&["svc", "--help"]);

        assert_eq!(outcome, Outcome::Help);
        let help = renderer.last().unwrap();
        assert!(help.message.is_none());
        assert_eq!(help.subcommands.len(), 2);
    }

    #[test]
    fn test_version_without_command() {
        let (outcome, renderer) = run(&["svc", "-v"]);

        assert_eq!(outcome, Outcome::Version);
        assert_eq!(renderer.last().unwrap().version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_shared_prefix_is_ambiguous() {
        let (outcome, renderer) = run(&["svc", "st"]);

        assert_eq!(outcome, Outcome::Ambiguous);
        assert_eq!(renderer.last().unwrap().suggestions, vec!["status", "stop"]);
    }

    #[test]
    fn test_unknown_command_suggests() {
        let (outcome, renderer) = run(&["svc", "stp"]);

        assert_eq!(outcome, Outcome::UsageError);
        assert!(renderer.last().unwrap().suggestions.contains(&"stop".to_string()));
    }

    #[test]
    fn test_unique_prefix_runs_command() {
        let (outcome, renderer) = run(&["svc", "sta"]);

        assert_eq!(outcome, Outcome::Executed);
        assert!(renderer.rendered.is_empty());
    }

    #[test]
    fn test_failure_status_uses_error_exit_code() {
        let denied = Err(crate::error::Error::PermissionDenied(Capability::env("HOME")));
        assert_eq!(failure_status(denied), Err(5));

        assert_eq!(failure_status(Ok(Outcome::Executed)), Ok(Outcome::Executed));
    }
}
