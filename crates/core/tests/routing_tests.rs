//! Integration tests for cmdroute-core
//!
//! These tests declare small command trees and route complete command lines
//! through `Cli`, checking what ran, what was rendered and what was asked of
//! the capability provider.

use std::collections::HashMap;
use std::sync::Mutex;

use cmdroute_core::capability::{Capability, MemoryProvider, PermissionState};
use cmdroute_core::cli::{Cli, CliConfig};
use cmdroute_core::command_definitions::{
    ArgumentSpec, ArgumentsDescriptor, Command, CommandDescriptor, HandlerDescriptor, OptionSpec,
    Permission,
};
use cmdroute_core::error::{Error, RegistrationError, PERMISSION_DENIED_EXIT_CODE};
use cmdroute_core::help::{HelpKind, MemoryRenderer};
use cmdroute_core::registry::Registry;
use cmdroute_core::runtime::{Outcome, RunContext};
use cmdroute_core::value::ValueType;
use regex::Regex;

#[derive(Default)]
struct Project {
    name: String,
}

#[derive(Default)]
struct Build {
    release: bool,
}

#[derive(Default)]
struct Builder;

#[derive(Default)]
struct Export {
    out: String,
}

macro_rules! default_command {
    ($($name:ident),*) => {
        $(impl Command for $name {
            fn create(_context: &RunContext) -> Self {
                Self::default()
            }
        })*
    };
}

default_command!(Project, Build, Builder, Export);

fn config() -> CliConfig {
    CliConfig::new("proj", "Project tool")
        .version("1.0.0")
        .command::<Project>()
}

fn declare(registry: &Registry, disambiguous: bool, calls: &'static Mutex<Vec<String>>) {
    let descriptor = CommandDescriptor::new("project")
        .subcommand::<Build>()
        .subcommand::<Builder>()
        .subcommand::<Export>();
    let descriptor = if disambiguous {
        descriptor.disambiguous()
    } else {
        descriptor
    };

    registry
        .declare::<Project>()
        .command(descriptor)
        .unwrap()
        .option(
            OptionSpec::new("name", ValueType::String)
                .shorthand('n')
                .env("PROJECT_NAME")
                .env("FALLBACK_NAME"),
            |project, value| project.name = value.to_string(),
        )
        .unwrap()
        .arguments(
            ArgumentsDescriptor::new().argument(
                ArgumentSpec::new("id", ValueType::Number)
                    .required()
                    .matching(Regex::new(r"^\d+$").unwrap()),
            ),
            move |project, _, arguments| {
                calls
                    .lock()
                    .unwrap()
                    .push(format!("project {} {}", project.name, arguments[0]));
                Ok(())
            },
        )
        .unwrap()
        .handler(HandlerDescriptor::new(), move |project, _| {
            calls
                .lock()
                .unwrap()
                .push(format!("project handler {}", project.name));
            Ok(())
        })
        .unwrap();

    registry
        .declare::<Build>()
        .command(CommandDescriptor::new("build").version("2.1.0"))
        .unwrap()
        .option(OptionSpec::new("release", ValueType::Boolean), |build, value| {
            build.release = value.is_truthy();
        })
        .unwrap()
        .handler(HandlerDescriptor::new(), move |build, invocation| {
            calls.lock().unwrap().push(format!(
                "{} release={}",
                invocation.context.resolved_path, build.release
            ));
            Ok(())
        })
        .unwrap();

    registry
        .declare::<Builder>()
        .command(CommandDescriptor::new("builder"))
        .unwrap()
        .handler(HandlerDescriptor::new(), move |_, invocation| {
            calls
                .lock()
                .unwrap()
                .push(invocation.context.resolved_path.clone());
            Ok(())
        })
        .unwrap();

    registry
        .declare::<Export>()
        .command(CommandDescriptor::new("export").permission(Permission::from_fn(
            |export: &Export| vec![Capability::write(&export.out)],
        )))
        .unwrap()
        .option(OptionSpec::new("out", ValueType::String), |export, value| {
            export.out = value.to_string();
        })
        .unwrap()
        .handler(HandlerDescriptor::new(), move |export, _| {
            calls.lock().unwrap().push(format!("export {}", export.out));
            Ok(())
        })
        .unwrap();
}

fn route(
    registry: &Registry,
    args: &[&str],
    env: HashMap<String, String>,
    provider: &MemoryProvider,
) -> (cmdroute_core::error::Result<Outcome>, MemoryRenderer) {
    let mut renderer = MemoryRenderer::new();
    let outcome = Cli::new(config())
        .with_registry(registry)
        .with_env(env)
        .with_provider(provider)
        .with_renderer(&mut renderer)
        .run(args);
    (outcome, renderer)
}

fn granting() -> MemoryProvider {
    MemoryProvider::new().answering([PermissionState::Granted; 16])
}

/// Test that identical overloads are rejected when declared
#[test]
fn test_identical_overloads_fail_before_resolution() {
    let registry = Registry::new();
    let overload = || {
        ArgumentsDescriptor::new()
            .argument(ArgumentSpec::new("a", ValueType::String))
            .argument(ArgumentSpec::new("b", ValueType::String))
    };

    let project = registry.declare::<Project>();
    project.arguments(overload(), |_, _, _| Ok(())).unwrap();
    let error = project.arguments(overload(), |_, _, _| Ok(())).unwrap_err();

    assert!(matches!(error, RegistrationError::AmbiguousOverloads { .. }));
    assert!(error.to_string().contains("fallthrough"));
}

/// Test that an overload swallowing a subcommand name is rejected
#[test]
fn test_overload_matching_subcommand_name_fails() {
    let registry = Registry::new();
    registry
        .declare::<Build>()
        .command(CommandDescriptor::new("build"))
        .unwrap();

    let error = registry
        .declare::<Project>()
        .command(CommandDescriptor::new("project").subcommand::<Build>())
        .unwrap()
        .arguments(
            ArgumentsDescriptor::new().argument(
                ArgumentSpec::new("word", ValueType::String).matching(Regex::new("^bu").unwrap()),
            ),
            |_, _, _| Ok(()),
        )
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Overlap of argument at position 0 and command \"build\" matching \"/^bu/\" in `project`."
    );
}

/// Test numeric overload selection and long name precedence
#[test]
fn test_overload_runs_with_long_name_over_shorthand() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, false, &CALLS);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "42", "--name", "x", "-n", "y"],
        HashMap::new(),
        &granting(),
    );

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["project x 42"]);
}

/// Test that a non-numeric token falls through to the handler
#[test]
fn test_non_matching_token_falls_back_to_handler() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, false, &CALLS);

    let (outcome, _) = route(&registry, &["proj", "project", "abc"], HashMap::new(), &granting());

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["project handler "]);
}

/// Test environment variables are consulted in declaration order
#[test]
fn test_second_env_variable_used_when_first_unset() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, false, &CALLS);
    let provider = granting();

    let env = HashMap::from([("FALLBACK_NAME".to_string(), "from-env".to_string())]);
    let (outcome, _) = route(&registry, &["proj", "project", "7"], env, &provider);

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["project from-env 7"]);
    // One request per variable read
    assert_eq!(provider.request_count(), 2);
}

/// Test a prefix shared by several subcommands falls back to the handler
#[test]
fn test_shared_prefix_falls_back_to_handler() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, false, &CALLS);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "bu"],
        HashMap::new(),
        &granting(),
    );

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["project handler "]);
}

/// Test tokens past the declared positions still select the overload
#[test]
fn test_extra_tokens_reach_overload() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, false, &CALLS);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "42", "extra"],
        HashMap::new(),
        &granting(),
    );

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["project  42"]);
}

/// Test disambiguous commands select the exact name
#[test]
fn test_disambiguous_selects_exact_subcommand() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, true, &CALLS);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "build", "--release"],
        HashMap::new(),
        &granting(),
    );

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["proj project build release=true"]);
}

/// Test that resolving the same path twice runs the same target
#[test]
fn test_same_path_resolves_to_same_target() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, true, &CALLS);

    for _ in 0..2 {
        let (outcome, _) = route(
            &registry,
            &["proj", "project", "builder"],
            HashMap::new(),
            &granting(),
        );
        assert_eq!(outcome.unwrap(), Outcome::Executed);
    }

    assert_eq!(
        *CALLS.lock().unwrap(),
        vec!["proj project builder", "proj project builder"]
    );
}

/// Test the retry loop grants on the third attempt
#[test]
fn test_denied_twice_then_granted_runs() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, true, &CALLS);
    let provider = MemoryProvider::new().answering([
        PermissionState::Denied,
        PermissionState::Denied,
        PermissionState::Granted,
    ]);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "export", "--out", "/tmp/report.csv", "--name", "p"],
        HashMap::new(),
        &provider,
    );

    assert_eq!(outcome.unwrap(), Outcome::Executed);
    assert_eq!(*CALLS.lock().unwrap(), vec!["export /tmp/report.csv"]);
}

/// Test three denials end the run with the reserved exit status
#[test]
fn test_denied_three_times_is_fatal() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, true, &CALLS);
    let provider = MemoryProvider::new().answering([PermissionState::Denied; 3]);

    let (outcome, _) = route(
        &registry,
        &["proj", "project", "export", "--out", "/tmp/report.csv", "--name", "p"],
        HashMap::new(),
        &provider,
    );

    let error = outcome.unwrap_err();
    assert_eq!(error.exit_code(), PERMISSION_DENIED_EXIT_CODE);
    assert!(matches!(
        error,
        Error::PermissionDenied(Capability::Write { path: Some(ref path) }) if path == "/tmp/report.csv"
    ));
    assert!(CALLS.lock().unwrap().is_empty());
}

/// Test the version shortcut uses the nearest declared version
#[test]
fn test_version_shortcut_prefers_command_version() {
    static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let registry = Registry::new();
    declare(&registry, true, &CALLS);

    let (outcome, renderer) = route(
        &registry,
        &["proj", "project", "build", "--version"],
        HashMap::new(),
        &granting(),
    );
    assert_eq!(outcome.unwrap(), Outcome::Version);
    assert_eq!(renderer.last().unwrap().version.as_deref(), Some("2.1.0"));

    let (outcome, renderer) = route(
        &registry,
        &["proj", "project", "builder", "-v"],
        HashMap::new(),
        &granting(),
    );
    assert_eq!(outcome.unwrap(), Outcome::Version);
    assert_eq!(renderer.last().unwrap().kind, HelpKind::Version);
    assert_eq!(renderer.last().unwrap().version.as_deref(), Some("1.0.0"));
    assert!(CALLS.lock().unwrap().is_empty());
}

/// Test that the global registry freezes on first resolution
#[test]
fn test_global_registry_freezes_on_first_run() {
    struct Ping;

    impl Command for Ping {
        fn create(_context: &RunContext) -> Self {
            Ping
        }
    }

    Registry::global()
        .declare::<Ping>()
        .command(CommandDescriptor::new("ping"))
        .unwrap()
        .handler(HandlerDescriptor::new(), |_, _| Ok(()))
        .unwrap();

    let mut renderer = MemoryRenderer::new();
    let outcome = Cli::new(CliConfig::new("net", "Net").command::<Ping>())
        .with_renderer(&mut renderer)
        .run(&["net", "ping"])
        .unwrap();
    assert_eq!(outcome, Outcome::Executed);

    let error = Registry::global()
        .declare::<Ping>()
        .handler(HandlerDescriptor::new(), |_, _| Ok(()))
        .unwrap_err();
    assert!(matches!(error, RegistrationError::Frozen { .. }));
}
