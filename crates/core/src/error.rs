use thiserror::Error;

use crate::capability::Capability;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit status reserved for a capability that stayed denied after every attempt.
pub const PERMISSION_DENIED_EXIT_CODE: u8 = 5;

/// Exit status for usage errors and unresolved paths.
pub const USAGE_EXIT_CODE: u8 = 1;

/// Error type returned by command targets.
pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Permission denied for {}.", .0)]
    PermissionDenied(Capability),

    #[error("Command `{}` failed: {}", .path, .source)]
    Target { path: String, source: TargetError },

    #[error("Invalid argument expression: {}", .0)]
    Pattern(#[from] regex::Error),

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),
}

impl Error {
    pub fn target(path: &str, source: TargetError) -> Self {
        Self::Target {
            path: path.to_string(),
            source,
        }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    /// Process exit status the binary should report for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PermissionDenied(_) => PERMISSION_DENIED_EXIT_CODE,
            _ => USAGE_EXIT_CODE,
        }
    }
}

/// Declaration-time failures. A command tree that produces one of these never runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Ambiguous argument overloads {} and {} in `{}`: {}", .first, .second, .command, .detail)]
    AmbiguousOverloads {
        command: String,
        first: usize,
        second: usize,
        detail: String,
    },

    #[error("Overlap of argument at position 0 and command \"{}\" matching \"/{}/\" in `{}`.", .subcommand, .pattern, .command)]
    OverloadShadowsSubcommand {
        command: String,
        subcommand: String,
        pattern: String,
    },

    #[error("Duplicate command \"{}\" found in `{}`.", .name, .command)]
    DuplicateSubcommand { command: String, name: String },

    #[error("Duplicate option \"--{}\" found in `{}`.", .name, .command)]
    DuplicateOption { command: String, name: String },

    #[error("Duplicate option shorthand \"-{}\" found in `{}`.", .shorthand, .command)]
    DuplicateShorthand { command: String, shorthand: String },

    #[error("Cannot register `{}`: the command registry is frozen once resolution has started.", .command)]
    Frozen { command: String },
}
