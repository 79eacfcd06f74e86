//! Runtime capabilities a command may need before it runs, and the provider
//! interface used to query and request them.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A single capability requirement.
///
/// A `None` target means "any": `Env { variable: None }` is access to every
/// environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Capability {
    Env {
        #[serde(default)]
        variable: Option<String>,
    },
    Read {
        #[serde(default)]
        path: Option<String>,
    },
    Write {
        #[serde(default)]
        path: Option<String>,
    },
    Net {
        #[serde(default)]
        host: Option<String>,
    },
    Run {
        #[serde(default)]
        command: Option<String>,
    },
    Sys {
        #[serde(default)]
        kind: Option<String>,
    },
    Hrtime,
}

impl Capability {
    pub fn env(variable: &str) -> Self {
        Self::Env {
            variable: Some(variable.to_string()),
        }
    }

    pub fn read(path: &str) -> Self {
        Self::Read {
            path: Some(path.to_string()),
        }
    }

    pub fn write(path: &str) -> Self {
        Self::Write {
            path: Some(path.to_string()),
        }
    }

    pub fn net(host: &str) -> Self {
        Self::Net {
            host: Some(host.to_string()),
        }
    }

    pub fn run(command: &str) -> Self {
        Self::Run {
            command: Some(command.to_string()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Env { .. } => "env",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Net { .. } => "net",
            Self::Run { .. } => "run",
            Self::Sys { .. } => "sys",
            Self::Hrtime => "hrtime",
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Env { variable: target }
            | Self::Read { path: target }
            | Self::Write { path: target }
            | Self::Net { host: target }
            | Self::Run { command: target }
            | Self::Sys { kind: target } => target.as_deref(),
            Self::Hrtime => None,
        }
    }

    /// Whether holding `self` also satisfies `other`.
    ///
    /// Untargeted grants cover every target of the same kind, and a path
    /// grant covers everything below it.
    #[must_use]
    pub fn covers(&self, other: &Capability) -> bool {
        if self.name() != other.name() {
            return false;
        }

        match (self.target(), other.target()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(granted), Some(wanted)) => match self {
                Self::Read { .. } | Self::Write { .. } => {
                    wanted == granted
                        || wanted
                            .strip_prefix(granted)
                            .is_some_and(|rest| granted.ends_with('/') || rest.starts_with('/'))
                }
                _ => wanted == granted,
            },
        }
    }
}

impl Display for Capability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.target() {
            Some(target) => write!(formatter, "{} access to \"{target}\"", self.name()),
            None => write!(formatter, "{} access", self.name()),
        }
    }
}

/// Answer from a capability provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet, a request may still grant it.
    Prompt,
}

/// Backend that knows which capabilities the process holds.
pub trait CapabilityProvider {
    fn query(&self, capability: &Capability) -> PermissionState;

    fn request(&self, capability: &Capability) -> PermissionState;
}

impl<P: CapabilityProvider + ?Sized> CapabilityProvider for &P {
    fn query(&self, capability: &Capability) -> PermissionState {
        (**self).query(capability)
    }

    fn request(&self, capability: &Capability) -> PermissionState {
        (**self).request(capability)
    }
}

/// Grants every capability without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantAll;

impl CapabilityProvider for GrantAll {
    fn query(&self, _capability: &Capability) -> PermissionState {
        PermissionState::Granted
    }

    fn request(&self, _capability: &Capability) -> PermissionState {
        PermissionState::Granted
    }
}

/// In-memory provider holding a grant list and a queue of scripted answers
/// for requests. Requests answered with [`PermissionState::Granted`] are
/// remembered, an empty queue answers [`PermissionState::Denied`].
#[derive(Debug, Default)]
pub struct MemoryProvider {
    granted: RefCell<Vec<Capability>>,
    answers: RefCell<VecDeque<PermissionState>>,
    requests: Cell<usize>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_grants(grants: Vec<Capability>) -> Self {
        Self {
            granted: RefCell::new(grants),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn grant(self, capability: Capability) -> Self {
        self.granted.borrow_mut().push(capability);
        self
    }

    /// Queues answers returned, in order, by subsequent requests.
    #[must_use]
    pub fn answering(self, answers: impl IntoIterator<Item = PermissionState>) -> Self {
        self.answers.borrow_mut().extend(answers);
        self
    }

    /// Number of requests made so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }
}

impl CapabilityProvider for MemoryProvider {
    fn query(&self, capability: &Capability) -> PermissionState {
        if self
            .granted
            .borrow()
            .iter()
            .any(|granted| granted.covers(capability))
        {
            PermissionState::Granted
        } else {
            PermissionState::Prompt
        }
    }

    fn request(&self, capability: &Capability) -> PermissionState {
        self.requests.set(self.requests.get() + 1);

        let answer = self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(PermissionState::Denied);

        if answer == PermissionState::Granted {
            self.granted.borrow_mut().push(capability.clone());
        }

        answer
    }
}
