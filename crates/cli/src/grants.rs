//! Capability provider backed by the grants file and a terminal prompt.

use std::cell::RefCell;
use std::io::{stdin, stdout, BufRead, StdinLock, Stdout, Write};

use log::{debug, info, warn};

use cmdroute_core::capability::{Capability, CapabilityProvider, PermissionState};
use cmdroute_core::config;

/// User's answer to a capability prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantChoice {
    Yes,
    No,
    /// Grant and persist to the grants file.
    Always,
}

/// Answers queries from pre-granted capabilities and requests by asking on
/// the terminal, or by granting outright when `assume_yes` is set.
pub struct GrantsProvider<R, W> {
    granted: RefCell<Vec<Capability>>,
    grants_path: Option<String>,
    assume_yes: bool,
    input: RefCell<R>,
    output: RefCell<W>,
}

impl GrantsProvider<StdinLock<'static>, Stdout> {
    /// Provider prompting on stdin/stdout.
    #[must_use]
    pub fn terminal(grants: Vec<Capability>, grants_path: Option<String>, assume_yes: bool) -> Self {
        Self::new(grants, grants_path, assume_yes, stdin().lock(), stdout())
    }
}

impl<R: BufRead, W: Write> GrantsProvider<R, W> {
    pub fn new(
        grants: Vec<Capability>,
        grants_path: Option<String>,
        assume_yes: bool,
        input: R,
        output: W,
    ) -> Self {
        Self {
            granted: RefCell::new(grants),
            grants_path,
            assume_yes,
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    /// Capabilities granted so far, including those granted this run.
    #[must_use]
    pub fn granted(&self) -> Vec<Capability> {
        self.granted.borrow().clone()
    }

    fn holds(&self, capability: &Capability) -> bool {
        self.granted
            .borrow()
            .iter()
            .any(|granted| granted.covers(capability))
    }

    /// Asks until a recognised answer is given. End of input counts as no.
    fn confirm(&self, capability: &Capability) -> std::io::Result<GrantChoice> {
        let mut input = self.input.borrow_mut();
        let mut output = self.output.borrow_mut();

        loop {
            write!(output, "Allow {capability}? ([y]es/[N]o/[a]lways): ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(GrantChoice::No);
            }

            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(GrantChoice::Yes),
                "n" | "no" | "" => return Ok(GrantChoice::No),
                "a" | "always" => return Ok(GrantChoice::Always),
                _ => {}
            }
        }
    }

    fn persist(&self) {
        let Some(path) = self.grants_path.as_deref() else {
            return;
        };

        match config::save_grants(path, &self.granted.borrow()) {
            Ok(()) => info!("Saved grants to `{path}`"),
            Err(e) => warn!("Could not save grants: {e}"),
        }
    }
}

impl<R: BufRead, W: Write> CapabilityProvider for GrantsProvider<R, W> {
    fn query(&self, capability: &Capability) -> PermissionState {
        if self.holds(capability) {
            PermissionState::Granted
        } else {
            PermissionState::Prompt
        }
    }

    fn request(&self, capability: &Capability) -> PermissionState {
        if self.assume_yes {
            debug!("Granting {capability} without prompting");
            self.granted.borrow_mut().push(capability.clone());
            return PermissionState::Granted;
        }

        let choice = match self.confirm(capability) {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Could not prompt for {capability}: {e}");
                return PermissionState::Denied;
            }
        };

        match choice {
            GrantChoice::No => PermissionState::Denied,
            GrantChoice::Yes => {
                self.granted.borrow_mut().push(capability.clone());
                PermissionState::Granted
            }
            GrantChoice::Always => {
                self.granted.borrow_mut().push(capability.clone());
                self.persist();
                PermissionState::Granted
            }
        }
    }
}
