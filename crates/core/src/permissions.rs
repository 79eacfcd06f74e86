//! Capability negotiation with bounded retry.

use std::any::Any;

use log::{debug, error, info};

use crate::capability::{Capability, CapabilityProvider, PermissionState};
use crate::command_definitions::Permission;
use crate::error::{Error, Result};

/// Attempts made for one capability before giving up.
pub const MAX_ATTEMPTS: usize = 3;

pub struct PermissionNegotiator<'a> {
    provider: &'a dyn CapabilityProvider,
}

impl<'a> PermissionNegotiator<'a> {
    pub fn new(provider: &'a dyn CapabilityProvider) -> Self {
        Self { provider }
    }

    /// Ensures every permission in `permissions` is held, evaluating dynamic
    /// ones against `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for the first capability still
    /// denied after [`MAX_ATTEMPTS`]. Callers treat it as fatal.
    pub fn check(&self, permissions: &[Permission], instance: &dyn Any) -> Result<()> {
        for permission in permissions {
            for capability in permission.evaluate(instance) {
                self.check_capability(&capability)?;
            }
        }

        Ok(())
    }

    /// Queries, then requests, `capability`, up to [`MAX_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when every attempt was denied.
    pub fn check_capability(&self, capability: &Capability) -> Result<()> {
        for attempt in 1..=MAX_ATTEMPTS {
            if self.provider.query(capability) == PermissionState::Granted {
                debug!("Capability {capability} already granted");
                return Ok(());
            }

            if self.provider.request(capability) == PermissionState::Granted {
                info!("Capability {capability} granted on attempt {attempt}");
                return Ok(());
            }

            debug!("Capability {capability} denied (attempt {attempt} of {MAX_ATTEMPTS})");
        }

        error!("Exiting due to permission denial for {capability}.");
        Err(Error::PermissionDenied(capability.clone()))
    }
}
