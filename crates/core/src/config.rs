//! Grants file handling.
//!
//! The grants file is a YAML list of capabilities the process may use
//! without asking, for example:
//!
//! ```yaml
//! - name: env
//!   variable: HOME
//! - name: read
//!   path: /var/log
//! - name: hrtime
//! ```

use std::fs::{create_dir_all, read_to_string, File};
use std::io::ErrorKind;
use std::path::Path;

use log::debug;

use crate::capability::Capability;
use crate::error::{Error, Result};

/// Default path for the grants file
pub const DEFAULT_GRANTS_PATH: &str = "~/.cmdroute/grants.yml";

/// Resolves the grants file path, expanding `~`.
///
/// ```
/// use cmdroute_core::config::get_grants_path;
///
/// let custom = get_grants_path(Some("/etc/cmdroute/grants.yml"));
/// assert_eq!(custom, "/etc/cmdroute/grants.yml");
/// ```
#[must_use]
pub fn get_grants_path(grants_path_arg: Option<&str>) -> String {
    let grants_path = grants_path_arg.unwrap_or(DEFAULT_GRANTS_PATH);

    shellexpand::tilde(grants_path).to_string()
}

/// Reads the capabilities listed in the grants file at `path`.
///
/// A missing file grants nothing.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file exists but cannot be read and
/// [`Error::Yaml`] when it is not a valid list of capabilities.
pub fn load_grants(path: &str) -> Result<Vec<Capability>> {
    let contents = match read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No grants file at `{path}`");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::io_error("grants".to_string(), path.to_string(), e)),
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let grants: Vec<Capability> = serde_yaml::from_str(&contents).map_err(|e| {
        Error::yaml_error("parsing".to_string(), "grants".to_string(), path.to_string(), e)
    })?;

    debug!("Loaded {} grant(s) from `{path}`", grants.len());
    Ok(grants)
}

/// Writes `grants` to `path`, replacing the file and creating missing
/// parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be created and [`Error::Yaml`]
/// when serialization fails.
pub fn save_grants(path: &str, grants: &[Capability]) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        create_dir_all(parent)
            .map_err(|e| Error::io_error("grants".to_string(), path.to_string(), e))?;
    }

    let file = File::create(path)
        .map_err(|e| Error::io_error("grants".to_string(), path.to_string(), e))?;

    serde_yaml::to_writer(file, grants).map_err(|e| {
        Error::yaml_error("writing".to_string(), "grants".to_string(), path.to_string(), e)
    })
}
