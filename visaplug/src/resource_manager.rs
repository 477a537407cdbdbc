//! The resource manager seam: enumerate resource addresses and open sessions to them.

use std::time::Duration;

use crate::{DEFAULT_TIMEOUT, ResourceSession, VisaError};

/// Options that are applied when a resource is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenOptions {
    /// Timeout for the session.
    pub timeout: Duration,
    /// Terminator for commands and responses. `None` or an empty string keeps the session's own
    /// default.
    pub termination: Option<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            termination: None,
        }
    }
}

/// A resource manager lists the resources available on a bus and opens sessions to them.
///
/// This is the only thing VisaPlug needs from a transport. Implement it for your own bus, or use
/// one of the bundled managers.
pub trait ResourceManager {
    /// The session type that is returned when opening a resource.
    type Session: ResourceSession;

    /// List the addresses of all available resources, in enumeration order.
    fn list_resources(&mut self) -> Result<Vec<String>, VisaError>;

    /// Open a session to the resource with the given address.
    ///
    /// # Arguments
    /// * `address` - The resource address, as returned by [`ResourceManager::list_resources`].
    /// * `timeout` - Timeout for the new session.
    fn open_resource(&mut self, address: &str, timeout: Duration)
    -> Result<Self::Session, VisaError>;

    /// Open a session and apply the termination policy of the options.
    ///
    /// An empty termination is treated like `None`: the session keeps its own terminator.
    fn open(&mut self, address: &str, options: &OpenOptions) -> Result<Self::Session, VisaError> {
        let mut session = self.open_resource(address, options.timeout)?;
        match options.termination.as_deref() {
            Some("") | None => {}
            Some(terminator) => session.set_terminator(terminator),
        }
        Ok(session)
    }
}
