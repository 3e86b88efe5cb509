//! Host name capture.
//!
//! A channel writer stamps every envelope with the host it runs on. The
//! lookup sits behind a provider trait so tests can pin the host string
//! instead of depending on the machine they run on.

/// Source of the local host name.
pub trait HostName {
    /// The host name to record in envelopes.
    fn host_name(&self) -> String;
}

/// Production provider backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostName;

impl HostName for SystemHostName {
    fn host_name(&self) -> String {
        hostname::get().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// Fixed provider for tests and reproducible output.
#[derive(Debug, Clone)]
pub struct FixedHostName(pub String);

impl HostName for FixedHostName {
    fn host_name(&self) -> String {
        self.0.clone()
    }
}
