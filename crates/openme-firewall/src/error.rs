//! Firewall error types

use thiserror::Error;

/// Result type for firewall operations
pub type Result<T> = std::result::Result<T, FirewallError>;

/// Firewall errors
#[derive(Debug, Error)]
pub enum FirewallError {
    /// The backend's command-line tool exited non-zero
    #[error("{tool} exited with status {status}: {stderr}")]
    CommandFailed {
        /// Tool invoked, e.g. "iptables"
        tool: &'static str,
        /// Process exit status
        status: i32,
        /// Captured stderr
        stderr: String,
    },

    /// The backend's command-line tool could not be spawned at all
    #[error("failed to spawn {tool}: {0}", tool = .1)]
    SpawnFailed(#[source] std::io::Error, &'static str),
}
