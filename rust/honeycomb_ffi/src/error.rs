//! Honeycomb error types.

/// Errors raised while building or installing a [`Config`](crate::config::Config).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A configuration was already installed for this process.
    #[error("a configuration has already been installed")]
    AlreadyInstalled,
    /// An environment variable does not contain a boolean.
    #[error("invalid value `{value}` for environment variable `{var}`")]
    InvalidEnv {
        /// Name of the variable.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// A [`Result`](std::result::Result) defaulting to the crate [`Error`].
pub type Result<T = (), E = Error> = std::result::Result<T, E>;
